/// Label binding shared between the workload and the service that routes to it
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single label key/value pair.
///
/// The same value is stamped on the Deployment, its selector, its pod
/// template, and on the Service and its selector. The Service only routes to
/// pods carrying exactly this pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelBinding {
    pub key: String,
    pub value: String,
}

impl LabelBinding {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Label map suitable for `metadata.labels` and selectors
    pub fn labels(&self) -> BTreeMap<String, String> {
        BTreeMap::from([(self.key.clone(), self.value.clone())])
    }

    /// Selector string form (`key=value`) as used by list calls and kubectl
    pub fn selector(&self) -> String {
        format!("{}={}", self.key, self.value)
    }

    /// Validate key and value against the Kubernetes label syntax
    pub fn validate(&self) -> Result<()> {
        let name = match self.key.split_once('/') {
            Some((prefix, name)) => {
                if !is_dns_subdomain(prefix) {
                    anyhow::bail!("Invalid label key prefix: {}", self.key);
                }
                name
            }
            None => self.key.as_str(),
        };

        if name.is_empty() || name.contains('/') || !is_label_segment(name) {
            anyhow::bail!("Invalid label key: {}", self.key);
        }

        if !self.value.is_empty() && !is_label_segment(&self.value) {
            anyhow::bail!("Invalid label value for {}: {}", self.key, self.value);
        }

        Ok(())
    }
}

impl Default for LabelBinding {
    fn default() -> Self {
        Self::new("fy20047-k8s", "practice2")
    }
}

// 63 chars max, alphanumeric at both ends, `-_.` inside
fn is_label_segment(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() <= 63
        && bytes.first().is_some_and(u8::is_ascii_alphanumeric)
        && bytes.last().is_some_and(u8::is_ascii_alphanumeric)
        && bytes
            .iter()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
}

// 253 chars max, dot-separated lowercase DNS labels
fn is_dns_subdomain(s: &str) -> bool {
    s.len() <= 253
        && s.split('.').all(|label| {
            let bytes = label.as_bytes();
            bytes.len() <= 63
                && bytes.first().is_some_and(is_dns_alphanumeric)
                && bytes.last().is_some_and(is_dns_alphanumeric)
                && bytes.iter().all(|b| is_dns_alphanumeric(b) || *b == b'-')
        })
}

fn is_dns_alphanumeric(b: &u8) -> bool {
    b.is_ascii_lowercase() || b.is_ascii_digit()
}
