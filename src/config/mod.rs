/// Configuration management for kube-hello
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::k8s::{LabelBinding, RoutingMode, ServiceSpec, WorkloadSpec};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Namespace every call is scoped to
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Label pair binding the service selector to the workload's pods
    #[serde(default)]
    pub binding: LabelBinding,

    /// Deployment settings
    pub workload: WorkloadConfig,

    /// Service settings
    pub service: ServiceConfig,

    /// Polling settings
    #[serde(default)]
    pub observer: ObserverConfig,
}

/// Deployment configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkloadConfig {
    /// Deployment name
    pub name: String,

    /// Desired replica count
    #[serde(default = "default_one")]
    pub replicas: i32,

    /// Container name inside the pod template
    pub container_name: String,

    /// Container image (e.g., "nginx:1.14.2")
    pub image: String,

    /// Port the container listens on
    pub container_port: i32,

    /// Name of the container port
    #[serde(default = "default_port_name")]
    pub port_name: String,
}

/// Service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Service name
    pub name: String,

    /// Port exposed by the service
    pub port: i32,

    /// Pod port traffic is forwarded to
    pub target_port: i32,

    /// Node port (30000-32767); only used for node_exposed and load_balanced
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_port: Option<i32>,

    /// How the service is exposed
    pub routing: RoutingMode,

    /// Name of the service port
    #[serde(default = "default_port_name")]
    pub port_name: String,
}

/// Observer loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObserverConfig {
    /// Seconds between reads of the workload
    #[serde(default = "default_one_u64")]
    pub interval_secs: u64,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_one_u64(),
        }
    }
}

impl ObserverConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

fn default_namespace() -> String {
    "default".to_string()
}

fn default_port_name() -> String {
    "http".to_string()
}

fn default_one() -> i32 {
    1
}

fn default_one_u64() -> u64 {
    1
}

const NODE_PORT_RANGE: std::ops::RangeInclusive<i32> = 30000..=32767;

impl AppConfig {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.namespace.is_empty() {
            anyhow::bail!("namespace cannot be empty");
        }

        self.binding.validate()?;

        if self.workload.name.is_empty() {
            anyhow::bail!("workload.name cannot be empty");
        }
        if self.workload.container_name.is_empty() {
            anyhow::bail!("workload.container_name cannot be empty");
        }
        if self.workload.image.is_empty() {
            anyhow::bail!("workload.image cannot be empty");
        }
        if self.workload.replicas < 0 {
            anyhow::bail!("workload.replicas cannot be negative");
        }
        self.validate_port("workload.container_port", self.workload.container_port)?;

        if self.service.name.is_empty() {
            anyhow::bail!("service.name cannot be empty");
        }
        self.validate_port("service.port", self.service.port)?;
        self.validate_port("service.target_port", self.service.target_port)?;

        if let Some(node_port) = self.service.node_port {
            if !self.service.routing.uses_node_port() {
                anyhow::bail!("service.node_port requires node_exposed or load_balanced routing");
            }
            if !NODE_PORT_RANGE.contains(&node_port) {
                anyhow::bail!(
                    "service.node_port {} outside {}-{}",
                    node_port,
                    NODE_PORT_RANGE.start(),
                    NODE_PORT_RANGE.end()
                );
            }
        }

        if self.observer.interval_secs == 0 {
            anyhow::bail!("observer.interval_secs must be at least 1");
        }

        Ok(())
    }

    /// Validate a TCP port number
    fn validate_port(&self, field: &str, port: i32) -> anyhow::Result<()> {
        if !(1..=65535).contains(&port) {
            anyhow::bail!("Invalid port for {}: {}", field, port);
        }
        Ok(())
    }

    /// Deployment spec carrying the shared binding
    pub fn workload_spec(&self) -> WorkloadSpec {
        WorkloadSpec {
            name: self.workload.name.clone(),
            namespace: self.namespace.clone(),
            binding: self.binding.clone(),
            replicas: self.workload.replicas,
            container_name: self.workload.container_name.clone(),
            image: self.workload.image.clone(),
            container_port: self.workload.container_port,
            port_name: self.workload.port_name.clone(),
        }
    }

    /// Service spec carrying the shared binding
    pub fn service_spec(&self) -> ServiceSpec {
        ServiceSpec {
            name: self.service.name.clone(),
            namespace: self.namespace.clone(),
            binding: self.binding.clone(),
            port: self.service.port,
            target_port: self.service.target_port,
            node_port: self.service.node_port,
            routing: self.service.routing,
            port_name: self.service.port_name.clone(),
        }
    }

    /// The nginx + NodePort demo configuration
    pub fn example() -> Self {
        Self {
            namespace: default_namespace(),
            binding: LabelBinding::default(),
            workload: WorkloadConfig {
                name: "hello-app1".to_string(),
                replicas: 1,
                container_name: "nginx-container".to_string(),
                image: "nginx:1.14.2".to_string(),
                container_port: 80,
                port_name: default_port_name(),
            },
            service: ServiceConfig {
                name: "hello-service".to_string(),
                port: 80,
                target_port: 80,
                node_port: Some(30080),
                routing: RoutingMode::NodeExposed,
                port_name: default_port_name(),
            },
            observer: ObserverConfig::default(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::example()
    }
}
