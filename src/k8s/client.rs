/// Connection provider: builds an authenticated Kubernetes client
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::error::ConnectError;

/// Kubeconfig location relative to the home directory
pub const KUBECONFIG_RELATIVE_PATH: &str = ".kube/config";

/// Where credentials come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionMode {
    /// Kubeconfig file, `~/.kube/config` unless overridden
    External { kubeconfig: Option<PathBuf> },
    /// Service account injected into the pod
    Ambient,
}

impl ConnectionMode {
    pub fn from_flags(outside_cluster: bool, kubeconfig: Option<PathBuf>) -> Self {
        if outside_cluster {
            ConnectionMode::External { kubeconfig }
        } else {
            ConnectionMode::Ambient
        }
    }
}

/// Default kubeconfig path under the given home directory
pub fn default_kubeconfig_path(home: &Path) -> PathBuf {
    home.join(KUBECONFIG_RELATIVE_PATH)
}

/// Resolve the kubeconfig path for external mode
pub fn resolve_kubeconfig_path(explicit: Option<&Path>) -> Result<PathBuf, ConnectError> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => dirs::home_dir()
            .map(|home| default_kubeconfig_path(&home))
            .ok_or(ConnectError::NoHomeDir),
    }
}

/// Load client configuration for the selected mode
pub async fn load_config(mode: &ConnectionMode) -> Result<Config, ConnectError> {
    match mode {
        ConnectionMode::External { kubeconfig } => {
            let path = resolve_kubeconfig_path(kubeconfig.as_deref())?;
            debug!("Loading kubeconfig from {}", path.display());

            let kubeconfig =
                Kubeconfig::read_from(&path).map_err(|source| ConnectError::Kubeconfig {
                    path: path.clone(),
                    source,
                })?;
            Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                .await
                .map_err(|source| ConnectError::Kubeconfig { path, source })
        }
        ConnectionMode::Ambient => {
            debug!("Loading in-cluster service account configuration");
            Ok(Config::incluster()?)
        }
    }
}

/// Build the process-wide client handle
pub async fn connect(mode: &ConnectionMode) -> Result<Client, ConnectError> {
    let config = load_config(mode).await?;
    info!("Connecting to Kubernetes API at {}", config.cluster_url);
    Ok(Client::try_from(config)?)
}
