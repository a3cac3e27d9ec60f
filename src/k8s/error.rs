/// Typed errors for connection setup and API calls
use std::path::PathBuf;
use thiserror::Error;

use super::api::ResourceKind;

/// Result type alias for cluster API calls
pub type ClusterResult<T> = Result<T, ClusterError>;

/// Errors returned by [`super::ClusterApi`] implementations
#[derive(Error, Debug)]
pub enum ClusterError {
    #[error("{kind} {name} already exists")]
    AlreadyExists { kind: ResourceKind, name: String },

    #[error("{kind} {name} not found")]
    NotFound { kind: ResourceKind, name: String },

    #[error("Kubernetes API error: {message}")]
    Api { message: String },
}

impl ClusterError {
    /// Classify a kube error for the given object
    pub fn from_kube(kind: ResourceKind, name: &str, err: kube::Error) -> Self {
        match err {
            kube::Error::Api(ref response) if response.code == 409 => ClusterError::AlreadyExists {
                kind,
                name: name.to_string(),
            },
            kube::Error::Api(ref response) if response.code == 404 => ClusterError::NotFound {
                kind,
                name: name.to_string(),
            },
            other => other.into(),
        }
    }
}

impl From<kube::Error> for ClusterError {
    fn from(err: kube::Error) -> Self {
        ClusterError::Api {
            message: err.to_string(),
        }
    }
}

/// Errors raised while building an authenticated client
#[derive(Error, Debug)]
pub enum ConnectError {
    #[error("Could not resolve the user's home directory")]
    NoHomeDir,

    #[error("Failed to read kubeconfig {path}: {source}")]
    Kubeconfig {
        path: PathBuf,
        #[source]
        source: kube::config::KubeconfigError,
    },

    #[error("In-cluster configuration unavailable: {0}")]
    InCluster(#[from] kube::config::InClusterError),

    #[error("Failed to create Kubernetes client: {0}")]
    Client(#[from] kube::Error),
}
