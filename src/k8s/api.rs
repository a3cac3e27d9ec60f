/// Cluster API seam: the five calls this tool makes against the API server
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Service;
use kube::api::{Api, DeleteParams, PostParams};
use kube::Client;
use std::fmt;
use tracing::debug;

use super::error::{ClusterError, ClusterResult};

/// Kind of object managed by this tool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Deployment,
    Service,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Deployment => write!(f, "Deployment"),
            ResourceKind::Service => write!(f, "Service"),
        }
    }
}

/// Namespace and name of an object created on the API server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRef {
    pub kind: ResourceKind,
    pub namespace: String,
    pub name: String,
}

impl ResourceRef {
    pub fn new(kind: ResourceKind, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind,
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Operations against the Kubernetes API server.
///
/// Kept as a trait so the lifecycle can be driven against an in-memory
/// double in tests.
#[async_trait]
pub trait ClusterApi: Send + Sync {
    /// Create a Deployment in the namespace
    async fn create_deployment(
        &self,
        namespace: &str,
        deployment: Deployment,
    ) -> ClusterResult<Deployment>;

    /// Fetch a Deployment by name
    async fn get_deployment(&self, namespace: &str, name: &str) -> ClusterResult<Deployment>;

    /// Delete a Deployment by name
    async fn delete_deployment(&self, namespace: &str, name: &str) -> ClusterResult<()>;

    /// Create a Service in the namespace
    async fn create_service(&self, namespace: &str, service: Service) -> ClusterResult<Service>;

    /// Delete a Service by name
    async fn delete_service(&self, namespace: &str, name: &str) -> ClusterResult<()>;
}

/// Production implementation backed by `kube::Api`
#[derive(Clone)]
pub struct KubeClusterApi {
    client: Client,
}

impl KubeClusterApi {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn deployments(&self, namespace: &str) -> Api<Deployment> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn services(&self, namespace: &str) -> Api<Service> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

fn object_name(meta: &k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta) -> &str {
    meta.name.as_deref().unwrap_or_default()
}

#[async_trait]
impl ClusterApi for KubeClusterApi {
    async fn create_deployment(
        &self,
        namespace: &str,
        deployment: Deployment,
    ) -> ClusterResult<Deployment> {
        let name = object_name(&deployment.metadata).to_string();
        debug!("POST deployments {}/{}", namespace, name);
        self.deployments(namespace)
            .create(&PostParams::default(), &deployment)
            .await
            .map_err(|e| ClusterError::from_kube(ResourceKind::Deployment, &name, e))
    }

    async fn get_deployment(&self, namespace: &str, name: &str) -> ClusterResult<Deployment> {
        debug!("GET deployments {}/{}", namespace, name);
        self.deployments(namespace)
            .get(name)
            .await
            .map_err(|e| ClusterError::from_kube(ResourceKind::Deployment, name, e))
    }

    async fn delete_deployment(&self, namespace: &str, name: &str) -> ClusterResult<()> {
        debug!("DELETE deployments {}/{}", namespace, name);
        self.deployments(namespace)
            .delete(name, &DeleteParams::default())
            .await
            .map(|_| ())
            .map_err(|e| ClusterError::from_kube(ResourceKind::Deployment, name, e))
    }

    async fn create_service(&self, namespace: &str, service: Service) -> ClusterResult<Service> {
        let name = object_name(&service.metadata).to_string();
        debug!("POST services {}/{}", namespace, name);
        self.services(namespace)
            .create(&PostParams::default(), &service)
            .await
            .map_err(|e| ClusterError::from_kube(ResourceKind::Service, &name, e))
    }

    async fn delete_service(&self, namespace: &str, name: &str) -> ClusterResult<()> {
        debug!("DELETE services {}/{}", namespace, name);
        self.services(namespace)
            .delete(name, &DeleteParams::default())
            .await
            .map(|_| ())
            .map_err(|e| ClusterError::from_kube(ResourceKind::Service, name, e))
    }
}
