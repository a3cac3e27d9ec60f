/// In-memory `ClusterApi` used by unit tests
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Service;
use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

use super::api::{ClusterApi, ResourceKind};
use super::error::{ClusterError, ClusterResult};

/// Operation recorded by [`MockClusterApi`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateDeployment,
    GetDeployment,
    DeleteDeployment,
    CreateService,
    DeleteService,
}

/// Mimics API server name uniqueness and records every call in order
#[derive(Default)]
pub struct MockClusterApi {
    deployments: Mutex<BTreeMap<(String, String), Deployment>>,
    services: Mutex<BTreeMap<(String, String), Service>>,
    calls: Mutex<Vec<(Operation, String)>>,
    failing: Mutex<HashSet<Operation>>,
}

impl MockClusterApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call of `op` fail with an API error
    pub fn fail_on(&self, op: Operation) {
        self.failing.lock().unwrap().insert(op);
    }

    pub fn calls(&self) -> Vec<(Operation, String)> {
        self.calls.lock().unwrap().clone()
    }

    /// Recorded calls excluding polling reads
    pub fn mutations(&self) -> Vec<(Operation, String)> {
        self.calls()
            .into_iter()
            .filter(|(op, _)| *op != Operation::GetDeployment)
            .collect()
    }

    pub fn count(&self, op: Operation) -> usize {
        self.calls().iter().filter(|(o, _)| *o == op).count()
    }

    pub fn deployment(&self, namespace: &str, name: &str) -> Option<Deployment> {
        self.deployments
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    pub fn service(&self, namespace: &str, name: &str) -> Option<Service> {
        self.services
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    fn record(&self, op: Operation, name: &str) -> ClusterResult<()> {
        self.calls.lock().unwrap().push((op, name.to_string()));
        if self.failing.lock().unwrap().contains(&op) {
            return Err(ClusterError::Api {
                message: format!("injected failure for {:?} {}", op, name),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ClusterApi for MockClusterApi {
    async fn create_deployment(
        &self,
        namespace: &str,
        mut deployment: Deployment,
    ) -> ClusterResult<Deployment> {
        let name = deployment.metadata.name.clone().unwrap_or_default();
        self.record(Operation::CreateDeployment, &name)?;

        let mut store = self.deployments.lock().unwrap();
        let key = (namespace.to_string(), name.clone());
        if store.contains_key(&key) {
            return Err(ClusterError::AlreadyExists {
                kind: ResourceKind::Deployment,
                name,
            });
        }
        deployment.metadata.namespace = Some(namespace.to_string());
        store.insert(key, deployment.clone());
        Ok(deployment)
    }

    async fn get_deployment(&self, namespace: &str, name: &str) -> ClusterResult<Deployment> {
        self.record(Operation::GetDeployment, name)?;
        self.deployment(namespace, name)
            .ok_or_else(|| ClusterError::NotFound {
                kind: ResourceKind::Deployment,
                name: name.to_string(),
            })
    }

    async fn delete_deployment(&self, namespace: &str, name: &str) -> ClusterResult<()> {
        self.record(Operation::DeleteDeployment, name)?;
        self.deployments
            .lock()
            .unwrap()
            .remove(&(namespace.to_string(), name.to_string()))
            .map(|_| ())
            .ok_or_else(|| ClusterError::NotFound {
                kind: ResourceKind::Deployment,
                name: name.to_string(),
            })
    }

    async fn create_service(
        &self,
        namespace: &str,
        mut service: Service,
    ) -> ClusterResult<Service> {
        let name = service.metadata.name.clone().unwrap_or_default();
        self.record(Operation::CreateService, &name)?;

        let mut store = self.services.lock().unwrap();
        let key = (namespace.to_string(), name.clone());
        if store.contains_key(&key) {
            return Err(ClusterError::AlreadyExists {
                kind: ResourceKind::Service,
                name,
            });
        }
        service.metadata.namespace = Some(namespace.to_string());
        store.insert(key, service.clone());
        Ok(service)
    }

    async fn delete_service(&self, namespace: &str, name: &str) -> ClusterResult<()> {
        self.record(Operation::DeleteService, name)?;
        self.services
            .lock()
            .unwrap()
            .remove(&(namespace.to_string(), name.to_string()))
            .map(|_| ())
            .ok_or_else(|| ClusterError::NotFound {
                kind: ResourceKind::Service,
                name: name.to_string(),
            })
    }
}
