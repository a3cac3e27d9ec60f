/// Deployment and Service declarations
use anyhow::{Context, Result};
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    Container, ContainerPort, PodSpec, PodTemplateSpec, Service, ServicePort,
    ServiceSpec as K8sServiceSpec,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::api::{ClusterApi, ResourceKind, ResourceRef};
use super::binding::LabelBinding;

/// How a Service is reachable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingMode {
    /// Reachable only inside the cluster (ClusterIP)
    ClusterLocal,
    /// A fixed port on every node forwards to the service (NodePort)
    NodeExposed,
    /// Provisioned external load balancer (LoadBalancer)
    LoadBalanced,
}

impl RoutingMode {
    /// Service `spec.type` value
    pub fn service_type(&self) -> &'static str {
        match self {
            RoutingMode::ClusterLocal => "ClusterIP",
            RoutingMode::NodeExposed => "NodePort",
            RoutingMode::LoadBalanced => "LoadBalancer",
        }
    }

    /// Whether the mode allocates a node port
    pub fn uses_node_port(&self) -> bool {
        !matches!(self, RoutingMode::ClusterLocal)
    }
}

/// Desired state of the workload
#[derive(Debug, Clone)]
pub struct WorkloadSpec {
    pub name: String,
    pub namespace: String,
    pub binding: LabelBinding,
    pub replicas: i32,
    pub container_name: String,
    pub image: String,
    pub container_port: i32,
    pub port_name: String,
}

impl WorkloadSpec {
    /// Build the Deployment object sent to the API server.
    ///
    /// The binding labels go on the Deployment, its selector, and its pod
    /// template.
    pub fn to_deployment(&self) -> Deployment {
        let labels = self.binding.labels();

        Deployment {
            metadata: ObjectMeta {
                name: Some(self.name.clone()),
                namespace: Some(self.namespace.clone()),
                labels: Some(labels.clone()),
                ..Default::default()
            },
            spec: Some(DeploymentSpec {
                replicas: Some(self.replicas),
                selector: LabelSelector {
                    match_labels: Some(labels.clone()),
                    ..Default::default()
                },
                template: PodTemplateSpec {
                    metadata: Some(ObjectMeta {
                        labels: Some(labels),
                        ..Default::default()
                    }),
                    spec: Some(PodSpec {
                        containers: vec![Container {
                            name: self.container_name.clone(),
                            image: Some(self.image.clone()),
                            ports: Some(vec![ContainerPort {
                                name: Some(self.port_name.clone()),
                                container_port: self.container_port,
                                protocol: Some("TCP".to_string()),
                                ..Default::default()
                            }]),
                            ..Default::default()
                        }],
                        ..Default::default()
                    }),
                },
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}

/// Desired state of the service routing to the workload
#[derive(Debug, Clone)]
pub struct ServiceSpec {
    pub name: String,
    pub namespace: String,
    pub binding: LabelBinding,
    pub port: i32,
    pub target_port: i32,
    pub node_port: Option<i32>,
    pub routing: RoutingMode,
    pub port_name: String,
}

impl ServiceSpec {
    /// Build the Service object sent to the API server
    pub fn to_service(&self) -> Service {
        let labels = self.binding.labels();
        let node_port = if self.routing.uses_node_port() {
            self.node_port
        } else {
            None
        };

        Service {
            metadata: ObjectMeta {
                name: Some(self.name.clone()),
                namespace: Some(self.namespace.clone()),
                labels: Some(labels.clone()),
                ..Default::default()
            },
            spec: Some(K8sServiceSpec {
                selector: Some(labels),
                type_: Some(self.routing.service_type().to_string()),
                ports: Some(vec![ServicePort {
                    name: Some(self.port_name.clone()),
                    port: self.port,
                    target_port: Some(IntOrString::Int(self.target_port)),
                    node_port,
                    protocol: Some("TCP".to_string()),
                    ..Default::default()
                }]),
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}

/// Create the workload and return a reference for later get/delete
pub async fn declare_workload(api: &dyn ClusterApi, spec: &WorkloadSpec) -> Result<ResourceRef> {
    let created = api
        .create_deployment(&spec.namespace, spec.to_deployment())
        .await
        .with_context(|| {
            format!(
                "Failed to create Deployment {}/{}",
                spec.namespace, spec.name
            )
        })?;

    let resource = ResourceRef::new(
        ResourceKind::Deployment,
        created
            .metadata
            .namespace
            .unwrap_or_else(|| spec.namespace.clone()),
        created.metadata.name.unwrap_or_else(|| spec.name.clone()),
    );
    info!("Created Deployment {}", resource);

    Ok(resource)
}

/// Create the service and return a reference for later delete
pub async fn declare_service(api: &dyn ClusterApi, spec: &ServiceSpec) -> Result<ResourceRef> {
    let created = api
        .create_service(&spec.namespace, spec.to_service())
        .await
        .with_context(|| {
            format!(
                "Failed to create Service {}/{}",
                spec.namespace, spec.name
            )
        })?;

    let resource = ResourceRef::new(
        ResourceKind::Service,
        created
            .metadata
            .namespace
            .unwrap_or_else(|| spec.namespace.clone()),
        created.metadata.name.unwrap_or_else(|| spec.name.clone()),
    );
    info!("Created Service {}", resource);

    Ok(resource)
}

/// Delete a previously declared object
pub async fn delete_resource(api: &dyn ClusterApi, resource: &ResourceRef) -> Result<()> {
    let (namespace, name) = (&resource.namespace, &resource.name);
    info!("Delete {} {}", resource.kind, resource);

    let result = match resource.kind {
        ResourceKind::Deployment => api.delete_deployment(namespace, name).await,
        ResourceKind::Service => api.delete_service(namespace, name).await,
    };
    result.with_context(|| format!("Failed to delete {} {}", resource.kind, resource))?;

    info!("Deleted {} {}", resource.kind, resource);

    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::k8s::error::ClusterError;
    use crate::k8s::mock::{MockClusterApi, Operation};
    use std::io;
    use std::sync::{Arc, Mutex};

    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    pub(crate) fn hello_workload(binding: &LabelBinding) -> WorkloadSpec {
        WorkloadSpec {
            name: "hello-app1".to_string(),
            namespace: "default".to_string(),
            binding: binding.clone(),
            replicas: 1,
            container_name: "nginx-container".to_string(),
            image: "nginx:1.14.2".to_string(),
            container_port: 80,
            port_name: "http".to_string(),
        }
    }

    pub(crate) fn hello_service(binding: &LabelBinding) -> ServiceSpec {
        ServiceSpec {
            name: "hello-service".to_string(),
            namespace: "default".to_string(),
            binding: binding.clone(),
            port: 80,
            target_port: 80,
            node_port: Some(30080),
            routing: RoutingMode::NodeExposed,
            port_name: "http".to_string(),
        }
    }

    #[test]
    fn test_selector_matches_pod_template_labels() {
        let binding = LabelBinding::default();
        let deployment = hello_workload(&binding).to_deployment();
        let service = hello_service(&binding).to_service();

        let spec = deployment.spec.unwrap();
        let pod_labels = spec.template.metadata.unwrap().labels.unwrap();
        let selector = service.spec.unwrap().selector.unwrap();

        assert!(selector.iter().all(|(k, v)| pod_labels.get(k) == Some(v)));
        assert_eq!(spec.selector.match_labels.unwrap(), pod_labels);
        assert_eq!(deployment.metadata.labels.unwrap(), pod_labels);
        assert_eq!(service.metadata.labels.unwrap(), selector);
    }

    #[test]
    fn test_deployment_shape() {
        let deployment = hello_workload(&LabelBinding::default()).to_deployment();
        assert_eq!(deployment.metadata.name.as_deref(), Some("hello-app1"));

        let spec = deployment.spec.unwrap();
        assert_eq!(spec.replicas, Some(1));

        let pod_spec = spec.template.spec.unwrap();
        let container = &pod_spec.containers[0];
        assert_eq!(container.name, "nginx-container");
        assert_eq!(container.image.as_deref(), Some("nginx:1.14.2"));
        let port = &container.ports.as_ref().unwrap()[0];
        assert_eq!(port.container_port, 80);
        assert_eq!(port.protocol.as_deref(), Some("TCP"));
    }

    #[test]
    fn test_node_port_service_shape() {
        let service = hello_service(&LabelBinding::default()).to_service();
        let spec = service.spec.unwrap();
        assert_eq!(spec.type_.as_deref(), Some("NodePort"));

        let ports = spec.ports.unwrap();
        let port = &ports[0];
        assert_eq!(port.port, 80);
        assert_eq!(port.target_port, Some(IntOrString::Int(80)));
        assert_eq!(port.node_port, Some(30080));
    }

    #[test]
    fn test_cluster_local_drops_node_port() {
        let mut spec = hello_service(&LabelBinding::default());
        spec.routing = RoutingMode::ClusterLocal;
        let service = spec.to_service().spec.unwrap();
        assert_eq!(service.type_.as_deref(), Some("ClusterIP"));
        assert_eq!(service.ports.unwrap()[0].node_port, None);
    }

    #[tokio::test]
    async fn test_declare_then_get_returns_same_name() {
        let api = MockClusterApi::new();
        let workload = declare_workload(&api, &hello_workload(&LabelBinding::default()))
            .await
            .unwrap();
        assert_eq!(workload.to_string(), "default/hello-app1");

        let read = api
            .get_deployment(&workload.namespace, &workload.name)
            .await
            .unwrap();
        assert_eq!(read.metadata.name.as_deref(), Some("hello-app1"));
    }

    #[tokio::test]
    async fn test_duplicate_workload_conflicts() {
        let api = MockClusterApi::new();
        let binding = LabelBinding::default();
        let spec = hello_workload(&binding);
        tokio_test::assert_ok!(declare_workload(&api, &spec).await);

        let mut changed = spec.clone();
        changed.replicas = 5;
        let err = declare_workload(&api, &changed).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ClusterError>(),
            Some(ClusterError::AlreadyExists { .. })
        ));

        // existing object untouched
        let stored = api.deployment("default", "hello-app1").unwrap();
        assert_eq!(stored.spec.unwrap().replicas, Some(1));
        assert_eq!(api.count(Operation::CreateDeployment), 2);
    }

    #[tokio::test]
    async fn test_duplicate_service_conflicts() {
        let api = MockClusterApi::new();
        let spec = hello_service(&LabelBinding::default());
        tokio_test::assert_ok!(declare_service(&api, &spec).await);
        tokio_test::assert_err!(declare_service(&api, &spec).await);
    }

    #[tokio::test]
    async fn test_delete_resource() {
        let api = MockClusterApi::new();
        let service = declare_service(&api, &hello_service(&LabelBinding::default()))
            .await
            .unwrap();
        delete_resource(&api, &service).await.unwrap();
        assert!(api.service("default", "hello-service").is_none());

        let err = delete_resource(&api, &service).await.unwrap_err();
        assert!(err
            .to_string()
            .contains("Failed to delete Service default/hello-service"));
    }

    #[tokio::test]
    async fn test_delete_is_announced_before_the_call() {
        let logs = Arc::new(Mutex::new(Vec::new()));
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || LogBuffer(writer.clone()))
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let api = MockClusterApi::new();
        let spec = hello_workload(&LabelBinding::default());
        let workload = declare_workload(&api, &spec).await.unwrap();
        api.fail_on(Operation::DeleteDeployment);

        tokio_test::assert_err!(delete_resource(&api, &workload).await);

        let output = String::from_utf8(logs.lock().unwrap().clone()).unwrap();
        assert!(output.contains("Delete Deployment default/hello-app1"));
        assert!(!output.contains("Deleted Deployment"));
    }
}
