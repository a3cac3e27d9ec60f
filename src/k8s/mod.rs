/// Kubernetes API access: connection, typed calls, and resource declarations
pub mod api;
pub mod binding;
pub mod client;
pub mod error;
#[cfg(test)]
pub mod mock;
pub mod resources;

pub use api::{ClusterApi, KubeClusterApi, ResourceRef};
pub use binding::LabelBinding;
pub use client::{connect, ConnectionMode};
pub use resources::{
    declare_service, declare_workload, delete_resource, RoutingMode, ServiceSpec, WorkloadSpec,
};
