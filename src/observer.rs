/// Background loop reading the workload back from the API server
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::k8s::{ClusterApi, ResourceRef};

/// Polls one Deployment on a fixed interval until cancelled
pub struct Observer {
    api: Arc<dyn ClusterApi>,
    workload: ResourceRef,
    interval: Duration,
}

impl Observer {
    pub fn new(api: Arc<dyn ClusterApi>, workload: ResourceRef, interval: Duration) -> Self {
        Self {
            api,
            workload,
            interval,
        }
    }

    /// Run the loop on its own task
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<Result<u64>> {
        tokio::spawn(self.run(cancel))
    }

    /// Read, report, sleep, repeat.
    ///
    /// Returns the number of successful reads once `cancel` fires. A failed
    /// read ends the loop with the error.
    pub async fn run(self, cancel: CancellationToken) -> Result<u64> {
        let mut reads = 0u64;
        let ResourceRef { namespace, name, .. } = &self.workload;

        loop {
            let read = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                read = self.api.get_deployment(namespace, name) => read,
            };

            let deployment =
                read.with_context(|| format!("Failed to read Deployment {}", self.workload))?;
            reads += 1;

            info!(
                "Read Deployment {}/{}",
                namespace,
                deployment.metadata.name.as_deref().unwrap_or_default()
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        debug!("Observer for {} stopped after {} reads", self.workload, reads);
        Ok(reads)
    }
}
