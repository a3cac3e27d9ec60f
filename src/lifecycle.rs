/// Lifecycle controller: declare, observe, and tear down on signal
use anyhow::{Context, Result};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::k8s::{declare_service, declare_workload, delete_resource, ClusterApi, ResourceRef};
use crate::observer::Observer;

/// Controller state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Running,
    Draining,
    Terminated,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleState::Running => write!(f, "running"),
            LifecycleState::Draining => write!(f, "draining"),
            LifecycleState::Terminated => write!(f, "terminated"),
        }
    }
}

/// Drives the workload and service through create, observe, delete
pub struct Lifecycle {
    api: Arc<dyn ClusterApi>,
    config: AppConfig,
    state: Option<LifecycleState>,
}

impl Lifecycle {
    pub fn new(api: Arc<dyn ClusterApi>, config: AppConfig) -> Self {
        Self {
            api,
            config,
            state: None,
        }
    }

    pub fn state(&self) -> Option<LifecycleState> {
        self.state
    }

    fn transition(&mut self, next: LifecycleState) {
        debug!(
            "Lifecycle {} -> {}",
            self.state
                .map(|s| s.to_string())
                .unwrap_or_else(|| "starting".to_string()),
            next
        );
        self.state = Some(next);
    }

    /// Run until `shutdown` resolves, then delete what was created.
    ///
    /// Any failure returns immediately. Resources already created are left
    /// in place unless the failure happens during the delete phase.
    pub async fn run<F>(&mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = Result<()>>,
    {
        let workload_spec = self.config.workload_spec();
        let service_spec = self.config.service_spec();
        let workload = declare_workload(self.api.as_ref(), &workload_spec).await?;
        let service = declare_service(self.api.as_ref(), &service_spec).await?;

        let cancel = CancellationToken::new();
        let mut observer = Observer::new(
            self.api.clone(),
            workload.clone(),
            self.config.observer.interval(),
        )
        .spawn(cancel.clone());
        self.transition(LifecycleState::Running);

        info!("Waiting for kill signal...");
        tokio::select! {
            signal = shutdown => signal.context("Failed to wait for shutdown signal")?,
            joined = &mut observer => {
                joined.context("Observer task panicked")??;
                anyhow::bail!("Observer stopped before shutdown");
            }
        }

        self.transition(LifecycleState::Draining);
        cancel.cancel();
        observer.await.context("Observer task panicked")??;

        drain(self.api.as_ref(), &workload, &service).await?;
        self.transition(LifecycleState::Terminated);

        Ok(())
    }
}

/// Delete the workload, then the service. Stops at the first failure.
pub async fn drain(
    api: &dyn ClusterApi,
    workload: &ResourceRef,
    service: &ResourceRef,
) -> Result<()> {
    delete_resource(api, workload).await?;
    delete_resource(api, service).await?;
    Ok(())
}

/// Resolve on SIGINT or SIGTERM
#[cfg(unix)]
pub async fn wait_for_signal() -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())
        .context("Failed to register SIGTERM handler")?;

    tokio::select! {
        res = tokio::signal::ctrl_c() => {
            res.context("Failed to listen for SIGINT")?;
            info!("SIGINT received, shutting down");
        }
        _ = sigterm.recv() => {
            info!("SIGTERM received, shutting down");
        }
    }

    Ok(())
}

/// Resolve on Ctrl+C
#[cfg(not(unix))]
pub async fn wait_for_signal() -> Result<()> {
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;
    info!("Ctrl+C received, shutting down");
    Ok(())
}
