/// kube-hello - Deployment and NodePort Service lifecycle demo
///
/// Creates an nginx Deployment and a NodePort Service bound to it by a shared
/// label, reads the Deployment back every second, and deletes both on
/// SIGINT/SIGTERM.
mod config;
mod k8s;
mod lifecycle;
mod observer;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::AppConfig;
use crate::k8s::{ConnectionMode, KubeClusterApi};
use crate::lifecycle::{wait_for_signal, Lifecycle};

#[derive(Parser)]
#[command(name = "kube-hello")]
#[command(about = "Create a Deployment and Service, watch it, clean up on exit")]
struct Cli {
    /// Use ~/.kube/config instead of the in-cluster service account
    #[arg(long)]
    outside_cluster: bool,

    /// Kubeconfig path used with --outside-cluster
    #[arg(long)]
    kubeconfig: Option<PathBuf>,

    /// Configuration file path (built-in demo values when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Namespace override
    #[arg(short, long)]
    namespace: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("kube_hello={}", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run(cli).await {
        error!("Error: {:#}", e);
        std::process::exit(1);
    }
}

/// Load configuration for this run
fn load_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = match &cli.config {
        Some(path) => AppConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration {}", path.display()))?,
        None => AppConfig::example(),
    };

    if let Some(namespace) = &cli.namespace {
        config.namespace = namespace.clone();
        config.validate()?;
    }

    Ok(config)
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;

    let mode = ConnectionMode::from_flags(cli.outside_cluster, cli.kubeconfig.clone());
    let client = k8s::connect(&mode)
        .await
        .context("Failed to connect to the Kubernetes API")?;

    info!("Namespace: {}", config.namespace);
    info!("Label binding: {}", config.binding.selector());

    let api = Arc::new(KubeClusterApi::new(client));
    let mut lifecycle = Lifecycle::new(api, config);
    lifecycle.run(wait_for_signal()).await?;

    if let Some(state) = lifecycle.state() {
        info!("✓ Deployment and Service removed, lifecycle {}", state);
    }

    Ok(())
}
