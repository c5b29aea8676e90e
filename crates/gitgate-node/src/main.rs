//! Gitgate Node - git smart/dumb HTTP gateway.

use anyhow::Context;
use clap::Parser;
use gitgate_node::api::{create_router, AppState};
use gitgate_node::config::Config;
use gitgate_node::observability::{init_logging, LogFormat};
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;

/// Gitgate Node - serve git repositories over HTTP
#[derive(Parser, Debug)]
#[command(name = "gitgate-node")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to a YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// HTTP listen address
    #[arg(long)]
    listen_addr: Option<SocketAddr>,

    /// Directory containing the served repositories
    #[arg(long)]
    project_root: Option<PathBuf>,

    /// Path to the git executable
    #[arg(long)]
    git_bin: Option<PathBuf>,

    /// Path prefix in front of every repository URL
    #[arg(long)]
    route_prefix: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Log format (pretty, json)
    #[arg(long)]
    log_format: Option<String>,
}

impl Args {
    fn into_config(self) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };

        if let Some(addr) = self.listen_addr {
            config.listen_addr = addr;
        }
        if let Some(root) = self.project_root {
            config.project_root = root;
        }
        if let Some(git_bin) = self.git_bin {
            config.git_bin_path = git_bin;
        }
        if let Some(prefix) = self.route_prefix {
            config.route_prefix = prefix;
        }
        if let Some(level) = self.log_level {
            config.log_level = level;
        }
        if let Some(format) = self.log_format {
            config.log_format = format;
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Args::parse().into_config()?;

    init_logging(&config.log_level, LogFormat::parse(&config.log_format));

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting gitgate node");
    tracing::info!(
        listen_addr = %config.listen_addr,
        project_root = %config.project_root.display(),
        git_bin = %config.git_bin_path.display(),
        upload_pack = config.upload_pack,
        receive_pack = config.receive_pack,
        route_prefix = %config.route_prefix,
        "Gateway configuration"
    );

    let listener = TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;

    let app = create_router(AppState::new(config));

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Gitgate node stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}
