//! ondemandd — the on-demand instance daemon.
//!
//! Single binary that wires the lifecycle subsystems together:
//! - Configuration (ondemand.toml + environment)
//! - Instance controller (HTTP control plane or in-memory simulation)
//! - Start / idle-stop handlers
//! - Idle-check loop
//! - HTTP trigger surface
//!
//! # Usage
//!
//! ```text
//! ondemandd serve --config /etc/ondemand/ondemand.toml
//! ondemandd check --config /etc/ondemand/ondemand.toml   # one idle check, for external schedulers
//! ```

mod provider;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::signal;
use tokio::sync::watch;
use tracing::info;

use ondemand_core::OndemandConfig;
use ondemand_lifecycle::{IdleStopScheduler, Lifecycle};

const DEFAULT_CONFIG: &str = "ondemand.toml";

#[derive(Parser)]
#[command(name = "ondemandd", about = "On-demand instance daemon", version)]
struct Cli {
    /// Path to ondemand.toml. Defaults to ./ondemand.toml when present.
    #[arg(short, long, global = true, env = "ONDEMAND_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP triggers and run the idle-check loop.
    Serve {
        /// Listen address, overrides [server].listen.
        #[arg(long)]
        listen: Option<String>,

        /// Disable the in-process idle-check loop (an external scheduler calls POST /stop).
        #[arg(long)]
        no_idle_check: bool,
    },
    /// Run one idle-stop check and print the result as JSON.
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,ondemand=debug")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            listen,
            no_idle_check,
        } => {
            let mut config = load_config(cli.config.as_deref())?;
            if let Some(listen) = listen {
                config.server.listen = listen;
            }
            if no_idle_check {
                config.idle_check.enabled = false;
            }
            config.validate()?;
            run_serve(config).await
        }
        Command::Check => {
            let config = load_config(cli.config.as_deref())?;
            config.validate()?;
            run_check(config).await
        }
    }
}

/// Read the config file (if any) and apply environment overrides.
fn load_config(path: Option<&Path>) -> anyhow::Result<OndemandConfig> {
    let config = match path {
        Some(path) => OndemandConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None if Path::new(DEFAULT_CONFIG).exists() => {
            OndemandConfig::from_file(Path::new(DEFAULT_CONFIG))?
        }
        None => OndemandConfig::default(),
    };
    Ok(config.apply_env(|key| std::env::var(key).ok()))
}

async fn run_serve(config: OndemandConfig) -> anyhow::Result<()> {
    let instance = config.instance_ref();
    info!(%instance, provider = ?config.provider.kind, "ondemand daemon starting");

    // ── Initialize subsystems ──────────────────────────────────

    let controller = provider::build_controller(&config)?;
    let lifecycle = Lifecycle::new(instance, controller);
    info!("lifecycle handlers initialized");

    // ── Shutdown signal ────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // ── Idle-check loop ────────────────────────────────────────

    let idle_handle = if config.idle_check.enabled {
        let interval = config.idle_interval()?;
        let scheduler = IdleStopScheduler::new(lifecycle.clone());
        let shutdown = shutdown_rx.clone();
        Some(tokio::spawn(async move {
            scheduler.run(interval, shutdown).await;
        }))
    } else {
        info!("idle-check loop disabled");
        None
    };

    // ── HTTP server ────────────────────────────────────────────

    let router = ondemand_api::build_router(lifecycle);
    let addr = config.listen_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "API server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            info!("shutdown signal received");
            let _ = shutdown_tx.send(true);
        })
        .await?;

    if let Some(handle) = idle_handle {
        let _ = handle.await;
    }

    info!("ondemand daemon stopped");
    Ok(())
}

async fn run_check(config: OndemandConfig) -> anyhow::Result<()> {
    let controller = provider::build_controller(&config)?;
    let lifecycle = Lifecycle::new(config.instance_ref(), controller);

    let result = lifecycle
        .handle_idle_stop()
        .await
        .context("idle-stop check failed")?;
    println!("{}", serde_json::to_string(&result)?);
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install CTRL+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
