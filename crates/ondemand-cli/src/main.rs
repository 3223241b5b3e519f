use std::time::Duration;

use clap::{Parser, Subcommand};

mod client;

/// Per-request bound for trigger calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Parser)]
#[command(
    name = "ondemandctl",
    about = "Relay start/stop commands to an ondemand daemon",
    version,
    propagate_version = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server instance
    Start {
        /// Start trigger URL
        #[arg(long, env = "ONDEMAND_START_URL")]
        url: String,
    },
    /// Stop the server instance if it is idle
    Stop {
        /// Idle-stop trigger URL
        #[arg(long, env = "ONDEMAND_STOP_URL")]
        url: String,
    },
    /// Show the instance state
    Status {
        /// Status URL
        #[arg(long, env = "ONDEMAND_STATUS_URL")]
        url: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("ondemandctl=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    let (method, url) = match cli.command {
        Commands::Start { url } => (http::Method::POST, url),
        Commands::Stop { url } => (http::Method::POST, url),
        Commands::Status { url } => (http::Method::GET, url),
    };

    let body = client::invoke(method, &url, REQUEST_TIMEOUT).await?;
    println!("{body}");
    Ok(())
}
