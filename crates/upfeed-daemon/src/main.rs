//! Market data feed daemon - entry point.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use upfeed_daemon::{Application, DaemonConfig};

/// Upstox market data feed daemon.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via UPFEED_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the feed service and keep it running
    Start,
    /// Request a graceful stop of the running service
    Stop,
    /// Run one supervision pass, restarting the service if needed
    HealthCheck,
    /// Start the service with periodic in-process health checks
    Run,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    upfeed_daemon::logging::init_logging();
    info!("upfeed v{}", env!("CARGO_PKG_VERSION"));

    let config = DaemonConfig::load(args.config.as_deref())?;
    info!(
        authorize_url = %config.authorize_url,
        namespace = %config.namespace,
        instruments = config.instruments.len(),
        "configuration loaded"
    );

    let app = Application::build(&config).await?;

    match args.command {
        Command::Start => app.start().await?,
        Command::Stop => app.stop().await?,
        Command::HealthCheck => app.health_check().await?,
        Command::Run => app.run().await?,
    }

    Ok(())
}
