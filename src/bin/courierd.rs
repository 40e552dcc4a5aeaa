//! courierd: Courier RPC server.
//!
//! Serves the Calculator service over TLS, reports liveness to the load
//! balancer, and drains gracefully on SIGTERM / Ctrl+C or when the load
//! balancer stops answering.

use std::time::Duration;

use clap::Parser;
use tracing::info;

use courier::calculator::{Arithmetic, dispatch_table};
use courier::server::config::Config;
use courier::server::{Server, ShutdownReason, termination_signal};

/// Courier RPC server.
#[derive(Parser)]
#[command(name = "courierd")]
#[command(version = courier::PKG_VERSION)]
#[command(about = "Courier RPC server")]
struct Args {
    /// Port to listen on, replacing the port of the configured address
    /// (default: 8081).
    #[arg(short, long, env = "COURIERD_PORT")]
    port: Option<u16>,

    /// Path to configuration file.
    #[arg(short, long)]
    config: Option<std::path::PathBuf>,
}

/// Upper bound on waiting for abandoned handlers once the server has stopped.
const RUNTIME_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(serve());
    runtime.shutdown_timeout(RUNTIME_SHUTDOWN_TIMEOUT);
    result
}

async fn serve() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    // Load configuration
    let mut config = Config::load(args.config.as_deref())?;
    if let Some(port) = args.port {
        config = config.with_port(port);
    }
    info!(
        version = courier::version_string(),
        address = %config.server.address,
        "courierd starting"
    );

    let server = Server::bind(&config, dispatch_table(Arithmetic)).await?;
    match server.run(termination_signal()).await? {
        ShutdownReason::Terminated => info!("courierd stopped"),
        ShutdownReason::LoadBalancerDown(failure) => {
            info!(%failure, "courierd stopped after losing the load balancer")
        }
    }

    Ok(())
}
