//! courier: Courier CLI client
//!
//! Calls the Calculator service, or any method by name.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use courier::calculator::CalculatorClient;
use courier::{Client, ClientConfig, CourierError, Params};

/// Courier CLI client
#[derive(Parser)]
#[command(name = "courier")]
#[command(version = courier::PKG_VERSION)]
#[command(about = "Courier RPC client")]
struct Args {
    /// Server or load balancer address
    #[arg(short, long, env = "COURIER_ADDRESS", default_value = "127.0.0.1:8080")]
    address: String,

    /// Name the server certificate must be valid for
    #[arg(long, default_value = "localhost")]
    server_name: String,

    /// PEM file with the trusted certificate(s)
    #[arg(long, env = "COURIER_CA_CERT", default_value = "lb.crt")]
    ca_cert: PathBuf,

    /// Deadline for each step of the call, in milliseconds
    #[arg(long, default_value_t = 5000)]
    timeout_ms: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Add two integers
    Add {
        #[arg(allow_hyphen_values = true)]
        a: i64,
        #[arg(allow_hyphen_values = true)]
        b: i64,
    },

    /// Subtract the second integer from the first
    Sub {
        #[arg(allow_hyphen_values = true)]
        a: i64,
        #[arg(allow_hyphen_values = true)]
        b: i64,
    },

    /// Call any method with a JSON object of parameters
    Call {
        /// Wire method name (e.g. "Add")
        method: String,
        /// Parameters as a JSON object (default: {})
        params: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialise tracing (default: warn for CLI; override with RUST_LOG).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();
    let client = Client::new(&ClientConfig {
        address: args.address,
        server_name: args.server_name,
        ca_cert: args.ca_cert,
        timeout: Duration::from_millis(args.timeout_ms),
    })?;

    match args.command {
        Command::Add { a, b } => {
            let result = CalculatorClient::from(client).add(a, b).await?;
            println!("{result}");
        }

        Command::Sub { a, b } => {
            let result = CalculatorClient::from(client).sub(a, b).await?;
            println!("{result}");
        }

        Command::Call { method, params } => {
            let params = parse_params(params.as_deref())?;
            let result = client.call(&method, params).await?;
            println!("{result}");
        }
    }

    Ok(())
}

fn parse_params(raw: Option<&str>) -> Result<Params, CourierError> {
    match raw {
        None => Ok(Params::new()),
        Some(text) => match serde_json::from_str(text)? {
            serde_json::Value::Object(params) => Ok(params),
            other => Err(CourierError::Configuration(format!(
                "params must be a JSON object, got {other}"
            ))),
        },
    }
}
