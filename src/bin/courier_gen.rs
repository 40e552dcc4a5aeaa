//! courier-gen: compile an IDL file into client and server stubs.

use std::path::PathBuf;

use clap::Parser;

use courier::compiler::{self, GenerateOptions};

/// Courier stub compiler
#[derive(Parser)]
#[command(name = "courier-gen")]
#[command(version = courier::PKG_VERSION)]
#[command(about = "Generate Courier client and server stubs from an IDL file")]
struct Args {
    /// IDL source file
    #[arg(long, default_value = "idl/calculator.idl")]
    idl: PathBuf,

    /// Output directory for the client stub
    #[arg(long, default_value = "client/stub")]
    client_out: PathBuf,

    /// Output directory for the server stub
    #[arg(long, default_value = "server/stub")]
    server_out: PathBuf,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let files = compiler::run(&GenerateOptions {
        input: args.idl,
        client_dir: args.client_out,
        server_dir: args.server_out,
    })?;

    println!("{}", files.client.display());
    println!("{}", files.server.display());
    Ok(())
}
