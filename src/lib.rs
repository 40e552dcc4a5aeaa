//! Courier - a small RPC toolchain over TLS
//!
//! The crate has three parts:
//!
//! - [`compiler`] parses the IDL and emits client and server stubs.
//! - [`Server`] accepts TLS connections, answers one request per connection
//!   through a [`DispatchTable`], reports liveness to a load balancer and
//!   shuts down gracefully.
//! - [`Client`] is what generated client stubs call through.
//!
//! # Serving a generated service
//!
//! ```rust,no_run
//! use courier::calculator::{Arithmetic, dispatch_table};
//! use courier::server::{Config, Server, termination_signal};
//!
//! #[tokio::main]
//! async fn main() -> courier::Result<()> {
//!     let config = Config::load(None)?;
//!     let server = Server::bind(&config, dispatch_table(Arithmetic)).await?;
//!     let reason = server.run(termination_signal()).await?;
//!     println!("stopped: {reason}");
//!     Ok(())
//! }
//! ```
//!
//! # Calling it
//!
//! ```rust,no_run
//! use courier::calculator::CalculatorClient;
//! use courier::{Client, ClientConfig};
//!
//! #[tokio::main]
//! async fn main() -> courier::Result<()> {
//!     let calculator = CalculatorClient::from(Client::new(&ClientConfig::default())?);
//!     assert_eq!(calculator.add(2, 3).await?, 5);
//!     Ok(())
//! }
//! ```

// Generated stubs name this crate as `courier::`, including inside it.
extern crate self as courier;

pub mod calculator;
pub mod client;
pub mod compiler;
pub mod dispatch;
pub mod error;
pub mod protocol;
pub mod server;
pub mod telemetry;
pub mod tls;
pub mod version;

// Re-export main types at crate root
pub use client::{Client, ClientConfig};
pub use dispatch::{DispatchTable, DispatchTableBuilder, HandlerError, HandlerResult};
pub use error::{CourierError, Result};
pub use protocol::{Params, Request, Response};
pub use server::Server;
pub use version::{PKG_VERSION, version_string};
