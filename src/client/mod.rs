//! Client library for calling a courier server.
//!
//! Provides [`Client`], the connection factory generated client stubs wrap.
//! Each call opens its own TLS connection, sends one request and waits for
//! one response; there is no pooling.

mod rpc_client;

pub use rpc_client::{Client, ClientConfig};
