//! One-shot RPC calls over TLS.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use rustls::pki_types::ServerName;
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::TlsConnector;
use tokio_util::codec::Framed;
use tracing::debug;

use crate::protocol::{self, Params, Request, Response};
use crate::{CourierError, Result, tls};

/// Where and how a [`Client`] connects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// `host:port` of the server or load balancer (default: 127.0.0.1:8080).
    pub address: String,
    /// Name the server certificate must be valid for (default: localhost).
    pub server_name: String,
    /// PEM bundle of trusted certificates (default: lb.crt).
    pub ca_cert: PathBuf,
    /// Deadline for connecting, the handshake, and the response (default: 5s).
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:8080".to_string(),
            server_name: "localhost".to_string(),
            ca_cert: PathBuf::from("lb.crt"),
            timeout: Duration::from_secs(5),
        }
    }
}

/// Opens a fresh TLS connection for every call.
#[derive(Clone)]
pub struct Client {
    address: String,
    server_name: ServerName<'static>,
    connector: TlsConnector,
    timeout: Duration,
}

impl Client {
    /// Build a client, loading the trusted certificates from `config.ca_cert`.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let tls = tls::client_config(&config.ca_cert)?;
        Self::with_tls_config(&config.address, &config.server_name, tls, config.timeout)
    }

    /// Build a client from an existing rustls configuration.
    pub fn with_tls_config(
        address: &str,
        server_name: &str,
        tls: Arc<rustls::ClientConfig>,
        timeout: Duration,
    ) -> Result<Self> {
        let server_name = ServerName::try_from(server_name.to_owned()).map_err(|e| {
            CourierError::Configuration(format!("invalid server name {server_name:?}: {e}"))
        })?;
        Ok(Self {
            address: address.to_owned(),
            server_name,
            connector: TlsConnector::from(tls),
            timeout,
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Call `method` with `params` and return the `result` value.
    ///
    /// An `{"error": ...}` response becomes [`CourierError::Remote`].
    pub async fn call(&self, method: &str, params: Params) -> Result<Value> {
        let line = Request::new(method, params).encode()?;

        let tcp = timeout(self.timeout, TcpStream::connect(&self.address))
            .await
            .map_err(|_| {
                CourierError::Connection(format!("connecting to {} timed out", self.address))
            })?
            .map_err(|e| {
                CourierError::Connection(format!("failed to connect to {}: {e}", self.address))
            })?;

        let stream = timeout(
            self.timeout,
            self.connector.connect(self.server_name.clone(), tcp),
        )
        .await
        .map_err(|_| CourierError::Connection("TLS handshake timed out".to_string()))?
        .map_err(|e| CourierError::Connection(format!("TLS handshake failed: {e}")))?;

        let mut framed = Framed::new(stream, protocol::envelope_codec());
        timeout(self.timeout, framed.send(line))
            .await
            .map_err(|_| CourierError::Connection("sending request timed out".to_string()))??;

        let reply = match timeout(self.timeout, framed.next()).await {
            Err(_) => {
                return Err(CourierError::Connection(format!(
                    "no response within {:?}",
                    self.timeout
                )));
            }
            Ok(None) => {
                return Err(CourierError::Connection(
                    "server closed the connection without responding".to_string(),
                ));
            }
            Ok(Some(line)) => line?,
        };
        debug!(method, address = %self.address, "response received");

        match Response::decode(&reply)? {
            Response::Result(value) => Ok(value),
            Response::Error(message) => Err(CourierError::Remote(message)),
        }
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("address", &self.address)
            .field("server_name", &self.server_name)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
