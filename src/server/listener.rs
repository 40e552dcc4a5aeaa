//! TLS accept loop.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_rustls::TlsAcceptor;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::dispatch::DispatchTable;
use crate::server::connection::handle_connection;
use crate::{CourierError, Result, telemetry};

/// Pause after a failed `accept`.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Handles the accept loop shares with the lifecycle.
#[derive(Debug, Clone)]
pub struct Connections {
    /// Every spawned connection task.
    pub tracker: TaskTracker,
    /// Cancelled when the server stops accepting.
    pub stop: CancellationToken,
    /// Cancelled when remaining connections must be dropped.
    pub force: CancellationToken,
    /// Deadline for the handshake, the request, and the response.
    pub read_timeout: Duration,
}

/// A bound TCP listener that terminates TLS.
pub struct TlsListener {
    listener: TcpListener,
    acceptor: TlsAcceptor,
}

impl TlsListener {
    pub async fn bind(addr: SocketAddr, tls: Arc<rustls::ServerConfig>) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| CourierError::Startup(format!("failed to bind {addr}: {e}")))?;
        Ok(Self {
            listener,
            acceptor: TlsAcceptor::from(tls),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until `connections.stop` is cancelled.
    ///
    /// Returns the listener so the caller decides when the socket closes.
    pub async fn serve(self, table: Arc<DispatchTable>, connections: Connections) -> Self {
        info!(addr = ?self.listener.local_addr().ok(), "accepting connections");
        loop {
            let accepted = tokio::select! {
                _ = connections.stop.cancelled() => break,
                accepted = self.listener.accept() => accepted,
            };
            if connections.stop.is_cancelled() {
                debug!("stop requested, dropping freshly accepted connection");
                break;
            }

            match accepted {
                Ok((tcp, peer)) => {
                    metrics::counter!(telemetry::CONNECTIONS_TOTAL).increment(1);
                    let acceptor = self.acceptor.clone();
                    let table = Arc::clone(&table);
                    let force = connections.force.clone();
                    let read_timeout = connections.read_timeout;
                    connections.tracker.spawn(async move {
                        metrics::gauge!(telemetry::CONNECTIONS_ACTIVE).increment(1.0);
                        tokio::select! {
                            _ = force.cancelled() => {
                                warn!(%peer, "connection dropped at end of grace period");
                            }
                            result = serve_one(acceptor, tcp, &table, read_timeout) => {
                                log_outcome(peer, result);
                            }
                        }
                        metrics::gauge!(telemetry::CONNECTIONS_ACTIVE).decrement(1.0);
                    });
                }
                Err(e) => {
                    error!(error = %e, "accept failed");
                    if !back_off(&connections.stop).await {
                        break;
                    }
                }
            }
        }
        info!("accept loop stopped");
        self
    }
}

async fn serve_one(
    acceptor: TlsAcceptor,
    tcp: TcpStream,
    table: &DispatchTable,
    read_timeout: Duration,
) -> Result<()> {
    let stream = timeout(read_timeout, acceptor.accept(tcp))
        .await
        .map_err(|_| CourierError::Connection("TLS handshake timed out".to_string()))?
        .map_err(|e| CourierError::Connection(format!("TLS handshake failed: {e}")))?;
    handle_connection(stream, table, read_timeout).await
}

/// Wait out [`ACCEPT_BACKOFF`]; `false` if `stop` fired first.
async fn back_off(stop: &CancellationToken) -> bool {
    tokio::select! {
        _ = stop.cancelled() => false,
        _ = tokio::time::sleep(ACCEPT_BACKOFF) => true,
    }
}

fn log_outcome(peer: SocketAddr, result: Result<()>) {
    match result {
        Ok(()) => debug!(%peer, "connection closed"),
        Err(e) if e.is_connection_scoped() => warn!(%peer, error = %e, "connection ended"),
        Err(e) => error!(%peer, error = %e, "connection failed"),
    }
}

#[cfg(test)]
mod tests {
    use tokio::time::Instant;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn back_off_waits_while_running() {
        let stop = CancellationToken::new();
        let started = Instant::now();
        assert!(back_off(&stop).await);
        assert!(started.elapsed() >= ACCEPT_BACKOFF);
    }

    #[tokio::test(start_paused = true)]
    async fn back_off_ends_on_stop() {
        let stop = CancellationToken::new();
        let started = Instant::now();
        let waiting = back_off(&stop);
        stop.cancel();
        assert!(!waiting.await);
        assert!(started.elapsed() < ACCEPT_BACKOFF);
    }
}
