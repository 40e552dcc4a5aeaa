//! RPC server: TLS listener, connection handling, heartbeat and lifecycle.
//!
//! This module provides:
//! - Configuration types (`config`)
//! - The per-connection protocol engine (`connection`)
//! - The TLS accept loop (`listener`)
//! - Liveness reporting to the load balancer (`heartbeat`)
//! - The `Running -> Draining -> Stopped` state machine (`lifecycle`)
//!
//! [`Server`] wires them together. `run` serves until a termination signal
//! or a heartbeat failure, drains for the grace period, then drops whatever
//! is still connected.

pub mod config;
pub mod connection;
pub mod heartbeat;
pub mod lifecycle;
pub mod listener;

use std::future::Future;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{oneshot, watch};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{error, info, warn};

use crate::dispatch::DispatchTable;
use crate::{Result, telemetry, tls};

pub use config::Config;
pub use connection::handle_connection;
pub use heartbeat::{HeartbeatReporter, LivenessFailure, LivenessReporter, TcpLivenessReporter};
pub use lifecycle::{Lifecycle, Phase, ShutdownReason, termination_signal};
pub use listener::{Connections, TlsListener};

/// How long force-closed connections get to unwind after the grace period.
const FORCE_CLOSE_WAIT: Duration = Duration::from_millis(250);

/// A bound server, ready to run.
pub struct Server {
    listener: TlsListener,
    table: Arc<DispatchTable>,
    lifecycle: Lifecycle,
    read_timeout: Duration,
    heartbeat: Option<HeartbeatReporter>,
}

impl Server {
    /// Load TLS material and bind the listener.
    ///
    /// Fails with a startup error if the certificate or key is unusable or
    /// the address cannot be bound.
    pub async fn bind(config: &Config, table: DispatchTable) -> Result<Self> {
        config.validate()?;
        let tls = tls::server_config(&config.tls.cert_path, &config.tls.key_path)?;
        let listener = TlsListener::bind(config.listen_addr()?, tls).await?;
        let local_addr = listener.local_addr()?;
        info!(addr = %local_addr, methods = table.len(), "server bound");

        let heartbeat = config.heartbeat.enabled.then(|| {
            let reporter = TcpLivenessReporter::new(
                config.heartbeat.load_balancer.clone(),
                advertised_address(config, local_addr),
                config.heartbeat_timeout(),
            );
            HeartbeatReporter::new(
                Arc::new(reporter),
                config.heartbeat_interval(),
                config.heartbeat.failure_threshold,
            )
        });

        Ok(Self {
            listener,
            table: Arc::new(table),
            lifecycle: Lifecycle::new(config.grace_period()),
            read_timeout: config.read_timeout(),
            heartbeat,
        })
    }

    /// Replace the configured heartbeat.
    pub fn with_heartbeat(mut self, heartbeat: HeartbeatReporter) -> Self {
        self.heartbeat = Some(heartbeat);
        self
    }

    pub fn without_heartbeat(mut self) -> Self {
        self.heartbeat = None;
        self
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Watch the lifecycle phase. Subscribe before calling [`run`](Self::run).
    pub fn phase(&self) -> watch::Receiver<Phase> {
        self.lifecycle.subscribe()
    }

    /// Serve until `shutdown` resolves or the heartbeat gives up, then drain.
    pub async fn run<F>(self, shutdown: F) -> Result<ShutdownReason>
    where
        F: Future<Output = ()>,
    {
        let Server {
            listener,
            table,
            lifecycle,
            read_timeout,
            heartbeat,
        } = self;

        let tracker = TaskTracker::new();
        let accept = tokio::spawn(listener.serve(
            table,
            Connections {
                tracker: tracker.clone(),
                stop: lifecycle.stop_token(),
                force: lifecycle.force_token(),
                read_timeout,
            },
        ));

        let heartbeat_cancel = CancellationToken::new();
        let (failed_tx, mut failed_rx) = oneshot::channel();
        let heartbeat_task =
            heartbeat.map(|h| tokio::spawn(h.run(failed_tx, heartbeat_cancel.clone())));

        let reason = tokio::select! {
            _ = shutdown => ShutdownReason::Terminated,
            Ok(failure) = &mut failed_rx => ShutdownReason::LoadBalancerDown(failure),
        };
        match &reason {
            ShutdownReason::Terminated => info!("shutdown requested, draining"),
            ShutdownReason::LoadBalancerDown(failure) => {
                warn!(%failure, "load balancer down, draining")
            }
        }
        metrics::counter!(telemetry::SHUTDOWNS_TOTAL, "reason" => reason.label()).increment(1);

        lifecycle.begin_drain();
        heartbeat_cancel.cancel();
        if let Some(task) = heartbeat_task {
            if let Err(e) = task.await {
                error!(error = %e, "heartbeat task failed");
            }
        }

        let listener = match accept.await {
            Ok(listener) => Some(listener),
            Err(e) => {
                error!(error = %e, "accept loop failed");
                None
            }
        };

        tracker.close();
        if timeout(lifecycle.grace_period(), tracker.wait()).await.is_err() {
            warn!(
                remaining = tracker.len(),
                grace_period = ?lifecycle.grace_period(),
                "grace period elapsed, dropping remaining connections"
            );
        }

        lifecycle.finish();
        drop(listener);
        if timeout(FORCE_CLOSE_WAIT, tracker.wait()).await.is_err() {
            warn!(remaining = tracker.len(), "connections still unwinding at stop");
        }
        info!(%reason, "server stopped");
        Ok(reason)
    }
}

/// Address announced to the load balancer.
fn advertised_address(config: &Config, local_addr: SocketAddr) -> String {
    if let Some(advertise) = &config.heartbeat.advertise {
        return advertise.clone();
    }
    let mut addr = local_addr;
    if addr.ip().is_unspecified() {
        let loopback: IpAddr = match addr.ip() {
            IpAddr::V4(_) => Ipv4Addr::LOCALHOST.into(),
            IpAddr::V6(_) => Ipv6Addr::LOCALHOST.into(),
        };
        addr.set_ip(loopback);
    }
    addr.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advertises_loopback_for_wildcard_bind() {
        let config = Config::default();
        let addr: SocketAddr = "0.0.0.0:8081".parse().unwrap();
        assert_eq!(advertised_address(&config, addr), "127.0.0.1:8081");

        let addr: SocketAddr = "10.1.2.3:8081".parse().unwrap();
        assert_eq!(advertised_address(&config, addr), "10.1.2.3:8081");
    }

    #[test]
    fn explicit_advertise_wins() {
        let mut config = Config::default();
        config.heartbeat.advertise = Some("svc.internal:9000".to_string());
        let addr: SocketAddr = "0.0.0.0:8081".parse().unwrap();
        assert_eq!(advertised_address(&config, addr), "svc.internal:9000");
    }
}
