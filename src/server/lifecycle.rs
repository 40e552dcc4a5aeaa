//! Server lifecycle: `Running -> Draining -> Stopped`.

use std::fmt;
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::server::heartbeat::LivenessFailure;

/// Externally observable server phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Accepting connections and reporting liveness.
    Running,
    /// No longer accepting; in-flight connections are finishing.
    Draining,
    /// All connections closed or dropped.
    Stopped,
}

/// What started the shutdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownReason {
    /// Ctrl+C, SIGTERM, or the shutdown future passed to `Server::run`.
    Terminated,
    /// The heartbeat gave up on the load balancer.
    LoadBalancerDown(LivenessFailure),
}

impl ShutdownReason {
    /// Metric label for this reason.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Terminated => "terminated",
            Self::LoadBalancerDown(_) => "load_balancer_down",
        }
    }
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Terminated => f.write_str("termination requested"),
            Self::LoadBalancerDown(failure) => write!(f, "{failure}"),
        }
    }
}

/// Phase state plus the tokens that act on each transition.
#[derive(Debug)]
pub struct Lifecycle {
    phase: watch::Sender<Phase>,
    stop: CancellationToken,
    force: CancellationToken,
    grace_period: Duration,
}

impl Lifecycle {
    pub fn new(grace_period: Duration) -> Self {
        let (phase, _) = watch::channel(Phase::Running);
        Self {
            phase,
            stop: CancellationToken::new(),
            force: CancellationToken::new(),
            grace_period,
        }
    }

    pub fn phase(&self) -> Phase {
        *self.phase.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Phase> {
        self.phase.subscribe()
    }

    pub fn grace_period(&self) -> Duration {
        self.grace_period
    }

    /// Cancelled on entering `Draining`.
    pub fn stop_token(&self) -> CancellationToken {
        self.stop.clone()
    }

    /// Cancelled on entering `Stopped`.
    pub fn force_token(&self) -> CancellationToken {
        self.force.clone()
    }

    /// Move `Running -> Draining`. Returns false if already past `Running`.
    pub fn begin_drain(&self) -> bool {
        let entered = self.phase.send_if_modified(|phase| {
            if *phase == Phase::Running {
                *phase = Phase::Draining;
                true
            } else {
                false
            }
        });
        if entered {
            self.stop.cancel();
        }
        entered
    }

    /// Move to `Stopped`, dropping whatever is still running.
    pub fn finish(&self) {
        self.stop.cancel();
        self.force.cancel();
        self.phase.send_replace(Phase::Stopped);
    }
}

/// Resolves on Ctrl+C or, on Unix, SIGTERM.
///
/// If a handler cannot be installed the error is logged and that source is
/// ignored.
pub async fn termination_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C"),
        _ = terminate => info!("received SIGTERM"),
    }
}
