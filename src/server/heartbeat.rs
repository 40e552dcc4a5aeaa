//! Liveness reporting to the load balancer.
//!
//! [`HeartbeatReporter`] calls a [`LivenessReporter`] on a fixed interval.
//! Once `failure_threshold` reports in a row have failed it sends a single
//! [`LivenessFailure`] and stops; the lifecycle treats that as the signal to
//! drain and exit.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::time::{MissedTickBehavior, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{CourierError, Result, telemetry};

/// Sent once when the load balancer has been unreachable for too long.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LivenessFailure {
    pub consecutive_failures: u32,
    pub last_error: String,
}

impl fmt::Display for LivenessFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "load balancer unreachable after {} consecutive failures (last: {})",
            self.consecutive_failures, self.last_error
        )
    }
}

/// One liveness report.
#[async_trait]
pub trait LivenessReporter: Send + Sync {
    async fn report(&self) -> Result<()>;
}

#[derive(Serialize)]
struct HeartbeatMessage<'a> {
    heartbeat: HeartbeatBody<'a>,
}

#[derive(Serialize)]
struct HeartbeatBody<'a> {
    address: &'a str,
}

/// Reports by writing `{"heartbeat":{"address":...}}` on a fresh TCP connection.
#[derive(Debug, Clone)]
pub struct TcpLivenessReporter {
    load_balancer: String,
    advertise: String,
    timeout: Duration,
}

impl TcpLivenessReporter {
    pub fn new(
        load_balancer: impl Into<String>,
        advertise: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            load_balancer: load_balancer.into(),
            advertise: advertise.into(),
            timeout,
        }
    }

    async fn send(&self, line: &[u8]) -> Result<()> {
        let mut stream = TcpStream::connect(&self.load_balancer).await?;
        stream.write_all(line).await?;
        stream.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl LivenessReporter for TcpLivenessReporter {
    async fn report(&self) -> Result<()> {
        let mut line = serde_json::to_vec(&HeartbeatMessage {
            heartbeat: HeartbeatBody {
                address: &self.advertise,
            },
        })?;
        line.push(b'\n');

        timeout(self.timeout, self.send(&line))
            .await
            .map_err(|_| {
                CourierError::Connection(format!(
                    "heartbeat to {} timed out after {:?}",
                    self.load_balancer, self.timeout
                ))
            })?
    }
}

/// Drives periodic liveness reports.
pub struct HeartbeatReporter {
    reporter: Arc<dyn LivenessReporter>,
    interval: Duration,
    failure_threshold: u32,
}

impl HeartbeatReporter {
    pub fn new(
        reporter: Arc<dyn LivenessReporter>,
        interval: Duration,
        failure_threshold: u32,
    ) -> Self {
        Self {
            reporter,
            interval,
            failure_threshold: failure_threshold.max(1),
        }
    }

    /// Report until cancelled or until the failure threshold is reached.
    ///
    /// The first report is sent immediately.
    pub async fn run(self, failed: oneshot::Sender<LivenessFailure>, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut consecutive_failures = 0u32;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let outcome = tokio::select! {
                _ = cancel.cancelled() => break,
                outcome = self.reporter.report() => outcome,
            };

            match outcome {
                Ok(()) => {
                    metrics::counter!(telemetry::HEARTBEATS_TOTAL, "status" => "ok").increment(1);
                    if consecutive_failures > 0 {
                        info!(consecutive_failures, "load balancer reachable again");
                    }
                    consecutive_failures = 0;
                    debug!("heartbeat sent");
                }
                Err(e) => {
                    metrics::counter!(telemetry::HEARTBEATS_TOTAL, "status" => "error")
                        .increment(1);
                    consecutive_failures += 1;
                    warn!(
                        consecutive_failures,
                        threshold = self.failure_threshold,
                        error = %e,
                        "heartbeat failed"
                    );
                    if consecutive_failures >= self.failure_threshold {
                        let failure = LivenessFailure {
                            consecutive_failures,
                            last_error: e.to_string(),
                        };
                        if failed.send(failure).is_err() {
                            debug!("liveness failure raised after lifecycle stopped listening");
                        }
                        return;
                    }
                }
            }
        }
        debug!("heartbeat cancelled");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    /// Replays a scripted sequence of outcomes, then keeps failing.
    struct Scripted {
        outcomes: Mutex<Vec<bool>>,
        calls: AtomicU32,
    }

    impl Scripted {
        fn new(mut outcomes: Vec<bool>) -> Arc<Self> {
            outcomes.reverse();
            Arc::new(Self {
                outcomes: Mutex::new(outcomes),
                calls: AtomicU32::new(0),
            })
        }
    }

    #[async_trait]
    impl LivenessReporter for Scripted {
        async fn report(&self) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.outcomes.lock().unwrap().pop() {
                Some(true) => Ok(()),
                _ => Err(CourierError::Connection("refused".into())),
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn success_resets_the_failure_count() {
        let reporter = Scripted::new(vec![false, false, true, false, false, false]);
        let (tx, rx) = oneshot::channel();
        let heartbeat = HeartbeatReporter::new(reporter.clone(), Duration::from_millis(10), 3);

        heartbeat.run(tx, CancellationToken::new()).await;

        let failure = rx.await.unwrap();
        assert_eq!(failure.consecutive_failures, 3);
        assert_eq!(reporter.calls.load(Ordering::SeqCst), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_without_signal() {
        let reporter = Scripted::new(vec![true; 100]);
        let (tx, rx) = oneshot::channel();
        let cancel = CancellationToken::new();
        let task = tokio::spawn(
            HeartbeatReporter::new(reporter, Duration::from_millis(10), 3).run(tx, cancel.clone()),
        );

        tokio::time::sleep(Duration::from_millis(35)).await;
        cancel.cancel();
        task.await.unwrap();

        assert!(rx.await.is_err());
    }
}
