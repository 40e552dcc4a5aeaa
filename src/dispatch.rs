//! Method-name to handler routing.
//!
//! A [`DispatchTable`] is assembled once through [`DispatchTableBuilder`]
//! (normally by a generated `dispatch_table` function) and is immutable
//! afterwards, so connection tasks share it behind an `Arc` without locking.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tracing::{debug, error, warn};

use crate::protocol::{Params, ProtocolError, Request, Response};
use crate::telemetry;

/// Error type returned by business logic.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Result type returned by business logic.
pub type HandlerResult<T> = std::result::Result<T, HandlerError>;

type Handler = Arc<dyn Fn(&Params) -> HandlerResult<Value> + Send + Sync>;

/// Frozen mapping from wire method name to handler.
pub struct DispatchTable {
    handlers: BTreeMap<String, Handler>,
}

impl DispatchTable {
    pub fn builder() -> DispatchTableBuilder {
        DispatchTableBuilder::default()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn contains(&self, method: &str) -> bool {
        self.handlers.contains_key(method)
    }

    /// Registered method names in sorted order.
    pub fn methods(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    /// Run the handler for `request.method` on the calling thread and
    /// package its outcome.
    ///
    /// Unregistered methods get the fixed [`UNKNOWN_METHOD`] error.
    ///
    /// [`UNKNOWN_METHOD`]: crate::protocol::UNKNOWN_METHOD
    pub fn dispatch(&self, request: &Request) -> Response {
        let Some(handler) = self.handler(&request.method) else {
            return unknown_method(&request.method);
        };
        let start = Instant::now();
        let outcome = handler(&request.params);
        finish(&request.method, start, outcome)
    }

    /// Like [`dispatch`](Self::dispatch), but the handler runs on tokio's
    /// blocking pool so a slow handler never stalls the runtime workers.
    ///
    /// Dropping the returned future abandons the call; the handler itself
    /// runs to completion in the background.
    pub async fn dispatch_blocking(&self, request: Request) -> Response {
        let Some(handler) = self.handler(&request.method) else {
            return unknown_method(&request.method);
        };
        let start = Instant::now();
        let Request { method, params } = request;
        let outcome = match tokio::task::spawn_blocking(move || handler(&params)).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(%method, error = %e, "handler panicked");
                Err(format!("handler for `{method}` panicked").into())
            }
        };
        finish(&method, start, outcome)
    }

    fn handler(&self, method: &str) -> Option<Handler> {
        self.handlers.get(method).cloned()
    }
}

fn unknown_method(method: &str) -> Response {
    warn!(%method, "unknown RPC method");
    metrics::counter!(telemetry::REQUESTS_TOTAL,
        "method" => "unknown",
        "status" => "unknown_method",
    )
    .increment(1);
    ProtocolError::UnknownMethod {
        method: method.to_owned(),
    }
    .into()
}

fn finish(method: &str, start: Instant, outcome: HandlerResult<Value>) -> Response {
    let response = match outcome {
        Ok(value) => Response::Result(value),
        Err(e) => {
            debug!(%method, error = %e, "handler returned an error");
            Response::Error(e.to_string())
        }
    };

    let status = if response.is_error() { "error" } else { "ok" };
    metrics::counter!(telemetry::REQUESTS_TOTAL,
        "method" => method.to_owned(),
        "status" => status,
    )
    .increment(1);
    metrics::histogram!(telemetry::REQUEST_DURATION_SECONDS,
        "method" => method.to_owned(),
    )
    .record(start.elapsed().as_secs_f64());

    response
}

impl fmt::Debug for DispatchTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchTable")
            .field("methods", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Collects handlers before the table is frozen.
#[derive(Default)]
pub struct DispatchTableBuilder {
    handlers: BTreeMap<String, Handler>,
}

impl DispatchTableBuilder {
    /// Register `handler` under the wire name `method`.
    ///
    /// Registering the same name twice keeps the later handler.
    pub fn register<F>(mut self, method: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&Params) -> HandlerResult<Value> + Send + Sync + 'static,
    {
        let method = method.into();
        if self.handlers.insert(method.clone(), Arc::new(handler)).is_some() {
            warn!(%method, "handler registered twice, keeping the later one");
        }
        self
    }

    pub fn build(self) -> DispatchTable {
        DispatchTable {
            handlers: self.handlers,
        }
    }
}
