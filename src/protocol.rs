//! Wire protocol: request and response envelopes.
//!
//! Each connection carries exactly one request and one response, each a
//! single line of JSON:
//!
//! ```text
//! -> {"method":"Add","params":{"a":2,"b":3}}
//! <- {"result":5}
//! ```
//!
//! A response is either `{"result": value}` or `{"error": string}`, never
//! both. The helpers at the bottom convert typed values to and from the
//! envelope and are what generated stubs call.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio_util::codec::LinesCodec;

/// Error string returned for a method missing from the dispatch table.
pub const UNKNOWN_METHOD: &str = "Invalid RPC Call Method";

/// Upper bound on one encoded envelope, newline excluded.
pub const MAX_ENVELOPE_BYTES: usize = 64 * 1024;

/// Named request parameters.
pub type Params = Map<String, Value>;

/// Errors in envelope shape or content.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("malformed envelope: {0}")]
    Malformed(#[source] serde_json::Error),

    #[error("envelope exceeds {limit} bytes")]
    EnvelopeTooLarge { limit: usize },

    #[error("Invalid RPC Call Method")]
    UnknownMethod { method: String },

    #[error("missing parameter `{name}`")]
    MissingParam { name: String },

    #[error("invalid parameter `{name}`: {source}")]
    InvalidParam {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("unexpected result type: {0}")]
    InvalidResult(#[source] serde_json::Error),

    #[error("failed to encode value: {0}")]
    Encode(#[source] serde_json::Error),
}

/// One RPC call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub method: String,
    #[serde(default)]
    pub params: Params,
}

impl Request {
    pub fn new(method: impl Into<String>, params: Params) -> Self {
        Self {
            method: method.into(),
            params,
        }
    }

    /// Decode a request from one envelope line.
    pub fn decode(line: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(line).map_err(ProtocolError::Malformed)
    }

    /// Encode this request as one envelope line (without the newline).
    pub fn encode(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(ProtocolError::Encode)
    }
}

/// Outcome of one RPC call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Response {
    Result(Value),
    Error(String),
}

impl Response {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(message.into())
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    pub fn decode(line: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(line).map_err(ProtocolError::Malformed)
    }

    pub fn encode(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(ProtocolError::Encode)
    }
}

impl From<ProtocolError> for Response {
    fn from(err: ProtocolError) -> Self {
        Self::Error(err.to_string())
    }
}

/// Line codec bounded to [`MAX_ENVELOPE_BYTES`].
pub fn envelope_codec() -> LinesCodec {
    LinesCodec::new_with_max_length(MAX_ENVELOPE_BYTES)
}

/// Extract and convert the parameter `name`.
pub fn param<T: DeserializeOwned>(params: &Params, name: &str) -> Result<T, ProtocolError> {
    let value = params.get(name).ok_or_else(|| ProtocolError::MissingParam {
        name: name.to_owned(),
    })?;
    T::deserialize(value).map_err(|source| ProtocolError::InvalidParam {
        name: name.to_owned(),
        source,
    })
}

/// Convert a typed value for an envelope.
pub fn into_value<T: Serialize + ?Sized>(value: &T) -> Result<Value, ProtocolError> {
    serde_json::to_value(value).map_err(ProtocolError::Encode)
}

/// Convert a `result` value back to its declared type.
pub fn from_value<T: DeserializeOwned>(value: Value) -> Result<T, ProtocolError> {
    serde_json::from_value(value).map_err(ProtocolError::InvalidResult)
}
