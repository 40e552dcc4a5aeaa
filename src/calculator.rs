//! The reference `Calculator` service.
//!
//! Stubs are generated at build time from `idl/calculator.idl`; this module
//! includes them and supplies [`Arithmetic`], the business logic `courierd`
//! serves.

/// Generated `CalculatorClient`.
pub mod client {
    include!(concat!(env!("OUT_DIR"), "/calculator_client.rs"));
}

/// Generated `Calculator` trait and `dispatch_table`.
pub mod server {
    include!(concat!(env!("OUT_DIR"), "/calculator_server.rs"));
}

pub use client::CalculatorClient;
pub use server::{Calculator, dispatch_table};

use crate::HandlerResult;

/// Checked 64-bit integer arithmetic.
#[derive(Debug, Clone, Copy, Default)]
pub struct Arithmetic;

impl Calculator for Arithmetic {
    fn add(&self, a: i64, b: i64) -> HandlerResult<i64> {
        a.checked_add(b).ok_or_else(|| "integer overflow".into())
    }

    fn sub(&self, a: i64, b: i64) -> HandlerResult<i64> {
        a.checked_sub(b).ok_or_else(|| "integer overflow".into())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{Request, Response};

    fn call(method: &str, params: serde_json::Value) -> Response {
        let table = dispatch_table(Arithmetic);
        let params = params.as_object().cloned().unwrap_or_default();
        table.dispatch(&Request::new(method, params))
    }

    #[test]
    fn registers_exported_names() {
        let table = dispatch_table(Arithmetic);
        assert_eq!(table.methods().collect::<Vec<_>>(), vec!["Add", "Sub"]);
    }

    #[test]
    fn add_and_sub() {
        assert_eq!(call("Add", json!({"a": 2, "b": 3})), Response::Result(json!(5)));
        assert_eq!(call("Sub", json!({"a": 2, "b": 3})), Response::Result(json!(-1)));
    }

    #[test]
    fn overflow_is_an_error_response() {
        assert_eq!(
            call("Add", json!({"a": i64::MAX, "b": 1})),
            Response::error("integer overflow")
        );
    }

    #[test]
    fn mistyped_param_is_an_error_response() {
        let response = call("Add", json!({"a": "two", "b": 3}));
        assert!(response.is_error());
    }
}
