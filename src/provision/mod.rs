//! Cluster provisioning entry point
//!
//! [`Provisioner`] drives one run end to end; [`response`] turns its result
//! into the structured reply handed back to callers.

pub mod pipeline;

pub use pipeline::{NodeSummary, ProvisionOutcome, ProvisionRequest, Provisioner};

use crate::error::{ProvisionError, Result};
use serde_json::{json, Value};

/// `{"status": "ok" | "partial" | "error", ...}`
///
/// A run whose record could not be saved still reports what it achieved.
pub fn response(result: &Result<ProvisionOutcome>) -> Value {
    match result {
        Ok(outcome) => {
            let (mut body, partial) = outcome_body(outcome);
            body["status"] = json!(if partial { "partial" } else { "ok" });
            body
        }
        Err(err) => {
            let mut body = match err {
                ProvisionError::Persistence { outcome, .. } => outcome_body(outcome).0,
                _ => json!({}),
            };
            body["status"] = json!("error");
            body["kind"] = json!(err.kind());
            body["detail"] = json!(err.to_string());
            if let ProvisionError::Setup { stage, node, .. } = err {
                body["stage"] = json!(stage.to_string());
                body["node"] = json!(node);
            }
            body
        }
    }
}

// The serialised outcome plus `failed_peers` when peering was partial
fn outcome_body(outcome: &ProvisionOutcome) -> (Value, bool) {
    let mut body =
        serde_json::to_value(outcome).unwrap_or_else(|e| json!({ "detail": e.to_string() }));
    match outcome.partial_peering() {
        Some(ProvisionError::PartialPeering { failed }) => {
            body["failed_peers"] = json!(failed);
            (body, true)
        }
        _ => (body, false),
    }
}
