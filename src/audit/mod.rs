//! DP-040: Audit trail of planning and execution.

pub mod eventlog;

use crate::core::types::Plan;
use serde::{Deserialize, Serialize};

/// One lifecycle event in `events.jsonl`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuditEvent {
    PlanGenerated {
        request: String,
        steps: usize,
        plan_hash: String,
        repaired: bool,
    },
    PlanningFailed {
        request: String,
        error: String,
    },
    PlanCanceled {
        steps: usize,
    },
    ExecutionStarted {
        run_id: String,
        steps: usize,
        plan_hash: String,
    },
    ExecutionCompleted {
        run_id: String,
        steps: usize,
        duration_ms: u64,
    },
    ExecutionFailed {
        run_id: String,
        step: usize,
        action: String,
        error: String,
    },
}

/// Timestamped event wrapper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimestampedEvent {
    pub ts: String,
    #[serde(flatten)]
    pub event: AuditEvent,
}

/// Content hash of a plan's canonical JSON. Returns `"blake3:{hex}"`.
pub fn plan_fingerprint(plan: &Plan) -> String {
    format!("blake3:{}", blake3::hash(plan.to_json().as_bytes()).to_hex())
}
