//! DP-003: Safety limits for schema-valid plans.
//!
//! Policy, not shape. A plan that parses but trips a guardrail is rejected
//! outright and never sent back for repair.

use super::types::{Action, Plan};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

/// Plan is schema-valid but violates policy. Carries every violation found.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", .errors.join("; "))]
pub struct GuardrailError {
    pub errors: Vec<String>,
}

/// Limits applied to every plan before it can become pending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardrailLimits {
    pub max_steps: usize,
    pub max_total_sleep_ms: i64,
    pub max_insert_chars: usize,
    pub blocked_combos: BTreeSet<String>,
}

/// Quit, close, lock-screen and power shortcuts.
pub const DEFAULT_BLOCKED_COMBOS: [&str; 8] = [
    "alt-f4",
    "ctrl-q",
    "cmd-q",
    "ctrl-w",
    "cmd-w",
    "super-l",
    "ctrl-alt-delete",
    "alt-space c",
];

impl Default for GuardrailLimits {
    fn default() -> Self {
        Self {
            max_steps: 12,
            max_total_sleep_ms: 2000,
            max_insert_chars: 500,
            blocked_combos: DEFAULT_BLOCKED_COMBOS.iter().map(|c| c.to_string()).collect(),
        }
    }
}

/// Lower-case, trim, and collapse internal whitespace.
pub fn normalize_combo(combo: &str) -> String {
    combo
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Validate a plan against the limits.
pub fn validate_guardrails(plan: &Plan, limits: &GuardrailLimits) -> Result<(), GuardrailError> {
    let errors = collect_errors(plan, limits);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(GuardrailError { errors })
    }
}

fn collect_errors(plan: &Plan, limits: &GuardrailLimits) -> Vec<String> {
    let mut errors = Vec::new();

    if plan.len() > limits.max_steps {
        errors.push(format!(
            "Plan has {} steps; maximum is {}",
            plan.len(),
            limits.max_steps
        ));
    }

    add_sleep_errors(plan, limits.max_total_sleep_ms, &mut errors);
    add_insert_errors(plan, limits.max_insert_chars, &mut errors);
    add_key_errors(plan, &limits.blocked_combos, &mut errors);
    errors
}

fn add_sleep_errors(plan: &Plan, max_total: i64, errors: &mut Vec<String>) {
    let mut total: i64 = 0;
    for (i, step) in plan.steps().iter().enumerate() {
        if step.action() != Action::Sleep {
            continue;
        }
        let ms = step.int_arg("ms").unwrap_or(0);
        if ms < 0 {
            errors.push(format!("Step {}: sleep must not be negative", i + 1));
            continue;
        }
        total = total.saturating_add(ms);
    }
    if total > max_total {
        errors.push(format!(
            "Total sleep is {}ms; maximum is {}ms",
            total, max_total
        ));
    }
}

fn add_insert_errors(plan: &Plan, max_chars: usize, errors: &mut Vec<String>) {
    for (i, step) in plan.steps().iter().enumerate() {
        if step.action() != Action::InsertText {
            continue;
        }
        let chars = step.str_arg("text").map_or(0, |t| t.chars().count());
        if chars > max_chars {
            errors.push(format!(
                "Step {}: insert_text exceeds {} characters",
                i + 1,
                max_chars
            ));
        }
    }
}

fn add_key_errors(plan: &Plan, blocked: &BTreeSet<String>, errors: &mut Vec<String>) {
    let blocked: BTreeSet<String> = blocked.iter().map(|c| normalize_combo(c)).collect();
    for (i, step) in plan.steps().iter().enumerate() {
        if step.action() != Action::Key {
            continue;
        }
        let combo = normalize_combo(step.str_arg("combo").unwrap_or_default());
        if blocked.contains(&combo) {
            errors.push(format!("Step {}: key combo '{}' is blocked", i + 1, combo));
        }
    }
}
