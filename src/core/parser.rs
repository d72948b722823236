//! DP-002: Strict plan parsing against the action schema.
//!
//! Model output is untrusted. Every violation is collected so one repair
//! round-trip can fix all of them:
//! - Root must be an object with `steps` and optional `summary` only
//! - Each step must be `{action, args}` with a known action
//! - `args` must match the action's argument list exactly, key set and types

use super::types::*;
use indexmap::IndexMap;
use serde_json::{Map, Value};
use thiserror::Error;

const ROOT_FIELDS: [&str; 2] = ["steps", "summary"];
const STEP_FIELDS: [&str; 2] = ["action", "args"];

/// Plan text is not a structurally valid plan. Carries every violation found.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", .errors.join("; "))]
pub struct ParseError {
    pub errors: Vec<String>,
}

/// Parse raw model output into a plan.
pub fn parse_plan(raw: &str) -> Result<Plan, ParseError> {
    let mut errors = Vec::new();
    let Some(root) = load_root(raw, &mut errors) else {
        return Err(ParseError { errors });
    };

    let steps = parse_steps(&root, &mut errors);
    let summary = match root.get("summary") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.is_empty() => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => {
            errors.push("Root field 'summary' must be a string".to_string());
            None
        }
    };

    if !errors.is_empty() {
        return Err(ParseError { errors });
    }
    Ok(Plan::new(steps, summary))
}

/// Strip one surrounding markdown code fence, if present.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(body) = trimmed
        .strip_prefix("```")
        .and_then(|rest| rest.strip_suffix("```"))
    else {
        return trimmed;
    };
    match body.find('\n') {
        // Drop a language tag such as `json` on the opening fence line
        Some(pos) if body[..pos].trim().chars().all(|c| c.is_ascii_alphanumeric()) => {
            body[pos + 1..].trim()
        }
        _ => body.trim(),
    }
}

fn load_root(raw: &str, errors: &mut Vec<String>) -> Option<Map<String, Value>> {
    let payload: Value = match serde_json::from_str(strip_code_fence(raw)) {
        Ok(v) => v,
        Err(e) => {
            errors.push(format!("Response is not valid JSON: {}", e));
            return None;
        }
    };
    let Value::Object(root) = payload else {
        errors.push("Root must be an object".to_string());
        return None;
    };

    let extras = sorted_extras(&root, &ROOT_FIELDS);
    if !extras.is_empty() {
        errors.push(format!("Root unsupported fields: {}", extras.join(", ")));
    }
    Some(root)
}

fn parse_steps(root: &Map<String, Value>, errors: &mut Vec<String>) -> Vec<Step> {
    let Some(Value::Array(raw_steps)) = root.get("steps") else {
        errors.push("Root field 'steps' must be an array".to_string());
        return Vec::new();
    };
    raw_steps
        .iter()
        .enumerate()
        .filter_map(|(i, raw)| parse_step(i + 1, raw, errors))
        .collect()
}

fn parse_step(index: usize, raw: &Value, errors: &mut Vec<String>) -> Option<Step> {
    let Value::Object(step) = raw else {
        errors.push(format!("Step {}: must be an object", index));
        return None;
    };

    let missing: Vec<&str> = STEP_FIELDS
        .iter()
        .copied()
        .filter(|f| !step.contains_key(*f))
        .collect();
    if !missing.is_empty() {
        errors.push(format!("Step {}: missing fields: {}", index, missing.join(", ")));
    }
    let extras = sorted_extras(step, &STEP_FIELDS);
    if !extras.is_empty() {
        errors.push(format!("Step {}: unsupported fields: {}", index, extras.join(", ")));
    }

    let Some(Value::String(name)) = step.get("action") else {
        errors.push(format!("Step {}: 'action' must be a string", index));
        return None;
    };
    let Some(action) = Action::from_name(name) else {
        errors.push(format!("Step {}: unsupported action '{}'", index, name));
        return None;
    };
    let Some(Value::Object(args)) = step.get("args") else {
        errors.push(format!("Step {}: 'args' must be an object", index));
        return None;
    };

    let args = parse_args(index, action, args, errors)?;
    Some(Step::new(action, args))
}

fn parse_args(
    index: usize,
    action: Action,
    args: &Map<String, Value>,
    errors: &mut Vec<String>,
) -> Option<IndexMap<String, ArgValue>> {
    let spec = action.arg_spec();
    let before = errors.len();

    let mut missing: Vec<&str> = spec
        .iter()
        .map(|(name, _)| *name)
        .filter(|name| !args.contains_key(*name))
        .collect();
    missing.sort_unstable();
    if !missing.is_empty() {
        errors.push(format!("Step {}: missing args: {}", index, missing.join(", ")));
    }

    let allowed: Vec<&str> = spec.iter().map(|(name, _)| *name).collect();
    let extras = sorted_extras(args, &allowed);
    if !extras.is_empty() {
        errors.push(format!("Step {}: unsupported args: {}", index, extras.join(", ")));
    }

    // Values follow the order the model wrote them in
    let mut parsed = IndexMap::new();
    for (key, value) in args {
        let Some((_, kind)) = spec.iter().find(|(name, _)| *name == key.as_str()) else {
            continue;
        };
        match coerce(value, *kind) {
            Ok(v) => {
                parsed.insert(key.clone(), v);
            }
            Err(Mismatch::OutOfRange) => errors.push(format!(
                "Step {}: arg '{}' is out of range for a 64-bit integer",
                index, key
            )),
            Err(Mismatch::WrongType) => {
                errors.push(format!("Step {}: arg '{}' must be {}", index, key, kind))
            }
        }
    }

    (errors.len() == before).then_some(parsed)
}

enum Mismatch {
    WrongType,
    OutOfRange,
}

/// Exact type match. Booleans and non-integral numbers never satisfy `Int`.
fn coerce(value: &Value, kind: ArgKind) -> Result<ArgValue, Mismatch> {
    match (kind, value) {
        (ArgKind::Str, Value::String(s)) => Ok(ArgValue::Str(s.clone())),
        (ArgKind::Int, Value::Number(n)) => match n.as_i64() {
            Some(v) => Ok(ArgValue::Int(v)),
            // Integral but above i64::MAX
            None if n.is_u64() => Err(Mismatch::OutOfRange),
            None => Err(Mismatch::WrongType),
        },
        _ => Err(Mismatch::WrongType),
    }
}

fn sorted_extras(obj: &Map<String, Value>, allowed: &[&str]) -> Vec<String> {
    let mut extras: Vec<String> = obj
        .keys()
        .filter(|k| !allowed.contains(&k.as_str()))
        .cloned()
        .collect();
    extras.sort();
    extras
}
