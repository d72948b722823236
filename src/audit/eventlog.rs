//! DP-041: Append-only JSONL audit log.

use super::{AuditEvent, TimestampedEvent};
use chrono::{SecondsFormat, Utc};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Current UTC time as ISO 8601 with second precision.
pub fn now_iso8601() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Generate a run ID.
pub fn generate_run_id() -> String {
    let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    format!("r-{:012x}", nanos & 0xFFFF_FFFF_FFFF)
}

/// Derive the event log path for a state directory.
pub fn event_log_path(state_dir: &Path) -> PathBuf {
    state_dir.join("events.jsonl")
}

/// Append an event to the state directory's event log.
pub fn append_event(state_dir: &Path, event: AuditEvent) -> Result<(), String> {
    let path = event_log_path(state_dir);
    std::fs::create_dir_all(state_dir).map_err(|e| format!("cannot create state dir: {}", e))?;

    let te = TimestampedEvent {
        ts: now_iso8601(),
        event,
    };
    let json = serde_json::to_string(&te).map_err(|e| format!("JSON serialize error: {}", e))?;

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| format!("cannot open event log {}: {}", path.display(), e))?;

    writeln!(file, "{}", json).map_err(|e| format!("write error: {}", e))?;

    Ok(())
}

/// Read every event from a log. Missing log = no events.
pub fn read_events(state_dir: &Path) -> Result<Vec<TimestampedEvent>, String> {
    let path = event_log_path(state_dir);
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = std::fs::read_to_string(&path)
        .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
    content
        .lines()
        .filter(|l| !l.trim().is_empty())
        .enumerate()
        .map(|(i, line)| {
            serde_json::from_str(line)
                .map_err(|e| format!("{} line {}: {}", path.display(), i + 1, e))
        })
        .collect()
}

/// Best-effort recorder. Write failures are logged, never raised.
#[derive(Debug, Clone, Default)]
pub struct AuditLog {
    state_dir: Option<PathBuf>,
}

impl AuditLog {
    pub fn new(state_dir: &Path) -> Self {
        Self {
            state_dir: Some(state_dir.to_path_buf()),
        }
    }

    /// A log that records nothing.
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn record(&self, event: AuditEvent) {
        let Some(dir) = &self.state_dir else {
            return;
        };
        if let Err(e) = append_event(dir, event) {
            warn!(error = %e, "audit write failed");
        }
    }
}
