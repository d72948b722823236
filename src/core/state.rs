//! DP-009: Session state and last-plan persistence (atomic save).
//!
//! A session holds at most one pending plan, the last confirmed plan and the
//! last error. Only the last confirmed plan outlives the process.

use super::parser::parse_plan;
use super::types::Plan;
use std::path::{Path, PathBuf};

/// A generated plan awaiting confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingPlan {
    pub request: String,
    pub plan: Plan,
}

impl PendingPlan {
    pub fn to_json(&self) -> String {
        self.plan.to_json()
    }
}

/// Planner session state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pending: Option<PendingPlan>,
    last_confirmed: Option<Plan>,
    last_error: Option<String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Session seeded with the last confirmed plan saved in `state_dir`.
    pub fn load(state_dir: &Path) -> Result<Self, String> {
        Ok(Self {
            last_confirmed: load_last_plan(state_dir)?,
            ..Self::default()
        })
    }

    pub fn pending(&self) -> Option<&PendingPlan> {
        self.pending.as_ref()
    }

    pub fn last_confirmed(&self) -> Option<&Plan> {
        self.last_confirmed.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Replace any pending plan. Clears the last error.
    pub fn set_pending(&mut self, request: &str, plan: Plan) {
        self.pending = Some(PendingPlan {
            request: request.to_string(),
            plan,
        });
        self.last_error = None;
    }

    pub fn clear_pending(&mut self) {
        self.pending = None;
    }

    /// Promote the pending plan to last confirmed. Pending itself is kept.
    pub fn confirm_pending(&mut self) -> Option<&Plan> {
        let pending = self.pending.as_ref()?;
        self.last_confirmed = Some(pending.plan.clone());
        self.last_confirmed.as_ref()
    }

    pub fn set_error(&mut self, message: impl Into<String>) {
        self.last_error = Some(message.into());
    }
}

/// Derive the last-plan path within the state directory.
pub fn last_plan_path(state_dir: &Path) -> PathBuf {
    state_dir.join("last_plan.json")
}

/// Load the last confirmed plan. Returns None if none was saved.
pub fn load_last_plan(state_dir: &Path) -> Result<Option<Plan>, String> {
    let path = last_plan_path(state_dir);
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(&path)
        .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
    let plan = parse_plan(&content)
        .map_err(|e| format!("invalid plan file {}: {}", path.display(), e))?;
    Ok(Some(plan))
}

/// Save the last confirmed plan atomically (write to temp, then rename).
pub fn save_last_plan(state_dir: &Path, plan: &Plan) -> Result<(), String> {
    std::fs::create_dir_all(state_dir)
        .map_err(|e| format!("cannot create dir {}: {}", state_dir.display(), e))?;
    let path = last_plan_path(state_dir);

    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, plan.to_json())
        .map_err(|e| format!("cannot write {}: {}", tmp_path.display(), e))?;
    std::fs::rename(&tmp_path, &path).map_err(|e| {
        format!(
            "cannot rename {} to {}: {}",
            tmp_path.display(),
            path.display(),
            e
        )
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(json: &str) -> Plan {
        parse_plan(json).unwrap()
    }

    #[test]
    fn test_dp009_pending_lifecycle() {
        let mut s = Session::new();
        s.set_error("old failure");
        s.set_pending("copy it", plan(r#"{"steps":[{"action":"copy","args":{}}]}"#));
        assert_eq!(s.last_error(), None);
        assert_eq!(s.pending().unwrap().request, "copy it");

        s.set_pending("paste it", plan(r#"{"steps":[{"action":"paste","args":{}}]}"#));
        assert_eq!(s.pending().unwrap().request, "paste it");

        let confirmed = s.confirm_pending().cloned().unwrap();
        assert_eq!(confirmed, s.pending().unwrap().plan);
        s.clear_pending();
        assert!(s.pending().is_none());
        assert_eq!(s.last_confirmed(), Some(&confirmed));
    }

    #[test]
    fn test_dp009_confirm_without_pending() {
        let mut s = Session::new();
        assert!(s.confirm_pending().is_none());
        assert!(s.last_confirmed().is_none());
    }

    #[test]
    fn test_dp009_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let state = dir.path().join("state");
        let p = plan(
            r#"{"steps":[{"action":"go_url","args":{"url":"https://example.com"}}],"summary":"open site"}"#,
        );
        save_last_plan(&state, &p).unwrap();
        assert!(!last_plan_path(&state).with_extension("json.tmp").exists());
        assert_eq!(load_last_plan(&state).unwrap(), Some(p.clone()));

        let session = Session::load(&state).unwrap();
        assert_eq!(session.last_confirmed(), Some(&p));
        assert!(session.pending().is_none());
    }

    #[test]
    fn test_dp009_load_missing() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(load_last_plan(dir.path()).unwrap(), None);
        assert_eq!(Session::load(dir.path()).unwrap(), Session::new());
    }

    #[test]
    fn test_dp009_load_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(last_plan_path(dir.path()), "{\"steps\": 3}").unwrap();
        let err = load_last_plan(dir.path()).unwrap_err();
        assert!(err.contains("invalid plan file"));
        assert!(err.contains("'steps' must be an array"));
    }
}
