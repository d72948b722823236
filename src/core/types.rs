//! DP-001: Action schema and plan types.
//!
//! The action schema is the only vocabulary deskplan accepts. Plans and steps
//! are immutable once built; the parser is the only producer outside this crate.

use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::fmt;

// ============================================================================
// Action schema
// ============================================================================

/// Primitive type expected for an action argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    Str,
    Int,
}

impl fmt::Display for ArgKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str => write!(f, "string"),
            Self::Int => write!(f, "integer"),
        }
    }
}

/// Argument name and expected kind.
pub type ArgSpec = (&'static str, ArgKind);

/// Every action a plan may contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    SwitchApp,
    LaunchApp,
    FocusAddress,
    NewTab,
    GoUrl,
    FindText,
    InsertText,
    Key,
    Sleep,
    Copy,
    Paste,
    SelectAll,
    Undo,
    Redo,
    LineStart,
    LineEnd,
    DeleteSelection,
}

impl Action {
    /// Schema order. Prompts list actions in this order.
    pub const ALL: [Action; 17] = [
        Self::SwitchApp,
        Self::LaunchApp,
        Self::FocusAddress,
        Self::NewTab,
        Self::GoUrl,
        Self::FindText,
        Self::InsertText,
        Self::Key,
        Self::Sleep,
        Self::Copy,
        Self::Paste,
        Self::SelectAll,
        Self::Undo,
        Self::Redo,
        Self::LineStart,
        Self::LineEnd,
        Self::DeleteSelection,
    ];

    /// Wire name of the action.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SwitchApp => "switch_app",
            Self::LaunchApp => "launch_app",
            Self::FocusAddress => "focus_address",
            Self::NewTab => "new_tab",
            Self::GoUrl => "go_url",
            Self::FindText => "find_text",
            Self::InsertText => "insert_text",
            Self::Key => "key",
            Self::Sleep => "sleep",
            Self::Copy => "copy",
            Self::Paste => "paste",
            Self::SelectAll => "select_all",
            Self::Undo => "undo",
            Self::Redo => "redo",
            Self::LineStart => "line_start",
            Self::LineEnd => "line_end",
            Self::DeleteSelection => "delete_selection",
        }
    }

    /// Look up an action by wire name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|a| a.as_str() == name)
    }

    /// Exact argument set for this action.
    pub fn arg_spec(self) -> &'static [ArgSpec] {
        match self {
            Self::SwitchApp | Self::LaunchApp => &[("app_name", ArgKind::Str)],
            Self::GoUrl => &[("url", ArgKind::Str)],
            Self::FindText | Self::InsertText => &[("text", ArgKind::Str)],
            Self::Key => &[("combo", ArgKind::Str)],
            Self::Sleep => &[("ms", ArgKind::Int)],
            Self::FocusAddress
            | Self::NewTab
            | Self::Copy
            | Self::Paste
            | Self::SelectAll
            | Self::Undo
            | Self::Redo
            | Self::LineStart
            | Self::LineEnd
            | Self::DeleteSelection => &[],
        }
    }

    /// Window, tab and navigation actions that get a settle delay after dispatch.
    pub fn is_ui_sensitive(self) -> bool {
        matches!(
            self,
            Self::LaunchApp | Self::SwitchApp | Self::NewTab | Self::FocusAddress | Self::GoUrl
        )
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Steps and plans
// ============================================================================

/// A validated argument value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgValue {
    Str(String),
    Int(i64),
}

impl ArgValue {
    fn to_value(&self) -> Value {
        match self {
            Self::Str(s) => Value::String(s.clone()),
            Self::Int(n) => Value::from(*n),
        }
    }
}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => write!(f, "{:?}", s),
            Self::Int(n) => write!(f, "{}", n),
        }
    }
}

/// One plan step. Arguments always match the action's argument list exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    action: Action,
    args: IndexMap<String, ArgValue>,
}

impl Step {
    pub(crate) fn new(action: Action, args: IndexMap<String, ArgValue>) -> Self {
        Self { action, args }
    }

    pub fn action(&self) -> Action {
        self.action
    }

    pub fn args(&self) -> &IndexMap<String, ArgValue> {
        &self.args
    }

    /// String argument by name, if present and a string.
    pub fn str_arg(&self, name: &str) -> Option<&str> {
        match self.args.get(name) {
            Some(ArgValue::Str(s)) => Some(s),
            _ => None,
        }
    }

    /// Integer argument by name, if present and an integer.
    pub fn int_arg(&self, name: &str) -> Option<i64> {
        match self.args.get(name) {
            Some(ArgValue::Int(n)) => Some(*n),
            _ => None,
        }
    }

    fn to_value(&self) -> Value {
        let args: Map<String, Value> = self
            .args
            .iter()
            .map(|(k, v)| (k.clone(), v.to_value()))
            .collect();
        let mut obj = Map::new();
        obj.insert("action".to_string(), Value::String(self.action.as_str().to_string()));
        obj.insert("args".to_string(), Value::Object(args));
        Value::Object(obj)
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.action)?;
        for (i, (name, value)) in self.args.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", name, value)?;
        }
        write!(f, ")")
    }
}

/// An ordered, flat plan. Step order is execution order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    steps: Vec<Step>,
    summary: Option<String>,
}

impl Plan {
    pub(crate) fn new(steps: Vec<Step>, summary: Option<String>) -> Self {
        Self { steps, summary }
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Wire/export form: `steps`, plus `summary` when non-empty.
    pub fn to_value(&self) -> Value {
        let mut obj = Map::new();
        obj.insert(
            "steps".to_string(),
            Value::Array(self.steps.iter().map(Step::to_value).collect()),
        );
        if let Some(summary) = self.summary.as_deref().filter(|s| !s.is_empty()) {
            obj.insert("summary".to_string(), Value::String(summary.to_string()));
        }
        Value::Object(obj)
    }

    /// Pretty JSON with two-space indentation.
    pub fn to_json(&self) -> String {
        format!("{:#}", self.to_value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dp001_action_names_roundtrip() {
        for action in Action::ALL {
            assert_eq!(Action::from_name(action.as_str()), Some(action));
        }
        assert_eq!(Action::from_name("shutdown"), None);
        assert_eq!(Action::from_name("Switch_App"), None);
    }

    #[test]
    fn test_dp001_arg_specs() {
        assert_eq!(Action::Sleep.arg_spec(), &[("ms", ArgKind::Int)]);
        assert_eq!(Action::GoUrl.arg_spec(), &[("url", ArgKind::Str)]);
        assert!(Action::Copy.arg_spec().is_empty());
        assert!(Action::DeleteSelection.arg_spec().is_empty());
    }

    #[test]
    fn test_dp001_ui_sensitive_set() {
        let sensitive: Vec<_> = Action::ALL
            .iter()
            .filter(|a| a.is_ui_sensitive())
            .map(|a| a.as_str())
            .collect();
        assert_eq!(
            sensitive,
            vec!["switch_app", "launch_app", "focus_address", "new_tab", "go_url"]
        );
    }

    #[test]
    fn test_dp001_plan_to_json_omits_empty_summary() {
        let mut args = IndexMap::new();
        args.insert("ms".to_string(), ArgValue::Int(50));
        let plan = Plan::new(vec![Step::new(Action::Sleep, args)], Some(String::new()));
        let json = plan.to_json();
        assert!(!json.contains("summary"));
        assert!(json.contains("\"ms\": 50"));
    }

    #[test]
    fn test_dp001_step_display() {
        let mut args = IndexMap::new();
        args.insert("app_name".to_string(), ArgValue::Str("Firefox".to_string()));
        let step = Step::new(Action::SwitchApp, args);
        assert_eq!(step.to_string(), "switch_app(app_name=\"Firefox\")");
        assert_eq!(step.str_arg("app_name"), Some("Firefox"));
        assert_eq!(step.int_arg("app_name"), None);
    }
}
