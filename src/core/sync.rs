//! DP-005: Focus synchronization and settle delays.
//!
//! Polling yields through the surface's own `sleep`, never a host-level
//! blocking wait, so it stays visible to the automation backend. Every wait is
//! bounded by the configured focus timeout.

use crate::automation::{AutomationError, AutomationResult, AutomationSurface, Windowing};
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::path::Path;
use std::rc::Rc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Timing knobs for step synchronization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    /// Maximum wait for an app to become active after launch/switch (0 disables)
    pub app_focus_timeout_ms: u64,
    /// Delay after UI-sensitive steps (0 disables)
    pub step_settle_ms: u64,
    /// Interval between active-app polls
    pub poll_interval_ms: u64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            app_focus_timeout_ms: 3500,
            step_settle_ms: 180,
            poll_interval_ms: 100,
        }
    }
}

// ============================================================================
// Clocks
// ============================================================================

/// Monotonic millisecond clock.
pub trait Clock {
    fn now_ms(&self) -> u64;
}

/// Wall-clock time since construction.
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

/// Shared clock that only moves when told to.
#[derive(Debug, Clone, Default)]
pub struct ManualClock(Rc<Cell<u64>>);

impl ManualClock {
    pub fn advance(&self, by: Duration) {
        let ms = u64::try_from(by.as_millis()).unwrap_or(u64::MAX);
        self.0.set(self.0.get().saturating_add(ms));
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.0.get()
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.0.get()
    }
}

// ============================================================================
// Name matching
// ============================================================================

/// Lower-case, `-`/`_` to space, collapse whitespace.
pub fn normalize_name(value: &str) -> String {
    value
        .to_lowercase()
        .replace(['-', '_'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Either name contains the other. Empty names never match.
pub fn names_match(current: &str, hint: &str) -> bool {
    !current.is_empty()
        && !hint.is_empty()
        && (current == hint || current.contains(hint) || hint.contains(current))
}

/// Split a command line into shell words. Handles single and double quotes
/// and backslash escapes; an unterminated quote runs to the end of the line.
pub fn split_command(command: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;
    let mut chars = command.chars();

    while let Some(c) = chars.next() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some('"'), '\\') => {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            (Some(_), c) => current.push(c),
            (None, '"' | '\'') => {
                quote = Some(c);
                in_word = true;
            }
            (None, '\\') => {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
                in_word = true;
            }
            (None, c) if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            (None, c) => {
                current.push(c);
                in_word = true;
            }
        }
    }
    if in_word {
        words.push(current);
    }
    words
}

/// First shell word of a command line.
pub fn first_token(command: &str) -> String {
    split_command(command).into_iter().next().unwrap_or_default()
}

/// Normalized hints that identify `app_name` (and its launch command) when active.
pub fn focus_hints(app_name: &str, command: Option<&str>) -> Vec<String> {
    let mut values = vec![normalize_name(app_name)];
    if let Some(command) = command {
        let executable = first_token(command);
        let stem = Path::new(&executable)
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        values.push(normalize_name(&executable));
        values.push(normalize_name(&stem));
    }

    let mut hints: Vec<String> = Vec::new();
    for value in values {
        if !value.is_empty() && !hints.contains(&value) {
            hints.push(value);
        }
    }
    hints
}

/// Whether any running app matches `app_name`. Unknown means running.
pub fn is_running_app(windowing: Option<&dyn Windowing>, app_name: &str) -> bool {
    let Some(windowing) = windowing else {
        return true;
    };
    let names = match windowing.running_apps() {
        Ok(names) => names,
        Err(e) => {
            debug!(error = %e, "running app query failed; assuming running");
            return true;
        }
    };
    let target = normalize_name(app_name);
    names
        .iter()
        .map(|n| normalize_name(n))
        .any(|name| names_match(&name, &target))
}

fn active_app_matches(windowing: &dyn Windowing, hints: &[String]) -> bool {
    let current = match windowing.active_app() {
        Ok(name) => normalize_name(&name.unwrap_or_default()),
        Err(_) => return false,
    };
    hints.iter().any(|hint| names_match(&current, hint))
}

// ============================================================================
// Waiting
// ============================================================================

/// Poll until the active app matches `app_name` (or its command), or time out.
///
/// No-op when the surface cannot report windows or the timeout is zero.
pub fn wait_for_focus(
    surface: &mut dyn AutomationSurface,
    settings: &SyncSettings,
    clock: &dyn Clock,
    app_name: &str,
    command: Option<&str>,
) -> AutomationResult {
    let timeout = settings.app_focus_timeout_ms;
    if timeout == 0 || surface.windowing().is_none() {
        return Ok(());
    }

    let hints = focus_hints(app_name, command);
    let poll = Duration::from_millis(settings.poll_interval_ms.max(1));
    let start = clock.now_ms();

    while clock.now_ms().saturating_sub(start) < timeout {
        let matched = surface
            .windowing()
            .is_some_and(|w| active_app_matches(w, &hints));
        if matched {
            debug!(app = app_name, "app focused");
            return Ok(());
        }
        surface.sleep(poll)?;
    }

    Err(AutomationError::FocusTimeout {
        app: app_name.to_string(),
        timeout_ms: timeout,
    })
}

/// Settle delay after a UI-sensitive step.
pub fn settle_delay(settings: &SyncSettings) -> Option<Duration> {
    (settings.step_settle_ms > 0).then(|| Duration::from_millis(settings.step_settle_ms))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automation::recording::RecordingSurface;

    fn fast() -> SyncSettings {
        SyncSettings {
            app_focus_timeout_ms: 1000,
            step_settle_ms: 180,
            poll_interval_ms: 100,
        }
    }

    #[test]
    fn test_dp005_normalize_name() {
        assert_eq!(normalize_name("  Google-Chrome "), "google chrome");
        assert_eq!(normalize_name("gnome_text__editor"), "gnome text editor");
        assert_eq!(normalize_name(""), "");
    }

    #[test]
    fn test_dp005_names_match() {
        assert!(names_match("google chrome", "chrome"));
        assert!(names_match("code", "visual studio code"));
        assert!(!names_match("", "chrome"));
        assert!(!names_match("firefox", "chrome"));
    }

    #[test]
    fn test_dp005_first_token() {
        assert_eq!(first_token("/usr/bin/gedit --new-window"), "/usr/bin/gedit");
        assert_eq!(first_token("\"/opt/My App/app\" --flag"), "/opt/My App/app");
        assert_eq!(first_token("  "), "");
    }

    #[test]
    fn test_dp005_split_command() {
        assert_eq!(
            split_command("env FOO='a b' app --x \"y z\""),
            vec!["env", "FOO=a b", "app", "--x", "y z"]
        );
        assert_eq!(split_command(r"my\ app %U"), vec!["my app", "%U"]);
        assert_eq!(split_command("'unterminated arg"), vec!["unterminated arg"]);
        assert!(split_command("   ").is_empty());
    }

    #[test]
    fn test_dp005_focus_hints() {
        assert_eq!(focus_hints("Text Editor", None), vec!["text editor"]);
        assert_eq!(
            focus_hints("Gedit", Some("/usr/bin/gnome-text-editor --new")),
            vec!["gedit", "/usr/bin/gnome text editor", "gnome text editor"]
        );
        // Duplicates and empties dropped
        assert_eq!(focus_hints("gedit", Some("gedit")), vec!["gedit"]);
    }

    #[test]
    fn test_dp005_is_running_app() {
        let s = RecordingSurface::new().with_desktop(&["Google-chrome", "Terminal"], None);
        assert!(is_running_app(s.windowing(), "google chrome"));
        assert!(is_running_app(s.windowing(), "Chrome"));
        assert!(!is_running_app(s.windowing(), "Slack"));
        assert!(is_running_app(None, "anything"));
    }

    #[test]
    fn test_dp005_wait_immediate_match() {
        let clock = ManualClock::default();
        let mut s = RecordingSurface::new()
            .with_desktop(&[], Some("gnome-text-editor"))
            .with_clock(clock.clone());
        wait_for_focus(&mut s, &fast(), &clock, "Gedit", Some("gnome-text-editor")).unwrap();
        assert!(s.calls().is_empty());
    }

    #[test]
    fn test_dp005_wait_times_out() {
        let clock = ManualClock::default();
        let mut s = RecordingSurface::new()
            .with_desktop(&[], Some("Terminal"))
            .with_clock(clock.clone());
        let err = wait_for_focus(&mut s, &fast(), &clock, "Firefox", None).unwrap_err();
        assert_eq!(
            err,
            AutomationError::FocusTimeout {
                app: "Firefox".to_string(),
                timeout_ms: 1000
            }
        );
        // One poll sleep per interval until the deadline
        assert_eq!(s.calls().len(), 10);
        assert!(s.calls().iter().all(|c| c.capability == "sleep"));
        assert_eq!(clock.elapsed_ms(), 1000);
    }

    #[test]
    fn test_dp005_wait_noop_without_windowing() {
        let clock = ManualClock::default();
        let mut s = RecordingSurface::new();
        wait_for_focus(&mut s, &fast(), &clock, "Firefox", None).unwrap();
        assert!(s.calls().is_empty());
    }

    #[test]
    fn test_dp005_wait_noop_when_disabled() {
        let clock = ManualClock::default();
        let mut s = RecordingSurface::new().with_desktop(&[], None);
        let settings = SyncSettings {
            app_focus_timeout_ms: 0,
            ..fast()
        };
        wait_for_focus(&mut s, &settings, &clock, "Firefox", None).unwrap();
        assert!(s.calls().is_empty());
    }

    #[test]
    fn test_dp005_settle_delay() {
        assert_eq!(settle_delay(&fast()), Some(Duration::from_millis(180)));
        let off = SyncSettings {
            step_settle_ms: 0,
            ..fast()
        };
        assert_eq!(settle_delay(&off), None);
    }
}
