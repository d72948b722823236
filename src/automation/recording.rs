//! DP-012: Recording surface for dry runs and tests.
//!
//! Records every capability call in order. Optionally simulates a desktop:
//! a set of running apps, an active app that follows focus/launch, injected
//! failures, and a manual clock advanced by `sleep`.

use super::*;
use crate::core::sync::ManualClock;
use std::cell::RefCell;
use std::collections::VecDeque;

/// One recorded capability call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub capability: String,
    pub args: Vec<String>,
}

impl std::fmt::Display for RecordedCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.capability, self.args.join(", "))
    }
}

struct Failure {
    capability: String,
    arg: Option<String>,
    message: String,
}

/// Simulated window state.
#[derive(Default)]
struct Desktop {
    /// Successive `running_apps` answers; the last one repeats.
    running: RefCell<VecDeque<Vec<String>>>,
    active: RefCell<Option<String>>,
    focus_follows: bool,
}

impl Windowing for Desktop {
    fn running_apps(&self) -> AutomationResult<Vec<String>> {
        let mut running = self.running.borrow_mut();
        if running.len() > 1 {
            return Ok(running.pop_front().unwrap_or_default());
        }
        Ok(running.front().cloned().unwrap_or_default())
    }

    fn active_app(&self) -> AutomationResult<Option<String>> {
        Ok(self.active.borrow().clone())
    }
}

/// A surface that performs nothing and remembers everything.
#[derive(Default)]
pub struct RecordingSurface {
    calls: Vec<RecordedCall>,
    desktop: Option<Desktop>,
    failures: Vec<Failure>,
    browser_supported: bool,
    clock: Option<ManualClock>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate window introspection. Focus and launch make the target active.
    pub fn with_desktop(mut self, running: &[&str], active: Option<&str>) -> Self {
        self.desktop = Some(Desktop {
            running: RefCell::new(VecDeque::from([names(running)])),
            active: RefCell::new(active.map(str::to_string)),
            focus_follows: true,
        });
        self
    }

    /// Answer successive running-app queries from `listings`, repeating the last.
    pub fn with_running_sequence(mut self, listings: &[&[&str]]) -> Self {
        if let Some(desktop) = self.desktop.as_mut() {
            *desktop.running.borrow_mut() = listings.iter().map(|l| names(l)).collect();
        }
        self
    }

    /// Keep the active app fixed regardless of focus/launch calls.
    pub fn with_stuck_focus(mut self) -> Self {
        if let Some(desktop) = self.desktop.as_mut() {
            desktop.focus_follows = false;
        }
        self
    }

    /// Implement `browser.navigate` and `browser.focus_address` natively.
    pub fn with_browser(mut self) -> Self {
        self.browser_supported = true;
        self
    }

    /// Advance this clock on every `sleep`.
    pub fn with_clock(mut self, clock: ManualClock) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Fail calls to `capability` (optionally only with argument `arg`).
    pub fn fail_on(mut self, capability: &str, arg: Option<&str>, message: &str) -> Self {
        self.failures.push(Failure {
            capability: capability.to_string(),
            arg: arg.map(str::to_string),
            message: message.to_string(),
        });
        self
    }

    pub fn calls(&self) -> &[RecordedCall] {
        &self.calls
    }

    /// Calls as `(capability, first arg)` pairs for compact assertions.
    pub fn trace(&self) -> Vec<(String, String)> {
        self.calls
            .iter()
            .map(|c| (c.capability.clone(), c.args.first().cloned().unwrap_or_default()))
            .collect()
    }

    fn record(&mut self, capability: &str, args: &[&str]) -> AutomationResult {
        self.calls.push(RecordedCall {
            capability: capability.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        });
        let failure = self.failures.iter().find(|f| {
            f.capability == capability
                && f.arg.as_deref().is_none_or(|arg| args.first() == Some(&arg))
        });
        match failure {
            Some(f) => Err(AutomationError::failed(capability, f.message.clone())),
            None => Ok(()),
        }
    }

    fn activate(&self, name: &str) {
        if let Some(desktop) = self.desktop.as_ref().filter(|d| d.focus_follows) {
            *desktop.active.borrow_mut() = Some(name.to_string());
        }
    }
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl Primitives for RecordingSurface {
    fn insert(&mut self, text: &str) -> AutomationResult {
        self.record("insert", &[text])
    }

    fn key(&mut self, combo: &str) -> AutomationResult {
        self.record("key", &[combo])
    }

    fn sleep(&mut self, duration: Duration) -> AutomationResult {
        let ms = duration.as_millis().to_string();
        self.record("sleep", &[&format!("{}ms", ms)])?;
        if let Some(clock) = &self.clock {
            clock.advance(duration);
        }
        Ok(())
    }
}

impl WindowManager for RecordingSurface {
    fn focus(&mut self, app_name: &str) -> AutomationResult {
        self.record("window.focus", &[app_name])?;
        self.activate(app_name);
        Ok(())
    }

    fn launch(&mut self, command: &str) -> AutomationResult {
        self.record("window.launch", &[command])?;
        self.activate(command);
        Ok(())
    }
}

impl Browser for RecordingSurface {
    fn navigate(&mut self, url: &str) -> AutomationResult {
        if !self.browser_supported {
            return Err(AutomationError::Unsupported {
                capability: "browser.navigate",
            });
        }
        self.record("browser.navigate", &[url])
    }

    fn focus_address_bar(&mut self) -> AutomationResult {
        if !self.browser_supported {
            return Err(AutomationError::Unsupported {
                capability: "browser.focus_address",
            });
        }
        self.record("browser.focus_address", &[])
    }
}

impl Editor for RecordingSurface {
    fn find(&mut self, text: &str) -> AutomationResult {
        self.record("edit.find", &[text])
    }
    fn copy(&mut self) -> AutomationResult {
        self.record("edit.copy", &[])
    }
    fn paste(&mut self) -> AutomationResult {
        self.record("edit.paste", &[])
    }
    fn select_all(&mut self) -> AutomationResult {
        self.record("edit.select_all", &[])
    }
    fn undo(&mut self) -> AutomationResult {
        self.record("edit.undo", &[])
    }
    fn redo(&mut self) -> AutomationResult {
        self.record("edit.redo", &[])
    }
    fn line_start(&mut self) -> AutomationResult {
        self.record("edit.line_start", &[])
    }
    fn line_end(&mut self) -> AutomationResult {
        self.record("edit.line_end", &[])
    }
    fn delete(&mut self) -> AutomationResult {
        self.record("edit.delete", &[])
    }
}

impl Tabs for RecordingSurface {
    fn tab_open(&mut self) -> AutomationResult {
        self.record("tabs.open", &[])
    }
}

impl AutomationSurface for RecordingSurface {
    fn windowing(&self) -> Option<&dyn Windowing> {
        self.desktop.as_ref().map(|d| d as &dyn Windowing)
    }
}
