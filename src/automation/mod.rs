//! DP-010: Automation capability surface.
//!
//! The executor dispatches onto a small set of explicit interfaces instead of
//! looking methods up by name. Browser capabilities default to
//! [`AutomationError::Unsupported`] so backends that lack them get the
//! key-based fallbacks; any other error always propagates.

pub mod recording;
pub mod xdo;

use std::time::Duration;
use thiserror::Error;

/// Failure raised by an automation capability or by step synchronization.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AutomationError {
    /// The backend does not implement this capability at all.
    #[error("{capability} is not implemented by this backend")]
    Unsupported { capability: &'static str },

    #[error("{capability} failed: {message}")]
    Failed { capability: String, message: String },

    #[error("App not running: '{app}'. Open it or use launch_app.")]
    NotRunning { app: String },

    #[error("App did not become active in {timeout_ms}ms: '{app}'")]
    FocusTimeout { app: String, timeout_ms: u64 },

    #[error("Unable to launch app: '{app}'")]
    LaunchExhausted { app: String },
}

impl AutomationError {
    pub fn failed(capability: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failed {
            capability: capability.into(),
            message: message.into(),
        }
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported { .. })
    }
}

pub type AutomationResult<T = ()> = Result<T, AutomationError>;

/// Raw input primitives.
pub trait Primitives {
    fn insert(&mut self, text: &str) -> AutomationResult;
    fn key(&mut self, combo: &str) -> AutomationResult;
    fn sleep(&mut self, duration: Duration) -> AutomationResult;
}

/// Window switching and application launch.
pub trait WindowManager {
    fn focus(&mut self, app_name: &str) -> AutomationResult;
    fn launch(&mut self, command: &str) -> AutomationResult;
}

/// Browser navigation. Both capabilities may be absent.
pub trait Browser {
    fn navigate(&mut self, _url: &str) -> AutomationResult {
        Err(AutomationError::Unsupported {
            capability: "browser.navigate",
        })
    }

    fn focus_address_bar(&mut self) -> AutomationResult {
        Err(AutomationError::Unsupported {
            capability: "browser.focus_address",
        })
    }
}

/// Text editing operations on the focused widget.
pub trait Editor {
    fn find(&mut self, text: &str) -> AutomationResult;
    fn copy(&mut self) -> AutomationResult;
    fn paste(&mut self) -> AutomationResult;
    fn select_all(&mut self) -> AutomationResult;
    fn undo(&mut self) -> AutomationResult;
    fn redo(&mut self) -> AutomationResult;
    fn line_start(&mut self) -> AutomationResult;
    fn line_end(&mut self) -> AutomationResult;
    fn delete(&mut self) -> AutomationResult;
}

pub trait Tabs {
    fn tab_open(&mut self) -> AutomationResult;
}

/// Read-only view of the desktop's applications.
pub trait Windowing {
    /// Names of foreground applications currently running.
    fn running_apps(&self) -> AutomationResult<Vec<String>>;
    /// Name of the application owning the focused window, if any.
    fn active_app(&self) -> AutomationResult<Option<String>>;
}

/// Everything the step executor needs from a desktop backend.
pub trait AutomationSurface: Primitives + WindowManager + Browser + Editor + Tabs {
    /// Window introspection, when the environment can report it.
    fn windowing(&self) -> Option<&dyn Windowing> {
        None
    }
}
