//! DP-004: Step executor. Runs a validated plan against an automation surface.
//!
//! Steps run strictly in order. The first failing step stops the run; nothing
//! already done is rolled back.

use super::sync::{self, Clock, SyncSettings};
use super::types::{Action, Plan, Step};
use crate::automation::{AutomationError, AutomationResult, AutomationSurface};
use crate::catalog::LaunchResolver;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Key chord that focuses a browser address bar.
pub const ADDRESS_BAR_COMBO: &str = "ctrl-l";
/// Key that submits the address bar.
pub const SUBMIT_COMBO: &str = "enter";

/// First failing step of a run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Step {step_index} ({action}) failed: {cause}")]
pub struct ExecutionError {
    /// 1-based index of the failing step
    pub step_index: usize,
    pub action: Action,
    pub cause: AutomationError,
}

/// Collaborators for one run.
pub struct ExecConfig<'a> {
    pub resolver: &'a dyn LaunchResolver,
    pub sync: &'a SyncSettings,
    pub clock: &'a dyn Clock,
}

type NoArgCall = fn(&mut dyn AutomationSurface) -> AutomationResult;
type TextCall = fn(&mut dyn AutomationSurface, &str) -> AutomationResult;

/// How an action reaches the surface.
enum Dispatch {
    NoArg(NoArgCall),
    Text(&'static str, TextCall),
    Sleep,
    GoUrl,
    FocusAddress,
    SwitchApp,
    LaunchApp,
}

fn dispatch_for(action: Action) -> Dispatch {
    match action {
        Action::NewTab => Dispatch::NoArg(|s| s.tab_open()),
        Action::Copy => Dispatch::NoArg(|s| s.copy()),
        Action::Paste => Dispatch::NoArg(|s| s.paste()),
        Action::SelectAll => Dispatch::NoArg(|s| s.select_all()),
        Action::Undo => Dispatch::NoArg(|s| s.undo()),
        Action::Redo => Dispatch::NoArg(|s| s.redo()),
        Action::LineStart => Dispatch::NoArg(|s| s.line_start()),
        Action::LineEnd => Dispatch::NoArg(|s| s.line_end()),
        Action::DeleteSelection => Dispatch::NoArg(|s| s.delete()),
        Action::FindText => Dispatch::Text("text", |s, text| s.find(text)),
        Action::InsertText => Dispatch::Text("text", |s, text| s.insert(text)),
        Action::Key => Dispatch::Text("combo", |s, combo| s.key(combo)),
        Action::Sleep => Dispatch::Sleep,
        Action::GoUrl => Dispatch::GoUrl,
        Action::FocusAddress => Dispatch::FocusAddress,
        Action::SwitchApp => Dispatch::SwitchApp,
        Action::LaunchApp => Dispatch::LaunchApp,
    }
}

/// Execute every step of `plan` in order.
pub fn execute(
    plan: &Plan,
    surface: &mut dyn AutomationSurface,
    cfg: &ExecConfig,
) -> Result<(), ExecutionError> {
    for (i, step) in plan.steps().iter().enumerate() {
        let step_index = i + 1;
        debug!(step = step_index, %step, "dispatching step");
        run_and_settle(step, surface, cfg).map_err(|cause| {
            warn!(step = step_index, action = %step.action(), error = %cause, "step failed");
            ExecutionError {
                step_index,
                action: step.action(),
                cause,
            }
        })?;
    }
    Ok(())
}

/// A settle failure counts as a failure of the step it follows.
fn run_and_settle(step: &Step, surface: &mut dyn AutomationSurface, cfg: &ExecConfig) -> AutomationResult {
    run_step(step, surface, cfg)?;
    settle_after(step.action(), surface, cfg.sync)
}

fn run_step(step: &Step, surface: &mut dyn AutomationSurface, cfg: &ExecConfig) -> AutomationResult {
    match dispatch_for(step.action()) {
        Dispatch::NoArg(call) => call(surface),
        Dispatch::Text(arg, call) => call(surface, required_str(step, arg)?),
        Dispatch::Sleep => surface.sleep(sleep_duration(step)?),
        Dispatch::GoUrl => go_url(surface, required_str(step, "url")?),
        Dispatch::FocusAddress => focus_address(surface),
        Dispatch::SwitchApp => switch_app(surface, cfg, required_str(step, "app_name")?),
        Dispatch::LaunchApp => launch_app(surface, cfg, required_str(step, "app_name")?),
    }
}

fn required_str<'s>(step: &'s Step, name: &str) -> AutomationResult<&'s str> {
    step.str_arg(name).ok_or_else(|| {
        AutomationError::failed(step.action().as_str(), format!("missing argument '{}'", name))
    })
}

fn sleep_duration(step: &Step) -> AutomationResult<Duration> {
    let ms = step
        .int_arg("ms")
        .ok_or_else(|| AutomationError::failed("sleep", "missing argument 'ms'"))?;
    u64::try_from(ms)
        .map(Duration::from_millis)
        .map_err(|_| AutomationError::failed("sleep", format!("negative duration {}ms", ms)))
}

fn settle_after(
    action: Action,
    surface: &mut dyn AutomationSurface,
    settings: &SyncSettings,
) -> AutomationResult {
    if !action.is_ui_sensitive() {
        return Ok(());
    }
    match sync::settle_delay(settings) {
        Some(delay) => surface.sleep(delay),
        None => Ok(()),
    }
}

// ============================================================================
// Browser fallbacks
// ============================================================================

fn go_url(surface: &mut dyn AutomationSurface, url: &str) -> AutomationResult {
    match surface.navigate(url) {
        Err(e) if e.is_unsupported() => {
            debug!(url, "navigate unsupported; typing into address bar");
            surface.key(ADDRESS_BAR_COMBO)?;
            surface.insert(url)?;
            surface.key(SUBMIT_COMBO)
        }
        other => other,
    }
}

fn focus_address(surface: &mut dyn AutomationSurface) -> AutomationResult {
    match surface.focus_address_bar() {
        Err(e) if e.is_unsupported() => {
            debug!("focus_address unsupported; using key chord");
            surface.key(ADDRESS_BAR_COMBO)
        }
        other => other,
    }
}

// ============================================================================
// App switching
// ============================================================================

fn switch_app(surface: &mut dyn AutomationSurface, cfg: &ExecConfig, app_name: &str) -> AutomationResult {
    if !sync::is_running_app(surface.windowing(), app_name) {
        debug!(app = app_name, "app not running; launching instead");
        return launch_app(surface, cfg, app_name);
    }
    // The app may have exited between the two queries
    if !sync::is_running_app(surface.windowing(), app_name) {
        return Err(AutomationError::NotRunning {
            app: app_name.to_string(),
        });
    }
    surface.focus(app_name)?;
    sync::wait_for_focus(surface, cfg.sync, cfg.clock, app_name, None)
}

/// Resolved catalog command first (when it differs), then the bare name.
pub fn launch_candidates(resolver: &dyn LaunchResolver, app_name: &str) -> Vec<String> {
    match resolver.resolve_launch_command(app_name) {
        Some(resolved) if !resolved.is_empty() && resolved != app_name => {
            vec![resolved, app_name.to_string()]
        }
        _ => vec![app_name.to_string()],
    }
}

fn launch_app(surface: &mut dyn AutomationSurface, cfg: &ExecConfig, app_name: &str) -> AutomationResult {
    let mut last_error = None;
    for candidate in launch_candidates(cfg.resolver, app_name) {
        match launch_and_wait(surface, cfg, app_name, &candidate) {
            Ok(()) => return Ok(()),
            Err(e) => {
                warn!(app = app_name, candidate = %candidate, error = %e, "launch candidate failed");
                last_error = Some(e);
            }
        }
    }
    Err(last_error.unwrap_or_else(|| AutomationError::LaunchExhausted {
        app: app_name.to_string(),
    }))
}

fn launch_and_wait(
    surface: &mut dyn AutomationSurface,
    cfg: &ExecConfig,
    app_name: &str,
    command: &str,
) -> AutomationResult {
    surface.launch(command)?;
    sync::wait_for_focus(surface, cfg.sync, cfg.clock, app_name, Some(command))
}
