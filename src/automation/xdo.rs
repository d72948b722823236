//! DP-011: X11 desktop backend via `xdotool` and `wmctrl`.
//!
//! Browser capabilities are left at their unsupported defaults so the
//! executor's key-based fallbacks drive the address bar.

use super::*;
use std::process::{Command, Stdio};
use tracing::debug;

/// Output from one helper program invocation.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Linux/X11 automation surface.
#[derive(Debug, Clone)]
pub struct XdoSurface {
    xdotool: String,
    wmctrl: String,
}

impl Default for XdoSurface {
    fn default() -> Self {
        Self::new("xdotool", "wmctrl")
    }
}

impl XdoSurface {
    pub fn new(xdotool: &str, wmctrl: &str) -> Self {
        Self {
            xdotool: xdotool.to_string(),
            wmctrl: wmctrl.to_string(),
        }
    }

    fn xdotool(&self, capability: &str, args: &[&str]) -> AutomationResult<String> {
        run_tool(capability, &self.xdotool, args)
    }

    fn wmctrl(&self, capability: &str, args: &[&str]) -> AutomationResult<String> {
        run_tool(capability, &self.wmctrl, args)
    }

    fn chord(&self, capability: &str, combo: &str) -> AutomationResult {
        self.chords(capability, &[combo.to_string()])
    }

    /// `xdotool key` with one argument per chord; it splits arguments on `+` only.
    fn chords(&self, capability: &str, chords: &[String]) -> AutomationResult {
        let mut args = vec!["key", "--clearmodifiers"];
        args.extend(chords.iter().map(String::as_str));
        self.xdotool(capability, &args).map(|_| ())
    }
}

/// Run a helper program to completion. Non-zero exit is a capability failure.
fn run_tool(capability: &str, program: &str, args: &[&str]) -> AutomationResult<String> {
    debug!(program, ?args, "running desktop helper");
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| AutomationError::failed(capability, format!("failed to spawn {}: {}", program, e)))?;

    let out = ToolOutput {
        exit_code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    };
    if out.success() {
        Ok(out.stdout)
    } else {
        Err(AutomationError::failed(
            capability,
            format!("{} exit {}: {}", program, out.exit_code, out.stderr.trim()),
        ))
    }
}

/// `ctrl-shift-t` becomes `["ctrl+shift+t"]`; `ctrl-k ctrl-c` becomes two chords.
pub fn xdo_chords(combo: &str) -> Vec<String> {
    combo
        .split_whitespace()
        .map(|chord| {
            chord
                .split('-')
                .map(xdo_key_name)
                .collect::<Vec<_>>()
                .join("+")
        })
        .collect()
}

fn xdo_key_name(key: &str) -> &str {
    match key.to_ascii_lowercase().as_str() {
        "enter" | "return" => "Return",
        "esc" | "escape" => "Escape",
        "tab" => "Tab",
        "space" => "space",
        "backspace" => "BackSpace",
        "delete" | "del" => "Delete",
        "home" => "Home",
        "end" => "End",
        "up" => "Up",
        "down" => "Down",
        "left" => "Left",
        "right" => "Right",
        "pageup" => "Page_Up",
        "pagedown" => "Page_Down",
        "cmd" | "super" | "win" => "super",
        "option" => "alt",
        _ => key,
    }
}

/// Window class names from `wmctrl -lx` output, in listing order, deduplicated.
///
/// Each line is `id desktop instance.Class host title…`; the class half of the
/// third column is the application name.
pub fn parse_wmctrl_classes(listing: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for line in listing.lines() {
        let Some(wm_class) = line.split_whitespace().nth(2) else {
            continue;
        };
        let class = wm_class.rsplit('.').next().unwrap_or(wm_class);
        if class.is_empty() || class == "N/A" {
            continue;
        }
        if !names.iter().any(|n| n == class) {
            names.push(class.to_string());
        }
    }
    names
}

impl Primitives for XdoSurface {
    fn insert(&mut self, text: &str) -> AutomationResult {
        self.xdotool("insert", &["type", "--delay", "0", "--", text])
            .map(|_| ())
    }

    fn key(&mut self, combo: &str) -> AutomationResult {
        self.chords("key", &xdo_chords(combo))
    }

    fn sleep(&mut self, duration: Duration) -> AutomationResult {
        std::thread::sleep(duration);
        Ok(())
    }
}

impl WindowManager for XdoSurface {
    fn focus(&mut self, app_name: &str) -> AutomationResult {
        // `-x` matches WM_CLASS, the names running_apps reports
        self.wmctrl("window.focus", &["-x", "-a", app_name]).map(|_| ())
    }

    /// Detached: the outer shell backgrounds the command and exits at once, so
    /// the app is reparented and the shell is reaped here.
    fn launch(&mut self, command: &str) -> AutomationResult {
        debug!(command, "launching app");
        let status = Command::new("sh")
            .args(["-c", "sh -c \"$1\" &", "sh", command])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| AutomationError::failed("window.launch", e.to_string()))?;
        if status.success() {
            Ok(())
        } else {
            Err(AutomationError::failed(
                "window.launch",
                format!("sh exit {}", status.code().unwrap_or(-1)),
            ))
        }
    }
}

impl Browser for XdoSurface {}

impl Editor for XdoSurface {
    fn find(&mut self, text: &str) -> AutomationResult {
        self.chord("edit.find", "ctrl+f")?;
        self.xdotool("edit.find", &["type", "--delay", "0", "--", text])
            .map(|_| ())
    }
    fn copy(&mut self) -> AutomationResult {
        self.chord("edit.copy", "ctrl+c")
    }
    fn paste(&mut self) -> AutomationResult {
        self.chord("edit.paste", "ctrl+v")
    }
    fn select_all(&mut self) -> AutomationResult {
        self.chord("edit.select_all", "ctrl+a")
    }
    fn undo(&mut self) -> AutomationResult {
        self.chord("edit.undo", "ctrl+z")
    }
    fn redo(&mut self) -> AutomationResult {
        self.chord("edit.redo", "ctrl+shift+z")
    }
    fn line_start(&mut self) -> AutomationResult {
        self.chord("edit.line_start", "Home")
    }
    fn line_end(&mut self) -> AutomationResult {
        self.chord("edit.line_end", "End")
    }
    fn delete(&mut self) -> AutomationResult {
        self.chord("edit.delete", "Delete")
    }
}

impl Tabs for XdoSurface {
    fn tab_open(&mut self) -> AutomationResult {
        self.chord("tabs.open", "ctrl+t")
    }
}

impl Windowing for XdoSurface {
    fn running_apps(&self) -> AutomationResult<Vec<String>> {
        let listing = self.wmctrl("windowing.running_apps", &["-lx"])?;
        Ok(parse_wmctrl_classes(&listing))
    }

    fn active_app(&self) -> AutomationResult<Option<String>> {
        let name = self.xdotool(
            "windowing.active_app",
            &["getactivewindow", "getwindowclassname"],
        )?;
        let name = name.trim();
        Ok((!name.is_empty()).then(|| name.to_string()))
    }
}

impl AutomationSurface for XdoSurface {
    fn windowing(&self) -> Option<&dyn Windowing> {
        Some(self)
    }
}
