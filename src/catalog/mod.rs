//! DP-020: Launchable application catalog.
//!
//! Discovers launch commands from desktop entries, resolves spoken app names to
//! commands for `launch_app`, and renders the ranked list for planner prompts.

pub mod matcher;
pub mod reader;

use matcher::LaunchMatcher;
use reader::DesktopEntryReader;
use serde::{Deserialize, Serialize};
use std::cell::OnceCell;
use std::path::PathBuf;

/// How many catalog lines go into a planner prompt.
pub const CONTEXT_LIMIT: usize = 300;

/// Name shown to the user and the command that launches it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchEntry {
    pub name: String,
    pub command: String,
}

impl LaunchEntry {
    pub fn new(name: &str, command: &str) -> Self {
        Self {
            name: name.to_string(),
            command: command.to_string(),
        }
    }
}

/// Resolves an app name to a launch command.
pub trait LaunchResolver {
    fn resolve_launch_command(&self, app_name: &str) -> Option<String>;
}

/// Catalog configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Directories scanned for `*.desktop` files, in priority order
    pub desktop_dirs: Vec<PathBuf>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        let mut desktop_dirs = Vec::new();
        let home = std::env::var("HOME").ok().map(PathBuf::from);
        if let Some(ref home) = home {
            desktop_dirs.push(home.join(".local/share/applications"));
        }
        desktop_dirs.push(PathBuf::from("/usr/share/applications"));
        desktop_dirs.push(PathBuf::from("/var/lib/flatpak/exports/share/applications"));
        if let Some(ref home) = home {
            desktop_dirs.push(home.join(".local/share/flatpak/exports/share/applications"));
        }
        Self { desktop_dirs }
    }
}

/// Catalog backed by desktop entries, loaded once on first use.
pub struct LaunchCatalog {
    dirs: Vec<PathBuf>,
    entries: OnceCell<Vec<LaunchEntry>>,
    matcher: LaunchMatcher,
}

impl LaunchCatalog {
    pub fn new(config: &CatalogConfig) -> Self {
        Self {
            dirs: config.desktop_dirs.clone(),
            entries: OnceCell::new(),
            matcher: LaunchMatcher::default(),
        }
    }

    /// Catalog over a fixed entry list (no disk access).
    pub fn from_entries(entries: Vec<LaunchEntry>) -> Self {
        Self {
            dirs: Vec::new(),
            entries: OnceCell::from(entries),
            matcher: LaunchMatcher::default(),
        }
    }

    pub fn entries(&self) -> &[LaunchEntry] {
        self.entries
            .get_or_init(|| DesktopEntryReader::new(&self.dirs).read_entries())
    }

    /// Entries ranked by relevance to `query`.
    pub fn ranked(&self, query: &str, limit: usize) -> Vec<&LaunchEntry> {
        self.matcher.rank(query, self.entries(), limit)
    }

    /// Planner prompt section listing launchable apps.
    pub fn context_text(&self, query: &str) -> String {
        let entries = self.ranked(query, CONTEXT_LIMIT);
        if entries.is_empty() {
            return "Launchable apps for launch_app: unavailable".to_string();
        }
        let mut lines = vec!["Launchable apps for launch_app (name => command):".to_string()];
        lines.extend(entries.iter().map(|e| format!("- {} => {}", e.name, e.command)));
        lines.join("\n")
    }
}

impl LaunchResolver for LaunchCatalog {
    fn resolve_launch_command(&self, app_name: &str) -> Option<String> {
        self.matcher.resolve(app_name, self.entries())
    }
}

/// Lower-case, `-` to space, collapse whitespace.
pub fn normalize_text(value: &str) -> String {
    value
        .to_lowercase()
        .replace('-', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Normalized executable word of a command line.
pub fn command_name(command: &str) -> String {
    normalize_text(&crate::core::sync::first_token(command))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> LaunchCatalog {
        LaunchCatalog::from_entries(vec![
            LaunchEntry::new("Firefox", "/usr/bin/firefox"),
            LaunchEntry::new("Text Editor", "/usr/bin/gnome-text-editor"),
        ])
    }

    #[test]
    fn test_dp020_resolve() {
        let c = catalog();
        assert_eq!(
            c.resolve_launch_command("text editor").as_deref(),
            Some("/usr/bin/gnome-text-editor")
        );
        assert_eq!(c.resolve_launch_command("Slack"), None);
    }

    #[test]
    fn test_dp020_context_text() {
        let text = catalog().context_text("firefox");
        assert!(text.starts_with("Launchable apps for launch_app (name => command):"));
        let first = text.lines().nth(1).unwrap();
        assert_eq!(first, "- Firefox => /usr/bin/firefox");
    }

    #[test]
    fn test_dp020_context_unavailable() {
        let empty = LaunchCatalog::from_entries(Vec::new());
        assert_eq!(
            empty.context_text("anything"),
            "Launchable apps for launch_app: unavailable"
        );
    }

    #[test]
    fn test_dp020_command_name() {
        assert_eq!(command_name("/usr/bin/gnome-text-editor --new"), "/usr/bin/gnome text editor");
        assert_eq!(command_name("code"), "code");
    }

    #[test]
    fn test_dp020_loads_from_dirs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("sh.desktop"),
            "[Desktop Entry]\nType=Application\nName=Shell\nExec=sh %U\n",
        )
        .unwrap();
        let c = LaunchCatalog::new(&CatalogConfig {
            desktop_dirs: vec![dir.path().to_path_buf()],
        });
        assert_eq!(c.entries().len(), 1);
        assert_eq!(c.entries()[0].name, "Shell");
        assert!(c.entries()[0].command.ends_with("sh"));
    }
}
