//! DP-021: Desktop entry scanning.
//!
//! Reads `[Desktop Entry]` sections of `*.desktop` files and keeps visible
//! applications whose executable actually resolves on this machine.

use super::LaunchEntry;
use crate::core::sync::split_command;
use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use tracing::debug;

const SECTION: &str = "[Desktop Entry]";

/// Scans a list of directories for launchable applications.
pub struct DesktopEntryReader<'a> {
    dirs: &'a [PathBuf],
}

#[derive(Debug, Default)]
struct RawEntry {
    kind: Option<String>,
    name: Option<String>,
    exec: Option<String>,
    no_display: Option<String>,
}

impl<'a> DesktopEntryReader<'a> {
    pub fn new(dirs: &'a [PathBuf]) -> Self {
        Self { dirs }
    }

    /// Entries from every directory. Earlier directories win on duplicate names.
    pub fn read_entries(&self) -> Vec<LaunchEntry> {
        let mut merged: IndexMap<String, String> = IndexMap::new();
        for path in self.desktop_files() {
            if let Some(entry) = parse_file(&path) {
                merged.entry(entry.name).or_insert(entry.command);
            }
        }
        let mut entries: Vec<LaunchEntry> = merged
            .into_iter()
            .map(|(name, command)| LaunchEntry { name, command })
            .collect();
        entries.sort_by_key(|e| e.name.to_lowercase());
        debug!(count = entries.len(), "launch catalog loaded");
        entries
    }

    fn desktop_files(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();
        for dir in self.dirs.iter().filter(|d| d.is_dir()) {
            let pattern = format!(
                "{}/*.desktop",
                glob::Pattern::escape(&dir.to_string_lossy())
            );
            match glob::glob(&pattern) {
                Ok(paths) => {
                    let mut found: Vec<PathBuf> = paths.flatten().collect();
                    found.sort();
                    files.extend(found);
                }
                Err(e) => debug!(dir = %dir.display(), error = %e, "bad desktop dir pattern"),
            }
        }
        files
    }
}

fn parse_file(path: &Path) -> Option<LaunchEntry> {
    let content = std::fs::read_to_string(path).ok()?;
    let raw = read_section(&content);

    if raw.kind.as_deref() != Some("Application") {
        return None;
    }
    if raw
        .no_display
        .as_deref()
        .is_some_and(|v| v.eq_ignore_ascii_case("true"))
    {
        return None;
    }

    let name = raw.name.as_deref().unwrap_or_default().trim().to_string();
    let command = canonical_exec(&clean_exec(raw.exec.as_deref().unwrap_or_default()))?;
    if name.is_empty() || looks_like_web_shortcut(&name, &command) {
        return None;
    }
    Some(LaunchEntry { name, command })
}

/// First value of each key inside the `[Desktop Entry]` section.
fn read_section(content: &str) -> RawEntry {
    let mut raw = RawEntry::default();
    let mut in_section = false;
    for line in content.lines().map(str::trim) {
        if line.starts_with('[') {
            in_section = line == SECTION;
            continue;
        }
        if !in_section || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let slot = match key.trim() {
            "Type" => &mut raw.kind,
            "Name" => &mut raw.name,
            "Exec" => &mut raw.exec,
            "NoDisplay" => &mut raw.no_display,
            _ => continue,
        };
        if slot.is_none() {
            *slot = Some(value.trim().to_string());
        }
    }
    raw
}

/// Drop `%f`/`%U`-style field codes.
fn clean_exec(exec_line: &str) -> Vec<String> {
    split_command(exec_line)
        .into_iter()
        .filter(|part| !part.starts_with('%'))
        .collect()
}

/// Command with its executable resolved to an absolute path.
fn canonical_exec(parts: &[String]) -> Option<String> {
    let (program, rest) = parts.split_first()?;
    let resolved = resolve_executable(program)?;
    let mut words = vec![resolved.to_string_lossy().to_string()];
    words.extend(rest.iter().cloned());
    Some(words.join(" "))
}

fn resolve_executable(program: &str) -> Option<PathBuf> {
    let direct = Path::new(program);
    if direct.is_absolute() {
        return direct.is_file().then(|| direct.to_path_buf());
    }
    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file())
}

fn looks_like_web_shortcut(name: &str, command: &str) -> bool {
    let combined = format!("{}\n{}", name, command).to_lowercase();
    combined.contains("http://") || combined.contains("https://")
}
