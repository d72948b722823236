//! DP-022: Launch entry matching and ranking.

use super::{command_name, normalize_text, LaunchEntry};
use std::collections::BTreeSet;

/// Filler words ignored when scoring query tokens.
pub const STOP_WORDS: &[&str] = &[
    "a",
    "an",
    "app",
    "application",
    "launch",
    "model",
    "open",
    "please",
    "run",
    "start",
    "the",
];

const EXACT_SCORE: u32 = 10;
const PARTIAL_SCORE: u32 = 5;

pub struct LaunchMatcher {
    stop_words: BTreeSet<String>,
}

impl Default for LaunchMatcher {
    fn default() -> Self {
        Self::new(STOP_WORDS.iter().copied())
    }
}

impl LaunchMatcher {
    pub fn new<'a>(stop_words: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            stop_words: stop_words.into_iter().map(str::to_string).collect(),
        }
    }

    /// Command for `app_name`: by entry name first, then by executable name.
    pub fn resolve(&self, app_name: &str, entries: &[LaunchEntry]) -> Option<String> {
        let target = normalize_text(app_name);
        let by_name = entries.iter().find(|e| {
            let name = normalize_text(&e.name);
            name == target || (!target.is_empty() && name.contains(&target))
        });
        by_name
            .or_else(|| entries.iter().find(|e| command_name(&e.command) == target))
            .map(|e| e.command.clone())
    }

    /// Top `limit` entries by score. An empty query keeps catalog order.
    pub fn rank<'e>(
        &self,
        query: &str,
        entries: &'e [LaunchEntry],
        limit: usize,
    ) -> Vec<&'e LaunchEntry> {
        if query.trim().is_empty() {
            return entries.iter().take(limit).collect();
        }
        let mut scored: Vec<(u32, &LaunchEntry)> =
            entries.iter().map(|e| (self.score(query, e), e)).collect();
        scored.sort_by(|(sa, a), (sb, b)| {
            sb.cmp(sa)
                .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        });
        scored.into_iter().take(limit).map(|(_, e)| e).collect()
    }

    fn score(&self, query: &str, entry: &LaunchEntry) -> u32 {
        let target = normalize_text(query);
        if target.is_empty() {
            return 0;
        }
        let name_key = normalize_text(&entry.name);
        let command_key = command_name(&entry.command);

        let base = if target == name_key || target == command_key {
            EXACT_SCORE
        } else if name_key.contains(&target) || command_key.contains(&target) {
            PARTIAL_SCORE
        } else {
            0
        };

        let tokens = target
            .split_whitespace()
            .filter(|t| t.chars().count() > 1 && !self.stop_words.contains(*t))
            .filter(|t| name_key.contains(t) || command_key.contains(t))
            .count();
        base + u32::try_from(tokens).unwrap_or(u32::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries() -> Vec<LaunchEntry> {
        vec![
            LaunchEntry::new("Calculator", "/usr/bin/gnome-calculator"),
            LaunchEntry::new("Firefox", "/usr/bin/firefox"),
            LaunchEntry::new("Firefox Developer Edition", "/opt/firefox-dev/firefox"),
            LaunchEntry::new("Visual Studio Code", "/usr/bin/code --new-window"),
        ]
    }

    #[test]
    fn test_dp022_resolve_by_name() {
        let m = LaunchMatcher::default();
        let e = entries();
        assert_eq!(m.resolve("firefox", &e).as_deref(), Some("/usr/bin/firefox"));
        assert_eq!(
            m.resolve("studio", &e).as_deref(),
            Some("/usr/bin/code --new-window")
        );
    }

    #[test]
    fn test_dp022_resolve_by_command() {
        let m = LaunchMatcher::default();
        let e = vec![LaunchEntry::new("Editor", "gedit --standalone")];
        assert_eq!(m.resolve("gedit", &e).as_deref(), Some("gedit --standalone"));
        assert_eq!(m.resolve("slack", &e), None);
    }

    #[test]
    fn test_dp022_rank_exact_first() {
        let m = LaunchMatcher::default();
        let e = entries();
        let ranked = m.rank("firefox", &e, 2);
        let names: Vec<_> = ranked.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Firefox", "Firefox Developer Edition"]);
    }

    #[test]
    fn test_dp022_rank_ignores_stop_words() {
        let m = LaunchMatcher::default();
        let e = entries();
        let ranked = m.rank("please open the code app", &e, 1);
        assert_eq!(ranked[0].name, "Visual Studio Code");
    }

    #[test]
    fn test_dp022_rank_empty_query_keeps_order() {
        let m = LaunchMatcher::default();
        let e = entries();
        let ranked = m.rank("  ", &e, 3);
        assert_eq!(ranked.len(), 3);
        assert_eq!(ranked[0].name, "Calculator");
    }

    #[test]
    fn test_dp022_rank_ties_by_name() {
        let m = LaunchMatcher::default();
        let e = entries();
        let ranked = m.rank("slack", &e, 10);
        let names: Vec<_> = ranked.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Calculator",
                "Firefox",
                "Firefox Developer Edition",
                "Visual Studio Code"
            ]
        );
    }
}
