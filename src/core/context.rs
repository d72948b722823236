//! DP-007: Desktop context for planner prompts.

use crate::automation::Windowing;
use crate::catalog::LaunchCatalog;
use std::collections::BTreeSet;
use tracing::debug;

/// Running apps listed in a prompt.
pub const RUNNING_APPS_LIMIT: usize = 40;

/// Anything that can describe the desktop for a request.
pub trait ContextSource {
    fn context_text(&self, request: &str) -> String;
}

/// Live context: active app, running apps, launch catalog ranked by the request.
pub struct PlannerContext<'a> {
    windowing: Option<&'a dyn Windowing>,
    catalog: &'a LaunchCatalog,
}

impl<'a> PlannerContext<'a> {
    pub fn new(windowing: Option<&'a dyn Windowing>, catalog: &'a LaunchCatalog) -> Self {
        Self { windowing, catalog }
    }

    fn active_section(&self) -> String {
        let active = self.windowing.and_then(|w| match w.active_app() {
            Ok(name) => name,
            Err(e) => {
                debug!(error = %e, "active app query failed");
                None
            }
        });
        match active {
            Some(name) => format!("Active app: {}", name),
            None => "Active app: unavailable".to_string(),
        }
    }

    fn running_section(&self) -> String {
        let names = self.running_names();
        if names.is_empty() {
            return "Running apps for switch_app: unavailable".to_string();
        }
        let listed: Vec<&str> = names
            .iter()
            .take(RUNNING_APPS_LIMIT)
            .map(String::as_str)
            .collect();
        format!("Running apps for switch_app:\n{}", listed.join(", "))
    }

    /// Sorted, deduplicated, non-empty running app names.
    fn running_names(&self) -> BTreeSet<String> {
        let Some(windowing) = self.windowing else {
            return BTreeSet::new();
        };
        match windowing.running_apps() {
            Ok(names) => names.into_iter().filter(|n| !n.trim().is_empty()).collect(),
            Err(e) => {
                debug!(error = %e, "running app query failed");
                BTreeSet::new()
            }
        }
    }
}

impl ContextSource for PlannerContext<'_> {
    fn context_text(&self, request: &str) -> String {
        [
            self.active_section(),
            self.running_section(),
            self.catalog.context_text(request),
        ]
        .join("\n\n")
    }
}

/// Fixed context text.
impl ContextSource for String {
    fn context_text(&self, _request: &str) -> String {
        self.clone()
    }
}
