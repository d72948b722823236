//! DP-006: Planner prompts and one-shot repair prompts.

use super::types::Action;

/// System prompt used when the configuration does not override it.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You translate natural-language desktop requests into a \
strictly valid JSON action plan. Return only JSON. Never include markdown, prose, or code fences. \
Use only non-destructive actions and prefer the smallest plan that satisfies the request.";

const ROOT_SHAPE: &str = r#"{"steps":[{"action":"...", "args":{...}}], "summary":"optional"}"#;

const RULES: &[&str] = &[
    "Root keys allowed: steps, summary",
    "Step keys allowed: action, args",
    "No destructive/system power/quit/close shortcuts",
    "switch_app must use app names listed in running apps context",
    "launch_app.args.app_name must be exactly one command from launchable apps context",
    "Use executable commands from context, not capitalized product names",
    "If a requested app name is colloquial, map it to the closest launchable command by function",
    "Keep steps concise and deterministic",
];

/// Root shape plus one `- name(arg:kind, ...)` line per action, in schema order.
pub fn schema_text() -> String {
    let mut lines = vec![ROOT_SHAPE.to_string()];
    for action in Action::ALL {
        let args: Vec<String> = action
            .arg_spec()
            .iter()
            .map(|(name, kind)| format!("{}:{}", name, kind))
            .collect();
        lines.push(format!("- {}({})", action, args.join(", ")));
    }
    lines.join("\n")
}

fn rules_text() -> String {
    let mut lines = vec!["Rules:".to_string()];
    lines.extend(RULES.iter().map(|rule| format!("- {}", rule)));
    lines.join("\n")
}

/// First-attempt prompt: context, schema, rules, then the quoted request.
pub fn build_user_prompt(request: &str, context: &str) -> String {
    [
        format!("Active context:\n{}", context),
        format!("Allowed schema:\n{}", schema_text()),
        rules_text(),
        format!("User request:\n\"{}\"", request),
    ]
    .join("\n\n")
}

/// Repair prompt carrying the rejected response and every violation.
pub fn build_repair_prompt(previous_response: &str, errors: &[String]) -> String {
    let error_lines: Vec<String> = errors.iter().map(|e| format!("- {}", e)).collect();
    [
        "Your last response failed schema validation.".to_string(),
        format!("Validation errors:\n{}", error_lines.join("\n")),
        format!("Previous response:\n{}", previous_response),
        "Return corrected JSON only.".to_string(),
    ]
    .join("\n\n")
}
