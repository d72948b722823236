//! DP-008: YAML configuration.
//!
//! Parses deskplan.yaml and validates structural constraints:
//! - Guardrail limits must be positive
//! - Model must not be empty
//! - Endpoint must be a known transport
//! - Poll interval must be positive

use super::guardrails::GuardrailLimits;
use super::prompt::DEFAULT_SYSTEM_PROMPT;
use super::sync::SyncSettings;
use crate::catalog::CatalogConfig;
use crate::transport::KNOWN_ENDPOINTS;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default config file name.
pub const CONFIG_FILE: &str = "deskplan.yaml";

/// Validation error.
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// OpenAI-compatible HTTP endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL; `/chat/completions` is appended
    pub url: String,
    /// Environment variable holding the bearer token
    pub key_env: String,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            url: "https://api.openai.com/v1".to_string(),
            key_env: "OPENAI_API_KEY".to_string(),
            timeout_secs: 60,
        }
    }
}

/// `llm` command-line tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub command: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            command: "llm".to_string(),
        }
    }
}

/// Root of deskplan.yaml. Every field has a default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeskplanConfig {
    pub model: String,
    /// Completion transport: `api` or `llm`
    pub endpoint: String,
    pub api: ApiConfig,
    pub llm: LlmConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    pub debug: bool,
    pub state_dir: PathBuf,
    pub guardrails: GuardrailLimits,
    pub sync: SyncSettings,
    pub catalog: CatalogConfig,
}

impl Default for DeskplanConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            endpoint: "api".to_string(),
            api: ApiConfig::default(),
            llm: LlmConfig::default(),
            system_prompt: None,
            debug: false,
            state_dir: PathBuf::from("state"),
            guardrails: GuardrailLimits::default(),
            sync: SyncSettings::default(),
            catalog: CatalogConfig::default(),
        }
    }
}

impl DeskplanConfig {
    /// Configured system prompt, or the built-in one.
    pub fn system_prompt(&self) -> &str {
        self.system_prompt
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .unwrap_or(DEFAULT_SYSTEM_PROMPT)
    }
}

/// Parse a deskplan.yaml file from disk.
pub fn parse_config_file(path: &Path) -> Result<DeskplanConfig, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
    parse_config(&content)
}

/// Parse a deskplan.yaml from a string.
pub fn parse_config(yaml: &str) -> Result<DeskplanConfig, String> {
    if yaml.trim().is_empty() {
        return Ok(DeskplanConfig::default());
    }
    serde_yaml_ng::from_str(yaml).map_err(|e| format!("YAML parse error: {}", e))
}

/// Load the config at `path`, or defaults when the file does not exist.
pub fn load_config(path: &Path) -> Result<DeskplanConfig, String> {
    if !path.exists() {
        return Ok(DeskplanConfig::default());
    }
    parse_config_file(path)
}

/// Serialize a config back to YAML.
pub fn config_to_yaml(config: &DeskplanConfig) -> Result<String, String> {
    serde_yaml_ng::to_string(config).map_err(|e| format!("YAML serialize error: {}", e))
}

/// Validate a parsed config. Returns a list of errors (empty = valid).
pub fn validate_config(config: &DeskplanConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if config.model.trim().is_empty() {
        errors.push(ValidationError {
            message: "model must not be empty".to_string(),
        });
    }

    if config.endpoint.trim().is_empty() {
        errors.push(ValidationError {
            message: "endpoint must not be empty".to_string(),
        });
    } else if !KNOWN_ENDPOINTS.contains(&config.endpoint.as_str()) {
        errors.push(ValidationError {
            message: format!(
                "endpoint must be one of {}, got '{}'",
                KNOWN_ENDPOINTS.join(", "),
                config.endpoint
            ),
        });
    }

    if config.endpoint == "api" {
        if config.api.url.trim().is_empty() {
            errors.push(ValidationError {
                message: "api.url must not be empty".to_string(),
            });
        }
        if config.api.key_env.trim().is_empty() {
            errors.push(ValidationError {
                message: "api.key_env must not be empty".to_string(),
            });
        }
    }
    if config.endpoint == "llm" && config.llm.command.trim().is_empty() {
        errors.push(ValidationError {
            message: "llm.command must not be empty".to_string(),
        });
    }

    let limits = &config.guardrails;
    if limits.max_steps == 0 {
        errors.push(ValidationError {
            message: "guardrails.max_steps must be positive".to_string(),
        });
    }
    if limits.max_total_sleep_ms <= 0 {
        errors.push(ValidationError {
            message: "guardrails.max_total_sleep_ms must be positive".to_string(),
        });
    }
    if limits.max_insert_chars == 0 {
        errors.push(ValidationError {
            message: "guardrails.max_insert_chars must be positive".to_string(),
        });
    }

    if config.sync.poll_interval_ms == 0 {
        errors.push(ValidationError {
            message: "sync.poll_interval_ms must be positive".to_string(),
        });
    }

    errors
}
