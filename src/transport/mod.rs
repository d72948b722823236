//! DP-030: Completion transports, HTTP API and `llm` CLI.

pub mod http;
pub mod local;

use crate::core::config::DeskplanConfig;
use thiserror::Error;

/// Endpoint names accepted in configuration.
pub const KNOWN_ENDPOINTS: &[&str] = &["api", "llm"];

/// Failure talking to a model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("Model endpoint is missing")]
    MissingEndpoint,

    #[error("Unknown model endpoint '{0}'")]
    UnknownEndpoint(String),

    #[error("API key variable {0} is not set")]
    MissingApiKey(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed completion response: {0}")]
    Response(String),

    #[error("failed to spawn {command}: {message}")]
    Spawn { command: String, message: String },

    #[error("{command} exited with code {code}: {stderr}")]
    CommandFailed {
        command: String,
        code: i32,
        stderr: String,
    },
}

/// Sends one system + user prompt pair and returns the model's text.
pub trait CompletionTransport {
    fn request_completion(
        &self,
        system: &str,
        user: &str,
        model: &str,
        debug: bool,
    ) -> Result<String, TransportError>;
}

/// Pick the transport named by `config.endpoint`.
pub fn route(config: &DeskplanConfig) -> Result<Box<dyn CompletionTransport>, TransportError> {
    match config.endpoint.trim() {
        "" => Err(TransportError::MissingEndpoint),
        "api" => Ok(Box::new(http::HttpTransport::new(&config.api)?)),
        "llm" => Ok(Box::new(local::LlmCliTransport::new(&config.llm))),
        other => Err(TransportError::UnknownEndpoint(other.to_string())),
    }
}
