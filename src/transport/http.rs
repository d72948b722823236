//! DP-031: OpenAI-compatible chat completions over blocking HTTP.

use super::{CompletionTransport, TransportError};
use crate::core::config::ApiConfig;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    #[serde(default)]
    content: Option<String>,
}

pub struct HttpTransport {
    client: Client,
    url: String,
    key_env: String,
}

impl HttpTransport {
    pub fn new(config: &ApiConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TransportError::Http(e.to_string()))?;
        Ok(Self {
            client,
            url: completions_url(&config.url),
            key_env: config.key_env.clone(),
        })
    }

    fn api_key(&self) -> Result<String, TransportError> {
        std::env::var(&self.key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| TransportError::MissingApiKey(self.key_env.clone()))
    }
}

/// `<base>/chat/completions`, tolerating a trailing slash or a full URL.
pub fn completions_url(base: &str) -> String {
    let base = base.trim_end_matches('/');
    if base.ends_with("/chat/completions") {
        base.to_string()
    } else {
        format!("{}/chat/completions", base)
    }
}

/// Assistant text of the first choice.
pub fn extract_message(body: &str) -> Result<String, TransportError> {
    let parsed: ChatResponse =
        serde_json::from_str(body).map_err(|e| TransportError::Response(e.to_string()))?;
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| TransportError::Response("missing choices[0].message.content".to_string()))
}

impl CompletionTransport for HttpTransport {
    fn request_completion(
        &self,
        system: &str,
        user: &str,
        model: &str,
        debug: bool,
    ) -> Result<String, TransportError> {
        if debug {
            info!(model, endpoint = "api", url = %self.url, "requesting completion");
        }
        let key = self.api_key()?;
        let body = ChatRequest {
            model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
        };

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(key)
            .json(&body)
            .send()
            .map_err(|e| TransportError::Http(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .map_err(|e| TransportError::Http(e.to_string()))?;
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                body: text,
            });
        }
        debug!(bytes = text.len(), "completion received");
        extract_message(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dp031_completions_url() {
        assert_eq!(
            completions_url("https://api.openai.com/v1"),
            "https://api.openai.com/v1/chat/completions"
        );
        assert_eq!(
            completions_url("http://localhost:8080/v1/"),
            "http://localhost:8080/v1/chat/completions"
        );
        assert_eq!(
            completions_url("http://h/v1/chat/completions"),
            "http://h/v1/chat/completions"
        );
    }

    #[test]
    fn test_dp031_extract_message() {
        let body = r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"{\"steps\":[]}"}}]}"#;
        assert_eq!(extract_message(body).unwrap(), r#"{"steps":[]}"#);
    }

    #[test]
    fn test_dp031_extract_message_errors() {
        assert!(matches!(
            extract_message(r#"{"choices":[]}"#),
            Err(TransportError::Response(_))
        ));
        assert!(matches!(
            extract_message(r#"{"choices":[{"message":{"content":null}}]}"#),
            Err(TransportError::Response(_))
        ));
        assert!(matches!(
            extract_message("not json"),
            Err(TransportError::Response(_))
        ));
    }

    #[test]
    fn test_dp031_missing_key_fails_before_network() {
        let config = ApiConfig {
            url: "http://127.0.0.1:9".to_string(),
            key_env: "DESKPLAN_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            timeout_secs: 1,
        };
        let transport = HttpTransport::new(&config).unwrap();
        let err = transport
            .request_completion("sys", "user", "model", false)
            .unwrap_err();
        assert_eq!(
            err,
            TransportError::MissingApiKey("DESKPLAN_TEST_KEY_THAT_IS_NEVER_SET".to_string())
        );
    }
}
