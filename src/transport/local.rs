//! DP-032: Local `llm` command-line transport.

use super::{CompletionTransport, TransportError};
use crate::core::config::LlmConfig;
use crate::core::sync::split_command;
use std::io::Write;
use std::process::{Command, Stdio};
use tracing::info;

/// Runs `<command> -m <model> -s <system>` with the prompt on stdin.
pub struct LlmCliTransport {
    command: String,
}

impl LlmCliTransport {
    pub fn new(config: &LlmConfig) -> Self {
        Self {
            command: config.command.clone(),
        }
    }
}

impl CompletionTransport for LlmCliTransport {
    fn request_completion(
        &self,
        system: &str,
        user: &str,
        model: &str,
        debug: bool,
    ) -> Result<String, TransportError> {
        if debug {
            info!(model, endpoint = "llm", command = %self.command, "requesting completion");
        }
        let words = split_command(&self.command);
        let Some((program, extra)) = words.split_first() else {
            return Err(TransportError::Spawn {
                command: self.command.clone(),
                message: "empty command".to_string(),
            });
        };

        let mut child = Command::new(program)
            .args(extra)
            .args(["-m", model, "-s", system])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| TransportError::Spawn {
                command: program.clone(),
                message: e.to_string(),
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            // A command that exits without reading its prompt is reported by its exit status
            match stdin.write_all(user.as_bytes()) {
                Err(e) if e.kind() != std::io::ErrorKind::BrokenPipe => {
                    return Err(TransportError::Spawn {
                        command: program.clone(),
                        message: format!("stdin write error: {}", e),
                    });
                }
                _ => {}
            }
        }

        let output = child.wait_with_output().map_err(|e| TransportError::Spawn {
            command: program.clone(),
            message: format!("wait error: {}", e),
        })?;

        if !output.status.success() {
            return Err(TransportError::CommandFailed {
                command: program.clone(),
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport(command: &str) -> LlmCliTransport {
        LlmCliTransport::new(&LlmConfig {
            command: command.to_string(),
        })
    }

    #[test]
    fn test_dp032_passes_model_system_and_stdin() {
        let t = transport(r#"sh -c 'echo "$@"; cat' llm"#);
        let out = t
            .request_completion("be terse", "open firefox", "gpt-test", false)
            .unwrap();
        assert_eq!(out, "-m gpt-test -s be terse\nopen firefox");
    }

    #[test]
    fn test_dp032_nonzero_exit() {
        let t = transport(r#"sh -c 'echo boom >&2; exit 3' llm"#);
        let err = t.request_completion("s", "u", "m", false).unwrap_err();
        assert_eq!(
            err,
            TransportError::CommandFailed {
                command: "sh".to_string(),
                code: 3,
                stderr: "boom".to_string(),
            }
        );
    }

    #[test]
    fn test_dp032_missing_program() {
        let t = transport("deskplan-no-such-llm");
        assert!(matches!(
            t.request_completion("s", "u", "m", false),
            Err(TransportError::Spawn { .. })
        ));
    }

    #[test]
    fn test_dp032_empty_command() {
        let t = transport("   ");
        assert!(matches!(
            t.request_completion("s", "u", "m", false),
            Err(TransportError::Spawn { .. })
        ));
    }
}
