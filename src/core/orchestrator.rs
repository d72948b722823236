//! DP-001: Request lifecycle.
//!
//! A request is planned from a context prompt and a completion, parsed (with
//! one repair round on parse failure only) and guardrail-checked before it
//! becomes pending. Running confirms the plan and persists it as the last
//! confirmed plan.

use super::config::DeskplanConfig;
use super::context::ContextSource;
use super::executor::{self, ExecConfig, ExecutionError};
use super::guardrails::{validate_guardrails, GuardrailError};
use super::parser::{parse_plan, ParseError};
use super::prompt::{build_repair_prompt, build_user_prompt};
use super::state::{self, Session};
use super::types::Plan;
use crate::audit::eventlog::{generate_run_id, AuditLog};
use crate::audit::{plan_fingerprint, AuditEvent};
use crate::automation::AutomationSurface;
use crate::transport::{CompletionTransport, TransportError};
use std::path::PathBuf;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Request text recorded for a repeated plan.
pub const REPEAT_REQUEST: &str = "Repeat last confirmed plan";

/// Terminal planning failure. Each kind stays distinct.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanningError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Guardrail(#[from] GuardrailError),
}

/// User-facing status messages.
pub trait Notifier {
    fn notify(&self, message: &str);
}

pub struct Orchestrator<'a> {
    config: &'a DeskplanConfig,
    transport: &'a dyn CompletionTransport,
    notifier: &'a dyn Notifier,
    state_dir: Option<PathBuf>,
    audit: AuditLog,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        config: &'a DeskplanConfig,
        transport: &'a dyn CompletionTransport,
        notifier: &'a dyn Notifier,
    ) -> Self {
        Self {
            config,
            transport,
            notifier,
            state_dir: None,
            audit: AuditLog::disabled(),
        }
    }

    /// Persist confirmed plans and audit events under `state_dir`.
    pub fn with_state_dir(mut self, state_dir: impl Into<PathBuf>) -> Self {
        let dir = state_dir.into();
        self.audit = AuditLog::new(&dir);
        self.state_dir = Some(dir);
        self
    }

    fn notify(&self, message: &str) {
        if self.config.debug {
            info!(notification = message);
        }
        self.notifier.notify(message);
    }

    /// Turn `text` into a pending plan. `Ok(None)` when the request is blank.
    pub fn generate(
        &self,
        session: &mut Session,
        context: &dyn ContextSource,
        text: &str,
        model: &str,
    ) -> Result<Option<usize>, PlanningError> {
        if text.trim().is_empty() {
            self.notify("Semantic command is empty");
            return Ok(None);
        }

        match self.translate(context, text, model) {
            Ok((plan, repaired)) => {
                let steps = plan.len();
                info!(steps, repaired, "plan ready");
                self.audit.record(AuditEvent::PlanGenerated {
                    request: text.to_string(),
                    steps,
                    plan_hash: plan_fingerprint(&plan),
                    repaired,
                });
                session.set_pending(text, plan);
                self.notify(&format!("Semantic plan ready: {} steps", steps));
                Ok(Some(steps))
            }
            Err(e) => {
                warn!(error = %e, "planning failed");
                self.audit.record(AuditEvent::PlanningFailed {
                    request: text.to_string(),
                    error: e.to_string(),
                });
                session.set_error(e.to_string());
                self.notify(&format!("Semantic planning failed: {}", e));
                Err(e)
            }
        }
    }

    /// Plan plus whether a repair round-trip was needed.
    fn translate(
        &self,
        context: &dyn ContextSource,
        text: &str,
        model: &str,
    ) -> Result<(Plan, bool), PlanningError> {
        let system = self.config.system_prompt();
        let debug = self.config.debug;
        let prompt = build_user_prompt(text, &context.context_text(text));
        let raw = self.transport.request_completion(system, &prompt, model, debug)?;

        let (plan, repaired) = match parse_plan(&raw) {
            Ok(plan) => (plan, false),
            Err(e) => {
                debug!(errors = ?e.errors, "response failed schema validation; repairing");
                let repair = build_repair_prompt(&raw, &e.errors);
                let fixed = self.transport.request_completion(system, &repair, model, debug)?;
                (parse_plan(&fixed)?, true)
            }
        };
        validate_guardrails(&plan, &self.config.guardrails)?;
        Ok((plan, repaired))
    }

    /// Execute the pending plan. `Ok(false)` when nothing is pending.
    pub fn run_pending(
        &self,
        session: &mut Session,
        surface: &mut dyn AutomationSurface,
        exec: &ExecConfig,
    ) -> Result<bool, ExecutionError> {
        let Some(pending) = session.pending().cloned() else {
            self.notify("No semantic plan to run");
            return Ok(false);
        };

        let run_id = generate_run_id();
        let start = Instant::now();
        info!(run_id = %run_id, steps = pending.plan.len(), "executing plan");
        self.audit.record(AuditEvent::ExecutionStarted {
            run_id: run_id.clone(),
            steps: pending.plan.len(),
            plan_hash: plan_fingerprint(&pending.plan),
        });

        if let Err(e) = executor::execute(&pending.plan, surface, exec) {
            self.audit.record(AuditEvent::ExecutionFailed {
                run_id,
                step: e.step_index,
                action: e.action.to_string(),
                error: e.cause.to_string(),
            });
            session.set_error(e.to_string());
            self.notify(&format!("Semantic execution failed: {}", e));
            return Err(e);
        }

        self.audit.record(AuditEvent::ExecutionCompleted {
            run_id,
            steps: pending.plan.len(),
            duration_ms: u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
        });
        session.confirm_pending();
        session.clear_pending();
        self.persist_last(&pending.plan);
        self.notify("Semantic plan completed");
        Ok(true)
    }

    fn persist_last(&self, plan: &Plan) {
        let Some(dir) = &self.state_dir else {
            return;
        };
        if let Err(e) = state::save_last_plan(dir, plan) {
            warn!(error = %e, "failed to persist last plan");
        }
    }

    pub fn cancel_pending(&self, session: &mut Session) {
        let steps = session.pending().map_or(0, |p| p.plan.len());
        session.clear_pending();
        self.audit.record(AuditEvent::PlanCanceled { steps });
        self.notify("Semantic plan canceled");
    }

    /// Serialized pending plan, if any.
    pub fn copy_pending(&self, session: &Session) -> Option<String> {
        match session.pending() {
            Some(pending) => {
                self.notify("Semantic plan copied");
                Some(pending.to_json())
            }
            None => {
                self.notify("No semantic plan to copy");
                None
            }
        }
    }

    /// Make the last confirmed plan pending again. `false` when there is none.
    pub fn repeat_last(&self, session: &mut Session) -> bool {
        let Some(plan) = session.last_confirmed().cloned() else {
            self.notify("No last semantic plan to repeat");
            return false;
        };
        session.set_pending(REPEAT_REQUEST, plan);
        true
    }
}
