//! Core planning logic: types, parsing, guardrails, prompts, execution, sessions.

pub mod config;
pub mod context;
pub mod executor;
pub mod guardrails;
pub mod orchestrator;
pub mod parser;
pub mod prompt;
pub mod state;
pub mod sync;
pub mod types;
