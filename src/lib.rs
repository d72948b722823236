//! Deskplan: natural-language desktop requests to bounded UI-automation plans.
//!
//! A request is sent to a language model with a description of the desktop,
//! the reply is parsed into a typed plan and checked against guardrails, and
//! a confirmed plan is executed step by step against an automation surface.

pub mod audit;
pub mod automation;
pub mod catalog;
pub mod cli;
pub mod core;
pub mod transport;
