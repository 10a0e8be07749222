//! Merchant Lending Assistant
//!
//! A chat assistant for small merchants on a lending platform that:
//! - Routes free-text queries by keyword intent
//! - Computes loan pre-checks and savings plans from financial records
//! - Answers failure lookups and policy questions through an LLM with retry
//! - Falls back to rule-based replies when the LLM is unavailable
//! - Never approves a loan; eligibility is advisory only
//!
//! FLOW:
//! CLASSIFY → GATHER? → GENERATE → PERSIST → RETURN

pub mod agent;
pub mod api;
pub mod classifier;
pub mod config;
pub mod context;
pub mod eligibility;
pub mod error;
pub mod llm;
pub mod models;
pub mod reply;
pub mod search;
pub mod store;
pub mod upload;

#[cfg(test)]
mod test_support;

pub use error::{AssistantError, GenerationError, Result};

// Re-export common types
pub use agent::{Backends, ChatOutcome, Orchestrator};
pub use classifier::{Intent, IntentClassifier};
pub use config::AssistantConfig;
pub use models::*;
