//! Reply generation
//!
//! Loan and savings replies are computed directly from records.
//! Every other intent goes through the LLM with bounded retry, and
//! falls back to the rule-based summarizer when that is unavailable.
//! Each path persists its reply exactly once, best-effort.

use crate::classifier::Intent;
use crate::eligibility;
use crate::llm::{generate_with_retry, PromptMessage, RetryPolicy, TextGenerator};
use crate::models::ChatRole;
use crate::store::{persist_best_effort, PersistOutcome, RecordStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

pub mod fallback;
pub mod loan;
pub mod savings;

pub use fallback::fallback_reply;
pub use loan::{parse_loan_request, LoanRequest};

pub const SYSTEM_PROMPT: &str = "You are a merchant lending assistant. NEVER approve loans. \
Use the provided CONTEXT. Keep answer short (<=60 words). Cite logs/policy snippets when used.";

/// Where the reply text came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplySource {
    Computed,
    Generated,
    Fallback,
}

#[derive(Debug, Clone)]
pub struct GeneratedReply {
    pub text: String,
    pub source: ReplySource,
    pub persisted: PersistOutcome,
}

/// System boundary plus a human turn carrying context and query
pub fn build_prompt(context: &str, query: &str) -> Vec<PromptMessage> {
    vec![
        PromptMessage::system(SYSTEM_PROMPT),
        PromptMessage::human(format!(
            "Context:\n{}\n\nUser: {}\n\nAnswer succinctly and include next action.",
            context, query
        )),
    ]
}

pub struct ReplyGenerator {
    store: Arc<dyn RecordStore>,
    generator: Option<Arc<dyn TextGenerator>>,
    retry: RetryPolicy,
}

impl ReplyGenerator {
    /// `generator: None` means the LLM is disabled by configuration.
    pub fn new(
        store: Arc<dyn RecordStore>,
        generator: Option<Arc<dyn TextGenerator>>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            store,
            generator,
            retry,
        }
    }

    pub async fn generate(
        &self,
        intent: Intent,
        session_id: &str,
        query: &str,
        context: &str,
    ) -> GeneratedReply {
        let (text, source) = match intent {
            Intent::LoanRequest => (self.loan_precheck(session_id, query).await, ReplySource::Computed),
            Intent::SavingsPlan => (self.savings_plan(session_id).await, ReplySource::Computed),
            Intent::Database | Intent::Policy => self.llm_or_fallback(query, context).await,
        };

        let persisted =
            persist_best_effort(self.store.as_ref(), session_id, ChatRole::Assistant, &text).await;

        GeneratedReply {
            text,
            source,
            persisted,
        }
    }

    async fn loan_precheck(&self, merchant_id: &str, query: &str) -> String {
        let request = parse_loan_request(query);
        let verdict = eligibility::evaluate(
            self.store.as_ref(),
            merchant_id,
            request.amount,
            request.tenor_months,
        )
        .await;

        info!(
            merchant_id,
            amount = request.amount,
            tenor_months = request.tenor_months,
            eligible = verdict.eligible,
            "Loan pre-check computed"
        );

        loan::render_precheck(&request, &verdict)
    }

    async fn savings_plan(&self, merchant_id: &str) -> String {
        let avg_daily = match self
            .store
            .recent_transactions(merchant_id, savings::SAVINGS_WINDOW)
            .await
        {
            Ok(records) => savings::average_daily_sales(&records),
            Err(e) => {
                warn!(merchant_id, "Sales fetch failed for savings plan: {}", e);
                0.0
            }
        };

        savings::render_savings_plan(avg_daily)
    }

    async fn llm_or_fallback(&self, query: &str, context: &str) -> (String, ReplySource) {
        let Some(generator) = self.generator.as_ref() else {
            info!("LLM disabled, using rule-based fallback");
            return (fallback_reply(query, context), ReplySource::Fallback);
        };

        let prompt = build_prompt(context, query);

        match generate_with_retry(generator.as_ref(), &prompt, self.retry).await {
            Ok(text) => (text, ReplySource::Generated),
            Err(e) => {
                warn!("LLM unavailable after retries, using fallback: {}", e);
                (fallback_reply(query, context), ReplySource::Fallback)
            }
        }
    }
}
