//! Context gatherers
//!
//! Each gatherer turns a query into prompt context for one intent.
//! Gatherers never fail: backend errors degrade to placeholder context.

use crate::classifier::Intent;
use crate::search::PolicySearch;
use crate::store::RecordStore;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, warn};

pub const RECENT_LOG_LIMIT: usize = 10;
pub const POLICY_TOP_K: usize = 3;

pub const NO_POLICY_DOC: &str = "No policy doc found";
pub const POLICY_SEARCH_FAILED: &str = "RAG search failed";

/// Trait for a single context source
#[async_trait::async_trait]
pub trait ContextGatherer: Send + Sync {
    fn name(&self) -> &'static str;
    async fn gather(&self, merchant_id: &str, query: &str) -> String;
}

/// Recent transaction logs for failure lookups
pub struct LogGatherer {
    store: Arc<dyn RecordStore>,
}

impl LogGatherer {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl ContextGatherer for LogGatherer {
    fn name(&self) -> &'static str {
        "db_tool"
    }

    async fn gather(&self, merchant_id: &str, _query: &str) -> String {
        let logs = match self.store.recent_logs(merchant_id, RECENT_LOG_LIMIT).await {
            Ok(logs) => logs,
            Err(e) => {
                warn!(merchant_id, "Log fetch failed, continuing with empty context: {}", e);
                Vec::new()
            }
        };

        debug!(merchant_id, entries = logs.len(), "Gathered recent logs");

        json!({ "recent_logs": logs }).to_string()
    }
}

/// Policy snippets from the knowledge base
pub struct PolicyGatherer {
    search: Arc<dyn PolicySearch>,
}

impl PolicyGatherer {
    pub fn new(search: Arc<dyn PolicySearch>) -> Self {
        Self { search }
    }
}

#[async_trait::async_trait]
impl ContextGatherer for PolicyGatherer {
    fn name(&self) -> &'static str {
        "rag_tool"
    }

    async fn gather(&self, _merchant_id: &str, query: &str) -> String {
        match self.search.similarity_search(query, POLICY_TOP_K).await {
            Ok(snippets) => {
                let context = snippets.join("\n");
                if context.trim().is_empty() {
                    NO_POLICY_DOC.to_string()
                } else {
                    context
                }
            }
            Err(e) => {
                warn!("Policy search failed: {}", e);
                POLICY_SEARCH_FAILED.to_string()
            }
        }
    }
}

/// Gatherer selection per intent
pub struct ContextRouter {
    logs: LogGatherer,
    policy: PolicyGatherer,
}

impl ContextRouter {
    pub fn new(store: Arc<dyn RecordStore>, search: Arc<dyn PolicySearch>) -> Self {
        Self {
            logs: LogGatherer::new(store),
            policy: PolicyGatherer::new(search),
        }
    }

    /// `None` for intents that compute their reply without retrieval
    pub fn gatherer_for(&self, intent: Intent) -> Option<&dyn ContextGatherer> {
        match intent {
            Intent::Database => Some(&self.logs),
            Intent::Policy => Some(&self.policy),
            Intent::LoanRequest | Intent::SavingsPlan => None,
        }
    }
}
