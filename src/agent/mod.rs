//! Main orchestrator - implements the chat flow
//!
//! CLASSIFY → GATHER? → GENERATE → PERSIST → RETURN
//!
//! Each call is stateless: records are re-read per query and nothing is
//! kept between calls except what the record store holds.

use crate::classifier::{Intent, IntentClassifier};
use crate::config::{AssistantConfig, PolicyBackend};
use crate::context::ContextRouter;
use crate::llm::{GeminiClient, RetryPolicy, TextGenerator, MAX_LLM_ATTEMPTS};
use crate::reply::{ReplyGenerator, ReplySource};
use crate::search::{Embedder, KeywordPolicyIndex, PgVectorPolicySearch, PolicySearch};
use crate::store::{InMemoryRecordStore, PgRecordStore, RecordStore};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// External collaborators, constructed once and shared by every request
#[derive(Clone)]
pub struct Backends {
    pub store: Arc<dyn RecordStore>,
    pub search: Arc<dyn PolicySearch>,
    /// `None` when the LLM is disabled
    pub generator: Option<Arc<dyn TextGenerator>>,
}

impl Backends {
    pub fn from_config(config: &AssistantConfig) -> Result<Self> {
        let gemini = if config.use_llm || config.policy_backend == PolicyBackend::PgVector {
            Some(Arc::new(GeminiClient::new(
                config.gemini_api_key.clone(),
                config.gemini_model.clone(),
                config.embedding_model.clone(),
                config.temperature,
            )?))
        } else {
            None
        };

        let pg_store = match &config.database_url {
            Some(url) => Some(Arc::new(PgRecordStore::connect_lazy(url)?)),
            None => {
                warn!("DATABASE_URL not set, records are kept in memory only");
                None
            }
        };

        let search: Arc<dyn PolicySearch> = match &config.policy_backend {
            PolicyBackend::Keyword { path } => match KeywordPolicyIndex::from_file(path) {
                Ok(index) => Arc::new(index),
                Err(e) => {
                    warn!(path = %path.display(), "Policy file unavailable, search will return nothing: {}", e);
                    Arc::new(KeywordPolicyIndex::empty())
                }
            },
            PolicyBackend::PgVector => {
                let (Some(store), Some(gemini)) = (&pg_store, &gemini) else {
                    return Err(crate::error::AssistantError::ConfigError(
                        "pgvector search needs a database and a Gemini client".to_string(),
                    ));
                };
                let embedder: Arc<dyn Embedder> = gemini.clone();
                Arc::new(PgVectorPolicySearch::new(store.pool().clone(), embedder))
            }
        };

        let store: Arc<dyn RecordStore> = match pg_store {
            Some(store) => store,
            None => Arc::new(InMemoryRecordStore::new()),
        };

        let generator: Option<Arc<dyn TextGenerator>> = if config.use_llm {
            gemini.map(|g| g as Arc<dyn TextGenerator>)
        } else {
            None
        };

        Ok(Self {
            store,
            search,
            generator,
        })
    }
}

/// Everything that happened while answering one message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatOutcome {
    pub reply: String,
    pub intent: Intent,
    pub context: Option<String>,
    pub source: ReplySource,
    pub persisted: bool,
    pub trace: Vec<String>,
    pub elapsed_ms: u64,
}

pub struct Orchestrator {
    store: Arc<dyn RecordStore>,
    context: ContextRouter,
    replies: ReplyGenerator,
}

impl Orchestrator {
    pub fn new(backends: Backends, retry: RetryPolicy) -> Self {
        Self {
            store: backends.store.clone(),
            context: ContextRouter::new(backends.store.clone(), backends.search),
            replies: ReplyGenerator::new(backends.store, backends.generator, retry),
        }
    }

    pub fn from_config(config: &AssistantConfig) -> Result<Self> {
        let backends = Backends::from_config(config)?;
        let retry = RetryPolicy::new(MAX_LLM_ATTEMPTS, config.retry_base_delay);
        Ok(Self::new(backends, retry))
    }

    pub fn store(&self) -> Arc<dyn RecordStore> {
        self.store.clone()
    }

    /// Answer one message. The session id is the merchant id.
    pub async fn handle(&self, session_id: &str, message: &str) -> ChatOutcome {
        let start = Instant::now();
        let mut trace = Vec::with_capacity(4);

        // === CLASSIFY ===
        let intent = IntentClassifier::classify(message);
        trace.push(format!("CLASSIFY: {}", intent));
        debug!(session_id, %intent, "Query classified");

        // === GATHER ===
        let context = match self.context.gatherer_for(intent) {
            Some(gatherer) => {
                let gathered = gatherer.gather(session_id, message).await;
                trace.push(format!("GATHER: {} ({} chars)", gatherer.name(), gathered.len()));
                Some(gathered)
            }
            None => {
                trace.push("GATHER: skipped".to_string());
                None
            }
        };

        // === GENERATE + PERSIST ===
        let reply = self
            .replies
            .generate(intent, session_id, message, context.as_deref().unwrap_or(""))
            .await;
        trace.push(format!("GENERATE: {:?}", reply.source));

        let persisted = reply.persisted.is_stored();
        trace.push(format!(
            "PERSIST: {}",
            if persisted { "stored" } else { "failed" }
        ));

        let elapsed_ms = start.elapsed().as_millis() as u64;

        info!(
            session_id,
            %intent,
            source = ?reply.source,
            persisted,
            elapsed_ms,
            "Chat message handled"
        );

        ChatOutcome {
            reply: reply.text,
            intent,
            context,
            source: reply.source,
            persisted,
            trace,
            elapsed_ms,
        }
    }

    pub async fn process(&self, session_id: &str, message: &str) -> String {
        self.handle(session_id, message).await.reply
    }
}
