//! Test doubles for the backend traits

use crate::error::{AssistantError, GenerationError};
use crate::llm::{PromptMessage, TextGenerator};
use crate::models::{ChatMessage, MerchantProfile, TransactionLogEntry, TransactionRecord};
use crate::search::PolicySearch;
use crate::store::RecordStore;
use crate::Result;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Record store where every call fails
pub struct BrokenStore;

fn down() -> AssistantError {
    AssistantError::StoreError("connection refused".into())
}

#[async_trait::async_trait]
impl RecordStore for BrokenStore {
    async fn merchant_profile(&self, _: &str) -> Result<Option<MerchantProfile>> {
        Err(down())
    }
    async fn recent_transactions(&self, _: &str, _: usize) -> Result<Vec<TransactionRecord>> {
        Err(down())
    }
    async fn recent_logs(&self, _: &str, _: usize) -> Result<Vec<TransactionLogEntry>> {
        Err(down())
    }
    async fn latest_logs(&self, _: usize, _: usize) -> Result<Vec<TransactionLogEntry>> {
        Err(down())
    }
    async fn insert_transactions(&self, _: Vec<TransactionRecord>) -> Result<usize> {
        Err(down())
    }
    async fn append_chat_message(&self, _: ChatMessage) -> Result<()> {
        Err(down())
    }
}

/// Policy search that always errors
pub struct BrokenSearch;

#[async_trait::async_trait]
impl PolicySearch for BrokenSearch {
    async fn similarity_search(&self, _: &str, _: usize) -> Result<Vec<String>> {
        Err(AssistantError::SearchError("vector store offline".into()))
    }
}

/// Generator that replays a fixed script of results and counts calls
pub struct ScriptedGenerator {
    script: Mutex<VecDeque<std::result::Result<String, GenerationError>>>,
    calls: AtomicUsize,
}

impl ScriptedGenerator {
    pub fn new(script: Vec<std::result::Result<String, GenerationError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(
        &self,
        _messages: &[PromptMessage],
    ) -> std::result::Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GenerationError::Rejected("script exhausted".into())))
    }
}
