//! Record store layer
//!
//! The record store owns merchant profiles, transaction records,
//! transaction logs and chat history. The assistant only reads records
//! and appends chat messages.

use crate::models::{ChatMessage, ChatRole, MerchantProfile, TransactionLogEntry, TransactionRecord};
use crate::Result;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error};

pub mod postgres;
pub use postgres::PgRecordStore;

/// Trait for record store access
#[async_trait::async_trait]
pub trait RecordStore: Send + Sync {
    async fn merchant_profile(&self, merchant_id: &str) -> Result<Option<MerchantProfile>>;

    /// Most recent records first
    async fn recent_transactions(
        &self,
        merchant_id: &str,
        limit: usize,
    ) -> Result<Vec<TransactionRecord>>;

    /// Most recent entries first
    async fn recent_logs(&self, merchant_id: &str, limit: usize) -> Result<Vec<TransactionLogEntry>>;

    /// Latest entries across all merchants, for the dashboard
    async fn latest_logs(&self, limit: usize, offset: usize) -> Result<Vec<TransactionLogEntry>>;

    async fn insert_transactions(&self, records: Vec<TransactionRecord>) -> Result<usize>;

    async fn append_chat_message(&self, message: ChatMessage) -> Result<()>;
}

/// Outcome of a best-effort chat-log write. Callers may log it, never propagate it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistOutcome {
    Stored,
    Failed(String),
}

impl PersistOutcome {
    pub fn is_stored(&self) -> bool {
        matches!(self, PersistOutcome::Stored)
    }
}

/// Append a chat message, swallowing and logging any store failure.
pub async fn persist_best_effort(
    store: &dyn RecordStore,
    session_id: &str,
    role: ChatRole,
    content: &str,
) -> PersistOutcome {
    let message = ChatMessage::new(session_id, role, content);

    match store.append_chat_message(message).await {
        Ok(()) => {
            debug!(session_id, role = role.as_str(), "Chat message persisted");
            PersistOutcome::Stored
        }
        Err(e) => {
            error!(session_id, role = role.as_str(), "Failed to persist chat message: {}", e);
            PersistOutcome::Failed(e.to_string())
        }
    }
}

/// In-memory record store for development and tests
pub struct InMemoryRecordStore {
    profiles: Arc<RwLock<HashMap<String, MerchantProfile>>>,
    transactions: Arc<RwLock<HashMap<String, Vec<TransactionRecord>>>>,
    logs: Arc<RwLock<Vec<TransactionLogEntry>>>,
    chat: Arc<RwLock<Vec<ChatMessage>>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self {
            profiles: Arc::new(RwLock::new(HashMap::new())),
            transactions: Arc::new(RwLock::new(HashMap::new())),
            logs: Arc::new(RwLock::new(Vec::new())),
            chat: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub async fn upsert_profile(&self, profile: MerchantProfile) {
        let mut profiles = self.profiles.write().await;
        profiles.insert(profile.merchant_id.clone(), profile);
    }

    pub async fn append_log(&self, entry: TransactionLogEntry) {
        self.logs.write().await.push(entry);
    }

    /// Snapshot of the chat log, oldest first
    pub async fn chat_messages(&self) -> Vec<ChatMessage> {
        self.chat.read().await.clone()
    }
}

impl Default for InMemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn merchant_profile(&self, merchant_id: &str) -> Result<Option<MerchantProfile>> {
        let profiles = self.profiles.read().await;
        Ok(profiles.get(merchant_id).cloned())
    }

    async fn recent_transactions(
        &self,
        merchant_id: &str,
        limit: usize,
    ) -> Result<Vec<TransactionRecord>> {
        let transactions = self.transactions.read().await;

        let mut records = transactions.get(merchant_id).cloned().unwrap_or_default();
        records.sort_by(|a, b| b.date.cmp(&a.date));
        records.truncate(limit);

        Ok(records)
    }

    async fn recent_logs(&self, merchant_id: &str, limit: usize) -> Result<Vec<TransactionLogEntry>> {
        let logs = self.logs.read().await;

        let mut entries: Vec<TransactionLogEntry> = logs
            .iter()
            .filter(|entry| entry.merchant_id == merchant_id)
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        entries.truncate(limit);

        Ok(entries)
    }

    async fn latest_logs(&self, limit: usize, offset: usize) -> Result<Vec<TransactionLogEntry>> {
        let logs = self.logs.read().await;

        let mut entries = logs.clone();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(entries.into_iter().skip(offset).take(limit).collect())
    }

    async fn insert_transactions(&self, records: Vec<TransactionRecord>) -> Result<usize> {
        let count = records.len();
        let mut transactions = self.transactions.write().await;

        for record in records {
            transactions
                .entry(record.merchant_id.clone())
                .or_insert_with(Vec::new)
                .push(record);
        }

        Ok(count)
    }

    async fn append_chat_message(&self, message: ChatMessage) -> Result<()> {
        self.chat.write().await.push(message);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MandateStatus;
    use crate::test_support::BrokenStore;
    use chrono::{Duration, NaiveDate, Utc};
    use tokio_test::assert_ok;

    fn record(merchant_id: &str, day: u32, sales: f64) -> TransactionRecord {
        TransactionRecord {
            merchant_id: merchant_id.to_string(),
            date: NaiveDate::from_ymd_opt(2024, 5, day).unwrap(),
            gross_sales: sales,
            cash_in_hand: 0.0,
        }
    }

    #[tokio::test]
    async fn test_recent_transactions_newest_first() {
        let store = InMemoryRecordStore::new();
        assert_ok!(
            store
                .insert_transactions(vec![
                    record("m_001", 1, 100.0),
                    record("m_001", 3, 300.0),
                    record("m_001", 2, 200.0),
                    record("m_002", 4, 999.0),
                ])
                .await
        );

        let recent = store.recent_transactions("m_001", 2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].gross_sales, 300.0);
        assert_eq!(recent[1].gross_sales, 200.0);
    }

    #[tokio::test]
    async fn test_recent_logs_filter_and_order() {
        let store = InMemoryRecordStore::new();
        let now = Utc::now();

        for (i, merchant) in ["m_001", "m_002", "m_001"].iter().enumerate() {
            store
                .append_log(TransactionLogEntry {
                    merchant_id: merchant.to_string(),
                    entry_type: "debit_attempt".into(),
                    status: format!("status_{}", i),
                    amount: None,
                    failure_reason: None,
                    created_at: now + Duration::minutes(i as i64),
                })
                .await;
        }

        let logs = store.recent_logs("m_001", 10).await.unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].status, "status_2");

        let page = store.latest_logs(1, 1).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].status, "status_1");
    }

    #[tokio::test]
    async fn test_profile_lookup() {
        let store = InMemoryRecordStore::new();
        store
            .upsert_profile(MerchantProfile {
                merchant_id: "m_001".into(),
                wallet_balance: 500.0,
                mandate_status: MandateStatus::Active,
            })
            .await;

        assert!(store.merchant_profile("m_001").await.unwrap().is_some());
        assert!(store.merchant_profile("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_persist_best_effort_swallows_failures() {
        let outcome = persist_best_effort(&BrokenStore, "m_001", ChatRole::Assistant, "hi").await;
        assert!(matches!(outcome, PersistOutcome::Failed(_)));

        let store = InMemoryRecordStore::new();
        let outcome = persist_best_effort(&store, "m_001", ChatRole::Assistant, "hi").await;
        assert!(outcome.is_stored());

        let messages = store.chat_messages().await;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, ChatRole::Assistant);
        assert_eq!(messages[0].content, "hi");
    }
}
