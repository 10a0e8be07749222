//! Core data models for the lending assistant

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use uuid::Uuid;

//
// ================= Enums =================
//

/// Standing authorization for automatic debit collection.
///
/// Labels the store reports that we don't know are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MandateStatus {
    Active,
    Inactive,
    Unknown,
    Other(String),
}

impl MandateStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "ACTIVE" => MandateStatus::Active,
            "INACTIVE" => MandateStatus::Inactive,
            "UNKNOWN" | "" => MandateStatus::Unknown,
            other => MandateStatus::Other(other.to_string()),
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, MandateStatus::Active)
    }
}

impl From<String> for MandateStatus {
    fn from(raw: String) -> Self {
        MandateStatus::parse(&raw)
    }
}

impl From<MandateStatus> for String {
    fn from(status: MandateStatus) -> Self {
        status.to_string()
    }
}

impl fmt::Display for MandateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MandateStatus::Active => "ACTIVE",
            MandateStatus::Inactive => "INACTIVE",
            MandateStatus::Unknown => "UNKNOWN",
            MandateStatus::Other(label) => label.as_str(),
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }
}

//
// ================= Records =================
//

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MerchantProfile {
    pub merchant_id: String,
    #[serde(deserialize_with = "lenient_amount")]
    pub wallet_balance: f64,
    pub mandate_status: MandateStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub merchant_id: String,
    pub date: NaiveDate,
    #[serde(deserialize_with = "lenient_amount")]
    pub gross_sales: f64,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub cash_in_hand: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionLogEntry {
    pub merchant_id: String,
    #[serde(rename = "type")]
    pub entry_type: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

pub const DEBIT_ATTEMPT: &str = "debit_attempt";

impl TransactionLogEntry {
    pub fn is_debit_attempt(&self) -> bool {
        self.entry_type == DEBIT_ATTEMPT
    }

    /// Case-insensitive match against the store's success markers.
    pub fn is_success(&self) -> bool {
        let status = self.status.trim().to_lowercase();
        status == "success" || status == "succeeded"
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub message_id: Uuid,
    pub session_id: String,
    pub role: ChatRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(session_id: &str, role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            message_id: Uuid::new_v4(),
            session_id: session_id.to_string(),
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

//
// ================= Eligibility =================
//

/// Advisory pre-check result. Never a binding approval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EligibilityVerdict {
    pub eligible: bool,
    pub monthly_installment: u64,
    pub avg_daily_sales: f64,
    pub coverage_ratio: f64,
    pub on_time_rate: f64,
    pub wallet_balance: f64,
    pub mandate_status: MandateStatus,
    pub reasons: Vec<String>,
}

//
// ================= Numeric helpers =================
//

/// Parse an amount that may arrive as `"12,500.50"`, `" 900 "` or `"1200"`.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Accepts JSON numbers, numeric strings with thousands separators, or null (0).
fn lenient_amount<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
        Null(()),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(v) => Ok(v),
        Raw::Text(s) => parse_amount(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid amount: {:?}", s))),
        Raw::Null(()) => Ok(0.0),
    }
}

/// Round half away from zero to `places` decimals, for display only.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_amount_variants() {
        assert_eq!(parse_amount("1,200"), Some(1200.0));
        assert_eq!(parse_amount(" 950.5 "), Some(950.5));
        assert_eq!(parse_amount("12,34,567"), Some(1_234_567.0));
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount("n/a"), None);
    }

    #[test]
    fn test_transaction_record_accepts_string_amounts() {
        let json = r#"{"merchant_id":"m_001","date":"2024-05-01","gross_sales":"2,500","cash_in_hand":1500}"#;
        let record: TransactionRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.gross_sales, 2500.0);
        assert_eq!(record.cash_in_hand, 1500.0);
    }

    #[test]
    fn test_mandate_status_roundtrips_unknown_labels() {
        assert!(MandateStatus::parse("ACTIVE").is_active());
        assert_eq!(MandateStatus::parse(""), MandateStatus::Unknown);

        let status: MandateStatus = serde_json::from_str("\"PAUSED\"").unwrap();
        assert_eq!(status, MandateStatus::Other("PAUSED".into()));
        assert_eq!(serde_json::to_string(&status).unwrap(), "\"PAUSED\"");
    }

    #[test]
    fn test_log_success_markers() {
        let mut entry = TransactionLogEntry {
            merchant_id: "m".into(),
            entry_type: DEBIT_ATTEMPT.into(),
            status: "Succeeded".into(),
            amount: None,
            failure_reason: None,
            created_at: Utc::now(),
        };
        assert!(entry.is_success());
        entry.status = "FAILED".into();
        assert!(!entry.is_success());
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(1.23456, 2), 1.23);
        assert_eq!(round_to(66.666, 1), 66.7);
    }
}
