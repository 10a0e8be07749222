//! Intent Classifier
//!
//! Routes a free-text query into one of four handling paths:
//! - LoanRequest: eligibility pre-check computed from financial records
//! - Database: transaction-failure lookup against recent logs
//! - SavingsPlan: daily savings target from recent sales
//! - Policy: policy Q&A over the knowledge base (default)

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    LoanRequest,
    Database,
    SavingsPlan,
    Policy,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::LoanRequest => "loan_request",
            Intent::Database => "database",
            Intent::SavingsPlan => "savings_plan",
            Intent::Policy => "policy",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One row of the routing table: any keyword hit selects the intent.
#[derive(Debug)]
pub struct IntentRule {
    pub intent: Intent,
    pub keywords: &'static [&'static str],
}

/// Ordered routing table, evaluated top-down; the first matching rule wins.
///
/// Loan keywords sit above failure keywords so that
/// "apply for loan, previous one failed" stays on the loan path.
pub const INTENT_RULES: &[IntentRule] = &[
    IntentRule {
        intent: Intent::LoanRequest,
        keywords: &["loan", "lakh", "apply", "money"],
    },
    IntentRule {
        intent: Intent::Database,
        keywords: &["failed", "why debit", "deducted", "insufficient", "error"],
    },
    IntentRule {
        intent: Intent::SavingsPlan,
        keywords: &["save", "saving", "how much", "today", "plan", "emi"],
    },
];

pub const DEFAULT_INTENT: Intent = Intent::Policy;

/// Keyword classifier over `INTENT_RULES`
pub struct IntentClassifier;

impl IntentClassifier {
    pub fn classify(query: &str) -> Intent {
        Self::classify_with(INTENT_RULES, query)
    }

    pub fn classify_with(rules: &[IntentRule], query: &str) -> Intent {
        let lowered = query.to_lowercase();

        rules
            .iter()
            .find(|rule| rule.keywords.iter().any(|kw| lowered.contains(kw)))
            .map(|rule| rule.intent)
            .unwrap_or(DEFAULT_INTENT)
    }
}
