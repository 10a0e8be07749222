//! Rule-based summarizer used when the LLM is disabled or exhausted.
//!
//! Pure string work over the query and gathered context; it cannot fail.

use lazy_static::lazy_static;
use regex::Regex;

const FAILURE_KEYWORDS: &[&str] = &[
    "failed",
    "why debit",
    "why did my debit",
    "insufficient",
    "failed_debit",
    "deducted",
];

const SAVINGS_KEYWORDS: &[&str] = &["save", "how much", "today", "save today"];

const FAILURE_EXCERPT_CHARS: usize = 300;
const GENERIC_EXCERPT_CHARS: usize = 400;

pub const INSUFFICIENT_BALANCE_REPLY: &str = "Failure likely: insufficient wallet balance at debit time. Action: ask merchant to top-up and retry.";
pub const MANDATE_EXPIRED_REPLY: &str = "Failure due to expired mandate. Action: ask merchant to re-authorize the mandate.";
pub const NEED_CSV_REPLY: &str = "I need your recent sales CSV to compute exact daily saving. Please upload the CSV.";

lazy_static! {
    static ref AVG_FIGURE: Regex = Regex::new(r"avg[:=]?\s*?(\d+\.?\d*)").expect("avg pattern");
}

/// First `max_chars` chars of the context followed by "...", or "" when empty.
fn excerpt(context: &str, max_chars: usize) -> String {
    if context.is_empty() {
        return String::new();
    }
    let head: String = context.chars().take(max_chars).collect();
    format!("{}...", head)
}

pub fn fallback_reply(query: &str, context: &str) -> String {
    let q = query.to_lowercase();

    if FAILURE_KEYWORDS.iter().any(|k| q.contains(k)) {
        let lowered = context.to_lowercase();
        if lowered.contains("insufficient") {
            return INSUFFICIENT_BALANCE_REPLY.to_string();
        }
        if lowered.contains("mandate_expired") || lowered.contains("mandate expired") {
            return MANDATE_EXPIRED_REPLY.to_string();
        }
        return format!(
            "Couldn't access AI right now. From logs/context: {} Please provide merchant ID or upload recent CSV for deeper check.",
            excerpt(context, FAILURE_EXCERPT_CHARS)
        );
    }

    if SAVINGS_KEYWORDS.iter().any(|k| q.contains(k)) {
        let avg = AVG_FIGURE
            .captures(&context.to_lowercase())
            .and_then(|c| c[1].parse::<f64>().ok())
            .filter(|avg| *avg > 0.0);

        return match avg {
            Some(avg) => {
                let estimate = (avg * 0.2).round().max(1.0) as u64;
                format!(
                    "Quick suggestion: Save approx ₹{}/day (≈20% of avg daily sales). For precise plan, upload CSV.",
                    estimate
                )
            }
            None => NEED_CSV_REPLY.to_string(),
        };
    }

    format!(
        "Temporary fallback: AI unavailable. Context: {} Please try again or upload data.",
        excerpt(context, GENERIC_EXCERPT_CHARS)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_gives_generic_message() {
        let reply = fallback_reply("", "");
        assert_eq!(
            reply,
            "Temporary fallback: AI unavailable. Context:  Please try again or upload data."
        );
    }

    #[test]
    fn test_failure_diagnoses() {
        let ctx = r#"{"recent_logs":[{"status":"FAILED","failure_reason":"INSUFFICIENT_BALANCE"}]}"#;
        assert_eq!(fallback_reply("why debit failed?", ctx), INSUFFICIENT_BALANCE_REPLY);

        let ctx = r#"{"recent_logs":[{"failure_reason":"mandate_expired"}]}"#;
        assert_eq!(fallback_reply("money deducted twice", ctx), MANDATE_EXPIRED_REPLY);
    }

    #[test]
    fn test_failure_without_known_cause_quotes_context() {
        let ctx = "x".repeat(1000);
        let reply = fallback_reply("my payment failed", &ctx);
        assert!(reply.starts_with("Couldn't access AI right now."));
        assert!(reply.contains(&format!("{}...", "x".repeat(300))));
        assert!(!reply.contains(&"x".repeat(301)));
    }

    #[test]
    fn test_savings_uses_avg_from_context() {
        let reply = fallback_reply("how much to save today?", "summary avg=1500 over 30 days");
        assert!(reply.contains("₹300/day"));

        let reply = fallback_reply("how much to save today?", "avg: 2");
        assert!(reply.contains("₹1/day"));

        assert_eq!(fallback_reply("save", "no numbers here"), NEED_CSV_REPLY);
        assert_eq!(fallback_reply("save", "avg=0"), NEED_CSV_REPLY);
    }

    #[test]
    fn test_excerpt_is_char_safe() {
        let ctx = "₹".repeat(500);
        let reply = fallback_reply("kyc documents?", &ctx);
        assert!(reply.contains(&format!("{}...", "₹".repeat(400))));
    }
}
