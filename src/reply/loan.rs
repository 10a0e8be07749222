//! Loan pre-check replies
//!
//! Amount and tenor are pulled from free text on a best-effort basis;
//! anything unparseable keeps the documented default.

use crate::models::EligibilityVerdict;
use lazy_static::lazy_static;
use regex::Regex;

pub const DEFAULT_REQUESTED_AMOUNT: u64 = 100_000;
pub const DEFAULT_TENOR_MONTHS: u64 = 2;
pub const LAKH: u64 = 100_000;

lazy_static! {
    static ref NUMBER: Regex = Regex::new(r"\d+").expect("number pattern");
    static ref LAKH_AMOUNT: Regex = Regex::new(r"(\d+)\s*lakh").expect("lakh pattern");
    static ref TENOR: Regex = Regex::new(r"(\d+)\s*month").expect("tenor pattern");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoanRequest {
    pub amount: u64,
    pub tenor_months: u64,
}

/// Extract amount and tenor from a loan query.
///
/// A "lakh" phrase wins over bare numbers. If the query mentions lakh but
/// no `<n> lakh` pattern is present, bare numbers are still ignored.
pub fn parse_loan_request(query: &str) -> LoanRequest {
    let lowered = query.to_lowercase();
    let mut amount = DEFAULT_REQUESTED_AMOUNT;
    let mut tenor_months = DEFAULT_TENOR_MONTHS;

    if lowered.contains("lakh") {
        if let Some(lakhs) = LAKH_AMOUNT
            .captures(&lowered)
            .and_then(|c| c[1].parse::<u64>().ok())
            .and_then(|n| n.checked_mul(LAKH))
        {
            amount = lakhs;
        }
    } else {
        let without_commas = query.replace(',', "");
        if let Some(first) = NUMBER
            .find(&without_commas)
            .and_then(|m| m.as_str().parse::<u64>().ok())
        {
            amount = first;
        }
    }

    if let Some(months) = TENOR
        .captures(&lowered)
        .and_then(|c| c[1].parse::<u64>().ok())
    {
        tenor_months = months;
    }

    LoanRequest {
        amount,
        tenor_months,
    }
}

/// Western thousands grouping: 300000 -> "300,000"
pub fn format_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }

    out
}

pub fn render_precheck(request: &LoanRequest, verdict: &EligibilityVerdict) -> String {
    let mut reply = format!(
        "Pre-check for ₹{} over {} months:\n",
        format_thousands(request.amount),
        request.tenor_months
    );

    reply.push_str(&format!(
        "Monthly est: ₹{} | Avg daily: ₹{} | Coverage: {} | On-time: {}%\n",
        verdict.monthly_installment,
        verdict.avg_daily_sales,
        verdict.coverage_ratio,
        verdict.on_time_rate
    ));

    if verdict.eligible {
        reply.push_str(
            "Status: Preliminary eligible → Manual underwriting required (collect KYC / 30-day monitoring).",
        );
        if !verdict.reasons.is_empty() {
            reply.push_str(&format!("\nNote: {}.", verdict.reasons.join("; ")));
        }
    } else {
        reply.push_str(&format!(
            "Status: Not eligible. Reasons: {}. Suggestions: increase daily savings, ensure mandate active, improve on-time payments.",
            verdict.reasons.join("; ")
        ));
    }

    reply
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MandateStatus;

    #[test]
    fn test_lakh_phrase() {
        assert_eq!(
            parse_loan_request("I want a 3 lakh loan for 6 months"),
            LoanRequest {
                amount: 300_000,
                tenor_months: 6
            }
        );
        assert_eq!(parse_loan_request("2LAKH please").amount, 200_000);
    }

    #[test]
    fn test_lakh_beats_bare_numbers() {
        let parsed = parse_loan_request("shop 42 needs 5 lakh for 12 months");
        assert_eq!(parsed.amount, 500_000);
        assert_eq!(parsed.tenor_months, 12);

        // lakh mentioned without a number: bare numbers are not used
        let parsed = parse_loan_request("a few lakh, maybe 40000");
        assert_eq!(parsed.amount, DEFAULT_REQUESTED_AMOUNT);
    }

    #[test]
    fn test_bare_number_with_commas() {
        let parsed = parse_loan_request("loan of 1,50,000 for 3 months");
        assert_eq!(parsed.amount, 150_000);
        assert_eq!(parsed.tenor_months, 3);
    }

    #[test]
    fn test_defaults_when_nothing_parses() {
        assert_eq!(
            parse_loan_request("I need a loan"),
            LoanRequest {
                amount: DEFAULT_REQUESTED_AMOUNT,
                tenor_months: DEFAULT_TENOR_MONTHS
            }
        );
        assert_eq!(
            parse_loan_request("loan of 99999999999999999999999").amount,
            DEFAULT_REQUESTED_AMOUNT
        );
    }

    #[test]
    fn test_format_thousands() {
        assert_eq!(format_thousands(0), "0");
        assert_eq!(format_thousands(999), "999");
        assert_eq!(format_thousands(1000), "1,000");
        assert_eq!(format_thousands(300_000), "300,000");
        assert_eq!(format_thousands(12_345_678), "12,345,678");
    }

    #[test]
    fn test_render_not_eligible() {
        let verdict = EligibilityVerdict {
            eligible: false,
            monthly_installment: 50_000,
            avg_daily_sales: 0.0,
            coverage_ratio: 0.0,
            on_time_rate: 100.0,
            wallet_balance: 0.0,
            mandate_status: MandateStatus::Unknown,
            reasons: vec!["Mandate not ACTIVE".into(), "Coverage ratio low (0.00)".into()],
        };
        let request = LoanRequest {
            amount: 300_000,
            tenor_months: 6,
        };

        let reply = render_precheck(&request, &verdict);
        assert!(reply.starts_with("Pre-check for ₹300,000 over 6 months:"));
        assert!(reply.contains("Monthly est: ₹50000"));
        assert!(reply.contains("On-time: 100%"));
        assert!(reply.contains("Reasons: Mandate not ACTIVE; Coverage ratio low (0.00)."));
        assert!(!reply.contains("Preliminary eligible"));
    }

    #[test]
    fn test_render_eligible_never_claims_approval() {
        let verdict = EligibilityVerdict {
            eligible: true,
            monthly_installment: 10_000,
            avg_daily_sales: 1500.5,
            coverage_ratio: 4.5,
            on_time_rate: 95.0,
            wallet_balance: 100.0,
            mandate_status: MandateStatus::Active,
            reasons: vec!["Wallet low vs monthly installment".into()],
        };
        let request = LoanRequest {
            amount: 120_000,
            tenor_months: 12,
        };

        let reply = render_precheck(&request, &verdict);
        assert!(reply.contains("Preliminary eligible"));
        assert!(reply.contains("Manual underwriting required"));
        assert!(reply.contains("Note: Wallet low vs monthly installment."));
        assert!(!reply.to_lowercase().contains("approved"));
    }
}
