//! Loan eligibility pre-check
//!
//! Deterministic, transparent rules over the merchant's own records.
//! Every store read is fault-isolated and falls back to a documented
//! default, so `evaluate` never fails. The verdict is advisory only.

use crate::models::{round_to, EligibilityVerdict, MandateStatus, TransactionLogEntry};
use crate::store::RecordStore;
use tracing::{debug, warn};

/// Records fetched for both the sales and the debit-history windows
pub const HISTORY_LIMIT: usize = 180;
/// Days of sales averaged for the daily figure
pub const SALES_WINDOW_DAYS: usize = 30;
/// Sales days projected per month for coverage
pub const DAYS_PER_MONTH: f64 = 30.0;

pub const MIN_ON_TIME_RATE: f64 = 70.0;
pub const MIN_COVERAGE_RATIO: f64 = 1.1;
/// Wallet below this share of the installment raises a soft warning
pub const WALLET_WARNING_SHARE: f64 = 0.25;

pub const REASON_MANDATE_INACTIVE: &str = "Mandate not ACTIVE";
pub const REASON_WALLET_LOW: &str = "Wallet low vs monthly installment";

/// Equal-payment placeholder, not true amortization.
pub fn monthly_installment(requested_amount: u64, tenor_months: u64) -> u64 {
    (requested_amount / tenor_months.max(1)).max(1)
}

/// Successful debit attempts as a percentage; 100 when there were no attempts.
pub fn on_time_rate(logs: &[TransactionLogEntry]) -> f64 {
    let (attempts, successes) = logs
        .iter()
        .filter(|entry| entry.is_debit_attempt())
        .fold((0usize, 0usize), |(attempts, successes), entry| {
            (attempts + 1, successes + usize::from(entry.is_success()))
        });

    if attempts == 0 {
        100.0
    } else {
        successes as f64 / attempts as f64 * 100.0
    }
}

pub async fn evaluate(
    store: &dyn RecordStore,
    merchant_id: &str,
    requested_amount: u64,
    tenor_months: u64,
) -> EligibilityVerdict {
    let (wallet_balance, mandate_status) = match store.merchant_profile(merchant_id).await {
        Ok(Some(profile)) => (profile.wallet_balance, profile.mandate_status),
        Ok(None) => (0.0, MandateStatus::Unknown),
        Err(e) => {
            warn!(merchant_id, "Profile fetch failed, assuming empty profile: {}", e);
            (0.0, MandateStatus::Unknown)
        }
    };

    let avg_daily_sales = match store.recent_transactions(merchant_id, HISTORY_LIMIT).await {
        Ok(records) => {
            let window = &records[..records.len().min(SALES_WINDOW_DAYS)];
            if window.is_empty() {
                0.0
            } else {
                window.iter().map(|r| r.gross_sales).sum::<f64>() / window.len() as f64
            }
        }
        Err(e) => {
            warn!(merchant_id, "Transaction fetch failed, assuming zero sales: {}", e);
            0.0
        }
    };

    let on_time = match store.recent_logs(merchant_id, HISTORY_LIMIT).await {
        Ok(logs) => on_time_rate(&logs),
        Err(e) => {
            warn!(merchant_id, "Log fetch failed, assuming clean debit history: {}", e);
            100.0
        }
    };

    let installment = monthly_installment(requested_amount, tenor_months);

    let coverage_ratio = if installment > 0 {
        (avg_daily_sales * DAYS_PER_MONTH) / installment as f64
    } else {
        0.0
    };

    let mut reasons = Vec::new();
    let mut eligible = true;

    if !mandate_status.is_active() {
        eligible = false;
        reasons.push(REASON_MANDATE_INACTIVE.to_string());
    }
    if on_time < MIN_ON_TIME_RATE {
        eligible = false;
        reasons.push(format!("On-time debit rate low ({:.0}%)", on_time));
    }
    if coverage_ratio < MIN_COVERAGE_RATIO {
        eligible = false;
        reasons.push(format!("Coverage ratio low ({:.2})", coverage_ratio));
    }
    if wallet_balance < installment as f64 * WALLET_WARNING_SHARE {
        reasons.push(REASON_WALLET_LOW.to_string());
    }

    debug!(
        merchant_id,
        eligible,
        installment,
        coverage_ratio,
        on_time,
        "Eligibility evaluated"
    );

    EligibilityVerdict {
        eligible,
        monthly_installment: installment,
        avg_daily_sales: round_to(avg_daily_sales, 2),
        coverage_ratio: round_to(coverage_ratio, 2),
        on_time_rate: round_to(on_time, 1),
        wallet_balance,
        mandate_status,
        reasons,
    }
}
