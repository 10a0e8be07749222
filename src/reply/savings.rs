//! Daily savings guidance from recent sales

use crate::models::{round_to, TransactionRecord};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Records averaged for the daily savings target
pub const SAVINGS_WINDOW: usize = 30;
/// Share of average daily sales set aside toward repayment
pub const SAVINGS_SHARE: f64 = 0.20;
/// Upper bound on the repayment plan's daily ask, as a share of sales
pub const PLAN_SALES_CAP: f64 = 0.8;

pub const UPLOAD_PROMPT: &str = "I don't see any sales data yet. Please **Upload your CSV** first so I can calculate your daily savings target.";

pub fn average_daily_sales(records: &[TransactionRecord]) -> f64 {
    if records.is_empty() {
        return 0.0;
    }
    records.iter().map(|r| r.gross_sales).sum::<f64>() / records.len() as f64
}

/// 20% of average daily sales, truncated to whole units
pub fn daily_savings_target(avg_daily: f64) -> u64 {
    (avg_daily * SAVINGS_SHARE).max(0.0) as u64
}

pub fn render_savings_plan(avg_daily: f64) -> String {
    if avg_daily <= 0.0 {
        return UPLOAD_PROMPT.to_string();
    }

    format!(
        "📅 **Daily Savings Plan**\n\n\
         Based on your uploaded sales, your Average Daily Sale is ₹**{:.0}**.\n\n\
         To stay ready for a standard loan, set aside **₹{} today** (approx 20%).\n\n\
         *Tip: Keep this amount in your wallet now to ensure easy repayment!*",
        avg_daily,
        daily_savings_target(avg_daily)
    )
}

/// Month-end repayment plan returned after a sales upload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepaymentPlan {
    pub avg_daily: f64,
    pub base_daily: f64,
    pub recommended_daily: u64,
    pub remaining_days: u32,
}

/// Days from `today` through the last day of its month, inclusive.
pub fn remaining_days_in_month(today: NaiveDate) -> u32 {
    let (year, month) = if today.month() == 12 {
        (today.year() + 1, 1)
    } else {
        (today.year(), today.month() + 1)
    };

    let days = NaiveDate::from_ymd_opt(year, month, 1)
        .map(|first_of_next| (first_of_next - today).num_days())
        .unwrap_or(1);

    days.max(1) as u32
}

/// Spread what the wallet can't cover over the rest of the month,
/// capped at 80% of average sales and never below 1.
pub fn repayment_plan(
    avg_daily: f64,
    monthly_emi: u64,
    wallet_balance: f64,
    today: NaiveDate,
) -> RepaymentPlan {
    let remaining_days = remaining_days_in_month(today);
    let required = (monthly_emi as f64 - wallet_balance).max(0.0);
    let base_daily = required / remaining_days as f64;
    let cap = avg_daily * PLAN_SALES_CAP;
    let recommended_daily = base_daily.min(cap).max(1.0).round() as u64;

    RepaymentPlan {
        avg_daily: round_to(avg_daily, 2),
        base_daily: round_to(base_daily, 2),
        recommended_daily,
        remaining_days,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(sales: &[f64]) -> Vec<TransactionRecord> {
        sales
            .iter()
            .enumerate()
            .map(|(i, s)| TransactionRecord {
                merchant_id: "m_001".into(),
                date: NaiveDate::from_ymd_opt(2024, 3, 1 + i as u32).unwrap(),
                gross_sales: *s,
                cash_in_hand: 0.0,
            })
            .collect()
    }

    #[test]
    fn test_average_and_target() {
        let avg = average_daily_sales(&records(&[800.0, 1200.0, 1000.0]));
        assert_eq!(avg, 1000.0);
        assert_eq!(daily_savings_target(avg), 200);
        assert_eq!(average_daily_sales(&[]), 0.0);
        assert_eq!(daily_savings_target(999.0), 199);
    }

    #[test]
    fn test_render_plan_or_upload_prompt() {
        let reply = render_savings_plan(1000.0);
        assert!(reply.contains("₹**1000**"));
        assert!(reply.contains("**₹200 today**"));

        assert_eq!(render_savings_plan(0.0), UPLOAD_PROMPT);
    }

    #[test]
    fn test_remaining_days() {
        let d = |y, m, day| NaiveDate::from_ymd_opt(y, m, day).unwrap();
        assert_eq!(remaining_days_in_month(d(2024, 2, 1)), 29);
        assert_eq!(remaining_days_in_month(d(2024, 2, 29)), 1);
        assert_eq!(remaining_days_in_month(d(2023, 12, 30)), 2);
    }

    #[test]
    fn test_repayment_plan() {
        let today = NaiveDate::from_ymd_opt(2024, 4, 21).unwrap(); // 10 days left
        let plan = repayment_plan(1000.0, 3000, 500.0, today);

        assert_eq!(plan.remaining_days, 10);
        assert_eq!(plan.base_daily, 250.0);
        assert_eq!(plan.recommended_daily, 250);
        assert_eq!(plan.avg_daily, 1000.0);
    }

    #[test]
    fn test_repayment_plan_caps_and_floors() {
        let today = NaiveDate::from_ymd_opt(2024, 4, 30).unwrap(); // last day
        let capped = repayment_plan(100.0, 3000, 0.0, today);
        assert_eq!(capped.recommended_daily, 80);

        let covered = repayment_plan(1000.0, 3000, 5000.0, today);
        assert_eq!(covered.base_daily, 0.0);
        assert_eq!(covered.recommended_daily, 1);
    }
}
