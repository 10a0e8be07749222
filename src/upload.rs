//! Sales CSV ingestion
//!
//! Accepts `date,gross_sales[,cash_in_hand]` rows, stores them, and
//! returns the month-end repayment plan for the uploading merchant.

use crate::error::AssistantError;
use crate::models::{parse_amount, TransactionRecord};
use crate::reply::savings::{average_daily_sales, repayment_plan, RepaymentPlan};
use crate::store::RecordStore;
use crate::Result;
use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

pub const DEFAULT_MONTHLY_EMI: u64 = 3000;
pub const DATE_FORMAT: &str = "%Y-%m-%d";

const REQUIRED_COLUMNS: [&str; 2] = ["date", "gross_sales"];

fn column(headers: &StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h.trim().eq_ignore_ascii_case(name))
}

/// Parse an uploaded sales CSV. Unreadable sales figures count as zero;
/// an unreadable date rejects the whole upload.
pub fn parse_sales_csv(merchant_id: &str, bytes: &[u8]) -> Result<Vec<TransactionRecord>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(bytes);

    let headers = reader.headers()?.clone();
    let (Some(date_col), Some(sales_col)) = (column(&headers, "date"), column(&headers, "gross_sales")) else {
        return Err(AssistantError::InvalidUpload(format!(
            "CSV must contain '{}' and '{}' columns",
            REQUIRED_COLUMNS[0], REQUIRED_COLUMNS[1]
        )));
    };
    let cash_col = column(&headers, "cash_in_hand");

    let mut records = Vec::new();

    for (line_num, row) in reader.records().enumerate() {
        let row = row?;
        // +2: 1-indexed plus header row
        let line = line_num + 2;

        let raw_date = row.get(date_col).unwrap_or("");
        let date = NaiveDate::parse_from_str(raw_date, DATE_FORMAT).map_err(|_| {
            AssistantError::InvalidUpload(format!("line {}: invalid date {:?}", line, raw_date))
        })?;

        let gross_sales = row.get(sales_col).and_then(parse_amount).unwrap_or(0.0);
        let cash_in_hand = cash_col
            .and_then(|c| row.get(c))
            .and_then(parse_amount)
            .unwrap_or(0.0);

        records.push(TransactionRecord {
            merchant_id: merchant_id.to_string(),
            date,
            gross_sales,
            cash_in_hand,
        });
    }

    Ok(records)
}

/// Inputs for one upload
pub struct SalesUpload<'a> {
    pub merchant_id: &'a str,
    pub bytes: &'a [u8],
    pub monthly_emi: u64,
    pub today: NaiveDate,
}

/// Parse, store and plan. Store failures are logged and the raw CSV is
/// written under `fallback_dir` instead; they never fail the upload.
pub async fn ingest_sales(
    store: &dyn RecordStore,
    upload: SalesUpload<'_>,
    fallback_dir: &Path,
) -> Result<RepaymentPlan> {
    let records = parse_sales_csv(upload.merchant_id, upload.bytes)?;
    let avg_daily = average_daily_sales(&records);
    let row_count = records.len();

    match store.insert_transactions(records).await {
        Ok(stored) => info!(merchant_id = upload.merchant_id, stored, "Sales rows stored"),
        Err(e) => {
            error!(merchant_id = upload.merchant_id, "Sales insert failed, saving locally: {}", e);
            match save_locally(fallback_dir, upload.merchant_id, upload.bytes).await {
                Ok(path) => info!(path = %path.display(), rows = row_count, "Sales CSV saved locally"),
                Err(e) => error!("Local CSV save failed: {}", e),
            }
        }
    }

    let wallet_balance = match store.merchant_profile(upload.merchant_id).await {
        Ok(Some(profile)) => profile.wallet_balance,
        Ok(None) => 0.0,
        Err(e) => {
            warn!(merchant_id = upload.merchant_id, "Profile fetch failed, wallet treated as 0: {}", e);
            0.0
        }
    };

    Ok(repayment_plan(
        avg_daily,
        upload.monthly_emi,
        wallet_balance,
        upload.today,
    ))
}

async fn save_locally(dir: &Path, merchant_id: &str, bytes: &[u8]) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(format!(
        "{}_{}.csv",
        merchant_id,
        chrono::Utc::now().timestamp()
    ));
    tokio::fs::write(&path, bytes).await?;
    Ok(path)
}
