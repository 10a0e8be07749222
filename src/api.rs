//! REST API server for the merchant lending assistant
//!
//! Thin HTTP wrapper over the orchestrator plus the sales upload and
//! dashboard endpoints used by the merchant UI.

use axum::{
    extract::{Multipart, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::agent::Orchestrator;
use crate::error::AssistantError;
use crate::models::ChatRole;
use crate::store::persist_best_effort;
use crate::upload::{ingest_sales, SalesUpload, DEFAULT_MONTHLY_EMI};

const DASHBOARD_LOG_LIMIT: usize = 50;
const BUSY_REPLY: &str = "Server busy. Try again.";

/// =============================
/// Request / Response Models
/// =============================

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub session_id: String,
    pub message: String,
}

/// Both keys carry the same text for older frontends
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    pub reply: String,
}

impl ChatResponse {
    fn new(text: String) -> Self {
        Self {
            response: text.clone(),
            reply: text,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    #[serde(default = "default_logs_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

fn default_logs_limit() -> usize {
    10
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub orchestrator: Arc<Orchestrator>,
    /// False when records live in memory only
    pub db_configured: bool,
    /// Where uploads land when the record store rejects them
    pub upload_fallback_dir: PathBuf,
}

impl ApiState {
    pub fn new(orchestrator: Arc<Orchestrator>, db_configured: bool) -> Self {
        Self {
            orchestrator,
            db_configured,
            upload_fallback_dir: PathBuf::from("sample_data"),
        }
    }
}

fn error_body(status: StatusCode, message: impl Into<String>) -> (StatusCode, Json<Value>) {
    (status, Json(json!({ "error": message.into() })))
}

/// =============================
/// Health Endpoint
/// =============================

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "time": chrono::Utc::now().to_rfc3339()
    }))
}

/// =============================
/// Chat Endpoint
/// =============================

async fn chat_handler(
    State(state): State<ApiState>,
    Json(req): Json<ChatRequest>,
) -> (StatusCode, Json<ChatResponse>) {
    if req.session_id.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ChatResponse::new("session_id is required".into())),
        );
    }

    info!(session_id = %req.session_id, "Chat request received");

    let store = state.orchestrator.store();
    persist_best_effort(store.as_ref(), &req.session_id, ChatRole::User, &req.message).await;

    // The orchestrator persists its own reply
    let task_state = state.clone();
    let handle = tokio::spawn(async move {
        task_state
            .orchestrator
            .process(&req.session_id, &req.message)
            .await
    });

    match handle.await {
        Ok(reply) => (StatusCode::OK, Json(ChatResponse::new(reply))),
        Err(e) => {
            error!("Chat task aborted: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ChatResponse::new(BUSY_REPLY.into())),
            )
        }
    }
}

/// =============================
/// Sales Upload Endpoint
/// =============================

async fn upload_csv(
    State(state): State<ApiState>,
    mut multipart: Multipart,
) -> (StatusCode, Json<Value>) {
    let mut file: Option<Vec<u8>> = None;
    let mut merchant_id: Option<String> = None;
    let mut monthly_emi = DEFAULT_MONTHLY_EMI;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return error_body(StatusCode::BAD_REQUEST, e.to_string()),
        };

        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => match field.bytes().await {
                Ok(bytes) => file = Some(bytes.to_vec()),
                Err(e) => return error_body(StatusCode::BAD_REQUEST, e.to_string()),
            },
            "merchant_id" => match field.text().await {
                Ok(text) => merchant_id = Some(text.trim().to_string()),
                Err(e) => return error_body(StatusCode::BAD_REQUEST, e.to_string()),
            },
            "monthly_emi" => {
                let raw = field.text().await.unwrap_or_default();
                match raw.trim().parse::<u64>() {
                    Ok(value) => monthly_emi = value,
                    Err(_) => {
                        return error_body(
                            StatusCode::BAD_REQUEST,
                            format!("monthly_emi must be a whole number, got {:?}", raw),
                        )
                    }
                }
            }
            _ => {}
        }
    }

    let (Some(file), Some(merchant_id)) = (file, merchant_id.filter(|m| !m.is_empty())) else {
        return error_body(StatusCode::BAD_REQUEST, "file and merchant_id are required");
    };

    let store = state.orchestrator.store();
    let upload = SalesUpload {
        merchant_id: &merchant_id,
        bytes: &file,
        monthly_emi,
        today: chrono::Utc::now().date_naive(),
    };

    match ingest_sales(store.as_ref(), upload, &state.upload_fallback_dir).await {
        Ok(plan) => (StatusCode::OK, Json(json!(plan))),
        Err(e @ AssistantError::InvalidUpload(_)) | Err(e @ AssistantError::CsvError(_)) => {
            error_body(StatusCode::BAD_REQUEST, e.to_string())
        }
        Err(e) => {
            error!(merchant_id = %merchant_id, "Upload failed: {}", e);
            error_body(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// =============================
/// Dashboard Endpoints
/// =============================

async fn dashboard(State(state): State<ApiState>) -> (StatusCode, Json<Value>) {
    if !state.db_configured {
        return (
            StatusCode::OK,
            Json(json!({
                "total_volume": 0,
                "failed_count": 0,
                "logs": [],
                "db_status": "not-configured"
            })),
        );
    }

    match state.orchestrator.store().latest_logs(DASHBOARD_LOG_LIMIT, 0).await {
        Ok(logs) => {
            let failed_count = logs
                .iter()
                .filter(|l| l.status.eq_ignore_ascii_case("failed"))
                .count();
            (
                StatusCode::OK,
                Json(json!({
                    "total_volume": logs.len(),
                    "failed_count": failed_count,
                    "logs": logs,
                    "db_status": "Connected"
                })),
            )
        }
        Err(e) => {
            error!("Dashboard query failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "total_volume": 0,
                    "failed_count": 0,
                    "logs": [],
                    "db_status": "error"
                })),
            )
        }
    }
}

async fn transaction_logs(
    State(state): State<ApiState>,
    Query(query): Query<LogsQuery>,
) -> (StatusCode, Json<Value>) {
    match state
        .orchestrator
        .store()
        .latest_logs(query.limit, query.offset)
        .await
    {
        Ok(rows) => (
            StatusCode::OK,
            Json(json!({ "total": rows.len(), "transactions": rows })),
        ),
        Err(e) => {
            error!("Transaction log query failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "transactions": [], "total": 0 })),
            )
        }
    }
}

/// =============================
/// Router
/// =============================

pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/chat", post(chat_handler))
        .route("/api/upload-csv", post(upload_csv))
        .route("/api/dashboard", get(dashboard))
        .route("/api/transactions/logs", get(transaction_logs))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    state: ApiState,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}
