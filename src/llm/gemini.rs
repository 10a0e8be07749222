//! Gemini API client
//!
//! Uses a long-lived reqwest::Client for connection pooling.
//! Serves both text generation and query embeddings.

use crate::error::{AssistantError, GenerationError};
use crate::llm::{PromptMessage, PromptRole, TextGenerator};
use crate::search::Embedder;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info};

const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Reusable Gemini client (connection-pooled)
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    embedding_model: String,
    temperature: f32,
}

impl GeminiClient {
    pub fn new(
        api_key: String,
        model: String,
        embedding_model: String,
        temperature: f32,
    ) -> crate::Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            client,
            api_key,
            model,
            embedding_model,
            temperature,
        })
    }

    fn endpoint(&self, model: &str, method: &str) -> String {
        format!("{}/{}:{}?key={}", BASE_URL, model, method, self.api_key)
    }
}

/// Map an HTTP failure onto the retry taxonomy.
fn classify_failure(status: StatusCode, body: &str) -> GenerationError {
    let detail = format!("{}: {}", status, body);

    if status == StatusCode::TOO_MANY_REQUESTS || body.contains("RESOURCE_EXHAUSTED") {
        GenerationError::RateLimited(detail)
    } else if status.is_server_error() {
        GenerationError::Transient(detail)
    } else {
        GenerationError::Rejected(detail)
    }
}

/// Split role-tagged messages into Gemini's system instruction and user turns.
fn build_request(messages: &[PromptMessage], temperature: f32) -> GeminiRequest {
    let mut system_parts = Vec::new();
    let mut contents = Vec::new();

    for message in messages {
        match message.role {
            PromptRole::System => system_parts.push(Part {
                text: message.content.clone(),
            }),
            PromptRole::Human => contents.push(Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: message.content.clone(),
                }],
            }),
        }
    }

    GeminiRequest {
        contents,
        generation_config: GenerationConfig {
            temperature,
            top_p: 0.9,
            top_k: 40,
            max_output_tokens: 512,
        },
        system_instruction: if system_parts.is_empty() {
            None
        } else {
            Some(SystemInstruction {
                parts: system_parts,
            })
        },
    }
}

#[async_trait::async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, messages: &[PromptMessage]) -> Result<String, GenerationError> {
        if self.api_key.is_empty() {
            return Err(GenerationError::Rejected(
                "GEMINI_API_KEY not configured".to_string(),
            ));
        }

        let request = build_request(messages, self.temperature);

        info!(model = %self.model, "Calling Gemini API");

        let response = self
            .client
            .post(self.endpoint(&self.model, "generateContent"))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("Gemini API request failed: {}", e);
                GenerationError::Transient(format!("Gemini API error: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Gemini API error response: {}", error_text);
            return Err(classify_failure(status, &error_text));
        }

        let gemini_response: GeminiResponse = response.json().await.map_err(|e| {
            error!("Failed to parse Gemini response: {}", e);
            GenerationError::Transient(format!("Gemini parse error: {}", e))
        })?;

        let answer: String = gemini_response
            .candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .map(|p| p.text.as_str())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if answer.trim().is_empty() {
            return Err(GenerationError::EmptyResponse);
        }

        Ok(answer)
    }
}

#[async_trait::async_trait]
impl Embedder for GeminiClient {
    async fn embed(&self, text: &str) -> crate::Result<Vec<f32>> {
        let request = EmbedRequest {
            content: Content {
                role: None,
                parts: vec![Part {
                    text: text.to_string(),
                }],
            },
        };

        let response = self
            .client
            .post(self.endpoint(&self.embedding_model, "embedContent"))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AssistantError::SearchError(format!(
                "Gemini embedding error {}: {}",
                status, error_text
            )));
        }

        let body: EmbedResponse = response.json().await?;
        Ok(body.embedding.values)
    }
}

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<SystemInstruction>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: i32,
    max_output_tokens: i32,
}

#[derive(Debug, Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Serialize)]
struct EmbedRequest {
    content: Content,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: Embedding,
}

#[derive(Debug, Deserialize)]
struct Embedding {
    values: Vec<f32>,
}
