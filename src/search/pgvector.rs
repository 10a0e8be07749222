//! pgvector-backed policy search
//!
//! Expects a `match_documents(query_embedding vector, match_count int)`
//! SQL function returning rows with a `content` column.

use crate::search::PolicySearch;
use crate::Result;
use sqlx::postgres::PgPool;
use sqlx::Row;
use std::sync::Arc;
use tracing::debug;

/// Turns text into an embedding vector
#[async_trait::async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

pub struct PgVectorPolicySearch {
    pool: PgPool,
    embedder: Arc<dyn Embedder>,
}

impl PgVectorPolicySearch {
    pub fn new(pool: PgPool, embedder: Arc<dyn Embedder>) -> Self {
        Self { pool, embedder }
    }
}

/// pgvector text literal, e.g. `[0.1,0.2]`
pub fn vector_literal(values: &[f32]) -> String {
    let body: Vec<String> = values.iter().map(|v| v.to_string()).collect();
    format!("[{}]", body.join(","))
}

#[async_trait::async_trait]
impl PolicySearch for PgVectorPolicySearch {
    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<String>> {
        let embedding = self.embedder.embed(query).await?;

        let rows = sqlx::query(
            "SELECT content FROM match_documents($1::text::vector, $2)",
        )
        .bind(vector_literal(&embedding))
        .bind(k as i32)
        .fetch_all(&self.pool)
        .await?;

        debug!(hits = rows.len(), "pgvector policy search complete");

        rows.iter()
            .map(|row| -> Result<String> { Ok(row.try_get("content")?) })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vector_literal() {
        assert_eq!(vector_literal(&[0.5, -1.0, 2.25]), "[0.5,-1,2.25]");
        assert_eq!(vector_literal(&[]), "[]");
    }
}
