//! Policy knowledge-base search
//!
//! Two backends: an in-process keyword index built from a policy text file,
//! and a pgvector index queried through Gemini embeddings.

use crate::Result;
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

pub mod pgvector;
pub use pgvector::{Embedder, PgVectorPolicySearch};

/// Nearest-snippet lookup over the policy knowledge base
#[async_trait::async_trait]
pub trait PolicySearch: Send + Sync {
    /// Up to `k` snippets, best match first. May be empty.
    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<String>>;
}

pub const CHUNK_SIZE: usize = 500;
pub const CHUNK_OVERLAP: usize = 50;

/// Split text into chunks of at most `chunk_size` chars.
///
/// Paragraphs are packed greedily; consecutive chunks share up to `overlap`
/// trailing chars. A paragraph longer than `chunk_size` is cut on char
/// boundaries.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let chunk_size = chunk_size.max(1);
    let overlap = overlap.min(chunk_size / 2);

    let mut pieces: Vec<String> = Vec::new();
    for paragraph in text.split("\n\n").map(str::trim).filter(|p| !p.is_empty()) {
        let chars: Vec<char> = paragraph.chars().collect();
        if chars.len() <= chunk_size {
            pieces.push(paragraph.to_string());
            continue;
        }
        let step = chunk_size - overlap;
        let mut start = 0;
        while start < chars.len() {
            let end = (start + chunk_size).min(chars.len());
            pieces.push(chars[start..end].iter().collect());
            if end == chars.len() {
                break;
            }
            start += step;
        }
    }

    let mut chunks: Vec<String> = Vec::new();
    let mut current = String::new();

    for piece in pieces {
        let joined_len = current.chars().count() + piece.chars().count() + 2;
        if !current.is_empty() && joined_len > chunk_size {
            let tail: String = {
                let chars: Vec<char> = current.chars().collect();
                chars[chars.len().saturating_sub(overlap)..].iter().collect()
            };
            chunks.push(std::mem::take(&mut current));
            if overlap > 0 && tail.chars().count() + piece.chars().count() + 2 <= chunk_size {
                current = tail;
            }
        }
        if !current.is_empty() {
            current.push_str("\n\n");
        }
        current.push_str(&piece);
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

fn tokens(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() > 2)
        .map(str::to_string)
        .collect()
}

/// In-process index ranking chunks by token overlap with the query
pub struct KeywordPolicyIndex {
    chunks: Vec<(String, HashSet<String>)>,
}

impl KeywordPolicyIndex {
    pub fn new(chunks: Vec<String>) -> Self {
        Self {
            chunks: chunks
                .into_iter()
                .map(|chunk| {
                    let terms = tokens(&chunk);
                    (chunk, terms)
                })
                .collect(),
        }
    }

    pub fn from_text(text: &str) -> Self {
        Self::new(chunk_text(text, CHUNK_SIZE, CHUNK_OVERLAP))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let index = Self::from_text(&text);

        info!(path = %path.display(), chunks = index.len(), "Loaded policy knowledge base");

        Ok(index)
    }

    pub fn empty() -> Self {
        Self { chunks: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

#[async_trait::async_trait]
impl PolicySearch for KeywordPolicyIndex {
    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<String>> {
        let query_terms = tokens(query);
        if query_terms.is_empty() {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(f64, usize)> = self
            .chunks
            .iter()
            .enumerate()
            .filter_map(|(i, (_, terms))| {
                let shared = terms.intersection(&query_terms).count();
                if shared == 0 {
                    return None;
                }
                // cosine over binary term vectors
                let norm = ((terms.len() * query_terms.len()) as f64).sqrt();
                Some((shared as f64 / norm, i))
            })
            .collect();

        scored.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(_, i)| self.chunks[i].0.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const POLICY: &str = "Loans are disbursed only after KYC verification is complete.\n\n\
        Repayment happens through a daily auto-debit mandate from the merchant wallet.\n\n\
        Failed debits are retried once the next morning. Two consecutive failures pause the mandate.";

    #[test]
    fn test_chunk_text_respects_size() {
        let text = "word ".repeat(400);
        let chunks = chunk_text(&text, 100, 10);
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.chars().count() <= 100));
    }

    #[test]
    fn test_chunk_text_packs_short_paragraphs() {
        let chunks = chunk_text("alpha\n\nbeta\n\ngamma", 500, 50);
        assert_eq!(chunks, vec!["alpha\n\nbeta\n\ngamma".to_string()]);
        assert!(chunk_text("   \n\n  ", 500, 50).is_empty());
    }

    #[tokio::test]
    async fn test_keyword_search_ranks_best_chunk_first() {
        let index = KeywordPolicyIndex::new(POLICY.split("\n\n").map(str::to_string).collect());

        let hits = index
            .similarity_search("are failed debits retried?", 3)
            .await
            .unwrap();

        assert!(!hits.is_empty());
        assert!(hits[0].contains("retried"));
    }

    #[tokio::test]
    async fn test_keyword_search_limits_and_handles_no_match() {
        let index = KeywordPolicyIndex::new(POLICY.split("\n\n").map(str::to_string).collect());

        let hits = index.similarity_search("mandate wallet kyc loans", 1).await.unwrap();
        assert_eq!(hits.len(), 1);

        let none = index.similarity_search("zzz qqq", 3).await.unwrap();
        assert!(none.is_empty());

        let empty = KeywordPolicyIndex::empty();
        assert!(empty.similarity_search("kyc", 3).await.unwrap().is_empty());
    }
}
