//! Runtime configuration
//!
//! Read once at startup from the environment (and `.env` via dotenv).
//! Missing required settings abort startup; nothing here is read per request.

use crate::error::AssistantError;
use crate::Result;
use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyBackend {
    /// In-process keyword index over a policy text file
    Keyword { path: PathBuf },
    /// pgvector `match_documents` over Gemini embeddings
    PgVector,
}

#[derive(Debug, Clone)]
pub struct AssistantConfig {
    pub use_llm: bool,
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub embedding_model: String,
    pub temperature: f32,
    pub retry_base_delay: Duration,
    pub database_url: Option<String>,
    pub policy_backend: PolicyBackend,
    pub port: u16,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            use_llm: false,
            gemini_api_key: String::new(),
            gemini_model: "gemini-2.5-flash".to_string(),
            embedding_model: "text-embedding-004".to_string(),
            temperature: 0.2,
            retry_base_delay: Duration::from_secs(1),
            database_url: None,
            policy_backend: PolicyBackend::Keyword {
                path: PathBuf::from("knowledge_base/policy.txt"),
            },
            port: 8080,
        }
    }
}

impl AssistantConfig {
    /// Load `.env` if present, then read the process environment.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_vars(&std::env::vars().collect())
    }

    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self> {
        let get = |key: &str| {
            vars.get(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();

        let use_llm = get("USE_LLM").map(|v| v == "1").unwrap_or(true);

        let gemini_api_key = get("GEMINI_API_KEY").unwrap_or_default();
        if use_llm && gemini_api_key.is_empty() {
            return Err(AssistantError::ConfigError(
                "GEMINI_API_KEY is required when USE_LLM=1".to_string(),
            ));
        }

        let database_url = get("DATABASE_URL").or_else(|| get("POSTGRES_URL"));

        let policy_backend = match get("POLICY_SEARCH_BACKEND").as_deref() {
            None | Some("keyword") => PolicyBackend::Keyword {
                path: get("POLICY_FILE")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("knowledge_base/policy.txt")),
            },
            Some("pgvector") => {
                if database_url.is_none() || gemini_api_key.is_empty() {
                    return Err(AssistantError::ConfigError(
                        "POLICY_SEARCH_BACKEND=pgvector needs DATABASE_URL and GEMINI_API_KEY"
                            .to_string(),
                    ));
                }
                PolicyBackend::PgVector
            }
            Some(other) => {
                return Err(AssistantError::ConfigError(format!(
                    "Unknown POLICY_SEARCH_BACKEND: {}",
                    other
                )))
            }
        };

        let retry_base_ms: u64 = parse_var(&get, "LLM_RETRY_BASE_MS")?.unwrap_or(1000);

        Ok(Self {
            use_llm,
            gemini_api_key,
            gemini_model: get("GEMINI_MODEL").unwrap_or(defaults.gemini_model),
            embedding_model: get("GEMINI_EMBEDDING_MODEL").unwrap_or(defaults.embedding_model),
            temperature: parse_var(&get, "LLM_TEMPERATURE")?.unwrap_or(defaults.temperature),
            retry_base_delay: Duration::from_millis(retry_base_ms),
            database_url,
            policy_backend,
            port: match parse_var(&get, "PORT")? {
                Some(port) => port,
                None => parse_var(&get, "API_PORT")?.unwrap_or(defaults.port),
            },
        })
    }
}

fn parse_var<T, F>(get: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    get(key)
        .map(|raw| {
            raw.parse::<T>().map_err(|e| {
                AssistantError::ConfigError(format!("{} has invalid value {:?}: {}", key, raw, e))
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_llm_enabled_requires_api_key() {
        let err = AssistantConfig::from_vars(&vars(&[])).unwrap_err();
        assert!(err.to_string().contains("GEMINI_API_KEY"));
    }

    #[test]
    fn test_llm_disabled_needs_nothing() {
        let config = AssistantConfig::from_vars(&vars(&[("USE_LLM", "0")])).unwrap();
        assert!(!config.use_llm);
        assert_eq!(config.port, 8080);
        assert!(config.database_url.is_none());
        assert_eq!(
            config.policy_backend,
            PolicyBackend::Keyword {
                path: PathBuf::from("knowledge_base/policy.txt")
            }
        );
    }

    #[test]
    fn test_overrides() {
        let config = AssistantConfig::from_vars(&vars(&[
            ("GEMINI_API_KEY", "k"),
            ("LLM_RETRY_BASE_MS", "250"),
            ("API_PORT", "9000"),
            ("POSTGRES_URL", "postgres://localhost/lending"),
            ("POLICY_SEARCH_BACKEND", "pgvector"),
        ]))
        .unwrap();

        assert!(config.use_llm);
        assert_eq!(config.retry_base_delay, Duration::from_millis(250));
        assert_eq!(config.port, 9000);
        assert_eq!(config.policy_backend, PolicyBackend::PgVector);
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/lending"));
    }

    #[test]
    fn test_invalid_values_are_config_errors() {
        let err = AssistantConfig::from_vars(&vars(&[("USE_LLM", "0"), ("PORT", "eighty")]))
            .unwrap_err();
        assert!(matches!(err, AssistantError::ConfigError(_)));

        let err = AssistantConfig::from_vars(&vars(&[
            ("USE_LLM", "0"),
            ("POLICY_SEARCH_BACKEND", "pgvector"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("pgvector"));
    }
}
