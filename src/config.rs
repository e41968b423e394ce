use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    pub corpus: CorpusConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CorpusConfig {
    pub path: PathBuf,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/historical_events.csv"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    /// `"hash"` (deterministic, offline) or `"openai"` (remote API).
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    /// Environment variable holding the API key for the `openai` provider.
    #[serde(default = "default_embed_api_key_env")]
    pub api_key_env: String,
    /// API base URL, e.g. `https://api.openai.com/v1`. Falls back to the
    /// `CHRONOGRAPH_BASE_URL` environment variable when unset.
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_dims")]
    pub dims: usize,
    #[serde(default = "default_embed_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_embed_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: None,
            api_key_env: default_embed_api_key_env(),
            base_url: None,
            dims: default_dims(),
            max_retries: default_embed_max_retries(),
            timeout_secs: default_embed_timeout_secs(),
        }
    }
}

fn default_embedding_provider() -> String {
    "hash".to_string()
}
fn default_embed_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}
fn default_dims() -> usize {
    256
}
fn default_embed_max_retries() -> u32 {
    5
}
fn default_embed_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Over-fetch multiplier applied to the requested article count.
    #[serde(default = "default_oversample_factor")]
    pub oversample_factor: usize,
    /// Lower bound on candidates fetched regardless of the requested count.
    #[serde(default = "default_min_candidates")]
    pub min_candidates: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            oversample_factor: default_oversample_factor(),
            min_candidates: default_min_candidates(),
        }
    }
}

fn default_oversample_factor() -> usize {
    3
}
fn default_min_candidates() -> usize {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_model")]
    pub model: String,
    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// API base URL, e.g. `https://api.openai.com/v1`. Falls back to the
    /// `CHRONOGRAPH_BASE_URL` environment variable when unset.
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Model calls may block for tens of seconds; keep this >= 60.
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_key_env: default_api_key_env(),
            base_url: None,
            temperature: default_temperature(),
            timeout_secs: default_llm_timeout_secs(),
        }
    }
}

fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}
fn default_api_key_env() -> String {
    "CHRONOGRAPH_API_KEY".to_string()
}
fn default_temperature() -> f64 {
    0.7
}
fn default_llm_timeout_secs() -> u64 {
    120
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    /// Attempt budget for schema-validation failures.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Fixed pause between retry attempts.
    #[serde(default = "default_backoff_secs")]
    pub backoff_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            backoff_secs: default_backoff_secs(),
        }
    }
}

fn default_max_retries() -> u32 {
    2
}
fn default_backoff_secs() -> u64 {
    2
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    match config.embedding.provider.as_str() {
        "hash" | "openai" => {}
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be hash or openai.",
            other
        ),
    }

    if config.embedding.provider == "openai" && config.embedding.model.is_none() {
        anyhow::bail!("embedding.model must be specified when provider is 'openai'");
    }

    if config.embedding.dims == 0 {
        anyhow::bail!("embedding.dims must be > 0");
    }

    if config.retrieval.oversample_factor == 0 {
        anyhow::bail!("retrieval.oversample_factor must be >= 1");
    }

    if config.generation.max_retries == 0 {
        anyhow::bail!("generation.max_retries must be >= 1");
    }

    if !(0.0..=2.0).contains(&config.llm.temperature) {
        anyhow::bail!("llm.temperature must be in [0.0, 2.0]");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let f = write_config(
            r#"
[corpus]
path = "data/events.csv"
"#,
        );
        let config = load_config(f.path()).unwrap();
        assert_eq!(config.embedding.provider, "hash");
        assert_eq!(config.embedding.dims, 256);
        assert_eq!(config.embedding.api_key_env, "OPENAI_API_KEY");
        assert_eq!(config.embedding.base_url, None);
        assert_eq!(config.retrieval.oversample_factor, 3);
        assert_eq!(config.retrieval.min_candidates, 10);
        assert_eq!(config.llm.model, "gpt-3.5-turbo");
        assert_eq!(config.llm.timeout_secs, 120);
        assert_eq!(config.generation.max_retries, 2);
        assert_eq!(config.generation.backoff_secs, 2);
    }

    #[test]
    fn test_unknown_embedding_provider_rejected() {
        let f = write_config(
            r#"
[corpus]
path = "data/events.csv"

[embedding]
provider = "faiss"
"#,
        );
        let err = load_config(f.path()).unwrap_err();
        assert!(err.to_string().contains("Unknown embedding provider"));
    }

    #[test]
    fn test_openai_provider_requires_model() {
        let f = write_config(
            r#"
[corpus]
path = "data/events.csv"

[embedding]
provider = "openai"
dims = 1536
"#,
        );
        let err = load_config(f.path()).unwrap_err();
        assert!(err.to_string().contains("embedding.model"));
    }

    #[test]
    fn test_zero_retries_rejected() {
        let f = write_config(
            r#"
[corpus]
path = "data/events.csv"

[generation]
max_retries = 0
"#,
        );
        assert!(load_config(f.path()).is_err());
    }
}
