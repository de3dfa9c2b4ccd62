//! Configuration management with file persistence

use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::domain::graph::GraphStore;
use crate::domain::ingest::IngestConfig;
use crate::domain::provider::{CompletionProvider, EmbeddingProvider};
use crate::domain::retrieval::{
    FusionConfig, FusionRetriever, ParentResolver, QueryExpander, RetrievalService,
};
use crate::domain::vector::VectorStore;
use crate::storage::{Schema, default_database_path};

/// Wikigraph configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub graph_store: GraphStoreConfig,
    pub vector_store: VectorStoreConfig,
    pub llm: LlmConfig,
    pub embedding: EmbeddingConfig,
    pub retrieval: RetrievalConfig,
    pub ingest: IngestSettings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphStoreConfig {
    /// SQLite file; defaults to the platform data directory
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorStoreConfig {
    pub path: Option<PathBuf>,
    /// Base name; partitions are `<collection>_text` and `<collection>_image`
    pub collection: String,
    pub text_dimensions: usize,
    pub image_dimensions: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub base_url: String,
    pub completion_model: String,
    pub temperature: f32,
    pub max_tokens: usize,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub model: String,
    /// Requested output size, for models that support shortening
    pub dimensions: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub num_queries: usize,
    pub top_k: usize,
    pub rrf_k: f64,
    pub text_boost: f64,
    pub image_boost: f64,
    /// Concurrent query searches; `None` means one per query
    pub concurrency: Option<usize>,
    pub max_ancestor_depth: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestSettings {
    pub concurrency: usize,
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            path: None,
            collection: "wikigraph".to_string(),
            text_dimensions: 1536,
            image_dimensions: 1024,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            completion_model: "gpt-4o".to_string(),
            temperature: 0.7,
            max_tokens: 1024,
            timeout_secs: 120,
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "text-embedding-3-small".to_string(),
            dimensions: None,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            num_queries: 4,
            top_k: 10,
            rrf_k: 60.0,
            text_boost: 1.5,
            image_boost: 1.0,
            concurrency: None,
            max_ancestor_depth: 16,
        }
    }
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self { concurrency: 8 }
    }
}

impl GraphStoreConfig {
    pub fn resolved_path(&self) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| default_database_path(Schema::Graph))
    }
}

impl VectorStoreConfig {
    pub fn resolved_path(&self) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| default_database_path(Schema::Vector))
    }
}

impl LlmConfig {
    pub fn resolved_api_key(&self) -> anyhow::Result<Option<String>> {
        self.enforce_env_only()?;

        Ok(env::var("WIKIGRAPH_API_KEY")
            .or_else(|_| env::var("OPENAI_API_KEY"))
            .ok())
    }

    pub fn redacted_api_key(&self) -> anyhow::Result<Option<String>> {
        self.resolved_api_key().map(|opt| opt.map(|key| redact(&key)))
    }

    pub fn enforce_env_only(&self) -> anyhow::Result<()> {
        if self.api_key.is_some() {
            return Err(anyhow!(
                "LLM API keys must be provided via environment variables, not stored in configuration"
            ));
        }
        Ok(())
    }
}

impl RetrievalConfig {
    pub fn effective_concurrency(&self) -> usize {
        self.concurrency.unwrap_or(self.num_queries).max(1)
    }
}

fn redact(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 4 {
        "***".to_string()
    } else {
        let suffix: String = chars[chars.len() - 4..].iter().collect();
        format!("***{}", suffix)
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> anyhow::Result<PathBuf> {
        let dir = if let Ok(custom_dir) = env::var("WIKIGRAPH_CONFIG_DIR") {
            PathBuf::from(custom_dir)
        } else {
            dirs::config_dir()
                .ok_or_else(|| anyhow!("Could not determine config directory"))?
                .join("wikigraph")
        };
        Ok(dir)
    }

    /// Get the config file path
    pub fn config_path() -> anyhow::Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from the default location, or defaults if absent
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from a file, or defaults if it doesn't exist
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to the default location
    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to a file, creating its directory
    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        self.validate()?;

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        self.llm.enforce_env_only()?;

        if self.vector_store.collection.trim().is_empty() {
            return Err(anyhow!("vector_store.collection must not be empty"));
        }
        if self.vector_store.text_dimensions == 0 || self.vector_store.image_dimensions == 0 {
            return Err(anyhow!("Vector dimensions must be positive"));
        }
        if let Some(dims) = self.embedding.dimensions
            && dims != self.vector_store.text_dimensions
        {
            return Err(anyhow!(
                "embedding.dimensions ({}) must match vector_store.text_dimensions ({})",
                dims,
                self.vector_store.text_dimensions
            ));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(anyhow!("Temperature must be between 0.0 and 2.0"));
        }
        if self.retrieval.num_queries == 0 {
            return Err(anyhow!("retrieval.num_queries must be at least 1"));
        }
        if !self.retrieval.rrf_k.is_finite() || self.retrieval.rrf_k <= 0.0 {
            return Err(anyhow!("retrieval.rrf_k must be positive"));
        }
        if self.retrieval.text_boost < 0.0 || self.retrieval.image_boost < 0.0 {
            return Err(anyhow!("Retrieval boosts must be non-negative"));
        }
        if self.retrieval.max_ancestor_depth == 0 {
            return Err(anyhow!("retrieval.max_ancestor_depth must be at least 1"));
        }
        if self.ingest.concurrency == 0 {
            return Err(anyhow!("ingest.concurrency must be at least 1"));
        }
        Ok(())
    }

    /// Settings for the dual-store coordinator
    pub fn ingest_config(&self) -> IngestConfig {
        IngestConfig {
            concurrency: self.ingest.concurrency,
            collection: self.vector_store.collection.clone(),
            text_dimensions: self.vector_store.text_dimensions,
            image_dimensions: self.vector_store.image_dimensions,
        }
    }

    /// Settings for the fusion retriever
    pub fn fusion_config(&self) -> FusionConfig {
        FusionConfig {
            rrf_k: self.retrieval.rrf_k,
            text_boost: self.retrieval.text_boost,
            image_boost: self.retrieval.image_boost,
            concurrency: self.retrieval.effective_concurrency(),
        }
    }

    /// Query expander generating the configured number of queries
    pub fn query_expander(&self, llm: Arc<dyn CompletionProvider>) -> QueryExpander {
        QueryExpander::new(llm).with_num_queries(self.retrieval.num_queries)
    }

    /// Question-to-context pipeline wired from the retrieval settings
    pub fn retrieval_service<G: GraphStore, V: VectorStore>(
        &self,
        graph: Arc<G>,
        vectors: Arc<V>,
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn CompletionProvider>,
    ) -> RetrievalService<G, V> {
        let retriever = FusionRetriever::new(vectors, embedder, self.query_expander(llm))
            .with_config(self.fusion_config());
        let resolver =
            ParentResolver::new(graph).with_concurrency(self.retrieval.effective_concurrency());
        RetrievalService::new(retriever, resolver).with_top_k(self.retrieval.top_k)
    }

    /// Get a configuration value by key
    pub fn get(&self, key: &str) -> anyhow::Result<String> {
        let value = match key {
            "graph_store.path" => self.graph_store.resolved_path().display().to_string(),

            "vector_store.path" => self.vector_store.resolved_path().display().to_string(),
            "vector_store.collection" => self.vector_store.collection.clone(),
            "vector_store.text_dimensions" => self.vector_store.text_dimensions.to_string(),
            "vector_store.image_dimensions" => self.vector_store.image_dimensions.to_string(),

            "llm.base_url" => self.llm.base_url.clone(),
            "llm.completion_model" => self.llm.completion_model.clone(),
            "llm.temperature" => self.llm.temperature.to_string(),
            "llm.max_tokens" => self.llm.max_tokens.to_string(),
            "llm.timeout_secs" => self.llm.timeout_secs.to_string(),
            "llm.api_key" | "api_key" => match self.llm.redacted_api_key()? {
                Some(redacted) => redacted,
                None => "(not set - use WIKIGRAPH_API_KEY or OPENAI_API_KEY env var)".to_string(),
            },

            "embedding.model" => self.embedding.model.clone(),
            "embedding.dimensions" => self
                .embedding
                .dimensions
                .map(|d| d.to_string())
                .unwrap_or_else(|| "(model default)".to_string()),

            "retrieval.num_queries" => self.retrieval.num_queries.to_string(),
            "retrieval.top_k" => self.retrieval.top_k.to_string(),
            "retrieval.rrf_k" => self.retrieval.rrf_k.to_string(),
            "retrieval.text_boost" => self.retrieval.text_boost.to_string(),
            "retrieval.image_boost" => self.retrieval.image_boost.to_string(),
            "retrieval.concurrency" => self.retrieval.effective_concurrency().to_string(),
            "retrieval.max_ancestor_depth" => self.retrieval.max_ancestor_depth.to_string(),

            "ingest.concurrency" => self.ingest.concurrency.to_string(),

            _ => return Err(anyhow!("Unknown configuration key: {}", key)),
        };
        Ok(value)
    }

    /// Set a configuration value by key
    pub fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        match key {
            "graph_store.path" => self.graph_store.path = Some(PathBuf::from(value)),

            "vector_store.path" => self.vector_store.path = Some(PathBuf::from(value)),
            "vector_store.collection" => {
                if value.trim().is_empty() {
                    return Err(anyhow!("Collection name must not be empty"));
                }
                self.vector_store.collection = value.to_string();
            }
            "vector_store.text_dimensions" => {
                self.vector_store.text_dimensions = parse_positive(key, value)?;
            }
            "vector_store.image_dimensions" => {
                self.vector_store.image_dimensions = parse_positive(key, value)?;
            }

            "llm.base_url" => self.llm.base_url = value.trim_end_matches('/').to_string(),
            "llm.completion_model" => self.llm.completion_model = value.to_string(),
            "llm.temperature" => {
                let temp: f32 = value
                    .parse()
                    .with_context(|| format!("Invalid temperature value: {}", value))?;
                if !(0.0..=2.0).contains(&temp) {
                    return Err(anyhow!("Temperature must be between 0.0 and 2.0"));
                }
                self.llm.temperature = temp;
            }
            "llm.max_tokens" => self.llm.max_tokens = parse_positive(key, value)?,
            "llm.timeout_secs" => {
                self.llm.timeout_secs = value
                    .parse()
                    .with_context(|| format!("Invalid timeout_secs value: {}", value))?;
            }
            "llm.api_key" | "api_key" => {
                return Err(anyhow!(
                    "API keys cannot be stored in configuration. \
                     Set the WIKIGRAPH_API_KEY or OPENAI_API_KEY environment variable instead."
                ));
            }

            "embedding.model" => self.embedding.model = value.to_string(),
            "embedding.dimensions" => self.embedding.dimensions = Some(parse_positive(key, value)?),

            "retrieval.num_queries" => self.retrieval.num_queries = parse_positive(key, value)?,
            "retrieval.top_k" => self.retrieval.top_k = parse_positive(key, value)?,
            "retrieval.rrf_k" => self.retrieval.rrf_k = parse_positive(key, value)?,
            "retrieval.text_boost" => self.retrieval.text_boost = parse_non_negative(key, value)?,
            "retrieval.image_boost" => self.retrieval.image_boost = parse_non_negative(key, value)?,
            "retrieval.concurrency" => self.retrieval.concurrency = Some(parse_positive(key, value)?),
            "retrieval.max_ancestor_depth" => {
                self.retrieval.max_ancestor_depth = parse_positive::<u32>(key, value)?;
            }

            "ingest.concurrency" => self.ingest.concurrency = parse_positive(key, value)?,

            _ => return Err(anyhow!("Unknown configuration key: {}", key)),
        }
        Ok(())
    }

    /// List all configuration keys and their values
    pub fn list(&self) -> anyhow::Result<Vec<(String, String)>> {
        CONFIG_KEYS
            .iter()
            .map(|key| Ok((key.to_string(), self.get(key)?)))
            .collect()
    }
}

const CONFIG_KEYS: &[&str] = &[
    "graph_store.path",
    "vector_store.path",
    "vector_store.collection",
    "vector_store.text_dimensions",
    "vector_store.image_dimensions",
    "llm.base_url",
    "llm.completion_model",
    "llm.temperature",
    "llm.max_tokens",
    "llm.timeout_secs",
    "llm.api_key",
    "embedding.model",
    "embedding.dimensions",
    "retrieval.num_queries",
    "retrieval.top_k",
    "retrieval.rrf_k",
    "retrieval.text_boost",
    "retrieval.image_boost",
    "retrieval.concurrency",
    "retrieval.max_ancestor_depth",
    "ingest.concurrency",
];

fn parse_positive<T>(key: &str, value: &str) -> anyhow::Result<T>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    let parsed: T = value
        .parse()
        .map_err(|_| anyhow!("Invalid {} value: {}", key, value))?;
    match parsed.partial_cmp(&T::default()) {
        Some(Ordering::Greater) => Ok(parsed),
        _ => Err(anyhow!("{} must be positive", key)),
    }
}

fn parse_non_negative(key: &str, value: &str) -> anyhow::Result<f64> {
    let parsed: f64 = value
        .parse()
        .with_context(|| format!("Invalid {} value: {}", key, value))?;
    if !parsed.is_finite() || parsed < 0.0 {
        return Err(anyhow!("{} must be non-negative", key));
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();

        assert!(config.llm.api_key.is_none());
        assert_eq!(config.llm.completion_model, "gpt-4o");
        assert_eq!(config.embedding.model, "text-embedding-3-small");
        assert_eq!(config.vector_store.collection, "wikigraph");
        assert_eq!(config.vector_store.text_dimensions, 1536);
        assert_eq!(config.retrieval.num_queries, 4);
        assert_eq!(config.retrieval.rrf_k, 60.0);
        assert_eq!(config.retrieval.effective_concurrency(), 4);
        assert_eq!(config.ingest.concurrency, 8);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.set("retrieval.top_k", "5").unwrap();
        config.set("vector_store.collection", "squirrels").unwrap();
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.retrieval.top_k, 5);
        assert_eq!(loaded.vector_store.collection, "squirrels");
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.retrieval.top_k, 10);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[retrieval]\nnum_queries = 2\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.retrieval.num_queries, 2);
        assert_eq!(config.retrieval.text_boost, 1.5);
        assert_eq!(config.llm.completion_model, "gpt-4o");
    }

    #[test]
    fn test_api_key_in_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[llm]\napi_key = \"sk-secret\"\n").unwrap();

        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_api_key_never_serialized() {
        let mut config = Config::default();
        config.llm.api_key = Some("sk-secret".to_string());
        let contents = toml::to_string_pretty(&config).unwrap();
        assert!(!contents.contains("sk-secret"));
    }

    #[test]
    fn test_set_rejects_invalid_values() {
        let mut config = Config::default();
        assert!(config.set("llm.temperature", "3.0").is_err());
        assert!(config.set("retrieval.num_queries", "0").is_err());
        assert!(config.set("retrieval.rrf_k", "-1").is_err());
        assert!(config.set("retrieval.rrf_k", "0").is_err());
        assert!(config.set("retrieval.rrf_k", "NaN").is_err());
        assert!(config.set("retrieval.text_boost", "inf").is_err());
        assert!(config.set("llm.api_key", "sk-secret").is_err());
        assert!(config.set("unknown.key", "1").is_err());
    }

    #[test]
    fn test_zero_rrf_k_fails_validation() {
        let mut config = Config::default();
        config.retrieval.rrf_k = 0.0;
        assert!(config.validate().is_err());

        config.set("retrieval.rrf_k", "1").unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_dimension_mismatch_fails_validation() {
        let mut config = Config::default();
        config.set("embedding.dimensions", "512").unwrap();
        assert!(config.validate().is_err());

        config.set("vector_store.text_dimensions", "512").unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_list_covers_all_keys() {
        let config = Config::default();
        let entries = config.list().unwrap();
        assert_eq!(entries.len(), CONFIG_KEYS.len());
        assert!(entries.iter().any(|(k, v)| k == "retrieval.rrf_k" && v == "60"));
    }

    #[test]
    fn test_domain_conversions() {
        let mut config = Config::default();
        config.set("retrieval.concurrency", "2").unwrap();
        config.set("ingest.concurrency", "3").unwrap();

        let fusion = config.fusion_config();
        assert_eq!(fusion.concurrency, 2);
        assert_eq!(fusion.text_boost, 1.5);

        let ingest = config.ingest_config();
        assert_eq!(ingest.concurrency, 3);
        assert_eq!(ingest.collection, "wikigraph");
        assert_eq!(ingest.image_dimensions, 1024);
    }

    #[test]
    fn test_redact() {
        assert_eq!(redact("abc"), "***");
        assert_eq!(redact("sk-12345678"), "***5678");
    }
}
