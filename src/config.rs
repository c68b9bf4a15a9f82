use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{AppError, AppResult};
use crate::index::DistanceMetric;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Directory holding the raw CSV sources and the built corpus
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Directory holding the persisted vector index
    #[serde(default = "default_index_dir")]
    pub index_dir: PathBuf,

    /// Packaged index archive fetched when the local index is absent
    #[serde(default)]
    pub index_archive_url: Option<String>,

    /// OpenAI API key, only required by operations that embed text
    #[serde(default)]
    pub openai_api_key: Option<String>,

    /// Embeddings API base URL
    #[serde(default = "default_embedding_api_url")]
    pub embedding_api_url: String,

    /// Embedding model name
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Documents per embedding request during index build
    #[serde(default = "default_embedding_batch_size")]
    pub embedding_batch_size: usize,

    /// Embedding requests in flight during index build
    #[serde(default = "default_embedding_concurrency")]
    pub embedding_concurrency: usize,

    /// Timeout for a single embedding request
    #[serde(default = "default_embedding_timeout_secs")]
    pub embedding_timeout_secs: u64,

    /// Distance used when building a new index
    #[serde(default)]
    pub distance_metric: DistanceMetric,

    /// Candidates returned when a request does not specify `k`
    #[serde(default = "default_k")]
    pub default_k: usize,

    /// Redis connection URL; result caching is disabled when unset
    #[serde(default)]
    pub redis_url: Option<String>,

    /// Lifetime of cached retrieval results in seconds
    #[serde(default = "default_retrieval_cache_ttl")]
    pub retrieval_cache_ttl: u64,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_index_dir() -> PathBuf {
    PathBuf::from("data/vector_index")
}

fn default_embedding_api_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-large".to_string()
}

fn default_embedding_batch_size() -> usize {
    256
}

fn default_embedding_concurrency() -> usize {
    4
}

fn default_embedding_timeout_secs() -> u64 {
    30
}

fn default_k() -> usize {
    8
}

fn default_retrieval_cache_ttl() -> u64 {
    3600
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    /// Returns the embedding API key or a fatal initialization error
    pub fn require_api_key(&self) -> AppResult<&str> {
        self.openai_api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| AppError::Initialization("OPENAI_API_KEY is not set".to_string()))
    }

    pub fn embedding_timeout(&self) -> Duration {
        Duration::from_secs(self.embedding_timeout_secs)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
