
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::embeddings::chunking::ChunkingConfig;

pub const DEFAULT_EMBEDDING_DIMENSION: u32 = 768;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Root folder scanned by the ingestion run
    pub data_folder: PathBuf,
    pub gemini: GeminiConfig,
    pub pinecone: PineconeConfig,
    pub chunking: ChunkingConfig,
    pub tutor: TutorConfig,
    pub server: ServerConfig,
    pub http: HttpConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_folder: PathBuf::from("Data"),
            gemini: GeminiConfig::default(),
            pinecone: PineconeConfig::default(),
            chunking: ChunkingConfig::default(),
            tutor: TutorConfig::default(),
            server: ServerConfig::default(),
            http: HttpConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: String,
    pub embedding_model: String,
    pub chat_model: String,
    pub embedding_dimension: u32,
    pub batch_size: u32,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            embedding_model: "text-embedding-004".to_string(),
            chat_model: "gemini-2.5-flash".to_string(),
            embedding_dimension: DEFAULT_EMBEDDING_DIMENSION,
            batch_size: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PineconeConfig {
    pub api_key: String,
    pub index_name: String,
    pub control_url: String,
    pub api_version: String,
    pub metric: String,
    pub cloud: String,
    pub region: String,
    pub upsert_batch_size: u32,
    /// Seconds to wait for a freshly created index to report ready
    pub ready_timeout_secs: u64,
}

impl Default for PineconeConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            index_name: String::new(),
            control_url: "https://api.pinecone.io".to_string(),
            api_version: "2024-07".to_string(),
            metric: "cosine".to_string(),
            cloud: "aws".to_string(),
            region: "us-east-1".to_string(),
            upsert_batch_size: 100,
            ready_timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TutorConfig {
    /// Number of chunks retrieved per question
    pub top_k: usize,
    /// Conversation entries kept per session, oldest evicted first
    pub memory_entries: usize,
    /// Sessions kept in memory, least recently used evicted first
    pub max_sessions: usize,
}

impl Default for TutorConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            memory_entries: 20,
            max_sessions: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:5000".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    /// Total attempts per request; 1 disables retries
    pub retry_attempts: u32,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 60,
            retry_attempts: 1,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required setting: {0}")]
    MissingSetting(&'static str),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),
    #[error("Invalid bind address: {0}")]
    InvalidBindAddress(String),
    #[error("Invalid embedding dimension: {0} (must be between 1 and 4096)")]
    InvalidEmbeddingDimension(u32),
    #[error("Invalid batch size: {0} (must be between 1 and 1000)")]
    InvalidBatchSize(u32),
    #[error("Invalid chunk size: {0} (must be at least 1)")]
    InvalidChunkSize(usize),
    #[error("Chunk overlap ({0}) must be smaller than chunk size ({1})")]
    OverlapTooLarge(usize, usize),
    #[error("Invalid top_k: {0} (must be at least 1)")]
    InvalidTopK(usize),
    #[error("Invalid memory size: {0} (must hold at least one question and answer)")]
    InvalidMemorySize(usize),
    #[error("Invalid session limit: {0} (must be at least 1)")]
    InvalidSessionLimit(usize),
    #[error("Invalid retry attempts: {0} (must be between 1 and 10)")]
    InvalidRetryAttempts(u32),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

impl Config {
    /// Load configuration from the optional TOML file and the process environment.
    ///
    /// Environment variables win over file values. The file path comes from
    /// `config_file` or, failing that, `GURUJI_CONFIG`.
    #[inline]
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        Self::load_with(config_file, |key| std::env::var(key).ok())
    }

    /// Same as [`Config::load`] with an explicit variable lookup
    #[inline]
    pub fn load_with<F>(config_file: Option<&Path>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file = config_file
            .map(Path::to_path_buf)
            .or_else(|| lookup("GURUJI_CONFIG").map(PathBuf::from));

        let mut config = match file {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };

        config
            .apply_overrides(&lookup)
            .context("Invalid environment override")?;
        config
            .validate()
            .context("Configuration validation failed")?;

        Ok(config)
    }

    /// Parse a TOML configuration file without validating it
    #[inline]
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Reading configuration from {}", path.display());

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Apply the environment variables this application understands
    #[inline]
    pub fn apply_overrides<F>(&mut self, lookup: &F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("GOOGLE_API_KEY") {
            self.gemini.api_key = key;
        }
        if let Some(key) = lookup("PINECONE_API_KEY") {
            self.pinecone.api_key = key;
        }
        if let Some(name) = lookup("INDEX_NAME") {
            self.pinecone.index_name = name;
        }
        if let Some(folder) = lookup("DATA_FOLDER") {
            self.data_folder = PathBuf::from(folder);
        }
        if let Some(bind) = lookup("GURUJI_BIND") {
            self.server.bind = bind;
        }
        if let Some(value) = parse_override(lookup, "GURUJI_TOP_K")? {
            self.tutor.top_k = value;
        }
        if let Some(value) = parse_override(lookup, "GURUJI_CHUNK_SIZE")? {
            self.chunking.chunk_size = value;
        }
        if let Some(value) = parse_override(lookup, "GURUJI_CHUNK_OVERLAP")? {
            self.chunking.chunk_overlap = value;
        }
        if let Some(value) = parse_override(lookup, "GURUJI_MEMORY_TURNS")? {
            let turns: usize = value;
            self.tutor.memory_entries = turns.saturating_mul(2);
        }
        if let Some(value) = parse_override(lookup, "GURUJI_RETRY_ATTEMPTS")? {
            self.http.retry_attempts = value;
        }
        Ok(())
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.gemini.validate()?;
        self.pinecone.validate()?;
        self.validate_chunking_config()?;
        self.validate_tutor_config()?;
        self.server.socket_addr()?;

        if !(1..=10).contains(&self.http.retry_attempts) {
            return Err(ConfigError::InvalidRetryAttempts(self.http.retry_attempts));
        }

        Ok(())
    }

    fn validate_chunking_config(&self) -> Result<(), ConfigError> {
        let config = &self.chunking;

        if config.chunk_size == 0 {
            return Err(ConfigError::InvalidChunkSize(config.chunk_size));
        }

        if config.chunk_overlap >= config.chunk_size {
            return Err(ConfigError::OverlapTooLarge(
                config.chunk_overlap,
                config.chunk_size,
            ));
        }

        Ok(())
    }

    fn validate_tutor_config(&self) -> Result<(), ConfigError> {
        let config = &self.tutor;

        if config.top_k == 0 {
            return Err(ConfigError::InvalidTopK(config.top_k));
        }

        if config.memory_entries < 2 {
            return Err(ConfigError::InvalidMemorySize(config.memory_entries));
        }

        if config.max_sessions == 0 {
            return Err(ConfigError::InvalidSessionLimit(config.max_sessions));
        }

        Ok(())
    }
}

impl GeminiConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::MissingSetting("GOOGLE_API_KEY"));
        }

        self.base_url()?;

        if self.embedding_model.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "embedding_model",
                self.embedding_model.clone(),
            ));
        }

        if self.chat_model.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "chat_model",
                self.chat_model.clone(),
            ));
        }

        if !(1..=4096).contains(&self.embedding_dimension) {
            return Err(ConfigError::InvalidEmbeddingDimension(
                self.embedding_dimension,
            ));
        }

        if self.batch_size == 0 || self.batch_size > 1000 {
            return Err(ConfigError::InvalidBatchSize(self.batch_size));
        }

        Ok(())
    }

    #[inline]
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.base_url).map_err(|_| ConfigError::InvalidUrl(self.base_url.clone()))
    }
}

impl PineconeConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::MissingSetting("PINECONE_API_KEY"));
        }

        if self.index_name.trim().is_empty() {
            return Err(ConfigError::MissingSetting("INDEX_NAME"));
        }

        self.control_url()?;

        if !matches!(self.metric.as_str(), "cosine" | "euclidean" | "dotproduct") {
            return Err(ConfigError::InvalidValue("metric", self.metric.clone()));
        }

        if self.upsert_batch_size == 0 || self.upsert_batch_size > 1000 {
            return Err(ConfigError::InvalidBatchSize(self.upsert_batch_size));
        }

        Ok(())
    }

    #[inline]
    pub fn control_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.control_url)
            .map_err(|_| ConfigError::InvalidUrl(self.control_url.clone()))
    }
}

impl ServerConfig {
    #[inline]
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind
            .parse()
            .map_err(|_| ConfigError::InvalidBindAddress(self.bind.clone()))
    }
}

fn parse_override<F, T>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key, raw.clone()))
        })
        .transpose()
}
