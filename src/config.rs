use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

/// Filesystem locations the service reads from and writes to.
#[derive(Debug, Clone)]
pub struct AppPaths {
    pub data_dir: PathBuf,
    pub log_dir: PathBuf,
}

impl AppPaths {
    pub fn new(config: &AppConfig) -> Self {
        let data_dir = env::var("CARDSENSE_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config.data_dir.clone());
        let log_dir = env::var("CARDSENSE_LOG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config.log_dir.clone());

        let _ = fs::create_dir_all(&log_dir);

        AppPaths { data_dir, log_dir }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub log_dir: PathBuf,
    pub server: ServerConfig,
    pub provider: ProviderConfig,
    pub retrieval: RetrievalConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Base URL of an OpenAI-compatible endpoint.
    pub base_url: String,
    pub chat_model: String,
    pub embedding_model: String,
    /// Env var holding the bearer token, if the endpoint needs one.
    pub api_key_env: Option<String>,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Default number of chunks returned by unscoped and card-scoped search.
    pub top_k: usize,
    /// Minimum similarity for a chunk to count as relevant in unscoped search.
    pub threshold: f32,
    /// Per-card chunk budget when comparing cards.
    pub compare_top_k: usize,
    /// Max in-flight embedding calls during index build.
    pub embed_concurrency: usize,
    /// Max characters of chunk text returned to callers in source snippets.
    pub snippet_chars: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data/cards"),
            log_dir: PathBuf::from("logs"),
            server: ServerConfig::default(),
            provider: ProviderConfig::default(),
            retrieval: RetrievalConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 8787 }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:1234".to_string(),
            chat_model: "local-chat".to_string(),
            embedding_model: "local-embedding".to_string(),
            api_key_env: None,
            request_timeout_secs: 30,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            threshold: 0.5,
            compare_top_k: 3,
            embed_concurrency: 4,
            snippet_chars: 240,
        }
    }
}

impl AppConfig {
    /// Loads the config file, falling back to defaults when none exists.
    /// A present but malformed file is a startup error, not a silent default.
    pub fn load() -> anyhow::Result<Self> {
        let path = config_path();
        if !path.exists() {
            return Ok(AppConfig::default());
        }
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: AppConfig = toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }
}

fn config_path() -> PathBuf {
    if let Ok(path) = env::var("CARDSENSE_CONFIG_PATH") {
        return PathBuf::from(path);
    }
    PathBuf::from("config.toml")
}
