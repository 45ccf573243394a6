use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::retrieval;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("apercu")
        .join("apercu.db")
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LlmProviderType {
    #[default]
    LmStudio,
    OpenAI,
    Anthropic,
    Ollama,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LlmConfig {
    #[serde(default)]
    pub provider: LlmProviderType,

    #[serde(default = "default_llm_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_llm_model")]
    pub model: String,

    #[serde(default)]
    pub api_key: Option<String>,
}

fn default_llm_endpoint() -> String {
    "http://127.0.0.1:1234/v1".to_string()
}

fn default_llm_model() -> String {
    "gemma-3-4b".to_string()
}

/// Retrieval and citation policy.
///
/// The defaults are the canonical policy constants; they are configuration
/// so an operator can tune them per deployment, never per call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// How many nearest reference profiles to rank before sampling.
    #[serde(default = "default_top_k_profiles")]
    pub top_k_profiles: usize,

    /// Maximum distinct reference images cited per analysis.
    #[serde(default = "default_max_image_citations")]
    pub max_image_citations: usize,

    /// Maximum distinct book passages cited per analysis.
    #[serde(default = "default_max_quote_citations")]
    pub max_quote_citations: usize,

    /// A dimension scoring at or below this is considered weak and
    /// triggers corrective passage retrieval.
    #[serde(default = "default_weak_score_threshold")]
    pub weak_score_threshold: f64,
}

fn default_top_k_profiles() -> usize {
    retrieval::DEFAULT_TOP_K_PROFILES
}

fn default_max_image_citations() -> usize {
    retrieval::MAX_IMAGE_CITATIONS
}

fn default_max_quote_citations() -> usize {
    retrieval::MAX_QUOTE_CITATIONS
}

fn default_weak_score_threshold() -> f64 {
    retrieval::WEAK_SCORE_THRESHOLD
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k_profiles: default_top_k_profiles(),
            max_image_citations: default_max_image_citations(),
            max_quote_citations: default_max_quote_citations(),
            weak_score_threshold: default_weak_score_threshold(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            llm: LlmConfig::default(),
            retrieval: RetrievalConfig::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            // Create default config
            let config = Config::default();
            config.save()?;
            Ok(config)
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path();

        // Ensure parent directory exists
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;

        Ok(())
    }

    fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("apercu")
            .join("config.toml")
    }
}
