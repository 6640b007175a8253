use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::preset::PresetKind;
use crate::util::SecretString;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
}

/// Where presets are read from and how catalog entries are addressed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Preset directories, in catalog order
    #[serde(default = "default_sources")]
    pub sources: Vec<SourceConfig>,

    /// Catalog output file, relative to the root
    #[serde(default = "default_output")]
    pub output: String,

    /// Raw-content URL of the repository hosting the presets
    #[serde(default = "default_remote_base_url")]
    pub remote_base_url: String,

    /// Branch name used in `rawPath` and `relativePath`
    #[serde(default = "default_branch")]
    pub branch: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceConfig {
    pub dir: String,
    pub kind: PresetKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Local cache file, relative to the root
    #[serde(default = "default_cache_path")]
    pub path: String,

    /// Remote copies of the cache, tried in order when the local file is unusable
    #[serde(default = "default_fallback_urls")]
    pub fallback_urls: Vec<String>,

    /// Drop entries whose preset no longer exists when the run finishes
    #[serde(default)]
    pub prune_stale: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_base_url_env")]
    pub base_url_env: String,

    #[serde(default = "default_model_env")]
    pub model_env: String,

    /// Model used when the model variable is unset
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Total tries per preset, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,

    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,

    /// Variable that marks an unattended run (e.g. CI)
    #[serde(default = "default_automated_env")]
    pub automated_env: String,
}

/// Credentials and endpoint resolved from the environment.
#[derive(Debug, Clone)]
pub struct ResolvedLlm {
    pub api_key: SecretString,
    pub base_url: String,
    pub model: String,
}

fn default_sources() -> Vec<SourceConfig> {
    vec![
        SourceConfig {
            dir: "presets/chatluna".to_string(),
            kind: PresetKind::Main,
        },
        SourceConfig {
            dir: "presets/chatluna-character".to_string(),
            kind: PresetKind::Character,
        },
    ]
}

fn default_output() -> String {
    "presets.json".to_string()
}

fn default_remote_base_url() -> String {
    "https://raw.githubusercontent.com/ChatLunaLab/awesome-chatluna-presets".to_string()
}

fn default_branch() -> String {
    "main".to_string()
}

fn default_cache_path() -> String {
    "cache-presets.json".to_string()
}

fn default_fallback_urls() -> Vec<String> {
    vec![
        "https://raw.githubusercontent.com/ChatLunaLab/awesome-chatluna-presets/refs/heads/preset/cache-presets.json".to_string(),
        "https://raw.githubusercontent.com/ChatLunaLab/awesome-chatluna-presets/refs/heads/main/cache-presets.json".to_string(),
    ]
}

fn default_api_key_env() -> String {
    "API_KEY".to_string()
}

fn default_base_url_env() -> String {
    "BASE_URL".to_string()
}

fn default_model_env() -> String {
    "MODEL".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_temperature() -> f32 {
    1.2
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_max_attempts() -> usize {
    3
}

fn default_requests_per_minute() -> u32 {
    15
}

fn default_automated_env() -> String {
    "GITHUB_ACTIONS".to_string()
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            sources: default_sources(),
            output: default_output(),
            remote_base_url: default_remote_base_url(),
            branch: default_branch(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: default_cache_path(),
            fallback_urls: default_fallback_urls(),
            prune_stale: false,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            base_url_env: default_base_url_env(),
            model_env: default_model_env(),
            model: default_model(),
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            requests_per_minute: default_requests_per_minute(),
            automated_env: default_automated_env(),
        }
    }
}

impl LlmConfig {
    /// Resolve key, base URL and model from the environment.
    /// Returns `None` when the key or base URL is missing or empty.
    pub fn resolve(&self) -> Option<ResolvedLlm> {
        let api_key = non_empty_var(&self.api_key_env)?;
        let base_url = non_empty_var(&self.base_url_env)?;
        let model = non_empty_var(&self.model_env).unwrap_or_else(|| self.model.clone());

        Some(ResolvedLlm {
            api_key: api_key.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
        })
    }
}

impl GenerationConfig {
    /// True when running unattended; cache entries are then trusted without
    /// comparing fingerprints.
    pub fn is_automated(&self) -> bool {
        env::var(&self.automated_env)
            .map(|v| v == "true")
            .unwrap_or(false)
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    /// Load configuration from an explicit path, the root directory, the user
    /// config directory, or fall back to defaults (in that order).
    pub fn load_with_path(root: &Path, path: Option<String>) -> Result<Self> {
        if let Some(config_path) = path {
            debug!("Loading config from explicit path: {}", config_path);
            return Self::load_from_path(&config_path)
                .with_context(|| format!("Failed to load config from {}", config_path));
        }

        let repo_config = root.join("preset-index.toml");
        if repo_config.exists() {
            debug!("Loading config from {}", repo_config.display());
            return Self::load_from_path(&repo_config)
                .with_context(|| format!("Failed to load config from {}", repo_config.display()));
        }

        if let Some(config_dir) = dirs::config_dir() {
            let config_path = config_dir.join("preset-index").join("config.toml");
            if let Ok(config) = Self::load_from_path(&config_path) {
                debug!("Loaded config from {:?}", config_path);
                return Ok(config);
            }
        }

        debug!("Using default config");
        Ok(Self::default())
    }

    fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}
