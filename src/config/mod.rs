//! Configuration management for trenditools
//!
//! Handles loading, saving, and validating configuration from TOML files.

mod defaults;

pub use defaults::*;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Public base URL of the deployment (used for screenshot URL rewriting)
    #[serde(default = "default_site_base_url")]
    pub site_base_url: String,

    /// Search aggregator configuration
    #[serde(default)]
    pub search: SearchConfig,

    /// Extraction API configuration
    #[serde(default)]
    pub extract: ExtractConfig,

    /// Screenshot capture configuration
    #[serde(default)]
    pub capture: CaptureConfig,

    /// Object storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Batch enrichment pipeline configuration
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Chat assistant configuration
    #[serde(default)]
    pub chat: ChatConfig,

    /// Paths configuration (internal, not user-editable)
    #[serde(skip)]
    pub paths: PathsConfig,
}

/// Search aggregator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Per-field result cap for the three field searches.
    ///
    /// Queries matching more than 3x this many distinct tools cannot reach
    /// the overflow through pagination; raise the cap instead.
    #[serde(default = "default_search_fetch_cap")]
    pub fetch_cap: usize,

    /// Default page size
    #[serde(default = "default_search_page_size")]
    pub page_size: usize,

    /// Number of featured tools returned
    #[serde(default = "default_featured_limit")]
    pub featured_limit: usize,
}

/// Extraction API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractConfig {
    /// Base URL of the extraction API
    #[serde(default = "default_extract_api_base")]
    pub api_base: String,

    /// Environment variable holding the API key
    #[serde(default = "default_extract_api_key_env")]
    pub api_key_env: String,

    /// Poll interval for asynchronous extraction jobs (milliseconds)
    #[serde(default = "default_extract_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Maximum poll attempts before giving up on a job
    #[serde(default = "default_extract_max_poll_attempts")]
    pub max_poll_attempts: u32,
}

/// Screenshot capture configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Viewport width in pixels
    #[serde(default = "default_capture_viewport_width")]
    pub viewport_width: u32,

    /// Viewport height in pixels
    #[serde(default = "default_capture_viewport_height")]
    pub viewport_height: u32,

    /// Navigation timeout (milliseconds)
    #[serde(default = "default_capture_nav_timeout_ms")]
    pub nav_timeout_ms: u64,

    /// Wait after load for client-rendered content (milliseconds)
    #[serde(default = "default_capture_settle_ms")]
    pub settle_ms: u64,

    /// Disable browser sandbox (required in some Docker/CI environments)
    #[serde(default)]
    pub no_sandbox: bool,
}

/// Object storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Base URL of the storage API (upload-url endpoint)
    #[serde(default = "default_storage_base_url")]
    pub base_url: String,
}

/// Batch enrichment pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Number of URLs per batch
    #[serde(default = "default_pipeline_batch_size")]
    pub batch_size: usize,

    /// Delay between individual requests (milliseconds)
    #[serde(default = "default_pipeline_request_delay_ms")]
    pub request_delay_ms: u64,

    /// Delay between batches (milliseconds)
    #[serde(default = "default_pipeline_batch_delay_ms")]
    pub batch_delay_ms: u64,

    /// Maximum attempts per URL
    #[serde(default = "default_pipeline_max_retries")]
    pub max_retries: u32,

    /// Save progress every N processed items
    #[serde(default = "default_pipeline_checkpoint_interval")]
    pub checkpoint_interval: usize,
}

/// Chat assistant configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Base URL of an OpenAI-compatible chat-completions API
    #[serde(default = "default_chat_api_base")]
    pub api_base: String,

    /// Environment variable holding the API key
    #[serde(default = "default_chat_api_key_env")]
    pub api_key_env: String,

    /// Model identifier
    #[serde(default = "default_chat_model")]
    pub model: String,

    /// Number of tools recommended per turn
    #[serde(default = "default_chat_recommendation_limit")]
    pub recommendation_limit: usize,
}

/// Internal paths configuration
#[derive(Debug, Clone, Default)]
pub struct PathsConfig {
    /// Base directory for trenditools data
    pub base_dir: PathBuf,

    /// Path to config file
    pub config_file: PathBuf,

    /// Path to SQLite database
    pub db_file: PathBuf,

    /// Directory for captured screenshots
    pub screenshot_dir: PathBuf,

    /// Path to the pipeline progress ledger
    pub progress_file: PathBuf,

    /// Path to the pipeline results report
    pub results_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            site_base_url: default_site_base_url(),
            search: SearchConfig::default(),
            extract: ExtractConfig::default(),
            capture: CaptureConfig::default(),
            storage: StorageConfig::default(),
            pipeline: PipelineConfig::default(),
            chat: ChatConfig::default(),
            paths: PathsConfig::default(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            fetch_cap: default_search_fetch_cap(),
            page_size: default_search_page_size(),
            featured_limit: default_featured_limit(),
        }
    }
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            api_base: default_extract_api_base(),
            api_key_env: default_extract_api_key_env(),
            poll_interval_ms: default_extract_poll_interval_ms(),
            max_poll_attempts: default_extract_max_poll_attempts(),
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            viewport_width: default_capture_viewport_width(),
            viewport_height: default_capture_viewport_height(),
            nav_timeout_ms: default_capture_nav_timeout_ms(),
            settle_ms: default_capture_settle_ms(),
            no_sandbox: false,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_url: default_storage_base_url(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: default_pipeline_batch_size(),
            request_delay_ms: default_pipeline_request_delay_ms(),
            batch_delay_ms: default_pipeline_batch_delay_ms(),
            max_retries: default_pipeline_max_retries(),
            checkpoint_interval: default_pipeline_checkpoint_interval(),
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            api_base: default_chat_api_base(),
            api_key_env: default_chat_api_key_env(),
            model: default_chat_model(),
            recommendation_limit: default_chat_recommendation_limit(),
        }
    }
}

impl Config {
    /// Get the default base directory for trenditools (~/.trenditools)
    pub fn default_base_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".trenditools")
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        Self::default_base_dir().join("config.toml")
    }

    /// Point all derived paths at a base directory
    pub fn init_at(&mut self, base_dir: Option<PathBuf>) {
        let base = base_dir.unwrap_or_else(Self::default_base_dir);
        self.paths = PathsConfig {
            config_file: base.join("config.toml"),
            db_file: base.join("catalog.db"),
            screenshot_dir: base.join("screenshots"),
            progress_file: base.join("processing-progress.json"),
            results_file: base.join("processing-results.json"),
            base_dir: base,
        };
    }

    /// Load configuration from a specific file path
    pub fn load(config_path: &Path) -> Result<Self> {
        debug!("Loading config from {:?}", config_path);

        if !config_path.exists() {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                config_path.display()
            )));
        }

        let content = std::fs::read_to_string(config_path)?;
        let mut config: Config = toml::from_str(&content)?;

        let base = config_path.parent().unwrap_or(Path::new(".")).to_path_buf();
        config.paths = PathsConfig {
            config_file: config_path.to_path_buf(),
            db_file: base.join("catalog.db"),
            screenshot_dir: base.join("screenshots"),
            progress_file: base.join("processing-progress.json"),
            results_file: base.join("processing-results.json"),
            base_dir: base,
        };

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.paths.config_file.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&self.paths.config_file, content)?;
        info!("Saved config to {:?}", self.paths.config_file);
        Ok(())
    }

    /// Get the extraction API key from environment
    pub fn extract_api_key(&self) -> Option<String> {
        std::env::var(&self.extract.api_key_env).ok()
    }

    /// Get the chat assistant API key from environment
    pub fn chat_api_key(&self) -> Option<String> {
        std::env::var(&self.chat.api_key_env).ok()
    }

    /// Check if trenditools is initialized (config and DB exist)
    pub fn is_initialized(&self) -> bool {
        self.paths.config_file.exists() && self.paths.db_file.exists()
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.search.fetch_cap == 0 {
            return Err(Error::Config(
                "search.fetch_cap must be positive".to_string(),
            ));
        }

        if self.search.page_size == 0 {
            return Err(Error::Config(
                "search.page_size must be positive".to_string(),
            ));
        }

        if self.pipeline.batch_size == 0 {
            return Err(Error::Config(
                "pipeline.batch_size must be positive".to_string(),
            ));
        }

        if self.pipeline.checkpoint_interval == 0 {
            return Err(Error::Config(
                "pipeline.checkpoint_interval must be positive".to_string(),
            ));
        }

        if self.extract.max_poll_attempts == 0 {
            return Err(Error::Config(
                "extract.max_poll_attempts must be positive".to_string(),
            ));
        }

        if self.site_base_url.ends_with('/') {
            return Err(Error::Config(
                "site_base_url must not end with a slash".to_string(),
            ));
        }

        Ok(())
    }
}
