use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::pipeline::batch::{ExtractionConfig, ExtractionError, WindowPolicy};
use crate::pipeline::oracle::{GenerationParams, PromptStyle};
use crate::pipeline::preamble::PreambleConfig;
use crate::pipeline::segmenter::SegmenterConfig;

/// Application-level constants
pub const APP_NAME: &str = "flashnote";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "FLASHNOTE_CONFIG";

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "flashnote=info,warn"
}

/// Per-user config directory (`~/.config/flashnote` on Linux).
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_NAME))
}

pub fn default_config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.json"))
}

/// User-facing configuration. Every field is optional in the JSON file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlashnoteConfig {
    pub ollama_url: String,
    pub model_name: String,
    /// Per-call deadline for the oracle.
    pub timeout_secs: u64,
    pub target_count: Option<usize>,
    pub window_size: usize,
    pub window_policy: WindowPolicy,
    /// Output limit for one flashcard.
    pub max_output_tokens: u32,
    /// Output limit for one seed window.
    pub seed_max_output_tokens: u32,
    pub temperature: f32,
    pub top_k: Option<u32>,
    pub top_p: Option<f32>,
    pub prompt_style: PromptStyle,
    pub max_concurrency: usize,
    pub segmenter: SegmenterConfig,
    pub preamble: PreambleConfig,
}

impl Default for FlashnoteConfig {
    fn default() -> Self {
        let params = GenerationParams::default();
        let extraction = ExtractionConfig::default();
        Self {
            ollama_url: "http://localhost:11434".to_string(),
            model_name: "llama3.2:3b".to_string(),
            timeout_secs: 120,
            target_count: extraction.target_count,
            window_size: extraction.window_size,
            window_policy: extraction.window_policy,
            max_output_tokens: params.max_output_tokens,
            seed_max_output_tokens: extraction.seed_max_output_tokens,
            temperature: params.temperature,
            top_k: params.top_k,
            top_p: params.top_p,
            prompt_style: extraction.prompt_style,
            max_concurrency: extraction.max_concurrency,
            segmenter: SegmenterConfig::default(),
            preamble: PreambleConfig::default(),
        }
    }
}

impl FlashnoteConfig {
    /// Read and validate a JSON config file.
    pub fn load(path: &Path) -> Result<Self, ExtractionError> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// `FLASHNOTE_CONFIG` if set, else the default path if it exists, else defaults.
    pub fn resolve() -> Result<Self, ExtractionError> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            tracing::info!(path = %path, "Loading config from {CONFIG_ENV}");
            return Self::load(Path::new(&path));
        }
        match default_config_path() {
            Some(path) if path.exists() => {
                tracing::info!(path = %path.display(), "Loading config");
                Self::load(&path)
            }
            _ => {
                tracing::debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn validate(&self) -> Result<(), ExtractionError> {
        if self.ollama_url.trim().is_empty() {
            return Err(ExtractionError::Config("ollama_url must not be empty".into()));
        }
        if self.model_name.trim().is_empty() {
            return Err(ExtractionError::Config("model_name must not be empty".into()));
        }
        if self.timeout_secs == 0 {
            return Err(ExtractionError::Config("timeout_secs must be at least 1".into()));
        }
        if self.segmenter.rules.is_empty() {
            tracing::warn!("No segmentation marker rules configured; only blank lines split units");
        }
        self.extraction_config().validate()
    }

    /// The subset the runners consume.
    pub fn extraction_config(&self) -> ExtractionConfig {
        ExtractionConfig {
            prompt_style: self.prompt_style,
            params: GenerationParams {
                max_output_tokens: self.max_output_tokens,
                temperature: self.temperature,
                top_k: self.top_k,
                top_p: self.top_p,
            },
            target_count: self.target_count,
            window_size: self.window_size,
            seed_max_output_tokens: self.seed_max_output_tokens,
            window_policy: self.window_policy,
            max_concurrency: self.max_concurrency,
            call_timeout_ms: self.timeout_secs.saturating_mul(1000),
        }
    }
}
