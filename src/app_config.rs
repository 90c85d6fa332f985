use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::language_utils;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Source language code (ISO)
    pub source_language: String,

    /// Target language code (ISO)
    pub target_language: String,

    /// Translation config
    pub translation: TranslationConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Cache directory for pipeline state and translation memory
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
}

/// Settings for the translation endpoint and the batching that feeds it
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationConfig {
    // @field: OpenAI-compatible endpoint base URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    // @field: API key, may stay empty for local servers
    #[serde(default = "String::new")]
    pub api_key: String,

    // @field: Model name
    #[serde(default = "default_model")]
    pub model: String,

    // @field: Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    // @field: System prompt template ({source}/{target} are substituted)
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    // @field: Soft character budget per translation group
    #[serde(default = "default_max_group_chars")]
    pub max_group_chars: usize,

    // @field: Number of earlier groups fed back as conversation context
    #[serde(default = "default_context_window")]
    pub context_window: usize,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            api_key: String::new(),
            model: default_model(),
            temperature: default_temperature(),
            system_prompt: default_system_prompt(),
            max_group_chars: default_max_group_chars(),
            context_window: default_context_window(),
        }
    }
}

fn default_endpoint() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_group_chars() -> usize {
    2000
}

fn default_context_window() -> usize {
    2
}

fn default_system_prompt() -> String {
    "You are an expert multilingual translator. Translate all {source} content in the \
     following text into {target}. Content in other languages (code, proper nouns, \
     mixed-language fragments) stays untranslated. Preserve the original formatting \
     exactly: numbering, punctuation, line breaks, blank lines and every special marker \
     character, keeping the overall structure unchanged. Output only the translation, \
     with no explanations, greetings or extra content, and never add to or remove from \
     the original structure."
        .to_string()
}

/// Log level for the application
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Only errors
    Error,
    /// Errors and warnings
    Warn,
    /// Normal operation
    #[default]
    Info,
    /// Diagnostic detail
    Debug,
    /// Everything
    Trace,
}

impl LogLevel {
    /// Convert to a log crate level filter
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_language: "en".to_string(),
            target_language: "zh".to_string(),
            translation: TranslationConfig::default(),
            log_level: LogLevel::default(),
            cache_dir: None,
        }
    }
}

impl Config {
    /// Load a configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to open config file: {:?}", path.as_ref()))?;
        let config: Config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path.as_ref()))?;
        Ok(config)
    }

    /// Write the configuration to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path.as_ref(), json)
            .with_context(|| format!("Failed to write config file: {:?}", path.as_ref()))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        language_utils::validate_language_code(&self.source_language)
            .context("Invalid source language")?;
        language_utils::validate_language_code(&self.target_language)
            .context("Invalid target language")?;

        if language_utils::language_codes_match(&self.source_language, &self.target_language) {
            return Err(anyhow!(
                "Source and target language are the same: {}",
                self.source_language
            ));
        }

        if self.translation.endpoint.is_empty() {
            return Err(anyhow!("Translation endpoint cannot be empty"));
        }
        url::Url::parse(&self.translation.endpoint)
            .map_err(|e| anyhow!("Invalid endpoint URL: {}", e))?;

        if self.translation.max_group_chars < 100 {
            return Err(anyhow!(
                "max_group_chars must be at least 100, got {}",
                self.translation.max_group_chars
            ));
        }

        if !(0.0..=2.0).contains(&self.translation.temperature) {
            return Err(anyhow!(
                "Temperature must be between 0.0 and 2.0, got {}",
                self.translation.temperature
            ));
        }

        Ok(())
    }

    /// System prompt with language names substituted in
    pub fn resolved_system_prompt(&self) -> String {
        let source = language_utils::get_language_name(&self.source_language)
            .unwrap_or_else(|_| self.source_language.clone());
        let target = language_utils::get_language_name(&self.target_language)
            .unwrap_or_else(|_| self.target_language.clone());
        self.translation
            .system_prompt
            .replace("{source}", &source)
            .replace("{target}", &target)
    }

    /// Cache directory, falling back to the platform cache location
    pub fn effective_cache_dir(&self) -> PathBuf {
        self.cache_dir.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("yadtwai")
        })
    }
}
