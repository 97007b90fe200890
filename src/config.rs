//! Configuration loading and generation.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::embedding::EmbeddingBackend;
use crate::engine::format_b::FormatBOptions;
use crate::engine::normalize::NormalizeOptions;
use crate::models::report::PipelineMode;

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Enable debug logging to file
    pub debug: bool,

    /// Path to log directory
    pub log_path: PathBuf,

    pub normalize: NormalizeOptions,
    pub discovery: DiscoveryConfig,
    pub format_b: FormatBOptions,
    pub embedding: EmbeddingConfig,
    pub pipeline: PipelineConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            debug: false,
            log_path: default_log_path(),
            normalize: NormalizeOptions::default(),
            discovery: DiscoveryConfig::default(),
            format_b: FormatBOptions::default(),
            embedding: EmbeddingConfig::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

/// Which files are records and which parser reads them.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Extensions of keyed-section (Format A) files.
    pub format_a_extensions: Vec<String>,
    /// Only accept Format A files whose name contains this substring.
    pub format_a_name_contains: Option<String>,
    /// Extensions of before/after block (Format B) files.
    pub format_b_extensions: Vec<String>,
    /// Honour .gitignore/.ignore files and skip hidden entries.
    pub respect_ignore: bool,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            format_a_extensions: vec!["java".to_string()],
            format_a_name_contains: None,
            format_b_extensions: vec!["py".to_string()],
            respect_ignore: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Model behind the similarity scores.
    pub backend: EmbeddingBackend,
    /// Vector size of the built-in hashed embedder.
    pub dimensions: usize,
    /// Where model weights are cached (default: fastembed's cache directory).
    pub cache_dir: Option<PathBuf>,
    /// Print model download progress to stderr.
    pub show_download_progress: bool,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::default(),
            dimensions: 384,
            cache_dir: None,
            show_download_progress: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub mode: PipelineMode,
    /// Worker threads for parallel mode; 0 picks one less than the CPU count.
    pub workers: usize,
}

/// Default log path: ~/.config/comment-drift/logs
fn default_log_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("comment-drift")
        .join("logs")
}

/// Configuration service.
pub struct ConfigService;

impl ConfigService {
    /// Get the default configuration file path.
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("comment-drift")
            .join("config.toml")
    }

    /// Load configuration from file.
    ///
    /// If `path` is `None`, uses the default path.
    /// If the file doesn't exist, returns default configuration.
    pub fn load(path: Option<&Path>) -> Result<Config> {
        let path = path.map(PathBuf::from).unwrap_or_else(Self::default_path);
        let config_dir = path.parent();

        if !path.exists() {
            let mut config = Config::default();
            if let Some(dir) = config_dir {
                config.log_path = dir.join("logs");
            }
            return Ok(config);
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        // If log_path was not explicitly set, use config file's directory/logs
        if config.log_path == default_log_path()
            && let Some(dir) = config_dir
        {
            config.log_path = dir.join("logs");
        }

        Ok(config)
    }

    /// Generate default configuration file at the default path.
    pub fn generate_default() -> Result<()> {
        Self::generate_at(&Self::default_path())
    }

    /// Generate default configuration file at the specified path.
    pub fn generate_at(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = Self::default_config_content();
        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Generate default configuration content with comments.
    fn default_config_content() -> String {
        r##"# comment-drift configuration file

# Enable debug logging to file (default: false)
debug = false

# Path to log directory (default: ~/.config/comment-drift/logs)
# log_path = "~/.config/comment-drift/logs"

[normalize]
# Lowercase normalized text
lowercase = false
# Replace punctuation with spaces
strip_punctuation = false
# Keep acronym runs together (parseHTTPResponse -> parse HTTP Response)
keep_acronyms = false

[discovery]
# Keyed-section records (oldComment:/oldCode:/newComment:/newCode:/label:)
format_a_extensions = ["java"]
# Only accept Format A files whose name contains this substring
# format_a_name_contains = "122"
# Before/after block records (old ---- new ==== metadata)
format_b_extensions = ["py"]
# Honour .gitignore and skip hidden files
respect_ignore = false

[format_b]
# Comment line leader
comment_leader = "#"

[embedding]
# "minilm" (all-MiniLM-L6-v2, needs the `semantic` build feature) or "hashed"
# Default: "minilm" when built with `semantic`, otherwise "hashed"
# backend = "minilm"
# Vector size of the built-in hashed embedder
dimensions = 384
# Model weight cache directory (default: fastembed's cache)
# cache_dir = "~/.cache/comment-drift/models"
# Print model download progress to stderr
show_download_progress = false

[pipeline]
# "parallel" or "streaming"
mode = "parallel"
# Worker threads for parallel mode (0 = CPU count - 1)
workers = 0
"##
        .to_string()
    }
}
