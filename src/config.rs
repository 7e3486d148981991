//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.newslyzer.toml` files.

use crate::models::StageKind;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Analysis service settings.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Display settings.
    #[serde(default)]
    pub display: DisplayConfig,

    /// Identity settings.
    #[serde(default)]
    pub identity: IdentityConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default output file path.
    #[serde(default = "default_output")]
    pub output: String,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            verbose: false,
        }
    }
}

fn default_output() -> String {
    "newslyzer_report.md".to_string()
}

/// Analysis service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Base URL of the analysis service.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Per-stage request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Endpoint path for the image-forensics stage.
    #[serde(default = "default_image_forensics_path")]
    pub image_forensics_path: String,

    /// Endpoint path for the summary stage.
    #[serde(default = "default_summary_path")]
    pub summary_path: String,

    /// Endpoint path for the sentiment stage.
    #[serde(default = "default_sentiment_path")]
    pub sentiment_path: String,

    /// Endpoint path for the bias stage.
    #[serde(default = "default_bias_path")]
    pub bias_path: String,

    /// Endpoint path for the related-news stage.
    #[serde(default = "default_related_path")]
    pub related_path: String,

    /// Endpoint path for single-question answering.
    #[serde(default = "default_question_path")]
    pub question_path: String,

    /// Endpoint path for generated reader questions.
    #[serde(default = "default_common_questions_path")]
    pub common_questions_path: String,

    /// Endpoint path for archiving articles.
    #[serde(default = "default_archive_path")]
    pub archive_path: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            timeout_seconds: default_timeout(),
            image_forensics_path: default_image_forensics_path(),
            summary_path: default_summary_path(),
            sentiment_path: default_sentiment_path(),
            bias_path: default_bias_path(),
            related_path: default_related_path(),
            question_path: default_question_path(),
            common_questions_path: default_common_questions_path(),
            archive_path: default_archive_path(),
        }
    }
}

impl ServiceConfig {
    /// The configured endpoint path for a pipeline stage.
    pub fn path_for(&self, kind: StageKind) -> &str {
        match kind {
            StageKind::ImageForensics => &self.image_forensics_path,
            StageKind::Summary => &self.summary_path,
            StageKind::Sentiment => &self.sentiment_path,
            StageKind::Bias => &self.bias_path,
            StageKind::RelatedNews => &self.related_path,
        }
    }
}

fn default_api_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_image_forensics_path() -> String {
    StageKind::ImageForensics.default_path().to_string()
}

fn default_summary_path() -> String {
    StageKind::Summary.default_path().to_string()
}

fn default_sentiment_path() -> String {
    StageKind::Sentiment.default_path().to_string()
}

fn default_bias_path() -> String {
    StageKind::Bias.default_path().to_string()
}

fn default_related_path() -> String {
    StageKind::RelatedNews.default_path().to_string()
}

fn default_question_path() -> String {
    "/question".to_string()
}

fn default_common_questions_path() -> String {
    "/common-questions".to_string()
}

fn default_archive_path() -> String {
    "/articles".to_string()
}

/// Report display settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Maximum star glyphs for the sentiment rating.
    ///
    /// The raw score is unbounded on the wire; this cap is an explicit
    /// display policy.
    #[serde(default = "default_max_stars")]
    pub max_stars: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            max_stars: default_max_stars(),
        }
    }
}

fn default_max_stars() -> usize {
    5
}

/// Acting-user identity settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// User identity used for archiving articles.
    #[serde(default)]
    pub user: Option<String>,
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(".newslyzer.toml");

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// This method only overrides config when CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        // Service base URL always comes from CLI (it carries a default).
        self.service.api_url = args.api_url.clone();

        // Timeout - only override if explicitly provided via CLI
        if let Some(timeout) = args.timeout {
            self.service.timeout_seconds = timeout;
        }

        // Display cap - only override if explicitly provided via CLI
        if let Some(max_stars) = args.max_stars {
            self.display.max_stars = max_stars;
        }

        // Identity - CLI/env wins over config file
        if args.user.is_some() {
            self.identity.user = args.user.clone();
        }

        // Flags always override
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
