//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;

/// NewsLyzer - news-analysis pipeline CLI
///
/// Run any news-article URL through the five-stage analysis pipeline
/// (image forensics, summary, sentiment, bias, related news) and render
/// the results as a Markdown or JSON report.
///
/// Examples:
///   newslyzer --url https://example.com/some-article
///   newslyzer --url https://example.com/some-article --format json -o report.json
///   newslyzer --url https://example.com/some-article --save --user alice
///   newslyzer --url https://example.com/some-article --ask "Who is quoted?"
///   newslyzer --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Article URL to analyze
    ///
    /// Passed as-is to every stage endpoint; the service rejects URLs it
    /// cannot fetch. Not required when using --init-config.
    #[arg(short, long, value_name = "URL", required_unless_present = "init_config")]
    pub url: Option<String>,

    /// Analysis service base URL
    #[arg(
        long,
        default_value = "http://localhost:8000",
        env = "NEWSLYZER_API_URL",
        value_name = "URL"
    )]
    pub api_url: String,

    /// Output file path for the report
    #[arg(
        short,
        long,
        default_value = "newslyzer_report.md",
        value_name = "FILE"
    )]
    pub output: PathBuf,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Per-stage request timeout in seconds
    ///
    /// Applies to each stage call independently. Default: from config
    /// or 30s.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .newslyzer.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Acting user identity, required for --save
    ///
    /// Stands in for the hosted product's login session.
    #[arg(long, value_name = "USER", env = "NEWSLYZER_USER")]
    pub user: Option<String>,

    /// Archive the summarized article for the acting user after the
    /// pipeline completes
    #[arg(long)]
    pub save: bool,

    /// Ask a question about the article after analysis (repeatable)
    #[arg(long, value_name = "QUESTION")]
    pub ask: Vec<String>,

    /// Fetch auto-generated reader questions and answers after analysis
    #[arg(long)]
    pub common_questions: bool,

    /// Maximum star glyphs for the sentiment rating
    #[arg(long, value_name = "N")]
    pub max_stars: Option<usize>,

    /// Dry run: print the stage plan without calling the analysis service
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .newslyzer.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the article URL, empty if not set (should be validated first).
    pub fn source_url(&self) -> &str {
        self.url.as_deref().unwrap_or("")
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if self.source_url().trim().is_empty() {
            return Err("Article URL must not be empty".to_string());
        }

        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            return Err("API URL must start with 'http://' or 'https://'".to_string());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        if let Some(max_stars) = self.max_stars {
            if max_stars == 0 {
                return Err("Max stars must be at least 1".to_string());
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args {
            url: Some("https://example.com/article".to_string()),
            api_url: "http://localhost:8000".to_string(),
            output: PathBuf::from("test.md"),
            format: OutputFormat::Markdown,
            timeout: None,
            config: None,
            verbose: false,
            quiet: false,
            user: None,
            save: false,
            ask: Vec::new(),
            common_questions: false,
            max_stars: None,
            dry_run: false,
            init_config: false,
        }
    }

    #[test]
    fn test_validation_empty_url() {
        let mut args = make_args();
        args.url = Some("   ".to_string());
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_bad_api_url() {
        let mut args = make_args();
        args.api_url = "localhost:8000".to_string();
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_zero_timeout() {
        let mut args = make_args();
        args.timeout = Some(0);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_init_config_skips_validation() {
        let mut args = make_args();
        args.url = None;
        args.init_config = true;
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }
}
