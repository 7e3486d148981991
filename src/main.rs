//! NewsLyzer - News-Analysis Pipeline CLI
//!
//! Runs an article URL through the five-stage remote analysis pipeline
//! (image forensics, summary, sentiment, bias, related news) and writes
//! a Markdown or JSON report.
//!
//! Exit codes:
//!   0 - Full pipeline completed
//!   1 - Runtime error (arguments, config, report write failure)
//!   2 - Pipeline halted at a stage (partial report still written)

mod archive;
mod cli;
mod client;
mod config;
mod error;
mod identity;
mod models;
mod pipeline;
mod report;

use anyhow::{anyhow, Context, Result};
use archive::HttpArticleStore;
use chrono::Utc;
use cli::{Args, OutputFormat};
use client::AnalysisClient;
use config::Config;
use identity::{IdentityProvider, StaticIdentity};
use indicatif::{ProgressBar, ProgressStyle};
use models::{AnalysisRequest, StageKind, StageResult};
use pipeline::Orchestrator;
use report::{AnalysisReport, ReportMeta};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("NewsLyzer v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    // Run the analysis
    match run_analysis(args).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Analysis failed: {}", e);
            eprintln!("\n❌ Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .newslyzer.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(".newslyzer.toml");

    if path.exists() {
        eprintln!("⚠️  .newslyzer.toml already exists. Remove it first or edit it manually.");
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).context("Failed to write .newslyzer.toml")?;

    println!("✅ Created .newslyzer.toml with default settings.");
    println!("   Edit it to customize the service URL, endpoints, and display options.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Run the complete analysis workflow. Returns exit code (0 or 2).
async fn run_analysis(args: Args) -> Result<i32> {
    let start_time = Instant::now();

    // Load configuration
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    let request = AnalysisRequest::new(args.source_url()).map_err(|e| anyhow!(e))?;

    // Handle --dry-run: print the stage plan and exit
    if args.dry_run {
        return handle_dry_run(&request, &config);
    }

    println!("📰 Analyzing: {}", request.source_url);
    println!("   Service: {}", config.service.api_url);
    println!("   Timeout: {}s per stage", config.service.timeout_seconds);
    println!();

    let client = Arc::new(AnalysisClient::new(config.service.clone()));

    // Stage progress is rendered from orchestrator transitions; the
    // orchestrator itself knows nothing about terminals.
    let spinner = build_spinner(args.quiet);
    let orchestrator = {
        let spinner = spinner.clone();
        Orchestrator::new(client.clone()).with_transition_hook(Box::new(move |kind, result| {
            match result {
                StageResult::Running => {
                    spinner.set_message(format!("Loading {}...", kind.label()));
                }
                StageResult::Succeeded(_) => {
                    spinner.println(format!("   ✅ {}", kind.label()));
                }
                StageResult::Failed { error } => {
                    spinner.println(format!("   ⛔ {}: {}", kind.label(), error));
                }
                StageResult::Pending => {}
            }
        }))
    };

    let outcome = orchestrator.start(request.clone()).await;
    spinner.finish_and_clear();

    let halted = match outcome {
        Ok(()) => {
            println!("\n🔬 Analysis complete.");
            false
        }
        Err(err) => {
            // Transient, toast-style notice; detail also lands in the report.
            warn!("Pipeline halted: {}", err);
            eprintln!("\n⚠️  Analysis stopped early: {}", err);
            eprintln!("   Remaining stages were not run.");
            true
        }
    };

    // Q&A extras need the full article analysis to have gone through.
    if !halted && (!args.ask.is_empty() || args.common_questions) {
        run_questions(&args, &client, &orchestrator).await;
    }

    // Archive the summary if requested
    if args.save {
        let identity = StaticIdentity::new(config.identity.user.clone()).current();
        let store = HttpArticleStore::new(&config.service);

        match orchestrator.save(identity.as_ref(), &store).await {
            Ok(article) => {
                println!("💾 Archived \"{}\" for {}", article.title, article.owner);
            }
            Err(e) => {
                warn!("Archive failed: {}", e);
                eprintln!("⚠️  Could not archive article: {}", e);
            }
        }
    }

    // Build and write the report
    let session = orchestrator
        .snapshot()
        .await
        .context("No analysis session was created")?;

    let report = AnalysisReport {
        meta: ReportMeta {
            source_url: request.source_url.clone(),
            api_url: config.service.api_url.clone(),
            analyzed_at: Utc::now(),
            duration_seconds: start_time.elapsed().as_secs_f64(),
        },
        session,
    };

    let output = match args.format {
        OutputFormat::Json => report::generate_json_report(&report)?,
        OutputFormat::Markdown => {
            report::generate_markdown_report(&report, config.display.max_stars)
        }
    };

    std::fs::write(&args.output, &output)
        .with_context(|| format!("Failed to write report to {}", args.output.display()))?;

    let succeeded = report
        .session
        .stages
        .iter()
        .filter(|s| s.is_succeeded())
        .count();

    println!("\n📊 Analysis Summary:");
    println!(
        "   Stages completed: {}/{}",
        succeeded,
        StageKind::ALL.len()
    );
    println!("   Duration: {:.1}s", report.meta.duration_seconds);
    println!("\n✅ Report saved to: {}", args.output.display());

    if halted {
        return Ok(2);
    }
    Ok(0)
}

/// Build the stage spinner; hidden in quiet mode.
fn build_spinner(quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg}").expect("Invalid progress template"),
    );
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner
}

/// Ask the follow-up questions and attach answers to the session.
///
/// Failures here are reported but never affect the completed pipeline.
async fn run_questions(args: &Args, client: &AnalysisClient, orchestrator: &Orchestrator) {
    let url = args.source_url();

    for question in &args.ask {
        match client.question(url, question).await {
            Ok(exchange) => {
                println!("❓ {}", exchange.question);
                println!("   {}", exchange.answer);
                orchestrator.push_question(exchange).await;
            }
            Err(e) => {
                warn!("Question failed: {}", e);
                eprintln!("⚠️  Could not answer \"{}\": {}", question, e);
            }
        }
    }

    if args.common_questions {
        match client.common_questions(url).await {
            Ok(exchanges) => {
                for exchange in exchanges {
                    println!("❓ {}", exchange.question);
                    println!("   {}", exchange.answer);
                    orchestrator.push_question(exchange).await;
                }
            }
            Err(e) => {
                warn!("Common questions failed: {}", e);
                eprintln!("⚠️  Could not fetch reader questions: {}", e);
            }
        }
    }
}

/// Handle --dry-run: print the stage plan, no remote calls.
fn handle_dry_run(request: &AnalysisRequest, config: &Config) -> Result<i32> {
    println!("\n🔍 Dry run: stage plan (no remote calls)...\n");
    println!("   Article: {}", request.source_url);
    println!("   Service: {}\n", config.service.api_url);

    for (i, kind) in StageKind::ALL.iter().enumerate() {
        println!(
            "   {}. {} → POST {}{}",
            i + 1,
            kind.label(),
            config.service.api_url.trim_end_matches('/'),
            config.service.path_for(*kind)
        );
    }

    println!("\n✅ Dry run complete. No requests were made.");
    Ok(0)
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from .newslyzer.toml");
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
