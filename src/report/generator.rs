//! Markdown and JSON report generation.
//!
//! Renders a session snapshot stage by stage. A stage that never started
//! produces no section at all; a failed stage produces a halt notice.

use crate::models::{
    AnalysisSession, BiasPayload, ImageForensicsPayload, RelatedNewsPayload, SentimentPayload,
    StageKind, StagePayload, StageResult, StageView, SummaryPayload,
};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Metadata about one analysis run.
#[derive(Debug, Clone, Serialize)]
pub struct ReportMeta {
    /// URL of the analyzed article.
    pub source_url: String,
    /// Base URL of the analysis service.
    pub api_url: String,
    /// Date and time of the analysis.
    pub analyzed_at: DateTime<Utc>,
    /// Duration of the analysis in seconds.
    pub duration_seconds: f64,
}

/// The complete report: run metadata plus the session snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub meta: ReportMeta,
    pub session: AnalysisSession,
}

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &AnalysisReport, max_stars: usize) -> String {
    let mut output = String::new();

    output.push_str("# NewsLyzer Report\n\n");
    output.push_str(&generate_metadata_section(&report.meta));

    for kind in StageKind::ALL {
        output.push_str(&generate_stage_section(
            kind,
            report.session.stage(kind),
            max_stars,
        ));
    }

    output.push_str(&generate_questions_section(&report.session));
    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(meta: &ReportMeta) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Article:** {}\n", meta.source_url));
    section.push_str(&format!(
        "- **Analyzed:** {}\n",
        meta.analyzed_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Service:** {}\n", meta.api_url));
    section.push_str(&format!(
        "- **Duration:** {:.1}s\n",
        meta.duration_seconds
    ));
    section.push('\n');

    section
}

/// Generate the section for one stage based on its renderable state.
fn generate_stage_section(kind: StageKind, result: &StageResult, max_stars: usize) -> String {
    match result.view() {
        // Never dispatched: nothing is rendered.
        StageView::Hidden => String::new(),
        StageView::Loading => format!("## {}\n\n_Loading {}..._\n\n", kind.label(), kind.label()),
        StageView::Shown => match result {
            StageResult::Succeeded(payload) => {
                let mut section = format!("## {}\n\n", kind.label());
                section.push_str(&generate_payload_block(payload, max_stars));
                section
            }
            StageResult::Failed { error } => format!(
                "## {}\n\n⛔ **Pipeline halted at this stage:** {}\n\n",
                kind.label(),
                error
            ),
            // Pending and Running map to Hidden/Loading above.
            _ => String::new(),
        },
    }
}

/// Generate the body block for a succeeded stage.
fn generate_payload_block(payload: &StagePayload, max_stars: usize) -> String {
    match payload {
        StagePayload::ImageForensics(forensics) => generate_forensics_block(forensics),
        StagePayload::Summary(summary) => generate_summary_block(summary),
        StagePayload::Sentiment(sentiment) => generate_sentiment_block(sentiment, max_stars),
        StagePayload::Bias(bias) => generate_bias_block(bias),
        StagePayload::RelatedNews(related) => generate_related_block(related),
    }
}

fn generate_forensics_block(forensics: &ImageForensicsPayload) -> String {
    let mut block = String::new();

    block.push_str(&format!("![Lead image]({})\n\n", forensics.image_url));
    block.push_str(&format!(
        "- **Deepfake:** {} ({})\n",
        forensics.deepfake_label,
        format_percent(forensics.deepfake_confidence)
    ));
    block.push_str(&format!(
        "- **Manipulation:** {} ({})\n",
        forensics.manipulation_label,
        format_percent(forensics.manipulation_confidence)
    ));
    block.push('\n');

    block
}

fn generate_summary_block(summary: &SummaryPayload) -> String {
    format!("**{}**\n\n{}\n\n", summary.title, summary.summary)
}

fn generate_sentiment_block(sentiment: &SentimentPayload, max_stars: usize) -> String {
    format!(
        "{} ({:.2} of {})\n\n",
        sentiment.stars(max_stars),
        sentiment.average_sentiment_score,
        max_stars
    )
}

fn generate_bias_block(bias: &BiasPayload) -> String {
    let mut block = String::new();

    block.push_str(&format!(
        "- **Bias:** {} ({})\n",
        bias.distilbert_bias_label,
        format_percent(bias.bias_percent())
    ));
    block.push_str(&format!(
        "- **Fact vs. opinion:** {} ({}%)\n",
        bias.fact_opinion_label,
        bias.fact_opinion_percent()
    ));
    block.push('\n');

    if !bias.gpt_bias_analysis.is_empty() {
        block.push_str(&format!("> {}\n\n", bias.gpt_bias_analysis));
    }

    block
}

fn generate_related_block(related: &RelatedNewsPayload) -> String {
    if related.articles.is_empty() {
        return "No related articles found.\n\n".to_string();
    }

    let mut block = String::new();
    for article in &related.articles {
        block.push_str(&format!("- [{}]({})\n", article.title, article.url));
    }
    block.push('\n');

    block
}

/// Generate the reader-questions section, if any were collected.
fn generate_questions_section(session: &AnalysisSession) -> String {
    if session.questions.is_empty() {
        return String::new();
    }

    let mut section = String::new();
    section.push_str("## Reader Questions\n\n");

    for exchange in &session.questions {
        section.push_str(&format!("**Q: {}**\n\n", exchange.question));
        section.push_str(&format!("{}\n\n", exchange.answer));
    }

    section
}

/// Generate the report footer.
fn generate_footer() -> String {
    "---\n\n*Report generated by NewsLyzer*\n".to_string()
}

/// Generate a JSON report.
pub fn generate_json_report(report: &AnalysisReport) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// Format a percentage value, dropping a trailing `.0`.
fn format_percent(percent: f64) -> String {
    if (percent - percent.round()).abs() < 1e-9 {
        format!("{:.0}%", percent)
    } else {
        format!("{}%", percent)
    }
}
