//! Data models for the analysis pipeline.
//!
//! This module contains the core data structures used throughout the
//! application: the submitted request, per-stage results, the session
//! aggregate, and the archived-article record.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A user-submitted analysis request. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    /// The article URL to analyze.
    pub source_url: String,
}

impl AnalysisRequest {
    /// Creates a request, rejecting empty or whitespace-only URLs.
    ///
    /// Malformed URLs are not checked locally; rejection is delegated to
    /// the remote stages.
    pub fn new(source_url: impl Into<String>) -> Result<Self, String> {
        let source_url = source_url.into();
        if source_url.trim().is_empty() {
            return Err("source URL must not be empty".to_string());
        }
        Ok(Self { source_url })
    }
}

/// One discrete remote analysis call in the fixed five-step pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    ImageForensics,
    Summary,
    Sentiment,
    Bias,
    RelatedNews,
}

impl StageKind {
    /// All stages in pipeline order. Stage `N+1` is dispatched only after
    /// stage `N` has succeeded.
    pub const ALL: [StageKind; 5] = [
        StageKind::ImageForensics,
        StageKind::Summary,
        StageKind::Sentiment,
        StageKind::Bias,
        StageKind::RelatedNews,
    ];

    /// Position of this stage in the pipeline (0-indexed).
    pub fn index(&self) -> usize {
        Self::ALL
            .iter()
            .position(|k| k == self)
            .unwrap_or_default()
    }

    /// Human-readable label used in progress output and reports.
    pub fn label(&self) -> &'static str {
        match self {
            StageKind::ImageForensics => "Image Forensics",
            StageKind::Summary => "Summary",
            StageKind::Sentiment => "Sentiment",
            StageKind::Bias => "Bias & Fact/Opinion",
            StageKind::RelatedNews => "Related News",
        }
    }

    /// Default endpoint path on the analysis service.
    pub fn default_path(&self) -> &'static str {
        match self {
            StageKind::ImageForensics => "/image-forensics",
            StageKind::Summary => "/summarize",
            StageKind::Sentiment => "/sentiment",
            StageKind::Bias => "/bias",
            StageKind::RelatedNews => "/related-news",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Image forensics result: deepfake and manipulation classification for
/// the article's lead image. Confidences are percentages in `[0, 100]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageForensicsPayload {
    pub image_url: String,
    pub deepfake_label: String,
    pub deepfake_confidence: f64,
    pub manipulation_label: String,
    pub manipulation_confidence: f64,
}

/// Article title and generated summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryPayload {
    pub title: String,
    pub summary: String,
}

/// Average sentiment score across the article, on the sentiment model's
/// 1-5 star scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentPayload {
    pub average_sentiment_score: f64,
}

impl SentimentPayload {
    /// Number of star glyphs to render, clamped to `max_stars`.
    ///
    /// The raw score is unbounded on the wire; the clamp is an explicit
    /// display policy (default 5, configurable).
    pub fn star_count(&self, max_stars: usize) -> usize {
        if !self.average_sentiment_score.is_finite() || self.average_sentiment_score <= 0.0 {
            return 0;
        }
        (self.average_sentiment_score.round() as usize).min(max_stars)
    }

    /// Star-glyph rendering of the score, e.g. `★★★★☆`.
    pub fn stars(&self, max_stars: usize) -> String {
        let filled = self.star_count(max_stars);
        let mut out = String::with_capacity(max_stars * 3);
        for _ in 0..filled {
            out.push('★');
        }
        for _ in filled..max_stars {
            out.push('☆');
        }
        out
    }
}

/// Bias and fact-vs-opinion classification. Confidences are fractional
/// in `[0, 1]` on the wire and converted to percentages for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiasPayload {
    pub fact_opinion_label: String,
    pub fact_opinion_confidence: f64,
    pub distilbert_bias_label: String,
    pub distilbert_bias_confidence: f64,
    /// Freeform narrative from the generative bias analyzer.
    #[serde(default)]
    pub gpt_bias_analysis: String,
}

impl BiasPayload {
    /// Bias confidence as a percentage (fraction x 100).
    pub fn bias_percent(&self) -> f64 {
        self.distilbert_bias_confidence * 100.0
    }

    /// Fact/opinion confidence as a floored integer percentage.
    pub fn fact_opinion_percent(&self) -> u32 {
        (self.fact_opinion_confidence * 100.0).floor().max(0.0) as u32
    }
}

/// One related article reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedArticle {
    pub title: String,
    pub url: String,
}

/// Ordered related-news results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedNewsPayload {
    pub articles: Vec<RelatedArticle>,
}

/// Stage-specific success payload, tagged by stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum StagePayload {
    ImageForensics(ImageForensicsPayload),
    Summary(SummaryPayload),
    Sentiment(SentimentPayload),
    Bias(BiasPayload),
    RelatedNews(RelatedNewsPayload),
}

impl StagePayload {
    /// The stage this payload belongs to.
    pub fn kind(&self) -> StageKind {
        match self {
            StagePayload::ImageForensics(_) => StageKind::ImageForensics,
            StagePayload::Summary(_) => StageKind::Summary,
            StagePayload::Sentiment(_) => StageKind::Sentiment,
            StagePayload::Bias(_) => StageKind::Bias,
            StagePayload::RelatedNews(_) => StageKind::RelatedNews,
        }
    }
}

/// State of one pipeline stage within a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum StageResult {
    /// Not yet dispatched. Stages after a failed stage stay here permanently.
    Pending,
    /// Remote call in flight.
    Running,
    /// Remote call resolved with a payload.
    Succeeded(StagePayload),
    /// Remote call failed; terminal for this session.
    Failed { error: String },
}

impl StageResult {
    pub fn is_pending(&self) -> bool {
        matches!(self, StageResult::Pending)
    }

    pub fn is_running(&self) -> bool {
        matches!(self, StageResult::Running)
    }

    pub fn is_succeeded(&self) -> bool {
        matches!(self, StageResult::Succeeded(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, StageResult::Failed { .. })
    }

    /// The success payload, if resolved successfully.
    pub fn payload(&self) -> Option<&StagePayload> {
        match self {
            StageResult::Succeeded(payload) => Some(payload),
            _ => None,
        }
    }

    /// Renderable state for the presentation layer: nothing shown,
    /// a loading indicator, or the resolved outcome.
    pub fn view(&self) -> StageView {
        match self {
            StageResult::Pending => StageView::Hidden,
            StageResult::Running => StageView::Loading,
            StageResult::Succeeded(_) | StageResult::Failed { .. } => StageView::Shown,
        }
    }
}

/// Three-way presentation mapping for one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageView {
    /// Nothing is rendered for this stage.
    Hidden,
    /// A "Loading <Stage>..." indicator is rendered.
    Loading,
    /// The resolved outcome (success payload or failure notice) is rendered.
    Shown,
}

/// The aggregate state for one in-flight or completed analysis.
///
/// Only the latest submission's session exists at any time; a new `start`
/// replaces it entirely. Mutated only by the orchestrator; the
/// presentation layer reads snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisSession {
    pub request: AnalysisRequest,
    /// Monotonically increasing request sequence number; distinguishes
    /// current from stale in-flight completions.
    pub seq: u64,
    pub stages: Vec<StageResult>,
    pub is_busy: bool,
    /// Q&A exchanges collected after the pipeline completed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub questions: Vec<QaExchange>,
}

impl AnalysisSession {
    /// Creates a fresh session keyed to `request`, all stages pending.
    pub fn new(request: AnalysisRequest, seq: u64) -> Self {
        Self {
            request,
            seq,
            stages: vec![StageResult::Pending; StageKind::ALL.len()],
            is_busy: true,
            questions: Vec::new(),
        }
    }

    /// The state of one stage.
    pub fn stage(&self, kind: StageKind) -> &StageResult {
        &self.stages[kind.index()]
    }

    /// Replaces the state of one stage.
    pub fn set_stage(&mut self, kind: StageKind, result: StageResult) {
        self.stages[kind.index()] = result;
    }

    /// The summary payload, if that stage has succeeded.
    pub fn summary(&self) -> Option<&SummaryPayload> {
        match self.stage(StageKind::Summary).payload() {
            Some(StagePayload::Summary(summary)) => Some(summary),
            _ => None,
        }
    }

    /// The first failed stage and its error message, if any.
    pub fn first_failure(&self) -> Option<(StageKind, &str)> {
        StageKind::ALL.iter().find_map(|kind| match self.stage(*kind) {
            StageResult::Failed { error } => Some((*kind, error.as_str())),
            _ => None,
        })
    }

    /// True once all five stages have succeeded.
    pub fn is_complete(&self) -> bool {
        self.stages.iter().all(StageResult::is_succeeded)
    }
}

/// An archived article record, keyed by owner identity.
///
/// Created only after the summary stage has succeeded and the user
/// explicitly triggers a save. Saves are not deduplicated; repeated saves
/// create duplicate records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedArticle {
    pub owner: String,
    pub title: String,
    pub url: String,
    pub content: String,
}

/// A question asked about the analyzed article and the service's answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaExchange {
    pub question: String,
    pub answer: String,
}
