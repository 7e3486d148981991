//! Analysis pipeline orchestration.
//!
//! The orchestrator drives the fixed five-stage remote analysis for one
//! request and maintains the [`AnalysisSession`] as the single source of
//! truth for presentation. Stages run strictly in order: each is
//! dispatched only after the previous one succeeded, and the first
//! failure halts the pipeline with every later stage left pending.
//!
//! Starting a new request supersedes any in-flight run. Every completion
//! is applied under a request sequence-number guard, so a late result
//! from a superseded run is discarded instead of overwriting the current
//! session.

use crate::archive::ArticleStore;
use crate::error::PipelineError;
use crate::identity::Identity;
use crate::models::{
    AnalysisRequest, AnalysisSession, QaExchange, SavedArticle, StageKind, StagePayload,
    StageResult,
};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Executes one remote stage call. Seam between the sequencing logic and
/// the HTTP client; tests script it.
#[async_trait]
pub trait StageExecutor: Send + Sync {
    async fn execute(&self, kind: StageKind, url: &str) -> Result<StagePayload, PipelineError>;
}

/// Observer for stage transitions, used by the presentation layer to
/// render loading indicators and resolved stages as they happen.
pub type TransitionHook = Box<dyn Fn(StageKind, &StageResult) + Send + Sync>;

/// Drives the five-stage pipeline and owns the session aggregate.
pub struct Orchestrator {
    executor: Arc<dyn StageExecutor>,
    session: Arc<Mutex<Option<AnalysisSession>>>,
    next_seq: AtomicU64,
    on_transition: Option<TransitionHook>,
}

impl Orchestrator {
    pub fn new(executor: Arc<dyn StageExecutor>) -> Self {
        Self {
            executor,
            session: Arc::new(Mutex::new(None)),
            next_seq: AtomicU64::new(0),
            on_transition: None,
        }
    }

    /// Installs a transition observer. The hook fires for every applied
    /// (non-stale) stage transition, in order.
    pub fn with_transition_hook(mut self, hook: TransitionHook) -> Self {
        self.on_transition = Some(hook);
        self
    }

    /// A point-in-time copy of the session for rendering. `None` until
    /// the first request has been submitted.
    pub async fn snapshot(&self) -> Option<AnalysisSession> {
        self.session.lock().await.clone()
    }

    /// Runs the full pipeline for `request`.
    ///
    /// Resets the session, then dispatches each stage in order, stopping
    /// at the first failure. Returns `Ok(())` when all five stages
    /// succeeded, the stage error when the pipeline halted, or
    /// [`PipelineError::Stale`] when this run was superseded by a newer
    /// `start` call.
    pub async fn start(&self, request: AnalysisRequest) -> Result<(), PipelineError> {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let url = request.source_url.clone();

        info!("Starting analysis #{} for {}", seq, url);
        {
            let mut guard = self.session.lock().await;
            *guard = Some(AnalysisSession::new(request, seq));
        }

        for kind in StageKind::ALL {
            if !self.apply(seq, kind, StageResult::Running, false).await {
                return Err(PipelineError::Stale);
            }

            match self.executor.execute(kind, &url).await {
                Ok(payload) => {
                    let finished = kind == StageKind::RelatedNews;
                    let applied = self
                        .apply(seq, kind, StageResult::Succeeded(payload), finished)
                        .await;
                    if !applied {
                        return Err(PipelineError::Stale);
                    }
                    debug!("Stage {} succeeded", kind);
                }
                Err(err) => {
                    let applied = self
                        .apply(
                            seq,
                            kind,
                            StageResult::Failed {
                                error: err.to_string(),
                            },
                            true,
                        )
                        .await;
                    if !applied {
                        return Err(PipelineError::Stale);
                    }
                    warn!("Stage {} failed, halting pipeline: {}", kind, err);
                    return Err(err);
                }
            }
        }

        info!("Analysis #{} complete", seq);
        Ok(())
    }

    /// Applies a stage transition if `seq` still identifies the current
    /// session. Returns false when the completion is stale; stale
    /// completions are discarded without touching the session.
    async fn apply(
        &self,
        seq: u64,
        kind: StageKind,
        result: StageResult,
        clears_busy: bool,
    ) -> bool {
        let mut guard = self.session.lock().await;

        let session = match guard.as_mut() {
            Some(session) if session.seq == seq => session,
            _ => {
                debug!("Discarding stale completion for {} (run #{})", kind, seq);
                return false;
            }
        };

        session.set_stage(kind, result);
        if clears_busy {
            session.is_busy = false;
        }

        if let Some(hook) = &self.on_transition {
            hook(kind, session.stage(kind));
        }
        true
    }

    /// Archives the current session's summary for the acting user.
    ///
    /// Preconditions: `identity` is present and the summary stage has
    /// succeeded. The session is never mutated by a save, and saves are
    /// not deduplicated.
    pub async fn save(
        &self,
        identity: Option<&Identity>,
        store: &dyn ArticleStore,
    ) -> Result<SavedArticle, PipelineError> {
        let identity = identity
            .ok_or_else(|| PipelineError::precondition("not signed in; cannot archive article"))?;

        let article = {
            let guard = self.session.lock().await;
            let session = guard
                .as_ref()
                .ok_or_else(|| PipelineError::precondition("no analysis has been run"))?;
            let summary = session.summary().ok_or_else(|| {
                PipelineError::precondition("summary is not available; cannot archive article")
            })?;

            SavedArticle {
                owner: identity.user.clone(),
                title: summary.title.clone(),
                url: session.request.source_url.clone(),
                content: summary.summary.clone(),
            }
        };

        store.save(&article).await?;
        Ok(article)
    }

    /// Attaches a Q&A exchange to the current session.
    pub async fn push_question(&self, exchange: QaExchange) {
        if let Some(session) = self.session.lock().await.as_mut() {
            session.questions.push(exchange);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        BiasPayload, ImageForensicsPayload, RelatedArticle, RelatedNewsPayload, SentimentPayload,
        SummaryPayload,
    };
    use std::collections::HashMap;
    use std::sync::Mutex as StdMutex;
    use tokio::sync::Notify;

    fn sample_payload(kind: StageKind) -> StagePayload {
        match kind {
            StageKind::ImageForensics => StagePayload::ImageForensics(ImageForensicsPayload {
                image_url: "https://example.com/lead.jpg".to_string(),
                deepfake_label: "real".to_string(),
                deepfake_confidence: 92.0,
                manipulation_label: "none".to_string(),
                manipulation_confidence: 5.0,
            }),
            StageKind::Summary => StagePayload::Summary(SummaryPayload {
                title: "A".to_string(),
                summary: "The short version.".to_string(),
            }),
            StageKind::Sentiment => StagePayload::Sentiment(SentimentPayload {
                average_sentiment_score: 4.0,
            }),
            StageKind::Bias => StagePayload::Bias(BiasPayload {
                fact_opinion_label: "fact".to_string(),
                fact_opinion_confidence: 0.657,
                distilbert_bias_label: "left".to_string(),
                distilbert_bias_confidence: 0.81,
                gpt_bias_analysis: "Leans on official sources.".to_string(),
            }),
            StageKind::RelatedNews => StagePayload::RelatedNews(RelatedNewsPayload {
                articles: vec![
                    RelatedArticle {
                        title: "First".to_string(),
                        url: "https://example.com/1".to_string(),
                    },
                    RelatedArticle {
                        title: "Second".to_string(),
                        url: "https://example.com/2".to_string(),
                    },
                ],
            }),
        }
    }

    /// Scripted stage executor: records calls, fails configured stages,
    /// and can block one stage of one request URL until released.
    struct ScriptedExecutor {
        calls: StdMutex<Vec<StageKind>>,
        failures: StdMutex<HashMap<StageKind, String>>,
        gate: Option<(StageKind, String, Arc<Notify>)>,
    }

    impl ScriptedExecutor {
        fn new() -> Self {
            Self {
                calls: StdMutex::new(Vec::new()),
                failures: StdMutex::new(HashMap::new()),
                gate: None,
            }
        }

        fn failing_at(kind: StageKind, message: &str) -> Self {
            let executor = Self::new();
            executor
                .failures
                .lock()
                .unwrap()
                .insert(kind, message.to_string());
            executor
        }

        /// Blocks `kind` for requests whose URL contains `url_fragment`
        /// until the notify is released.
        fn gated_at(kind: StageKind, url_fragment: &str, notify: Arc<Notify>) -> Self {
            let mut executor = Self::new();
            executor.gate = Some((kind, url_fragment.to_string(), notify));
            executor
        }

        fn calls(&self) -> Vec<StageKind> {
            self.calls.lock().unwrap().clone()
        }

        fn clear_failures(&self) {
            self.failures.lock().unwrap().clear();
        }
    }

    #[async_trait]
    impl StageExecutor for ScriptedExecutor {
        async fn execute(&self, kind: StageKind, url: &str) -> Result<StagePayload, PipelineError> {
            self.calls.lock().unwrap().push(kind);

            if let Some((gated, fragment, notify)) = &self.gate {
                if *gated == kind && url.contains(fragment.as_str()) {
                    notify.notified().await;
                }
            }

            if let Some(message) = self.failures.lock().unwrap().get(&kind) {
                return Err(PipelineError::Remote {
                    status: 500,
                    detail: message.clone(),
                });
            }

            Ok(sample_payload(kind))
        }
    }

    /// Article store that records every save.
    struct RecordingStore {
        saved: StdMutex<Vec<SavedArticle>>,
    }

    impl RecordingStore {
        fn new() -> Self {
            Self {
                saved: StdMutex::new(Vec::new()),
            }
        }

        fn saved(&self) -> Vec<SavedArticle> {
            self.saved.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ArticleStore for RecordingStore {
        async fn save(&self, article: &SavedArticle) -> Result<(), PipelineError> {
            self.saved.lock().unwrap().push(article.clone());
            Ok(())
        }
    }

    fn request() -> AnalysisRequest {
        AnalysisRequest::new("https://example.com/a").unwrap()
    }

    #[tokio::test]
    async fn test_happy_path_runs_all_stages_in_order() {
        let executor = Arc::new(ScriptedExecutor::new());
        let orchestrator = Orchestrator::new(executor.clone());

        orchestrator.start(request()).await.unwrap();

        assert_eq!(executor.calls(), StageKind::ALL.to_vec());

        let session = orchestrator.snapshot().await.unwrap();
        assert!(session.is_complete());
        assert!(!session.is_busy);
        assert_eq!(session.seq, 1);

        match session.stage(StageKind::ImageForensics).payload() {
            Some(StagePayload::ImageForensics(forensics)) => {
                assert_eq!(forensics.deepfake_label, "real");
                assert_eq!(forensics.deepfake_confidence, 92.0);
                assert_eq!(forensics.manipulation_confidence, 5.0);
            }
            other => panic!("unexpected stage state: {:?}", other),
        }
        assert_eq!(session.summary().unwrap().title, "A");
    }

    #[tokio::test]
    async fn test_failure_halts_and_leaves_later_stages_pending() {
        let executor = Arc::new(ScriptedExecutor::failing_at(StageKind::Summary, "boom"));
        let orchestrator = Orchestrator::new(executor.clone());

        let err = orchestrator.start(request()).await.unwrap_err();
        assert!(matches!(err, PipelineError::Remote { status: 500, .. }));

        // Stages 3-5 were never dispatched.
        assert_eq!(
            executor.calls(),
            vec![StageKind::ImageForensics, StageKind::Summary]
        );

        let session = orchestrator.snapshot().await.unwrap();
        assert!(session.stage(StageKind::ImageForensics).is_succeeded());
        assert!(session.stage(StageKind::Summary).is_failed());
        assert!(session.stage(StageKind::Sentiment).is_pending());
        assert!(session.stage(StageKind::Bias).is_pending());
        assert!(session.stage(StageKind::RelatedNews).is_pending());
        assert!(!session.is_busy);

        let (kind, error) = session.first_failure().unwrap();
        assert_eq!(kind, StageKind::Summary);
        assert!(error.contains("boom"));
    }

    #[tokio::test]
    async fn test_later_stage_never_runs_before_earlier_succeeds() {
        let executor = Arc::new(ScriptedExecutor::new());
        let orchestrator = Orchestrator::new(executor.clone());

        orchestrator.start(request()).await.unwrap();

        // Dispatch order matches pipeline order exactly, no skips.
        let calls = executor.calls();
        for (i, kind) in calls.iter().enumerate() {
            assert_eq!(kind.index(), i);
        }
    }

    #[tokio::test]
    async fn test_stale_completion_is_discarded() {
        let release = Arc::new(Notify::new());
        let executor = Arc::new(ScriptedExecutor::gated_at(
            StageKind::ImageForensics,
            "/old",
            release.clone(),
        ));
        let orchestrator = Arc::new(Orchestrator::new(executor.clone()));

        // First run blocks inside stage 1.
        let first = {
            let orchestrator = orchestrator.clone();
            tokio::spawn(async move {
                orchestrator
                    .start(AnalysisRequest::new("https://example.com/old").unwrap())
                    .await
            })
        };
        tokio::task::yield_now().await;

        // Second run supersedes it and completes.
        orchestrator
            .start(AnalysisRequest::new("https://example.com/new").unwrap())
            .await
            .unwrap();

        // Release the stale call; its completion must be discarded.
        release.notify_one();
        let first_result = first.await.unwrap();
        assert!(matches!(first_result, Err(PipelineError::Stale)));

        let session = orchestrator.snapshot().await.unwrap();
        assert_eq!(session.seq, 2);
        assert_eq!(session.request.source_url, "https://example.com/new");
        assert!(session.is_complete());
        assert!(!session.is_busy);
    }

    #[tokio::test]
    async fn test_new_start_resets_failed_session() {
        let executor = Arc::new(ScriptedExecutor::failing_at(StageKind::Sentiment, "down"));
        let orchestrator = Orchestrator::new(executor.clone());

        assert!(orchestrator.start(request()).await.is_err());

        executor.clear_failures();
        orchestrator.start(request()).await.unwrap();

        let session = orchestrator.snapshot().await.unwrap();
        assert!(session.is_complete());
        assert!(session.first_failure().is_none());
        assert_eq!(session.seq, 2);
    }

    #[tokio::test]
    async fn test_transition_hook_sees_running_then_resolved() {
        let seen: Arc<StdMutex<Vec<(StageKind, bool)>>> = Arc::new(StdMutex::new(Vec::new()));
        let sink = seen.clone();

        let executor = Arc::new(ScriptedExecutor::new());
        let orchestrator = Orchestrator::new(executor).with_transition_hook(Box::new(
            move |kind, result| {
                sink.lock().unwrap().push((kind, result.is_running()));
            },
        ));

        orchestrator.start(request()).await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), StageKind::ALL.len() * 2);
        for (i, kind) in StageKind::ALL.iter().enumerate() {
            assert_eq!(seen[i * 2], (*kind, true));
            assert_eq!(seen[i * 2 + 1], (*kind, false));
        }
    }

    #[tokio::test]
    async fn test_save_requires_identity() {
        let executor = Arc::new(ScriptedExecutor::new());
        let orchestrator = Orchestrator::new(executor);
        orchestrator.start(request()).await.unwrap();

        let store = RecordingStore::new();
        let err = orchestrator.save(None, &store).await.unwrap_err();

        assert!(matches!(err, PipelineError::Precondition(_)));
        assert!(store.saved().is_empty());
    }

    #[tokio::test]
    async fn test_save_requires_succeeded_summary() {
        let executor = Arc::new(ScriptedExecutor::failing_at(StageKind::Summary, "boom"));
        let orchestrator = Orchestrator::new(executor);
        assert!(orchestrator.start(request()).await.is_err());

        let store = RecordingStore::new();
        let identity = Identity::new("alice");
        let err = orchestrator
            .save(Some(&identity), &store)
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Precondition(_)));
        assert!(store.saved().is_empty());
    }

    #[tokio::test]
    async fn test_save_submits_exactly_one_article() {
        let executor = Arc::new(ScriptedExecutor::new());
        let orchestrator = Orchestrator::new(executor);
        orchestrator.start(request()).await.unwrap();

        let store = RecordingStore::new();
        let identity = Identity::new("alice");
        orchestrator.save(Some(&identity), &store).await.unwrap();

        let saved = store.saved();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].owner, "alice");
        assert_eq!(saved[0].title, "A");
        assert_eq!(saved[0].url, "https://example.com/a");
        assert_eq!(saved[0].content, "The short version.");

        // No deduplication: a second save creates a second record.
        orchestrator.save(Some(&identity), &store).await.unwrap();
        assert_eq!(store.saved().len(), 2);
    }

    #[tokio::test]
    async fn test_save_before_any_run_is_rejected() {
        let executor = Arc::new(ScriptedExecutor::new());
        let orchestrator = Orchestrator::new(executor);

        let store = RecordingStore::new();
        let identity = Identity::new("alice");
        let err = orchestrator
            .save(Some(&identity), &store)
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Precondition(_)));
        assert!(store.saved().is_empty());
    }

    #[tokio::test]
    async fn test_push_question_attaches_to_session() {
        let executor = Arc::new(ScriptedExecutor::new());
        let orchestrator = Orchestrator::new(executor);
        orchestrator.start(request()).await.unwrap();

        orchestrator
            .push_question(QaExchange {
                question: "Who is quoted?".to_string(),
                answer: "Two officials.".to_string(),
            })
            .await;

        let session = orchestrator.snapshot().await.unwrap();
        assert_eq!(session.questions.len(), 1);
        assert_eq!(session.questions[0].question, "Who is quoted?");
    }
}
