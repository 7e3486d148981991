//! HTTP client for the remote analysis service.
//!
//! Each pipeline stage is one POST endpoint accepting `{"url": ...}` as a
//! JSON body and returning a stage-specific payload. The Q&A endpoints
//! follow the same convention with an additional question field.

use crate::config::ServiceConfig;
use crate::error::PipelineError;
use crate::models::{
    BiasPayload, ImageForensicsPayload, QaExchange, RelatedNewsPayload, SentimentPayload,
    StageKind, StagePayload, SummaryPayload,
};
use crate::pipeline::StageExecutor;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// JSON body for stage endpoints.
#[derive(Debug, Serialize)]
struct ArticleBody<'a> {
    url: &'a str,
}

/// JSON body for the question endpoint.
#[derive(Debug, Serialize)]
struct QuestionBody<'a> {
    url: &'a str,
    question: &'a str,
}

/// Wire shape of the common-questions endpoint.
#[derive(Debug, Deserialize)]
struct CommonQuestionsResponse {
    questions_and_answers: Vec<QaExchange>,
}

/// Client for the remote analysis service.
pub struct AnalysisClient {
    http_client: reqwest::Client,
    service: ServiceConfig,
}

impl AnalysisClient {
    /// Create a client with the configured per-request timeout.
    pub fn new(service: ServiceConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(service.timeout_seconds))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            http_client,
            service,
        }
    }

    /// Full URL for an endpoint path.
    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.service.api_url.trim_end_matches('/'), path)
    }

    /// POST a JSON body and decode the JSON response.
    async fn post_json<T, B>(&self, path: &str, body: &B) -> Result<T, PipelineError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = self.endpoint(path);
        debug!("POST {}", url);

        let response = self
            .http_client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    PipelineError::Network(format!(
                        "request to {} timed out after {}s",
                        url, self.service.timeout_seconds
                    ))
                } else if e.is_connect() {
                    PipelineError::Network(format!(
                        "cannot connect to analysis service at {}",
                        self.service.api_url
                    ))
                } else {
                    PipelineError::Network(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let detail = response.text().await.unwrap_or_default();
            return Err(PipelineError::Remote { status, detail });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| PipelineError::Decode(e.to_string()))
    }

    /// Run the image-forensics stage for an article.
    pub async fn image_forensics(&self, url: &str) -> Result<ImageForensicsPayload, PipelineError> {
        self.post_json(&self.service.image_forensics_path, &ArticleBody { url })
            .await
    }

    /// Run the summary stage for an article.
    pub async fn summarize(&self, url: &str) -> Result<SummaryPayload, PipelineError> {
        self.post_json(&self.service.summary_path, &ArticleBody { url })
            .await
    }

    /// Run the sentiment stage for an article.
    pub async fn sentiment(&self, url: &str) -> Result<SentimentPayload, PipelineError> {
        self.post_json(&self.service.sentiment_path, &ArticleBody { url })
            .await
    }

    /// Run the bias and fact/opinion stage for an article.
    pub async fn bias(&self, url: &str) -> Result<BiasPayload, PipelineError> {
        self.post_json(&self.service.bias_path, &ArticleBody { url })
            .await
    }

    /// Fetch related news for an article.
    pub async fn related_news(&self, url: &str) -> Result<RelatedNewsPayload, PipelineError> {
        self.post_json(&self.service.related_path, &ArticleBody { url })
            .await
    }

    /// Ask one question about an already-analyzed article.
    pub async fn question(&self, url: &str, question: &str) -> Result<QaExchange, PipelineError> {
        self.post_json(&self.service.question_path, &QuestionBody { url, question })
            .await
    }

    /// Fetch auto-generated reader questions with answers.
    pub async fn common_questions(&self, url: &str) -> Result<Vec<QaExchange>, PipelineError> {
        let response: CommonQuestionsResponse = self
            .post_json(&self.service.common_questions_path, &ArticleBody { url })
            .await?;
        Ok(response.questions_and_answers)
    }
}

#[async_trait]
impl StageExecutor for AnalysisClient {
    async fn execute(&self, kind: StageKind, url: &str) -> Result<StagePayload, PipelineError> {
        match kind {
            StageKind::ImageForensics => self
                .image_forensics(url)
                .await
                .map(StagePayload::ImageForensics),
            StageKind::Summary => self.summarize(url).await.map(StagePayload::Summary),
            StageKind::Sentiment => self.sentiment(url).await.map(StagePayload::Sentiment),
            StageKind::Bias => self.bias(url).await.map(StagePayload::Bias),
            StageKind::RelatedNews => self.related_news(url).await.map(StagePayload::RelatedNews),
        }
    }
}
