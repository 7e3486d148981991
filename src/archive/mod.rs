//! Article archival via the persistence collaborator.
//!
//! One operation: save an article record for its owner. Saves are not
//! deduplicated; calling save twice for the same article creates two
//! records.

use crate::config::ServiceConfig;
use crate::error::PipelineError;
use crate::models::SavedArticle;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info};

/// Persistence collaborator for archived articles.
#[async_trait]
pub trait ArticleStore: Send + Sync {
    async fn save(&self, article: &SavedArticle) -> Result<(), PipelineError>;
}

/// Article store backed by the archive HTTP endpoint.
pub struct HttpArticleStore {
    http_client: reqwest::Client,
    endpoint: String,
}

impl HttpArticleStore {
    pub fn new(service: &ServiceConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(service.timeout_seconds))
            .build()
            .expect("Failed to create HTTP client");

        let endpoint = format!(
            "{}{}",
            service.api_url.trim_end_matches('/'),
            service.archive_path
        );

        Self {
            http_client,
            endpoint,
        }
    }
}

#[async_trait]
impl ArticleStore for HttpArticleStore {
    async fn save(&self, article: &SavedArticle) -> Result<(), PipelineError> {
        debug!("POST {} (owner: {})", self.endpoint, article.owner);

        let response = self
            .http_client
            .post(&self.endpoint)
            .json(article)
            .send()
            .await
            .map_err(PipelineError::from)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let detail = response.text().await.unwrap_or_default();
            return Err(PipelineError::Remote { status, detail });
        }

        info!("Archived \"{}\" for {}", article.title, article.owner);
        Ok(())
    }
}
