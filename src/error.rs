//! Error types for the analysis pipeline.
//!
//! Every remote failure is terminal for the session it belongs to:
//! nothing in this crate retries automatically.

use thiserror::Error;

/// Typed failures produced by the pipeline and its collaborators.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The request could not be sent or received (connect failure, timeout).
    #[error("network failure: {0}")]
    Network(String),

    /// The remote endpoint answered with a non-success status.
    #[error("remote rejection ({status}): {detail}")]
    Remote { status: u16, detail: String },

    /// The remote endpoint answered 2xx but the payload did not decode.
    #[error("malformed response: {0}")]
    Decode(String),

    /// A precondition for the operation was not met (missing identity,
    /// missing prior-stage data).
    #[error("precondition failure: {0}")]
    Precondition(String),

    /// A completion belonging to a superseded request arrived late.
    /// Discarded internally; never surfaced to the user.
    #[error("stale completion discarded")]
    Stale,
}

impl PipelineError {
    /// Creates a `Precondition` error.
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition(message.into())
    }

    /// True for failures that halt the pipeline at the current stage.
    pub fn is_terminal_for_stage(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::Remote { .. } | Self::Decode(_)
        )
    }
}

/// Maps a reqwest transport error onto the pipeline taxonomy.
///
/// Status-level rejection is handled at the call site where the response
/// body is still available.
impl From<reqwest::Error> for PipelineError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Network("request timed out".to_string())
        } else if err.is_connect() {
            Self::Network(format!("connection failed: {}", err))
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}
