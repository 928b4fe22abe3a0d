//! Error types for the language badge pipeline.

use thiserror::Error;

/// Failures that can reach a caller of the badge pipeline.
///
/// Aggregation itself never fails; every variant here comes from the
/// collector, the renderer, or configuration loading.
#[derive(Debug, Error)]
pub enum StatsError {
    /// The user could not be identified or their repositories listed.
    #[error("language source unavailable: {0}")]
    SourceUnavailable(String),

    /// Languages for a single repository could not be fetched.
    #[error("failed to fetch languages for {repo}: {message}")]
    PartialFetchFailure { repo: String, message: String },

    /// The renderer rejected an otherwise valid stat list.
    #[error("failed to render badge: {0}")]
    RenderFailure(String),

    /// Invalid configuration value or resource.
    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, StatsError>;
