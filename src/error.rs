//! Errors surfaced by [`build_design_matrices`](crate::build_design_matrices).
//!
//! Per-conversation problems (missing datum file, empty or short signal) are
//! logged and skipped; only the variants below reach the caller.
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildError {
    /// No conversation survived the guard clauses.
    #[error("empty dataset: none of the {attempted} conversation(s) produced a usable signal")]
    EmptyDataset { attempted: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A signal or example source failed for one conversation.
    #[error("source failed for conversation {conversation}: {source}")]
    Source {
        conversation: String,
        #[source]
        source: anyhow::Error,
    },

    /// Raised only with `strict_electrodes` enabled.
    #[error("conversation {conversation} uses a different electrode selection than the ones before it")]
    ElectrodeMismatch { conversation: String },

    /// Conversations could not be stitched, usually differing electrode counts.
    #[error("cannot stitch conversations: {0}")]
    Shape(#[from] ndarray::ShapeError),
}

impl BuildError {
    pub(crate) fn source_failed(conversation: impl Into<String>, source: anyhow::Error) -> Self {
        Self::Source {
            conversation: conversation.into(),
            source,
        }
    }
}
