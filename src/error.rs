//! Error types for the training harness
//!
//! Two fatal classes: configuration errors (surfaced before any training
//! step) and data errors (surfaced immediately, never retried). Numeric
//! backend failures are not wrapped here; they propagate to the driver.

use thiserror::Error;

/// Result type for harness operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while orchestrating a training round
#[derive(Debug, Error)]
pub enum Error {
    /// Anchored optimization requested without a frozen pretrained model
    #[error("method '{method}' requires a pretrained anchor model")]
    MissingAnchor { method: String },

    /// Anchor parameters do not line up with the live model's parameters
    #[error("anchor parameters do not match model: {detail}")]
    AnchorMismatch { detail: String },

    /// No factory registered for the configured method
    #[error("no model factory registered for method '{method}'")]
    UnregisteredMethod { method: String },

    /// Unknown method tag in configuration
    #[error("unknown training method: '{0}'")]
    UnknownMethod(String),

    /// Invalid freeze level (valid: 0, 1, 2)
    #[error("invalid freeze level {0} (expected 0, 1 or 2)")]
    InvalidFreezeLevel(u8),

    /// A hyperparameter is outside its valid range
    #[error("invalid hyperparameter: {detail}")]
    InvalidHyperparameter { detail: String },

    /// A round was started with an empty dataset
    #[error("dataset is empty")]
    EmptyDataset,

    /// An operation needed a dataset that was never assigned
    #[error("dataset must be assigned before {operation}")]
    DatasetNotSet { operation: &'static str },

    /// Scoring was given batches of different lengths
    #[error("prediction/reference batch mismatch: {predictions} predictions, {references} references")]
    BatchMismatch {
        predictions: usize,
        references: usize,
    },

    /// Scoring was given an empty batch
    #[error("cannot score an empty batch")]
    EmptyBatch,

    /// IO error (config loading)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error (config loading)
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether this is a configuration error (fatal before training starts)
    #[must_use]
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Self::MissingAnchor { .. }
                | Self::AnchorMismatch { .. }
                | Self::UnregisteredMethod { .. }
                | Self::UnknownMethod(_)
                | Self::InvalidFreezeLevel(_)
                | Self::InvalidHyperparameter { .. }
        )
    }

    /// Whether this is a data error (fatal at the offending call)
    #[must_use]
    pub fn is_data(&self) -> bool {
        matches!(
            self,
            Self::EmptyDataset
                | Self::DatasetNotSet { .. }
                | Self::BatchMismatch { .. }
                | Self::EmptyBatch
        )
    }
}
