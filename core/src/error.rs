use thiserror::Error;

pub type Result<T> = std::result::Result<T, CoreError>;

#[derive(Debug, Error)]
pub enum CoreError {
    /// `transform` was called on a vectorizer that was never fitted.
    #[error("vectorizer is not fitted; call fit before transform")]
    NotFitted,

    /// Persisted artifacts are missing; the offline indexer has to run first.
    #[error("data not ready for {platform}: missing {missing}")]
    DataNotReady { platform: String, missing: String },

    #[error("length mismatch: {what} ({left} vs {right})")]
    LengthMismatch {
        what: &'static str,
        left: usize,
        right: usize,
    },

    #[error("invalid input: {0}")]
    Invalid(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Bincode(#[from] bincode::Error),
}
