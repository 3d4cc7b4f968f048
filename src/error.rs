use thiserror::Error;

/// Convenient alias for results returned by the alignment library.
pub type Result<T> = std::result::Result<T, AlignError>;

#[derive(Debug, Error)]
pub enum AlignError {
    #[error("posterior vocabulary has {actual} classes, expected {expected}")]
    VocabularyMismatch { expected: usize, actual: usize },
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("invalid configuration: {message}")]
    Config { message: String },
    #[error("audio error while {context}: {message}")]
    Audio {
        context: &'static str,
        message: String,
    },
    #[error("inference error while {context}: {message}")]
    Inference {
        context: &'static str,
        message: String,
    },
    #[error("cache error while {context}: {message}")]
    Cache {
        context: &'static str,
        message: String,
    },
    #[error("I/O error while {context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON error while {context}: {source}")]
    Json {
        context: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("alignment cancelled")]
    Cancelled,
}

impl AlignError {
    pub(crate) fn io(context: &'static str, source: std::io::Error) -> Self {
        Self::Io { context, source }
    }

    pub(crate) fn json(context: &'static str, source: serde_json::Error) -> Self {
        Self::Json { context, source }
    }

    pub fn audio(context: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Audio {
            context,
            message: err.to_string(),
        }
    }

    pub fn inference(context: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Inference {
            context,
            message: err.to_string(),
        }
    }

    pub(crate) fn cache(context: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Cache {
            context,
            message: err.to_string(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Whether this error stops the run outright instead of consuming a retry.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
