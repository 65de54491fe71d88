use thiserror::Error;

/// Errors raised while validating or persisting passage state.
#[derive(Debug, Error)]
pub enum PassageError {
    /// An interlinear mode that is neither a known code nor a known label.
    #[error("{value:?} is not a valid option")]
    InvalidOption { value: String },

    #[error("no passage column with id {0}")]
    UnknownPassage(u32),

    #[error("failed to persist passage state: {0}")]
    Persistence(#[from] std::io::Error),

    #[error("failed to encode passage state: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PassageError {
    pub fn invalid_option(value: impl Into<String>) -> Self {
        PassageError::InvalidOption {
            value: value.into(),
        }
    }

    /// Message shown to the user in the passage column.
    pub fn user_message(&self) -> &'static str {
        match self {
            PassageError::InvalidOption { .. } => "This is not a valid option.",
            PassageError::UnknownPassage(_) => "This passage column does not exist.",
            PassageError::Persistence(_) | PassageError::Serialization(_) => {
                "Unable to save the passage settings."
            }
        }
    }
}

/// Errors surfaced by a [`crate::search::SearchClient`].
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search request failed: {0}")]
    Request(String),

    #[error("search response could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),

    #[error(transparent)]
    Passage(#[from] PassageError),
}
