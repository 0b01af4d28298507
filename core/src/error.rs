//! Error types for the retrieval core.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SearchError {
    /// Fitting requires at least one document; IDF is undefined for N = 0.
    #[error("invalid corpus: at least one document is required")]
    InvalidCorpus,

    #[error("duplicate document id: {0}")]
    DuplicateId(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("encoding error: {0}")]
    Encode(#[from] bincode::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The on-disk artifact is missing pieces or was written by another format version.
    #[error("persisted index error: {0}")]
    Persist(String),
}

pub type Result<T> = std::result::Result<T, SearchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        assert_eq!(
            SearchError::DuplicateId("OBT001".into()).to_string(),
            "duplicate document id: OBT001"
        );
        assert!(SearchError::InvalidCorpus.to_string().contains("at least one document"));
    }
}
