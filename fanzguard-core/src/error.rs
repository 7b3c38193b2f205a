use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProvenanceError {
    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Embedding failed ({method}): {reason}")]
    Embedding { method: String, reason: String },

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Duplicate watermark: {0}")]
    DuplicateWatermark(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Integrity error: watermark {watermark_id} expected asset {expected}, found {found}")]
    Integrity {
        watermark_id: String,
        expected: String,
        found: String,
    },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for ProvenanceError {
    fn from(err: sqlx::Error) -> Self {
        ProvenanceError::Storage(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ProvenanceError>;
