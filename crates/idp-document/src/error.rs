use idp_core::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("invariant violated: {0}")]
    InvariantViolated(String),

    #[error("invalid status transition: {from:?} -> {to:?}")]
    InvalidTransition { from: String, to: String },

    #[error("blob store error: {0}")]
    Blob(#[from] idp_blob_store::BlobError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("tracking store error: {0}")]
    TrackingStore(String),

    #[error("document not found: {0}")]
    NotFound(String),
}

impl DocumentError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DocumentError::InvariantViolated(_) | DocumentError::InvalidTransition { .. } => {
                ErrorKind::PermanentSchema
            }
            DocumentError::Blob(e) => e.kind(),
            DocumentError::Serialization(_) => ErrorKind::PermanentSchema,
            DocumentError::TrackingStore(_) => ErrorKind::TransientIo,
            DocumentError::NotFound(_) => ErrorKind::PermanentInput,
        }
    }
}
