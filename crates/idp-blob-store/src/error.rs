use idp_core::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BlobError {
    #[error("blob not found: {0}")]
    NotFound(String),

    #[error("S3 error: {0}")]
    S3(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BlobError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BlobError::NotFound(_) => ErrorKind::PermanentInput,
            BlobError::S3(_) | BlobError::Io(_) => ErrorKind::TransientIo,
            BlobError::Serialization(_) => ErrorKind::PermanentSchema,
        }
    }
}
