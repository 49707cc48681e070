use idp_core::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractionStageError {
    #[error("no schema registered for class '{0}'")]
    UnknownClass(String),

    #[error("extraction result does not conform to the schema for '{class}': {detail}")]
    SchemaMismatch { class: String, detail: String },

    #[error(transparent)]
    Provider(#[from] idp_core::StageError),

    #[error(transparent)]
    Blob(#[from] idp_blob_store::BlobError),

    #[error(transparent)]
    Document(#[from] idp_document::DocumentError),

    #[error("extraction cancelled")]
    Cancelled,
}

impl ExtractionStageError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExtractionStageError::UnknownClass(_) => ErrorKind::PermanentInput,
            ExtractionStageError::SchemaMismatch { .. } => ErrorKind::PermanentSchema,
            ExtractionStageError::Provider(e) => e.kind,
            ExtractionStageError::Blob(e) => e.kind(),
            ExtractionStageError::Document(e) => e.kind(),
            ExtractionStageError::Cancelled => ErrorKind::Cancelled,
        }
    }
}
