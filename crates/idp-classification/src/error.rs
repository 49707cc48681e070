use idp_core::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClassificationStageError {
    #[error("provider returned {got} output for a {expected} configured method")]
    UnexpectedOutputShape { expected: &'static str, got: &'static str },

    #[error(transparent)]
    Provider(#[from] idp_core::StageError),

    #[error(transparent)]
    Blob(#[from] idp_blob_store::BlobError),

    #[error(transparent)]
    Document(#[from] idp_document::DocumentError),
}

impl ClassificationStageError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClassificationStageError::UnexpectedOutputShape { .. } => ErrorKind::PermanentSchema,
            ClassificationStageError::Provider(e) => e.kind,
            ClassificationStageError::Blob(e) => e.kind(),
            ClassificationStageError::Document(e) => e.kind(),
        }
    }
}
