use idp_core::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuleValidationStageError {
    #[error(transparent)]
    Provider(#[from] idp_core::StageError),

    #[error(transparent)]
    Blob(#[from] idp_blob_store::BlobError),
}

impl RuleValidationStageError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RuleValidationStageError::Provider(e) => e.kind,
            RuleValidationStageError::Blob(e) => e.kind(),
        }
    }
}
