use idp_core::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SummarizationStageError {
    #[error(transparent)]
    Provider(#[from] idp_core::StageError),

    #[error(transparent)]
    Blob(#[from] idp_blob_store::BlobError),
}

impl SummarizationStageError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SummarizationStageError::Provider(e) => e.kind,
            SummarizationStageError::Blob(e) => e.kind(),
        }
    }
}
