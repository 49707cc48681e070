use idp_core::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OcrStageError {
    #[error("document has zero pages")]
    EmptyDocument,

    #[error("page {page_id}: {source}")]
    Page {
        page_id: String,
        #[source]
        source: idp_core::StageError,
    },

    #[error(transparent)]
    Blob(#[from] idp_blob_store::BlobError),

    #[error(transparent)]
    Document(#[from] idp_document::DocumentError),
}

impl OcrStageError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            OcrStageError::EmptyDocument => ErrorKind::PermanentInput,
            OcrStageError::Page { source, .. } => source.kind,
            OcrStageError::Blob(e) => e.kind(),
            OcrStageError::Document(e) => e.kind(),
        }
    }
}
