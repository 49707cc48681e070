use idp_core::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("document for this input location is already running")]
    AlreadyRunning,

    #[error("queue depth exceeds the backpressure watermark")]
    BackPressure,

    #[error(transparent)]
    Document(#[from] idp_document::DocumentError),
}

impl IntakeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            IntakeError::AlreadyRunning => ErrorKind::AdmissionRejected,
            IntakeError::BackPressure => ErrorKind::AdmissionRejected,
            IntakeError::Document(e) => e.kind(),
        }
    }
}
