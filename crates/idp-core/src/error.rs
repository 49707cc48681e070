//! Shared error taxonomy consumed by every stage crate.

use thiserror::Error;

/// The error *kind* taxonomy every stage-level error carries, independent of
/// which crate raised it. The orchestrator dispatches retry policy on this,
/// never on a crate's concrete error type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    TransientIo,
    TransientProvider,
    PermanentSchema,
    PermanentInput,
    Cancelled,
    AdmissionRejected,
    Unknown,
}

impl ErrorKind {
    /// Whether the retry discipline in `idp_core::retry` should re-attempt
    /// the stage call that produced this error.
    pub fn is_transient(self) -> bool {
        matches!(self, ErrorKind::TransientIo | ErrorKind::TransientProvider)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ErrorKind::Cancelled)
            || matches!(
                self,
                ErrorKind::PermanentSchema | ErrorKind::PermanentInput
            )
    }
}

/// A stage-level error: a classified kind plus a human-readable message and
/// an optional section/page id the error pertains to.
#[derive(Debug, Error, Clone)]
#[error("{kind:?}: {message}")]
pub struct StageError {
    pub kind: ErrorKind,
    pub message: String,
    /// The section or page id this error is attached to, if any. A document-
    /// level error (e.g. the whole OCR stage failing) leaves this `None`.
    pub scope: Option<String>,
}

impl StageError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            scope: None,
        }
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    pub fn transient_io(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TransientIo, message)
    }

    pub fn transient_provider(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TransientProvider, message)
    }

    pub fn permanent_schema(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::PermanentSchema, message)
    }

    pub fn permanent_input(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::PermanentInput, message)
    }

    pub fn cancelled() -> Self {
        Self::new(ErrorKind::Cancelled, "cancelled")
    }
}

/// Errors raised by `idp-core` itself (config loading, retry plumbing).
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Retries exhausted after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: StageError },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_kinds_retry() {
        assert!(ErrorKind::TransientIo.is_transient());
        assert!(ErrorKind::TransientProvider.is_transient());
        assert!(!ErrorKind::PermanentSchema.is_transient());
        assert!(!ErrorKind::Cancelled.is_transient());
    }

    #[test]
    fn stage_error_scope() {
        let e = StageError::permanent_schema("bad type").with_scope("section-1");
        assert_eq!(e.scope.as_deref(), Some("section-1"));
        assert_eq!(e.kind, ErrorKind::PermanentSchema);
    }
}
