//! Execution context threaded through every stage call: cancellation and
//! timeouts, the two suspension-point concerns every stage shares (§5).

use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Per-attempt execution context. Cloning is cheap: the cancellation token is
/// reference-counted, so cancelling one clone cancels every stage call that
/// was handed a clone of the same `ExecutionContext`.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub document_id: String,
    pub execution_id: String,
    cancellation: CancellationToken,
    pub overall_timeout: Duration,
    pub per_request_timeout: Duration,
}

impl ExecutionContext {
    pub fn new(document_id: impl Into<String>, execution_id: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            execution_id: execution_id.into(),
            cancellation: CancellationToken::new(),
            overall_timeout: Duration::from_secs(600),
            per_request_timeout: Duration::from_secs(60),
        }
    }

    pub fn with_timeouts(mut self, overall: Duration, per_request: Duration) -> Self {
        self.overall_timeout = overall;
        self.per_request_timeout = per_request;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// A context sharing this one's cancellation token but scoped to a
    /// section or page id for logging/span attachment.
    pub fn child(&self) -> Self {
        Self {
            document_id: self.document_id.clone(),
            execution_id: self.execution_id.clone(),
            cancellation: self.cancellation.clone(),
            overall_timeout: self.overall_timeout,
            per_request_timeout: self.per_request_timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cloned_context_shares_cancellation() {
        let ctx = ExecutionContext::new("doc-1", "exec-1");
        let child = ctx.child();
        ctx.cancel();
        assert!(child.is_cancelled());
    }

    #[test]
    fn defaults_match_documented_timeouts() {
        let ctx = ExecutionContext::new("doc-1", "exec-1");
        assert_eq!(ctx.overall_timeout, Duration::from_secs(600));
        assert_eq!(ctx.per_request_timeout, Duration::from_secs(60));
    }
}
