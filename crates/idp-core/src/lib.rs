//! Shared plumbing for the IDP pipeline crates: error taxonomy, execution
//! context, retry discipline, and resolved configuration.

pub mod config;
pub mod context;
pub mod error;
pub mod retry;
pub mod telemetry;

pub use config::Config;
pub use context::ExecutionContext;
pub use error::{CoreError, ErrorKind, StageError};
pub use retry::{retry_stage, RetryConfig};
pub use tokio_util::sync::CancellationToken;
