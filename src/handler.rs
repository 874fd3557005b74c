use thiserror::Error;

use crate::broker::BrokerError;
use crate::record::LogRecord;

/// Terminal failure of one emit operation, reported after the single
/// delivery retry has also failed.
#[derive(Debug, Error)]
pub enum EmitError {
    #[error(transparent)]
    Broker(#[from] BrokerError),
    #[error("failed to serialise record payload")]
    Serialize(#[from] serde_json::Error),
}

/// Trait implemented by log handlers.
///
/// Handlers are `Send + Sync` so hosts can share them across threads and
/// hand them to the `log` bridge as trait objects. `emit` must never panic
/// or propagate delivery errors into the caller's logging path.
pub trait Handler: Send + Sync {
    /// Deliver one log record, absorbing any failure.
    fn emit(&self, record: &LogRecord);

    /// Release any resources held by the handler.
    fn close(&self) {}
}
