use shared::ServerStatus;
use thiserror::Error;

/// Every failure a dashboard operation can report.
///
/// None of these are fatal: the operation that raised one has left all state
/// as it was before the call.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DashboardError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("cannot {action} server while it is {status}")]
    LifecycleConflict {
        action: &'static str,
        status: ServerStatus,
    },

    #[error("command rejected: command text is empty")]
    DispatchRejected,

    #[error("malformed property on line {line}: {content:?}")]
    PropertyParse { line: usize, content: String },

    #[error("invalid value {value:?} for property {key}: {reason}")]
    InvalidProperty {
        key: String,
        value: String,
        reason: String,
    },

    #[error("world conflict: {0}")]
    WorldConflict(String),

    #[error("command unavailable: {0}")]
    Unavailable(String),
}

pub type Result<T> = std::result::Result<T, DashboardError>;
