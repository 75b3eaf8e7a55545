use crate::transaction::TransactionId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MockError {
    #[error("Mock transport is already installed; uninstall it first")]
    AlreadyInstalled,

    #[error("Mock transport is not installed")]
    NotInstalled,

    #[error("Tracker is installed on a different client")]
    WrongClient,

    #[error("Query record already has a response")]
    AlreadyResponded,

    #[error("Transaction scope {0} is already closed")]
    ScopeClosed(TransactionId),

    #[error("Unknown transaction scope: {0}")]
    UnknownTransaction(TransactionId),

    #[error("No active transaction")]
    NoActiveTransaction,

    #[error("Query failed: {0}")]
    QueryFailure(String),

    #[error("No transport installed; connect a transport or install a tracker first")]
    Disconnected,

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Lock error: {0}")]
    LockError(String),
}

pub type Result<T> = std::result::Result<T, MockError>;

impl<T> From<std::sync::PoisonError<T>> for MockError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::LockError(err.to_string())
    }
}
