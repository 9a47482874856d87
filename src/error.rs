//! Client-facing error taxonomy and store-error classification.
//!
//! Primary failures surface through [`BrowserError`]. Best-effort enrichment
//! failures (TTL lookups, recommendation checks) are a separate log-only
//! channel and never appear here.

use std::fmt;

use thiserror::Error as ThisError;

use crate::client::ClientError;
use crate::value::Value;

/// Marker the store puts in error replies when a key holds an incompatible
/// data type.
const WRONG_TYPE: &str = "WRONGTYPE";

#[derive(Debug, ThisError, PartialEq)]
pub enum BrowserError {
    /// The target key was absent where an operation expects it to exist.
    #[error("key with this name does not exist")]
    NotFound,
    /// The target key was present where a create expects absence.
    #[error("key with this name already exists")]
    AlreadyExists,
    /// The key exists under a different, incompatible data type.
    #[error("{0}")]
    InvalidInput(String),
    #[error(transparent)]
    Transaction(#[from] TransactionError),
    /// The store rejected the operation on authorization grounds.
    #[error("access denied: {0}")]
    AccessDenied(String),
    #[error("connection error: {0}")]
    Connection(String),
    /// A store failure with no more specific classification.
    #[error(transparent)]
    Store(ClientError),
}

/// One or more commands in a submitted batch failed. The transport executed
/// every entry, so earlier writes may already be applied; the contract is
/// report, not roll back.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionError {
    pub failures: Vec<CommandFailure>,
}

/// Outcome of a single failing command inside a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandFailure {
    /// Position of the command in the submitted batch.
    pub index: usize,
    pub message: String,
}

impl fmt::Display for TransactionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "batch execution failed:")?;
        for failure in &self.failures {
            write!(f, " [{}] {};", failure.index, failure.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for TransactionError {}

fn is_access_denied(message: &str) -> bool {
    message.starts_with("NOPERM") || message.starts_with("NOAUTH")
}

/// Maps a store-reported error onto the client-facing taxonomy. Wrong-type
/// conditions become [`BrowserError::InvalidInput`]; authorization rejections
/// become [`BrowserError::AccessDenied`]; everything else passes through.
pub(crate) fn classify(err: ClientError) -> BrowserError {
    match err {
        ClientError::Store(message) if message.contains(WRONG_TYPE) => {
            BrowserError::InvalidInput(message)
        }
        ClientError::Store(message) if is_access_denied(&message) => {
            BrowserError::AccessDenied(message)
        }
        ClientError::Connection(message) => BrowserError::Connection(message),
        other => BrowserError::Store(other),
    }
}

/// Inspects an ordered batch result command-by-command. The first failure
/// decides between the specific classifications; remaining failures are
/// aggregated so the caller sees every failing index.
pub(crate) fn check_batch(
    results: Vec<Result<Value, ClientError>>,
) -> Result<Vec<Value>, BrowserError> {
    let mut values = Vec::with_capacity(results.len());
    let mut failures = Vec::new();

    for (index, result) in results.into_iter().enumerate() {
        match result {
            Ok(value) => values.push(value),
            Err(err) => {
                let message = err.message();
                if failures.is_empty() {
                    if message.contains(WRONG_TYPE) {
                        return Err(BrowserError::InvalidInput(message.to_string()));
                    }
                    if is_access_denied(message) {
                        return Err(BrowserError::AccessDenied(message.to_string()));
                    }
                }
                failures.push(CommandFailure {
                    index,
                    message: message.to_string(),
                });
            }
        }
    }

    if failures.is_empty() {
        Ok(values)
    } else {
        Err(TransactionError { failures }.into())
    }
}
