//! Error types for the token ledger

use thiserror::Error;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ledger errors
#[derive(Error, Debug)]
pub enum Error {
    /// An addition would exceed the maximum representable quantity
    #[error("Arithmetic overflow")]
    Overflow,

    /// A subtraction's subtrahend exceeds the minuend
    #[error("Arithmetic underflow")]
    Underflow,

    /// Debit larger than the account balance
    #[error("Insufficient balance: have {have}, need {need}")]
    InsufficientBalance {
        /// Current balance of the debited account
        have: u64,
        /// Requested amount
        need: u64,
    },

    /// Unrecoverable resource exhaustion in the history log (position space
    /// or memory budget)
    #[error("Fatal error: {0}")]
    Fatal(String),

    /// History entry that does not describe a mint, transfer or burn
    #[error("Invalid history entry: {0}")]
    InvalidEntry(String),

    /// Invariant violation (supply conservation, etc.)
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Concurrency error (actor mailbox closed, etc.)
    #[error("Concurrency error: {0}")]
    Concurrency(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Prometheus registration error
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether the error was caused by the request itself rather than the ledger
    ///
    /// Rejected requests leave the ledger untouched and may be corrected and
    /// resubmitted by the caller.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Error::Overflow | Error::Underflow | Error::InsufficientBalance { .. }
        )
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Other(msg)
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Other(msg.to_string())
    }
}
