//! Error type shared by the ledger core and the session driver.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::types::Amount;

#[derive(Debug, Error)]
pub enum LedgerError {
    /// A withdrawal asked for more than the account holds. Nothing was applied.
    #[error("Insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds { requested: Amount, available: Amount },

    /// Applying the amount would leave the balance outside the representable
    /// range. Nothing was applied.
    #[error("Balance overflow: cannot apply {amount} to balance {balance}")]
    BalanceOverflow { balance: Amount, amount: Amount },

    /// A line of the account store or history log could not be parsed.
    #[error("Malformed record `{record}`: {reason}")]
    MalformedRecord { record: String, reason: String },

    /// Writing the account store or history log failed.
    #[error("Failed to write {}: {source}", .path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Reading the account store or history log failed.
    #[error("Failed to read {}: {source}", .path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Authentication failed: {0}")]
    AuthenticationFailure(String),
}

impl LedgerError {
    pub(crate) fn malformed(record: &str, reason: impl ToString) -> Self {
        LedgerError::MalformedRecord {
            record: record.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn persistence(path: impl Into<PathBuf>, source: impl Into<io::Error>) -> Self {
        LedgerError::Persistence {
            path: path.into(),
            source: source.into(),
        }
    }

    pub(crate) fn storage(path: impl Into<PathBuf>, source: impl Into<io::Error>) -> Self {
        LedgerError::Storage {
            path: path.into(),
            source: source.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
