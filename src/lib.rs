//! Single-branch ATM ledger.
//!
//! Accounts with PIN credentials, deposit and withdrawal transactions, a
//! bounded mini-statement per account, and CSV persistence: an account store
//! rewritten after every balance change plus an append-only history log that
//! is replayed on startup to rebuild mini-statements.

pub mod account;
pub mod config;
pub mod engine;
pub mod error;
pub mod io;
pub mod session;
pub mod statement;
pub mod types;

pub use account::Account;
pub use config::Config;
pub use engine::{Bank, Ledger, Receipt};
pub use error::{LedgerError, Result};
pub use types::{Amount, Transaction, TxKind};
