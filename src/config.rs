//! Runtime configuration and policy constants.

use std::path::PathBuf;

use rust_decimal::Decimal;

use crate::types::Amount;

pub const ACCOUNTS_FILE: &str = "accounts.csv";
pub const HISTORY_FILE: &str = "transaction_history.csv";
/// Number of transactions kept in every account's mini-statement.
pub const MINI_STATEMENT_CAPACITY: usize = 20;
/// Largest amount a single withdrawal may request.
pub const WITHDRAWAL_CEILING: i64 = 50_000;
pub const MAX_PIN_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone)]
pub struct Config {
    pub accounts_path: PathBuf,
    pub history_path: PathBuf,
    pub statement_capacity: usize,
    pub withdrawal_ceiling: Amount,
    pub max_pin_attempts: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            accounts_path: PathBuf::from(ACCOUNTS_FILE),
            history_path: PathBuf::from(HISTORY_FILE),
            statement_capacity: MINI_STATEMENT_CAPACITY,
            withdrawal_ceiling: Decimal::from(WITHDRAWAL_CEILING),
            max_pin_attempts: MAX_PIN_ATTEMPTS,
        }
    }
}

impl Config {
    /// Default policy with both files placed under `dir`.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Config {
            accounts_path: dir.join(ACCOUNTS_FILE),
            history_path: dir.join(HISTORY_FILE),
            ..Config::default()
        }
    }
}
