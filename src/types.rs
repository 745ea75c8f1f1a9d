//! Core data types for ATM transactions.
//!
//! # Type Aliases
//!
//! - [`AccountNumber`]: opaque account identifier, the primary key for lookups
//! - [`Amount`]: monetary amounts and balances (Decimal)
//!
//! # Core Types
//!
//! - [`TxKind`]: the closed set of transaction kinds (deposit, withdrawal)
//! - [`Transaction`]: an immutable monetary movement with kind, amount and timestamp
//!
//! # Serialization
//!
//! Kinds are written in uppercase (`DEPOSIT`, `WITHDRAWAL`) and read back
//! case-insensitively. Timestamps use the history log layout
//! `YYYY-MM-DDTHH:MM:SS`.
//!
//! # Examples
//!
//! ```
//! use atm_ledger::types::{Transaction, TxKind};
//! use chrono::NaiveDate;
//! use rust_decimal::Decimal;
//!
//! let at = NaiveDate::from_ymd_opt(2024, 3, 1)
//!     .unwrap()
//!     .and_hms_opt(9, 30, 0)
//!     .unwrap();
//! let tx = Transaction::at(TxKind::Deposit, Decimal::new(50000, 2), at);
//! assert_eq!(tx.summary(), "[2024-03-01 09:30:00] DEPOSIT: 500.00");
//! ```

use std::fmt;
use std::str::FromStr;

use chrono::{Local, NaiveDateTime, SubsecRound};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

use crate::account::Account;
use crate::error::Result;

pub type AccountNumber = String;
pub type Amount = Decimal;

/// Layout used for timestamps in the history log.
pub const LOG_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
/// Layout used for timestamps in statement summaries.
pub const SUMMARY_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// The kind of a transaction.
///
/// - **Deposit**: unconditionally adds the amount to the balance.
/// - **Withdrawal**: removes the amount from the balance, but only when the
///   balance covers it.
#[derive(Debug, Serialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "UPPERCASE")]
pub enum TxKind {
    Deposit,
    Withdrawal,
}

impl TxKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxKind::Deposit => "DEPOSIT",
            TxKind::Withdrawal => "WITHDRAWAL",
        }
    }
}

impl fmt::Display for TxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TxKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("DEPOSIT") {
            Ok(TxKind::Deposit)
        } else if s.eq_ignore_ascii_case("WITHDRAWAL") {
            Ok(TxKind::Withdrawal)
        } else {
            Err(format!("unknown transaction kind: {}", s))
        }
    }
}

/// Case-insensitive deserializer for [`TxKind`].
impl<'de> Deserialize<'de> for TxKind {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct KindVisitor;

        impl<'de> Visitor<'de> for KindVisitor {
            type Value = TxKind;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("DEPOSIT or WITHDRAWAL")
            }

            fn visit_str<E>(self, value: &str) -> std::result::Result<Self::Value, E>
            where
                E: de::Error,
            {
                TxKind::from_str(value).map_err(de::Error::custom)
            }
        }

        deserializer.deserialize_str(KindVisitor)
    }
}

/// A single monetary movement.
///
/// Immutable once constructed. The timestamp is either "now" (truncated to
/// whole seconds) or a historical value supplied while replaying the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transaction {
    kind: TxKind,
    amount: Amount,
    timestamp: NaiveDateTime,
}

impl Transaction {
    /// Creates a transaction stamped with the current local time, truncated
    /// to whole seconds.
    ///
    /// # Arguments
    ///
    /// * `kind` - Deposit or withdrawal
    /// * `amount` - Positive amount; positivity is checked by the caller
    pub fn new(kind: TxKind, amount: Amount) -> Self {
        Self::at(kind, amount, Local::now().naive_local().trunc_subsecs(0))
    }

    /// Creates a transaction with an explicit timestamp, as used when
    /// replaying the history log.
    pub fn at(kind: TxKind, amount: Amount, timestamp: NaiveDateTime) -> Self {
        Transaction {
            kind,
            amount,
            timestamp,
        }
    }

    /// Shorthand for `Transaction::new(TxKind::Deposit, amount)`.
    pub fn deposit(amount: Amount) -> Self {
        Self::new(TxKind::Deposit, amount)
    }

    /// Shorthand for `Transaction::new(TxKind::Withdrawal, amount)`.
    pub fn withdrawal(amount: Amount) -> Self {
        Self::new(TxKind::Withdrawal, amount)
    }

    pub fn kind(&self) -> TxKind {
        self.kind
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }

    /// Applies this transaction to `account` and appends it to the account's
    /// mini-statement.
    ///
    /// There is no deduplication: processing the same transaction twice
    /// applies it twice.
    ///
    /// # Errors
    ///
    /// - [`InsufficientFunds`](crate::error::LedgerError::InsufficientFunds)
    ///   for a withdrawal larger than the balance
    /// - [`BalanceOverflow`](crate::error::LedgerError::BalanceOverflow) when
    ///   the new balance would not be representable
    ///
    /// The account (balance and statement) is left untouched on error.
    pub fn process(&self, account: &Account) -> Result<()> {
        match self.kind {
            TxKind::Deposit => account.deposit(self.amount)?,
            TxKind::Withdrawal => account.withdraw_if_covered(self.amount)?,
        }
        account.record_transaction(*self);
        Ok(())
    }

    /// Renders `[YYYY-MM-DD HH:MM:SS] KIND: amount` with two fraction digits.
    pub fn summary(&self) -> String {
        format!(
            "[{}] {}: {}",
            self.timestamp.format(SUMMARY_TIMESTAMP_FORMAT),
            self.kind,
            two_places(self.amount)
        )
    }
}

/// Rounds half away from zero and pins the scale to exactly two digits.
pub fn two_places(amount: Amount) -> Amount {
    let mut rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded
}

/// `serde(with = ..)` adapter for history log timestamps.
pub(crate) mod log_timestamp {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer, de};

    use super::LOG_TIMESTAMP_FORMAT;

    pub fn serialize<S>(timestamp: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&timestamp.format(LOG_TIMESTAMP_FORMAT))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(raw.trim(), LOG_TIMESTAMP_FORMAT)
            .map_err(|e| de::Error::custom(format!("invalid timestamp `{}`: {}", raw, e)))
    }
}
