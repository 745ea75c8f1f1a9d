//! Bank account entity.
//!
//! An [`Account`] owns its balance and mini-statement behind separate
//! per-account locks, so sessions working on different accounts never
//! contend with each other.

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, Result};
use crate::statement::MiniStatement;
use crate::types::{AccountNumber, Amount, Transaction};

#[derive(Debug)]
pub struct Account {
    number: AccountNumber,
    holder_name: String,
    pin: String,
    balance: Mutex<Amount>,
    statement: Mutex<MiniStatement>,
}

/// Flat record layout of the account store: `number,holder,pin,balance`.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct AccountRecord {
    pub number: AccountNumber,
    pub holder_name: String,
    pub pin: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub balance: Amount,
}

/// The guarded values stay consistent even if a holder panicked, so a
/// poisoned lock is simply taken over.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Account {
    /// Creates an account with an empty mini-statement.
    ///
    /// # Arguments
    ///
    /// * `number` - Account number, the primary key for lookups
    /// * `holder_name` - Display name of the account holder
    /// * `pin` - Credential compared verbatim by [`Account::validate_credential`]
    /// * `balance` - Opening balance
    /// * `statement_capacity` - How many recent transactions the mini-statement keeps
    pub fn new(
        number: impl Into<AccountNumber>,
        holder_name: impl Into<String>,
        pin: impl Into<String>,
        balance: Amount,
        statement_capacity: usize,
    ) -> Self {
        Account {
            number: number.into(),
            holder_name: holder_name.into(),
            pin: pin.into(),
            balance: Mutex::new(balance),
            statement: Mutex::new(MiniStatement::with_capacity(statement_capacity)),
        }
    }

    /// Returns the account number.
    pub fn number(&self) -> &str {
        &self.number
    }

    /// Returns the holder's display name as loaded (commas are only replaced
    /// when writing).
    pub fn holder_name(&self) -> &str {
        &self.holder_name
    }

    /// Exact comparison against the stored PIN. Attempt limiting is the
    /// caller's job.
    pub fn validate_credential(&self, attempt: &str) -> bool {
        self.pin == attempt
    }

    /// Returns the current balance.
    pub fn balance(&self) -> Amount {
        *lock(&self.balance)
    }

    /// Adds `amount` to the balance. Does not touch the statement.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::BalanceOverflow`] when the sum is not
    /// representable; the balance is left unchanged.
    pub fn deposit(&self, amount: Amount) -> Result<()> {
        let mut balance = lock(&self.balance);
        *balance = balance
            .checked_add(amount)
            .ok_or(LedgerError::BalanceOverflow {
                balance: *balance,
                amount,
            })?;
        Ok(())
    }

    /// Subtracts `amount` from the balance unconditionally. Does not touch
    /// the statement.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::BalanceOverflow`] when the difference is not
    /// representable; the balance is left unchanged.
    pub fn withdraw(&self, amount: Amount) -> Result<()> {
        let mut balance = lock(&self.balance);
        *balance = balance
            .checked_sub(amount)
            .ok_or(LedgerError::BalanceOverflow {
                balance: *balance,
                amount,
            })?;
        Ok(())
    }

    /// Subtracts `amount` only if the balance covers it, checking and
    /// mutating under a single lock.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InsufficientFunds`] when `amount` exceeds the balance
    /// - [`LedgerError::BalanceOverflow`] when the difference is not representable
    ///
    /// The balance is left unchanged in both cases.
    pub fn withdraw_if_covered(&self, amount: Amount) -> Result<()> {
        let mut balance = lock(&self.balance);
        if amount > *balance {
            return Err(LedgerError::InsufficientFunds {
                requested: amount,
                available: *balance,
            });
        }
        *balance = balance
            .checked_sub(amount)
            .ok_or(LedgerError::BalanceOverflow {
                balance: *balance,
                amount,
            })?;
        Ok(())
    }

    /// Appends `tx` to the mini-statement, evicting the oldest entry when full.
    pub fn record_transaction(&self, tx: Transaction) {
        lock(&self.statement).push(tx);
    }

    /// Snapshot of the mini-statement, oldest first.
    pub fn recent_transactions(&self) -> Vec<Transaction> {
        lock(&self.statement).snapshot()
    }

    /// Returns the fixed capacity of the mini-statement.
    pub fn statement_capacity(&self) -> usize {
        lock(&self.statement).capacity()
    }

    pub(crate) fn to_record(&self) -> AccountRecord {
        AccountRecord {
            number: self.number.clone(),
            holder_name: self.holder_name.replace(',', " "),
            pin: self.pin.clone(),
            balance: self.balance(),
        }
    }

    pub(crate) fn from_record(record: AccountRecord, statement_capacity: usize) -> Self {
        Account::new(
            record.number,
            record.holder_name,
            record.pin,
            record.balance,
            statement_capacity,
        )
    }

    /// Serializes the account as one account-store line (no line terminator).
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::MalformedRecord`] if the record cannot be
    /// encoded as CSV.
    pub fn to_csv_line(&self) -> Result<String> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::new());
        writer
            .serialize(self.to_record())
            .map_err(|e| LedgerError::malformed(&self.number, e))?;
        let bytes = writer
            .into_inner()
            .map_err(|e| LedgerError::malformed(&self.number, e.error()))?;
        let line = String::from_utf8(bytes).map_err(|e| LedgerError::malformed(&self.number, e))?;
        Ok(line.trim_end().to_string())
    }

    /// Parses one account-store line.
    ///
    /// Fields are trimmed; anything past the fourth field is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::MalformedRecord`] when fewer than four fields
    /// are present or the balance is not a decimal number.
    pub fn from_csv_line(line: &str, statement_capacity: usize) -> Result<Self> {
        let record = crate::io::parse_line::<AccountRecord>(line)?;
        Ok(Account::from_record(record, statement_capacity))
    }
}

impl std::fmt::Display for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.number, self.holder_name)
    }
}
