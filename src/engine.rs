//! Transaction engine for the ATM ledger.
//!
//! This module owns the in-memory account directory ([`Bank`]) and the
//! [`Ledger`] service that ties it to persistence. A transaction is first
//! applied in memory; only when that succeeds is it appended to the history
//! log and the account store rewritten. Persistence failures never roll back
//! the in-memory state, they are handed back to the caller in the
//! [`Receipt`].

use std::collections::HashMap;
use std::sync::Mutex;

use tracing::{info, warn};

use crate::account::Account;
use crate::config::Config;
use crate::error::{LedgerError, Result};
use crate::io;
use crate::types::{AccountNumber, Amount, Transaction};

/// Accounts in load order, indexed by account number.
///
/// When the same number appears more than once, lookups resolve to the first
/// occurrence; every occurrence is still saved back.
#[derive(Debug, Default)]
pub struct Bank {
    accounts: Vec<Account>,
    index: HashMap<AccountNumber, usize>,
}

impl Bank {
    /// Builds the directory from accounts in load order.
    ///
    /// # Arguments
    ///
    /// * `accounts` - Accounts in the order they appear in the store; this
    ///   order is kept for saving
    pub fn new(accounts: Vec<Account>) -> Self {
        let mut index = HashMap::with_capacity(accounts.len());
        for (pos, account) in accounts.iter().enumerate() {
            index.entry(account.number().to_string()).or_insert(pos);
        }
        Bank { accounts, index }
    }

    /// Looks up an account by number.
    ///
    /// # Returns
    ///
    /// The first account loaded with this number, or `None`.
    pub fn find_account(&self, id: &str) -> Option<&Account> {
        self.index.get(id).map(|&pos| &self.accounts[pos])
    }

    /// Iterates accounts in load order.
    pub fn iter(&self) -> impl Iterator<Item = &Account> {
        self.accounts.iter()
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

/// Outcome of a successfully applied transaction.
#[derive(Debug)]
pub struct Receipt {
    pub transaction: Transaction,
    pub balance: Amount,
    /// Writes that failed after the transaction was applied in memory.
    pub persistence_failures: Vec<LedgerError>,
}

impl Receipt {
    /// `true` when both the history append and the store rewrite succeeded.
    pub fn is_persisted(&self) -> bool {
        self.persistence_failures.is_empty()
    }
}

/// Account directory plus the files it persists to.
///
/// Shareable across sessions: accounts guard themselves, and file writes
/// are serialized by an internal lock.
pub struct Ledger {
    bank: Bank,
    config: Config,
    // Serializes writers of the account store and history log.
    persist: Mutex<()>,
}

impl Ledger {
    /// Bootstraps, loads and replays according to `config`.
    ///
    /// Never fails: a store that cannot be loaded becomes an empty bank, and
    /// a history log that cannot be read leaves statements empty.
    pub fn open(config: Config) -> Self {
        if let Err(e) = io::bootstrap(&config.accounts_path) {
            warn!(error = %e, "could not create sample account store");
        }
        let bank = io::load_accounts(&config.accounts_path, config.statement_capacity);
        if let Err(e) = io::replay_history(&config.history_path, &bank) {
            warn!(error = %e, "failed to replay history");
        }
        info!(accounts = bank.len(), "ledger ready");
        Ledger::with_bank(bank, config)
    }

    /// Wraps an already loaded bank without touching the filesystem.
    ///
    /// # Arguments
    ///
    /// * `bank` - Accounts to serve; their statements are used as they are
    /// * `config` - File locations that later transactions persist to
    pub fn with_bank(bank: Bank, config: Config) -> Self {
        Ledger {
            bank,
            config,
            persist: Mutex::new(()),
        }
    }

    /// Returns the account directory.
    pub fn bank(&self) -> &Bank {
        &self.bank
    }

    /// Returns the configuration the ledger was opened with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Looks up an account by number. See [`Bank::find_account`].
    pub fn find_account(&self, id: &str) -> Option<&Account> {
        self.bank.find_account(id)
    }

    /// Applies `tx` to `account` and persists the result.
    ///
    /// # Errors
    ///
    /// Only the transaction itself can fail
    /// ([`LedgerError::InsufficientFunds`] or [`LedgerError::BalanceOverflow`]);
    /// in that case nothing is written.
    ///
    /// # Returns
    ///
    /// A [`Receipt`] with the new balance and any persistence failures.
    pub fn execute(&self, account: &Account, tx: Transaction) -> Result<Receipt> {
        tx.process(account)?;
        let balance = account.balance();
        info!(
            account = account.number(),
            kind = %tx.kind(),
            amount = %tx.amount(),
            %balance,
            "transaction applied"
        );

        let _guard = self.persist.lock().unwrap_or_else(|e| e.into_inner());
        let mut persistence_failures = Vec::new();
        if let Err(e) = io::append_history(&self.config.history_path, account.number(), &tx) {
            warn!(account = account.number(), error = %e, "failed to write history");
            persistence_failures.push(e);
        }
        if let Err(e) = io::save_accounts(&self.bank, &self.config.accounts_path) {
            warn!(error = %e, "failed to persist accounts");
            persistence_failures.push(e);
        }

        Ok(Receipt {
            transaction: tx,
            balance,
            persistence_failures,
        })
    }

    /// Deposits `amount` stamped with the current time. See [`Ledger::execute`].
    pub fn deposit(&self, account: &Account, amount: Amount) -> Result<Receipt> {
        self.execute(account, Transaction::deposit(amount))
    }

    /// Withdraws `amount` stamped with the current time. See [`Ledger::execute`].
    pub fn withdraw(&self, account: &Account, amount: Amount) -> Result<Receipt> {
        self.execute(account, Transaction::withdrawal(amount))
    }
}
