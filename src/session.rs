//! Interactive console session driving the ledger.
//!
//! The session is generic over its input and output so it can run on
//! stdin/stdout or on in-memory buffers. Amount policy (positive amounts,
//! withdrawal ceiling) and PIN attempt limiting live here, not in the core.

use std::io::{BufRead, Write};
use std::str::FromStr;

use anyhow::{Context, Result};
use rust_decimal::Decimal;

use crate::account::Account;
use crate::engine::{Ledger, Receipt};
use crate::error::LedgerError;
use crate::types::{Amount, two_places};

enum Auth {
    Granted,
    Denied(LedgerError),
    EndOfInput,
}

/// Checks a user-entered amount against the driver's policy.
///
/// # Arguments
///
/// * `input` - Raw user input
/// * `ceiling` - Largest accepted amount; pass it for withdrawals only
///
/// # Errors
///
/// Returns the message to show the user when the input is not a decimal,
/// is not positive, or exceeds the ceiling.
pub fn parse_amount(input: &str, ceiling: Option<Amount>) -> std::result::Result<Amount, String> {
    let amount = Decimal::from_str(input.trim())
        .map_err(|_| "Invalid numeric input for amount.".to_string())?;
    if amount <= Decimal::ZERO {
        return Err("Amount must be positive.".to_string());
    }
    if let Some(ceiling) = ceiling {
        if amount > ceiling {
            return Err(format!(
                "Withdrawal exceeds single-transaction limit of {}.",
                ceiling
            ));
        }
    }
    Ok(amount)
}

fn is_well_formed_pin(pin: &str) -> bool {
    pin.len() == 4 && pin.bytes().all(|b| b.is_ascii_digit())
}

/// One console session over a shared [`Ledger`].
pub struct Session<'a, R, W> {
    ledger: &'a Ledger,
    input: R,
    output: W,
}

impl<'a, R: BufRead, W: Write> Session<'a, R, W> {
    /// Creates a session reading commands from `input` and writing prompts
    /// and results to `output`.
    pub fn new(ledger: &'a Ledger, input: R, output: W) -> Self {
        Session {
            ledger,
            input,
            output,
        }
    }

    /// Consumes the session and returns its output sink.
    pub fn into_output(self) -> W {
        self.output
    }

    /// Runs account selection until `exit` or end of input.
    ///
    /// # Errors
    ///
    /// Fails only when reading input or writing output fails. Ledger errors
    /// are shown to the user and the session continues.
    pub fn run(&mut self) -> Result<()> {
        writeln!(self.output, "Welcome to ATM Simulator\n")?;

        loop {
            let Some(id) = self.prompt("Enter account number (or 'exit'): ")? else {
                break;
            };
            if id.eq_ignore_ascii_case("exit") {
                break;
            }

            let ledger = self.ledger;
            let Some(account) = ledger.find_account(&id) else {
                writeln!(self.output, "Account not found. Try again.\n")?;
                continue;
            };

            match self.authenticate(account)? {
                Auth::Granted => {
                    writeln!(self.output, "Welcome, {}!\n", account.holder_name())?;
                }
                Auth::Denied(e) => {
                    writeln!(self.output, "{}\n", e)?;
                    continue;
                }
                Auth::EndOfInput => break,
            }

            if !self.menu(account)? {
                break;
            }
        }

        writeln!(self.output, "Thank you for using ATM Simulator. Goodbye!")?;
        self.output.flush().context("Failed to flush output")?;
        Ok(())
    }

    fn prompt(&mut self, text: &str) -> Result<Option<String>> {
        write!(self.output, "{}", text)?;
        self.output.flush().context("Failed to flush output")?;

        let mut line = String::new();
        let read = self
            .input
            .read_line(&mut line)
            .context("Failed to read input")?;
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    fn authenticate(&mut self, account: &Account) -> Result<Auth> {
        let max_attempts = self.ledger.config().max_pin_attempts;
        let mut attempts = 0;

        while attempts < max_attempts {
            let Some(pin) = self.prompt("Enter 4-digit PIN: ")? else {
                return Ok(Auth::EndOfInput);
            };
            attempts += 1;

            if !is_well_formed_pin(&pin) {
                writeln!(
                    self.output,
                    "PIN must be 4 digits. Attempts left: {}",
                    max_attempts - attempts
                )?;
                continue;
            }
            if account.validate_credential(&pin) {
                return Ok(Auth::Granted);
            }
            writeln!(
                self.output,
                "Invalid PIN. Attempts left: {}",
                max_attempts - attempts
            )?;
        }

        tracing::warn!(account = account.number(), "too many invalid PIN attempts");
        Ok(Auth::Denied(LedgerError::AuthenticationFailure(
            "Too many invalid PIN attempts. Returning to account selection.".to_string(),
        )))
    }

    /// Runs the transaction menu. Returns `false` when input ended.
    fn menu(&mut self, account: &Account) -> Result<bool> {
        loop {
            writeln!(self.output, "--- Transaction Menu ---")?;
            writeln!(self.output, "1. Check Balance")?;
            writeln!(self.output, "2. Deposit")?;
            writeln!(self.output, "3. Withdraw")?;
            writeln!(self.output, "4. Mini-statement")?;
            writeln!(self.output, "5. Logout")?;
            let Some(choice) = self.prompt("Choose an option: ")? else {
                return Ok(false);
            };

            match choice.as_str() {
                "1" => writeln!(
                    self.output,
                    "Current balance: {}",
                    two_places(account.balance())
                )?,
                "2" => self.deposit(account)?,
                "3" => self.withdraw(account)?,
                "4" => self.mini_statement(account)?,
                "5" => {
                    writeln!(self.output, "Logged out.\n")?;
                    return Ok(true);
                }
                _ => writeln!(self.output, "Invalid option. Try again.")?,
            }
        }
    }

    fn deposit(&mut self, account: &Account) -> Result<()> {
        let Some(input) = self.prompt("Enter amount to deposit: ")? else {
            return Ok(());
        };
        let amount = match parse_amount(&input, None) {
            Ok(amount) => amount,
            Err(message) => {
                writeln!(self.output, "{}", message)?;
                return Ok(());
            }
        };

        match self.ledger.deposit(account, amount) {
            Ok(receipt) => {
                writeln!(
                    self.output,
                    "Deposited {} successfully. New balance: {}",
                    two_places(amount),
                    two_places(receipt.balance)
                )?;
                self.report_persistence(&receipt)?;
            }
            Err(e) => writeln!(self.output, "Deposit failed: {}", e)?,
        }
        Ok(())
    }

    fn withdraw(&mut self, account: &Account) -> Result<()> {
        let Some(input) = self.prompt("Enter amount to withdraw: ")? else {
            return Ok(());
        };
        let ceiling = self.ledger.config().withdrawal_ceiling;
        let amount = match parse_amount(&input, Some(ceiling)) {
            Ok(amount) => amount,
            Err(message) => {
                writeln!(self.output, "{}", message)?;
                return Ok(());
            }
        };

        match self.ledger.withdraw(account, amount) {
            Ok(receipt) => {
                writeln!(
                    self.output,
                    "Withdrawn {} successfully. New balance: {}",
                    two_places(amount),
                    two_places(receipt.balance)
                )?;
                self.report_persistence(&receipt)?;
            }
            Err(e) => writeln!(self.output, "Withdrawal failed: {}", e)?,
        }
        Ok(())
    }

    fn mini_statement(&mut self, account: &Account) -> Result<()> {
        let statement = account.recent_transactions();
        if statement.is_empty() {
            writeln!(self.output, "No transactions yet.")?;
            return Ok(());
        }

        writeln!(self.output, "Mini-statement (most recent first):")?;
        for tx in statement.iter().rev() {
            writeln!(self.output, "{}", tx.summary())?;
        }
        Ok(())
    }

    fn report_persistence(&mut self, receipt: &Receipt) -> Result<()> {
        for failure in &receipt.persistence_failures {
            writeln!(self.output, "Warning: {}", failure)?;
        }
        Ok(())
    }
}
