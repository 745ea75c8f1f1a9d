//! Input/Output operations for the account store and the history log.
//!
//! Both files are headerless, line-oriented CSV:
//!
//! - account store: `accountNumber,holderName,pin,balance`, rewritten in full
//!   after every balance change
//! - history log: `accountId,KIND,amount,timestamp`, append-only
//!
//! Loading the account store is all-or-nothing: one bad line fails the whole
//! load, which [`load_accounts`] turns into an empty bank and a warning.
//! Replaying the history log skips bad lines one at a time.

use std::fs::{self, File, OpenOptions};
use std::path::Path;

use chrono::NaiveDateTime;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::account::Account;
use crate::engine::Bank;
use crate::error::{LedgerError, Result};
use crate::types::{AccountNumber, Amount, Transaction, TxKind, log_timestamp, two_places};

/// Every record in both files has exactly this many meaningful fields.
const RECORD_FIELDS: usize = 4;

/// Accounts written when the store does not exist yet.
pub const SAMPLE_ACCOUNTS: [&str; 6] = [
    "1001,Rupesh Saini,1234,176381",
    "1002,Ansh Rana,2345,50087",
    "1003,Monish Yadav,3456,17393",
    "1004,Tanishq Kapil,4567,80980",
    "1005,Mridul Sharma,5678,20500",
    "1006,Maulik Chopra,6789,49070",
];

/// One line of the history log.
#[derive(Debug, Serialize, Deserialize)]
struct HistoryRecord {
    account: AccountNumber,
    kind: TxKind,
    #[serde(with = "rust_decimal::serde::str")]
    amount: Amount,
    #[serde(with = "log_timestamp")]
    timestamp: NaiveDateTime,
}

/// Counts gathered while replaying the history log.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReplayStats {
    pub replayed: usize,
    pub unknown_account: usize,
    pub malformed: usize,
}

/// Parses a single CSV line into `T`, looking only at its first four fields.
pub(crate) fn parse_line<T: DeserializeOwned>(line: &str) -> Result<T> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(line.as_bytes());

    let record = reader
        .records()
        .next()
        .transpose()
        .map_err(|e| LedgerError::malformed(line, e))?
        .unwrap_or_default();

    if record.len() < RECORD_FIELDS {
        return Err(LedgerError::malformed(
            line,
            format!("expected {} fields, found {}", RECORD_FIELDS, record.len()),
        ));
    }

    let record: csv::StringRecord = record.iter().take(RECORD_FIELDS).collect();
    record
        .deserialize(None)
        .map_err(|e| LedgerError::malformed(line, e))
}

/// Writes the sample account set to `path` unless the file already exists.
///
/// Returns `true` when the file was created.
pub fn bootstrap(path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    let mut contents = SAMPLE_ACCOUNTS.join("\n");
    contents.push('\n');
    fs::write(path, contents).map_err(|e| LedgerError::persistence(path, e))?;
    info!(path = %path.display(), "created sample account store");
    Ok(true)
}

/// Reads every non-blank line of the account store, in file order.
///
/// # Errors
///
/// Fails on the first line that does not parse, or if the file cannot be read.
pub fn read_accounts(path: &Path, statement_capacity: usize) -> Result<Vec<Account>> {
    let contents = fs::read_to_string(path).map_err(|e| LedgerError::storage(path, e))?;

    contents
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| Account::from_csv_line(line, statement_capacity))
        .collect()
}

/// Loads the account store, failing open.
///
/// Any read or parse failure yields an empty bank and a warning instead of
/// an error.
pub fn load_accounts(path: &Path, statement_capacity: usize) -> Bank {
    match read_accounts(path, statement_capacity) {
        Ok(accounts) => {
            info!(path = %path.display(), count = accounts.len(), "loaded accounts");
            Bank::new(accounts)
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to load accounts");
            Bank::default()
        }
    }
}

/// Overwrites the account store with one line per account, in bank order.
///
/// Not transactional: a crash midway leaves a partially written file.
pub fn save_accounts(bank: &Bank, path: &Path) -> Result<()> {
    let file = File::create(path).map_err(|e| LedgerError::persistence(path, e))?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);

    for account in bank.iter() {
        writer
            .serialize(account.to_record())
            .map_err(|e| LedgerError::persistence(path, e))?;
    }

    writer
        .flush()
        .map_err(|e| LedgerError::persistence(path, e))?;
    debug!(path = %path.display(), count = bank.len(), "saved accounts");
    Ok(())
}

/// Appends one transaction line to the history log, creating it if needed.
pub fn append_history(path: &Path, account_id: &str, tx: &Transaction) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| LedgerError::persistence(path, e))?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);

    writer
        .serialize(HistoryRecord {
            account: account_id.to_string(),
            kind: tx.kind(),
            amount: two_places(tx.amount()),
            timestamp: tx.timestamp(),
        })
        .map_err(|e| LedgerError::persistence(path, e))?;
    writer
        .flush()
        .map_err(|e| LedgerError::persistence(path, e))?;
    Ok(())
}

/// Rebuilds mini-statements from the history log.
///
/// Each entry for a known account is recorded with its stored timestamp.
/// Balances are never touched. Unknown accounts and malformed lines,
/// including lines that are not valid UTF-8, are skipped one at a time.
/// A missing log means there is nothing to replay.
///
/// # Errors
///
/// Returns [`LedgerError::Storage`] only when the log exists but cannot be
/// read at all.
pub fn replay_history(path: &Path, bank: &Bank) -> Result<ReplayStats> {
    let mut stats = ReplayStats::default();
    if !path.exists() {
        return Ok(stats);
    }

    let contents = fs::read(path).map_err(|e| LedgerError::storage(path, e))?;

    for (idx, raw) in contents.split(|&b| b == b'\n').enumerate() {
        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
        let line = match std::str::from_utf8(raw) {
            Ok(line) => line,
            Err(e) => {
                debug!(line = idx + 1, error = %e, "skipping undecodable history line");
                stats.malformed += 1;
                continue;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        let record = match parse_line::<HistoryRecord>(line) {
            Ok(record) => record,
            Err(e) => {
                debug!(line = idx + 1, error = %e, "skipping history line");
                stats.malformed += 1;
                continue;
            }
        };
        match bank.find_account(&record.account) {
            Some(account) => {
                account.record_transaction(Transaction::at(
                    record.kind,
                    record.amount,
                    record.timestamp,
                ));
                stats.replayed += 1;
            }
            None => stats.unknown_account += 1,
        }
    }

    info!(
        path = %path.display(),
        replayed = stats.replayed,
        unknown_account = stats.unknown_account,
        malformed = stats.malformed,
        "replayed history"
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use std::str::FromStr;
    use tempfile::TempDir;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    fn sample_bank(dir: &TempDir, capacity: usize) -> Bank {
        let path = dir.path().join("accounts.csv");
        bootstrap(&path).unwrap();
        load_accounts(&path, capacity)
    }

    #[test]
    fn bootstrap_writes_sample_accounts_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("accounts.csv");

        assert!(bootstrap(&path).unwrap());
        fs::write(&path, "2001,Someone Else,1111,5\n").unwrap();
        assert!(!bootstrap(&path).unwrap());

        let accounts = read_accounts(&path, 20).unwrap();
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].number(), "2001");
    }

    #[test]
    fn load_preserves_file_order_and_skips_blank_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("accounts.csv");
        fs::write(&path, "1002,Ansh Rana,2345,50087\n\n   \n1001,Rupesh Saini,1234,176381\n").unwrap();

        let bank = load_accounts(&path, 20);

        let numbers: Vec<&str> = bank.iter().map(|a| a.number()).collect();
        assert_eq!(numbers, vec!["1002", "1001"]);
        assert_eq!(
            bank.find_account("1002").unwrap().balance(),
            Decimal::from(50087)
        );
    }

    #[test]
    fn one_bad_line_fails_the_whole_load_open() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("accounts.csv");
        fs::write(&path, "1001,Rupesh Saini,1234,176381\n1002,Ansh Rana,2345\n").unwrap();

        assert!(matches!(
            read_accounts(&path, 20),
            Err(LedgerError::MalformedRecord { .. })
        ));
        assert!(load_accounts(&path, 20).is_empty());
    }

    #[test]
    fn missing_store_loads_empty() {
        let dir = TempDir::new().unwrap();

        assert!(matches!(
            read_accounts(&dir.path().join("nope.csv"), 20),
            Err(LedgerError::Storage { .. })
        ));
        assert!(load_accounts(&dir.path().join("nope.csv"), 20).is_empty());
    }

    #[test]
    fn save_then_load_keeps_balances() {
        let dir = TempDir::new().unwrap();
        let bank = sample_bank(&dir, 20);
        bank.find_account("1001")
            .unwrap()
            .deposit(Decimal::from_str("500.00").unwrap())
            .unwrap();

        let path = dir.path().join("saved.csv");
        save_accounts(&bank, &path).unwrap();
        let reloaded = load_accounts(&path, 20);

        assert_eq!(reloaded.len(), SAMPLE_ACCOUNTS.len());
        assert_eq!(
            reloaded.find_account("1001").unwrap().balance(),
            Decimal::from_str("176881.00").unwrap()
        );
        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().next(), Some("1001,Rupesh Saini,1234,176881.00"));
    }

    #[test]
    fn save_to_unwritable_path_reports_persistence_failure() {
        let dir = TempDir::new().unwrap();
        let bank = sample_bank(&dir, 20);

        let err = save_accounts(&bank, &dir.path().join("missing").join("accounts.csv")).unwrap_err();

        assert!(matches!(err, LedgerError::Persistence { .. }));
    }

    #[test]
    fn append_history_writes_fixed_format_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.csv");

        let deposit = Transaction::at(TxKind::Deposit, Decimal::from(500), at(9, 30, 0));
        let withdrawal = Transaction::at(
            TxKind::Withdrawal,
            Decimal::from_str("12.5").unwrap(),
            at(9, 31, 7),
        );
        append_history(&path, "1001", &deposit).unwrap();
        append_history(&path, "1002", &withdrawal).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(
            lines,
            vec![
                "1001,DEPOSIT,500.00,2024-03-01T09:30:00",
                "1002,WITHDRAWAL,12.50,2024-03-01T09:31:07",
            ]
        );
    }

    #[test]
    fn replay_rebuilds_statement_without_touching_balance() {
        let dir = TempDir::new().unwrap();
        let bank = sample_bank(&dir, 20);
        let history = dir.path().join("history.csv");
        fs::write(
            &history,
            "1001,DEPOSIT,500.00,2024-03-01T09:30:00\n\
             9999,DEPOSIT,1.00,2024-03-01T09:30:01\n\
             1001,withdrawal,20.00,2024-03-01T09:31:00\n\
             1001,TRANSFER,5.00,2024-03-01T09:32:00\n\
             1001,DEPOSIT,abc,2024-03-01T09:33:00\n\
             1001,DEPOSIT,7.00\n\
             \n\
             1002,Deposit,3.00,2024-03-01T10:00:00\n",
        )
        .unwrap();

        let stats = replay_history(&history, &bank).unwrap();

        assert_eq!(
            stats,
            ReplayStats {
                replayed: 3,
                unknown_account: 1,
                malformed: 3,
            }
        );
        let account = bank.find_account("1001").unwrap();
        assert_eq!(account.balance(), Decimal::from(176381));
        assert_eq!(
            account.recent_transactions(),
            vec![
                Transaction::at(TxKind::Deposit, Decimal::from(500), at(9, 30, 0)),
                Transaction::at(TxKind::Withdrawal, Decimal::from(20), at(9, 31, 0)),
            ]
        );
        assert_eq!(bank.find_account("1002").unwrap().recent_transactions().len(), 1);
    }

    #[test]
    fn replay_skips_undecodable_line_only() {
        let dir = TempDir::new().unwrap();
        let bank = sample_bank(&dir, 20);
        let history = dir.path().join("history.csv");
        let mut contents = b"1001,DEPOSIT,500.00,2024-03-01T09:30:00\r\n".to_vec();
        contents.extend_from_slice(b"1001,DEPOSIT,\xff\xfe,2024-03-01T09:30:30\n");
        contents.extend_from_slice(b"1001,WITHDRAWAL,20.00,2024-03-01T09:31:00\n");
        fs::write(&history, contents).unwrap();

        let stats = replay_history(&history, &bank).unwrap();

        assert_eq!(
            stats,
            ReplayStats {
                replayed: 2,
                unknown_account: 0,
                malformed: 1,
            }
        );
        assert_eq!(
            bank.find_account("1001").unwrap().recent_transactions(),
            vec![
                Transaction::at(TxKind::Deposit, Decimal::from(500), at(9, 30, 0)),
                Transaction::at(TxKind::Withdrawal, Decimal::from(20), at(9, 31, 0)),
            ]
        );
    }

    #[test]
    fn replay_keeps_only_last_capacity_entries() {
        let dir = TempDir::new().unwrap();
        let bank = sample_bank(&dir, 20);
        let history = dir.path().join("history.csv");
        for minute in 0..45 {
            let tx = Transaction::at(TxKind::Deposit, Decimal::from(minute + 1), at(11, minute, 0));
            append_history(&history, "1003", &tx).unwrap();
        }

        replay_history(&history, &bank).unwrap();

        let statement = bank.find_account("1003").unwrap().recent_transactions();
        assert_eq!(statement.len(), 20);
        assert_eq!(statement[0].amount(), Decimal::from(26));
        assert_eq!(statement[19].amount(), Decimal::from(45));
    }

    #[test]
    fn replay_is_deterministic() {
        let dir = TempDir::new().unwrap();
        let history = dir.path().join("history.csv");
        for minute in 0..30 {
            let kind = if minute % 3 == 0 {
                TxKind::Withdrawal
            } else {
                TxKind::Deposit
            };
            let tx = Transaction::at(kind, Decimal::new(i64::from(minute) * 101, 2), at(12, minute, 0));
            append_history(&history, if minute % 2 == 0 { "1001" } else { "1004" }, &tx).unwrap();
        }

        let first = sample_bank(&dir, 20);
        replay_history(&history, &first).unwrap();
        let second = sample_bank(&dir, 20);
        replay_history(&history, &second).unwrap();

        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.recent_transactions(), b.recent_transactions());
            assert_eq!(a.balance(), b.balance());
        }
    }

    #[test]
    fn missing_history_replays_nothing() {
        let dir = TempDir::new().unwrap();
        let bank = sample_bank(&dir, 20);

        let stats = replay_history(&dir.path().join("none.csv"), &bank).unwrap();

        assert_eq!(stats, ReplayStats::default());
    }
}
