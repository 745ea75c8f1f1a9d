//! Interactive ATM simulator.
//!
//! Loads the account store (creating a sample one on first run), replays the
//! transaction history to rebuild mini-statements, then serves console
//! sessions on stdin/stdout until `exit`.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- --accounts accounts.csv --history transaction_history.csv
//! ```
//!
//! Log output goes to stderr and is controlled by `RUST_LOG` (default `warn`).
use std::io;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use atm_ledger::config::{self, Config};
use atm_ledger::engine::Ledger;
use atm_ledger::session::Session;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Account store file
    #[arg(long, default_value = config::ACCOUNTS_FILE)]
    accounts: PathBuf,

    /// Append-only transaction history file
    #[arg(long, default_value = config::HISTORY_FILE)]
    history: PathBuf,

    /// Number of transactions kept in each mini-statement
    #[arg(long, default_value_t = config::MINI_STATEMENT_CAPACITY)]
    capacity: usize,
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let config = Config {
        accounts_path: args.accounts,
        history_path: args.history,
        statement_capacity: args.capacity,
        ..Config::default()
    };
    let ledger = Ledger::open(config);

    let stdin = io::stdin();
    let mut session = Session::new(&ledger, stdin.lock(), io::stdout());
    session.run()
}
