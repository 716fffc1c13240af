//! Club bookings CLI
//!
//! Runs one pass of the booking engine against the JSON stores in a data directory.
//!
//! # Usage
//!
//! ```bash
//! club-bookings --data-dir data --input requests.json intake > outbox.csv
//! club-bookings --data-dir data --input members.json import-members > outbox.csv
//! club-bookings --data-dir data --input statement.json import-transactions > outbox.csv
//! club-bookings --data-dir data --now 2025-06-05T12:00:00Z hourly > outbox.csv
//! ```
//!
//! Notifications produced by the pass are written to stdout as CSV. Logs go to
//! stderr; set `RUST_LOG` to change the level (default `info`).
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Error (unreadable store or input, failed pass, etc.)

use club_bookings::{cli, runner};
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = cli::parse_args();

    let mut output = std::io::stdout();
    if let Err(e) = runner::run(&args, &mut output) {
        tracing::error!("{}", e);
        process::exit(1);
    }
}
