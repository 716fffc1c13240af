//! Pass runner for the binary
//!
//! Opens the JSON file stores in the data directory, runs one pass through
//! [`Bookings`], and writes the notifications the pass produced as the CSV outbox.
//!
//! ```text
//! run
//!     ├── tokio multi-threaded runtime
//!     ├── JsonFileStore × 3 (members, submissions, transactions)
//!     ├── RecordingDispatcher (collects the outbox)
//!     └── Bookings (the pass)
//! ```

use crate::cli::{CliArgs, PassType};
use crate::core::{Bookings, EngineContext, RecordingDispatcher, StaticFeed, SubmissionFeed};
use crate::io::{read_json_records, write_notifications_csv};
use crate::store::{JsonFileStore, MemberTable, SubmissionTable, TransactionTable};
use crate::types::{BookingRequest, Member, SentNotification, Submission, Transaction};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const MEMBERS_FILE: &str = "members.json";
pub const SUBMISSIONS_FILE: &str = "submissions.json";
pub const TRANSACTIONS_FILE: &str = "transactions.json";

/// Run the pass named in `args` and write its outbox to `output`
///
/// # Returns
///
/// * `Ok(())` if the pass completed and the outbox was written
/// * `Err(String)` if a fatal error occurred
///
/// # Errors
///
/// Returns an error if the runtime cannot be built, a store or input file cannot be
/// read, the pass fails, or the outbox cannot be written. Records that could not be
/// written during bulk updates are logged, not returned.
pub fn run(args: &CliArgs, output: &mut dyn Write) -> Result<(), String> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("Failed to create tokio runtime: {}", e))?;

    let notifications = runtime.block_on(run_pass(args))?;
    write_notifications_csv(&notifications, output)
}

/// Run one pass against the stores in the data directory
///
/// # Returns
///
/// Every notification handed to the dispatcher, in send order.
pub async fn run_pass(args: &CliArgs) -> Result<Vec<SentNotification>, String> {
    if args.pass.needs_input() && args.input.is_none() {
        return Err(format!("The {:?} pass needs --input", args.pass));
    }

    tokio::fs::create_dir_all(&args.data_dir)
        .await
        .map_err(|e| format!("Failed to create '{}': {}", args.data_dir.display(), e))?;

    let store_config = args.to_store_config();
    let page_size = store_config.page_size;
    let members: Arc<JsonFileStore<Member>> =
        Arc::new(open_store(&args.data_dir, MEMBERS_FILE, page_size).await?);
    let submissions: Arc<JsonFileStore<Submission>> =
        Arc::new(open_store(&args.data_dir, SUBMISSIONS_FILE, page_size).await?);
    let transactions: Arc<JsonFileStore<Transaction>> =
        Arc::new(open_store(&args.data_dir, TRANSACTIONS_FILE, page_size).await?);

    let dispatcher = Arc::new(RecordingDispatcher::new());
    let bookings = Bookings::new(EngineContext {
        members: MemberTable::new(members, &store_config),
        submissions: SubmissionTable::new(submissions, &store_config),
        transactions: TransactionTable::new(transactions, &store_config),
        dispatcher: dispatcher.clone(),
        config: args.to_engine_config(),
    });

    let now = args.clock();
    tracing::info!(pass = ?args.pass, %now, "starting pass");
    let fail = |e: crate::types::BookingError| format!("{:?} pass failed: {}", args.pass, e);

    match args.pass {
        PassType::Intake => {
            for request in read_input::<BookingRequest>(args).await? {
                let outcome = bookings.intake(&request).await.map_err(fail)?;
                tracing::info!(submission_id = %request.submission_id, ?outcome, "intake");
            }
        }
        PassType::ImportMembers => {
            let import = bookings
                .import_members(read_input(args).await?, now)
                .await
                .map_err(fail)?;
            tracing::info!(
                members = import.members.updated,
                expired = import.expired,
                confirmed = import.reprocessed.confirmed,
                dropped = import.reprocessed.dropped,
                "member import complete"
            );
        }
        PassType::ImportTransactions => {
            let import = bookings
                .import_transactions(read_input(args).await?, now)
                .await
                .map_err(fail)?;
            tracing::info!(
                transactions = import.transactions.updated,
                matched = import.reconciled.matched.len(),
                unmatched = import.reconciled.unmatched,
                "transaction import complete"
            );
        }
        PassType::Sweep => {
            let expired = bookings.sweep(now).await.map_err(fail)?;
            tracing::info!(expired, "sweep complete");
        }
        PassType::Reminders => {
            let reminded = bookings.send_pay_reminders(now).await.map_err(fail)?;
            tracing::info!(reminded, "reminders complete");
        }
        PassType::Reconcile => {
            let report = bookings.reconcile(now).await.map_err(fail)?;
            tracing::info!(
                matched = report.matched.len(),
                unmatched = report.unmatched,
                "reconciliation complete"
            );
        }
        PassType::Recover => {
            let feed = StaticFeed::new(read_input(args).await?);
            let recovered = bookings.recover_missing(&feed, now).await.map_err(fail)?;
            tracing::info!(recovered, "recovery complete");
        }
        PassType::Summary => {
            let rosters = bookings.send_session_roster(now).await.map_err(fail)?;
            tracing::info!(rosters, "summary complete");
        }
        PassType::TransactionsSummary => {
            let lines = bookings.send_transactions_summary(now).await.map_err(fail)?;
            tracing::info!(lines, "transactions summary complete");
        }
        PassType::Hourly => {
            let feed = match &args.input {
                Some(_) => Some(StaticFeed::new(read_input(args).await?)),
                None => None,
            };
            let feed = feed.as_ref().map(|feed| feed as &dyn SubmissionFeed);
            bookings.hourly(now, feed).await.map_err(fail)?;
        }
    }

    Ok(dispatcher.take())
}

async fn open_store<R>(dir: &Path, file: &str, page_size: usize) -> Result<JsonFileStore<R>, String>
where
    R: crate::store::Record + serde::Serialize + serde::de::DeserializeOwned,
{
    let path: PathBuf = dir.join(file);
    JsonFileStore::open(&path, page_size)
        .await
        .map_err(|e| format!("Failed to open store '{}': {}", path.display(), e))
}

async fn read_input<T: serde::de::DeserializeOwned>(args: &CliArgs) -> Result<Vec<T>, String> {
    match &args.input {
        Some(path) => read_json_records(path).await,
        None => Err("No --input file given".to_string()),
    }
}
