//! Pass-level integration tests
//!
//! Each test drives the public `Bookings` API over in-memory stores and checks the
//! lifecycle properties a sequence of passes must keep: idempotent intake and
//! reminders, group-consistent payments, a monotonic expiry sweep, and convergence
//! after store contention.

mod common;

use chrono::Duration;
use club_bookings::core::IntakeOutcome;
use club_bookings::store::RecordStore;
use club_bookings::types::TemplateKey;
use club_bookings::SubmissionState;
use common::{credit, entry, member, now, request, training_date, Harness};

#[tokio::test]
async fn test_intake_twice_keeps_one_record_per_entry() {
    let harness = Harness::with_members(vec![member("M1", "Jo")]).await;
    let booking = request("100", "ABCD", vec![entry("M1", 2000)]);

    let first = harness.bookings.intake(&booking).await.unwrap();
    assert!(matches!(first, IntakeOutcome::Confirmed(_)));
    harness.bookings.intake(&booking).await.unwrap();

    assert_eq!(harness.submission_store.len(), 1);
    assert_eq!(harness.stored("100-1").state, SubmissionState::Received);
}

#[tokio::test]
async fn test_redelivery_after_payment_changes_nothing() {
    let harness = Harness::with_members(vec![member("M1", "Jo")]).await;
    let booking = request("101", "ABCD", vec![entry("M1", 2000)]);
    harness.bookings.intake(&booking).await.unwrap();
    harness
        .bookings
        .import_transactions(vec![credit(2, "ABCD", 2000)], now())
        .await
        .unwrap();
    harness.dispatcher.take();

    let outcome = harness.bookings.intake(&booking).await.unwrap();
    assert!(matches!(outcome, IntakeOutcome::AlreadyProcessed(_)));
    assert_eq!(harness.stored("101-1").state, SubmissionState::Paid);
    assert!(harness.dispatcher.sent().is_empty());
}

#[tokio::test]
async fn test_redelivery_after_reminder_sends_nothing_new() {
    let harness = Harness::with_members(vec![member("M1", "Jo")]).await;
    let booking = request("108", "ABCD", vec![entry("M1", 2000)]);
    let due = training_date() - Duration::hours(24);

    harness.bookings.intake(&booking).await.unwrap();
    assert_eq!(harness.bookings.send_pay_reminders(due).await.unwrap(), 1);
    harness.bookings.intake(&booking).await.unwrap();
    assert_eq!(harness.bookings.send_pay_reminders(due).await.unwrap(), 0);

    assert_eq!(harness.dispatcher.count(TemplateKey::ReceivedRequest), 1);
    assert_eq!(harness.dispatcher.count(TemplateKey::PayReminder), 1);
}

#[tokio::test]
async fn test_unknown_member_sends_only_operator_alert() {
    let harness = Harness::new();
    let outcome = harness
        .bookings
        .intake(&request("102", "ABCD", vec![entry("NOPE", 2000)]))
        .await
        .unwrap();
    assert!(matches!(outcome, IntakeOutcome::Withheld(_)));

    let stored = harness.stored("102-1");
    assert_eq!(stored.state, SubmissionState::Received);
    assert!(!stored.found_member_record);
    assert!(!stored.received_request_email_sent);

    let sent = harness.dispatcher.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].template, TemplateKey::OperatorAlert);
    assert_eq!(sent[0].recipients, vec![common::OPERATOR]);
}

#[tokio::test]
async fn test_three_entry_group_settles_together() {
    let harness = Harness::with_members(vec![
        member("M1", "Jo"),
        member("M2", "Sam"),
        member("M3", "Kit"),
    ])
    .await;
    harness
        .bookings
        .intake(&request(
            "103",
            "TRIO",
            vec![entry("M1", 2000), entry("M2", 2000), entry("M3", 1500)],
        ))
        .await
        .unwrap();

    let import = harness
        .bookings
        .import_transactions(vec![credit(3, "TRIO bookings", 5500)], now())
        .await
        .unwrap();
    assert_eq!(import.reconciled.matched.len(), 1);

    let group: Vec<_> = ["103-1", "103-2", "103-3"]
        .iter()
        .map(|id| harness.stored(id))
        .collect();
    assert!(group.iter().all(|s| s.state == SubmissionState::Paid));
    assert!(group
        .iter()
        .all(|s| s.payment_record_id == group[0].payment_record_id));
    assert!(group.iter().all(|s| !s.payment_discrepancy));

    let payments = harness.dispatcher.sent();
    let payment = payments
        .iter()
        .find(|n| n.template == TemplateKey::ReceivedPayment)
        .unwrap();
    assert_eq!(payment.recipients.len(), 3);
}

#[tokio::test]
async fn test_reminders_are_sent_once() {
    let harness = Harness::with_members(vec![member("M1", "Jo")]).await;
    harness
        .bookings
        .intake(&request("104", "ABCD", vec![entry("M1", 2000)]))
        .await
        .unwrap();

    let due = training_date() - Duration::hours(24);
    assert_eq!(harness.bookings.send_pay_reminders(due).await.unwrap(), 1);
    assert_eq!(harness.bookings.send_pay_reminders(due).await.unwrap(), 0);
    assert_eq!(harness.dispatcher.count(TemplateKey::PayReminder), 1);
    assert!(harness.stored("104-1").pay_reminder_email_sent);
}

#[tokio::test]
async fn test_sweep_is_final() {
    let harness = Harness::with_members(vec![member("M1", "Jo")]).await;
    harness
        .bookings
        .intake(&request("105", "ABCD", vec![entry("M1", 2000)]))
        .await
        .unwrap();

    let mut dropped = harness.stored("105-1");
    dropped.id = "106-1".to_string();
    dropped.linked_submission_ids = vec![dropped.id.clone()];
    dropped.state = SubmissionState::Dropped;
    harness.submission_store.put(dropped).await.unwrap();

    let after = training_date() + Duration::hours(1);
    assert_eq!(harness.bookings.sweep(after).await.unwrap(), 1);
    assert_eq!(harness.bookings.sweep(after).await.unwrap(), 0);
    assert_eq!(harness.stored("105-1").state, SubmissionState::InPast);
    assert_eq!(harness.stored("106-1").state, SubmissionState::Dropped);
}

#[tokio::test(start_paused = true)]
async fn test_contention_during_group_write_converges() {
    let harness = Harness::with_members(vec![member("M1", "Jo"), member("M2", "Sam")]).await;
    harness
        .bookings
        .intake(&request("107", "PAIR", vec![entry("M1", 2000), entry("M2", 2000)]))
        .await
        .unwrap();

    harness.submission_store.inject_contention(3);
    harness
        .bookings
        .import_transactions(vec![credit(2, "PAIR", 4000)], now())
        .await
        .unwrap();

    assert_eq!(harness.stored("107-1").state, SubmissionState::Paid);
    assert_eq!(harness.stored("107-2").state, SubmissionState::Paid);
}
