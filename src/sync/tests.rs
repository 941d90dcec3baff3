//! Engine timing and reconciliation tests on tokio's paused clock

use super::testing::{EchoField, EchoGroup, FakeRemote};
use super::*;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};

fn server_state() -> EchoGroup {
    EchoGroup::new(0.1, 0.2, 0.3)
}

fn spawn(remote: &Arc<FakeRemote>, options: EngineOptions) -> GroupHandle<EchoGroup> {
    GroupActor::spawn(EchoGroup::default(), Arc::clone(remote), options)
}

async fn wait_loaded(handle: &GroupHandle<EchoGroup>) -> LoadState {
    let mut rx = handle.subscribe();
    let view = rx
        .wait_for(|v| v.load != LoadState::Loading)
        .await
        .expect("engine stopped while loading");
    view.load.clone()
}

fn assert_elapsed(actual: Duration, expected: Duration) {
    let diff = actual.abs_diff(expected);
    assert!(diff < Duration::from_millis(1), "elapsed {:?}, expected {:?}", actual, expected);
}

#[tokio::test(start_paused = true)]
async fn test_burst_of_edits_coalesces_into_one_trailing_write() {
    let remote = Arc::new(FakeRemote::new(server_state()));
    let handle = spawn(&remote, EngineOptions::default());
    assert_eq!(wait_loaded(&handle).await, LoadState::Loaded);

    let t = Instant::now();
    handle.try_edit(EchoField::Feedback, 0.4).await.unwrap();
    sleep(Duration::from_millis(10)).await;
    handle.try_edit(EchoField::Feedback, 0.5).await.unwrap();
    sleep(Duration::from_millis(10)).await;
    handle.try_edit(EchoField::Feedback, 0.6).await.unwrap();

    sleep(Duration::from_millis(400)).await;
    assert!(remote.sent().is_empty());
    assert!(handle.view().pending);

    sleep(Duration::from_secs(2)).await;
    let sent = remote.sent();
    assert_eq!(sent.len(), 1);
    assert_elapsed(sent[0].at - t, Duration::from_millis(520));
    assert_eq!(sent[0].fields, vec![(EchoField::Feedback, ParamValue::Number(0.6))]);

    let view = handle.view();
    assert!(!view.pending);
    assert_eq!(view.writes, 1);
    assert_eq!(remote.server_state().feedback, 0.6);
}

#[tokio::test(start_paused = true)]
async fn test_initialize_never_writes() {
    let remote = Arc::new(FakeRemote::new(server_state()));
    let handle = spawn(&remote, EngineOptions::default());
    wait_loaded(&handle).await;

    sleep(Duration::from_secs(10)).await;
    assert!(remote.sent().is_empty());
    assert_eq!(remote.fetch_count(), 1);
    assert_eq!(handle.view().local, server_state());
}

#[tokio::test(start_paused = true)]
async fn test_write_carries_only_changed_fields() {
    let remote = Arc::new(FakeRemote::new(server_state()));
    let handle = spawn(&remote, EngineOptions::default());
    wait_loaded(&handle).await;

    handle.try_edit(EchoField::Gain, 0.9).await.unwrap();
    handle.try_edit(EchoField::Mix, 0.8).await.unwrap();
    sleep(Duration::from_secs(1)).await;

    let sent = remote.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(
        sent[0].fields,
        vec![
            (EchoField::Gain, ParamValue::Number(0.9)),
            (EchoField::Mix, ParamValue::Number(0.8)),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_edit_reverted_within_window_sends_nothing() {
    let remote = Arc::new(FakeRemote::new(server_state()));
    let handle = spawn(&remote, EngineOptions::default());
    wait_loaded(&handle).await;

    handle.try_edit(EchoField::Gain, 0.9).await.unwrap();
    handle.try_edit(EchoField::Gain, 0.1).await.unwrap();
    sleep(Duration::from_secs(1)).await;

    assert!(remote.sent().is_empty());
    assert!(!handle.view().pending);
}

#[tokio::test(start_paused = true)]
async fn test_refresh_does_not_clobber_pending_edit() {
    let remote = Arc::new(FakeRemote::new(server_state()));
    let handle = spawn(&remote, EngineOptions::default());
    wait_loaded(&handle).await;

    handle.try_edit(EchoField::Mix, 0.9).await.unwrap();
    handle.ingest_external_update(EchoGroup::new(0.4, 0.5, 0.6));

    let view = handle.snapshot().await.unwrap();
    assert_eq!(view.local.gain, 0.4);
    assert_eq!(view.local.feedback, 0.5);
    assert_eq!(view.local.mix, 0.9);

    sleep(Duration::from_secs(1)).await;
    let sent = remote.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].fields, vec![(EchoField::Mix, ParamValue::Number(0.9))]);
}

#[tokio::test(start_paused = true)]
async fn test_failed_load_is_terminal_and_local_only() {
    let remote = Arc::new(FakeRemote::new(server_state()).failing_fetch());
    let options = EngineOptions {
        poll_interval: Some(Duration::from_secs(2)),
        ..EngineOptions::default()
    };
    let handle = spawn(&remote, options);
    assert!(matches!(wait_loaded(&handle).await, LoadState::Failed(_)));

    handle.try_edit(EchoField::Gain, 0.7).await.unwrap();
    assert_eq!(handle.view().local.gain, 0.7);
    assert!(handle.view().loaded().is_none());

    handle.refresh();
    sleep(Duration::from_secs(10)).await;
    assert!(remote.sent().is_empty());
    assert_eq!(remote.fetch_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_edit_while_loading_is_replaced_by_fetched_state() {
    let remote = Arc::new(FakeRemote::new(server_state()).with_fetch_delay(Duration::from_millis(100)));
    let handle = spawn(&remote, EngineOptions::default());

    handle.try_edit(EchoField::Mix, 0.9).await.unwrap();
    let view = handle.view();
    assert_eq!(view.load, LoadState::Loading);
    assert_eq!(view.local.mix, 0.9);

    wait_loaded(&handle).await;
    assert_eq!(handle.view().local.mix, 0.3);

    sleep(Duration::from_secs(2)).await;
    assert!(remote.sent().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_flush_while_loading_sends_nothing() {
    let remote = Arc::new(FakeRemote::new(server_state()).with_fetch_delay(Duration::from_millis(100)));
    let handle = spawn(&remote, EngineOptions::default());

    handle.try_edit(EchoField::Gain, 0.7).await.unwrap();
    handle.flush().await.unwrap();
    assert!(remote.sent().is_empty());

    assert_eq!(wait_loaded(&handle).await, LoadState::Loaded);
    assert_eq!(handle.view().local, server_state());
    sleep(Duration::from_secs(2)).await;
    assert!(remote.sent().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_flush_after_failed_load_sends_nothing() {
    let remote = Arc::new(FakeRemote::new(server_state()).failing_fetch());
    let handle = spawn(&remote, EngineOptions::default());
    assert!(matches!(wait_loaded(&handle).await, LoadState::Failed(_)));

    handle.try_edit(EchoField::Gain, 0.7).await.unwrap();
    handle.flush().await.unwrap();
    handle.shutdown().await;

    assert!(remote.sent().is_empty());
    assert_eq!(handle.view().writes, 0);
}

#[tokio::test(start_paused = true)]
async fn test_poll_crossing_a_write_does_not_revert_it() {
    let remote = Arc::new(FakeRemote::new(server_state()).with_send_delay(Duration::from_millis(600)));
    let options = EngineOptions {
        poll_interval: Some(Duration::from_secs(1)),
        ..EngineOptions::default()
    };
    let handle = spawn(&remote, options);
    wait_loaded(&handle).await;

    // Write fires at 500 ms and lands at 1100 ms; the 1000 ms poll sees the old mix
    handle.try_edit(EchoField::Mix, 0.9).await.unwrap();
    sleep(Duration::from_millis(1050)).await;
    assert_eq!(remote.fetch_count(), 2);
    assert_eq!(remote.server_state().mix, 0.3);
    assert_eq!(handle.view().local.mix, 0.9);

    sleep(Duration::from_millis(1050)).await;
    assert_eq!(remote.fetch_count(), 3);
    assert_eq!(remote.server_state().mix, 0.9);
    assert_eq!(handle.view().local.mix, 0.9);
    assert_eq!(remote.sent().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_rejected_edits_report_errors() {
    let remote = Arc::new(FakeRemote::new(server_state()));
    let handle = spawn(&remote, EngineOptions::default());
    wait_loaded(&handle).await;

    let err = handle.try_edit(EchoField::Level, 1.0).await.unwrap_err();
    assert_eq!(err, EditError::ReadOnly("level".into()));
    let err = handle.try_edit(EchoField::Mix, true).await.unwrap_err();
    assert!(matches!(err, EditError::WrongKind { .. }));

    sleep(Duration::from_secs(1)).await;
    assert!(remote.sent().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_poller_ingests_server_changes() {
    let remote = Arc::new(FakeRemote::new(server_state()));
    let options = EngineOptions {
        poll_interval: Some(Duration::from_secs(2)),
        ..EngineOptions::default()
    };
    let handle = spawn(&remote, options);
    wait_loaded(&handle).await;

    let mut changed = server_state();
    changed.level = 0.5;
    remote.set_server_state(changed);

    sleep(Duration::from_millis(2100)).await;
    assert_eq!(handle.view().local.level, 0.5);
    assert_eq!(remote.fetch_count(), 2);
    assert!(remote.sent().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_requested_refresh_reads_again() {
    let remote = Arc::new(FakeRemote::new(server_state()));
    let handle = spawn(&remote, EngineOptions::default());
    wait_loaded(&handle).await;

    remote.set_server_state(EchoGroup::new(0.9, 0.2, 0.3));
    handle.refresh();
    sleep(Duration::from_millis(10)).await;

    assert_eq!(remote.fetch_count(), 2);
    assert_eq!(handle.view().local.gain, 0.9);
}

#[tokio::test(start_paused = true)]
async fn test_flush_writes_immediately() {
    let remote = Arc::new(FakeRemote::new(server_state()));
    let handle = spawn(&remote, EngineOptions::default());
    wait_loaded(&handle).await;

    let t = Instant::now();
    handle.try_edit(EchoField::Gain, 0.6).await.unwrap();
    handle.flush().await.unwrap();

    let sent = remote.sent();
    assert_eq!(sent.len(), 1);
    assert_elapsed(sent[0].at - t, Duration::ZERO);
    assert!(!handle.view().pending);

    // The cancelled timer does not fire a second write
    sleep(Duration::from_secs(1)).await;
    assert_eq!(remote.sent().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_flushes_pending_write_and_stops_polling() {
    let remote = Arc::new(FakeRemote::new(server_state()));
    let options = EngineOptions {
        poll_interval: Some(Duration::from_secs(1)),
        ..EngineOptions::default()
    };
    let handle = spawn(&remote, options);
    wait_loaded(&handle).await;

    handle.try_edit(EchoField::Feedback, 0.75).await.unwrap();
    handle.shutdown().await;

    let sent = remote.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].fields, vec![(EchoField::Feedback, ParamValue::Number(0.75))]);

    let fetches = remote.fetch_count();
    sleep(Duration::from_secs(5)).await;
    assert_eq!(remote.fetch_count(), fetches);
}

#[tokio::test(start_paused = true)]
async fn test_write_failure_is_reported_without_rollback() {
    let remote = Arc::new(FakeRemote::new(server_state()));
    let handle = spawn(&remote, EngineOptions::default());
    wait_loaded(&handle).await;

    remote.set_send_failure(true);
    handle.try_edit(EchoField::Gain, 0.6).await.unwrap();
    sleep(Duration::from_secs(1)).await;

    let view = handle.view();
    assert!(view.last_error.is_some());
    assert_eq!(view.local.gain, 0.6);
    assert_eq!(remote.sent().len(), 1);

    remote.set_send_failure(false);
    handle.try_edit(EchoField::Mix, 0.4).await.unwrap();
    sleep(Duration::from_secs(1)).await;
    assert!(handle.view().last_error.is_none());
    // Gain already counts as synced: only the new edit is sent
    assert_eq!(remote.sent()[1].fields, vec![(EchoField::Mix, ParamValue::Number(0.4))]);
}
