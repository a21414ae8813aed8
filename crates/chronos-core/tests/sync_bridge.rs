//! Integration tests for the persistence bridge against the in-memory store.
//!
//! Covers mirroring, sync status, load preference, stale-session discard
//! and the merge performed on sign-in.

use chrono::{DateTime, Duration, TimeZone, Utc};
use chronos_core::clock::local_day;
use chronos_core::sync::MergeSide;
use chronos_core::{
    App, LocalCache, ManualClock, MemoryStore, PersistenceBridge, RemoteStore, Settings,
    SyncStatus, Task, TaskList, TimerPolicy, TimerRecord, TimerStats,
};
use std::sync::Arc;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 19, 10, 0, 0).unwrap()
}

fn stores() -> (Arc<MemoryStore>, Arc<dyn RemoteStore>) {
    let store = Arc::new(MemoryStore::new());
    let remote: Arc<dyn RemoteStore> = store.clone();
    (store, remote)
}

fn record(completed: u32) -> TimerRecord {
    TimerRecord::new(
        TimerStats {
            completed_sessions: completed,
            current_streak: completed,
            total_focus_secs: u64::from(completed) * 1500,
        },
        Settings::default(),
        local_day(now()),
    )
}

fn task(id: i64, text: &str) -> Task {
    Task {
        id,
        text: text.into(),
        completed: false,
        created_at: now(),
        updated_at: None,
    }
}

#[tokio::test]
async fn test_signed_in_save_mirrors_and_reports_synced() {
    let (store, remote) = stores();
    let session = store.sign_up("ada@example.com", "hunter22").await.unwrap();
    let bridge = PersistenceBridge::new(LocalCache::open_memory().unwrap(), Some(remote));

    bridge.save_timer(&record(2)).unwrap();
    assert_eq!(bridge.status(), SyncStatus::Syncing);
    bridge.flush().await;

    assert_eq!(bridge.status(), SyncStatus::Synced);
    assert_eq!(store.timer_doc(&session.uid), Some(record(2)));
    assert_eq!(bridge.cache().load_timer(), Some(record(2)));
}

#[tokio::test]
async fn test_signed_out_save_stays_local() {
    let (store, remote) = stores();
    let bridge = PersistenceBridge::new(LocalCache::open_memory().unwrap(), Some(remote));

    bridge.save_timer(&record(1)).unwrap();
    bridge.flush().await;

    assert_eq!(bridge.status(), SyncStatus::Idle);
    assert_eq!(store.write_count(), 0);
    assert_eq!(bridge.cache().load_timer(), Some(record(1)));
}

#[tokio::test]
async fn test_failed_remote_write_keeps_local_copy() {
    let (store, remote) = stores();
    store.sign_up("ada@example.com", "hunter22").await.unwrap();
    store.set_fail_writes(true);
    let bridge = PersistenceBridge::new(LocalCache::open_memory().unwrap(), Some(remote));

    let mut tasks = TaskList::new();
    tasks.add("write report", now());
    bridge.save_tasks(&tasks, now()).unwrap();
    bridge.flush().await;

    assert_eq!(bridge.status(), SyncStatus::Failed);
    assert_eq!(bridge.cache().load_tasks().unwrap().tasks.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_result_for_previous_session_is_discarded() {
    let (store, remote) = stores();
    store.sign_up("ada@example.com", "hunter22").await.unwrap();
    store.set_write_delay(std::time::Duration::from_secs(5));
    let bridge = PersistenceBridge::new(LocalCache::open_memory().unwrap(), Some(remote));

    bridge.save_timer(&record(3)).unwrap();
    bridge.sign_out().await.unwrap();
    store.sign_up("bob@example.com", "hunter22").await.unwrap();
    store.set_fail_writes(true);

    // The old write now fails, but nobody should hear about it.
    bridge.flush().await;
    assert_eq!(bridge.status(), SyncStatus::Idle);
}

#[tokio::test]
async fn test_load_prefers_remote_then_falls_back_to_local() {
    let (store, remote) = stores();
    let session = store.sign_up("ada@example.com", "hunter22").await.unwrap();
    store.put_timer_doc(&session.uid, record(5));

    let cache = LocalCache::open_memory().unwrap();
    cache.save_timer(&record(1)).unwrap();
    let mut local_tasks = TaskList::new();
    local_tasks.add("local task", now());
    cache.save_tasks(&local_tasks.record(now())).unwrap();

    let bridge = PersistenceBridge::new(cache, Some(remote));
    assert_eq!(bridge.load_timer().await, Some(record(5)));
    // Remote has no tasks, so the local list is used.
    let loaded = bridge.load_tasks(now()).await;
    assert_eq!(loaded.tasks()[0].text, "local task");
}

#[tokio::test]
async fn test_sign_in_merges_tasks_by_union() {
    let (store, remote) = stores();
    let session = store.sign_up("ada@example.com", "hunter22").await.unwrap();
    store.sign_out().await.unwrap();
    store.put_tasks(&session.uid, vec![task(200, "from phone"), task(100, "shared")]);
    store.put_timer_doc(&session.uid, record(3));

    let clock = ManualClock::new(now());
    let bridge = PersistenceBridge::new(LocalCache::open_memory().unwrap(), Some(remote));
    let mut app = App::load(Arc::new(clock.clone()), bridge, TimerPolicy::default()).await;
    app.add_task("from laptop");

    store.sign_in("ada@example.com", "hunter22").await.unwrap();
    let winner = app.on_sign_in().await.unwrap();

    assert_eq!(winner, Some(MergeSide::Remote));
    assert_eq!(app.engine().stats().completed_sessions, 3);
    let texts: Vec<&str> = app.tasks().tasks().iter().map(|t| t.text.as_str()).collect();
    assert_eq!(texts, vec!["from laptop", "from phone", "shared"]);

    assert_eq!(store.tasks_of(&session.uid).len(), 3);
    assert_eq!(app.sync_status(), SyncStatus::Synced);
    assert_eq!(app.bridge().cache().load_tasks().unwrap().tasks.len(), 3);
}

#[tokio::test]
async fn test_merge_without_session_keeps_local_state() {
    let (_store, remote) = stores();
    let clock = ManualClock::new(now());
    let bridge = PersistenceBridge::new(LocalCache::open_memory().unwrap(), Some(remote));
    let mut app = App::load(Arc::new(clock.clone()), bridge, TimerPolicy::default()).await;
    app.add_task("offline task");
    clock.advance(Duration::seconds(5));

    // Not signed in: nothing to merge.
    assert_eq!(app.on_sign_in().await.unwrap(), None);
    assert_eq!(app.tasks().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_timer_read_for_previous_session_falls_back_to_local() {
    let (store, remote) = stores();
    let session = store.sign_up("ada@example.com", "hunter22").await.unwrap();
    store.put_timer_doc(&session.uid, record(5));
    store.set_read_delay(std::time::Duration::from_secs(5));

    let cache = LocalCache::open_memory().unwrap();
    cache.save_timer(&record(1)).unwrap();
    let bridge = PersistenceBridge::new(cache, Some(remote));

    // Sign out while the remote read is still pending.
    let (loaded, signed_out) = tokio::join!(bridge.load_timer(), bridge.sign_out());
    signed_out.unwrap();

    assert_eq!(loaded, Some(record(1)));
    assert_eq!(bridge.cache().load_timer(), Some(record(1)));
    assert_eq!(bridge.status(), SyncStatus::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_task_read_for_previous_account_falls_back_to_local() {
    let (store, remote) = stores();
    let ada = store.sign_up("ada@example.com", "hunter22").await.unwrap();
    store.put_tasks(&ada.uid, vec![task(100, "ada's task")]);
    store.set_read_delay(std::time::Duration::from_secs(5));

    let cache = LocalCache::open_memory().unwrap();
    let mut local = TaskList::new();
    local.add("local task", now());
    cache.save_tasks(&local.record(now())).unwrap();
    let bridge = PersistenceBridge::new(cache, Some(remote));

    let switch_account = async {
        bridge.sign_out().await.unwrap();
        store.sign_up("bob@example.com", "hunter22").await.unwrap();
    };
    let (loaded, ()) = tokio::join!(bridge.load_tasks(now()), switch_account);

    assert_eq!(loaded.tasks(), local.tasks());
    assert_eq!(bridge.cache().load_tasks().unwrap().tasks, local.tasks().to_vec());
    assert_eq!(bridge.status(), SyncStatus::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_sign_in_merge_for_previous_account_is_dropped() {
    let (store, remote) = stores();
    let ada = store.sign_up("ada@example.com", "hunter22").await.unwrap();
    store.put_timer_doc(&ada.uid, record(5));
    store.put_tasks(&ada.uid, vec![task(100, "from phone")]);
    store.set_read_delay(std::time::Duration::from_secs(5));

    let cache = LocalCache::open_memory().unwrap();
    cache.save_timer(&record(1)).unwrap();
    let bridge = PersistenceBridge::new(cache, Some(remote));
    let mut local_tasks = TaskList::new();
    local_tasks.add("local task", now());

    let switch_account = async {
        bridge.sign_out().await.unwrap();
        store.sign_up("bob@example.com", "hunter22").await.unwrap();
    };
    let local_record = record(1);
    let (merged, ()) = tokio::join!(
        bridge.reconcile_on_sign_in(&local_record, &local_tasks, now()),
        switch_account
    );

    assert_eq!(merged.unwrap(), None);
    assert_eq!(bridge.cache().load_timer(), Some(record(1)));
    assert!(bridge.cache().load_tasks().is_none());
    assert_eq!(bridge.status(), SyncStatus::Idle);
    assert_eq!(store.write_count(), 0);
    assert_eq!(store.tasks_of(&ada.uid).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_sign_in_upload_result_for_previous_session_is_ignored() {
    let (store, remote) = stores();
    let ada = store.sign_up("ada@example.com", "hunter22").await.unwrap();
    store.put_timer_doc(&ada.uid, record(5));
    store.set_write_delay(std::time::Duration::from_secs(5));

    let bridge = PersistenceBridge::new(LocalCache::open_memory().unwrap(), Some(remote));
    let local_tasks = TaskList::new();

    let sign_out_mid_upload = async {
        tokio::time::sleep(std::time::Duration::from_secs(1)).await;
        bridge.sign_out().await.unwrap();
    };
    let local_record = record(1);
    let (merged, ()) = tokio::join!(
        bridge.reconcile_on_sign_in(&local_record, &local_tasks, now()),
        sign_out_mid_upload
    );

    // The merge itself completed before the sign-out.
    let merged = merged.unwrap().unwrap();
    assert_eq!(merged.timer_from, MergeSide::Remote);
    assert_eq!(bridge.status(), SyncStatus::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_queued_task_push_is_superseded_by_newer_save() {
    let (store, remote) = stores();
    let session = store.sign_up("ada@example.com", "hunter22").await.unwrap();
    store.set_write_delay(std::time::Duration::from_secs(5));
    let bridge = PersistenceBridge::new(LocalCache::open_memory().unwrap(), Some(remote));

    let mut tasks = TaskList::new();
    let first = tasks.add("first", now()).map(|t| t.id).unwrap();
    bridge.save_tasks(&tasks, now()).unwrap();
    tasks.delete(first);
    tasks.add("second", now() + Duration::seconds(1));
    bridge.save_tasks(&tasks, now()).unwrap();
    bridge.flush().await;

    let remote_texts: Vec<String> = store.tasks_of(&session.uid).into_iter().map(|t| t.text).collect();
    assert_eq!(remote_texts, vec!["second"]);
    assert_eq!(store.write_count(), 1);
    assert_eq!(bridge.status(), SyncStatus::Synced);
}

#[tokio::test(start_paused = true)]
async fn test_task_pushes_land_in_save_order() {
    let (store, remote) = stores();
    let session = store.sign_up("ada@example.com", "hunter22").await.unwrap();
    store.set_write_delay(std::time::Duration::from_secs(5));
    let bridge = PersistenceBridge::new(LocalCache::open_memory().unwrap(), Some(remote));

    let mut tasks = TaskList::new();
    let first = tasks.add("first", now()).map(|t| t.id).unwrap();
    bridge.save_tasks(&tasks, now()).unwrap();
    // Let the first push start and stall in the store.
    tokio::time::sleep(std::time::Duration::from_secs(1)).await;

    tasks.delete(first);
    bridge.save_tasks(&tasks, now()).unwrap();
    bridge.flush().await;

    assert!(store.tasks_of(&session.uid).is_empty());
    assert_eq!(store.write_count(), 2);
    assert_eq!(bridge.status(), SyncStatus::Synced);
}
