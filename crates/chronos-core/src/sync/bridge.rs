//! Persistence bridge: local cache first, remote store as a mirror.
//!
//! Every save lands in the local cache before returning. When a session
//! exists the same data is then pushed to the remote store on a spawned
//! task. Each push remembers the session generation it was issued under;
//! if the user signed out (or in as someone else) by the time it finishes,
//! the result is dropped without touching the sync status.
//!
//! Pushes of the same document run one at a time, in save order. A push
//! still waiting for its turn when a newer save arrives is skipped, since
//! the newer one carries the full state.

use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{watch, Mutex as AsyncMutex};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::merge::{merge_tasks, merge_timer, MergeSide};
use super::SyncStatus;
use crate::clock::local_day;
use crate::error::{AuthError, StorageError};
use crate::remote::{is_current, RemoteStore, Session};
use crate::storage::LocalCache;
use crate::task::{Task, TaskList};
use crate::timer::TimerRecord;

/// Outcome of reconciling local state with the account after sign-in.
#[derive(Debug, Clone, PartialEq)]
pub struct Merged {
    pub timer: TimerRecord,
    pub timer_from: MergeSide,
    pub tasks: Vec<Task>,
}

/// Write queue for one remote document.
#[derive(Debug, Default)]
struct Lane {
    turn: AsyncMutex<()>,
    latest: AtomicU64,
}

impl Lane {
    fn next_ticket(&self) -> u64 {
        self.latest.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_latest(&self, ticket: u64) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket
    }
}

pub struct PersistenceBridge {
    cache: LocalCache,
    remote: Option<Arc<dyn RemoteStore>>,
    status: Arc<watch::Sender<SyncStatus>>,
    inflight: Mutex<JoinSet<()>>,
    timer_lane: Arc<Lane>,
    tasks_lane: Arc<Lane>,
}

impl PersistenceBridge {
    pub fn new(cache: LocalCache, remote: Option<Arc<dyn RemoteStore>>) -> Self {
        let (status, _rx) = watch::channel(SyncStatus::Idle);
        Self {
            cache,
            remote,
            status: Arc::new(status),
            inflight: Mutex::new(JoinSet::new()),
            timer_lane: Arc::default(),
            tasks_lane: Arc::default(),
        }
    }

    /// Bridge without a remote store.
    pub fn local_only(cache: LocalCache) -> Self {
        Self::new(cache, None)
    }

    pub fn cache(&self) -> &LocalCache {
        &self.cache
    }

    pub fn remote(&self) -> Option<&Arc<dyn RemoteStore>> {
        self.remote.as_ref()
    }

    pub fn session(&self) -> Option<Session> {
        self.remote.as_ref().and_then(|r| r.current_session())
    }

    pub fn status(&self) -> SyncStatus {
        *self.status.borrow()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<SyncStatus> {
        self.status.subscribe()
    }

    fn signed_in(&self) -> Option<(Arc<dyn RemoteStore>, Session)> {
        let remote = self.remote.as_ref()?;
        let session = remote.current_session()?;
        Some((Arc::clone(remote), session))
    }

    fn inflight(&self) -> MutexGuard<'_, JoinSet<()>> {
        self.inflight.lock().unwrap_or_else(|e| e.into_inner())
    }

    // ── Saving ───────────────────────────────────────────────────────

    pub fn save_timer(&self, record: &TimerRecord) -> Result<(), StorageError> {
        self.cache.save_timer(record)?;
        let record = record.clone();
        self.mirror("timer", &self.timer_lane, move |remote, session| async move {
            remote.set_timer_doc(&session, &record).await
        });
        Ok(())
    }

    pub fn save_tasks(&self, tasks: &TaskList, now: DateTime<Utc>) -> Result<(), StorageError> {
        self.cache.save_tasks(&tasks.record(now))?;
        let tasks = tasks.tasks().to_vec();
        self.mirror("tasks", &self.tasks_lane, move |remote, session| async move {
            remote.replace_all_tasks(&session, &tasks).await
        });
        Ok(())
    }

    /// Push a write to the remote store in the background, if signed in.
    fn mirror<F, Fut>(&self, what: &'static str, lane: &Arc<Lane>, op: F)
    where
        F: FnOnce(Arc<dyn RemoteStore>, Session) -> Fut,
        Fut: Future<Output = Result<(), StorageError>> + Send + 'static,
    {
        let Some((remote, session)) = self.signed_in() else {
            return;
        };
        if tokio::runtime::Handle::try_current().is_err() {
            warn!(what, "no async runtime, remote write skipped");
            return;
        }

        let generation = session.generation;
        let status = Arc::clone(&self.status);
        let lane = Arc::clone(lane);
        let ticket = lane.next_ticket();
        let pending = op(Arc::clone(&remote), session);
        status.send_replace(SyncStatus::Syncing);

        let mut inflight = self.inflight();
        while inflight.try_join_next().is_some() {}
        inflight.spawn(async move {
            let _turn = lane.turn.lock().await;
            if !lane.is_latest(ticket) {
                debug!(what, ticket, "superseded by a newer save, skipping");
                return;
            }
            let result = pending.await;
            if !is_current(remote.as_ref(), generation) {
                debug!(what, "session changed, discarding remote write result");
                return;
            }
            match result {
                Ok(()) => {
                    debug!(what, "remote write done");
                    status.send_replace(SyncStatus::Synced);
                }
                Err(e) => {
                    warn!(what, error = %e, "remote write failed");
                    status.send_replace(SyncStatus::Failed);
                }
            }
        });
    }

    /// Wait for every pending remote write.
    pub async fn flush(&self) {
        let mut pending = std::mem::take(&mut *self.inflight());
        while let Some(joined) = pending.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "remote write task aborted");
            }
        }
    }

    // ── Loading ──────────────────────────────────────────────────────

    /// Remote record when signed in and one exists, else the local one.
    pub async fn load_timer(&self) -> Option<TimerRecord> {
        if let Some((remote, session)) = self.signed_in() {
            match remote.get_timer_doc(&session).await {
                Ok(Some(record)) if is_current(remote.as_ref(), session.generation) => {
                    if let Err(e) = self.cache.save_timer(&record) {
                        warn!(error = %e, "could not cache remote timer record");
                    }
                    return Some(record);
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(error = %e, "remote timer load failed, using local cache");
                    self.status.send_replace(SyncStatus::Failed);
                }
            }
        }
        self.cache.load_timer()
    }

    /// Remote tasks when signed in and there are any, else the local cache
    /// with the daily cleanup applied.
    pub async fn load_tasks(&self, now: DateTime<Utc>) -> TaskList {
        if let Some((remote, session)) = self.signed_in() {
            match remote.list_tasks(&session).await {
                Ok(tasks) if !tasks.is_empty() && is_current(remote.as_ref(), session.generation) => {
                    let list = TaskList::from_tasks(tasks);
                    if let Err(e) = self.cache.save_tasks(&list.record(now)) {
                        warn!(error = %e, "could not cache remote tasks");
                    }
                    return list;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(error = %e, "remote task load failed, using local cache");
                    self.status.send_replace(SyncStatus::Failed);
                }
            }
        }

        let Some(record) = self.cache.load_tasks() else {
            return TaskList::new();
        };
        let (list, cleaned) = TaskList::from_record(record, local_day(now));
        if cleaned {
            debug!(remaining = list.len(), "dropped completed tasks from an earlier day");
            if let Err(e) = self.cache.save_tasks(&list.record(now)) {
                warn!(error = %e, "could not write cleaned task list");
            }
        }
        list
    }

    // ── Account ──────────────────────────────────────────────────────

    /// Merge local state with the account's, store the result on both
    /// sides. Returns `None` when signed out, when the remote could not be
    /// read, or when the session changed while reading.
    pub async fn reconcile_on_sign_in(
        &self,
        local_timer: &TimerRecord,
        local_tasks: &TaskList,
        now: DateTime<Utc>,
    ) -> Result<Option<Merged>, StorageError> {
        let Some((remote, session)) = self.signed_in() else {
            return Ok(None);
        };
        self.status.send_replace(SyncStatus::Syncing);

        let fetched = tokio::try_join!(remote.get_timer_doc(&session), remote.list_tasks(&session));
        if !is_current(remote.as_ref(), session.generation) {
            debug!("session changed during sign-in merge, discarding");
            return Ok(None);
        }
        let (remote_timer, remote_tasks) = match fetched {
            Ok(pair) => pair,
            Err(e) => {
                warn!(error = %e, "could not read account data, keeping local state");
                self.status.send_replace(SyncStatus::Failed);
                return Ok(None);
            }
        };

        let (timer, timer_from) = merge_timer(local_timer, remote_timer.as_ref(), local_day(now));
        let tasks = merge_tasks(local_tasks.tasks(), &remote_tasks);
        info!(
            uid = %session.uid,
            timer_from = ?timer_from,
            local_tasks = local_tasks.len(),
            remote_tasks = remote_tasks.len(),
            merged_tasks = tasks.len(),
            "merged account data"
        );

        let merged_list = TaskList::from_tasks(tasks.clone());
        self.cache.save_timer(&timer)?;
        self.cache.save_tasks(&merged_list.record(now))?;

        // Queued pushes of older state must not land after the merge.
        self.timer_lane.next_ticket();
        self.tasks_lane.next_ticket();
        let uploaded = async {
            let _timer_turn = self.timer_lane.turn.lock().await;
            let _tasks_turn = self.tasks_lane.turn.lock().await;
            remote.set_timer_doc(&session, &timer).await?;
            remote.replace_all_tasks(&session, merged_list.tasks()).await
        }
        .await;
        if is_current(remote.as_ref(), session.generation) {
            match uploaded {
                Ok(()) => {
                    self.status.send_replace(SyncStatus::Synced);
                }
                Err(e) => {
                    warn!(error = %e, "could not upload merged data");
                    self.status.send_replace(SyncStatus::Failed);
                }
            }
        }

        Ok(Some(Merged {
            timer,
            timer_from,
            tasks: merged_list.tasks().to_vec(),
        }))
    }

    /// Sign out of the remote store. Pending writes for the old session are
    /// left to finish; their results are discarded.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        if let Some(remote) = &self.remote {
            remote.sign_out().await?;
        }
        self.status.send_replace(SyncStatus::Idle);
        Ok(())
    }
}
