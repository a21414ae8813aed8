//! Reconciling local and remote state when a user signs in.
//!
//! Tasks are unioned by id. When both sides hold the same task the copy
//! touched last wins; a tie keeps the local copy. The timer record is not
//! merged field by field: the side that has done more today wins.

use chrono::NaiveDate;
use std::collections::HashMap;

use crate::task::{sort_newest_first, Task};
use crate::timer::TimerRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeSide {
    Local,
    Remote,
}

/// Pick which timer record survives.
///
/// Counters are compared as they would be adopted `today` (a record saved
/// on another day counts as zero sessions). Ties go to the later save date,
/// then to local.
pub fn pick_timer(local: &TimerRecord, remote: &TimerRecord, today: NaiveDate) -> MergeSide {
    let local_done = local.stats_for(today).completed_sessions;
    let remote_done = remote.stats_for(today).completed_sessions;

    if remote_done != local_done {
        return if remote_done > local_done {
            MergeSide::Remote
        } else {
            MergeSide::Local
        };
    }
    if remote.last_save_date > local.last_save_date {
        MergeSide::Remote
    } else {
        MergeSide::Local
    }
}

pub fn merge_timer(
    local: &TimerRecord,
    remote: Option<&TimerRecord>,
    today: NaiveDate,
) -> (TimerRecord, MergeSide) {
    match remote {
        Some(remote) => match pick_timer(local, remote, today) {
            MergeSide::Local => (local.clone(), MergeSide::Local),
            MergeSide::Remote => (remote.clone(), MergeSide::Remote),
        },
        None => (local.clone(), MergeSide::Local),
    }
}

/// Union by id, newest first.
pub fn merge_tasks(local: &[Task], remote: &[Task]) -> Vec<Task> {
    let mut by_id: HashMap<i64, Task> = local.iter().map(|t| (t.id, t.clone())).collect();

    for theirs in remote {
        match by_id.get(&theirs.id) {
            Some(ours) if ours.last_touched() >= theirs.last_touched() => {}
            _ => {
                by_id.insert(theirs.id, theirs.clone());
            }
        }
    }

    let mut merged: Vec<Task> = by_id.into_values().collect();
    sort_newest_first(&mut merged);
    merged
}
