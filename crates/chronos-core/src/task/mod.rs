//! Task list: an ordered, newest-first collection of to-do items.
//!
//! Ids are creation timestamps in milliseconds. Two tasks created within
//! the same millisecond get consecutive ids so ids stay unique.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::local_day;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: i64,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    /// Last toggle. Absent for tasks that were never changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Instant used to pick a winner when two copies of a task disagree.
    pub fn last_touched(&self) -> DateTime<Utc> {
        self.updated_at.unwrap_or(self.created_at)
    }
}

/// Task document as stored in the local cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    #[serde(default)]
    pub tasks: Vec<Task>,
    pub last_update: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskList {
    tasks: Vec<Task>,
}

impl TaskList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from stored tasks, restoring newest-first order.
    pub fn from_tasks(mut tasks: Vec<Task>) -> Self {
        sort_newest_first(&mut tasks);
        tasks.dedup_by_key(|t| t.id);
        Self { tasks }
    }

    /// Load a locally cached record. When the record was last written on an
    /// earlier day, completed tasks are dropped. The flag tells the caller
    /// the cleaned list should be written back.
    pub fn from_record(record: TaskRecord, today: NaiveDate) -> (Self, bool) {
        let stale = local_day(record.last_update) < today;
        let mut tasks = record.tasks;
        if stale {
            tasks.retain(|t| !t.completed);
        }
        (Self::from_tasks(tasks), stale)
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, id: i64) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn record(&self, now: DateTime<Utc>) -> TaskRecord {
        TaskRecord {
            tasks: self.tasks.clone(),
            last_update: now,
        }
    }

    /// Add a task at the head of the list. Blank text is ignored.
    pub fn add(&mut self, text: &str, now: DateTime<Utc>) -> Option<&Task> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        let mut id = now.timestamp_millis();
        if let Some(max) = self.tasks.iter().map(|t| t.id).max() {
            if id <= max {
                id = max + 1;
            }
        }
        self.tasks.insert(
            0,
            Task {
                id,
                text: text.to_string(),
                completed: false,
                created_at: now,
                updated_at: None,
            },
        );
        self.tasks.first()
    }

    /// Flip completion. Returns the new state, or `None` for an unknown id.
    pub fn toggle(&mut self, id: i64, now: DateTime<Utc>) -> Option<bool> {
        let task = self.tasks.iter_mut().find(|t| t.id == id)?;
        task.completed = !task.completed;
        task.updated_at = Some(now);
        Some(task.completed)
    }

    /// Remove by id. Returns whether anything was removed.
    pub fn delete(&mut self, id: i64) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);
        self.tasks.len() != before
    }

    pub fn replace(&mut self, tasks: Vec<Task>) {
        *self = Self::from_tasks(tasks);
    }
}

pub(crate) fn sort_newest_first(tasks: &mut [Task]) {
    tasks.sort_by(|a, b| b.id.cmp(&a.id));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap()
    }

    #[test]
    fn blank_text_is_ignored() {
        let mut list = TaskList::new();
        assert!(list.add("", t0()).is_none());
        assert!(list.add("   ", t0()).is_none());
        assert!(list.is_empty());
    }

    #[test]
    fn add_prepends_trimmed_incomplete_task() {
        let mut list = TaskList::new();
        list.add("first", t0());
        let added = list.add("  buy milk ", t0() + Duration::seconds(1)).cloned().unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list.tasks()[0], added);
        assert_eq!(added.text, "buy milk");
        assert!(!added.completed);
    }

    #[test]
    fn same_millisecond_ids_stay_unique() {
        let mut list = TaskList::new();
        list.add("a", t0());
        list.add("b", t0());
        list.add("c", t0());
        let mut ids: Vec<i64> = list.tasks().iter().map(|t| t.id).collect();
        ids.dedup();
        assert_eq!(ids.len(), 3);
        assert_eq!(list.tasks()[0].text, "c");
    }

    #[test]
    fn toggle_and_delete_by_id() {
        let mut list = TaskList::new();
        let id = list.add("write report", t0()).unwrap().id;
        assert_eq!(list.toggle(id, t0()), Some(true));
        assert_eq!(list.toggle(id, t0()), Some(false));
        assert_eq!(list.toggle(42, t0()), None);
        assert!(!list.delete(42));
        assert!(list.delete(id));
        assert!(list.is_empty());
    }

    #[test]
    fn stale_record_drops_completed_tasks() {
        let mut list = TaskList::new();
        let done = list.add("done", t0()).unwrap().id;
        list.add("open", t0() + Duration::seconds(1));
        list.toggle(done, t0());

        let record = list.record(t0());
        let today = local_day(t0() + Duration::days(1));
        let (loaded, rewrite) = TaskList::from_record(record.clone(), today);
        assert!(rewrite);
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.tasks()[0].text, "open");

        let (same_day, rewrite) = TaskList::from_record(record, local_day(t0()));
        assert!(!rewrite);
        assert_eq!(same_day.len(), 2);
    }
}
