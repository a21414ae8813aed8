//! In-process remote store.
//!
//! Behaves like the hosted backend closely enough to exercise sign-in,
//! sync and merge logic without a network: email/password accounts,
//! per-user timer documents and task collections. Reads and writes can be
//! delayed, and writes made to fail, to simulate a slow or broken
//! connection.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::watch;
use uuid::Uuid;

use super::{AuthState, RemoteStore, Session};
use crate::error::{AuthError, StorageError};
use crate::task::{sort_newest_first, Task};
use crate::timer::TimerRecord;

#[derive(Debug)]
struct Account {
    uid: String,
    password: String,
}

#[derive(Debug, Default)]
struct Inner {
    accounts: HashMap<String, Account>,
    timer_docs: HashMap<String, TimerRecord>,
    tasks: HashMap<String, Vec<Task>>,
    read_delay: Duration,
    write_delay: Duration,
    fail_writes: bool,
    writes: usize,
}

#[derive(Debug)]
pub struct MemoryStore {
    auth: AuthState,
    inner: Mutex<Inner>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            auth: AuthState::new(),
            inner: Mutex::new(Inner::default()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Delay applied to every document read.
    pub fn set_read_delay(&self, delay: Duration) {
        self.lock().read_delay = delay;
    }

    /// Delay applied to every document write.
    pub fn set_write_delay(&self, delay: Duration) {
        self.lock().write_delay = delay;
    }

    /// Make document writes fail with HTTP 503.
    pub fn set_fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    /// Number of successful document writes so far.
    pub fn write_count(&self) -> usize {
        self.lock().writes
    }

    /// Seed a user's timer document directly.
    pub fn put_timer_doc(&self, uid: &str, record: TimerRecord) {
        self.lock().timer_docs.insert(uid.to_string(), record);
    }

    /// Seed a user's tasks directly.
    pub fn put_tasks(&self, uid: &str, tasks: Vec<Task>) {
        self.lock().tasks.insert(uid.to_string(), tasks);
    }

    pub fn timer_doc(&self, uid: &str) -> Option<TimerRecord> {
        self.lock().timer_docs.get(uid).cloned()
    }

    pub fn tasks_of(&self, uid: &str) -> Vec<Task> {
        self.lock().tasks.get(uid).cloned().unwrap_or_default()
    }

    fn open_session(&self, uid: String, email: Option<String>) -> Session {
        let session = Session {
            uid,
            email,
            id_token: Uuid::new_v4().to_string(),
            refresh_token: Uuid::new_v4().to_string(),
            generation: Uuid::new_v4(),
        };
        self.auth.set(session.clone());
        session
    }

    async fn before_read(&self) {
        let delay = self.lock().read_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    /// Wait out the configured delay, then check the failure switch.
    async fn before_write(&self) -> Result<(), StorageError> {
        let delay = self.lock().write_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.lock().fail_writes {
            return Err(StorageError::Remote {
                status: 503,
                message: "service unavailable".into(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn current_session(&self) -> Option<Session> {
        self.auth.current()
    }

    fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.auth.subscribe()
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let uid = {
            let inner = self.lock();
            let account = inner.accounts.get(email).ok_or(AuthError::UserNotFound)?;
            if account.password != password {
                return Err(AuthError::WrongPassword);
            }
            account.uid.clone()
        };
        Ok(self.open_session(uid, Some(email.to_string())))
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        if !email.contains('@') {
            return Err(AuthError::InvalidEmail);
        }
        if password.len() < 6 {
            return Err(AuthError::WeakPassword);
        }
        let uid = {
            let mut inner = self.lock();
            if inner.accounts.contains_key(email) {
                return Err(AuthError::EmailAlreadyInUse);
            }
            let uid = Uuid::new_v4().simple().to_string();
            inner.accounts.insert(
                email.to_string(),
                Account {
                    uid: uid.clone(),
                    password: password.to_string(),
                },
            );
            uid
        };
        Ok(self.open_session(uid, Some(email.to_string())))
    }

    async fn sign_in_with_provider(
        &self,
        provider_id: &str,
        id_token: &str,
    ) -> Result<Session, AuthError> {
        if id_token.trim().is_empty() {
            return Err(AuthError::Other("INVALID_IDP_RESPONSE".into()));
        }
        Ok(self.open_session(format!("{provider_id}:{id_token}"), None))
    }

    async fn restore_session(&self, saved: Session) -> Result<Session, AuthError> {
        self.auth.set(saved.clone());
        Ok(saved)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.auth.clear();
        Ok(())
    }

    async fn get_timer_doc(&self, session: &Session) -> Result<Option<TimerRecord>, StorageError> {
        self.before_read().await;
        Ok(self.lock().timer_docs.get(&session.uid).cloned())
    }

    async fn set_timer_doc(
        &self,
        session: &Session,
        record: &TimerRecord,
    ) -> Result<(), StorageError> {
        self.before_write().await?;
        let mut inner = self.lock();
        inner.timer_docs.insert(session.uid.clone(), record.clone());
        inner.writes += 1;
        Ok(())
    }

    async fn list_tasks(&self, session: &Session) -> Result<Vec<Task>, StorageError> {
        self.before_read().await;
        let mut tasks = self.tasks_of(&session.uid);
        sort_newest_first(&mut tasks);
        Ok(tasks)
    }

    async fn replace_all_tasks(
        &self,
        session: &Session,
        tasks: &[Task],
    ) -> Result<(), StorageError> {
        self.before_write().await?;
        let mut inner = self.lock();
        inner.tasks.insert(session.uid.clone(), tasks.to_vec());
        inner.writes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sign_up_then_sign_in() {
        let store = MemoryStore::new();
        let first = store.sign_up("ada@example.com", "hunter22").await.unwrap();
        store.sign_out().await.unwrap();
        assert!(store.current_session().is_none());

        let second = store.sign_in("ada@example.com", "hunter22").await.unwrap();
        assert_eq!(first.uid, second.uid);
        assert_ne!(first.generation, second.generation);
        assert_eq!(store.current_session(), Some(second));
    }

    #[tokio::test]
    async fn auth_failures_use_backend_codes() {
        let store = MemoryStore::new();
        assert_eq!(
            store.sign_up("not-an-email", "hunter22").await.unwrap_err(),
            AuthError::InvalidEmail
        );
        assert_eq!(
            store.sign_up("ada@example.com", "123").await.unwrap_err(),
            AuthError::WeakPassword
        );
        store.sign_up("ada@example.com", "hunter22").await.unwrap();
        assert_eq!(
            store.sign_up("ada@example.com", "hunter22").await.unwrap_err(),
            AuthError::EmailAlreadyInUse
        );
        assert_eq!(
            store.sign_in("ada@example.com", "nope").await.unwrap_err(),
            AuthError::WrongPassword
        );
        assert_eq!(
            store.sign_in("bob@example.com", "hunter22").await.unwrap_err(),
            AuthError::UserNotFound
        );
    }

    #[tokio::test]
    async fn subscribers_see_sign_out() {
        let store = MemoryStore::new();
        let mut rx = store.subscribe();
        store.sign_up("ada@example.com", "hunter22").await.unwrap();
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().is_some());
        store.sign_out().await.unwrap();
        rx.changed().await.unwrap();
        assert!(rx.borrow().is_none());
    }
}
