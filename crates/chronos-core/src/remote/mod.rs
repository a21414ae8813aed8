//! Remote account store: authentication plus per-user documents.
//!
//! Implementations own the auth state. Every sign-in mints a fresh
//! [`Session::generation`]; callers tag in-flight work with it and drop
//! results whose generation is no longer current.

pub mod codec;
pub mod credentials;
pub mod firebase;
pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use uuid::Uuid;

use crate::error::{AuthError, StorageError};
use crate::task::Task;
use crate::timer::TimerRecord;

pub use firebase::FirebaseStore;
pub use memory::MemoryStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub uid: String,
    #[serde(default)]
    pub email: Option<String>,
    pub id_token: String,
    pub refresh_token: String,
    /// Identity of this sign-in. Survives token refreshes.
    pub generation: Uuid,
}

#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Short identifier for logs (e.g. "firebase", "memory").
    fn name(&self) -> &str;

    fn current_session(&self) -> Option<Session>;

    /// Auth state changes, starting with the current value.
    fn subscribe(&self) -> watch::Receiver<Option<Session>>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError>;

    async fn sign_up(&self, email: &str, password: &str) -> Result<Session, AuthError>;

    /// Sign in with a credential issued by an identity provider
    /// (e.g. `google.com` and a Google ID token).
    async fn sign_in_with_provider(
        &self,
        provider_id: &str,
        id_token: &str,
    ) -> Result<Session, AuthError>;

    /// Re-establish a session saved by an earlier process.
    async fn restore_session(&self, saved: Session) -> Result<Session, AuthError>;

    async fn sign_out(&self) -> Result<(), AuthError>;

    async fn get_timer_doc(&self, session: &Session) -> Result<Option<TimerRecord>, StorageError>;

    async fn set_timer_doc(
        &self,
        session: &Session,
        record: &TimerRecord,
    ) -> Result<(), StorageError>;

    /// Tasks newest first.
    async fn list_tasks(&self, session: &Session) -> Result<Vec<Task>, StorageError>;

    /// Delete every stored task, then insert `tasks`, as one commit.
    async fn replace_all_tasks(&self, session: &Session, tasks: &[Task])
        -> Result<(), StorageError>;
}

/// Whether `generation` still names the store's signed-in session.
pub fn is_current(store: &dyn RemoteStore, generation: Uuid) -> bool {
    store
        .current_session()
        .is_some_and(|s| s.generation == generation)
}

/// Auth state holder shared by the store implementations.
#[derive(Debug)]
pub(crate) struct AuthState {
    tx: watch::Sender<Option<Session>>,
}

impl AuthState {
    pub(crate) fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    pub(crate) fn current(&self) -> Option<Session> {
        self.tx.borrow().clone()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.tx.subscribe()
    }

    pub(crate) fn set(&self, session: Session) {
        self.tx.send_replace(Some(session));
    }

    pub(crate) fn clear(&self) {
        self.tx.send_replace(None);
    }

    /// Swap in refreshed tokens, unless the user signed out (or in as
    /// someone else) in the meantime.
    pub(crate) fn refresh(&self, refreshed: &Session) -> bool {
        self.tx.send_if_modified(|current| match current {
            Some(s) if s.generation == refreshed.generation => {
                *s = refreshed.clone();
                true
            }
            _ => false,
        })
    }
}
