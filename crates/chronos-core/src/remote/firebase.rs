//! Firebase REST client: Identity Toolkit for accounts, Secure Token for
//! refresh, Firestore for documents.
//!
//! Layout per user:
//! - `users/{uid}/timer/data` holds the [`TimerRecord`] plus `updatedAt`
//! - `users/{uid}/tasks/{id}` holds one [`Task`] each

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::watch;
use tracing::{debug, warn};
use uuid::Uuid;

use super::codec::{decode_document, encode_fields, timestamp_value};
use super::{AuthState, RemoteStore, Session};
use crate::error::{AuthError, StorageError};
use crate::storage::RemoteConfig;
use crate::task::{sort_newest_first, Task};
use crate::timer::TimerRecord;

const PAGE_SIZE: &str = "300";

/// Identity Toolkit sign-in/sign-up response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    id_token: String,
    refresh_token: String,
}

/// Secure Token refresh response (snake_case, unlike the rest).
#[derive(Debug, Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
    user_id: String,
}

pub struct FirebaseStore {
    http: Client,
    config: RemoteConfig,
    auth: AuthState,
}

impl FirebaseStore {
    pub fn new(config: RemoteConfig) -> Self {
        Self::with_client(config, Client::new())
    }

    pub fn with_client(config: RemoteConfig, http: Client) -> Self {
        Self {
            http,
            config,
            auth: AuthState::new(),
        }
    }

    fn accounts_url(&self, method: &str) -> String {
        format!(
            "{}/v1/accounts:{method}",
            self.config.auth_url.trim_end_matches('/')
        )
    }

    fn database_path(&self) -> String {
        format!("projects/{}/databases/(default)", self.config.project_id)
    }

    fn documents_url(&self) -> String {
        format!(
            "{}/v1/{}/documents",
            self.config.firestore_url.trim_end_matches('/'),
            self.database_path()
        )
    }

    fn timer_doc_url(&self, uid: &str) -> String {
        format!("{}/users/{uid}/timer/data", self.documents_url())
    }

    fn tasks_url(&self, uid: &str) -> String {
        format!("{}/users/{uid}/tasks", self.documents_url())
    }

    fn task_doc_name(&self, uid: &str, id: i64) -> String {
        format!("{}/documents/users/{uid}/tasks/{id}", self.database_path())
    }

    async fn account_request(&self, method: &str, body: Value) -> Result<Session, AuthError> {
        let resp = self
            .http
            .post(self.accounts_url(method))
            .query(&[("key", &self.config.api_key)])
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(auth_error(resp).await);
        }

        let account: AccountResponse = resp.json().await?;
        let session = Session {
            uid: account.local_id,
            email: account.email.filter(|e| !e.is_empty()),
            id_token: account.id_token,
            refresh_token: account.refresh_token,
            generation: Uuid::new_v4(),
        };
        debug!(uid = %session.uid, method, "signed in");
        self.auth.set(session.clone());
        Ok(session)
    }

    /// Exchange the refresh token for a new ID token. The generation is kept.
    async fn refresh_tokens(&self, session: &Session) -> Result<Session, AuthError> {
        let resp = self
            .http
            .post(format!(
                "{}/v1/token",
                self.config.token_url.trim_end_matches('/')
            ))
            .query(&[("key", &self.config.api_key)])
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", session.refresh_token.as_str()),
            ])
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(auth_error(resp).await);
        }

        let refreshed: RefreshResponse = resp.json().await?;
        if refreshed.user_id != session.uid {
            return Err(AuthError::Other("USER_MISMATCH".into()));
        }
        Ok(Session {
            id_token: refreshed.id_token,
            refresh_token: refreshed.refresh_token,
            ..session.clone()
        })
    }

    /// Latest tokens for `session`'s sign-in; a concurrent call may have
    /// refreshed them already.
    fn tokens_for(&self, session: &Session) -> Session {
        match self.auth.current() {
            Some(current) if current.generation == session.generation => current,
            _ => session.clone(),
        }
    }

    /// Send with the session's bearer token. On 401 the tokens are
    /// refreshed once and the request retried.
    async fn send_authed<F>(&self, session: &Session, build: F) -> Result<Response, StorageError>
    where
        F: Fn() -> RequestBuilder,
    {
        let session = self.tokens_for(session);
        let resp = build().bearer_auth(&session.id_token).send().await?;
        if resp.status() != StatusCode::UNAUTHORIZED {
            return Ok(resp);
        }

        debug!(uid = %session.uid, "id token rejected, refreshing");
        let refreshed = self.refresh_tokens(&session).await.map_err(|e| {
            warn!(error = %e, "token refresh failed");
            StorageError::NotSignedIn
        })?;
        if !self.auth.refresh(&refreshed) {
            return Err(StorageError::NotSignedIn);
        }
        Ok(build().bearer_auth(&refreshed.id_token).send().await?)
    }

    async fn list_task_documents(&self, session: &Session) -> Result<Vec<Value>, StorageError> {
        let url = self.tasks_url(&session.uid);
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let resp = self
                .send_authed(session, || {
                    let mut request = self.http.get(&url).query(&[("pageSize", PAGE_SIZE)]);
                    if let Some(token) = &page_token {
                        request = request.query(&[("pageToken", token)]);
                    }
                    request
                })
                .await?;
            let body: Value = checked(resp).await?.json().await?;

            if let Some(docs) = body["documents"].as_array() {
                documents.extend(docs.iter().cloned());
            }

            page_token = body["nextPageToken"]
                .as_str()
                .filter(|t| !t.is_empty())
                .map(str::to_string);
            if page_token.is_none() {
                break;
            }
        }

        Ok(documents)
    }
}

#[async_trait]
impl RemoteStore for FirebaseStore {
    fn name(&self) -> &str {
        "firebase"
    }

    fn current_session(&self) -> Option<Session> {
        self.auth.current()
    }

    fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.auth.subscribe()
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        self.account_request(
            "signInWithPassword",
            json!({ "email": email, "password": password, "returnSecureToken": true }),
        )
        .await
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        self.account_request(
            "signUp",
            json!({ "email": email, "password": password, "returnSecureToken": true }),
        )
        .await
    }

    async fn sign_in_with_provider(
        &self,
        provider_id: &str,
        id_token: &str,
    ) -> Result<Session, AuthError> {
        let post_body = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("id_token", id_token)
            .append_pair("providerId", provider_id)
            .finish();
        self.account_request(
            "signInWithIdp",
            json!({
                "postBody": post_body,
                "requestUri": "http://localhost",
                "returnSecureToken": true,
                "returnIdpCredential": true,
            }),
        )
        .await
    }

    async fn restore_session(&self, saved: Session) -> Result<Session, AuthError> {
        match self.refresh_tokens(&saved).await {
            Ok(session) => {
                self.auth.set(session.clone());
                Ok(session)
            }
            // Offline: keep the saved tokens, the next request refreshes.
            Err(AuthError::Network(e)) => {
                warn!(error = %e, "could not refresh saved session, using it as is");
                self.auth.set(saved.clone());
                Ok(saved)
            }
            Err(e) => Err(e),
        }
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.auth.clear();
        Ok(())
    }

    async fn get_timer_doc(&self, session: &Session) -> Result<Option<TimerRecord>, StorageError> {
        let url = self.timer_doc_url(&session.uid);
        let resp = self.send_authed(session, || self.http.get(&url)).await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let doc: Value = checked(resp).await?.json().await?;
        let plain = decode_document(&doc)?;
        let record = serde_json::from_value(plain)
            .map_err(|e| StorageError::Malformed(format!("timer document: {e}")))?;
        Ok(Some(record))
    }

    async fn set_timer_doc(
        &self,
        session: &Session,
        record: &TimerRecord,
    ) -> Result<(), StorageError> {
        let Value::Object(plain) = serde_json::to_value(record)? else {
            return Err(StorageError::Malformed("timer record is not an object".into()));
        };
        let mut fields = encode_fields(&plain);
        fields.insert("updatedAt".into(), timestamp_value(Utc::now()));

        // Listing every field in the mask merges instead of overwriting.
        let mask: Vec<(&str, String)> = fields
            .keys()
            .map(|k| ("updateMask.fieldPaths", k.clone()))
            .collect();
        let body = json!({ "fields": fields });
        let url = self.timer_doc_url(&session.uid);

        let resp = self
            .send_authed(session, || self.http.patch(&url).query(&mask).json(&body))
            .await?;
        checked(resp).await?;
        Ok(())
    }

    async fn list_tasks(&self, session: &Session) -> Result<Vec<Task>, StorageError> {
        let mut tasks = Vec::new();
        for doc in self.list_task_documents(session).await? {
            match task_from_document(&doc) {
                Ok(task) => tasks.push(task),
                Err(e) => warn!(error = %e, "skipping unreadable task document"),
            }
        }
        sort_newest_first(&mut tasks);
        Ok(tasks)
    }

    async fn replace_all_tasks(
        &self,
        session: &Session,
        tasks: &[Task],
    ) -> Result<(), StorageError> {
        let keep: Vec<String> = tasks
            .iter()
            .map(|t| self.task_doc_name(&session.uid, t.id))
            .collect();

        let mut writes = Vec::new();
        for doc in self.list_task_documents(session).await? {
            if let Some(name) = doc["name"].as_str() {
                if !keep.iter().any(|k| name.ends_with(k.as_str())) {
                    writes.push(json!({ "delete": name }));
                }
            }
        }
        for (task, name) in tasks.iter().zip(&keep) {
            let Value::Object(plain) = serde_json::to_value(task)? else {
                continue;
            };
            writes.push(json!({
                "update": { "name": name, "fields": encode_fields(&plain) }
            }));
        }

        if writes.is_empty() {
            return Ok(());
        }

        let url = format!("{}:commit", self.documents_url());
        let body = json!({ "writes": writes });
        let resp = self
            .send_authed(session, || self.http.post(&url).json(&body))
            .await?;
        checked(resp).await?;
        debug!(uid = %session.uid, count = tasks.len(), "replaced remote tasks");
        Ok(())
    }
}

/// Turn a non-success response into [`StorageError::Remote`].
async fn checked(resp: Response) -> Result<Response, StorageError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body: Value = resp.json().await.unwrap_or(Value::Null);
    let message = body["error"]["message"]
        .as_str()
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed"))
        .to_string();
    Err(StorageError::Remote {
        status: status.as_u16(),
        message,
    })
}

async fn auth_error(resp: Response) -> AuthError {
    let status = resp.status();
    match resp.json::<Value>().await {
        Ok(body) => match body["error"]["message"].as_str() {
            Some(code) => AuthError::from_code(code),
            None => AuthError::Other(format!("HTTP {status}")),
        },
        Err(e) => AuthError::Network(e.to_string()),
    }
}

fn task_from_document(doc: &Value) -> Result<Task, StorageError> {
    let mut plain = decode_document(doc)?;
    let id = doc["name"]
        .as_str()
        .and_then(|name| name.rsplit('/').next())
        .and_then(|id| id.parse::<i64>().ok());
    if let (Some(id), Value::Object(map)) = (id, &mut plain) {
        map.entry("id").or_insert(Value::from(id));
    }
    serde_json::from_value(plain).map_err(|e| StorageError::Malformed(format!("task: {e}")))
}
