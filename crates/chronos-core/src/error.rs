//! Core error types for chronos-core.
//!
//! The hierarchy mirrors the three failure families the app surfaces:
//! authentication (shown inline to the user), storage (local cache or
//! remote store; surfaced through the sync status) and parse errors
//! (corrupt cached JSON, treated as empty state by callers).

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for chronos-core.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Authentication failures reported by the remote store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("email already in use")]
    EmailAlreadyInUse,

    #[error("invalid email")]
    InvalidEmail,

    #[error("user not found")]
    UserNotFound,

    #[error("wrong password")]
    WrongPassword,

    #[error("weak password")]
    WeakPassword,

    #[error("too many requests")]
    TooManyRequests,

    #[error("network request failed: {0}")]
    Network(String),

    #[error("not signed in")]
    NotSignedIn,

    #[error("auth error: {0}")]
    Other(String),
}

impl AuthError {
    /// Map a backend error code (e.g. `EMAIL_EXISTS`) to an [`AuthError`].
    ///
    /// Identity Toolkit sometimes appends detail after the code
    /// (`WEAK_PASSWORD : Password should be at least 6 characters`),
    /// so only the leading token is matched.
    pub fn from_code(code: &str) -> Self {
        let head = code.split([' ', ':']).next().unwrap_or_default();
        match head {
            "EMAIL_EXISTS" => AuthError::EmailAlreadyInUse,
            "INVALID_EMAIL" | "MISSING_EMAIL" => AuthError::InvalidEmail,
            "EMAIL_NOT_FOUND" | "USER_DISABLED" => AuthError::UserNotFound,
            "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" | "MISSING_PASSWORD" => {
                AuthError::WrongPassword
            }
            "WEAK_PASSWORD" => AuthError::WeakPassword,
            "TOO_MANY_ATTEMPTS_TRY_LATER" => AuthError::TooManyRequests,
            "TOKEN_EXPIRED" | "INVALID_REFRESH_TOKEN" | "INVALID_ID_TOKEN" => AuthError::NotSignedIn,
            other => AuthError::Other(other.to_string()),
        }
    }

    /// Message suitable for inline display next to the auth form.
    pub fn user_message(&self) -> &'static str {
        match self {
            AuthError::EmailAlreadyInUse => "This email is already registered",
            AuthError::InvalidEmail => "Invalid email address",
            AuthError::UserNotFound => "No account found with this email",
            AuthError::WrongPassword => "Incorrect password",
            AuthError::WeakPassword => "Password should be at least 6 characters",
            AuthError::TooManyRequests => "Too many attempts. Try again later",
            AuthError::Network(_) => "Network error. Check your connection",
            AuthError::NotSignedIn | AuthError::Other(_) => "An error occurred. Please try again",
        }
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        AuthError::Network(err.to_string())
    }
}

/// Local cache and remote document failures.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to open local cache at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Local cache query failed: {0}")]
    Query(#[from] rusqlite::Error),

    #[error("Remote request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Remote store returned HTTP {status}: {message}")]
    Remote { status: u16, message: String },

    #[error("Malformed remote document: {0}")]
    Malformed(String),

    #[error("Not signed in")]
    NotSignedIn,

    #[error("Credential store error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("Serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A cached record could not be decoded.
#[derive(Error, Debug)]
#[error("corrupt record '{key}': {source}")]
pub struct ParseError {
    pub key: String,
    #[source]
    pub source: serde_json::Error,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

/// Validation errors.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Unknown setting: {0}")]
    UnknownSetting(String),

    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
