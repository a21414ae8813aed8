//! Saved sign-in, kept in the OS keyring so later CLI invocations can
//! restore the session without asking for the password again.

use tracing::warn;

use super::Session;
use crate::error::StorageError;

const SERVICE: &str = "chronos";
const SESSION_KEY: &str = "session";

fn entry() -> Result<keyring::Entry, StorageError> {
    Ok(keyring::Entry::new(SERVICE, SESSION_KEY)?)
}

pub fn load_session() -> Result<Option<Session>, StorageError> {
    let raw = match entry()?.get_password() {
        Ok(pw) => pw,
        Err(keyring::Error::NoEntry) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    match serde_json::from_str(&raw) {
        Ok(session) => Ok(Some(session)),
        Err(e) => {
            warn!(error = %e, "discarding unreadable saved session");
            clear_session()?;
            Ok(None)
        }
    }
}

pub fn save_session(session: &Session) -> Result<(), StorageError> {
    let json = serde_json::to_string(session)?;
    entry()?.set_password(&json)?;
    Ok(())
}

pub fn clear_session() -> Result<(), StorageError> {
    match entry()?.delete_credential() {
        Ok(()) => Ok(()),
        Err(keyring::Error::NoEntry) => Ok(()),
        Err(e) => Err(e.into()),
    }
}
