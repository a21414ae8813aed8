use chronos_core::remote::credentials;
use chronos_core::{App, AuthError, RemoteStore, Session};
use clap::Subcommand;
use serde_json::json;
use std::sync::Arc;

use super::{open_app, CmdResult};

#[derive(Subcommand)]
pub enum AuthAction {
    /// Sign in with email and password
    Login {
        email: String,
        /// Prompted for (without echo) when omitted
        #[arg(long)]
        password: Option<String>,
    },
    /// Create an account
    Signup {
        email: String,
        /// Prompted for (without echo) when omitted
        #[arg(long)]
        password: Option<String>,
    },
    /// Sign in with an identity provider token (e.g. google.com)
    Provider {
        /// Provider id, e.g. "google.com"
        provider_id: String,
        /// ID token issued by the provider
        id_token: String,
    },
    /// Sign out and forget the saved session
    Logout,
    /// Show sign-in and sync state
    Status,
}

pub async fn run(action: AuthAction) -> CmdResult {
    let mut app = open_app().await?;

    match action {
        AuthAction::Login { email, password } => {
            let remote = remote_of(&app)?;
            let password = password_or_prompt(password, |p| rpassword::prompt_password(p))?;
            let session = user_facing(remote.sign_in(&email, &password).await)?;
            finish_sign_in(&mut app, &session).await?;
        }
        AuthAction::Signup { email, password } => {
            let remote = remote_of(&app)?;
            let password = password_or_prompt(password, |p| rpassword::prompt_password(p))?;
            let session = user_facing(remote.sign_up(&email, &password).await)?;
            finish_sign_in(&mut app, &session).await?;
        }
        AuthAction::Provider {
            provider_id,
            id_token,
        } => {
            let remote = remote_of(&app)?;
            let session =
                user_facing(remote.sign_in_with_provider(&provider_id, &id_token).await)?;
            finish_sign_in(&mut app, &session).await?;
        }
        AuthAction::Logout => {
            app.flush().await;
            user_facing(app.sign_out().await)?;
            credentials::clear_session()?;
            println!("signed out");
        }
        AuthAction::Status => {
            let session = app.bridge().session();
            let status = json!({
                "remote": app.bridge().remote().map(|r| r.name().to_string()),
                "signedIn": session.is_some(),
                "uid": session.as_ref().map(|s| s.uid.clone()),
                "email": session.as_ref().and_then(|s| s.email.clone()),
                "sync": app.sync_status(),
            });
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
    }

    app.flush().await;
    Ok(())
}

fn remote_of(app: &App) -> Result<Arc<dyn RemoteStore>, Box<dyn std::error::Error>> {
    app.bridge().remote().cloned().ok_or_else(|| {
        "remote sync is not configured (set remote.api_key and remote.project_id)".into()
    })
}

/// Replace auth errors with the message shown to users.
fn user_facing<T>(result: Result<T, AuthError>) -> Result<T, Box<dyn std::error::Error>> {
    result.map_err(|e| {
        tracing::debug!(error = %e, "auth failed");
        e.user_message().into()
    })
}

async fn finish_sign_in(app: &mut App, session: &Session) -> CmdResult {
    credentials::save_session(session)?;
    let merged = app.on_sign_in().await?;
    let out = json!({
        "uid": session.uid,
        "email": session.email,
        "timerFrom": merged.map(|side| format!("{side:?}").to_lowercase()),
        "tasks": app.tasks().len(),
        "sync": app.sync_status(),
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

fn password_or_prompt<P>(
    password: Option<String>,
    prompt: P,
) -> Result<String, Box<dyn std::error::Error>>
where
    P: FnOnce(&str) -> std::io::Result<String>,
{
    if let Some(password) = password {
        return Ok(password);
    }
    let password = prompt("password: ")?;
    if password.is_empty() {
        return Err("empty password".into());
    }
    Ok(password)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_flag_skips_prompt() {
        let password = password_or_prompt(Some("hunter22".into()), |_| {
            panic!("prompt must not be shown")
        })
        .unwrap();
        assert_eq!(password, "hunter22");
    }

    #[test]
    fn missing_flag_uses_hidden_prompt() {
        let mut shown = None;
        let password = password_or_prompt(None, |prompt| {
            shown = Some(prompt.to_string());
            Ok("hunter22".into())
        })
        .unwrap();
        assert_eq!(password, "hunter22");
        assert_eq!(shown.as_deref(), Some("password: "));
    }

    #[test]
    fn empty_prompt_answer_is_rejected() {
        assert!(password_or_prompt(None, |_| Ok(String::new())).is_err());
    }
}
