//! CLI command implementations

pub mod cache;
pub mod compile;
pub mod config;
pub mod docs;
pub mod download;
pub mod login;
pub mod logout;
pub mod projects;

pub use cache::execute as cache;
pub use compile::execute as compile;
pub use config::execute as config;
pub use docs::execute as docs;
pub use download::execute as download;
pub use login::execute as login;
pub use logout::execute as logout;
pub use projects::execute as projects;

use crate::auth::Credentials;
use crate::error::OlResult;
use crate::session::{Session, SessionManager};
use crate::ui::{self, UiContext};
use serde::Serialize;
use std::env;
use tracing::{debug, warn};

const EMAIL_ENV: &str = "OLCLI_EMAIL";
const PASSWORD_ENV: &str = "OLCLI_PASSWORD";

/// Credentials from the flag or environment, prompting for anything missing
pub(crate) fn resolve_credentials(ctx: &UiContext, email: Option<String>) -> OlResult<Credentials> {
    let email = match email.or_else(|| non_empty_env(EMAIL_ENV)) {
        Some(email) => email,
        None => ui::input_email(ctx)?,
    };
    let password = match non_empty_env(PASSWORD_ENV) {
        Some(password) => password,
        None => ui::input_password(ctx)?,
    };
    Ok(Credentials::new(email.trim(), password))
}

fn non_empty_env(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// The stored session, or a fresh login when none is usable
pub(crate) fn open_session(ctx: &UiContext, manager: &SessionManager) -> OlResult<Session> {
    manager.ensure(|| resolve_credentials(ctx, None))
}

/// Clear the stored session when the service rejected it, so the next
/// run logs in again
pub(crate) fn forget_rejected<T>(manager: &SessionManager, result: OlResult<T>) -> OlResult<T> {
    if let Err(ref e) = result {
        if e.needs_login() {
            match manager.logout() {
                Ok(_) => debug!("Cleared rejected session"),
                Err(clear) => warn!("Could not clear rejected session: {}", clear),
            }
        }
    }
    result
}

pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> OlResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
