//! Login command - authenticate and store the session

use super::resolve_credentials;
use crate::cli::args::LoginArgs;
use crate::client::ServiceClient;
use crate::config::{Config, ConfigManager};
use crate::error::OlResult;
use crate::session::SessionManager;
use crate::ui::{self, TaskSpinner, UiContext};

/// Execute the login command
pub fn execute(args: LoginArgs, config: &Config) -> OlResult<()> {
    let ctx = UiContext::detect();
    let state_dir = ConfigManager::ensure_state_dir(config)?;
    let client = ServiceClient::new(config)?;
    let manager = SessionManager::new(config, &client, &state_dir);

    let credentials = resolve_credentials(&ctx, args.email)?;

    let mut spinner = TaskSpinner::new(&ctx);
    spinner.start(&format!("Logging in to {}...", client.base_url()));
    match manager.login(&credentials) {
        Ok(_) => {
            spinner.stop(&format!("Logged in as {}", credentials.email));
            ui::remark(&ctx, &format!("Session stored in {}", state_dir.display()));
            Ok(())
        }
        Err(e) => {
            spinner.stop_error("Login failed");
            Err(e)
        }
    }
}
