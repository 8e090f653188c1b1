//! Logout command - forget the stored session

use crate::client::ServiceClient;
use crate::config::{Config, ConfigManager};
use crate::error::OlResult;
use crate::session::SessionManager;
use crate::ui::{self, UiContext};

/// Execute the logout command
pub fn execute(config: &Config) -> OlResult<()> {
    let ctx = UiContext::detect();
    let state_dir = ConfigManager::state_dir(config);
    let client = ServiceClient::new(config)?;
    let manager = SessionManager::new(config, &client, &state_dir);

    if manager.logout()? {
        ui::step_ok(&ctx, "Logged out");
    } else {
        ui::step_info(&ctx, "No stored session");
    }
    Ok(())
}
