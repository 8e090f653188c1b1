//! Config command - show or edit configuration

use crate::cli::args::{ConfigAction, ConfigArgs};
use crate::config::{Config, ConfigManager};
use crate::error::{OlError, OlResult};
use crate::ui::{self, UiContext};
use std::path::PathBuf;

/// Keys accepted by `config set`
const VALID_KEYS: [&str; 11] = [
    "general.log_format",
    "service.base_url",
    "service.user_agent",
    "service.session_cookie",
    "http.submit_timeout_secs",
    "http.request_timeout_secs",
    "http.socket_timeout_secs",
    "cache.ttl_secs",
    "cache.max_entries",
    "download.output_dir",
    "paths.state_dir",
];

/// Execute the config command
pub fn execute(args: ConfigArgs, config: &Config, manager: &ConfigManager) -> OlResult<()> {
    match args.action {
        None | Some(ConfigAction::Show) => show_config(config)?,
        Some(ConfigAction::Path) => println!("{}", manager.path().display()),
        Some(ConfigAction::Init { force }) => init_config(manager, force)?,
        Some(ConfigAction::Set { key, value }) => set_value(manager, config, &key, &value)?,
    }

    Ok(())
}

fn show_config(config: &Config) -> OlResult<()> {
    println!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

fn init_config(manager: &ConfigManager, force: bool) -> OlResult<()> {
    let ctx = UiContext::detect();
    let path = manager.path();

    if path.exists() && !force {
        ui::step_warn_hint(
            &ctx,
            &format!("Config already exists at {}", path.display()),
            "Use --force to overwrite",
        );
        return Ok(());
    }

    manager.save(&Config::default())?;
    ui::step_ok_detail(&ctx, "Configuration initialized", &path.display().to_string());

    Ok(())
}

fn set_value(manager: &ConfigManager, config: &Config, key: &str, value: &str) -> OlResult<()> {
    let ctx = UiContext::detect();
    let mut config = config.clone();

    if let Err(e) = apply_setting(&mut config, key, value) {
        if !VALID_KEYS.contains(&key) {
            ui::step_error_detail(&ctx, "Unknown config key", key);
            ui::remark(&ctx, "Valid keys:");
            for key in VALID_KEYS {
                eprintln!("  {}", key);
            }
        }
        return Err(e);
    }

    manager.save(&config)?;
    ui::step_ok(&ctx, &format!("Set {} = {}", key, value));

    Ok(())
}

/// Apply a dot-separated `key = value` to a configuration
fn apply_setting(config: &mut Config, key: &str, value: &str) -> OlResult<()> {
    let parts: Vec<&str> = key.split('.').collect();

    match parts.as_slice() {
        ["general", "log_format"] => {
            config.general.log_format = match value {
                "text" | "json" => value.to_string(),
                _ => {
                    return Err(OlError::User(format!(
                        "Invalid log format: {}. Use text or json",
                        value
                    )))
                }
            }
        }

        ["service", "base_url"] => {
            let base = value.trim().trim_end_matches('/');
            if !crate::client::is_absolute_url(base) {
                return Err(OlError::User(format!(
                    "service.base_url must be an http(s) URL, got '{}'",
                    value
                )));
            }
            config.service.base_url = base.to_string();
        }
        ["service", "user_agent"] => config.service.user_agent = value.to_string(),
        ["service", "session_cookie"] => config.service.session_cookie = non_empty(key, value)?,

        ["http", "submit_timeout_secs"] => config.http.submit_timeout_secs = parse_u64(value)?,
        ["http", "request_timeout_secs"] => config.http.request_timeout_secs = parse_u64(value)?,
        ["http", "socket_timeout_secs"] => config.http.socket_timeout_secs = parse_u64(value)?,

        ["cache", "ttl_secs"] => config.cache.ttl_secs = parse_u64(value)?,
        ["cache", "max_entries"] => config.cache.max_entries = parse_usize(value)?,

        ["download", "output_dir"] => config.download.output_dir = PathBuf::from(non_empty(key, value)?),

        ["paths", "state_dir"] => {
            config.paths.state_dir = (!value.trim().is_empty()).then(|| PathBuf::from(value))
        }

        _ => return Err(OlError::User(format!("Unknown config key: {}", key))),
    }

    Ok(())
}

fn non_empty(key: &str, value: &str) -> OlResult<String> {
    if value.trim().is_empty() {
        return Err(OlError::User(format!("{} cannot be empty", key)));
    }
    Ok(value.to_string())
}

fn parse_u64(value: &str) -> OlResult<u64> {
    value
        .trim()
        .parse()
        .map_err(|_| OlError::User(format!("Invalid number: {}", value)))
}

fn parse_usize(value: &str) -> OlResult<usize> {
    value
        .trim()
        .parse()
        .map_err(|_| OlError::User(format!("Invalid number: {}", value)))
}
