//! Interactive prompts with non-interactive fallback

use super::context::UiContext;
use crate::error::{OlError, OlResult};

/// Ask for confirmation; returns `default` when prompts are unavailable
pub fn confirm(ctx: &UiContext, message: &str, default: bool) -> OlResult<bool> {
    if ctx.auto_yes() {
        println!("  {} (auto-approved)", message);
        return Ok(true);
    }

    if !ctx.is_interactive() {
        return Ok(default);
    }

    cliclack::confirm(message)
        .initial_value(default)
        .interact()
        .map_err(|e| OlError::Prompt(e.to_string()))
}

/// Ask for the account email
pub fn input_email(ctx: &UiContext) -> OlResult<String> {
    if !ctx.is_interactive() {
        return Err(OlError::Prompt(
            "no email given and no terminal to ask for one; set OLCLI_EMAIL".to_string(),
        ));
    }

    let email = cliclack::input("Email")
        .placeholder("you@example.org")
        .validate(|input: &String| {
            if input.contains('@') {
                Ok(())
            } else {
                Err("Enter an email address")
            }
        })
        .interact::<String>()
        .map_err(|e| OlError::Prompt(e.to_string()))?;

    Ok(email.trim().to_string())
}

/// Ask for the account password without echoing it
pub fn input_password(ctx: &UiContext) -> OlResult<String> {
    if !ctx.is_interactive() {
        return Err(OlError::Prompt(
            "no password given and no terminal to ask for one; set OLCLI_PASSWORD".to_string(),
        ));
    }

    cliclack::password("Password")
        .mask('▪')
        .interact()
        .map_err(|e| OlError::Prompt(e.to_string()))
}
