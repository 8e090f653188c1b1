//! Prompt styling for olcli

use cliclack::ThemeState;
use console::{style, Style};

/// Prompt theme: green while editing, a check mark once answered,
/// asterisks for passwords
#[derive(Debug, Clone, Default)]
pub struct OlTheme;

impl cliclack::Theme for OlTheme {
    fn bar_color(&self, state: &ThemeState) -> Style {
        match state {
            ThemeState::Active => Style::new().green(),
            ThemeState::Error(_) => Style::new().red(),
            ThemeState::Cancel => Style::new().dim(),
            ThemeState::Submit => Style::new().dim(),
        }
    }

    fn state_symbol(&self, state: &ThemeState) -> String {
        match state {
            ThemeState::Active => style("?").green().bold(),
            ThemeState::Error(_) => style("!").red().bold(),
            ThemeState::Cancel => style("x").dim(),
            ThemeState::Submit => style("✓").green(),
        }
        .to_string()
    }

    fn input_style(&self, state: &ThemeState) -> Style {
        match state {
            ThemeState::Submit => Style::new().green(),
            ThemeState::Cancel => Style::new().dim().strikethrough(),
            _ => Style::new(),
        }
    }

    fn password_mask(&self) -> char {
        '*'
    }

    fn spinner_chars(&self) -> String {
        "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏".to_string()
    }
}

/// Install the theme for all prompts
pub fn init_theme() {
    cliclack::set_theme(OlTheme);
}
