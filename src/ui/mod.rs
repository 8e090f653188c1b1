//! Terminal output for olcli
//!
//! Uses `cliclack` for prompts and step output on interactive terminals,
//! with plain `[OK]`/`[WARN]` lines when stdout is piped or running in CI.
//!
//! # Example
//!
//! ```rust,ignore
//! use olcli::ui::{self, TaskSpinner, UiContext};
//!
//! let ctx = UiContext::detect();
//! let mut spinner = TaskSpinner::new(&ctx);
//! spinner.start("Compiling...");
//! // ... do work ...
//! spinner.stop("Compiled (log, pdf)");
//!
//! ui::step_ok_detail(&ctx, "Saved output.pdf", "84 KiB");
//! ```

mod context;
mod output;
mod progress;
mod prompts;
mod theme;

pub use context::UiContext;
pub use output::{
    key_value, remark, step_error_detail, step_info, step_ok, step_ok_detail, step_warn_hint,
};
pub use progress::{DownloadProgress, TaskSpinner};
pub use prompts::{confirm, input_email, input_password};
pub use theme::{init_theme, OlTheme};
