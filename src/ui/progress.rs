//! Progress indicators with CI fallback

use super::context::UiContext;
use crate::download::ProgressSink;
use console::style;
use indicatif::{HumanBytes, ProgressBar, ProgressStyle};
use std::io::Write;
use std::time::Duration;

/// A task spinner with CI fallback
pub struct TaskSpinner {
    spinner: Option<cliclack::ProgressBar>,
    interactive: bool,
}

impl TaskSpinner {
    pub fn new(ctx: &UiContext) -> Self {
        Self {
            spinner: None,
            interactive: ctx.use_fancy_output(),
        }
    }

    /// Start the spinner with a message
    pub fn start(&mut self, message: &str) {
        if self.interactive {
            let spinner = cliclack::spinner();
            spinner.start(message);
            self.spinner = Some(spinner);
        } else {
            println!("{} {}", style("...").dim(), message);
        }
    }

    /// Stop with success message
    pub fn stop(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.stop(message);
        } else if self.interactive {
            println!("{} {}", style("✓").green(), message);
        } else {
            println!("{} {}", style("[OK]").green(), message);
        }
    }

    /// Stop with error message
    pub fn stop_error(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.error(message);
        } else if self.interactive {
            println!("{} {}", style("✗").red(), message);
        } else {
            println!("{} {}", style("[FAIL]").red(), message);
        }
    }
}

/// Download progress: an indicatif bar on terminals, one dot per
/// doubling of received bytes otherwise.
pub struct DownloadProgress {
    label: String,
    bar: Option<ProgressBar>,
    dots: bool,
}

impl DownloadProgress {
    pub fn new(ctx: &UiContext, label: &str) -> Self {
        Self {
            label: label.to_string(),
            bar: None,
            dots: !ctx.use_fancy_output(),
        }
    }

    fn bar_for(&self, total: Option<u64>) -> ProgressBar {
        let (bar, template) = match total {
            Some(len) => (
                ProgressBar::new(len),
                "  {spinner:.green} {prefix}  {bar:24.green/dim} {bytes}/{total_bytes}  {elapsed:.dim}",
            ),
            None => (
                ProgressBar::new_spinner(),
                "  {spinner:.green} {prefix}  {bytes}  {elapsed:.dim}",
            ),
        };
        let style = ProgressStyle::default_bar()
            .template(template)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
            .progress_chars("━╸─");
        bar.set_style(style);
        bar.set_prefix(self.label.clone());
        bar.enable_steady_tick(Duration::from_millis(120));
        bar
    }
}

impl ProgressSink for DownloadProgress {
    fn begin(&mut self, total: Option<u64>) {
        if self.dots {
            print!("Downloading {}", self.label);
            let _ = std::io::stdout().flush();
        } else {
            self.bar = Some(self.bar_for(total));
        }
    }

    fn advance(&mut self, received: u64) {
        if let Some(ref bar) = self.bar {
            bar.set_position(received);
        }
    }

    fn mark(&mut self, _received: u64) {
        if self.dots {
            print!(".");
            let _ = std::io::stdout().flush();
        }
    }

    fn finish(&mut self, received: u64) {
        if let Some(bar) = self.bar.take() {
            bar.disable_steady_tick();
            bar.finish_and_clear();
        } else if self.dots {
            println!(" {}", HumanBytes(received));
        }
    }
}

impl Drop for DownloadProgress {
    fn drop(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}
