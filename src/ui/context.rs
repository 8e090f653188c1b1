//! Detection of interactive terminals vs CI and pipes

use std::io::IsTerminal;

/// Environment variables that mark a CI run
const CI_VARS: [&str; 8] = [
    "CI",
    "GITHUB_ACTIONS",
    "GITLAB_CI",
    "CIRCLECI",
    "TRAVIS",
    "JENKINS_URL",
    "BUILDKITE",
    "TF_BUILD",
];

/// Decides how output is rendered and whether prompts may block
#[derive(Debug, Clone)]
pub struct UiContext {
    /// Both stdin and stdout are terminals and no CI marker is set
    interactive: bool,
    /// `--yes` was passed
    auto_yes: bool,
}

impl UiContext {
    /// Inspect the current process
    pub fn detect() -> Self {
        Self {
            interactive: Self::detect_interactive(),
            auto_yes: false,
        }
    }

    /// Plain output, no prompts
    pub fn non_interactive() -> Self {
        Self {
            interactive: false,
            auto_yes: false,
        }
    }

    pub fn with_auto_yes(mut self, yes: bool) -> Self {
        self.auto_yes = yes;
        self
    }

    /// Whether prompts can be shown
    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    pub fn auto_yes(&self) -> bool {
        self.auto_yes
    }

    /// Whether spinners, progress bars and cliclack framing are used
    pub fn use_fancy_output(&self) -> bool {
        self.interactive
    }

    fn detect_interactive() -> bool {
        if !std::io::stdout().is_terminal() || !std::io::stdin().is_terminal() {
            return false;
        }
        !CI_VARS.iter().any(|var| std::env::var_os(var).is_some())
    }
}
