//! Terminal detection and capability utilities

use is_terminal::IsTerminal;
use std::env;
use std::io::{stderr, stdout};

/// Check if stdout is connected to an interactive terminal
pub fn is_interactive() -> bool {
    if !stdout().is_terminal() {
        return false;
    }

    // CI runners may allocate a TTY but nobody is watching it
    if is_ci_environment() {
        return false;
    }

    if env::var("DEBIAN_FRONTEND").unwrap_or_default() == "noninteractive" {
        return false;
    }

    true
}

/// Check if the terminal supports ANSI escape codes for colors and progress bars
pub fn supports_ansi() -> bool {
    if !is_interactive() {
        return false;
    }

    let term = env::var("TERM").unwrap_or_default();
    #[cfg(windows)]
    {
        // Windows 10+ consoles handle ANSI without TERM
        term != "dumb"
    }

    #[cfg(not(windows))]
    {
        !(term == "dumb" || term.is_empty())
    }
}

/// Check if stderr is connected to a terminal (for progress display)
pub fn stderr_is_terminal() -> bool {
    stderr().is_terminal()
}

fn is_ci_environment() -> bool {
    let ci_vars = [
        "CI",
        "CONTINUOUS_INTEGRATION",
        "JENKINS_URL",
        "GITHUB_ACTIONS",
        "GITLAB_CI",
        "TRAVIS",
        "CIRCLECI",
        "BUILDKITE",
        "DRONE",
        "TEAMCITY_VERSION",
        "TF_BUILD", // Azure DevOps
    ];

    ci_vars.iter().any(|var| env::var(var).is_ok())
}

/// Upload bars are drawn only for a person watching a capable terminal
///
/// Otherwise progress goes to the log as `Uploaded N%` lines.
pub fn should_show_progress_by_default() -> bool {
    is_interactive() && stderr_is_terminal() && supports_ansi()
}

/// Clickable OSC 8 link, or `text (url)` when the terminal cannot do it
pub fn hyperlink_with_fallback(url: &str, text: &str) -> String {
    if supports_ansi() {
        format!("\x1b]8;;{url}\x1b\\{text}\x1b]8;;\x1b\\")
    } else {
        format!("{text} ({url})")
    }
}
