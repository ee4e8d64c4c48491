use colored::*;
use raidvod_core::error::{IoErrorKind, UploadError};
use std::error::Error as StdError;
use std::fmt;
use std::io;

/// CLI-specific error type with semantic exit codes
#[derive(Debug)]
pub struct CliError {
    /// The main error message
    message: String,

    /// Error category for exit code determination
    category: ErrorCategory,

    /// Additional context information
    context: Vec<(String, String)>,

    /// Suggestions for recovery
    pub suggestions: Vec<String>,

    /// Source error if any
    source: Option<Box<dyn StdError + Send + Sync>>,
}

/// Error categories that map to exit codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ErrorCategory {
    General,
    Misuse,
    Upload,
    Filesystem,
    Tracking,
    Configuration,
}

/// Semantic exit codes for the CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Also used for an interrupted `watch`
    Success = 0,
    GeneralError = 1,
    Misuse = 2,
    UploadError = 3,
    FilesystemError = 4,
    TrackingError = 5,
    ConfigurationError = 6,
}

impl ExitCode {
    pub fn code(self) -> i32 {
        self as i32
    }
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// Extension trait for adding context to errors
pub trait ErrorContext {
    fn with_context(self, key: &str, value: &str) -> Self;
    fn with_suggestion(self, suggestion: &str) -> Self;
    fn with_source(self, source: Box<dyn StdError + Send + Sync>) -> Self;
}

impl CliError {
    fn new(category: ErrorCategory, message: &str) -> Self {
        Self {
            message: message.to_string(),
            category,
            context: Vec::new(),
            suggestions: Vec::new(),
            source: None,
        }
    }

    /// Create a general error
    pub fn general(message: &str) -> Self {
        Self::new(ErrorCategory::General, message)
    }

    /// Create a command misuse error
    pub fn misuse(message: &str) -> Self {
        let mut error = Self::new(ErrorCategory::Misuse, message)
            .with_suggestion("Run 'raidvod --help' for usage information");

        if message.contains("Unknown command")
            && let Some(cmd) = message.split(':').nth(1).map(|s| s.trim())
        {
            let commands = [
                "watch", "inspect", "track", "untrack", "tracked", "scopes", "config", "auth",
            ];
            for known_cmd in commands {
                if levenshtein_distance(cmd, known_cmd) <= 2 {
                    error
                        .suggestions
                        .insert(0, format!("Did you mean '{known_cmd}'?"));
                    break;
                }
            }
        }

        error
    }

    /// Create an upload error
    pub fn upload(message: &str) -> Self {
        Self::new(ErrorCategory::Upload, message)
            .with_suggestion("Check your internet connection")
            .with_suggestion("The file stays untracked and is retried on the next run")
    }

    /// Create a filesystem error
    pub fn filesystem(message: &str) -> Self {
        let mut error = Self::new(ErrorCategory::Filesystem, message);

        if message.contains("not found") || message.contains("Not a directory") {
            error
                .suggestions
                .push("Check if the file or directory exists".to_string());
            error
                .suggestions
                .push("Verify you have the correct path".to_string());
        } else if message.contains("permission") || message.contains("denied") {
            error.suggestions.push("Check file permissions".to_string());
        }

        error
    }

    /// Create a tracking store error
    pub fn tracking(message: &str) -> Self {
        Self::new(ErrorCategory::Tracking, message)
            .with_suggestion("Check that the database file is writable and the disk is not full")
    }

    /// Create a configuration or metadata error
    pub fn configuration(message: &str) -> Self {
        Self::new(ErrorCategory::Configuration, message)
            .with_suggestion("Run 'raidvod config list' to review the effective configuration")
    }

    /// Create an error from an IO error
    pub fn from_io_error(error: io::Error, path: &str) -> Self {
        let message = format!("IO error on '{path}': {error}");
        let mut cli_error = match error.kind() {
            io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => {
                Self::filesystem(&message)
            }
            _ => Self::general(&message),
        };

        cli_error.source = Some(Box::new(error));
        cli_error
            .context
            .push(("path".to_string(), path.to_string()));
        cli_error
    }

    /// Get the exit code for this error
    pub fn exit_code(&self) -> ExitCode {
        match self.category {
            ErrorCategory::General => ExitCode::GeneralError,
            ErrorCategory::Misuse => ExitCode::Misuse,
            ErrorCategory::Upload => ExitCode::UploadError,
            ErrorCategory::Filesystem => ExitCode::FilesystemError,
            ErrorCategory::Tracking => ExitCode::TrackingError,
            ErrorCategory::Configuration => ExitCode::ConfigurationError,
        }
    }

    fn label(&self) -> &'static str {
        match self.category {
            ErrorCategory::General => "Error",
            ErrorCategory::Misuse => "Usage Error",
            ErrorCategory::Upload => "Upload Error",
            ErrorCategory::Filesystem => "File Error",
            ErrorCategory::Tracking => "Tracking Error",
            ErrorCategory::Configuration => "Configuration Error",
        }
    }

    /// Format the error for user display
    pub fn format_for_user(&self, debug: bool) -> String {
        let mut output = String::new();

        let prefix = match self.category {
            ErrorCategory::Misuse => self.label().yellow(),
            _ => self.label().red(),
        };
        output.push_str(&format!("{}: {}\n", prefix, self.message));

        if !self.context.is_empty() {
            output.push_str("\nContext:\n");
            for (key, value) in &self.context {
                output.push_str(&format!("  {}: {}\n", key.bold(), value));
            }
        }

        if debug && let Some(source) = &self.source {
            output.push_str("\nCaused by:\n");
            let mut current: Option<&dyn StdError> = Some(source.as_ref());
            let mut level = 1;

            while let Some(err) = current {
                output.push_str(&format!("  {level}: {err}\n"));
                current = err.source();
                level += 1;
            }
        }

        if !self.suggestions.is_empty() {
            output.push_str("\nSuggestions:\n");
            for suggestion in &self.suggestions {
                output.push_str(&format!("  • {suggestion}\n"));
            }
        }

        output
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.label(), self.message)?;

        for (key, value) in &self.context {
            write!(f, " ({key}: {value})")?;
        }

        Ok(())
    }
}

impl StdError for CliError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

impl ErrorContext for CliError {
    fn with_context(mut self, key: &str, value: &str) -> Self {
        self.context.push((key.to_string(), value.to_string()));
        self
    }

    fn with_suggestion(mut self, suggestion: &str) -> Self {
        self.suggestions.push(suggestion.to_string());
        self
    }

    fn with_source(mut self, source: Box<dyn StdError + Send + Sync>) -> Self {
        self.source = Some(source);
        self
    }
}

impl From<raidvod_core::Error> for CliError {
    fn from(error: raidvod_core::Error) -> Self {
        use raidvod_core::Error;

        let mut cli_error = Self::for_category(category_of(&error), &error.to_string());
        match &error {
            Error::Io(io) => {
                if let Some(path) = &io.path {
                    cli_error = cli_error.with_context("path", &path.display().to_string());
                }
                if io.kind == IoErrorKind::PermissionDenied {
                    cli_error = cli_error.with_suggestion("Check file permissions");
                }
            }
            Error::Upload(UploadError::Auth { .. }) => {
                cli_error =
                    cli_error.with_suggestion("Run 'raidvod auth login' to sign in again");
            }
            _ => {}
        }
        cli_error.source = Some(Box::new(error));
        cli_error
    }
}

/// Convert anyhow errors, keeping the category of a wrapped core error
impl From<anyhow::Error> for CliError {
    fn from(error: anyhow::Error) -> Self {
        let error = match error.downcast::<CliError>() {
            Ok(cli_error) => return cli_error,
            Err(error) => error,
        };

        let category = error
            .chain()
            .find_map(|cause| cause.downcast_ref::<raidvod_core::Error>())
            .map_or(ErrorCategory::General, category_of);

        let mut cli_error = Self::for_category(category, &format!("{error:#}"));
        cli_error.source = Some(error.into());
        cli_error
    }
}

impl CliError {
    fn for_category(category: ErrorCategory, message: &str) -> Self {
        match category {
            ErrorCategory::General => Self::general(message),
            ErrorCategory::Misuse => Self::misuse(message),
            ErrorCategory::Upload => Self::upload(message),
            ErrorCategory::Filesystem => Self::filesystem(message),
            ErrorCategory::Tracking => Self::tracking(message),
            ErrorCategory::Configuration => Self::configuration(message),
        }
    }
}

fn category_of(error: &raidvod_core::Error) -> ErrorCategory {
    use raidvod_core::Error;

    match error {
        Error::Io(_) => ErrorCategory::Filesystem,
        Error::Upload(_) => ErrorCategory::Upload,
        Error::Tracking(_) => ErrorCategory::Tracking,
        Error::Metadata(_) | Error::Validation(_) => ErrorCategory::Configuration,
    }
}

/// Simple Levenshtein distance for command suggestions
fn levenshtein_distance(s1: &str, s2: &str) -> usize {
    let s1_chars: Vec<char> = s1.chars().collect();
    let s2_chars: Vec<char> = s2.chars().collect();
    let len1 = s1_chars.len();
    let len2 = s2_chars.len();
    let mut matrix = vec![vec![0; len2 + 1]; len1 + 1];

    for (i, row) in matrix.iter_mut().enumerate().take(len1 + 1) {
        row[0] = i;
    }
    for (j, cell) in matrix[0].iter_mut().enumerate().take(len2 + 1) {
        *cell = j;
    }

    for (i, c1) in s1_chars.iter().enumerate() {
        let i1 = i + 1;
        for (j, c2) in s2_chars.iter().enumerate() {
            let j1 = j + 1;
            let cost = if c1 == c2 { 0 } else { 1 };
            matrix[i1][j1] = std::cmp::min(
                std::cmp::min(matrix[i][j1] + 1, matrix[i1][j] + 1),
                matrix[i][j] + cost,
            );
        }
    }

    matrix[len1][len2]
}
