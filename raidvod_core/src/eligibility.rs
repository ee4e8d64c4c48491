//! Upload eligibility rules
//!
//! Checks run cheapest first and stop at the first failure: existence,
//! extension, keyword, difficulty. Only the difficulty check looks at
//! filename metadata, and a name without a difficulty marker gets its own
//! verdict so a malformed filename is never confused with a filtered one.

use crate::error::{MetadataError, ValidationError};
use crate::metadata::{Difficulty, file_stem};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Which recordings qualify for upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityConfig {
    /// Extensions including the leading dot, matched case-sensitively
    pub allowed_extensions: Vec<String>,
    /// At least one must appear in the file stem
    pub required_keywords: Vec<String>,
    pub allowed_difficulties: Vec<Difficulty>,
}

impl Default for EligibilityConfig {
    fn default() -> Self {
        Self {
            allowed_extensions: vec![".mp4".to_string(), ".mkv".to_string()],
            required_keywords: vec!["Kill".to_string()],
            allowed_difficulties: Difficulty::ALL.to_vec(),
        }
    }
}

impl EligibilityConfig {
    /// Reject extension entries that could never match
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(ext) = self
            .allowed_extensions
            .iter()
            .find(|ext| !ext.starts_with('.') || ext.len() < 2)
        {
            return Err(ValidationError::invalid_configuration(&format!(
                "file type '{ext}' must start with '.' followed by the extension"
            )));
        }
        Ok(())
    }
}

/// Why a file was skipped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IneligibleReason {
    /// Gone between listing and checking
    MissingFile,
    ExtensionNotAllowed { extension: String },
    KeywordMissing,
    DifficultyNotAllowed { difficulty: Difficulty },
    /// The filename carries no difficulty marker at all
    DifficultyNotFound(MetadataError),
}

impl fmt::Display for IneligibleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingFile => write!(f, "file no longer exists"),
            Self::ExtensionNotAllowed { extension } if extension.is_empty() => {
                write!(f, "file has no extension")
            }
            Self::ExtensionNotAllowed { extension } => {
                write!(f, "extension '{extension}' is not allowed")
            }
            Self::KeywordMissing => write!(f, "no required keyword in file name"),
            Self::DifficultyNotAllowed { difficulty } => {
                write!(f, "difficulty {difficulty} is not allowed")
            }
            Self::DifficultyNotFound(err) => write!(f, "{err}"),
        }
    }
}

/// Verdict for a single file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Eligibility {
    Eligible { difficulty: Difficulty },
    Ineligible(IneligibleReason),
}

impl Eligibility {
    pub fn is_eligible(&self) -> bool {
        matches!(self, Self::Eligible { .. })
    }
}

/// Applies an [`EligibilityConfig`] to discovered files
#[derive(Debug, Clone)]
pub struct EligibilityFilter {
    config: EligibilityConfig,
}

impl EligibilityFilter {
    pub fn new(config: EligibilityConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EligibilityConfig {
        &self.config
    }

    /// Evaluate a file, reporting the first failed check
    pub fn evaluate(&self, path: &Path) -> Eligibility {
        if !path.exists() {
            return Eligibility::Ineligible(IneligibleReason::MissingFile);
        }

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let extension = extension_of(&file_name);
        if !self.config.allowed_extensions.iter().any(|e| e == extension) {
            return Eligibility::Ineligible(IneligibleReason::ExtensionNotAllowed {
                extension: extension.to_string(),
            });
        }

        let stem = file_stem(&file_name);
        if !self
            .config
            .required_keywords
            .iter()
            .any(|keyword| stem.contains(keyword.as_str()))
        {
            return Eligibility::Ineligible(IneligibleReason::KeywordMissing);
        }

        match Difficulty::from_file_name(&file_name) {
            Ok(difficulty) if self.config.allowed_difficulties.contains(&difficulty) => {
                Eligibility::Eligible { difficulty }
            }
            Ok(difficulty) => {
                Eligibility::Ineligible(IneligibleReason::DifficultyNotAllowed { difficulty })
            }
            Err(err) => Eligibility::Ineligible(IneligibleReason::DifficultyNotFound(err)),
        }
    }

    /// Boolean form of [`evaluate`](Self::evaluate)
    pub fn is_eligible(&self, path: &Path) -> bool {
        self.evaluate(path).is_eligible()
    }
}

/// The final extension including its dot, or `""`
fn extension_of(file_name: &str) -> &str {
    match file_name.rfind('.') {
        Some(0) | None => "",
        Some(index) => &file_name[index..],
    }
}
