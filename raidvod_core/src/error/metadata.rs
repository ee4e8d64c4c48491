//! Filename metadata error types

use thiserror::Error;

/// Errors raised while turning a recording filename into upload metadata
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MetadataError {
    /// None of the `[M]`, `[HC]` or `[N]` markers is present
    #[error("Difficulty not found: {file_name}")]
    DifficultyNotFound { file_name: String },

    /// The description template names a placeholder outside the supported set
    #[error("Placeholder not supported: {{{placeholder}}}")]
    UnsupportedPlaceholder { placeholder: String },

    /// Unbalanced braces in a template
    #[error("Malformed template '{template}': {reason}")]
    MalformedTemplate { template: String, reason: String },
}

impl MetadataError {
    /// Create a difficulty not found error
    pub fn difficulty_not_found(file_name: &str) -> Self {
        Self::DifficultyNotFound {
            file_name: file_name.to_string(),
        }
    }

    /// Create an unsupported placeholder error
    pub fn unsupported_placeholder(placeholder: &str) -> Self {
        Self::UnsupportedPlaceholder {
            placeholder: placeholder.to_string(),
        }
    }

    /// Create a malformed template error
    pub fn malformed_template(template: &str, reason: &str) -> Self {
        Self::MalformedTemplate {
            template: template.to_string(),
            reason: reason.to_string(),
        }
    }
}
