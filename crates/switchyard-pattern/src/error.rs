//! Error types for the pattern crate.

use thiserror::Error;

/// Errors raised while compiling a path template.
///
/// Compilation errors are fatal to the route being defined: a template that
/// fails to compile never produces a matcher.
#[derive(Debug, Error)]
pub enum PatternError {
    /// The template is syntactically invalid.
    #[error("malformed template '{template}' at byte {position}: {reason}")]
    MalformedTemplate {
        template: String,
        position: usize,
        reason: String,
    },

    /// The generated expression was rejected by the regex engine.
    #[error("template '{template}' produced an invalid expression: {source}")]
    InvalidExpression {
        template: String,
        #[source]
        source: regex::Error,
    },
}

impl PatternError {
    pub(crate) fn malformed(
        template: &str,
        position: usize,
        reason: impl Into<String>,
    ) -> Self {
        PatternError::MalformedTemplate {
            template: template.to_string(),
            position,
            reason: reason.into(),
        }
    }

    /// Returns the offending template.
    pub fn template(&self) -> &str {
        match self {
            PatternError::MalformedTemplate { template, .. } => template,
            PatternError::InvalidExpression { template, .. } => template,
        }
    }
}

/// Result type for pattern operations.
pub type Result<T> = std::result::Result<T, PatternError>;
