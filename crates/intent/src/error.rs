//! Error types for intent loading and validation

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// A single violated constraint, addressed by its field path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Dotted path to the offending field, e.g. `devices[0].loopbacks[1].ipv4`
    pub path: String,
    /// What is wrong with the value
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// Every constraint a document violated
///
/// Construction of the typed model either succeeds completely or returns
/// one of these with all violations found, never just the first one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    violations: Vec<Violation>,
}

impl ValidationErrors {
    /// Create an empty collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a violation at `path`
    pub fn push(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.violations.push(Violation {
            path: path.into(),
            message: message.into(),
        });
    }

    /// Record `message` at `path` if `check` failed
    pub fn check<T>(&mut self, path: &str, check: std::result::Result<T, String>) -> Option<T> {
        match check {
            Ok(value) => Some(value),
            Err(message) => {
                self.push(path, message);
                None
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.violations.len()
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn iter(&self) -> impl Iterator<Item = &Violation> {
        self.violations.iter()
    }

    /// Whether any violation message or path contains `needle`
    pub fn mentions(&self, needle: &str) -> bool {
        self.violations
            .iter()
            .any(|v| v.message.contains(needle) || v.path.contains(needle))
    }

    /// Return `value` when nothing was recorded, otherwise `self` as the error
    pub(crate) fn finish<T>(self, value: impl FnOnce() -> T) -> std::result::Result<T, Self> {
        if self.is_empty() {
            Ok(value())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self.violations.len();
        write!(
            f,
            "{} validation error{}",
            count,
            if count == 1 { "" } else { "s" }
        )?;
        for violation in &self.violations {
            write!(f, "\n  - {}", violation)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Errors that can occur while loading an intent document
#[derive(Error, Debug)]
pub enum IntentError {
    /// The intent file could not be read
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The document is not well-formed for its format, or has the wrong shape
    #[error("failed to parse {format} intent: {message}")]
    Parse {
        format: &'static str,
        message: String,
    },

    /// File extension doesn't map to a known document format
    #[error("unsupported intent file extension: {0} (expected .yaml, .yml, .json or .toml)")]
    UnsupportedFormat(String),

    /// The document parsed but violates one or more constraints
    #[error("invalid intent: {0}")]
    Validation(#[from] ValidationErrors),
}

impl IntentError {
    /// The collected violations, when this is a validation failure
    pub fn violations(&self) -> Option<&ValidationErrors> {
        match self {
            Self::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}

/// Result type for intent operations
pub type Result<T> = std::result::Result<T, IntentError>;
