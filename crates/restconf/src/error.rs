//! Error types for RESTCONF operations.
//!
//! Errors are categorized so callers can tell a controller that is down
//! from a request the controller rejected.

use std::fmt;

/// Result type alias for RESTCONF operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of client errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Controller unreachable, connection reset, timeout.
    Network,
    /// The addressed resource doesn't exist.
    NotFound,
    /// Controller refused the request (validation, conflict, auth).
    Rejected,
    /// Response body wasn't what we expected.
    Format,
    /// Client was used after `close()`.
    Closed,
    /// Other/unknown errors.
    Other,
}

impl ErrorCategory {
    /// Whether this error category is typically transient and worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network)
    }

    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Network => "Controller connectivity issue",
            Self::NotFound => "Resource not found",
            Self::Rejected => "Request rejected by controller",
            Self::Format => "Unexpected response format",
            Self::Closed => "Client already closed",
            Self::Other => "Unexpected error",
        }
    }

    /// Get actionable advice for resolving this error category.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Network => "Check the controller address, VPN and timeout, then try again",
            Self::NotFound => "Verify the device name is known to the controller",
            Self::Rejected => "Check credentials and the configuration payload",
            Self::Format => "The controller may run an unsupported NED or version",
            Self::Closed => "Open a new client for further requests",
            Self::Other => "Check the error details for more information",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur talking to the controller.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Controller answered with a non-success status.
    #[error("HTTP {status} on {method} {url}")]
    Status {
        /// HTTP method.
        method: &'static str,
        /// Request URL.
        url: String,
        /// HTTP status code.
        status: u16,
    },

    /// Request did not complete within the configured timeout.
    #[error("timeout on {method} {url}")]
    Timeout {
        /// HTTP method.
        method: &'static str,
        /// Request URL.
        url: String,
    },

    /// Transport-level failure (DNS, refused connection, TLS).
    #[error("request failed on {method} {url}: {message}")]
    Transport {
        /// HTTP method.
        method: &'static str,
        /// Request URL.
        url: String,
        /// Error message.
        message: String,
    },

    /// Response body could not be decoded.
    #[error("invalid response from {url}: {message}")]
    InvalidResponse {
        /// Request URL.
        url: String,
        /// Error message.
        message: String,
    },

    /// The client was closed.
    #[error("client is closed")]
    Closed,

    /// Generic error.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Wrap a `ureq` error with the request it belongs to.
    pub fn from_ureq(method: &'static str, url: &str, err: ureq::Error) -> Self {
        let url = url.to_string();
        match err {
            ureq::Error::StatusCode(status) => Self::Status {
                method,
                url,
                status,
            },
            ureq::Error::Timeout(_) => Self::Timeout { method, url },
            ureq::Error::Json(e) => Self::InvalidResponse {
                url,
                message: e.to_string(),
            },
            other => Self::Transport {
                method,
                url,
                message: other.to_string(),
            },
        }
    }

    /// Get the error category.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Status { status: 404, .. } => ErrorCategory::NotFound,
            Error::Status { status, .. } if *status >= 500 => ErrorCategory::Network,
            Error::Status { .. } => ErrorCategory::Rejected,
            Error::Timeout { .. } => ErrorCategory::Network,
            Error::Transport { .. } => ErrorCategory::Network,
            Error::InvalidResponse { .. } => ErrorCategory::Format,
            Error::Closed => ErrorCategory::Closed,
            Error::Other(_) => ErrorCategory::Other,
        }
    }

    /// Whether this error is typically transient and worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }

    /// Whether the request ran out of time.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(code: u16) -> Error {
        Error::Status {
            method: "GET",
            url: "http://nso/restconf/data".to_string(),
            status: code,
        }
    }

    #[test]
    fn test_status_categories() {
        assert_eq!(status(404).category(), ErrorCategory::NotFound);
        assert_eq!(status(409).category(), ErrorCategory::Rejected);
        assert_eq!(status(401).category(), ErrorCategory::Rejected);
        assert_eq!(status(503).category(), ErrorCategory::Network);
        assert!(status(503).is_retryable());
        assert!(!status(400).is_retryable());
    }

    #[test]
    fn test_timeout_is_network() {
        let err = Error::Timeout {
            method: "PATCH",
            url: "http://nso".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Network);
        assert!(err.is_timeout());
        assert!(err.to_string().contains("timeout on PATCH"));
    }

    #[test]
    fn test_closed_category() {
        assert_eq!(Error::Closed.category(), ErrorCategory::Closed);
        assert!(!Error::Closed.is_retryable());
    }

    #[test]
    fn test_from_ureq_status() {
        let err = Error::from_ureq("DELETE", "http://nso/x", ureq::Error::StatusCode(404));
        match err {
            Error::Status { method, status, .. } => {
                assert_eq!(method, "DELETE");
                assert_eq!(status, 404);
            }
            other => panic!("Expected Error::Status, got {other:?}"),
        }
    }

    #[test]
    fn test_category_text() {
        assert!(!ErrorCategory::Network.description().is_empty());
        assert!(!ErrorCategory::Network.advice().is_empty());
        assert!(format!("{}", ErrorCategory::Network).contains("connectivity"));
    }
}
