//! Errors raised while applying a change

use thiserror::Error;

/// Why a single change could not be applied
///
/// Each variant carries the change's display form so a failure can be
/// logged on its own with device and resource context.
#[derive(Debug, Error)]
pub enum ApplyError {
    /// The controller rejected or never answered the request
    #[error("{change}: {source}")]
    Client {
        change: String,
        #[source]
        source: restconf::Error,
    },

    /// A create or update without a usable desired snapshot
    #[error("{change}: desired state is missing {field}")]
    MissingDesired { change: String, field: &'static str },

    /// Loopback ids must be interface numbers
    #[error("{change}: {id} is not a valid loopback number")]
    InvalidId { change: String, id: String },

    /// The device could not be synced after the change, so the result is unknown
    #[error("{change}: could not sync {device} to confirm the result")]
    Unsynced { change: String, device: String },

    /// The device did not reach the desired state
    #[error("{change}: {reason}")]
    Verification { change: String, reason: String },

    /// Applying a rollback file failed
    #[error("rollback failed: {0}")]
    Rollback(#[source] restconf::Error),
}

impl ApplyError {
    /// Whether retrying the same change may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Client { source, .. } | Self::Rollback(source) => source.is_retryable(),
            Self::Unsynced { .. } => true,
            _ => false,
        }
    }
}
