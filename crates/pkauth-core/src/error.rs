//! Error types shared across the authorization database.

use std::path::PathBuf;

/// Errors that can occur while querying or mutating authorization policy.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// A caller-supplied argument was rejected before the store was touched.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The uid does not resolve to a login name.
    #[error("unknown identity: uid {uid}")]
    UnknownIdentity {
        /// The uid that failed to resolve.
        uid: u32,
    },

    /// The policy file exists but cannot be read or parsed.
    #[error("policy store unreadable at {}: {message}", path.display())]
    StoreUnreadable {
        /// Path of the backing resource.
        path: PathBuf,
        /// What went wrong.
        message: String,
    },

    /// The policy file cannot be written.
    #[error("policy store unwritable at {}: {message}", path.display())]
    StoreUnwritable {
        /// Path of the backing resource.
        path: PathBuf,
        /// What went wrong.
        message: String,
    },

    /// The policy file changed between load and persist.
    #[error("policy store at {} was modified concurrently; reload and retry", path.display())]
    Conflict {
        /// Path of the backing resource.
        path: PathBuf,
    },

    /// The action catalog could not be loaded.
    #[error("action catalog error: {0}")]
    Catalog(String),
}

impl AuthError {
    /// Build a [`AuthError::StoreUnreadable`] for `path`.
    pub fn unreadable(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::StoreUnreadable {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Build a [`AuthError::StoreUnwritable`] for `path`.
    pub fn unwritable(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::StoreUnwritable {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Whether the caller may reasonably retry the whole operation.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

/// Result type for authorization operations.
pub type AuthResult<T> = Result<T, AuthError>;
