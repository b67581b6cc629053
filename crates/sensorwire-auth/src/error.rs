//! Error types for authentication and session housekeeping.

/// Errors raised by credential providers and session janitors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// The credential backend could not be consulted.
    #[error("credential provider failed: {message}")]
    Provider {
        /// Description of the failure.
        message: String,
    },

    /// Session cleanup could not run.
    #[error("session cleanup failed: {message}")]
    Cleanup {
        /// Description of the failure.
        message: String,
    },
}
