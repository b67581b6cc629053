//! Error types for the notifier binary.
//!
//! [`NotifierError`] wraps every failure `main` can propagate with `?`.

/// Top-level error for the notifier binary.
#[derive(Debug, thiserror::Error)]
pub enum NotifierError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: sensorwire_core::ConfigError,
    },

    /// The dispatcher could not be started or rejected an event.
    #[error("dispatch error: {source}")]
    Dispatch {
        /// The underlying dispatch error.
        #[from]
        source: sensorwire_dispatch::DispatchError,
    },

    /// NATS connection or messaging failed.
    #[error("NATS error: {message}")]
    Nats {
        /// Description of the NATS failure.
        message: String,
    },

    /// An inbound message could not be decoded.
    #[error("malformed message on {subject}: {message}")]
    Malformed {
        /// Subject the message arrived on.
        subject: String,
        /// What is wrong with it.
        message: String,
    },
}
