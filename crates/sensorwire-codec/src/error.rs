//! Error types for row materialization.
//!
//! Every variant describes corrupt or mistyped persisted data. Ambiguities
//! that can be resolved (geometry fallbacks, decimal to float) never
//! surface here.

/// Errors that can occur while materializing a storage row.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// A column that must hold JSON could not be parsed into the expected
    /// shape.
    #[error("corrupt JSON in column `{column}`: {source}")]
    CorruptJson {
        /// The offending column.
        column: String,
        /// The underlying parse error.
        source: serde_json::Error,
    },

    /// A cell held a value of the wrong scalar type.
    #[error("column `{column}`: expected {expected}, found {found}")]
    UnexpectedType {
        /// The offending column.
        column: String,
        /// Scalar type the schema requires.
        expected: &'static str,
        /// Scalar type actually present.
        found: &'static str,
    },

    /// The observation result discriminator is not a known value.
    #[error("unknown result type discriminator {value}")]
    UnknownResultType {
        /// The stored discriminator.
        value: i64,
    },

    /// A text cell in a timestamp column is not an RFC 3339 timestamp.
    #[error("column `{column}`: invalid timestamp {value:?}")]
    InvalidTimestamp {
        /// The offending column.
        column: String,
        /// The stored text.
        value: String,
    },
}
