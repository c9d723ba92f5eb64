//! Error types for layered-config.

/// Result type alias for layered-config operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur when ingesting sources or resolving properties.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A `${random.*}` expression names an unknown kind.
    ///
    /// Surfaced synchronously at ingestion time; processing of the offending
    /// source stops eagerly.
    #[error("Invalid random expression {expression} for property: {property}")]
    InvalidRandomExpression {
        /// The full `${random...}` expression as written.
        expression: String,
        /// The property key carrying the expression.
        property: String,
    },

    /// A `${random.*}` bound or range could not be parsed for its numeric kind.
    #[error("Invalid range: `{range}` found for type {kind} while parsing property: {property}")]
    InvalidRandomRange {
        /// The raw range text between the delimiters.
        range: String,
        /// The numeric kind being parsed (Integer, Long, Float).
        kind: &'static str,
        /// The property key carrying the expression.
        property: String,
    },

    /// A required `${...}` placeholder could not be resolved and no default
    /// was supplied.
    #[error("Could not resolve placeholder ${{{placeholder}}} in value: {value}")]
    UnresolvedPlaceholder {
        /// The placeholder name that failed to resolve.
        placeholder: String,
        /// The value the placeholder was embedded in.
        value: String,
    },

    /// IO error occurred (TCP port probing for `${random.port}`).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
