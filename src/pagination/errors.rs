//! Error types for pagination parameter handling

/// Errors raised while reading or rewriting pagination parameters
///
/// Both variants are caller errors: they are surfaced synchronously and
/// never retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PaginationError {
    /// The URL could not be parsed at all
    #[error("Malformed URL '{url}': {reason}")]
    MalformedUrl { url: String, reason: String },

    /// A required pagination key is absent from the query string
    #[error("Missing required query parameter: {0}")]
    MissingParameter(&'static str),

    /// A pagination key is present but its value is not usable
    #[error("Invalid value for query parameter {name}: '{value}'")]
    InvalidParameter { name: &'static str, value: String },
}
