//! Unified error types for fora.
//!
//! Every variant is fatal for the call that produced it. Date parsing is the
//! one place where a parse failure is swallowed instead, and it never builds
//! one of these.

/// Unified error type shared by the core and client crates.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Transport failure or non-success GET, after the retry budget ran out.
    #[error("NETWORK_ERROR: {0}")]
    Network(String),

    /// A site answered with a status or markup shape we do not understand.
    #[error("PROTOCOL_ERROR: {0}")]
    Protocol(String),

    /// A structurally required element was missing from the page.
    #[error("PARSE_ERROR: {0}")]
    Parse(String),

    /// A chapter reference was still missing after reloading its thread.
    #[error("UNRESOLVED_REFERENCE: {url}")]
    UnresolvedReference { url: String },

    /// The adapter does not provide this operation.
    #[error("UNSUPPORTED: {0}")]
    Unsupported(String),

    /// URL does not have the shape the adapter needs.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// Thread archive could not be written or read back.
    #[error("ARCHIVE_ERROR: {0}")]
    Archive(String),
}

impl Error {
    /// Shorthand for a missing structural element.
    pub fn missing(what: &str, url: &str) -> Self {
        Error::Parse(format!("missing {what} in {url}"))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Archive(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Archive(format!("malformed archive JSON: {err}"))
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Self {
        Error::Archive(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Network("connection reset".to_string());
        assert!(err.to_string().contains("NETWORK_ERROR"));
        assert!(err.to_string().contains("connection reset"));
    }

    #[test]
    fn test_unresolved_reference_reports_url() {
        let err = Error::UnresolvedReference { url: "https://forums.example/posts/1/".to_string() };
        assert_eq!(err.to_string(), "UNRESOLVED_REFERENCE: https://forums.example/posts/1/");
    }

    #[test]
    fn test_missing_helper() {
        let err = Error::missing("permalink", "https://example.com/t/1");
        assert!(matches!(err, Error::Parse(msg) if msg == "missing permalink in https://example.com/t/1"));
    }
}
