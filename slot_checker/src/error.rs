//! Error types for grid normalization, configuration, and source adapters.

/// Result type for slot-checking operations
pub type SlotResult<T> = Result<T, SlotError>;

/// Error type for the normalization pipeline and configuration loading
#[derive(Debug, thiserror::Error)]
pub enum SlotError {
    #[error("Insufficient evidence: no labeled rows to infer the slot interval from")]
    InsufficientEvidence,

    #[error("Malformed grid: {0}")]
    MalformedGrid(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<String> for SlotError {
    fn from(s: String) -> Self {
        SlotError::Internal(s)
    }
}

impl From<&str> for SlotError {
    fn from(s: &str) -> Self {
        SlotError::Internal(s.to_string())
    }
}

/// Error reported by a grid source adapter.
///
/// Adapters own login, navigation and page parsing; the core only needs to
/// know which of these failed so the clinic can be marked accordingly.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Login failed: {0}")]
    Login(String),

    #[error("Adapter timed out: {0}")]
    Timeout(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Source unavailable: {0}")]
    Unavailable(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_conversions_map_to_internal() {
        let err: SlotError = "boom".into();
        assert!(matches!(err, SlotError::Internal(ref m) if m == "boom"));

        let err: SlotError = String::from("bang").into();
        assert_eq!(err.to_string(), "Internal error: bang");
    }

    #[test]
    fn test_source_error_from_io() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.json");
        let err: SourceError = io.into();
        assert!(matches!(err, SourceError::Io(_)));
        assert!(err.to_string().contains("missing.json"));
    }
}
