use thiserror::Error;

/// Top-level error type for the Campus Guide system.
///
/// Subsystem crates define their own error types and implement
/// `From<CampusError>` (or the reverse) so that `?` works across crate
/// boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CampusError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Knowledge error: {0}")]
    Knowledge(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<toml::de::Error> for CampusError {
    fn from(err: toml::de::Error) -> Self {
        CampusError::Config(err.to_string())
    }
}

/// A specialized `Result` type for Campus Guide operations.
pub type Result<T> = std::result::Result<T, CampusError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CampusError::Config("missing field".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing field");

        let err = CampusError::Storage("disk full".to_string());
        assert_eq!(err.to_string(), "Storage error: disk full");

        let err = CampusError::Knowledge("no documents".to_string());
        assert_eq!(err.to_string(), "Knowledge error: no documents");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: CampusError = io_err.into();
        assert!(matches!(err, CampusError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_toml_error_becomes_config_error() {
        let err = toml::from_str::<toml::Value>("this is = = not toml").unwrap_err();
        let err: CampusError = err.into();
        assert!(matches!(err, CampusError::Config(_)));
    }
}
