pub type Result<T, E = Error> = core::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Data type conversion error
    #[error("{0}")]
    ConversionError(String),
    /// Operation invoked on a facade with no configured datasource
    #[error("no datasource is configured")]
    DatasourceUnavailable,
    /// Error when a datasource for a name is not registered
    #[error("datasource not found for: {0}")]
    DatasourceNotFound(String),
    /// Insert/update/delete invoked with nothing to bind
    #[error("{0}")]
    EmptyPayload(String),
    /// Batch rows with inconsistent shapes
    #[error("{0}")]
    InvalidBatch(String),
    /// IO or engine error
    #[error("{0}")]
    IoError(String),
    /// Operation invoked on a closed statement
    #[error("statement is closed: {0}")]
    StatementClosed(String),
}

/// Converts a [`std::io::Error`] into an [`IoError`](Error::IoError)
impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Error::IoError(error.to_string())
    }
}

/// Convert [`utf8 errors`](std::string::FromUtf8Error) to [`IoError`](Error::IoError)
impl From<std::string::FromUtf8Error> for Error {
    fn from(error: std::string::FromUtf8Error) -> Self {
        Error::IoError(error.to_string())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_from_std_io_error() {
        let error = std::io::Error::other("test");
        let io_error = Error::from(error);

        assert_eq!(io_error.to_string(), "test");
    }

    #[test]
    fn test_from_utf8_error() {
        let invalid_utf8: Vec<u8> = vec![0, 159, 146, 150];
        let utf8_error = String::from_utf8(invalid_utf8).expect_err("expected FromUtf8Error");
        let error = Error::from(utf8_error);
        assert_eq!(
            error.to_string(),
            "invalid utf-8 sequence of 1 bytes from index 1"
        );
    }

    #[test]
    fn test_datasource_not_found_display() {
        let error = Error::DatasourceNotFound("reports".to_string());
        assert_eq!(error.to_string(), "datasource not found for: reports");
    }
}
