use thiserror::Error;

pub type MarchResult<T> = Result<T, MarchError>;

#[derive(Debug, Error)]
pub enum MarchError {
    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: MarchError = io.into();
        assert!(matches!(err, MarchError::Io(_)));
        assert_eq!(err.to_string(), "I/O error: denied");
    }
}
