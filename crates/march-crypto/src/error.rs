use std::io;

use thiserror::Error;

use crate::{HEADER_SIZE, TAG_SIZE};

pub type CryptoResult<T> = Result<T, CryptoError>;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("secure random source failed: {0}")]
    Random(#[source] rand::Error),

    #[error("I/O error: {0}")]
    Io(#[source] io::Error),

    #[error(
        "malformed archive: stream ended after {received} of {} header bytes",
        HEADER_SIZE
    )]
    ShortHeader { received: usize },

    #[error(
        "malformed archive: stream ended with {held} of {} authentication tag bytes",
        TAG_SIZE
    )]
    Truncated { held: usize },

    #[error("message authentication failed: wrong password or corrupted archive")]
    Authentication,

    #[error("stream is too long for a single XChaCha20 keystream")]
    KeystreamExhausted,

    #[error("cipher initialization failed: {0}")]
    Cipher(String),
}

impl CryptoError {
    /// True when the stream was well-formed but its tag did not verify.
    pub fn is_authentication(&self) -> bool {
        matches!(self, CryptoError::Authentication)
    }

    /// True when the stream ended before the header or tag was complete.
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            CryptoError::ShortHeader { .. } | CryptoError::Truncated { .. }
        )
    }
}

/// Errors raised inside `Write::write` travel as `io::Error`; unwrap them
/// back into the original variant when they surface again.
impl From<io::Error> for CryptoError {
    fn from(err: io::Error) -> Self {
        let wraps_crypto = err
            .get_ref()
            .is_some_and(|inner| inner.is::<CryptoError>());
        if !wraps_crypto {
            return CryptoError::Io(err);
        }

        match err.into_inner().map(|inner| inner.downcast::<CryptoError>()) {
            Some(Ok(inner)) => *inner,
            Some(Err(other)) => CryptoError::Io(io::Error::other(other)),
            None => CryptoError::Io(io::Error::other("empty I/O error")),
        }
    }
}

impl From<CryptoError> for io::Error {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::Io(inner) => inner,
            CryptoError::Random(_) | CryptoError::Cipher(_) => io::Error::other(err),
            _ => io::Error::new(io::ErrorKind::InvalidData, err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_roundtrip_preserves_variant() {
        let io_err: io::Error = CryptoError::Authentication.into();
        assert_eq!(io_err.kind(), io::ErrorKind::InvalidData);

        let back = CryptoError::from(io_err);
        assert!(back.is_authentication());
    }

    #[test]
    fn test_plain_io_error_stays_io() {
        let err = CryptoError::from(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed"));
        match err {
            CryptoError::Io(inner) => assert_eq!(inner.kind(), io::ErrorKind::BrokenPipe),
            other => panic!("expected Io, got {other:?}"),
        }
    }

    #[test]
    fn test_io_variant_unwraps_without_nesting() {
        let original = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        let io_err: io::Error = CryptoError::Io(original).into();
        assert_eq!(io_err.kind(), io::ErrorKind::PermissionDenied);
    }

    #[test]
    fn test_malformed_classification() {
        assert!(CryptoError::ShortHeader { received: 3 }.is_malformed());
        assert!(CryptoError::Truncated { held: 31 }.is_malformed());
        assert!(!CryptoError::Authentication.is_malformed());
    }

    #[test]
    fn test_auth_message_has_no_details() {
        let msg = CryptoError::Authentication.to_string();
        assert_eq!(
            msg,
            "message authentication failed: wrong password or corrupted archive"
        );
    }
}
