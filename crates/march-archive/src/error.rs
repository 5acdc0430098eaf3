use std::io;
use std::path::PathBuf;

use march_crypto::CryptoError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("'{}' is not a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("archive not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("'{}' already exists", .0.display())]
    AlreadyExists(PathBuf),

    #[error("invalid archive path: {}", .0.display())]
    InvalidPath(PathBuf),

    #[error("archive entry escapes the destination directory: {0}")]
    UnsafePath(String),

    #[error("archive must hold a single top-level directory, found {entries} entries")]
    BadLayout { entries: usize },

    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl ArchiveError {
    /// True when the archive failed its integrity check (wrong password,
    /// corruption or tampering).
    pub fn is_authentication(&self) -> bool {
        matches!(self, ArchiveError::Crypto(e) if e.is_authentication())
    }
}
