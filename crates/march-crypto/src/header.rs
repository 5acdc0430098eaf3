//! Cleartext stream header: `[16 bytes: salt][24 bytes: nonce]`

use rand::rngs::OsRng;
use rand::RngCore;

use crate::error::CryptoError;
use crate::{HEADER_SIZE, NONCE_SIZE, SALT_SIZE};

/// Per-archive randomness written in front of the ciphertext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    bytes: [u8; HEADER_SIZE],
}

impl Header {
    /// Draw a fresh salt and nonce from the operating system CSPRNG.
    ///
    /// Both come from a single read so a failing source never yields a
    /// half-random header.
    pub fn generate() -> Result<Self, CryptoError> {
        let mut bytes = [0u8; HEADER_SIZE];
        OsRng.try_fill_bytes(&mut bytes).map_err(CryptoError::Random)?;
        Ok(Self { bytes })
    }

    pub fn from_bytes(bytes: [u8; HEADER_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; HEADER_SIZE] {
        &self.bytes
    }

    pub fn salt(&self) -> &[u8] {
        &self.bytes[..SALT_SIZE]
    }

    pub fn nonce(&self) -> &[u8] {
        &self.bytes[SALT_SIZE..SALT_SIZE + NONCE_SIZE]
    }
}
