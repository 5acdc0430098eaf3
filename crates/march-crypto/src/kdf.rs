//! Key derivation: password + salt → archive key

use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use zeroize::Zeroize;

use crate::KEY_SIZE;

/// Number of PBKDF2 rounds. Part of the archive format: changing it makes
/// existing archives unreadable.
pub const KDF_ITERATIONS: u32 = 4096;

/// A 256-bit archive key derived from a password via PBKDF2-HMAC-SHA256.
///
/// Zeroized on drop to prevent secrets lingering in memory.
#[derive(Clone)]
pub struct ArchiveKey {
    bytes: [u8; KEY_SIZE],
}

impl ArchiveKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl Drop for ArchiveKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for ArchiveKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Derive the 256-bit archive key from a password and the stream salt.
///
/// Deterministic: the sealing and opening sides must arrive at the same key.
/// Empty passwords are accepted here; rejecting them is caller policy.
pub fn derive_key(password: &[u8], salt: &[u8]) -> ArchiveKey {
    let mut bytes = [0u8; KEY_SIZE];
    pbkdf2_hmac::<Sha256>(password, salt, KDF_ITERATIONS, &mut bytes);
    let key = ArchiveKey::from_bytes(bytes);
    bytes.zeroize();
    key
}
