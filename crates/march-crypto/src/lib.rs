//! march-crypto: streaming encryption for sealed archives
//!
//! A sealed archive is a single byte stream:
//!
//! ```text
//! [16 bytes: salt][24 bytes: nonce][N bytes: ciphertext][32 bytes: encrypted tag]
//! ```
//!
//! Key hierarchy:
//! ```text
//! Archive Key (256-bit, PBKDF2-HMAC-SHA256 from password + salt, 4096 rounds)
//!   ├── XChaCha20 keystream (key=archive_key, nonce=random_192bit)
//!   └── HMAC-SHA256 over the plaintext (key=archive_key)
//! ```
//!
//! The tag is XORed with the keystream that follows the last data byte, so
//! the whole stream after the header is indistinguishable from random.
//!
//! [`Locker`] seals bytes written to it; [`Unlocker`] opens them again. Both
//! implement [`std::io::Write`] and process the stream incrementally.

pub mod error;
pub mod header;
pub mod kdf;
pub mod locker;
pub mod stream;
pub mod unlocker;

mod cipher;

pub use error::CryptoError;
pub use header::Header;
pub use kdf::{derive_key, ArchiveKey};
pub use locker::Locker;
pub use stream::{open, seal};
pub use unlocker::Unlocker;

/// Size of the derived archive key in bytes (256-bit)
pub const KEY_SIZE: usize = 32;

/// Size of the key derivation salt
pub const SALT_SIZE: usize = 16;

/// Size of an XChaCha20 nonce (192-bit)
pub const NONCE_SIZE: usize = 24;

/// Size of the cleartext stream header: salt followed by nonce
pub const HEADER_SIZE: usize = SALT_SIZE + NONCE_SIZE;

/// Size of an HMAC-SHA256 authentication tag
pub const TAG_SIZE: usize = 32;

/// Number of bytes a sealed stream adds on top of the plaintext
pub const OVERHEAD: usize = HEADER_SIZE + TAG_SIZE;
