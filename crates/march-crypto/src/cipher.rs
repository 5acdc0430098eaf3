//! Keystream + MAC state shared by the sealing and opening sides.
//!
//! The MAC always covers plaintext: the sealing side updates it before
//! encrypting, the opening side after decrypting.

use chacha20::cipher::{KeyIvInit, StreamCipher};
use chacha20::{Key, XChaCha20, XNonce};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::CryptoError;
use crate::header::Header;
use crate::kdf::derive_key;
use crate::TAG_SIZE;

type HmacSha256 = Hmac<Sha256>;

pub(crate) struct CipherState {
    keystream: XChaCha20,
    mac: HmacSha256,
}

impl CipherState {
    /// Derive the archive key for `header` and key both the keystream and
    /// the MAC with it.
    pub(crate) fn new(password: &[u8], header: &Header) -> Result<Self, CryptoError> {
        let key = derive_key(password, header.salt());

        let keystream = XChaCha20::new(
            Key::from_slice(key.as_bytes()),
            XNonce::from_slice(header.nonce()),
        );
        let mac = <HmacSha256 as Mac>::new_from_slice(key.as_bytes())
            .map_err(|e| CryptoError::Cipher(format!("HMAC key: {e}")))?;

        Ok(Self { keystream, mac })
    }

    /// MAC then encrypt `buf` in place.
    pub(crate) fn seal_in_place(&mut self, buf: &mut [u8]) -> Result<(), CryptoError> {
        self.mac.update(buf);
        apply(&mut self.keystream, buf)
    }

    /// Decrypt `buf` in place then MAC the recovered plaintext.
    pub(crate) fn open_in_place(&mut self, buf: &mut [u8]) -> Result<(), CryptoError> {
        apply(&mut self.keystream, buf)?;
        self.mac.update(buf);
        Ok(())
    }

    /// Finalize the MAC and encrypt the tag with the continuing keystream.
    pub(crate) fn seal_tag(self) -> Result<[u8; TAG_SIZE], CryptoError> {
        let Self { mut keystream, mac } = self;
        let mut tag = [0u8; TAG_SIZE];
        tag.copy_from_slice(&mac.finalize().into_bytes());
        apply(&mut keystream, &mut tag)?;
        Ok(tag)
    }

    /// Decrypt the held-back tag and compare it with the MAC in constant time.
    pub(crate) fn verify_tag(self, mut candidate: [u8; TAG_SIZE]) -> Result<(), CryptoError> {
        let Self { mut keystream, mac } = self;
        apply(&mut keystream, &mut candidate)?;
        mac.verify_slice(&candidate).map_err(|_| CryptoError::Authentication)
    }
}

fn apply(keystream: &mut XChaCha20, buf: &mut [u8]) -> Result<(), CryptoError> {
    keystream
        .try_apply_keystream(buf)
        .map_err(|_| CryptoError::KeystreamExhausted)
}
