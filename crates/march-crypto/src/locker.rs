//! Sealing side: encrypt and authenticate everything written to it.
//!
//! Lifecycle:
//! - first write: generate salt+nonce, write them, derive the key
//! - every write: MAC plaintext, XOR keystream, forward ciphertext
//! - [`Locker::finish`]: append the encrypted tag and hand back the sink
//!
//! `finish` consumes the locker, so writing after the tag is impossible.

use std::io::{self, Write};

use zeroize::Zeroizing;

use crate::cipher::CipherState;
use crate::error::CryptoError;
use crate::header::Header;

/// Largest slice encrypted per pass; bounds the scratch buffer.
const SCRATCH_SIZE: usize = 64 * 1024;

/// An [`io::Write`] adapter that seals a byte stream into `destination`.
pub struct Locker<W: Write> {
    password: Zeroizing<Vec<u8>>,
    destination: W,
    /// Fixed header, consumed on start instead of drawing random bytes
    header: Option<Header>,
    /// `None` until the header has been written
    cipher: Option<CipherState>,
    scratch: Vec<u8>,
    plaintext_len: u64,
}

impl<W: Write> Locker<W> {
    pub fn new(destination: W, password: &[u8]) -> Self {
        Self {
            password: Zeroizing::new(password.to_vec()),
            destination,
            header: None,
            cipher: None,
            scratch: Vec::new(),
            plaintext_len: 0,
        }
    }

    /// Seal with a caller-chosen header. Reusing a header under the same
    /// password reuses the keystream.
    #[cfg(test)]
    pub(crate) fn with_header(destination: W, password: &[u8], header: Header) -> Self {
        let mut locker = Self::new(destination, password);
        locker.header = Some(header);
        locker
    }

    /// Plaintext bytes accepted so far.
    pub fn plaintext_len(&self) -> u64 {
        self.plaintext_len
    }

    pub fn get_ref(&self) -> &W {
        &self.destination
    }

    /// Encrypt and forward one slice of plaintext.
    pub fn seal_chunk(&mut self, buf: &[u8]) -> Result<(), CryptoError> {
        let cipher = match self.cipher {
            Some(ref mut cipher) => cipher,
            None => self.cipher.insert(start(
                &mut self.destination,
                &self.password,
                self.header.take(),
            )?),
        };

        for chunk in buf.chunks(SCRATCH_SIZE) {
            self.scratch.clear();
            self.scratch.extend_from_slice(chunk);
            cipher.seal_in_place(&mut self.scratch)?;
            self.destination
                .write_all(&self.scratch)
                .map_err(CryptoError::Io)?;
            self.plaintext_len += chunk.len() as u64;
        }

        Ok(())
    }

    /// Write the encrypted authentication tag, flush, and return the sink.
    ///
    /// A locker that never saw a write still emits a header and the tag of
    /// the empty message.
    pub fn finish(mut self) -> Result<W, CryptoError> {
        let cipher = match self.cipher.take() {
            Some(cipher) => cipher,
            None => start(&mut self.destination, &self.password, self.header.take())?,
        };

        let tag = cipher.seal_tag()?;
        self.destination.write_all(&tag).map_err(CryptoError::Io)?;
        self.destination.flush().map_err(CryptoError::Io)?;

        tracing::debug!(plaintext_bytes = self.plaintext_len, "stream sealed");
        Ok(self.destination)
    }
}

/// Emit the header and key the cipher from it.
fn start<W: Write>(
    destination: &mut W,
    password: &[u8],
    header: Option<Header>,
) -> Result<CipherState, CryptoError> {
    let header = match header {
        Some(header) => header,
        None => Header::generate()?,
    };

    destination
        .write_all(header.as_bytes())
        .map_err(CryptoError::Io)?;
    let cipher = CipherState::new(password, &header)?;

    tracing::debug!("stream header written, cipher keyed");
    Ok(cipher)
}

impl<W: Write> Write for Locker<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.seal_chunk(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.destination.flush()
    }
}

impl<W: Write> std::fmt::Debug for Locker<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Locker")
            .field("started", &self.cipher.is_some())
            .field("plaintext_len", &self.plaintext_len)
            .finish_non_exhaustive()
    }
}
