//! Opening side: decrypt a sealed stream and verify its tag.
//!
//! Lifecycle:
//! - collect the 40-byte header, derive the key
//! - hold back the last [`TAG_SIZE`] bytes received; decrypt, MAC and
//!   forward everything in front of them
//! - [`Unlocker::finish`]: decrypt the held bytes and compare them with the
//!   MAC in constant time
//!
//! Plaintext reaches the destination before the tag has been checked.
//! Consumers must treat it as provisional until `finish` returns `Ok`.

use std::io::{self, Write};

use zeroize::Zeroizing;

use crate::cipher::CipherState;
use crate::error::CryptoError;
use crate::header::Header;
use crate::{HEADER_SIZE, TAG_SIZE};

/// An [`io::Write`] adapter that opens a sealed stream into `destination`.
pub struct Unlocker<W: Write> {
    password: Zeroizing<Vec<u8>>,
    destination: W,
    header: [u8; HEADER_SIZE],
    header_len: usize,
    /// `None` while the header is still being collected
    cipher: Option<CipherState>,
    /// Trailing ciphertext that may still turn out to be the tag
    held: Vec<u8>,
    plaintext_len: u64,
}

impl<W: Write> Unlocker<W> {
    pub fn new(destination: W, password: &[u8]) -> Self {
        Self {
            password: Zeroizing::new(password.to_vec()),
            destination,
            header: [0u8; HEADER_SIZE],
            header_len: 0,
            cipher: None,
            held: Vec::with_capacity(TAG_SIZE),
            plaintext_len: 0,
        }
    }

    /// Plaintext bytes released to the destination so far.
    pub fn plaintext_len(&self) -> u64 {
        self.plaintext_len
    }

    pub fn get_ref(&self) -> &W {
        &self.destination
    }

    /// Feed the next slice of the sealed stream.
    pub fn open_chunk(&mut self, mut buf: &[u8]) -> Result<(), CryptoError> {
        let cipher = match self.cipher {
            Some(ref mut cipher) => cipher,
            None => {
                let take = (HEADER_SIZE - self.header_len).min(buf.len());
                self.header[self.header_len..self.header_len + take]
                    .copy_from_slice(&buf[..take]);
                self.header_len += take;
                buf = &buf[take..];

                if self.header_len < HEADER_SIZE {
                    return Ok(());
                }

                let header = Header::from_bytes(self.header);
                tracing::debug!("stream header read, cipher keyed");
                self.cipher
                    .insert(CipherState::new(&self.password, &header)?)
            }
        };

        self.held.extend_from_slice(buf);
        if self.held.len() <= TAG_SIZE {
            return Ok(());
        }

        let release = self.held.len() - TAG_SIZE;
        cipher.open_in_place(&mut self.held[..release])?;
        self.destination
            .write_all(&self.held[..release])
            .map_err(CryptoError::Io)?;
        self.held.drain(..release);
        self.plaintext_len += release as u64;

        Ok(())
    }

    /// Verify the tag and return the destination.
    ///
    /// Fails with [`CryptoError::ShortHeader`] or [`CryptoError::Truncated`]
    /// when the stream ended early, and [`CryptoError::Authentication`] when
    /// the tag does not match.
    pub fn finish(mut self) -> Result<W, CryptoError> {
        let Some(cipher) = self.cipher.take() else {
            return Err(CryptoError::ShortHeader {
                received: self.header_len,
            });
        };

        if self.held.len() < TAG_SIZE {
            return Err(CryptoError::Truncated {
                held: self.held.len(),
            });
        }

        let mut candidate = [0u8; TAG_SIZE];
        candidate.copy_from_slice(&self.held);

        if let Err(e) = cipher.verify_tag(candidate) {
            tracing::warn!(
                plaintext_bytes = self.plaintext_len,
                "stream failed integrity check"
            );
            return Err(e);
        }

        self.destination.flush().map_err(CryptoError::Io)?;
        tracing::debug!(plaintext_bytes = self.plaintext_len, "stream verified");
        Ok(self.destination)
    }
}

impl<W: Write> Write for Unlocker<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.open_chunk(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.destination.flush()
    }
}

impl<W: Write> std::fmt::Debug for Unlocker<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Unlocker")
            .field("header_len", &self.header_len)
            .field("held", &self.held.len())
            .field("plaintext_len", &self.plaintext_len)
            .finish_non_exhaustive()
    }
}
