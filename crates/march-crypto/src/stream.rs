//! One-shot helpers that pump a reader through a [`Locker`] or [`Unlocker`].

use std::io::{self, Read, Write};

use crate::error::CryptoError;
use crate::locker::Locker;
use crate::unlocker::Unlocker;

/// Seal everything readable from `reader` into `writer`.
///
/// Returns the number of plaintext bytes sealed.
pub fn seal<R: Read, W: Write>(
    password: &[u8],
    mut reader: R,
    writer: W,
) -> Result<u64, CryptoError> {
    let mut locker = Locker::new(writer, password);
    let copied = io::copy(&mut reader, &mut locker)?;
    locker.finish()?;
    Ok(copied)
}

/// Open a sealed stream from `reader` into `writer`.
///
/// Returns the number of plaintext bytes recovered. On error, whatever was
/// already written to `writer` is unauthenticated and must be discarded.
pub fn open<R: Read, W: Write>(
    password: &[u8],
    mut reader: R,
    writer: W,
) -> Result<u64, CryptoError> {
    let mut unlocker = Unlocker::new(writer, password);
    io::copy(&mut reader, &mut unlocker)?;
    let recovered = unlocker.plaintext_len();
    unlocker.finish()?;
    Ok(recovered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::OVERHEAD;

    #[test]
    fn test_seal_open_roundtrip() {
        let data = vec![0x42u8; 100_000];

        let mut sealed = Vec::new();
        let n = seal(b"pw", data.as_slice(), &mut sealed).unwrap();
        assert_eq!(n, data.len() as u64);
        assert_eq!(sealed.len(), data.len() + OVERHEAD);

        let mut opened = Vec::new();
        let m = open(b"pw", sealed.as_slice(), &mut opened).unwrap();
        assert_eq!(m, data.len() as u64);
        assert_eq!(opened, data);
    }

    #[test]
    fn test_open_wrong_password() {
        let mut sealed = Vec::new();
        seal(b"right", &b"secret"[..], &mut sealed).unwrap();

        let err = open(b"wrong", sealed.as_slice(), io::sink()).unwrap_err();
        assert!(err.is_authentication());
    }

    #[test]
    fn test_open_truncated_reader() {
        let mut sealed = Vec::new();
        seal(b"pw", &b"secret"[..], &mut sealed).unwrap();

        let err = open(b"pw", &sealed[..20], io::sink()).unwrap_err();
        assert!(matches!(err, CryptoError::ShortHeader { received: 20 }));
    }
}
