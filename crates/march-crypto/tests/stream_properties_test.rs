//! Property tests for the sealed stream format.
//!
//! Each case runs PBKDF2 twice, so the case count is kept small.

use std::io::Write;

use march_crypto::{CryptoError, Locker, Unlocker, HEADER_SIZE, OVERHEAD, TAG_SIZE};
use proptest::prelude::*;

fn seal(password: &[u8], data: &[u8]) -> Vec<u8> {
    let mut locker = Locker::new(Vec::new(), password);
    locker.write_all(data).unwrap();
    locker.finish().unwrap()
}

fn open_chunked(password: &[u8], sealed: &[u8], chunk: usize) -> Result<Vec<u8>, CryptoError> {
    let mut unlocker = Unlocker::new(Vec::new(), password);
    for piece in sealed.chunks(chunk.max(1)) {
        unlocker.open_chunk(piece)?;
    }
    unlocker.finish()
}

fn config() -> ProptestConfig {
    ProptestConfig::with_cases(24)
}

proptest! {
    #![proptest_config(config())]

    /// Anything sealed opens to the same bytes with the same password.
    #[test]
    fn roundtrip(
        password in proptest::collection::vec(any::<u8>(), 0..32),
        data in proptest::collection::vec(any::<u8>(), 0..4096),
    ) {
        let sealed = seal(&password, &data);
        prop_assert_eq!(sealed.len(), data.len() + OVERHEAD);

        let opened = open_chunked(&password, &sealed, sealed.len()).unwrap();
        prop_assert_eq!(opened, data);
    }

    /// The plaintext does not depend on how the sealed stream is split.
    #[test]
    fn opening_is_chunking_invariant(
        data in proptest::collection::vec(any::<u8>(), 0..2048),
        chunk in 1usize..200,
    ) {
        let sealed = seal(b"chunking", &data);
        let opened = open_chunked(b"chunking", &sealed, chunk).unwrap();
        prop_assert_eq!(opened, data);
    }

    /// Flipping any single bit (header, ciphertext or tag) is detected.
    #[test]
    fn single_bit_flip_is_detected(
        data in proptest::collection::vec(any::<u8>(), 0..512),
        position in any::<prop::sample::Index>(),
        bit in 0u8..8,
    ) {
        let mut sealed = seal(b"tamper", &data);
        let i = position.index(sealed.len());
        sealed[i] ^= 1 << bit;

        let err = open_chunked(b"tamper", &sealed, 64).unwrap_err();
        prop_assert!(err.is_authentication(), "flip at {} gave {:?}", i, err);
    }

    /// A different password never opens the stream.
    #[test]
    fn wrong_password_is_rejected(
        data in proptest::collection::vec(any::<u8>(), 0..256),
        suffix in 1u8..=255,
    ) {
        let sealed = seal(b"original", &data);
        let wrong = [b"original".as_slice(), &[suffix]].concat();

        let err = open_chunked(&wrong, &sealed, 32).unwrap_err();
        prop_assert!(err.is_authentication());
    }
}

#[test]
fn boundary_lengths_roundtrip() {
    for len in [0, TAG_SIZE - 1, TAG_SIZE, TAG_SIZE + 1] {
        let data = vec![0xA5u8; len];
        let sealed = seal(b"boundary", &data);
        assert_eq!(sealed.len(), HEADER_SIZE + len + TAG_SIZE);

        for chunk in [1, TAG_SIZE - 1, TAG_SIZE, TAG_SIZE + 1, sealed.len()] {
            let opened = open_chunked(b"boundary", &sealed, chunk).unwrap();
            assert_eq!(opened, data, "len {len} chunk {chunk}");
        }
    }
}

#[test]
fn truncation_is_reported_distinctly() {
    let sealed = seal(b"pw", b"");

    let short = open_chunked(b"pw", &sealed[..HEADER_SIZE / 2], 8).unwrap_err();
    assert!(matches!(short, CryptoError::ShortHeader { .. }));

    let truncated = open_chunked(b"pw", &sealed[..HEADER_SIZE + 4], 8).unwrap_err();
    assert!(matches!(truncated, CryptoError::Truncated { held: 4 }));

    assert!(short.is_malformed() && truncated.is_malformed());
}
