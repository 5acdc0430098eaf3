//! march-archive: seal a directory into a single encrypted file and back
//!
//! Pipeline:
//! ```text
//! seal: directory → zip (temp file) → Locker → <name>.march
//! open: <name>.march → Unlocker → spool (temp file) → verify tag → unzip
//! ```
//!
//! Opening never unpacks a byte before the whole stream has authenticated:
//! decrypted plaintext is spooled to an anonymous temp file first.

pub mod archive;
pub mod error;
pub mod zipper;

pub use archive::{is_archive, is_directory, Archive, OpenReport, SealReport, Stage};
pub use error::ArchiveError;
pub use zipper::{unzip, zip_dir, ZipSummary};
