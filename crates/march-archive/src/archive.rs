//! Sealing and opening `<name>.march` archives on disk.

use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Seek};
use std::path::{Path, PathBuf};

use march_core::ArchiveConfig;
use march_crypto::{CryptoError, Locker, Unlocker};
use secrecy::{ExposeSecret, SecretString};

use crate::error::ArchiveError;
use crate::zipper::{unzip, zip_dir};

/// Extension of in-progress archives, appended to the full archive name.
const PART_SUFFIX: &str = "part";

/// True if `path` exists and is a directory.
pub fn is_directory(path: &Path) -> bool {
    fs::metadata(path).map(|m| m.is_dir()).unwrap_or(false)
}

/// True if `path` exists and is a regular file.
pub fn is_archive(path: &Path) -> bool {
    fs::metadata(path).map(|m| m.is_file()).unwrap_or(false)
}

/// Pipeline step reported to the progress callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Zipping,
    Encrypting,
    Decrypting,
    Unzipping,
    Cleaning,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Zipping => "zipping files",
            Stage::Encrypting => "encrypting archive",
            Stage::Decrypting => "decrypting archive",
            Stage::Unzipping => "unzipping files",
            Stage::Cleaning => "removing originals",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone)]
pub struct SealReport {
    pub archive: PathBuf,
    pub files: u64,
    /// Size of the zip container before encryption
    pub plaintext_bytes: u64,
    /// Size of the archive on disk
    pub sealed_bytes: u64,
    pub source_removed: bool,
}

#[derive(Debug, Clone)]
pub struct OpenReport {
    pub directory: PathBuf,
    pub files: u64,
    /// Total size of the restored files
    pub bytes: u64,
    pub archive_removed: bool,
}

/// A directory `<directory>/<name>` and its sealed counterpart
/// `<directory>/<name>.<extension>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Archive {
    name: String,
    directory: PathBuf,
    extension: String,
}

impl Archive {
    /// Resolve `path` (a directory, an archive, or an archive path without
    /// its extension) into an archive description.
    pub fn from_path(path: &Path, extension: &str) -> Result<Self, ArchiveError> {
        let path = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ArchiveError::InvalidPath(path.clone()))?;
        let suffix = format!(".{extension}");
        let name = file_name.strip_suffix(&suffix).unwrap_or(file_name);
        if name.is_empty() {
            return Err(ArchiveError::InvalidPath(path.clone()));
        }

        let directory = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        Ok(Self {
            name: name.to_string(),
            directory,
            extension: extension.to_string(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path of the plain directory.
    pub fn source_path(&self) -> PathBuf {
        self.directory.join(&self.name)
    }

    /// Path of the sealed archive file.
    pub fn archive_path(&self) -> PathBuf {
        self.directory
            .join(format!("{}.{}", self.name, self.extension))
    }

    fn part_path(&self) -> PathBuf {
        self.directory
            .join(format!("{}.{}.{PART_SUFFIX}", self.name, self.extension))
    }

    /// Pack and seal the source directory into the archive file.
    ///
    /// The archive appears under its final name only once it is complete.
    pub fn seal(
        &self,
        password: &SecretString,
        config: &ArchiveConfig,
        progress: &dyn Fn(Stage),
    ) -> Result<SealReport, ArchiveError> {
        let source = self.source_path();
        let archive = self.archive_path();
        if !is_directory(&source) {
            return Err(ArchiveError::NotADirectory(source));
        }
        if archive.exists() {
            return Err(ArchiveError::AlreadyExists(archive));
        }

        progress(Stage::Zipping);
        let mut zipped = tempfile::tempfile_in(&self.directory)?;
        let summary = zip_dir(&source, BufWriter::new(&mut zipped), config)?;
        zipped.rewind()?;

        progress(Stage::Encrypting);
        let part = self.part_path();
        let sealed = self.seal_into(&part, zipped, password)?;
        fs::rename(&part, &archive)?;
        tracing::info!(
            archive = %archive.display(),
            files = summary.files,
            bytes = sealed.1,
            "archive sealed"
        );

        let source_removed = config.remove_source;
        if source_removed {
            progress(Stage::Cleaning);
            fs::remove_dir_all(&source)?;
        }

        Ok(SealReport {
            archive,
            files: summary.files,
            plaintext_bytes: sealed.0,
            sealed_bytes: sealed.1,
            source_removed,
        })
    }

    /// Encrypt `zipped` into `part`, returning (plaintext, sealed) sizes.
    ///
    /// An existing `part` belongs to another seal and is left untouched.
    fn seal_into(
        &self,
        part: &Path,
        zipped: File,
        password: &SecretString,
    ) -> Result<(u64, u64), ArchiveError> {
        let out = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(part)
            .map_err(|e| match e.kind() {
                io::ErrorKind::AlreadyExists => ArchiveError::AlreadyExists(part.to_path_buf()),
                _ => ArchiveError::Io(e),
            })?;

        lock(out, zipped, password).map_err(|e| {
            // Never leave a partial archive behind
            let _ = fs::remove_file(part);
            e
        })
    }

    /// Decrypt, verify and unpack the archive next to itself.
    ///
    /// Nothing is unpacked unless the whole archive authenticates. The tree
    /// lands at [`Archive::source_path`] whatever top-level name it was
    /// sealed under.
    pub fn open(
        &self,
        password: &SecretString,
        config: &ArchiveConfig,
        progress: &dyn Fn(Stage),
    ) -> Result<OpenReport, ArchiveError> {
        let archive = self.archive_path();
        let target = self.source_path();
        if !is_archive(&archive) {
            return Err(ArchiveError::NotFound(archive));
        }
        if target.exists() {
            return Err(ArchiveError::AlreadyExists(target));
        }

        progress(Stage::Decrypting);
        let mut spool = self.decrypt_to_spool(&archive, password)?;
        spool.rewind()?;

        progress(Stage::Unzipping);
        let staging = tempfile::tempdir_in(&self.directory)?;
        let summary = unzip(BufReader::new(spool), staging.path())?;
        let unpacked = single_entry(staging.path())?;
        if target.exists() {
            return Err(ArchiveError::AlreadyExists(target));
        }
        fs::rename(&unpacked, &target)?;
        tracing::info!(
            directory = %target.display(),
            files = summary.files,
            bytes = summary.bytes,
            "archive opened"
        );

        let archive_removed = config.remove_archive;
        if archive_removed {
            progress(Stage::Cleaning);
            fs::remove_file(&archive)?;
        }

        Ok(OpenReport {
            directory: target,
            files: summary.files,
            bytes: summary.bytes,
            archive_removed,
        })
    }

    /// Stream the archive through an unlocker into an anonymous temp file.
    /// The spool is dropped (and deleted) if verification fails.
    fn decrypt_to_spool(
        &self,
        archive: &Path,
        password: &SecretString,
    ) -> Result<File, ArchiveError> {
        let spool = tempfile::tempfile_in(&self.directory)?;
        let mut input = BufReader::new(File::open(archive)?);

        let mut unlocker = Unlocker::new(
            BufWriter::new(spool),
            password.expose_secret().as_bytes(),
        );
        io::copy(&mut input, &mut unlocker).map_err(CryptoError::from)?;
        let spool = unlocker
            .finish()?
            .into_inner()
            .map_err(|e| e.into_error())?;

        Ok(spool)
    }
}

fn lock(out: File, zipped: File, password: &SecretString) -> Result<(u64, u64), ArchiveError> {
    let mut locker = Locker::new(BufWriter::new(out), password.expose_secret().as_bytes());
    let plaintext =
        io::copy(&mut BufReader::new(zipped), &mut locker).map_err(CryptoError::from)?;
    let out = locker
        .finish()?
        .into_inner()
        .map_err(|e| e.into_error())?;
    out.sync_all()?;

    let sealed = out.metadata()?.len();
    Ok((plaintext, sealed))
}

/// The only entry below `dir`, which must be a directory.
fn single_entry(dir: &Path) -> Result<PathBuf, ArchiveError> {
    let entries = fs::read_dir(dir)?.collect::<Result<Vec<_>, _>>()?;
    match entries.as_slice() {
        [entry] if entry.file_type()?.is_dir() => Ok(entry.path()),
        _ => Err(ArchiveError::BadLayout {
            entries: entries.len(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_from_path_directory() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("docs");
        fs::create_dir(&dir).unwrap();

        let archive = Archive::from_path(&dir, "march").unwrap();
        assert_eq!(archive.name(), "docs");
        assert_eq!(archive.source_path(), fs::canonicalize(&dir).unwrap());
        assert_eq!(
            archive.archive_path().file_name().unwrap(),
            "docs.march"
        );
    }

    #[test]
    fn test_from_path_strips_extension() {
        let a = Archive::from_path(Path::new("/tmp/nowhere/docs.march"), "march").unwrap();
        let b = Archive::from_path(Path::new("/tmp/nowhere/docs"), "march").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.archive_path(), PathBuf::from("/tmp/nowhere/docs.march"));
    }

    #[test]
    fn test_from_path_relative_name() {
        let archive = Archive::from_path(Path::new("no-such-dir-xyz"), "march").unwrap();
        assert_eq!(archive.source_path(), PathBuf::from("./no-such-dir-xyz"));
    }

    #[test]
    fn test_from_path_rejects_bare_extension() {
        let err = Archive::from_path(Path::new("/tmp/.march"), "march").unwrap_err();
        assert!(matches!(err, ArchiveError::InvalidPath(_)));
    }

    #[test]
    fn test_part_path() {
        let archive = Archive::from_path(Path::new("/srv/backup"), "march").unwrap();
        assert_eq!(archive.part_path(), PathBuf::from("/srv/backup.march.part"));
    }

    #[test]
    fn test_single_entry_requires_one_directory() {
        let tmp = TempDir::new().unwrap();
        let err = single_entry(tmp.path()).unwrap_err();
        assert!(matches!(err, ArchiveError::BadLayout { entries: 0 }));

        fs::create_dir(tmp.path().join("docs")).unwrap();
        assert_eq!(single_entry(tmp.path()).unwrap(), tmp.path().join("docs"));

        fs::write(tmp.path().join("stray.txt"), b"x").unwrap();
        let err = single_entry(tmp.path()).unwrap_err();
        assert!(matches!(err, ArchiveError::BadLayout { entries: 2 }));
    }

    #[test]
    fn test_single_entry_rejects_lone_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("loose.txt"), b"x").unwrap();
        let err = single_entry(tmp.path()).unwrap_err();
        assert!(matches!(err, ArchiveError::BadLayout { entries: 1 }));
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(Stage::Zipping.to_string(), "zipping files");
        assert_eq!(Stage::Decrypting.to_string(), "decrypting archive");
    }
}
