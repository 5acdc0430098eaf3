//! Directory ⇄ zip container
//!
//! Entries are named relative to the parent of the packed directory, so an
//! archive of `/home/me/photos` contains `photos/`, `photos/a.jpg`, ... and
//! unpacks into a `photos` directory again.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, Write};
use std::path::Path;

use march_core::{ArchiveConfig, Compression};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::ArchiveError;

/// Counts of regular files and their uncompressed bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ZipSummary {
    pub files: u64,
    pub bytes: u64,
}

/// Pack the directory tree at `src` into a zip container written to `dst`.
///
/// Symlinks and special files are skipped with a warning.
pub fn zip_dir<W: Write + Seek>(
    src: &Path,
    dst: W,
    config: &ArchiveConfig,
) -> Result<ZipSummary, ArchiveError> {
    let base = src.parent().unwrap_or(src);
    let mut writer = ZipWriter::new(dst);
    let mut summary = ZipSummary::default();

    for entry in WalkDir::new(src).follow_links(false).sort_by_file_name() {
        let entry = entry.map_err(io::Error::from)?;
        let path = entry.path();
        let name = entry_name(base, path)?;
        let file_type = entry.file_type();

        if file_type.is_dir() {
            writer.add_directory(format!("{name}/"), file_options(config))?;
            continue;
        }
        if !file_type.is_file() {
            tracing::warn!(path = %path.display(), "skipping symlink or special file");
            continue;
        }

        let metadata = entry.metadata().map_err(io::Error::from)?;
        #[allow(unused_mut)]
        let mut options = file_options(config).large_file(metadata.len() >= u32::MAX as u64);
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            options = options.unix_permissions(metadata.permissions().mode() & 0o777);
        }

        writer.start_file(name, options)?;
        let mut file = File::open(path)?;
        summary.bytes += io::copy(&mut file, &mut writer)?;
        summary.files += 1;
    }

    writer.finish()?.flush()?;
    tracing::debug!(files = summary.files, bytes = summary.bytes, "directory packed");
    Ok(summary)
}

/// Unpack every entry of the zip container `src` below `dst`.
///
/// Refuses entries that would land outside `dst` and never overwrites an
/// existing file.
pub fn unzip<R: Read + Seek>(src: R, dst: &Path) -> Result<ZipSummary, ArchiveError> {
    let mut archive = ZipArchive::new(src)?;
    let mut summary = ZipSummary::default();

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let Some(relative) = entry.enclosed_name() else {
            return Err(ArchiveError::UnsafePath(entry.name().to_string()));
        };
        let path = dst.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&path)?;
            continue;
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| match e.kind() {
                io::ErrorKind::AlreadyExists => ArchiveError::AlreadyExists(path.clone()),
                _ => ArchiveError::Io(e),
            })?;
        summary.bytes += io::copy(&mut entry, &mut file)?;
        summary.files += 1;

        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(mode & 0o777))?;
        }
    }

    tracing::debug!(files = summary.files, bytes = summary.bytes, "container unpacked");
    Ok(summary)
}

fn file_options(config: &ArchiveConfig) -> SimpleFileOptions {
    let options = SimpleFileOptions::default();
    match config.compression {
        Compression::Deflated => options
            .compression_method(CompressionMethod::Deflated)
            .compression_level(config.compression_level),
        Compression::Stored => options.compression_method(CompressionMethod::Stored),
    }
}

/// Zip entry name of `path`: relative to `base`, `/`-separated.
fn entry_name(base: &Path, path: &Path) -> Result<String, ArchiveError> {
    let relative = path
        .strip_prefix(base)
        .map_err(|_| ArchiveError::InvalidPath(path.to_path_buf()))?;

    let parts = relative
        .components()
        .map(|c| {
            c.as_os_str()
                .to_str()
                .ok_or_else(|| ArchiveError::InvalidPath(path.to_path_buf()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(parts.join("/"))
}
