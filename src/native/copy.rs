//! Materializing one ABI's native libraries.
//!
//! Copies are change-aware: an installed file that already matches the
//! archive entry in size, modification time and CRC-32 is left alone.
//! Otherwise the entry is staged in a temporary file next to the
//! destination and renamed over it, so a failure never leaves a partially
//! written library behind.

use std::fs::{self, File};
use std::io::Read;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Context;
use flate2::Crc;

use crate::io::ReadAt;
use crate::zip::{PATH_MAX, ZipArchive, ZipFileEntry};
use crate::{Error, Result};

use super::iter::NativeLibraries;

/// Mode of installed libraries: rwxr-xr-x.
pub const LIBRARY_MODE: u32 = 0o755;

const TMP_FILE_PREFIX: &str = "tmp.";
const CRC_BUFFER_SIZE: usize = 16 * 1024;

/// Call `f` for every native library of the archive built for `abi`.
///
/// Stops at the first entry `f` fails on and returns that error.
pub fn for_each_native_library<R, F>(archive: &ZipArchive<R>, abi: &str, mut f: F) -> Result<()>
where
    R: ReadAt + ?Sized,
    F: FnMut(&ZipFileEntry, &str) -> Result<()>,
{
    for library in NativeLibraries::new(archive)? {
        if library.abi() != abi {
            continue;
        }
        if let Err(e) = f(library.entry, library.base_name()) {
            tracing::debug!(entry = library.base_name(), error = %e, "failure for entry");
            return Err(e);
        }
    }
    Ok(())
}

/// Total uncompressed size of the native libraries built for `abi`.
///
/// Saturates at `u64::MAX` when declared sizes do not fit.
pub fn sum_native_binaries<R>(archive: &ZipArchive<R>, abi: &str) -> Result<u64>
where
    R: ReadAt + ?Sized,
{
    let mut total = 0u64;
    for_each_native_library(archive, abi, |entry, _| {
        total = total.saturating_add(entry.uncompressed_size);
        Ok(())
    })?;
    Ok(total)
}

/// Copy every native library built for `abi` into `dest_dir`, skipping
/// files that are already up to date.
pub fn copy_native_binaries<R>(archive: &ZipArchive<R>, dest_dir: &Path, abi: &str) -> Result<()>
where
    R: ReadAt + ?Sized,
{
    for_each_native_library(archive, abi, |entry, base_name| {
        copy_file_if_changed(archive, entry, dest_dir, base_name)
    })
}

/// Install one entry as `dest_dir/file_name` unless an identical file is
/// already there.
///
/// `file_name` must already be known to be safe.
pub fn copy_file_if_changed<R>(
    archive: &ZipArchive<R>,
    entry: &ZipFileEntry,
    dest_dir: &Path,
    file_name: &str,
) -> Result<()>
where
    R: ReadAt + ?Sized,
{
    let local_path = dest_dir.join(file_name);
    if local_path.as_os_str().len() >= PATH_MAX {
        return Err(Error::PathTooLong {
            name: file_name.to_owned(),
            dir: dest_dir.to_path_buf(),
        });
    }

    let modified = entry.modified();
    if !is_file_different(&local_path, entry.uncompressed_size, modified, entry.crc32) {
        tracing::debug!(path = %local_path.display(), "native library is up to date");
        return Ok(());
    }

    stage_and_replace(archive, entry, dest_dir, &local_path, modified).map_err(|cause| {
        Error::Container {
            name: file_name.to_owned(),
            path: local_path.clone(),
            cause,
        }
    })?;

    tracing::debug!(entry = %entry.file_name, path = %local_path.display(), "installed native library");
    Ok(())
}

/// Whether the file at `path` has to be (re)written to match the entry.
///
/// Any problem reading the existing file counts as different.
pub fn is_file_different(path: &Path, size: u64, modified: SystemTime, crc32: u32) -> bool {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) => {
            tracing::trace!(path = %path.display(), error = %e, "couldn't stat, copying");
            return true;
        }
    };

    if !meta.file_type().is_file() || meta.len() != size {
        return true;
    }

    let mtime = meta.modified().ok().map(unix_seconds);
    if mtime != Some(unix_seconds(modified)) {
        tracing::trace!(path = %path.display(), ?mtime, "mod time doesn't match");
        return true;
    }

    match file_crc32(path) {
        Ok(crc) => {
            tracing::trace!(path = %path.display(), crc = format_args!("{:08x}", crc), zip_crc = format_args!("{:08x}", crc32));
            crc != crc32
        }
        Err(e) => {
            tracing::trace!(path = %path.display(), error = %e, "couldn't read");
            true
        }
    }
}

fn unix_seconds(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_secs() as i64,
        Err(e) => -(e.duration().as_secs_f64().ceil() as i64),
    }
}

fn file_crc32(path: &Path) -> std::io::Result<u32> {
    let mut file = File::open(path)?;
    let mut crc = Crc::new();
    let mut buf = vec![0u8; CRC_BUFFER_SIZE];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        crc.update(&buf[..n]);
    }
    Ok(crc.sum())
}

/// Decompress into a fresh temporary file in `dest_dir`, stamp it and
/// rename it to `local_path`. The temporary file is removed on failure.
fn stage_and_replace<R>(
    archive: &ZipArchive<R>,
    entry: &ZipFileEntry,
    dest_dir: &Path,
    local_path: &Path,
    modified: SystemTime,
) -> anyhow::Result<()>
where
    R: ReadAt + ?Sized,
{
    let mut tmp = tempfile::Builder::new()
        .prefix(TMP_FILE_PREFIX)
        .rand_bytes(6)
        .tempfile_in(dest_dir)
        .with_context(|| format!("Couldn't open temporary file in {}", dest_dir.display()))?;

    archive
        .decompress_to(entry, tmp.as_file_mut())
        .with_context(|| format!("Failed uncompressing {}", entry.file_name))?;

    tmp.as_file()
        .set_modified(modified)
        .with_context(|| format!("Couldn't change modification time on {}", tmp.path().display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(tmp.path(), fs::Permissions::from_mode(LIBRARY_MODE))
            .with_context(|| format!("Couldn't change permissions on {}", tmp.path().display()))?;
    }

    tmp.persist(local_path).map_err(|e| {
        anyhow::Error::new(e.error).context(format!("Couldn't rename to {}", local_path.display()))
    })?;
    Ok(())
}
