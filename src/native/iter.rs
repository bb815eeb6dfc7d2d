use crate::io::ReadAt;
use crate::zip::{EntryCursor, ZipArchive, ZipFileEntry};
use crate::{Error, Result};

use super::classify::{NativeEntryName, classify};

/// A native library entry found by [`NativeLibraries`].
#[derive(Debug, Clone, Copy)]
pub struct NativeLibrary<'a> {
    pub entry: &'a ZipFileEntry,
    pub name: NativeEntryName<'a>,
}

impl<'a> NativeLibrary<'a> {
    pub fn abi(&self) -> &'a str {
        self.name.abi()
    }

    pub fn base_name(&self) -> &'a str {
        self.name.base_name()
    }
}

/// Iterator over the native libraries of an archive.
///
/// Walks the Central Directory once and yields every entry accepted by
/// [`classify`]. Entries with unreadable names are skipped. The underlying
/// iteration is released when this value is dropped.
pub struct NativeLibraries<'a> {
    cursor: EntryCursor<'a>,
}

impl<'a> NativeLibraries<'a> {
    pub fn new<R: ReadAt + ?Sized>(archive: &'a ZipArchive<R>) -> Result<Self> {
        let cursor = archive.start_iteration().map_err(Error::InvalidArchive)?;
        Ok(Self { cursor })
    }
}

impl<'a> Iterator for NativeLibraries<'a> {
    type Item = NativeLibrary<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        for entry in self.cursor.by_ref() {
            let Some(name) = entry.name() else {
                continue;
            };
            if let Some(name) = classify(name) {
                return Some(NativeLibrary { entry, name });
            }
        }
        None
    }
}
