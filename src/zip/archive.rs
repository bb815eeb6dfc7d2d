use std::collections::HashMap;
use std::io::{self, Read, Write};
use std::sync::Arc;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use flate2::CrcWriter;
use flate2::read::DeflateDecoder;

use crate::io::ReadAt;
use anyhow::{Result, bail};

use super::parser::{CentralDirectoryLocation, ZipParser};
use super::structures::{CompressionMethod, ZipFileEntry};

/// Parsed Central Directory with a name index.
struct Directory {
    entries: Vec<ZipFileEntry>,
    by_name: HashMap<Vec<u8>, usize>,
}

impl Directory {
    fn new(entries: Vec<ZipFileEntry>) -> Self {
        let mut by_name = HashMap::with_capacity(entries.len());
        for (index, entry) in entries.iter().enumerate() {
            // First record wins for duplicated names
            by_name.entry(entry.raw_name.clone()).or_insert(index);
        }
        Self { entries, by_name }
    }
}

/// A read-only ZIP archive.
///
/// Opening only locates the Central Directory. The directory is read and
/// parsed the first time the archive is iterated or searched, then kept for
/// the lifetime of the archive.
pub struct ZipArchive<R: ReadAt + ?Sized> {
    parser: ZipParser<R>,
    location: CentralDirectoryLocation,
    directory: OnceLock<Directory>,
    iterations: AtomicUsize,
}

impl<R: ReadAt + ?Sized> ZipArchive<R> {
    /// Open an archive over the given reader.
    ///
    /// Fails if the data has no usable End of Central Directory record.
    pub fn open(reader: Arc<R>) -> Result<Self> {
        let parser = ZipParser::new(reader);
        let location = parser.locate_central_directory()?;
        tracing::trace!(
            cd_offset = location.offset,
            cd_size = location.size,
            entries = location.total_entries,
            "located central directory"
        );
        Ok(Self {
            parser,
            location,
            directory: OnceLock::new(),
            iterations: AtomicUsize::new(0),
        })
    }

    /// Number of records the EOCD announces.
    pub fn entry_count(&self) -> u64 {
        self.location.total_entries
    }

    fn directory(&self) -> Result<&Directory> {
        if let Some(directory) = self.directory.get() {
            return Ok(directory);
        }
        let entries = self.parser.read_central_directory(&self.location)?;
        Ok(self.directory.get_or_init(|| Directory::new(entries)))
    }

    /// Start iterating over the raw directory records.
    ///
    /// Fails when the Central Directory cannot be read or parsed. The
    /// iteration ends when the returned cursor is dropped.
    pub fn start_iteration(&self) -> Result<EntryCursor<'_>> {
        let directory = self.directory()?;
        self.iterations.fetch_add(1, Ordering::AcqRel);
        Ok(EntryCursor {
            entries: directory.entries.iter(),
            active: &self.iterations,
        })
    }

    /// Number of cursors that have been started and not yet dropped.
    pub fn active_iterations(&self) -> usize {
        self.iterations.load(Ordering::Acquire)
    }

    /// Look up a record by its exact name.
    pub fn find_entry(&self, name: &str) -> Result<Option<&ZipFileEntry>> {
        let directory = self.directory()?;
        Ok(directory
            .by_name
            .get(name.as_bytes())
            .map(|&index| &directory.entries[index]))
    }

    /// Decompress an entry into `writer`.
    ///
    /// The decompressed length and CRC-32 are checked against the directory
    /// record. Returns the number of bytes written.
    pub fn decompress_to<W: Write>(&self, entry: &ZipFileEntry, writer: W) -> Result<u64> {
        let data_offset = self.parser.get_data_offset(entry)?;
        let mut source = EntryReader {
            reader: &**self.parser.reader(),
            offset: data_offset,
            remaining: entry.compressed_size,
        };

        let mut out = CrcWriter::new(writer);
        let written = match entry.compression_method {
            CompressionMethod::Stored => io::copy(&mut source, &mut out)?,
            CompressionMethod::Deflate => io::copy(&mut DeflateDecoder::new(source), &mut out)?,
            CompressionMethod::Unknown(method) => {
                bail!(
                    "Unsupported compression method {} for {}",
                    method,
                    entry.file_name
                )
            }
        };
        out.flush()?;

        if written != entry.uncompressed_size {
            bail!(
                "Size mismatch for {}: expected {} bytes, got {}",
                entry.file_name,
                entry.uncompressed_size,
                written
            );
        }
        let crc = out.crc().sum();
        if crc != entry.crc32 {
            bail!(
                "CRC mismatch for {}: expected {:08x}, got {:08x}",
                entry.file_name,
                entry.crc32,
                crc
            );
        }

        Ok(written)
    }

    /// Get a reference to the underlying reader.
    pub fn reader(&self) -> &Arc<R> {
        self.parser.reader()
    }
}

/// A cursor over the raw records of a [`ZipArchive`].
///
/// Dropping the cursor ends the iteration.
pub struct EntryCursor<'a> {
    entries: std::slice::Iter<'a, ZipFileEntry>,
    active: &'a AtomicUsize,
}

impl<'a> Iterator for EntryCursor<'a> {
    type Item = &'a ZipFileEntry;

    fn next(&mut self) -> Option<Self::Item> {
        self.entries.next()
    }
}

impl Drop for EntryCursor<'_> {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Sequential reader over the compressed bytes of one entry.
struct EntryReader<'a, R: ReadAt + ?Sized> {
    reader: &'a R,
    offset: u64,
    remaining: u64,
}

impl<R: ReadAt + ?Sized> Read for EntryReader<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.remaining == 0 || buf.is_empty() {
            return Ok(0);
        }
        let want = (buf.len() as u64).min(self.remaining) as usize;
        let n = self
            .reader
            .read_at(self.offset, &mut buf[..want])
            .map_err(io::Error::other)?;
        if n == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "entry data truncated",
            ));
        }
        self.offset += n as u64;
        self.remaining -= n as u64;
        Ok(n)
    }
}
