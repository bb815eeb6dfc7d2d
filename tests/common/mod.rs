#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use apklib::accel::AcceleratorBridge;
use apklib::{ApkHandle, MemoryReader, ReadAt};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

/// Builds an in-memory APK with a fixed timestamp on every entry.
pub struct ApkBuilder {
    writer: ZipWriter<Cursor<Vec<u8>>>,
}

impl ApkBuilder {
    pub fn new() -> Self {
        Self {
            writer: ZipWriter::new(Cursor::new(Vec::new())),
        }
    }

    pub fn stored(self, name: &str, data: &[u8]) -> Self {
        self.add(name, data, CompressionMethod::Stored)
    }

    pub fn deflated(self, name: &str, data: &[u8]) -> Self {
        self.add(name, data, CompressionMethod::Deflated)
    }

    /// A stored entry of `len` bytes.
    pub fn sized(self, name: &str, len: usize) -> Self {
        self.add(name, &vec![0x7f; len], CompressionMethod::Stored)
    }

    fn add(mut self, name: &str, data: &[u8], method: CompressionMethod) -> Self {
        let options = SimpleFileOptions::default()
            .compression_method(method)
            .last_modified_time(fixture_time());
        self.writer.start_file(name, options).unwrap();
        self.writer.write_all(data).unwrap();
        self
    }

    pub fn build(self) -> Vec<u8> {
        self.writer.finish().unwrap().into_inner()
    }
}

pub fn fixture_time() -> DateTime {
    DateTime::from_date_and_time(2021, 6, 15, 12, 30, 40).unwrap()
}

/// Memory reader that counts the bytes it serves and can be told to fail.
pub struct TestReader {
    inner: MemoryReader,
    bytes_read: AtomicU64,
    fail: AtomicBool,
}

impl TestReader {
    pub fn new(data: Vec<u8>) -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryReader::new(data),
            bytes_read: AtomicU64::new(0),
            fail: AtomicBool::new(false),
        })
    }

    pub fn bytes_read(&self) -> u64 {
        self.bytes_read.load(Ordering::SeqCst)
    }

    pub fn reset_count(&self) {
        self.bytes_read.store(0, Ordering::SeqCst);
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

impl ReadAt for TestReader {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> anyhow::Result<usize> {
        if self.fail.load(Ordering::SeqCst) {
            anyhow::bail!("injected read failure at offset {}", offset);
        }
        let n = self.inner.read_at(offset, buf)?;
        self.bytes_read.fetch_add(n as u64, Ordering::SeqCst);
        Ok(n)
    }

    fn size(&self) -> u64 {
        self.inner.size()
    }
}

/// Open with a private bridge that never accelerates.
pub fn open_plain(reader: Arc<TestReader>) -> ApkHandle {
    ApkHandle::from_reader("test.apk", reader, Arc::new(AcceleratorBridge::unbound())).unwrap()
}

pub fn open_bytes(bytes: Vec<u8>) -> ApkHandle {
    open_plain(TestReader::new(bytes))
}

/// Break the signature of the first Central Directory record.
pub fn corrupt_central_directory(bytes: &mut [u8]) {
    let at = bytes
        .windows(4)
        .position(|w| w == b"PK\x01\x02")
        .expect("archive has a central directory");
    bytes[at + 2] = 0x7f;
}

/// Flip the first byte of `payload` where it is stored in the archive.
pub fn corrupt_payload(bytes: &mut [u8], payload: &[u8]) {
    let at = bytes
        .windows(payload.len())
        .position(|w| w == payload)
        .expect("payload is stored uncompressed");
    bytes[at] ^= 0x20;
}

/// An archive made only of a Central Directory whose records declare the
/// given uncompressed sizes through ZIP64 extra fields.
pub fn zip64_sized_directory(entries: &[(&str, u64)]) -> Vec<u8> {
    let mut cd = Vec::new();
    for (name, size) in entries {
        cd.extend_from_slice(b"PK\x01\x02");
        cd.extend_from_slice(&45u16.to_le_bytes()); // version made by
        cd.extend_from_slice(&45u16.to_le_bytes()); // version needed
        cd.extend_from_slice(&0u16.to_le_bytes()); // flags
        cd.extend_from_slice(&0u16.to_le_bytes()); // stored
        cd.extend_from_slice(&0u16.to_le_bytes()); // time
        cd.extend_from_slice(&0x5021u16.to_le_bytes()); // date
        cd.extend_from_slice(&0u32.to_le_bytes()); // crc
        cd.extend_from_slice(&0u32.to_le_bytes()); // compressed size
        cd.extend_from_slice(&u32::MAX.to_le_bytes()); // uncompressed size in extra
        cd.extend_from_slice(&(name.len() as u16).to_le_bytes());
        cd.extend_from_slice(&12u16.to_le_bytes()); // extra length
        cd.extend_from_slice(&0u16.to_le_bytes()); // comment length
        cd.extend_from_slice(&0u16.to_le_bytes()); // disk
        cd.extend_from_slice(&0u16.to_le_bytes()); // internal attrs
        cd.extend_from_slice(&0u32.to_le_bytes()); // external attrs
        cd.extend_from_slice(&0u32.to_le_bytes()); // local header offset
        cd.extend_from_slice(name.as_bytes());
        cd.extend_from_slice(&1u16.to_le_bytes()); // ZIP64 extra id
        cd.extend_from_slice(&8u16.to_le_bytes());
        cd.extend_from_slice(&size.to_le_bytes());
    }

    let mut bytes = cd.clone();
    bytes.extend_from_slice(b"PK\x05\x06");
    bytes.extend_from_slice(&0u16.to_le_bytes());
    bytes.extend_from_slice(&0u16.to_le_bytes());
    bytes.extend_from_slice(&(entries.len() as u16).to_le_bytes());
    bytes.extend_from_slice(&(entries.len() as u16).to_le_bytes());
    bytes.extend_from_slice(&(cd.len() as u32).to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes()); // directory offset
    bytes.extend_from_slice(&0u16.to_le_bytes());
    bytes
}
