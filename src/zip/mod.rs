//! Read-only ZIP archive access.
//!
//! This module provides the archive collaborator the native library scanner
//! is built on: opening an archive, iterating its Central Directory,
//! looking entries up by name and decompressing them.
//!
//! ## Architecture
//!
//! - [`structures`]: Data structures representing ZIP format elements (EOCD, file headers, etc.)
//! - [`parser`]: Low-level parsing of ZIP structures from raw bytes
//! - [`archive`]: The archive handle, iteration cursors and decompression
//! - [`time`]: DOS timestamp conversion
//!
//! ## ZIP Format Overview
//!
//! A ZIP file consists of:
//! 1. Local file headers and compressed data for each file
//! 2. Central Directory with metadata for all files
//! 3. End of Central Directory (EOCD) record at the end
//!
//! This implementation reads the EOCD first (from the end of the file),
//! then the Central Directory, which allows scanning entry names without
//! reading the entire archive.
//!
//! ## Supported Features
//!
//! - Standard ZIP format (PKZIP APPNOTE 6.3.x compatible)
//! - ZIP64 extensions for files > 4GB
//! - STORED (no compression) method
//! - DEFLATE compression method
//!
//! ## Limitations
//!
//! - No encryption support
//! - No multi-disk archive support
//! - No BZIP2, LZMA, or other compression methods

mod archive;
mod parser;
mod structures;
mod time;

pub use archive::{EntryCursor, ZipArchive};
pub use parser::{CentralDirectoryLocation, ZipParser};
pub use structures::*;

/// Longest entry name, including its terminator, the scanner accepts.
pub const PATH_MAX: usize = 4096;
