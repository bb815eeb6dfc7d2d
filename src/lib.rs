//! # apklib
//!
//! Native library handling for Android application packages.
//!
//! An APK carries one build of each native library per CPU ABI under
//! `lib/<abi>/`. This crate answers the questions an installer has about
//! them and installs them:
//!
//! - which of the device's ABIs the package should run as
//! - how much space one ABI's libraries take
//! - installing one ABI's libraries into a directory, rewriting only files
//!   that changed and never leaving a half-written library behind
//! - whether the package carries RenderScript bitcode
//!
//! Archives are read from the local filesystem or, through HTTP Range
//! requests, from a remote server without downloading the whole file. A host
//! can plug in its own scanner through [`accel`].
//!
//! ## Example
//!
//! ```no_run
//! use std::path::Path;
//! use apklib::{ApkHandle, InstallStatus};
//!
//! fn main() -> anyhow::Result<()> {
//!     let apk = ApkHandle::open("/data/app/base.apk")?;
//!
//!     let abis = ["arm64-v8a", "armeabi-v7a", "armeabi"];
//!     if let Some(index) = apk.find_supported_abi(&abis)?.index() {
//!         let result = apk.copy_native_binaries(Path::new("/data/app/lib"), abis[index]);
//!         println!("{}", InstallStatus::of(&result));
//!     }
//!     Ok(())
//! }
//! ```

pub mod accel;
pub mod cli;
pub mod error;
pub mod helper;
pub mod io;
pub mod native;
pub mod status;
pub mod zip;

pub use accel::{AcceleratorBridge, PluginLoader};
pub use cli::Cli;
pub use error::{Error, Result};
pub use helper::ApkHandle;
pub use io::{HttpRangeReader, LocalFileReader, MemoryReader, ReadAt};
pub use native::{AbiMatch, abi_code};
pub use status::{BitcodeScan, InstallStatus};
pub use zip::{ZipArchive, ZipFileEntry};
