//! The handle an installer works with.
//!
//! [`ApkHandle`] owns an opened archive and, when a scanner plugin accepted
//! it, the plugin's per-archive filter. Every query first asks the filter;
//! a filter that declines hands the work to the built-in engine in
//! [`crate::native`].

use std::ops::ControlFlow;
use std::path::Path;
use std::sync::Arc;

use crate::accel::{AcceleratorBridge, LibraryFilter};
use crate::io::{HttpRangeReader, LocalFileReader, ReadAt};
use crate::native::{self, AbiMatch, AbiResolver, NativeEntryName, is_filename_safe};
use crate::status::BitcodeScan;
use crate::zip::{ZipArchive, ZipFileEntry};
use crate::{Error, Result};

pub fn is_http_url(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

/// An opened APK.
pub struct ApkHandle {
    location: String,
    archive: ZipArchive<dyn ReadAt>,
    filter: Option<Box<dyn LibraryFilter>>,
    bridge: Arc<AcceleratorBridge>,
}

impl ApkHandle {
    /// Open a local file or an `http(s)://` URL, using the process-wide
    /// accelerator bridge.
    pub fn open(location: &str) -> Result<Self> {
        let reader: Arc<dyn ReadAt> = if is_http_url(location) {
            Arc::new(HttpRangeReader::new(location.to_owned()).map_err(Error::InvalidArchive)?)
        } else {
            Arc::new(LocalFileReader::new(Path::new(location)).map_err(Error::InvalidArchive)?)
        };
        Self::from_reader(location, reader, AcceleratorBridge::global())
    }

    pub fn from_reader(
        location: impl Into<String>,
        reader: Arc<dyn ReadAt>,
        bridge: Arc<AcceleratorBridge>,
    ) -> Result<Self> {
        let location = location.into();
        let archive = ZipArchive::open(reader).map_err(Error::InvalidArchive)?;
        let filter = bridge.scanner().register(&location);
        tracing::debug!(%location, accelerated = filter.is_some(), "opened apk");
        Ok(Self {
            location,
            archive,
            filter,
            bridge,
        })
    }

    /// Release the archive and unregister it from the scanner.
    pub fn close(self) {}

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn archive(&self) -> &ZipArchive<dyn ReadAt> {
        &self.archive
    }

    /// Whether a scanner plugin accepted this archive.
    pub fn is_accelerated(&self) -> bool {
        self.filter.is_some()
    }

    /// Install the libraries built for `abi` into `dest_dir`.
    pub fn copy_native_binaries(&self, dest_dir: &Path, abi: &str) -> Result<()> {
        self.for_each_native_library(abi, |entry, base_name| {
            native::copy_file_if_changed(&self.archive, entry, dest_dir, base_name)
        })
    }

    /// Total uncompressed size of the libraries built for `abi`.
    ///
    /// Errors are logged; the sum gathered so far is returned. Saturates at
    /// `u64::MAX`.
    pub fn sum_native_binaries(&self, abi: &str) -> u64 {
        let mut total = 0u64;
        let result = self.for_each_native_library(abi, |entry, _| {
            total = total.saturating_add(entry.uncompressed_size);
            Ok(())
        });
        if let Err(e) = result {
            tracing::warn!(location = %self.location, abi, error = %e, "couldn't size native libraries");
        }
        total
    }

    pub fn find_supported_abi<S: AsRef<str>>(&self, abis: &[S]) -> Result<AbiMatch> {
        if let Some(filter) = &self.filter {
            let mut resolver = AbiResolver::new(abis);
            let verdict = filter.filter_libraries(&mut |name| match NativeEntryName::split(name) {
                Some(library) => resolver.observe(library.abi()),
                None => {
                    tracing::warn!(name, "scanner reported a name outside lib/<abi>/");
                    ControlFlow::Continue(())
                }
            });
            if verdict.is_ok() {
                return Ok(self.verify_assets(resolver.best(), abis));
            }
            tracing::debug!(location = %self.location, "scanner declined, resolving ABI natively");
        }
        native::find_supported_abi(&self.archive, abis)
    }

    pub fn has_renderscript_bitcode(&self) -> BitcodeScan {
        if let Some(present) = self.filter.as_ref().and_then(|f| f.has_renderscript()) {
            return present.into();
        }
        match native::has_renderscript_bitcode(&self.archive) {
            Ok(present) => present.into(),
            Err(e) => {
                tracing::warn!(location = %self.location, error = %e, "bitcode scan failed");
                BitcodeScan::ScanError
            }
        }
    }

    /// An archive without native code may still carry ABI-specific assets.
    fn verify_assets<S: AsRef<str>>(&self, found: AbiMatch, abis: &[S]) -> AbiMatch {
        if found != AbiMatch::NoNativeLibraries {
            return found;
        }
        match self.bridge.assets_verifier() {
            Some(verifier) => {
                let labels: Vec<&str> = abis.iter().map(AsRef::as_ref).collect();
                verifier.assets_status(&self.archive, &labels)
            }
            None => {
                tracing::warn!("assets verifier unavailable");
                found
            }
        }
    }

    fn for_each_native_library<F>(&self, abi: &str, mut f: F) -> Result<()>
    where
        F: FnMut(&ZipFileEntry, &str) -> Result<()>,
    {
        if let Some(filter) = &self.filter {
            match self.accelerated_libraries(filter.as_ref(), abi) {
                Some(libraries) => {
                    for (entry, base_name) in libraries? {
                        if let Err(e) = f(entry, &base_name) {
                            tracing::debug!(entry = %base_name, error = %e, "failure for entry");
                            return Err(e);
                        }
                    }
                    return Ok(());
                }
                None => {
                    tracing::debug!(location = %self.location, "scanner declined, walking the archive");
                }
            }
        }
        native::for_each_native_library(&self.archive, abi, f)
    }

    /// Entries the filter reports for `abi`, or `None` if it declined.
    fn accelerated_libraries(
        &self,
        filter: &dyn LibraryFilter,
        abi: &str,
    ) -> Option<Result<Vec<(&ZipFileEntry, String)>>> {
        let mut found = Ok(Vec::new());
        let verdict = filter.filter_libraries(&mut |name| {
            let Some(library) = accepted_name(name) else {
                tracing::warn!(name, "skipping unusable name from scanner");
                return ControlFlow::Continue(());
            };
            if library.abi() != abi {
                return ControlFlow::Continue(());
            }
            let entry = match self.archive.find_entry(name) {
                Ok(Some(entry)) => entry,
                Ok(None) => {
                    found = Err(Error::EntryNotFound {
                        name: name.to_owned(),
                    });
                    return ControlFlow::Break(());
                }
                Err(e) => {
                    found = Err(Error::InvalidArchive(e));
                    return ControlFlow::Break(());
                }
            };
            if let Ok(libraries) = &mut found {
                libraries.push((entry, library.base_name().to_owned()));
            }
            ControlFlow::Continue(())
        });
        verdict.ok().map(|()| found)
    }
}

impl Drop for ApkHandle {
    fn drop(&mut self) {
        if let Some(filter) = self.filter.take() {
            self.bridge.scanner().unregister(filter);
        }
    }
}

fn accepted_name(name: &str) -> Option<NativeEntryName<'_>> {
    let library = NativeEntryName::split(name)?;
    let base_name = library.base_name();
    if base_name.is_empty() || base_name == "." || base_name == ".." || !is_filename_safe(base_name) {
        return None;
    }
    Some(library)
}
