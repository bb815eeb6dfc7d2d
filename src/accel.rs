//! Optional scanner plugins.
//!
//! A host can provide a faster or policy-extended native library scanner
//! (and a companion asset verifier). Plugins are looked up by well-known
//! library names through a [`PluginLoader`] the first time they are needed
//! and the answer is kept for the lifetime of the [`AcceleratorBridge`].
//! Without a loader, or when a plugin cannot be loaded, the bridge hands out
//! [`UnboundScanner`], which declines every archive so the built-in engine
//! always runs.

use std::ops::ControlFlow;
use std::sync::{Arc, OnceLock};

use crate::io::ReadAt;
use crate::native::AbiMatch;
use crate::zip::ZipArchive;

/// Well-known name of the scanner plugin.
pub const SCANNER_LIBRARY: &str = "libapkscanner.so";
/// Well-known name of the asset verifier plugin.
pub const ASSETS_VERIFIER_LIBRARY: &str = "libassetsverifier.so";

/// Returned by a plugin that does not handle an archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Declined;

/// Per-archive object handed out by a scanner at registration.
pub trait LibraryFilter: Send + Sync {
    /// Report the name of every native library entry of the archive to
    /// `visit`, until it breaks.
    ///
    /// Returning `Ok` makes the walk authoritative, including when `visit`
    /// stopped it early. `Err(Declined)` hands the archive back to the
    /// built-in engine.
    fn filter_libraries(
        &self,
        visit: &mut dyn FnMut(&str) -> ControlFlow<()>,
    ) -> Result<(), Declined>;

    /// Whether the archive carries RenderScript bitcode, `None` if the
    /// scanner cannot tell.
    fn has_renderscript(&self) -> Option<bool>;
}

/// The scanner plugin.
pub trait ApkScanner: Send + Sync {
    /// Register an opened archive. `None` means the scanner does not handle it.
    fn register(&self, location: &str) -> Option<Box<dyn LibraryFilter>>;

    /// Called when the archive a filter was registered for is closed.
    fn unregister(&self, filter: Box<dyn LibraryFilter>);
}

/// Classifies ABI-specific assets of archives without native libraries.
pub trait AssetsVerifier: Send + Sync {
    fn assets_status(&self, archive: &ZipArchive<dyn ReadAt>, abis: &[&str]) -> AbiMatch;
}

/// Resolves plugins by name. Supplied by the host.
pub trait PluginLoader: Send + Sync {
    fn load_scanner(&self, name: &str) -> Option<Arc<dyn ApkScanner>>;

    fn load_assets_verifier(&self, name: &str) -> Option<Arc<dyn AssetsVerifier>>;
}

/// Scanner used when no plugin is bound: handles nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnboundScanner;

impl ApkScanner for UnboundScanner {
    fn register(&self, _location: &str) -> Option<Box<dyn LibraryFilter>> {
        None
    }

    fn unregister(&self, _filter: Box<dyn LibraryFilter>) {}
}

static UNBOUND: UnboundScanner = UnboundScanner;

static GLOBAL: OnceLock<Arc<AcceleratorBridge>> = OnceLock::new();

/// The global bridge was already set up when a loader was installed.
#[derive(Debug, thiserror::Error)]
#[error("plugin loader installed after the accelerator bridge was first used")]
pub struct AlreadyInstalled;

/// Lazily bound access to the scanner plugins.
pub struct AcceleratorBridge {
    loader: Option<Box<dyn PluginLoader>>,
    scanner: OnceLock<Option<Arc<dyn ApkScanner>>>,
    assets_verifier: OnceLock<Option<Arc<dyn AssetsVerifier>>>,
}

impl AcceleratorBridge {
    /// A bridge that never binds anything.
    pub fn unbound() -> Self {
        Self {
            loader: None,
            scanner: OnceLock::new(),
            assets_verifier: OnceLock::new(),
        }
    }

    pub fn with_loader(loader: impl PluginLoader + 'static) -> Self {
        Self {
            loader: Some(Box::new(loader)),
            ..Self::unbound()
        }
    }

    /// Process-wide bridge, unbound unless [`install_global`] ran first.
    ///
    /// [`install_global`]: AcceleratorBridge::install_global
    pub fn global() -> Arc<AcceleratorBridge> {
        GLOBAL
            .get_or_init(|| Arc::new(AcceleratorBridge::unbound()))
            .clone()
    }

    /// Give the process-wide bridge its loader. Only possible before the
    /// bridge is first used.
    pub fn install_global(loader: impl PluginLoader + 'static) -> Result<(), AlreadyInstalled> {
        GLOBAL
            .set(Arc::new(AcceleratorBridge::with_loader(loader)))
            .map_err(|_| AlreadyInstalled)
    }

    fn bound_scanner(&self) -> Option<&Arc<dyn ApkScanner>> {
        self.scanner
            .get_or_init(|| {
                let scanner = self
                    .loader
                    .as_ref()
                    .and_then(|loader| loader.load_scanner(SCANNER_LIBRARY));
                tracing::debug!(
                    library = SCANNER_LIBRARY,
                    available = scanner.is_some(),
                    "bound scanner plugin"
                );
                scanner
            })
            .as_ref()
    }

    /// The scanner to consult, [`UnboundScanner`] if none is available.
    pub fn scanner(&self) -> &dyn ApkScanner {
        match self.bound_scanner() {
            Some(scanner) => scanner.as_ref(),
            None => &UNBOUND,
        }
    }

    pub fn is_scanner_available(&self) -> bool {
        self.bound_scanner().is_some()
    }

    pub fn assets_verifier(&self) -> Option<&dyn AssetsVerifier> {
        self.assets_verifier
            .get_or_init(|| {
                let verifier = self
                    .loader
                    .as_ref()
                    .and_then(|loader| loader.load_assets_verifier(ASSETS_VERIFIER_LIBRARY));
                tracing::debug!(
                    library = ASSETS_VERIFIER_LIBRARY,
                    available = verifier.is_some(),
                    "bound assets verifier plugin"
                );
                verifier
            })
            .as_deref()
    }
}

impl Default for AcceleratorBridge {
    fn default() -> Self {
        Self::unbound()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingLoader {
        scanner_loads: Arc<AtomicUsize>,
        verifier_loads: Arc<AtomicUsize>,
    }

    impl PluginLoader for CountingLoader {
        fn load_scanner(&self, name: &str) -> Option<Arc<dyn ApkScanner>> {
            assert_eq!(name, SCANNER_LIBRARY);
            self.scanner_loads.fetch_add(1, Ordering::SeqCst);
            Some(Arc::new(UnboundScanner))
        }

        fn load_assets_verifier(&self, name: &str) -> Option<Arc<dyn AssetsVerifier>> {
            assert_eq!(name, ASSETS_VERIFIER_LIBRARY);
            self.verifier_loads.fetch_add(1, Ordering::SeqCst);
            None
        }
    }

    #[test]
    fn unbound_bridge_declines_everything() {
        let bridge = AcceleratorBridge::unbound();
        assert!(!bridge.is_scanner_available());
        assert!(bridge.scanner().register("app.apk").is_none());
        assert!(bridge.assets_verifier().is_none());
    }

    #[test]
    fn plugins_are_bound_once() {
        let loader = CountingLoader::default();
        let scanner_loads = loader.scanner_loads.clone();
        let verifier_loads = loader.verifier_loads.clone();
        let bridge = AcceleratorBridge::with_loader(loader);

        for _ in 0..3 {
            assert!(bridge.is_scanner_available());
            let _ = bridge.scanner().register("app.apk");
            assert!(bridge.assets_verifier().is_none());
        }
        assert_eq!(scanner_loads.load(Ordering::SeqCst), 1);
        assert_eq!(verifier_loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn concurrent_first_use_binds_once() {
        let loader = CountingLoader::default();
        let scanner_loads = loader.scanner_loads.clone();
        let bridge = Arc::new(AcceleratorBridge::with_loader(loader));

        let threads: Vec<_> = (0..8)
            .map(|_| {
                let bridge = bridge.clone();
                std::thread::spawn(move || bridge.is_scanner_available())
            })
            .collect();
        for t in threads {
            assert!(t.join().unwrap());
        }
        assert_eq!(scanner_loads.load(Ordering::SeqCst), 1);
    }
}
