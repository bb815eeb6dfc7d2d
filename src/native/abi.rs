use std::fmt;
use std::ops::ControlFlow;

use crate::io::ReadAt;
use crate::status::InstallStatus;
use crate::zip::ZipArchive;
use crate::Result;

use super::iter::NativeLibraries;

/// Outcome of matching an archive's native code against an ABI preference list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AbiMatch {
    /// Index into the preference list of the best ABI present.
    Matched(usize),
    /// The archive has native libraries, none for a listed ABI.
    NoMatchingAbi,
    /// The archive has no native libraries at all.
    NoNativeLibraries,
}

impl AbiMatch {
    /// The integer the helper reports: the index, or a negative install code.
    pub fn code(self) -> i32 {
        match self {
            AbiMatch::Matched(index) => {
                i32::try_from(index).expect("ABI preference index exceeds i32::MAX")
            }
            AbiMatch::NoMatchingAbi => InstallStatus::NoMatchingAbis.code(),
            AbiMatch::NoNativeLibraries => InstallStatus::NoNativeLibraries.code(),
        }
    }

    pub fn index(self) -> Option<usize> {
        match self {
            AbiMatch::Matched(index) => Some(index),
            _ => None,
        }
    }
}

impl fmt::Display for AbiMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbiMatch::Matched(index) => write!(f, "matched ABI #{}", index),
            AbiMatch::NoMatchingAbi => write!(f, "{}", InstallStatus::NoMatchingAbis),
            AbiMatch::NoNativeLibraries => write!(f, "{}", InstallStatus::NoNativeLibraries),
        }
    }
}

/// Reported code for a resolution that may have failed.
pub fn abi_code(result: &Result<AbiMatch>) -> i32 {
    match result {
        Ok(found) => found.code(),
        Err(e) => e.status().code(),
    }
}

/// Picks the most preferred ABI among the native libraries it is shown.
///
/// Feed it the ABI label of every native library with [`observe`]; a lower
/// index in the preference list always wins.
///
/// [`observe`]: AbiResolver::observe
pub struct AbiResolver<'p, S> {
    abis: &'p [S],
    best: AbiMatch,
}

impl<'p, S: AsRef<str>> AbiResolver<'p, S> {
    pub fn new(abis: &'p [S]) -> Self {
        Self {
            abis,
            best: AbiMatch::NoNativeLibraries,
        }
    }

    /// Account for one native library with the given ABI label.
    ///
    /// Breaks once the most preferred ABI has been seen, since nothing can
    /// beat it.
    pub fn observe(&mut self, abi: &str) -> ControlFlow<()> {
        if self.best == AbiMatch::NoNativeLibraries {
            self.best = AbiMatch::NoMatchingAbi;
        }

        let limit = self.best.index().unwrap_or(self.abis.len());
        if let Some(index) = self.abis[..limit].iter().position(|a| a.as_ref() == abi) {
            self.best = AbiMatch::Matched(index);
        }

        if self.best == AbiMatch::Matched(0) {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    }

    pub fn best(&self) -> AbiMatch {
        self.best
    }
}

/// Find the most preferred ABI of `abis` that the archive ships libraries for.
pub fn find_supported_abi<R, S>(archive: &ZipArchive<R>, abis: &[S]) -> Result<AbiMatch>
where
    R: ReadAt + ?Sized,
    S: AsRef<str>,
{
    let mut resolver = AbiResolver::new(abis);
    for library in NativeLibraries::new(archive)? {
        if resolver.observe(library.abi()).is_break() {
            break;
        }
    }
    Ok(resolver.best())
}
