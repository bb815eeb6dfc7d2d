use super::filename::is_filename_safe;

/// Directory holding native libraries inside an APK.
pub const APK_LIB: &str = "lib/";
/// Every packaged library's file name starts with this.
pub const LIB_PREFIX: &str = "lib";
pub const LIB_SUFFIX: &str = ".so";
/// Debugger helper shipped next to the libraries of debuggable apps.
pub const GDBSERVER: &str = "gdbserver";

/// Shortest name that can hold `lib/`, a two character ABI, `/lib`, one
/// character and `.so`.
const MIN_LENGTH: usize = APK_LIB.len() + 2 + 1 + LIB_PREFIX.len() + 1 + LIB_SUFFIX.len();

/// An entry name of the form `lib/<abi>/<file>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeEntryName<'a> {
    name: &'a str,
    boundary: usize,
}

impl<'a> NativeEntryName<'a> {
    /// Split `lib/<abi>/<file>` without judging the file name.
    ///
    /// Returns `None` when the name is outside `lib/` or has no separator
    /// after it.
    pub fn split(name: &'a str) -> Option<Self> {
        if !name.starts_with(APK_LIB) {
            return None;
        }
        let boundary = name.rfind('/')?;
        if boundary < APK_LIB.len() {
            return None;
        }
        Some(Self { name, boundary })
    }

    /// The whole entry name.
    pub fn as_str(&self) -> &'a str {
        self.name
    }

    /// Byte offset of the separator between the ABI and the file name.
    pub fn abi_boundary(&self) -> usize {
        self.boundary
    }

    pub fn abi(&self) -> &'a str {
        &self.name[APK_LIB.len()..self.boundary]
    }

    pub fn base_name(&self) -> &'a str {
        &self.name[self.boundary + 1..]
    }
}

/// Decide whether an archive entry is a native library.
///
/// Accepted are `lib/<abi>/lib*.so` entries and `lib/<abi>/gdbserver`, as
/// long as the file name passes [`is_filename_safe`].
pub fn classify(name: &str) -> Option<NativeEntryName<'_>> {
    if name.len() < MIN_LENGTH {
        return None;
    }
    let entry = NativeEntryName::split(name)?;
    let base = entry.base_name();

    let wanted = base == GDBSERVER || (base.starts_with(LIB_PREFIX) && base.ends_with(LIB_SUFFIX));
    if !wanted || !is_filename_safe(base) {
        return None;
    }
    Some(entry)
}
