//! Native library scanning.
//!
//! APKs ship one copy of each native library per CPU ABI under
//! `lib/<abi>/`. This module finds those entries, picks the ABI an installer
//! should use and installs or sizes that ABI's libraries:
//!
//! - [`classify`] decides whether an entry name is a native library
//! - [`NativeLibraries`] iterates the accepted entries of an archive
//! - [`find_supported_abi`] picks the best ABI from a preference list
//! - [`copy_native_binaries`] and [`sum_native_binaries`] materialize or
//!   measure one ABI
//! - [`has_renderscript_bitcode`] looks for `.bc` entries

mod abi;
mod bitcode;
mod classify;
mod copy;
mod filename;
mod iter;

pub use abi::{AbiMatch, AbiResolver, abi_code, find_supported_abi};
pub use bitcode::{RS_BITCODE_SUFFIX, has_renderscript_bitcode};
pub use classify::{APK_LIB, GDBSERVER, LIB_PREFIX, LIB_SUFFIX, NativeEntryName, classify};
pub use copy::{
    LIBRARY_MODE, copy_file_if_changed, copy_native_binaries, for_each_native_library,
    is_file_different, sum_native_binaries,
};
pub use filename::is_filename_safe;
pub use iter::{NativeLibraries, NativeLibrary};
