//! Result codes shared by every operation of the helper.
//!
//! The integer values match the package manager's install codes, so a host
//! can hand them through unchanged.

use std::fmt;

/// Outcome of an install-side operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum InstallStatus {
    Succeeded = 1,
    InvalidApk = -2,
    InsufficientStorage = -4,
    ContainerError = -18,
    InternalError = -110,
    NoMatchingAbis = -113,
    NoNativeLibraries = -114,
}

impl InstallStatus {
    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn from_code(code: i32) -> Option<Self> {
        Some(match code {
            1 => Self::Succeeded,
            -2 => Self::InvalidApk,
            -4 => Self::InsufficientStorage,
            -18 => Self::ContainerError,
            -110 => Self::InternalError,
            -113 => Self::NoMatchingAbis,
            -114 => Self::NoNativeLibraries,
            _ => return None,
        })
    }

    /// Status of a finished operation.
    pub fn of<T>(result: &crate::Result<T>) -> Self {
        match result {
            Ok(_) => Self::Succeeded,
            Err(e) => e.status(),
        }
    }
}

impl fmt::Display for InstallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Succeeded => "INSTALL_SUCCEEDED",
            Self::InvalidApk => "INSTALL_FAILED_INVALID_APK",
            Self::InsufficientStorage => "INSTALL_FAILED_INSUFFICIENT_STORAGE",
            Self::ContainerError => "INSTALL_FAILED_CONTAINER_ERROR",
            Self::InternalError => "INSTALL_FAILED_INTERNAL_ERROR",
            Self::NoMatchingAbis => "INSTALL_FAILED_NO_MATCHING_ABIS",
            Self::NoNativeLibraries => "NO_NATIVE_LIBRARIES",
        };
        write!(f, "{} ({})", name, self.code())
    }
}

/// Result of looking for RenderScript bitcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum BitcodeScan {
    ScanError = -1,
    NotPresent = 0,
    Present = 1,
}

impl BitcodeScan {
    pub fn code(self) -> i32 {
        self as i32
    }
}

impl From<bool> for BitcodeScan {
    fn from(present: bool) -> Self {
        if present {
            Self::Present
        } else {
            Self::NotPresent
        }
    }
}
