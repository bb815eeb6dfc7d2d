use std::path::PathBuf;

use crate::status::InstallStatus;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid archive: {0:#}")]
    InvalidArchive(anyhow::Error),

    #[error("entry '{name}' is not in the archive")]
    EntryNotFound { name: String },

    #[error("path for '{name}' under '{dir}' exceeds PATH_MAX")]
    PathTooLong { name: String, dir: PathBuf },

    #[error("couldn't extract '{name}' to '{path}': {cause:#}")]
    Container {
        name: String,
        path: PathBuf,
        cause: anyhow::Error,
    },
}

impl Error {
    /// The install code this error is reported as.
    pub fn status(&self) -> InstallStatus {
        match self {
            Error::InvalidArchive(_) | Error::EntryNotFound { .. } => InstallStatus::InvalidApk,
            Error::PathTooLong { .. } => InstallStatus::InternalError,
            Error::Container { .. } => InstallStatus::ContainerError,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
