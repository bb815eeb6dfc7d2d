use crate::io::ReadAt;
use crate::zip::ZipArchive;
use crate::{Error, Result};

use super::filename::is_filename_safe;

pub const RS_BITCODE_SUFFIX: &str = ".bc";

/// Whether the archive carries RenderScript bitcode anywhere.
///
/// Any entry whose name ends in `.bc` with a safe file name counts; stops at
/// the first one.
pub fn has_renderscript_bitcode<R>(archive: &ZipArchive<R>) -> Result<bool>
where
    R: ReadAt + ?Sized,
{
    let mut cursor = archive.start_iteration().map_err(Error::InvalidArchive)?;
    Ok(cursor.any(|entry| {
        let Some(name) = entry.name() else {
            return false;
        };
        let base_name = name.rsplit('/').next().unwrap_or(name);
        name.ends_with(RS_BITCODE_SUFFIX) && is_filename_safe(base_name)
    }))
}
