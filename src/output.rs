// Where compressed bytes end up on disk.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::Builder;

use crate::error::OutputError;

/// How the destination filename is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputNaming {
    /// Last path segment of the download URL.
    #[default]
    ServerAssigned,
    /// `<stem>_compressed.<ext>` next to (or named after) the source.
    Suffixed,
    /// Replace the source file in place.
    Overwrite,
}

/// Directory the output goes to: the output folder when given, otherwise
/// the source's own directory.
pub fn destination_dir(source: &Path, output_dir: Option<&Path>) -> PathBuf {
    match output_dir {
        Some(dir) => dir.to_path_buf(),
        None => match source.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        },
    }
}

pub fn suffixed_name(source: &Path) -> Result<String, OutputError> {
    let stem = source
        .file_stem()
        .ok_or_else(|| OutputError::NoFileName(source.to_path_buf()))?
        .to_string_lossy();
    Ok(match source.extension() {
        Some(ext) => format!("{}_compressed.{}", stem, ext.to_string_lossy()),
        None => format!("{}_compressed", stem),
    })
}

/// Last non-empty path segment of `url`, if it is a plain file name.
pub fn server_name(url: &str) -> Option<String> {
    let parsed = reqwest::Url::parse(url).ok()?;
    let segment = parsed.path_segments()?.filter(|s| !s.is_empty()).last()?;
    if segment == "." || segment == ".." || segment.contains('\\') {
        return None;
    }
    Some(segment.to_string())
}

pub fn destination(
    source: &Path,
    output_dir: Option<&Path>,
    naming: OutputNaming,
    output_url: &str,
) -> Result<PathBuf, OutputError> {
    let name = match naming {
        OutputNaming::Overwrite => return Ok(source.to_path_buf()),
        OutputNaming::ServerAssigned => match server_name(output_url) {
            Some(name) => name,
            None => suffixed_name(source)?,
        },
        OutputNaming::Suffixed => suffixed_name(source)?,
    };
    Ok(destination_dir(source, output_dir).join(name))
}

/// Write through a temp file in the destination directory and rename it
/// over `dest`, so a failed write leaves any existing file untouched. An
/// existing destination keeps its permissions; a new one gets the usual
/// umask-derived mode.
pub fn write_output(dest: &Path, bytes: &[u8]) -> Result<(), OutputError> {
    let dir = match dest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir).map_err(|source| OutputError::CreateDir {
        path: dir.clone(),
        source,
    })?;

    let write_err = |source: std::io::Error| OutputError::Write {
        path: dest.to_path_buf(),
        source,
    };
    let mut builder = Builder::new();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(fs::Permissions::from_mode(0o666));
    }
    let mut tmp = builder.tempfile_in(&dir).map_err(write_err)?;
    if let Ok(meta) = fs::metadata(dest) {
        tmp.as_file()
            .set_permissions(meta.permissions())
            .map_err(write_err)?;
    }
    tmp.write_all(bytes).map_err(write_err)?;
    tmp.persist(dest).map_err(|e| write_err(e.error))?;
    Ok(())
}
