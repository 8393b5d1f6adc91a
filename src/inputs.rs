// Turns the `--path` argument into the list of files to process: a single
// image, every image directly inside a directory, or the paths listed in a
// `.txt` file (one per line).

use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::error::InputError;

pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp"];

pub fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| IMAGE_EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known)))
        .unwrap_or(false)
}

fn is_list_file(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("txt"))
        .unwrap_or(false)
}

pub fn resolve(input: &Path) -> Result<Vec<PathBuf>, InputError> {
    if !input.exists() {
        return Err(InputError::NotFound(input.to_path_buf()));
    }

    let files = if input.is_dir() {
        from_dir(input)?
    } else if is_list_file(input) {
        from_list(input)?
    } else if is_image(input) {
        vec![input.to_path_buf()]
    } else {
        Vec::new()
    };

    if files.is_empty() {
        return Err(InputError::NothingFound(input.to_path_buf()));
    }
    Ok(files)
}

fn from_dir(dir: &Path) -> Result<Vec<PathBuf>, InputError> {
    let read_err = |source: std::io::Error| InputError::Read {
        path: dir.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(read_err)? {
        let path = entry.map_err(read_err)?.path();
        if path.is_file() && is_image(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn from_list(list: &Path) -> Result<Vec<PathBuf>, InputError> {
    let content = fs::read_to_string(list).map_err(|source| InputError::Read {
        path: list.to_path_buf(),
        source,
    })?;

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| {
            let path = PathBuf::from(line);
            if path.is_file() {
                Some(path)
            } else {
                warn!(path = line, "Listed path does not exist, skipping");
                None
            }
        })
        .collect())
}
