//! Helpers for assembling remote object urls and local download folders.

use std::fs;
use std::path::{Path, PathBuf};

use url::Url;

use crate::error::{Error, Result};

/// Removes slashes from the beginning and end of a segment.
pub fn trim_slashes(segment: &str) -> &str {
    segment.trim_matches('/')
}

/// Joins segments with a single `/`, normalizing leading and trailing
/// slashes so repeated joins never double or drop separators.
pub fn join(segments: &[&str]) -> String {
    segments
        .iter()
        .map(|segment| trim_slashes(segment))
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Checks whether a folder exists, creating it (and its parents) if not.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Default relative product path for an identifier: slashes are replaced so
/// the result is a single directory name.
pub fn default_relative_path(identifier: &str) -> PathBuf {
    PathBuf::from(trim_slashes(identifier).replace('/', "_"))
}

/// Derives the local file name for a remote object from its url, dropping
/// any query parameters.
pub fn filename_from_url(raw: &str) -> Result<String> {
    let parsed =
        Url::parse(raw).map_err(|err| Error::InvalidArgument(format!("malformed url {raw}: {err}")))?;
    let name = parsed
        .path_segments()
        .and_then(|segments| segments.last())
        .filter(|segment| !segment.is_empty())
        .ok_or_else(|| Error::InvalidArgument(format!("url has no file name: {raw}")))?;
    Ok(name.to_string())
}
