//! Selective extraction of scene archives.
//!
//! Archive services deliver one compressed tar bundle per scene; only the
//! members matching the requested band file names are unpacked.

use std::collections::HashSet;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use bzip2::read::BzDecoder;
use flate2::read::GzDecoder;
use tracing::debug;

use crate::error::{Error, Result};

fn read_error(path: &Path, source: io::Error) -> Error {
    Error::ArchiveRead {
        path: path.to_path_buf(),
        source,
    }
}

/// Opens the archive with a decoder matching its file name.
fn open_reader(path: &Path) -> Result<Box<dyn Read>> {
    let file = File::open(path).map_err(|source| read_error(path, source))?;
    let name = path.file_name().and_then(|name| name.to_str()).unwrap_or_default();

    if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
        Ok(Box::new(GzDecoder::new(file)))
    } else if name.ends_with(".tar.bz") || name.ends_with(".tar.bz2") || name.ends_with(".tbz") {
        Ok(Box::new(BzDecoder::new(file)))
    } else if name.ends_with(".tar") {
        Ok(Box::new(file))
    } else {
        Err(read_error(
            path,
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("unrecognized archive extension: {name}"),
            ),
        ))
    }
}

/// Extracts the members of `archive_path` whose file names appear in
/// `wanted` into `destination`, returning the extracted paths in
/// archive-enumeration order. Members outside the wanted set are skipped.
pub fn extract_members(
    archive_path: &Path,
    destination: &Path,
    wanted: &HashSet<String>,
) -> Result<Vec<PathBuf>> {
    let mut tar = tar::Archive::new(open_reader(archive_path)?);
    let entries = tar
        .entries()
        .map_err(|source| read_error(archive_path, source))?;

    let mut extracted = Vec::new();
    for entry in entries {
        let mut entry = entry.map_err(|source| read_error(archive_path, source))?;
        let name = {
            let member_path = entry.path().map_err(|source| read_error(archive_path, source))?;
            member_path
                .file_name()
                .and_then(|name| name.to_str())
                .map(str::to_string)
        };
        let Some(name) = name else { continue };
        if !wanted.contains(&name) {
            debug!("skipping archive member {name}");
            continue;
        }

        let target = destination.join(&name);
        entry
            .unpack(&target)
            .map_err(|source| read_error(archive_path, source))?;
        extracted.push(target);
    }

    Ok(extracted)
}
