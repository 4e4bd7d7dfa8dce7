//! Shared fetch flows used by the mission download loops.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::archive;
use crate::error::{Error, Result};
use crate::store::RemoteStore;
use crate::urls;

/// Fetches a set of individually addressable objects into `folder`.
///
/// Every object is probed before any transfer starts, so a scene that is
/// only partially present on a service fails before the first byte is
/// downloaded.
pub(crate) async fn fetch_flat_objects<S: RemoteStore>(
    store: &S,
    object_urls: &[String],
    folder: &Path,
) -> Result<Vec<PathBuf>> {
    for url in object_urls {
        if !store.exists(url).await? {
            return Err(Error::MissingRemoteFile(url.clone()));
        }
    }

    urls::ensure_dir(folder)?;
    let mut files = Vec::with_capacity(object_urls.len());
    for url in object_urls {
        files.push(store.fetch(url, folder).await?);
    }
    Ok(files)
}

/// Fetches a scene bundle into a scoped staging directory and extracts the
/// wanted members into `folder`. The staging directory is removed on every
/// exit path when it drops.
pub(crate) async fn fetch_archive_members<S: RemoteStore>(
    store: &S,
    archive_url: &str,
    folder: &Path,
    wanted: &HashSet<String>,
) -> Result<Vec<PathBuf>> {
    let staging = tempfile::Builder::new().prefix("scene-fetch").tempdir()?;
    debug!("staging archive in {}", staging.path().display());

    let bundle = store.fetch(archive_url, staging.path()).await?;
    urls::ensure_dir(folder)?;
    archive::extract_members(&bundle, folder, wanted)
}
