use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid scene identifier: {0}")]
    InvalidSceneId(String),

    #[error("invalid band id: {0}")]
    InvalidBandId(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Consumed by the download loop to advance to the next service in the
    /// chain; callers only see it from direct per-service calls.
    #[error("remote file is not available: {0}")]
    MissingRemoteFile(String),

    #[error("{0} - service designator is not supported")]
    UnsupportedService(String),

    #[error("{scene} is not available on any configured service")]
    SceneUnavailable { scene: String },

    #[error("inventory access failed: {0}")]
    InventoryAccess(String),

    #[error("network error while reaching {url}: {reason}")]
    Network { url: String, reason: String },

    #[error("unable to read archive {}", path.display())]
    ArchiveRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unknown scene: {0}")]
    UnknownScene(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    pub(crate) fn network(url: &str, reason: impl std::fmt::Display) -> Self {
        Self::Network {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }
}
