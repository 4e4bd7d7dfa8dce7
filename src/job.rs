//! TOML description of a download job.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::band::BandRequest;
use crate::error::{Error, Result};

#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Mission {
    Landsat8,
    Sentinel2,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct UsgsLogin {
    pub username: String,
    pub password: String,
}

/// A band request as written in the job file: a number or a name.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum BandEntry {
    Id(u8),
    Name(String),
}

impl From<&BandEntry> for BandRequest {
    fn from(entry: &BandEntry) -> Self {
        match entry {
            BandEntry::Id(id) => BandRequest::Id(*id),
            BandEntry::Name(name) => BandRequest::Name(name.clone()),
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct DownloadJob {
    pub id: String,
    pub mission: Mission,
    pub download_dir: PathBuf,
    pub scenes: Vec<String>,
    #[serde(default)]
    pub bands: Vec<BandEntry>,
    #[serde(default = "default_services")]
    pub services: Vec<String>,
    pub usgs: Option<UsgsLogin>,
}

fn default_services() -> Vec<String> {
    vec!["amazon".to_string(), "gcloud".to_string(), "usgs".to_string()]
}

impl DownloadJob {
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let job: Self = toml::from_str(&content)
            .map_err(|err| Error::InvalidArgument(format!("unable to parse job file: {err}")))?;
        Ok(job)
    }

    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|err| Error::InvalidArgument(format!("unable to serialize job: {err}")))?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn from_template(table: &toml::Table) -> Self {
        let job: Self = toml::from_str(&table.to_string()).expect("Error serializing template");
        job
    }

    pub fn band_requests(&self) -> Vec<BandRequest> {
        self.bands.iter().map(BandRequest::from).collect()
    }
}

/// Starter job covering the common true-color request.
pub fn job_template() -> toml::Table {
    toml::toml! {
        id = "landsat8.true-color"

        mission = "landsat8"

        download_dir = "./downloads"

        scenes = [
            "LC80030172015001LGN00",
            "LC82050312015136LGN00",
        ]

        bands = ["red", "green", "blue"]

        services = ["amazon", "gcloud", "usgs"]
    }
}
