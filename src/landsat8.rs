//! Landsat-8 scene resolution and download.
//!
//! Scene ids are fixed-width 21-character codes such as
//! `LC80030172015001LGN00`: the WRS-2 path sits at offsets 3..6, the row at
//! 6..9, the sensor letter at 1 and the platform number at 2. The AWS
//! bucket serves per-band GeoTIFF objects, Google Storage and the USGS
//! inventory serve one compressed bundle per scene.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::band::{self, Band, BandRequest, BandSet};
use crate::download;
use crate::error::{Error, Result};
use crate::inventory::InventoryService;
use crate::scene::Scenes;
use crate::service::{Service, ServiceChain};
use crate::store::RemoteStore;
use crate::urls;

pub const S3_LANDSAT: &str = "https://landsat-pds.s3.amazonaws.com";
pub const GOOGLE_LANDSAT: &str = "https://storage.googleapis.com/earthengine-public/landsat";

const SCENE_ID_LENGTH: usize = 21;
const USGS_DATASET: &str = "LANDSAT_8";
const USGS_NODE: &str = "EE";

/// Structured form of a fixed-width Landsat scene id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LandsatScene {
    pub path: String,
    pub row: String,
    pub sensor: char,
    pub platform: String,
    pub id: String,
}

impl LandsatScene {
    pub fn parse(id: &str) -> Result<Self> {
        if id.len() != SCENE_ID_LENGTH || !id.is_ascii() {
            return Err(Error::InvalidSceneId(id.to_string()));
        }

        let path = &id[3..6];
        let row = &id[6..9];
        if !path.bytes().all(|b| b.is_ascii_digit()) || !row.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::InvalidSceneId(id.to_string()));
        }

        Ok(Self {
            path: path.to_string(),
            row: row.to_string(),
            sensor: id.as_bytes()[1] as char,
            platform: format!("L{}", &id[2..3]),
            id: id.to_string(),
        })
    }
}

/// File name of one band object inside a scene, shared by the flat bucket
/// layout and the bundle members.
pub fn band_filename(scene_id: &str, band: &Band) -> Result<String> {
    match band {
        Band::Index(id) if (1..=11).contains(id) => Ok(format!("{scene_id}_B{id}.TIF")),
        Band::Quality => Ok(format!("{scene_id}_BQA.TIF")),
        Band::Metadata => Ok(format!("{scene_id}_MTL.txt")),
        other => Err(Error::InvalidBandId(other.to_string())),
    }
}

pub fn amazon_s3_url(scene: &LandsatScene, band: &Band) -> Result<String> {
    let filename = band_filename(&scene.id, band)?;
    Ok(urls::join(&[
        S3_LANDSAT,
        &scene.platform,
        &scene.path,
        &scene.row,
        &scene.id,
        &filename,
    ]))
}

pub fn google_storage_url(scene: &LandsatScene) -> String {
    urls::join(&[
        GOOGLE_LANDSAT,
        &scene.platform,
        &scene.path,
        &scene.row,
        &format!("{}.tar.bz", scene.id),
    ])
}

pub fn band_by_name(name: &str) -> Option<Band> {
    match name {
        "coastal" => Some(Band::Index(1)),
        "blue" => Some(Band::Index(2)),
        "green" => Some(Band::Index(3)),
        "red" => Some(Band::Index(4)),
        "nir" => Some(Band::Index(5)),
        "swir1" => Some(Band::Index(6)),
        "swir2" => Some(Band::Index(7)),
        "pan" => Some(Band::Index(8)),
        "cirrus" => Some(Band::Index(9)),
        "quality" | "QA" => Some(Band::Quality),
        "metadata" | "MTL" => Some(Band::Metadata),
        _ => None,
    }
}

/// Companions grabbed with every scene, whatever the caller asked for.
pub fn default_bands() -> BandSet {
    [Band::Quality, Band::Metadata].into_iter().collect()
}

pub fn effective_bands(requested: &[BandRequest]) -> BandSet {
    let mut bands = default_bands();
    bands.extend(band::normalize(requested, band_by_name));
    bands
}

fn band_filenames(scene_id: &str, bands: &BandSet) -> Result<HashSet<String>> {
    bands
        .iter()
        .map(|band| band_filename(scene_id, band))
        .collect()
}

pub struct Credentials {
    pub username: String,
    pub password: String,
}

type RelativePathFn = Box<dyn Fn(&LandsatScene) -> PathBuf + Send + Sync>;

/// Landsat-8 downloader over an object store and an inventory service.
pub struct Landsat8<S, I> {
    download_dir: PathBuf,
    store: S,
    inventory: I,
    credentials: Option<Credentials>,
    relative_path: Option<RelativePathFn>,
}

impl<S: RemoteStore, I: InventoryService> Landsat8<S, I> {
    pub fn new(download_dir: impl AsRef<Path>, store: S, inventory: I) -> Result<Self> {
        let download_dir = download_dir.as_ref().to_path_buf();
        urls::ensure_dir(&download_dir)?;
        Ok(Self {
            download_dir,
            store,
            inventory,
            credentials: None,
            relative_path: None,
        })
    }

    /// Inventory credentials; without them the USGS service is skipped.
    pub fn with_credentials(mut self, username: &str, password: &str) -> Self {
        self.credentials = Some(Credentials {
            username: username.to_string(),
            password: password.to_string(),
        });
        self
    }

    /// Overrides where a scene's files land below the download directory.
    pub fn with_relative_path_builder<F>(mut self, builder: F) -> Self
    where
        F: Fn(&LandsatScene) -> PathBuf + Send + Sync + 'static,
    {
        self.relative_path = Some(Box::new(builder));
        self
    }

    fn product_folder(&self, scene: &LandsatScene) -> PathBuf {
        let relative = match &self.relative_path {
            Some(build) => build(scene),
            None => urls::default_relative_path(&scene.id),
        };
        self.download_dir.join(relative)
    }

    /// Downloads every scene through the service chain, in order, taking
    /// the first service that can deliver all requested bands. A service
    /// missing the scene advances the chain; any other failure aborts the
    /// whole call.
    pub async fn download(
        &self,
        scenes: &[String],
        bands: &[BandRequest],
        chain: &ServiceChain,
    ) -> Result<Scenes> {
        let bands = effective_bands(bands);
        let defaults = default_bands();
        let mut collected = Scenes::new();

        for scene in scenes {
            let mut resolved = false;
            for service in chain.iter() {
                // The per-band bucket has nothing to offer beyond the
                // metadata companions; let a bundle service deliver the
                // full scene instead.
                if service == Service::Amazon && bands == defaults {
                    debug!("no imagery bands requested, skipping {service} for {scene}");
                    continue;
                }

                let attempt = match service {
                    Service::Amazon => self.amazon(std::slice::from_ref(scene), &bands).await,
                    Service::GoogleCloud => self.google(std::slice::from_ref(scene), &bands).await,
                    Service::Usgs => self.usgs(std::slice::from_ref(scene), &bands).await,
                };

                match attempt {
                    Ok(partial) => {
                        collected.merge(partial);
                        resolved = true;
                        break;
                    }
                    Err(Error::MissingRemoteFile(reason)) => {
                        debug!("{service} cannot serve {scene}: {reason}");
                    }
                    Err(other) => return Err(other),
                }
            }

            if !resolved {
                return Err(Error::SceneUnavailable {
                    scene: scene.clone(),
                });
            }
        }

        Ok(collected)
    }

    /// AWS S3 downloader: per-band flat objects.
    pub async fn amazon(&self, scenes: &[String], bands: &BandSet) -> Result<Scenes> {
        let mut collected = Scenes::new();
        info!("source: AWS S3");

        for scene_id in scenes {
            let scene = LandsatScene::parse(scene_id)?;

            let mut object_urls = Vec::with_capacity(bands.len());
            for band in bands {
                object_urls.push(amazon_s3_url(&scene, band)?);
            }

            let folder = self.product_folder(&scene);
            let files = download::fetch_flat_objects(&self.store, &object_urls, &folder).await?;
            collected.add_with_files(scene_id, files);
        }

        Ok(collected)
    }

    /// Google Storage downloader: one bundle per scene, band members
    /// extracted locally.
    pub async fn google(&self, scenes: &[String], bands: &BandSet) -> Result<Scenes> {
        let mut collected = Scenes::new();
        info!("source: Google Storage");

        for scene_id in scenes {
            let scene = LandsatScene::parse(scene_id)?;
            let bundle_url = google_storage_url(&scene);
            if !self.store.exists(&bundle_url).await? {
                return Err(Error::MissingRemoteFile(bundle_url));
            }

            let wanted = band_filenames(scene_id, bands)?;
            let folder = self.product_folder(&scene);
            let files =
                download::fetch_archive_members(&self.store, &bundle_url, &folder, &wanted).await?;
            collected.add_with_files(scene_id, files);
        }

        Ok(collected)
    }

    /// USGS EarthExplorer downloader: bundle urls resolved through the
    /// authenticated inventory.
    pub async fn usgs(&self, scenes: &[String], bands: &BandSet) -> Result<Scenes> {
        let Some(credentials) = &self.credentials else {
            return Err(Error::MissingRemoteFile(format!(
                "{} requires inventory credentials",
                scenes.join(" - ")
            )));
        };

        let session = self
            .inventory
            .login(&credentials.username, &credentials.password)
            .await?;
        let mut collected = Scenes::new();
        info!("source: USGS EarthExplorer");

        for scene_id in scenes {
            let scene = LandsatScene::parse(scene_id)?;
            let bundle_urls = self
                .inventory
                .download_urls(USGS_DATASET, USGS_NODE, std::slice::from_ref(scene_id), &session)
                .await?;
            let Some(bundle_url) = bundle_urls.first() else {
                return Err(Error::MissingRemoteFile(format!(
                    "{scene_id} is not listed by the inventory"
                )));
            };

            let wanted = band_filenames(scene_id, bands)?;
            let folder = self.product_folder(&scene);
            let files =
                download::fetch_archive_members(&self.store, bundle_url, &folder, &wanted).await?;
            collected.add_with_files(scene_id, files);
        }

        Ok(collected)
    }
}
