//! Sentinel-2 tile resolution and download.
//!
//! Two id encodings are accepted: the legacy short form
//! `S2A_tile_20160530_56WNV_0` and the versioned long form
//! `S2A_OPER_MSI_L1C_TL_SGS__20160325T150955_A003951_T34RCS_N02.01`. Both
//! resolve to the bucket's tile layout
//! `tiles/{utm}/{lat}/{square}/{year}/{month}/{day}/{sequence}`; an id that
//! already looks like a tile path is passed through unchanged.

use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use regex::Regex;
use tracing::info;

use crate::band::{self, Band, BandRequest, BandSet};
use crate::download;
use crate::error::{Error, Result};
use crate::scene::Scenes;
use crate::store::RemoteStore;
use crate::urls;

pub const S3_SENTINEL: &str = "https://sentinel-s2-l1c.s3.amazonaws.com";
pub const S3_SENTINEL_REGION: &str = "eu-central-1";

/// Structured form of a tile location and acquisition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileDescriptor {
    pub utm_zone: u32,
    pub latitude_band: char,
    pub grid_square: String,
    pub date: NaiveDate,
    pub sequence: u32,
}

impl TileDescriptor {
    /// Parses a product/tile id in either encoding.
    pub fn from_scene_id(id: &str) -> Result<Self> {
        let invalid = || Error::InvalidSceneId(id.to_string());
        let tokens: Vec<&str> = id.split('_').collect();

        if tokens.len() > 5 {
            // Versioned long form: acquisition timestamp, MGRS designator
            // and processing version sit at fixed offsets from the end.
            let version: u32 = tokens[tokens.len() - 1]
                .split('.')
                .next_back()
                .and_then(|token| token.parse().ok())
                .ok_or_else(invalid)?;
            let sequence = version.checked_sub(1).ok_or_else(invalid)?;

            let date = NaiveDateTime::parse_from_str(tokens[tokens.len() - 4], "%Y%m%dT%H%M%S")
                .map_err(|_| invalid())?
                .date();

            let mgrs = tokens[tokens.len() - 2];
            if mgrs.len() < 6 || !mgrs.is_ascii() {
                return Err(invalid());
            }
            let utm_zone = mgrs[1..3].parse().map_err(|_| invalid())?;
            let latitude_band = mgrs.as_bytes()[3] as char;
            let grid_square = mgrs[4..6].to_string();

            Ok(Self {
                utm_zone,
                latitude_band,
                grid_square,
                date,
                sequence,
            })
        } else if tokens.len() == 5 {
            // Legacy short form: date and grid designator in the middle,
            // sequence at the end.
            let sequence = tokens[4].parse().map_err(|_| invalid())?;
            let date =
                NaiveDate::parse_from_str(tokens[2], "%Y%m%d").map_err(|_| invalid())?;

            let grid = Regex::new(r"^(?<utm>\d+)(?<lat>[A-Z])(?<square>[A-Z]{2})$")
                .expect("regex pattern should always compile");
            let captures = grid.captures(tokens[3]).ok_or_else(invalid)?;

            Ok(Self {
                utm_zone: captures["utm"].parse().map_err(|_| invalid())?,
                latitude_band: captures["lat"].chars().next().ok_or_else(invalid)?,
                grid_square: captures["square"].to_string(),
                date,
                sequence,
            })
        } else {
            Err(invalid())
        }
    }

    /// Parses a tile path back into its components.
    pub fn from_tile_path(path: &str) -> Result<Self> {
        let invalid = || Error::InvalidSceneId(path.to_string());
        let re = Regex::new(
            r"^tiles/(?<utm>\d{1,2})/(?<lat>[A-Z])/(?<square>[A-Z]{2})/(?<year>\d{4})/(?<month>\d{1,2})/(?<day>\d{1,2})/(?<sequence>\d+)$",
        )
        .expect("regex pattern should always compile");
        let captures = re.captures(urls::trim_slashes(path)).ok_or_else(invalid)?;

        let date = NaiveDate::from_ymd_opt(
            captures["year"].parse().map_err(|_| invalid())?,
            captures["month"].parse().map_err(|_| invalid())?,
            captures["day"].parse().map_err(|_| invalid())?,
        )
        .ok_or_else(invalid)?;

        Ok(Self {
            utm_zone: captures["utm"].parse().map_err(|_| invalid())?,
            latitude_band: captures["lat"].chars().next().ok_or_else(invalid)?,
            grid_square: captures["square"].to_string(),
            date,
            sequence: captures["sequence"].parse().map_err(|_| invalid())?,
        })
    }

    /// Bucket path of the tile, month and day unpadded.
    pub fn tile_path(&self) -> String {
        format!(
            "tiles/{}/{}/{}/{}/{}/{}/{}",
            self.utm_zone,
            self.latitude_band,
            self.grid_square,
            self.date.year(),
            self.date.month(),
            self.date.day(),
            self.sequence
        )
    }
}

/// Resolves an id to its bucket tile path. Ids that already carry a path
/// separator or the tile prefix are taken as resolved.
pub fn resolve_tile_path(scene: &str) -> Result<String> {
    if scene.contains('/') || scene.contains("tiles") {
        return Ok(urls::trim_slashes(scene).to_string());
    }
    Ok(TileDescriptor::from_scene_id(scene)?.tile_path())
}

pub fn band_by_name(name: &str) -> Option<Band> {
    match name {
        "coastal" => Some(Band::Index(1)),
        "blue" => Some(Band::Index(2)),
        "green" => Some(Band::Index(3)),
        "red" => Some(Band::Index(4)),
        "nir" => Some(Band::Index(8)),
        "swir1" => Some(Band::Index(11)),
        "swir2" => Some(Band::Index(12)),
        _ => None,
    }
}

/// File name of one band object inside a tile prefix.
pub fn band_filename(band: &Band) -> Result<String> {
    match band {
        Band::Index(id) if (1..=12).contains(id) => Ok(format!("B{id:02}.jp2")),
        Band::Name(name) if name == "8A" => Ok("B8A.jp2".to_string()),
        other => Err(Error::InvalidBandId(other.to_string())),
    }
}

pub fn amazon_s3_url(tile_path: &str, band: &Band) -> Result<String> {
    Ok(urls::join(&[S3_SENTINEL, tile_path, &band_filename(band)?]))
}

type RelativePathFn = Box<dyn Fn(&TileDescriptor) -> PathBuf + Send + Sync>;

/// Sentinel-2 downloader over an object store. All data comes from the
/// single flat-object bucket, so there is no service chain to walk.
pub struct Sentinel2<S> {
    download_dir: PathBuf,
    store: S,
    relative_path: Option<RelativePathFn>,
}

impl<S: RemoteStore> Sentinel2<S> {
    pub fn new(download_dir: impl AsRef<Path>, store: S) -> Result<Self> {
        let download_dir = download_dir.as_ref().to_path_buf();
        urls::ensure_dir(&download_dir)?;
        Ok(Self {
            download_dir,
            store,
            relative_path: None,
        })
    }

    /// Overrides where a tile's files land below the download directory.
    pub fn with_relative_path_builder<F>(mut self, builder: F) -> Self
    where
        F: Fn(&TileDescriptor) -> PathBuf + Send + Sync + 'static,
    {
        self.relative_path = Some(Box::new(builder));
        self
    }

    fn product_folder(&self, tile_path: &str) -> Result<PathBuf> {
        let relative = match &self.relative_path {
            Some(build) => build(&TileDescriptor::from_tile_path(tile_path)?),
            None => urls::default_relative_path(tile_path),
        };
        Ok(self.download_dir.join(relative))
    }

    pub async fn download(&self, scenes: &[String], bands: &[BandRequest]) -> Result<Scenes> {
        let bands = band::normalize(bands, band_by_name);
        if bands.is_empty() {
            return Err(Error::InvalidArgument(
                "at least one band must be requested".to_string(),
            ));
        }
        self.amazon(scenes, &bands).await
    }

    /// AWS S3 downloader: per-band flat objects below the tile prefix.
    pub async fn amazon(&self, scenes: &[String], bands: &BandSet) -> Result<Scenes> {
        let mut collected = Scenes::new();
        info!("source: AWS S3");

        for scene_id in scenes {
            let tile_path = resolve_tile_path(scene_id)?;

            let mut object_urls = Vec::with_capacity(bands.len());
            for band in bands {
                object_urls.push(amazon_s3_url(&tile_path, band)?);
            }

            let folder = self.product_folder(&tile_path)?;
            let files = download::fetch_flat_objects(&self.store, &object_urls, &folder).await?;
            collected.add_with_files(scene_id, files);
        }

        Ok(collected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing::FakeStore;

    const LONG_ID: &str = "S2A_OPER_MSI_L1C_TL_SGS__20160325T150955_A003951_T34RCS_N02.01";
    const SHORT_ID: &str = "S2A_tile_20160530_56WNV_0";

    #[test]
    fn long_form_resolves_to_tile_path() {
        assert_eq!(
            resolve_tile_path(LONG_ID).unwrap(),
            "tiles/34/R/CS/2016/3/25/0"
        );
        assert_eq!(
            resolve_tile_path("S2A_OPER_MSI_L1C_TL_SGS__20160530T030406_A004890_T56WNV_N01.01")
                .unwrap(),
            "tiles/56/W/NV/2016/5/30/0"
        );
    }

    #[test]
    fn short_form_resolves_to_tile_path() {
        assert_eq!(
            resolve_tile_path(SHORT_ID).unwrap(),
            "tiles/56/W/NV/2016/5/30/0"
        );
        assert_eq!(
            resolve_tile_path("S2A_tile_20160526_1VCH_0").unwrap(),
            "tiles/1/V/CH/2016/5/26/0"
        );
    }

    #[test]
    fn resolved_paths_pass_through() {
        assert_eq!(
            resolve_tile_path("tiles/34/R/CS/2016/3/25/0").unwrap(),
            "tiles/34/R/CS/2016/3/25/0"
        );
    }

    #[test]
    fn malformed_ids_are_rejected() {
        let id = "S2A_OPER_MSI_L1C_TL_SGS__20160325T150955_A003951_T34RCS_N02.what";
        assert!(matches!(
            resolve_tile_path(id),
            Err(Error::InvalidSceneId(_))
        ));
        assert!(matches!(
            resolve_tile_path("S2A_tile_20161425_56WNV_0"),
            Err(Error::InvalidSceneId(_))
        ));
    }

    #[test]
    fn tile_path_parses_back_into_components() {
        let tile = TileDescriptor::from_tile_path("tiles/56/W/NV/2016/5/30/0").unwrap();
        assert_eq!(tile.utm_zone, 56);
        assert_eq!(tile.latitude_band, 'W');
        assert_eq!(tile.grid_square, "NV");
        assert_eq!(tile.date, NaiveDate::from_ymd_opt(2016, 5, 30).unwrap());
        assert_eq!(tile.sequence, 0);
        assert_eq!(tile.tile_path(), "tiles/56/W/NV/2016/5/30/0");

        assert!(TileDescriptor::from_tile_path("56/W/NV/2016/5/30/0").is_err());
    }

    #[test]
    fn band_urls_are_zero_padded() {
        let path = resolve_tile_path(LONG_ID).unwrap();
        let url = amazon_s3_url(&path, &Band::Index(11)).unwrap();
        assert!(url.contains("tiles/34/R/CS/2016/3/25/0/B11.jp2"));

        let url = amazon_s3_url(&path, &Band::Index(4)).unwrap();
        assert!(url.contains("tiles/34/R/CS/2016/3/25/0/B04.jp2"));

        let url = amazon_s3_url(&path, &Band::Name("8A".to_string())).unwrap();
        assert!(url.contains("tiles/34/R/CS/2016/3/25/0/B8A.jp2"));
    }

    #[test]
    fn out_of_range_bands_are_rejected() {
        assert!(matches!(
            band_filename(&Band::Index(13)),
            Err(Error::InvalidBandId(_))
        ));
        assert!(matches!(
            band_filename(&Band::Quality),
            Err(Error::InvalidBandId(_))
        ));
    }

    fn seed_tile(store: &mut FakeStore, scene: &str, bands: &BandSet) {
        let path = resolve_tile_path(scene).unwrap();
        for band in bands {
            store.insert(&amazon_s3_url(&path, band).unwrap(), b"imagery".to_vec());
        }
    }

    #[tokio::test]
    async fn downloads_requested_bands_per_scene() {
        let scenes = vec![LONG_ID.to_string(), SHORT_ID.to_string()];
        let bands = band::normalize(
            &["red".into(), "green".into(), "blue".into()],
            band_by_name,
        );
        let mut store = FakeStore::new();
        for scene in &scenes {
            seed_tile(&mut store, scene, &bands);
        }

        let dir = tempfile::tempdir().unwrap();
        let mission = Sentinel2::new(dir.path(), store).unwrap();
        let results = mission
            .download(&scenes, &["red".into(), "green".into(), "blue".into()])
            .await
            .unwrap();

        assert_eq!(results.names(), vec![LONG_ID, SHORT_ID]);
        let total: usize = results.iter().map(|scene| scene.files().len()).sum();
        assert_eq!(total, scenes.len() * 3);
        for file in results.by_name(SHORT_ID).unwrap().files() {
            assert!(file.starts_with(dir.path().join("tiles_56_W_NV_2016_5_30_0")));
            assert!(file.exists());
        }
    }

    #[tokio::test]
    async fn accepts_already_resolved_tile_paths() {
        let paths = vec![
            "tiles/34/R/CS/2016/3/25/0".to_string(),
            "tiles/37/T/BG/2016/3/20/0".to_string(),
        ];
        let bands = band::normalize(&[4.into(), 3.into(), 2.into()], band_by_name);
        let mut store = FakeStore::new();
        for path in &paths {
            seed_tile(&mut store, path, &bands);
        }

        let dir = tempfile::tempdir().unwrap();
        let mission = Sentinel2::new(dir.path(), store).unwrap();
        let results = mission
            .download(&paths, &[4.into(), 3.into(), 2.into()])
            .await
            .unwrap();

        let total: usize = results.iter().map(|scene| scene.files().len()).sum();
        assert_eq!(total, paths.len() * 3);
    }

    #[tokio::test]
    async fn relative_path_builder_sees_parsed_components() {
        let scenes = vec![
            "tiles/37/T/BG/2016/3/20/0".to_string(),
            "S2A_OPER_MSI_L1C_TL_SGS__20160320T140936_A003879_T37TBG_N02.01".to_string(),
        ];
        let bands = band::normalize(&[4.into(), 3.into(), 2.into()], band_by_name);
        let mut store = FakeStore::new();
        for scene in &scenes {
            seed_tile(&mut store, scene, &bands);
        }

        let dir = tempfile::tempdir().unwrap();
        let mission = Sentinel2::new(dir.path(), store)
            .unwrap()
            .with_relative_path_builder(|tile: &TileDescriptor| {
                PathBuf::from("test")
                    .join(tile.utm_zone.to_string())
                    .join(tile.latitude_band.to_string())
                    .join(&tile.grid_square)
                    .join(tile.date.to_string())
                    .join(tile.sequence.to_string())
            });
        let results = mission
            .download(&scenes, &[4.into(), 3.into(), 2.into()])
            .await
            .unwrap();

        let expected = dir
            .path()
            .join("test/37/T/BG/2016-03-20/0");
        for scene in &results {
            for file in scene.files() {
                assert!(file.starts_with(&expected));
            }
        }
    }

    #[tokio::test]
    async fn empty_band_requests_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mission = Sentinel2::new(dir.path(), FakeStore::new()).unwrap();
        let err = mission
            .download(&["tiles/34/R/CS/2016/3/25/0".to_string()], &[])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn missing_band_object_fails_before_any_fetch() {
        let bands = band::normalize(&[4.into(), 3.into()], band_by_name);
        let mut store = FakeStore::new();
        let path = "tiles/34/R/CS/2016/3/25/0";
        // Only one of the two band objects is present.
        store.insert(
            &amazon_s3_url(path, bands.iter().next().unwrap()).unwrap(),
            b"imagery".to_vec(),
        );

        let dir = tempfile::tempdir().unwrap();
        let mission = Sentinel2::new(dir.path(), store).unwrap();
        let err = mission
            .download(&[path.to_string()], &[4.into(), 3.into()])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MissingRemoteFile(_)));

        // Fail-fast probing: nothing was written.
        assert!(!dir.path().join("tiles_34_R_CS_2016_3_25_0").exists());
    }
}
