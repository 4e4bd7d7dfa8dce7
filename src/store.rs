//! Remote object stores.
//!
//! Scene urls are opaque strings to the download loop; a [`RemoteStore`]
//! knows how to probe and fetch them. [`HttpStore`] talks plain HTTPS to
//! the public buckets, [`S3Store`] goes through the S3 API with anonymous
//! credentials for buckets that serve object-level requests.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::Client;
use futures_util::TryStreamExt;
use regex::Regex;
use tracing::info;

use crate::error::{Error, Result};
use crate::urls;

pub trait RemoteStore {
    /// Whether the remote object is present. Connectivity failures are
    /// errors; a missing object is `Ok(false)`.
    async fn exists(&self, url: &str) -> Result<bool>;

    /// Byte length of the remote object.
    async fn size(&self, url: &str) -> Result<u64>;

    /// Downloads the object into `folder`, skipping the transfer when a
    /// same-named local file already matches the remote size.
    async fn fetch(&self, url: &str, folder: &Path) -> Result<PathBuf>;
}

pub struct HttpStore {
    client: reqwest::Client,
}

impl HttpStore {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteStore for HttpStore {
    async fn exists(&self, url: &str) -> Result<bool> {
        let response = self
            .client
            .head(url)
            .send()
            .await
            .map_err(|err| Error::network(url, err))?;
        Ok(response.status().is_success())
    }

    async fn size(&self, url: &str) -> Result<u64> {
        let response = self
            .client
            .head(url)
            .send()
            .await
            .map_err(|err| Error::network(url, err))?;
        if !response.status().is_success() {
            return Err(Error::MissingRemoteFile(url.to_string()));
        }
        response
            .headers()
            .get(reqwest::header::CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse().ok())
            .ok_or_else(|| Error::network(url, "response carries no content-length"))
    }

    async fn fetch(&self, url: &str, folder: &Path) -> Result<PathBuf> {
        let filename = urls::filename_from_url(url)?;
        let target = folder.join(&filename);
        if target.exists() && fs::metadata(&target)?.len() == self.size(url).await? {
            info!("{filename} already exists on your system");
            return Ok(target);
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| Error::network(url, err))?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::MissingRemoteFile(url.to_string()));
        }
        if !response.status().is_success() {
            return Err(Error::network(
                url,
                format!("http status {}", response.status()),
            ));
        }

        let partial = folder.join(format!("{filename}.partial"));
        let mut file = File::create(&partial)?;
        let mut body = response.bytes_stream();
        while let Some(bytes) = body.try_next().await.map_err(|err| Error::network(url, err))? {
            file.write_all(&bytes)?;
        }
        fs::rename(&partial, &target)?;

        info!("stored at {}", target.display());
        Ok(target)
    }
}

/// Bucket, key and optional region decomposed from a virtual-hosted S3 url.
#[derive(Debug, PartialEq, Eq)]
pub struct S3Object {
    pub bucket: String,
    pub region: Option<String>,
    pub key: String,
}

impl S3Object {
    pub fn from_url(url: &str) -> Result<Self> {
        let re = Regex::new(
            r"^https?://(?<bucket>[\w-]+(?:\.[\w-]+)*?)\.s3(?:[.-](?<region>[\w-]+))?\.amazonaws\.com/(?<key>.+)$",
        )
        .expect("regex pattern should always compile");

        let captures = re
            .captures(url)
            .ok_or_else(|| Error::InvalidArgument(format!("not an s3 object url: {url}")))?;

        Ok(Self {
            bucket: captures["bucket"].to_string(),
            region: captures.name("region").map(|m| m.as_str().to_string()),
            key: captures["key"].to_string(),
        })
    }
}

pub struct S3Store {
    client: Client,
}

impl S3Store {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Client without credentials, for buckets that allow anonymous reads.
    pub async fn anonymous(region: &str) -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest())
            .no_credentials()
            .region(Region::new(region.to_string()))
            .load()
            .await;
        Self {
            client: Client::new(&config),
        }
    }

    async fn head_size(&self, object: &S3Object, url: &str) -> Result<u64> {
        let head = self
            .client
            .head_object()
            .bucket(&object.bucket)
            .key(&object.key)
            .send()
            .await
            .map_err(|err| Error::network(url, err))?;
        head.content_length()
            .map(|length| length as u64)
            .ok_or_else(|| Error::network(url, "object carries no content length"))
    }
}

impl RemoteStore for S3Store {
    async fn exists(&self, url: &str) -> Result<bool> {
        let object = S3Object::from_url(url)?;
        match self
            .client
            .head_object()
            .bucket(&object.bucket)
            .key(&object.key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(err) => {
                let absent = err
                    .as_service_error()
                    .map(|service| service.is_not_found())
                    .unwrap_or(false);
                if absent {
                    Ok(false)
                } else {
                    Err(Error::network(url, err))
                }
            }
        }
    }

    async fn size(&self, url: &str) -> Result<u64> {
        let object = S3Object::from_url(url)?;
        self.head_size(&object, url).await
    }

    async fn fetch(&self, url: &str, folder: &Path) -> Result<PathBuf> {
        let object = S3Object::from_url(url)?;
        let filename = urls::filename_from_url(url)?;
        let target = folder.join(&filename);
        if target.exists() && fs::metadata(&target)?.len() == self.head_size(&object, url).await? {
            info!("{filename} already exists on your system");
            return Ok(target);
        }

        let response = self
            .client
            .get_object()
            .bucket(&object.bucket)
            .key(&object.key)
            .send()
            .await
            .map_err(|err| Error::network(url, err))?;

        let partial = folder.join(format!("{filename}.partial"));
        let mut file = File::create(&partial)?;
        let mut body = response.body;
        while let Some(bytes) = body.try_next().await.map_err(|err| Error::network(url, err))? {
            file.write_all(&bytes)?;
        }
        fs::rename(&partial, &target)?;

        info!("stored at {}", target.display());
        Ok(target)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s3_object_from_regioned_url() {
        let url = "https://e84-earth-search-sentinel-data.s3.us-west-2.amazonaws.com/sentinel-s2-l1c/tiles/7/V/DG/2024/5/29/0/B08.jp2";
        let object = S3Object::from_url(url).unwrap();
        assert_eq!(
            object,
            S3Object {
                bucket: "e84-earth-search-sentinel-data".to_string(),
                region: Some("us-west-2".to_string()),
                key: "sentinel-s2-l1c/tiles/7/V/DG/2024/5/29/0/B08.jp2".to_string(),
            }
        );
    }

    #[test]
    fn s3_object_from_regionless_url() {
        let url =
            "https://sentinel-s2-l1c.s3.amazonaws.com/tiles/34/R/CS/2016/3/25/0/B04.jp2";
        let object = S3Object::from_url(url).unwrap();
        assert_eq!(object.bucket, "sentinel-s2-l1c");
        assert_eq!(object.region, None);
        assert_eq!(object.key, "tiles/34/R/CS/2016/3/25/0/B04.jp2");
    }

    #[test]
    fn non_s3_urls_are_rejected() {
        let url = "https://storage.googleapis.com/earthengine-public/landsat/L8/003/017/x.tar.bz";
        assert!(S3Object::from_url(url).is_err());
    }
}
