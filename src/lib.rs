//! Resolve satellite scene identifiers into storage-provider urls and
//! download the first available copy of each requested band.
#![allow(async_fn_in_trait)]

pub mod archive;
pub mod band;
mod download;
mod error;
pub mod inventory;
pub mod job;
pub mod landsat8;
pub mod scene;
pub mod sentinel2;
pub mod service;
pub mod store;
mod urls;

pub use error::{Error, Result};
