//! Storage service designators and the ordered fallback chain.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// A storage service capable of serving scene data. The set is closed, so
/// the download loop can match on it exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    Amazon,
    GoogleCloud,
    Usgs,
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let designator = match self {
            Service::Amazon => "amazon",
            Service::GoogleCloud => "gcloud",
            Service::Usgs => "usgs",
        };
        write!(f, "{designator}")
    }
}

impl FromStr for Service {
    type Err = Error;

    fn from_str(designator: &str) -> Result<Self> {
        match designator {
            "amazon" | "aws" => Ok(Service::Amazon),
            "gcloud" | "google" => Ok(Service::GoogleCloud),
            "usgs" => Ok(Service::Usgs),
            other => Err(Error::UnsupportedService(other.to_string())),
        }
    }
}

/// Ordered preference list of services tried per scene. The first service
/// that can serve a scene wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceChain {
    services: Vec<Service>,
}

impl ServiceChain {
    pub fn new(services: Vec<Service>) -> Result<Self> {
        if services.is_empty() {
            return Err(Error::InvalidArgument(
                "service chain must name at least one service".to_string(),
            ));
        }
        Ok(Self { services })
    }

    pub fn from_designators<I, T>(designators: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let services = designators
            .into_iter()
            .map(|designator| designator.as_ref().parse())
            .collect::<Result<Vec<_>>>()?;
        Self::new(services)
    }

    pub fn iter(&self) -> impl Iterator<Item = Service> + '_ {
        self.services.iter().copied()
    }
}

impl Default for ServiceChain {
    fn default() -> Self {
        Self {
            services: vec![Service::Amazon, Service::GoogleCloud, Service::Usgs],
        }
    }
}
