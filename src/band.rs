//! Canonical band tokens and band-set normalization.
//!
//! Missions resolve caller-friendly band names ("red", "quality") to the
//! tokens their storage layouts are addressed by. Unrecognized names pass
//! through unchanged so callers can request provider-native ids directly;
//! the url builders reject them later if the mission has no such object.

use std::collections::BTreeSet;
use std::fmt;

/// A canonical band token. `Index` is a numeric spectral band, `Quality`
/// and `Metadata` are the mission's QA/metadata companions.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Band {
    Index(u8),
    Quality,
    Metadata,
    Name(String),
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Band::Index(id) => write!(f, "{id}"),
            Band::Quality => write!(f, "QA"),
            Band::Metadata => write!(f, "MTL"),
            Band::Name(name) => write!(f, "{name}"),
        }
    }
}

/// Set of bands to resolve for a scene. Set semantics guarantee the same
/// object is never downloaded twice.
pub type BandSet = BTreeSet<Band>;

/// A caller-supplied band, either a numeric id or a name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BandRequest {
    Id(u8),
    Name(String),
}

impl From<u8> for BandRequest {
    fn from(id: u8) -> Self {
        BandRequest::Id(id)
    }
}

impl From<&str> for BandRequest {
    fn from(name: &str) -> Self {
        BandRequest::Name(name.to_string())
    }
}

impl From<String> for BandRequest {
    fn from(name: String) -> Self {
        BandRequest::Name(name)
    }
}

/// Resolves requested bands against a mission lookup. Numeric ids map to
/// `Band::Index`; names the lookup does not know are kept as raw tokens.
pub fn normalize<F>(requested: &[BandRequest], lookup: F) -> BandSet
where
    F: Fn(&str) -> Option<Band>,
{
    requested
        .iter()
        .map(|request| match request {
            BandRequest::Id(id) => Band::Index(*id),
            BandRequest::Name(name) => lookup(name).unwrap_or_else(|| Band::Name(name.clone())),
        })
        .collect()
}
