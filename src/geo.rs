//! Geolocation of IP addresses.
//!
//! The lookup facade consumes any [`GeoSource`]. [`MaxMindGeoSource`] reads
//! a GeoIP2/GeoLite2 City database.

use std::collections::BTreeMap;
use std::net::IpAddr;
use std::path::Path;
use std::sync::Arc;

use maxminddb::MaxMindDBError;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Locale used when the configured one has no name.
const FALLBACK_LOCALE: &str = "en";

/// Where an address is located. Unknown parts are empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub country: String,
    pub region: String,
    pub city: String,
}

impl Location {
    /// Create a new location.
    pub fn new(
        country: impl Into<String>,
        region: impl Into<String>,
        city: impl Into<String>,
    ) -> Self {
        Self {
            country: country.into(),
            region: region.into(),
            city: city.into(),
        }
    }
}

/// A geolocation oracle.
///
/// Implementations must be safe to query from several threads at once.
pub trait GeoSource: Send + Sync {
    /// Locate the address given as text.
    fn find(&self, ip: &str) -> Result<Location>;
}

impl<G: GeoSource + ?Sized> GeoSource for Box<G> {
    fn find(&self, ip: &str) -> Result<Location> {
        (**self).find(ip)
    }
}

impl<G: GeoSource + ?Sized> GeoSource for Arc<G> {
    fn find(&self, ip: &str) -> Result<Location> {
        (**self).find(ip)
    }
}

/// Localized names of one database entity.
#[derive(Deserialize)]
struct Named {
    names: Option<BTreeMap<String, String>>,
}

#[derive(Deserialize)]
struct CityRecord {
    country: Option<Named>,
    subdivisions: Option<Vec<Named>>,
    city: Option<Named>,
}

/// [`GeoSource`] backed by a MaxMind City database.
pub struct MaxMindGeoSource {
    reader: maxminddb::Reader<Vec<u8>>,
    locale: String,
}

impl MaxMindGeoSource {
    /// Open the database file at `path`.
    pub fn open(path: &Path, locale: impl Into<String>) -> Result<Self> {
        log::info!("Opening GeoIP database {:?}", path);
        let reader = maxminddb::Reader::open_readfile(path)
            .map_err(|e| Error::Geo(format!("{:?}: {}", path, e)))?;
        Ok(Self {
            reader,
            locale: locale.into(),
        })
    }

    /// Use an in-memory database.
    pub fn from_bytes(data: Vec<u8>, locale: impl Into<String>) -> Result<Self> {
        let reader =
            maxminddb::Reader::from_source(data).map_err(|e| Error::Geo(e.to_string()))?;
        Ok(Self {
            reader,
            locale: locale.into(),
        })
    }

    /// Get the locale names are reported in.
    pub fn locale(&self) -> &str {
        &self.locale
    }

    fn name(&self, entity: Option<&Named>) -> String {
        entity
            .and_then(|e| e.names.as_ref())
            .and_then(|names| {
                names
                    .get(&self.locale)
                    .or_else(|| names.get(FALLBACK_LOCALE))
            })
            .cloned()
            .unwrap_or_default()
    }
}

impl GeoSource for MaxMindGeoSource {
    fn find(&self, ip: &str) -> Result<Location> {
        let addr = ip
            .trim()
            .parse::<IpAddr>()
            .map_err(|_| Error::InvalidIpAddress(ip.to_string()))?;

        let record: CityRecord = match self.reader.lookup(addr) {
            Ok(record) => record,
            Err(MaxMindDBError::AddressNotFoundError(_)) => return Ok(Location::default()),
            Err(e) => return Err(Error::Geo(e.to_string())),
        };

        let region = record
            .subdivisions
            .as_ref()
            .and_then(|subdivisions| subdivisions.first());
        Ok(Location {
            country: self.name(record.country.as_ref()),
            region: self.name(region),
            city: self.name(record.city.as_ref()),
        })
    }
}
