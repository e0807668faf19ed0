//! The lookup facade.

use std::net::IpAddr;

use serde::Serialize;

use crate::area::{load_areas, AdministrativeArea, AreaRegistry};
use crate::config::{LibraryConfig, DEFAULT_NATIONAL_COUNTRY};
use crate::error::{Error, Result};
use crate::geo::{GeoSource, Location, MaxMindGeoSource};
use crate::index::PrefixIndex;
use crate::route::{load_networks, NetworkRecord};

/// Answers "who owns this address and where is it".
///
/// A `Library` is immutable once built; share it by reference (or `Arc`)
/// between threads.
pub struct Library<G> {
    geo: G,
    areas: AreaRegistry,
    networks: PrefixIndex,
    national_country: String,
}

/// Result of [`Library::lookup`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Lookup<'a> {
    #[serde(flatten)]
    pub location: Location,
    pub area: Option<&'a AdministrativeArea>,
    pub networks: Vec<&'a NetworkRecord>,
}

impl Lookup<'_> {
    /// Coordinates of the resolved area, if any.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        self.area.and_then(AdministrativeArea::coordinates)
    }
}

impl<G: GeoSource> Library<G> {
    /// Assemble a library from already loaded parts.
    pub fn new(geo: G, areas: AreaRegistry, networks: PrefixIndex) -> Self {
        Self {
            geo,
            areas,
            networks,
            national_country: DEFAULT_NATIONAL_COUNTRY.to_string(),
        }
    }

    /// Set the country value for which areas are resolved.
    pub fn with_national_country(mut self, country: impl Into<String>) -> Self {
        self.national_country = country.into();
        self
    }

    /// Load both datasets, from their caches when present.
    pub fn load(geo: G, config: &LibraryConfig) -> Result<Self> {
        let sources = config.route_sources()?;
        let areas = load_areas(&config.area_dump, &config.area_cache())?;
        let networks = load_networks(&sources, &config.network_cache())?;

        Ok(Self::new(geo, areas, networks).with_national_country(config.national_country.as_str()))
    }

    /// Locate `ip`, resolve its administrative area and every network
    /// containing it.
    ///
    /// A geolocation failure fails the whole lookup. A missing area is
    /// reported as `None`.
    pub fn lookup(&self, ip: &str) -> Result<Lookup<'_>> {
        let location = self.geo.find(ip)?;

        let area = if location.country == self.national_country {
            self.areas.resolve(&location.region, &location.city)
        } else {
            None
        };

        let addr = ip
            .trim()
            .parse::<IpAddr>()
            .map_err(|_| Error::InvalidIpAddress(ip.to_string()))?;
        let networks = self.networks.containing_networks(addr);

        Ok(Lookup {
            location,
            area,
            networks,
        })
    }

    /// Get the geolocation source.
    pub fn geo(&self) -> &G {
        &self.geo
    }

    /// Get the area registry.
    pub fn areas(&self) -> &AreaRegistry {
        &self.areas
    }

    /// Get the prefix index.
    pub fn networks(&self) -> &PrefixIndex {
        &self.networks
    }

    /// Get the country value for which areas are resolved.
    pub fn national_country(&self) -> &str {
        &self.national_country
    }
}

impl Library<MaxMindGeoSource> {
    /// Open the MaxMind database named by `config` and load both datasets.
    pub fn open(config: &LibraryConfig) -> Result<Self> {
        let geo = MaxMindGeoSource::open(&config.geo_database, config.geo_locale.as_str())?;
        Self::load(geo, config)
    }
}
