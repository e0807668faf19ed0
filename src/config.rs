//! Library configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::cache::CacheFile;
use crate::error::{Error, Result};
use crate::route::{CarrierClassifier, RouteSources, DEFAULT_CARRIERS, DEFAULT_REGISTRY_MARKER};

/// Country name that enables area resolution.
pub const DEFAULT_NATIONAL_COUNTRY: &str = "中国";

/// Locale of the names reported by the geolocation database.
pub const DEFAULT_GEO_LOCALE: &str = "zh-CN";

/// File locations and tunables for building a [`Library`](crate::Library).
///
/// Every field has a default, so a YAML file only needs the keys it changes:
///
/// ```yaml
/// rib: /data/rib.20180201.txt.gz
/// network_cache: /var/cache/ipowner/network.csv
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// SQL dump of administrative areas
    pub area_dump: PathBuf,
    /// Derived area registry (JSON)
    pub area_cache: PathBuf,
    /// AS-name registry
    pub as_names: PathBuf,
    /// RIB dump
    pub rib: PathBuf,
    /// Derived network records (CSV)
    pub network_cache: PathBuf,
    /// MaxMind City database
    pub geo_database: PathBuf,
    /// Preferred locale of geolocation names
    pub geo_locale: String,
    /// Country value for which areas are resolved
    pub national_country: String,
    /// Suffix of nationally registered AS names
    pub registry_marker: String,
    /// Carrier patterns, later entries taking priority
    pub carriers: Vec<CarrierPattern>,
}

/// One carrier label and its case-insensitive pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarrierPattern {
    pub label: String,
    pub pattern: String,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            area_dump: PathBuf::from("china_area_mysql/cnarea20160731.sql"),
            area_cache: PathBuf::from("area.json"),
            as_names: PathBuf::from("asn/asnames.txt"),
            rib: PathBuf::from("asn/rib.txt"),
            network_cache: PathBuf::from("network.csv"),
            geo_database: PathBuf::from("GeoLite2-City.mmdb"),
            geo_locale: DEFAULT_GEO_LOCALE.to_string(),
            national_country: DEFAULT_NATIONAL_COUNTRY.to_string(),
            registry_marker: DEFAULT_REGISTRY_MARKER.to_string(),
            carriers: DEFAULT_CARRIERS
                .iter()
                .map(|&(label, pattern)| CarrierPattern {
                    label: label.to_string(),
                    pattern: pattern.to_string(),
                })
                .collect(),
        }
    }
}

impl LibraryConfig {
    /// Parse a configuration from YAML.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{:?}: {}", path, e)))?;
        Self::from_yaml(&content)
    }

    /// Resolve relative paths against `base`.
    pub fn relative_to(mut self, base: &Path) -> Self {
        for path in [
            &mut self.area_dump,
            &mut self.area_cache,
            &mut self.as_names,
            &mut self.rib,
            &mut self.network_cache,
            &mut self.geo_database,
        ] {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
        self
    }

    /// Compile the carrier patterns.
    pub fn classifier(&self) -> Result<CarrierClassifier> {
        CarrierClassifier::from_patterns(
            self.carriers
                .iter()
                .map(|c| (c.label.as_str(), c.pattern.as_str())),
        )
    }

    /// Inputs of the route ingestion pipeline.
    pub fn route_sources(&self) -> Result<RouteSources> {
        Ok(RouteSources::new(&self.as_names, &self.rib)
            .with_marker(self.registry_marker.as_str())
            .with_classifier(self.classifier()?))
    }

    /// Cache of the area registry.
    pub fn area_cache(&self) -> CacheFile {
        CacheFile::new(&self.area_cache)
    }

    /// Cache of the network records.
    pub fn network_cache(&self) -> CacheFile {
        CacheFile::new(&self.network_cache)
    }

    fn validate(&self) -> Result<()> {
        if self.registry_marker.is_empty() {
            return Err(Error::Config("registry_marker must not be empty".to_string()));
        }
        if let Some(carrier) = self.carriers.iter().find(|c| c.label.is_empty()) {
            return Err(Error::Config(format!(
                "carrier pattern {:?} has no label",
                carrier.pattern
            )));
        }
        Ok(())
    }
}
