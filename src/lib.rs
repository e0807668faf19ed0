//! ipowner - Resolve IP addresses to location, administrative area and
//! AS ownership.
//!
//! Three datasets are combined:
//!
//! - **Geolocation**: any [`GeoSource`]; a MaxMind City database reader is
//!   provided as [`MaxMindGeoSource`]
//! - **Administrative areas**: parsed from a SQL `INSERT ... VALUES` dump
//!   into an [`AreaRegistry`]
//! - **Network ownership**: derived from an AS-name registry and a RIB dump
//!   into a [`PrefixIndex`] of [`NetworkRecord`]s
//!
//! Both derived datasets are cached on first build (`area.json`,
//! `network.csv`). Once written, a cache is the only source read on later
//! runs; delete it to rebuild.
//!
//! # Quick Start
//!
//! ```ignore
//! use ipowner::{Library, LibraryConfig};
//!
//! let config = LibraryConfig::from_file("ipowner.yaml".as_ref())?;
//! let library = Library::open(&config)?;
//!
//! let result = library.lookup("1.0.1.1")?;
//! println!("{} {} {}", result.location.country, result.location.region, result.location.city);
//! for network in &result.networks {
//!     println!("AS{} {} {} {}", network.asn, network.as_name, network.cidr, network.isp);
//! }
//! ```
//!
//! # Ingestion
//!
//! The route pipeline streams the RIB dump through the AS-name registry
//! join and carrier classification; see [`route`]. The SQL dump is read
//! with the narrow tokenizer in [`scanner`].

mod cache;
mod config;
mod error;
mod geo;
mod index;
mod library;
mod source;

pub mod area;
pub mod route;
pub mod scanner;

// Re-export core types
pub use error::{Error, Result, SourceKind};
pub use library::{Library, Lookup};

// Re-export configuration
pub use config::{CarrierPattern, LibraryConfig, DEFAULT_GEO_LOCALE, DEFAULT_NATIONAL_COUNTRY};

// Re-export datasets
pub use area::{AdministrativeArea, AreaRegistry};
pub use index::PrefixIndex;
pub use route::{NetworkRecord, RouteSources};

// Re-export geolocation
pub use geo::{GeoSource, Location, MaxMindGeoSource};

// Re-export the cache lifecycle for callers driving the stages themselves
pub use cache::{CacheFile, CacheWriter};
