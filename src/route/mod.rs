//! Route ingestion: from AS-name registry and RIB dump to ownership records.
//!
//! The pipeline runs in three stages:
//!
//! 1. [`parse_as_names`] keeps the nationally registered ASNs and their names.
//! 2. [`RibReader`] turns routing table lines into `(origin ASN, prefix)` pairs.
//! 3. [`Networks`] joins the two, attaches a carrier label from a
//!    [`CarrierClassifier`], and drops duplicate records.
//!
//! [`load_networks`] wraps the pipeline in the cache lifecycle and feeds the
//! result into a [`PrefixIndex`](crate::index::PrefixIndex).

mod asnames;
mod carrier;
mod pipeline;
mod rib;

pub use asnames::{parse_as_names, AsNames, DEFAULT_REGISTRY_MARKER};
pub use carrier::{Carrier, CarrierClassifier, DEFAULT_CARRIERS};
pub use pipeline::{build_networks, load_networks, read_network_cache, Networks, RouteSources};
pub use rib::RibReader;

use ipnet::IpNet;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// An announced prefix and the AS that originates it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRecord {
    pub asn: u32,
    pub cidr: String,
}

/// A prefix together with its owning AS and carrier.
///
/// `isp` is empty when the AS name matched no carrier pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NetworkRecord {
    #[serde(rename = "ASN")]
    pub asn: u32,
    #[serde(rename = "ASName")]
    pub as_name: String,
    #[serde(rename = "CIDR")]
    pub cidr: String,
    #[serde(rename = "ISP")]
    pub isp: String,
}

impl NetworkRecord {
    /// Create a new record.
    pub fn new(
        asn: u32,
        as_name: impl Into<String>,
        cidr: impl Into<String>,
        isp: impl Into<String>,
    ) -> Self {
        Self {
            asn,
            as_name: as_name.into(),
            cidr: cidr.into(),
            isp: isp.into(),
        }
    }

    /// Identity used for deduplication.
    pub fn key(&self) -> String {
        format!("{}|{}|{}|{}", self.asn, self.as_name, self.cidr, self.isp)
    }

    /// Parse the CIDR, with host bits cleared.
    pub fn network(&self) -> Result<IpNet> {
        self.cidr
            .trim()
            .parse::<IpNet>()
            .map(|net| net.trunc())
            .map_err(|_| Error::InvalidCidr(self.cidr.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key() {
        let record = NetworkRecord::new(4134, "CHINANET-BACKBONE, CN", "1.0.1.0/24", "电信");
        assert_eq!(record.key(), "4134|CHINANET-BACKBONE, CN|1.0.1.0/24|电信");
    }

    #[test]
    fn test_network_truncates_host_bits() {
        let record = NetworkRecord::new(1, "x", "10.1.2.3/16", "");
        assert_eq!(record.network().unwrap().to_string(), "10.1.0.0/16");

        let record = NetworkRecord::new(1, "x", "2001:db8::1/32", "");
        assert_eq!(record.network().unwrap().to_string(), "2001:db8::/32");
    }

    #[test]
    fn test_network_invalid() {
        let record = NetworkRecord::new(1, "x", "10.0.0.0", "");
        assert!(matches!(record.network(), Err(Error::InvalidCidr(_))));
    }

    #[test]
    fn test_json_field_names() {
        let record = NetworkRecord::new(9929, "CNCNET-CN", "1.2.0.0/16", "联通");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["ASN"], 9929);
        assert_eq!(json["ASName"], "CNCNET-CN");
        assert_eq!(json["CIDR"], "1.2.0.0/16");
        assert_eq!(json["ISP"], "联通");
    }
}
