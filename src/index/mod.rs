//! Prefix index over network records.
//!
//! Every record is stored once; the trie maps each prefix to positions in
//! the record list, so overlapping allocations (a carrier's /16 and a
//! customer /24 inside it) are all reported for an address inside both.
//!
//! # Example
//!
//! ```
//! use ipowner::{NetworkRecord, PrefixIndex};
//!
//! let mut index = PrefixIndex::new();
//! index.insert(NetworkRecord::new(4134, "CHINANET", "10.0.0.0/8", "电信")).unwrap();
//! index.insert(NetworkRecord::new(4837, "CHINA169", "10.1.0.0/16", "联通")).unwrap();
//!
//! let found = index.lookup("10.1.2.3").unwrap();
//! assert_eq!(found.len(), 2);
//! assert!(index.lookup("11.0.0.0").unwrap().is_empty());
//! ```

use std::fmt;
use std::net::IpAddr;

use ipnet::IpNet;
use ipnet_trie::IpnetTrie;

use crate::error::{Error, Result};
use crate::route::NetworkRecord;

/// Containing-prefix index over [`NetworkRecord`]s.
pub struct PrefixIndex {
    trie: IpnetTrie<Vec<usize>>,
    records: Vec<NetworkRecord>,
    v4_count: usize,
}

impl PrefixIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self {
            trie: IpnetTrie::new(),
            records: Vec::new(),
            v4_count: 0,
        }
    }

    /// Build an index from records in order.
    pub fn from_records<I>(records: I) -> Result<Self>
    where
        I: IntoIterator<Item = NetworkRecord>,
    {
        let mut index = Self::new();
        for record in records {
            index.insert(record)?;
        }
        Ok(index)
    }

    /// Insert a record under its CIDR.
    ///
    /// Host bits of the CIDR are ignored. Returns `Ok(false)` when an equal
    /// record is already stored under the same prefix.
    pub fn insert(&mut self, record: NetworkRecord) -> Result<bool> {
        let network = record.network()?;
        let slot = self.records.len();

        match self.trie.exact_match_mut(network) {
            Some(slots) => {
                if slots.iter().any(|&i| self.records[i] == record) {
                    return Ok(false);
                }
                slots.push(slot);
            }
            None => {
                self.trie.insert(network, vec![slot]);
            }
        }

        if let IpNet::V4(_) = network {
            self.v4_count += 1;
        }
        self.records.push(record);
        Ok(true)
    }

    /// Every stored record whose CIDR contains `addr`.
    ///
    /// IPv4-mapped IPv6 addresses are matched as IPv4. Records come ordered
    /// from the shortest prefix to the longest, and in insertion order
    /// within one prefix.
    pub fn containing_networks(&self, addr: IpAddr) -> Vec<&NetworkRecord> {
        let addr = match addr {
            IpAddr::V6(v6) => v6.to_ipv4_mapped().map_or(addr, IpAddr::V4),
            IpAddr::V4(_) => addr,
        };

        let mut matches = self.trie.matches(&IpNet::from(addr));
        matches.sort_by_key(|(net, _)| net.prefix_len());

        let records = &self.records;
        matches
            .into_iter()
            .flat_map(|(_, slots)| slots.iter().map(move |&i| &records[i]))
            .collect()
    }

    /// Parse `ip` and query [`containing_networks`](Self::containing_networks).
    pub fn lookup(&self, ip: &str) -> Result<Vec<&NetworkRecord>> {
        let addr = ip
            .trim()
            .parse::<IpAddr>()
            .map_err(|_| Error::InvalidIpAddress(ip.to_string()))?;
        Ok(self.containing_networks(addr))
    }

    /// All stored records in insertion order.
    pub fn records(&self) -> &[NetworkRecord] {
        &self.records
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the index is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of IPv4 records.
    pub fn ipv4_len(&self) -> usize {
        self.v4_count
    }

    /// Number of IPv6 records.
    pub fn ipv6_len(&self) -> usize {
        self.records.len() - self.v4_count
    }
}

impl Default for PrefixIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PrefixIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrefixIndex")
            .field("ipv4", &self.ipv4_len())
            .field("ipv6", &self.ipv6_len())
            .finish()
    }
}
