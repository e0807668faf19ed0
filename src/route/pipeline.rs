//! Join, deduplicate and persist network records.

use std::io::{self, BufRead, Read};
use std::path::PathBuf;

use ahash::{AHashMap, AHashSet};

use super::{
    parse_as_names, AsNames, CarrierClassifier, NetworkRecord, RibReader, RouteRecord,
    DEFAULT_REGISTRY_MARKER,
};
use crate::cache::CacheFile;
use crate::error::{Error, Result, SourceKind};
use crate::index::PrefixIndex;
use crate::source::open_lines;

/// Inputs of the route ingestion pipeline.
#[derive(Debug, Clone)]
pub struct RouteSources {
    /// AS-name registry file
    pub as_names: PathBuf,
    /// RIB dump file
    pub rib: PathBuf,
    /// Suffix marking nationally registered ASes
    pub marker: String,
    /// Carrier patterns applied to AS names
    pub classifier: CarrierClassifier,
}

impl RouteSources {
    /// Create sources with the default marker and carrier list.
    pub fn new(as_names: impl Into<PathBuf>, rib: impl Into<PathBuf>) -> Self {
        Self {
            as_names: as_names.into(),
            rib: rib.into(),
            marker: DEFAULT_REGISTRY_MARKER.to_string(),
            classifier: CarrierClassifier::default(),
        }
    }

    /// Set the registry marker.
    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = marker.into();
        self
    }

    /// Set the carrier classifier.
    pub fn with_classifier(mut self, classifier: CarrierClassifier) -> Self {
        self.classifier = classifier;
        self
    }
}

/// Joins route records with the AS-name registry.
///
/// Routes whose ASN is not registered are dropped. Each surviving record is
/// yielded once, in source order; later duplicates are discarded.
pub struct Networks<I> {
    routes: I,
    names: AsNames,
    isps: AHashMap<u32, String>,
    seen: AHashSet<String>,
}

impl<I> Networks<I>
where
    I: Iterator<Item = Result<RouteRecord>>,
{
    /// Create the join over `routes`.
    pub fn new(routes: I, names: AsNames, classifier: &CarrierClassifier) -> Self {
        let isps = classifier.classify_all(&names);
        log::debug!("Classified {} of {} ASes", isps.len(), names.len());
        Self {
            routes,
            names,
            isps,
            seen: AHashSet::new(),
        }
    }
}

impl<I> Iterator for Networks<I>
where
    I: Iterator<Item = Result<RouteRecord>>,
{
    type Item = Result<NetworkRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let route = match self.routes.next()? {
                Ok(route) => route,
                Err(e) => return Some(Err(e)),
            };

            let Some(name) = self.names.get(&route.asn) else {
                continue;
            };
            let isp = self.isps.get(&route.asn).cloned().unwrap_or_default();
            let record = NetworkRecord::new(route.asn, name.clone(), route.cidr, isp);

            if self.seen.insert(record.key()) {
                return Some(Ok(record));
            }
        }
    }
}

/// Run the pipeline over the source files.
///
/// The AS-name registry is read eagerly; the RIB dump is streamed as the
/// returned iterator is consumed.
pub fn build_networks(sources: &RouteSources) -> Result<Networks<RibReader<Box<dyn BufRead>>>> {
    let registry = open_lines(&sources.as_names, SourceKind::AsNames)?;
    let names = parse_as_names(registry, &sources.marker)?;

    let rib = open_lines(&sources.rib, SourceKind::Rib)?;
    Ok(Networks::new(RibReader::new(rib), names, &sources.classifier))
}

/// Read records back from a headerless network cache.
pub fn read_network_cache<R: Read>(
    reader: R,
) -> csv::DeserializeRecordsIntoIter<R, NetworkRecord> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .from_reader(reader)
        .into_deserialize()
}

/// Load the prefix index from its cache, or build it from the sources and
/// write the cache alongside.
pub fn load_networks(sources: &RouteSources, cache: &CacheFile) -> Result<PrefixIndex> {
    let index = cache.load_or_build(
        |reader| {
            let mut index = PrefixIndex::new();
            for record in read_network_cache(reader) {
                let record = record.map_err(|e| Error::cache(cache.path(), e))?;
                index
                    .insert(record)
                    .map_err(|e| Error::cache(cache.path(), e))?;
            }
            Ok(index)
        },
        |writer| {
            let mut out = csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(writer);
            let mut index = PrefixIndex::new();
            for record in build_networks(sources)? {
                let record = record?;
                out.serialize(&record).map_err(io::Error::from)?;
                index.insert(record)?;
            }
            out.flush()?;
            Ok(index)
        },
    )?;

    log::info!(
        "Contained {} networks ({} IPv4, {} IPv6)",
        index.len(),
        index.ipv4_len(),
        index.ipv6_len()
    );
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const REGISTRY: &str = "\
AS4134   CHINANET-BACKBONE No.31,Jin-rong Street, CN
AS4837   CHINA169-BACKBONE CHINA UNICOM China169 Backbone, CN
AS37963  CNNIC-ALIBABA-CN-NET-AP Hangzhou Alibaba Advertising Co.,Ltd., CN
AS15169  GOOGLE - Google LLC, US
";

    fn rib_line(prefix: &str, path: &str) -> String {
        format!(
            "TABLE_DUMP2|1517443200|B|202.97.0.1|4134|{}|{}|IGP|202.97.0.1|0|0||NAG||\n",
            prefix, path
        )
    }

    fn rib() -> String {
        [
            rib_line("1.0.1.0/24", "4134"),
            rib_line("8.8.8.0/24", "3356 15169"),
            rib_line("42.120.0.0/16", "4134 37963"),
            rib_line("1.0.1.0/24", "7018 4134"),
            rib_line("101.0.0.0/8", "4837"),
            rib_line("2400:da00::/32", "4134 4837"),
        ]
        .concat()
    }

    fn sources(dir: &std::path::Path) -> RouteSources {
        let as_names = dir.join("asnames.txt");
        let rib_path = dir.join("rib.txt");
        std::fs::write(&as_names, REGISTRY).unwrap();
        std::fs::write(&rib_path, rib()).unwrap();
        RouteSources::new(as_names, rib_path)
    }

    #[test]
    fn test_join_drops_unregistered_and_duplicates() {
        let names = parse_as_names(REGISTRY.as_bytes(), DEFAULT_REGISTRY_MARKER).unwrap();
        let rib = rib();
        let routes = RibReader::new(rib.as_bytes());
        let records: Vec<NetworkRecord> =
            Networks::new(routes, names, &CarrierClassifier::default())
                .collect::<Result<_>>()
                .unwrap();

        let cidrs: Vec<&str> = records.iter().map(|r| r.cidr.as_str()).collect();
        assert_eq!(
            cidrs,
            vec!["1.0.1.0/24", "42.120.0.0/16", "101.0.0.0/8", "2400:da00::/32"]
        );
        assert_eq!(records[0].isp, "电信");
        assert_eq!(records[1].isp, "");
        assert_eq!(records[2].isp, "联通");
        assert_eq!(records[3].asn, 4837);
    }

    #[test]
    fn test_join_propagates_errors() {
        let names = parse_as_names(REGISTRY.as_bytes(), DEFAULT_REGISTRY_MARKER).unwrap();
        let routes = vec![Err(Error::corrupt(SourceKind::Rib, "boom"))];
        let mut networks = Networks::new(routes.into_iter(), names, &CarrierClassifier::default());
        assert!(networks.next().unwrap().is_err());
        assert!(networks.next().is_none());
    }

    #[test]
    fn test_cache_round_trip() {
        let dir = tempdir().unwrap();
        let sources = sources(dir.path());
        let cache = CacheFile::new(dir.path().join("network.csv"));

        let built = load_networks(&sources, &cache).unwrap();
        assert!(cache.exists());
        assert_eq!(built.len(), 4);

        // Sources are no longer consulted once the cache exists.
        std::fs::remove_file(&sources.rib).unwrap();
        let loaded = load_networks(&sources, &cache).unwrap();
        assert_eq!(loaded.records(), built.records());
    }

    #[test]
    fn test_cache_is_headerless_csv() {
        let dir = tempdir().unwrap();
        let sources = sources(dir.path());
        let cache = CacheFile::new(dir.path().join("network.csv"));
        load_networks(&sources, &cache).unwrap();

        let text = std::fs::read_to_string(cache.path()).unwrap();
        let first = text.lines().next().unwrap();
        assert_eq!(
            first,
            "4134,\"CHINANET-BACKBONE No.31,Jin-rong Street, CN\",1.0.1.0/24,电信"
        );
    }

    #[test]
    fn test_corrupt_cache_is_fatal() {
        let dir = tempdir().unwrap();
        let cache = CacheFile::new(dir.path().join("network.csv"));
        std::fs::write(cache.path(), "notanumber,x,1.0.0.0/24,\n").unwrap();

        let sources = RouteSources::new(dir.path().join("a"), dir.path().join("b"));
        let err = load_networks(&sources, &cache).unwrap_err();
        assert!(matches!(err, Error::CacheCorruption { .. }));
    }

    #[test]
    fn test_invalid_cidr_in_cache_is_fatal() {
        let dir = tempdir().unwrap();
        let cache = CacheFile::new(dir.path().join("network.csv"));
        std::fs::write(cache.path(), "1,x,1.0.0.0,\n").unwrap();

        let sources = RouteSources::new(dir.path().join("a"), dir.path().join("b"));
        let err = load_networks(&sources, &cache).unwrap_err();
        assert!(matches!(err, Error::CacheCorruption { .. }));
    }

    #[test]
    fn test_missing_sources_leave_no_cache() {
        let dir = tempdir().unwrap();
        let cache = CacheFile::new(dir.path().join("network.csv"));
        let sources = RouteSources::new(dir.path().join("a"), dir.path().join("b"));

        let err = load_networks(&sources, &cache).unwrap_err();
        assert!(matches!(err, Error::SourceOpen { .. }));
        assert!(!cache.exists());
    }
}
