//! Administrative area registry.
//!
//! Areas are keyed by their merger name, the comma-joined
//! `province` or `province,city` composite the geolocation source resolves to.

mod builder;

pub use builder::{load_areas, parse_dump};

use ahash::AHashMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// One row of the administrative area dump.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdministrativeArea {
    pub id: String,
    pub parent_id: String,
    pub level: String,
    pub area_code: String,
    pub zip_code: String,
    pub city_code: String,
    pub name: String,
    pub short_name: String,
    pub merger_name: String,
    pub pinyin: String,
    pub lng: String,
    pub lat: String,
}

impl AdministrativeArea {
    /// Longitude and latitude, if both parse as numbers.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        let lng = self.lng.trim().parse().ok()?;
        let lat = self.lat.trim().parse().ok()?;
        Some((lng, lat))
    }

    /// Number of components in the merger name.
    pub fn depth(&self) -> usize {
        if self.merger_name.is_empty() {
            0
        } else {
            self.merger_name.matches(',').count() + 1
        }
    }
}

/// Insertion-ordered mapping from merger name to area.
///
/// Inserting an existing key replaces the stored area and keeps the key at
/// its original position.
#[derive(Debug, Clone, Default)]
pub struct AreaRegistry {
    areas: Vec<AdministrativeArea>,
    index: AHashMap<String, usize>,
}

impl AreaRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, area: AdministrativeArea) -> Option<AdministrativeArea> {
        match self.index.get(&area.merger_name) {
            Some(&pos) => Some(std::mem::replace(&mut self.areas[pos], area)),
            None => {
                self.index.insert(area.merger_name.clone(), self.areas.len());
                self.areas.push(area);
                None
            }
        }
    }

    /// Look up an area by merger name.
    pub fn get(&self, merger_name: &str) -> Option<&AdministrativeArea> {
        self.index.get(merger_name).map(|&pos| &self.areas[pos])
    }

    /// Resolve `region,city`, falling back to `region` alone.
    pub fn resolve(&self, region: &str, city: &str) -> Option<&AdministrativeArea> {
        self.get(&format!("{},{}", region, city))
            .or_else(|| self.get(region))
    }

    /// Get the number of areas.
    pub fn len(&self) -> usize {
        self.areas.len()
    }

    /// Check if the registry has no areas.
    pub fn is_empty(&self) -> bool {
        self.areas.is_empty()
    }

    /// Iterate over areas in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, AdministrativeArea> {
        self.areas.iter()
    }
}

impl PartialEq for AreaRegistry {
    fn eq(&self, other: &Self) -> bool {
        self.areas == other.areas
    }
}

impl Eq for AreaRegistry {}

impl FromIterator<AdministrativeArea> for AreaRegistry {
    fn from_iter<I: IntoIterator<Item = AdministrativeArea>>(iter: I) -> Self {
        let mut registry = Self::new();
        for area in iter {
            registry.insert(area);
        }
        registry
    }
}

impl<'a> IntoIterator for &'a AreaRegistry {
    type Item = &'a AdministrativeArea;
    type IntoIter = std::slice::Iter<'a, AdministrativeArea>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl Serialize for AreaRegistry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(&self.areas)
    }
}

impl<'de> Deserialize<'de> for AreaRegistry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let areas = Vec::<AdministrativeArea>::deserialize(deserializer)?;
        Ok(areas.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn area(merger_name: &str, id: &str) -> AdministrativeArea {
        AdministrativeArea {
            id: id.to_string(),
            merger_name: merger_name.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_last_write_wins_keeps_position() {
        let registry: AreaRegistry = vec![
            area("北京", "1"),
            area("天津", "2"),
            area("北京", "3"),
        ]
        .into_iter()
        .collect();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("北京").unwrap().id, "3");
        let order: Vec<_> = registry.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(order, vec!["3", "2"]);
    }

    #[test]
    fn test_resolve_falls_back_to_region() {
        let registry: AreaRegistry = vec![area("广东", "1"), area("广东,深圳", "2")]
            .into_iter()
            .collect();

        assert_eq!(registry.resolve("广东", "深圳").unwrap().id, "2");
        assert_eq!(registry.resolve("广东", "珠海").unwrap().id, "1");
        assert!(registry.resolve("湖南", "长沙").is_none());
    }

    #[test]
    fn test_coordinates() {
        let mut a = area("北京", "1");
        assert_eq!(a.coordinates(), None);
        a.lng = "116.405285".to_string();
        a.lat = "39.904989".to_string();
        assert_eq!(a.coordinates(), Some((116.405285, 39.904989)));
    }

    #[test]
    fn test_depth() {
        assert_eq!(area("", "0").depth(), 0);
        assert_eq!(area("北京", "1").depth(), 1);
        assert_eq!(area("北京,北京", "2").depth(), 2);
    }

    #[test]
    fn test_json_round_trip_preserves_order() {
        let registry: AreaRegistry = vec![area("b", "1"), area("a", "2")].into_iter().collect();
        let json = serde_json::to_string(&registry).unwrap();
        let loaded: AreaRegistry = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded, registry);
        assert_eq!(loaded.iter().next().unwrap().merger_name, "b");
        assert_eq!(loaded.get("a").unwrap().id, "2");
    }
}
