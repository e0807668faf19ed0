//! Build the area registry from a SQL dump.

use std::path::Path;

use serde_json::{Map, Value};

use super::{AdministrativeArea, AreaRegistry};
use crate::cache::CacheFile;
use crate::error::{Error, Result, SourceKind};
use crate::scanner::{scan_titles, scan_values};
use crate::source::SourceText;

/// Header rows mis-read as data decode to this merger name.
const TITLE_ARTIFACT: &str = "merger_name";

/// Areas finer than `province,city` are dropped.
const MAX_MERGER_COMMAS: usize = 1;

/// Parse the single `INSERT ... VALUES` statement of a dump.
///
/// The `insert` and `values` keywords are matched case-sensitively.
pub fn parse_dump(sql: &str) -> Result<AreaRegistry> {
    let insert = sql
        .find("insert")
        .ok_or_else(|| Error::corrupt(SourceKind::AreaDump, "no insert statement"))?;
    let statement = &sql[insert..];
    let values = statement
        .find("values")
        .ok_or_else(|| Error::corrupt(SourceKind::AreaDump, "insert without values"))?;

    let titles = scan_titles(&statement[..values]);
    if titles.is_empty() {
        return Err(Error::corrupt(SourceKind::AreaDump, "missing column list"));
    }
    log::debug!("Area dump columns: {:?}", titles);

    let mut registry = AreaRegistry::new();
    let mut rows = 0usize;
    for (row, fields) in scan_values(&statement[values..]).enumerate() {
        rows += 1;
        let area = decode_row(row + 1, &titles, fields)?;

        if area.merger_name == TITLE_ARTIFACT {
            continue;
        }
        if area.merger_name.matches(',').count() > MAX_MERGER_COMMAS {
            continue;
        }
        registry.insert(area);
    }

    log::debug!("Kept {} of {} area rows", registry.len(), rows);
    Ok(registry)
}

/// Load the area registry from its cache, or parse the dump and cache it.
pub fn load_areas(dump: &Path, cache: &CacheFile) -> Result<AreaRegistry> {
    let registry = cache.load_or_build(
        |reader| serde_json::from_reader(reader).map_err(|e| Error::cache(cache.path(), e)),
        |writer| {
            let text = SourceText::read(dump, SourceKind::AreaDump)?;
            let registry = parse_dump(text.as_str(SourceKind::AreaDump)?)?;
            serde_json::to_writer(&mut *writer, &registry).map_err(std::io::Error::from)?;
            Ok(registry)
        },
    )?;

    log::info!("Contained {} areas", registry.len());
    Ok(registry)
}

fn decode_row(row: usize, titles: &[String], fields: Vec<String>) -> Result<AdministrativeArea> {
    if fields.len() < titles.len() {
        return Err(Error::corrupt(
            SourceKind::AreaDump,
            format!(
                "row {}: expected {} fields, found {}",
                row,
                titles.len(),
                fields.len()
            ),
        ));
    }

    let map: Map<String, Value> = titles
        .iter()
        .cloned()
        .zip(fields.into_iter().map(Value::String))
        .collect();

    serde_json::from_value(Value::Object(map))
        .map_err(|e| Error::corrupt(SourceKind::AreaDump, format!("row {}: {}", row, e)))
}
