//! AS-name registry parsing.
//!
//! Registry lines look like:
//!
//! ```text
//! AS4134  CHINANET-BACKBONE No.31,Jin-rong Street, CN
//! ```

use std::io::BufRead;

use ahash::AHashMap;

use crate::error::{Error, Result, SourceKind};
use crate::source::read_line;

/// Suffix marking an AS registered in the country of interest.
pub const DEFAULT_REGISTRY_MARKER: &str = ", CN";

/// ASN to registered name.
pub type AsNames = AHashMap<u32, String>;

/// Parse the registry, keeping only lines that end with `marker`.
///
/// The name is the rest of the line after the AS number, marker included.
/// A later line for the same ASN replaces an earlier one.
pub fn parse_as_names<R: BufRead>(mut reader: R, marker: &str) -> Result<AsNames> {
    let mut names = AsNames::new();
    let mut buf = Vec::new();
    let mut line_no = 0usize;

    while let Some(line) = read_line(&mut reader, &mut buf)? {
        line_no += 1;
        let line = line.trim();
        if !line.ends_with(marker) {
            continue;
        }

        let (asn, name) = parse_line(line).map_err(|reason| {
            Error::corrupt(SourceKind::AsNames, format!("line {}: {}", line_no, reason))
        })?;
        names.insert(asn, name.to_string());
    }

    log::info!("Loaded {} AS names", names.len());
    Ok(names)
}

fn parse_line(line: &str) -> std::result::Result<(u32, &str), String> {
    let space = line
        .find(' ')
        .ok_or_else(|| format!("no separator in {:?}", line))?;

    let number = line[..space]
        .get(2..)
        .ok_or_else(|| format!("missing AS prefix in {:?}", line))?;
    let asn = number
        .parse::<u32>()
        .map_err(|e| format!("invalid AS number {:?}: {}", number, e))?;

    let name = line[space..].trim_start_matches(' ');
    if name.is_empty() {
        return Err(format!("missing name in {:?}", line));
    }

    Ok((asn, name))
}
