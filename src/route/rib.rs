//! Routing table dump parsing.
//!
//! Each line is a pipe-delimited route entry as printed by `bgpdump -m`:
//!
//! ```text
//! TABLE_DUMP2|1517443200|B|202.97.0.1|4134|1.0.1.0/24|4134 4809 {23724}|IGP|...|AG|23724 1.2.3.4|
//! ```

use std::io::BufRead;

use ipnet::IpNet;

use super::RouteRecord;
use crate::error::{Error, Result, SourceKind};
use crate::source::read_line;

const PREFIX_FIELD: usize = 5;
const AS_PATH_FIELD: usize = 6;
const AGGREGATOR_FIELD: usize = 13;
const MIN_FIELDS: usize = AGGREGATOR_FIELD + 1;

/// Streaming reader that yields one [`RouteRecord`] per usable RIB line.
///
/// Default routes are skipped. Lines whose AS path is empty are logged and
/// skipped. Structural defects end the stream with an error.
pub struct RibReader<R> {
    reader: R,
    buf: Vec<u8>,
    line_no: usize,
    skipped: usize,
}

impl<R: BufRead> RibReader<R> {
    /// Create a reader over a RIB dump.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::with_capacity(256),
            line_no: 0,
            skipped: 0,
        }
    }

    /// Number of lines dropped for having no usable AS path.
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

impl<R: BufRead> Iterator for RibReader<R> {
    type Item = Result<RouteRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match read_line(&mut self.reader, &mut self.buf) {
                Ok(Some(line)) => line,
                Ok(None) => return None,
                Err(e) => return Some(Err(e.into())),
            };
            self.line_no += 1;

            match parse_line(line.trim(), self.line_no) {
                Ok(Some(route)) => return Some(Ok(route)),
                Ok(None) => continue,
                Err(Skip::EmptyPath) => {
                    log::warn!(
                        "No valid AS path on line {}: {}",
                        self.line_no,
                        line.trim()
                    );
                    self.skipped += 1;
                }
                Err(Skip::Fatal(e)) => return Some(Err(e)),
            }
        }
    }
}

enum Skip {
    EmptyPath,
    Fatal(Error),
}

fn parse_line(line: &str, line_no: usize) -> std::result::Result<Option<RouteRecord>, Skip> {
    if line.is_empty() {
        return Ok(None);
    }

    let fields: Vec<&str> = line.split('|').collect();
    if fields.len() < MIN_FIELDS {
        return Err(Skip::Fatal(Error::corrupt(
            SourceKind::Rib,
            format!(
                "line {}: expected at least {} fields, found {}",
                line_no,
                MIN_FIELDS,
                fields.len()
            ),
        )));
    }

    let prefix = fields[PREFIX_FIELD];
    if is_default_route(prefix) {
        return Ok(None);
    }
    if prefix.parse::<IpNet>().is_err() {
        return Err(Skip::Fatal(Error::corrupt(
            SourceKind::Rib,
            format!("line {}: invalid prefix {:?}", line_no, prefix),
        )));
    }

    let aggregator = aggregator_asn(fields[AGGREGATOR_FIELD]);
    match origin_asn(fields[AS_PATH_FIELD], aggregator) {
        Some(asn) => Ok(Some(RouteRecord {
            asn,
            cidr: prefix.to_string(),
        })),
        None => Err(Skip::EmptyPath),
    }
}

fn is_default_route(prefix: &str) -> bool {
    prefix == "0.0.0.0/0" || prefix == "::/0"
}

/// First token of the aggregator field, or zero.
fn aggregator_asn(field: &str) -> u32 {
    field
        .split_whitespace()
        .next()
        .and_then(|token| token.parse().ok())
        .unwrap_or(0)
}

/// Last hop of the AS path, with unparsable hops (AS sets, confederations)
/// replaced by the aggregator.
fn origin_asn(path: &str, aggregator: u32) -> Option<u32> {
    path.split_whitespace()
        .map(|token| token.parse::<u32>().unwrap_or(aggregator))
        .last()
}
