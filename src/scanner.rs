//! Tokenizer for the rows of a single SQL `INSERT ... VALUES` statement.
//!
//! This is not a SQL parser. It understands exactly one shape: a
//! parenthesized column list followed by parenthesized value tuples,
//! with fields optionally quoted by `'`, `"` or a backtick.
//!
//! # Example
//!
//! ```
//! use ipowner::scanner::{scan_titles, scan_values};
//!
//! let titles = scan_titles("insert into `area` (`id`, `name`) ");
//! assert_eq!(titles, vec!["id", "name"]);
//!
//! let rows: Vec<_> = scan_values("values (1, 'Beijing'), (2, 'Tianjin');").collect();
//! assert_eq!(rows[1], vec!["2", "Tianjin"]);
//! ```

/// Tracks whether the cursor is inside a quoted literal.
///
/// Only the quote character that opened a literal can close it.
#[derive(Debug, Default, Clone, Copy)]
struct QuoteState {
    open: Option<u8>,
}

impl QuoteState {
    /// Feed one byte; returns `true` if the byte is outside any literal
    /// and is not itself a quote.
    #[inline]
    fn feed(&mut self, b: u8) -> bool {
        match b {
            b'"' | b'\'' | b'`' => {
                match self.open {
                    None => self.open = Some(b),
                    Some(q) if q == b => self.open = None,
                    Some(_) => {}
                }
                false
            }
            _ => self.open.is_none(),
        }
    }
}

/// Return the content of the first top-level parenthesized group in `s`
/// and the remainder after its closing paren.
///
/// Returns `("", "")` when no complete group exists, including when a
/// quote is left open until the end of input.
pub fn scan_block(s: &str) -> (&str, &str) {
    let bytes = s.as_bytes();
    let start = match s.find('(') {
        Some(i) => i,
        None => return ("", ""),
    };

    let mut depth = 0usize;
    let mut quote = QuoteState::default();
    for (i, &b) in bytes.iter().enumerate().skip(start + 1) {
        if !quote.feed(b) {
            continue;
        }
        match b {
            b'(' => depth += 1,
            b')' => {
                if depth == 0 {
                    return (&s[start + 1..i], &s[i + 1..]);
                }
                depth -= 1;
            }
            _ => {}
        }
    }

    ("", "")
}

/// Split a group's content on top-level commas.
///
/// Each field is trimmed of whitespace and of one layer of matching quotes.
pub fn scan_columns(s: &str) -> Vec<String> {
    let s = s.trim();
    let bytes = s.as_bytes();
    let mut columns = Vec::with_capacity(12);
    let mut start = 0;
    let mut depth = 0usize;
    let mut quote = QuoteState::default();

    for (i, &b) in bytes.iter().enumerate() {
        if !quote.feed(b) {
            continue;
        }
        match b {
            b'(' => depth += 1,
            b')' => depth = depth.saturating_sub(1),
            b',' if depth == 0 => {
                columns.push(column_trim(&s[start..i]));
                start = i + 1;
            }
            _ => {}
        }
    }

    if start < s.len() {
        columns.push(column_trim(&s[start..]));
    }
    columns
}

/// Parse the column list of an `INSERT` statement.
pub fn scan_titles(s: &str) -> Vec<String> {
    let (block, _) = scan_block(s);
    scan_columns(block)
}

/// Lazily split every value tuple out of `s`.
pub fn scan_values(s: &str) -> Values<'_> {
    Values { rest: s }
}

/// Iterator over the value tuples of an `INSERT` statement.
///
/// Produced by [`scan_values`]. Single pass: each step consumes input.
#[derive(Debug)]
pub struct Values<'a> {
    rest: &'a str,
}

impl<'a> Iterator for Values<'a> {
    type Item = Vec<String>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.rest.is_empty() {
            let (block, rest) = scan_block(self.rest);
            self.rest = rest;
            if !block.is_empty() {
                return Some(scan_columns(block));
            }
        }
        None
    }
}

impl std::iter::FusedIterator for Values<'_> {}

fn column_trim(s: &str) -> String {
    let s = s.trim();
    let bytes = s.as_bytes();
    if bytes.len() >= 2 {
        let first = bytes[0];
        if matches!(first, b'\'' | b'"' | b'`') && bytes[bytes.len() - 1] == first {
            return s[1..s.len() - 1].to_string();
        }
    }
    s.to_string()
}
