//! Access to the primary source files.
//!
//! Files ending in `.gz` are decompressed on the fly.

use std::borrow::Cow;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use flate2::read::GzDecoder;
use memmap2::Mmap;

use crate::error::{Error, Result, SourceKind};

/// Open a line-oriented source file.
pub fn open_lines(path: &Path, kind: SourceKind) -> Result<Box<dyn BufRead>> {
    let file = open(path, kind)?;
    if is_gzip(path) {
        Ok(Box::new(BufReader::new(GzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// The full text of a source file.
///
/// Plain files are memory-mapped; compressed files are inflated into memory.
pub enum SourceText {
    Mapped(Mmap),
    Inflated(String),
    Empty,
}

impl SourceText {
    /// Read the whole file at `path`.
    pub fn read(path: &Path, kind: SourceKind) -> Result<Self> {
        let file = open(path, kind)?;

        if is_gzip(path) {
            let mut text = String::new();
            GzDecoder::new(file)
                .read_to_string(&mut text)
                .map_err(|e| Error::corrupt(kind, format!("{:?}: {}", path, e)))?;
            return Ok(SourceText::Inflated(text));
        }

        if file.metadata()?.len() == 0 {
            return Ok(SourceText::Empty);
        }

        // Safety: source files are snapshots that are not modified while
        // ingestion runs.
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(SourceText::Mapped(mmap))
    }

    /// Borrow the text, validating UTF-8 for mapped files.
    pub fn as_str(&self, kind: SourceKind) -> Result<&str> {
        match self {
            SourceText::Mapped(mmap) => std::str::from_utf8(mmap)
                .map_err(|e| Error::corrupt(kind, format!("not valid UTF-8: {}", e))),
            SourceText::Inflated(text) => Ok(text),
            SourceText::Empty => Ok(""),
        }
    }
}

/// Read one line as text, replacing invalid UTF-8.
///
/// Returns `Ok(None)` at end of input.
pub fn read_line<'b, R: BufRead + ?Sized>(
    reader: &mut R,
    buf: &'b mut Vec<u8>,
) -> std::io::Result<Option<Cow<'b, str>>> {
    buf.clear();
    if reader.read_until(b'\n', buf)? == 0 {
        return Ok(None);
    }
    Ok(Some(String::from_utf8_lossy(buf)))
}

fn open(path: &Path, kind: SourceKind) -> Result<File> {
    log::info!("Reading {} from {:?}", kind, path);
    File::open(path).map_err(|source| Error::SourceOpen {
        kind,
        path: path.to_path_buf(),
        source,
    })
}

fn is_gzip(path: &Path) -> bool {
    path.extension().map_or(false, |ext| ext == "gz")
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_open_lines_plain_and_gzip() {
        let dir = tempdir().unwrap();

        let plain = dir.path().join("rib.txt");
        std::fs::write(&plain, "a\nb\n").unwrap();

        let gz = dir.path().join("rib.txt.gz");
        let mut encoder = GzEncoder::new(File::create(&gz).unwrap(), Compression::default());
        encoder.write_all(b"a\nb\n").unwrap();
        encoder.finish().unwrap();

        for path in [&plain, &gz] {
            let lines: Vec<String> = open_lines(path, SourceKind::Rib)
                .unwrap()
                .lines()
                .map(|l| l.unwrap())
                .collect();
            assert_eq!(lines, vec!["a", "b"]);
        }
    }

    #[test]
    fn test_missing_source() {
        let dir = tempdir().unwrap();
        let err = open_lines(&dir.path().join("nope.txt"), SourceKind::AsNames)
            .err()
            .unwrap();
        assert!(matches!(
            err,
            Error::SourceOpen {
                kind: SourceKind::AsNames,
                ..
            }
        ));
    }

    #[test]
    fn test_read_text() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dump.sql");
        std::fs::write(&path, "insert into t (a) values (1);").unwrap();

        let text = SourceText::read(&path, SourceKind::AreaDump).unwrap();
        assert_eq!(
            text.as_str(SourceKind::AreaDump).unwrap(),
            "insert into t (a) values (1);"
        );
    }

    #[test]
    fn test_read_empty_and_invalid_text() {
        let dir = tempdir().unwrap();

        let empty = dir.path().join("empty.sql");
        std::fs::write(&empty, "").unwrap();
        let text = SourceText::read(&empty, SourceKind::AreaDump).unwrap();
        assert_eq!(text.as_str(SourceKind::AreaDump).unwrap(), "");

        let binary = dir.path().join("binary.sql");
        std::fs::write(&binary, [0xff, 0xfe, 0x00]).unwrap();
        let text = SourceText::read(&binary, SourceKind::AreaDump).unwrap();
        assert!(text.as_str(SourceKind::AreaDump).is_err());
    }

    #[test]
    fn test_read_line_lossy() {
        let mut input: &[u8] = b"AS1 ok\n\xffbad\n";
        let mut buf = Vec::new();
        assert_eq!(read_line(&mut input, &mut buf).unwrap().unwrap(), "AS1 ok\n");
        let line = read_line(&mut input, &mut buf).unwrap().unwrap().into_owned();
        assert!(line.ends_with("bad\n"));
        assert!(read_line(&mut input, &mut buf).unwrap().is_none());
    }
}
