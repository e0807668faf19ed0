//! Load-or-build lifecycle for derived datasets.
//!
//! A cache file, once written, is the only source of truth on later runs.
//! When it is absent the dataset is rebuilt from its sources and written to
//! a temporary file next to the final path, which is renamed into place only
//! after the write completes.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::{Error, Result};

/// A derived dataset persisted at a fixed path.
#[derive(Debug, Clone)]
pub struct CacheFile {
    path: PathBuf,
}

impl CacheFile {
    /// Create a handle for the cache at `path`. Nothing is touched on disk.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Get the path of the cache file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check whether the cache file is present.
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Open the cache for reading.
    ///
    /// Returns `Ok(None)` when the file does not exist. Any other failure
    /// to open an existing cache is treated as corruption.
    pub fn open(&self) -> Result<Option<BufReader<File>>> {
        match File::open(&self.path) {
            Ok(file) => Ok(Some(BufReader::new(file))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::cache(&self.path, e)),
        }
    }

    /// Start writing a new version of the cache.
    ///
    /// Nothing is visible under the final path until
    /// [`CacheWriter::commit`] succeeds.
    pub fn create(&self) -> Result<CacheWriter> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let file = NamedTempFile::new_in(&dir)?;
        Ok(CacheWriter {
            inner: BufWriter::new(file),
            path: self.path.clone(),
        })
    }

    /// Load the cached dataset, or build it and persist it when absent.
    ///
    /// `load` receives a reader over the existing cache. `build` derives the
    /// dataset from its sources, writing the cache representation as it
    /// goes; the cache is committed only if `build` succeeds.
    pub fn load_or_build<T, L, B>(&self, load: L, build: B) -> Result<T>
    where
        L: FnOnce(BufReader<File>) -> Result<T>,
        B: FnOnce(&mut CacheWriter) -> Result<T>,
    {
        if let Some(reader) = self.open()? {
            log::info!("Loading cache from {:?}", self.path);
            return load(reader);
        }

        log::info!("No cache at {:?}, building from sources", self.path);
        let mut writer = self.create()?;
        let value = build(&mut writer)?;
        writer.commit()?;
        log::info!("Saved cache to {:?}", self.path);
        Ok(value)
    }
}

/// Buffered writer over a temporary file that replaces the cache on commit.
///
/// Dropping the writer without committing discards the temporary file.
pub struct CacheWriter {
    inner: BufWriter<NamedTempFile>,
    path: PathBuf,
}

impl CacheWriter {
    /// Get the final path this writer will commit to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush, sync and atomically rename the temporary file into place.
    pub fn commit(self) -> Result<()> {
        let file = self.inner.into_inner().map_err(|e| e.into_error())?;
        file.as_file().sync_all()?;
        file.persist(&self.path).map_err(|e| Error::Io(e.error))?;
        Ok(())
    }
}

impl Write for CacheWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
