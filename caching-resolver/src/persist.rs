use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use crate::cache::ResponseCache;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("cannot access cache file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cache file {path} is not valid: {source}")]
    Format {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Reads a cache saved by [`save`]. A missing file is an empty cache.
pub fn load(path: &Path) -> Result<ResponseCache, PersistError> {
    let f = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(ResponseCache::new()),
        Err(source) => return Err(PersistError::Io { path: path.to_path_buf(), source }),
    };

    serde_json::from_reader(BufReader::new(f)).map_err(|source| PersistError::Format {
        path: path.to_path_buf(),
        source,
    })
}

/// Like [`load`], but any problem with the file only costs the cached
/// answers.
pub fn load_or_empty(path: &Path) -> ResponseCache {
    match load(path) {
        Ok(cache) => cache,
        Err(e) => {
            tracing::warn!("starting with an empty cache: {}", e);
            ResponseCache::new()
        }
    }
}

pub fn save(path: &Path, cache: &ResponseCache) -> Result<(), PersistError> {
    let io_err = |source| PersistError::Io { path: path.to_path_buf(), source };

    let f = File::create(path).map_err(io_err)?;
    let mut w = BufWriter::new(f);
    serde_json::to_writer(&mut w, cache).map_err(|source| PersistError::Format {
        path: path.to_path_buf(),
        source,
    })?;
    w.flush().map_err(io_err)?;

    Ok(())
}
