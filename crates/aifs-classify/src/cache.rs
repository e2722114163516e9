// cache.rs - Content-addressed cache of extracted signals.
//
// Extraction (especially of office and PDF documents) is the slow part of a
// run, so signals are remembered by the SHA-256 of the file's bytes and the
// extractor family that read them. A file that is renamed or moved keeps its
// cache entry. The cache is discarded when the sampling settings change.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ClassifyError;
use crate::signal::{Signal, SignalKind};

const CACHE_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedSignal {
    pub signal: Signal,
    pub cached_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct CacheFileRef<'a> {
    version: u32,
    max_signal_chars: usize,
    max_keywords: usize,
    entries: &'a BTreeMap<String, CachedSignal>,
}

#[derive(Deserialize)]
struct CacheFile {
    version: u32,
    max_signal_chars: usize,
    max_keywords: usize,
    entries: BTreeMap<String, CachedSignal>,
}

pub struct SignalCache {
    path: PathBuf,
    max_signal_chars: usize,
    max_keywords: usize,
    entries: BTreeMap<String, CachedSignal>,
    dirty: bool,
}

impl SignalCache {
    /// Load the cache file. A missing, unreadable or outdated file yields an
    /// empty cache; it is rewritten on the next flush.
    pub fn load(path: impl AsRef<Path>, max_signal_chars: usize, max_keywords: usize) -> Self {
        let path = path.as_ref().to_path_buf();
        let entries = match read_cache_file(&path) {
            Some(file)
                if file.version == CACHE_VERSION
                    && file.max_signal_chars == max_signal_chars
                    && file.max_keywords == max_keywords =>
            {
                file.entries
            }
            Some(_) => {
                tracing::info!(path = %path.display(), "signal settings changed; cache reset");
                BTreeMap::new()
            }
            None => BTreeMap::new(),
        };
        Self {
            path,
            max_signal_chars,
            max_keywords,
            entries,
            dirty: false,
        }
    }

    pub fn key(kind: SignalKind, content_hash: &str) -> String {
        format!("{}:{}", kind, content_hash)
    }

    pub fn get(&self, key: &str) -> Option<&Signal> {
        self.entries.get(key).map(|c| &c.signal)
    }

    pub fn insert(&mut self, key: String, signal: Signal) {
        self.entries.insert(
            key,
            CachedSignal {
                signal,
                cached_at: Utc::now(),
            },
        );
        self.dirty = true;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Persist the cache if anything was added since loading.
    pub fn flush(&mut self) -> Result<(), ClassifyError> {
        if !self.dirty {
            return Ok(());
        }
        let json = serde_json::to_vec(&CacheFileRef {
            version: CACHE_VERSION,
            max_signal_chars: self.max_signal_chars,
            max_keywords: self.max_keywords,
            entries: &self.entries,
        })?;

        let write_err = |source| ClassifyError::CacheWrite {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(write_err)?;
        fs::rename(&tmp, &self.path).map_err(write_err)?;
        self.dirty = false;
        Ok(())
    }
}

fn read_cache_file(path: &Path) -> Option<CacheFile> {
    let bytes = fs::read(path).ok()?;
    match serde_json::from_slice(&bytes) {
        Ok(file) => Some(file),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "signal cache unreadable; starting empty");
            None
        }
    }
}
