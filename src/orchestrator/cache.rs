//! Alignment results keyed by song id, tagged with the pipeline version that
//! produced them, plus per-song display offsets.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{AlignError, Result};
use crate::types::AlignmentResult;

const ALIGNMENT_SUFFIX: &str = ".alignment.json";
const OFFSET_SUFFIX: &str = ".offset.json";

/// A stored alignment and the pipeline version it was computed with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedAlignment {
    pub pipeline_version: String,
    pub result: AlignmentResult,
}

pub trait AlignmentCache: Send + Sync {
    fn get(&self, song_id: &str) -> Result<Option<CachedAlignment>>;

    /// Replaces whatever is stored for `song_id`.
    fn put(&self, song_id: &str, entry: &CachedAlignment) -> Result<()>;

    fn remove(&self, song_id: &str) -> Result<()>;

    /// Drops every alignment not produced by `version`; returns how many.
    fn invalidate_except(&self, version: &str) -> Result<usize>;

    /// Display offset in milliseconds, 0 when none was set.
    fn user_offset(&self, song_id: &str) -> Result<i64>;

    fn set_user_offset(&self, song_id: &str, offset_ms: i64) -> Result<()>;
}

fn lock<'a, T>(mutex: &'a Mutex<T>, context: &'static str) -> Result<MutexGuard<'a, T>> {
    mutex
        .lock()
        .map_err(|_| AlignError::cache(context, "lock poisoned"))
}

/// In-process cache, mostly for tests and short-lived sessions.
#[derive(Debug, Default)]
pub struct MemoryCache {
    alignments: Mutex<HashMap<String, CachedAlignment>>,
    offsets: Mutex<HashMap<String, i64>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AlignmentCache for MemoryCache {
    fn get(&self, song_id: &str) -> Result<Option<CachedAlignment>> {
        Ok(lock(&self.alignments, "reading alignment")?.get(song_id).cloned())
    }

    fn put(&self, song_id: &str, entry: &CachedAlignment) -> Result<()> {
        lock(&self.alignments, "storing alignment")?.insert(song_id.to_string(), entry.clone());
        Ok(())
    }

    fn remove(&self, song_id: &str) -> Result<()> {
        lock(&self.alignments, "removing alignment")?.remove(song_id);
        Ok(())
    }

    fn invalidate_except(&self, version: &str) -> Result<usize> {
        let mut alignments = lock(&self.alignments, "invalidating alignments")?;
        let before = alignments.len();
        alignments.retain(|_, entry| entry.pipeline_version == version);
        Ok(before - alignments.len())
    }

    fn user_offset(&self, song_id: &str) -> Result<i64> {
        Ok(lock(&self.offsets, "reading offset")?
            .get(song_id)
            .copied()
            .unwrap_or(0))
    }

    fn set_user_offset(&self, song_id: &str, offset_ms: i64) -> Result<()> {
        lock(&self.offsets, "storing offset")?.insert(song_id.to_string(), offset_ms);
        Ok(())
    }
}

/// One JSON file per song under a directory. Writes go to a temporary file
/// that is renamed into place, and writers to the same song are serialised.
#[derive(Debug)]
pub struct FileCache {
    root: PathBuf,
    writers: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl FileCache {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|err| AlignError::io("creating cache directory", err))?;
        Ok(Self {
            root,
            writers: Mutex::new(HashMap::new()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn alignment_path(&self, song_id: &str) -> PathBuf {
        self.root.join(format!("{}{ALIGNMENT_SUFFIX}", file_key(song_id)))
    }

    fn offset_path(&self, song_id: &str) -> PathBuf {
        self.root.join(format!("{}{OFFSET_SUFFIX}", file_key(song_id)))
    }

    fn writer(&self, song_id: &str) -> Result<Arc<Mutex<()>>> {
        let mut writers = lock(&self.writers, "acquiring song writer")?;
        Ok(writers.entry(song_id.to_string()).or_default().clone())
    }

    fn write_atomic(&self, song_id: &str, path: &Path, bytes: &[u8]) -> Result<()> {
        let writer = self.writer(song_id)?;
        let _guard = lock(&writer, "writing cache entry")?;
        let tmp = path.with_extension("tmp");
        let mut file =
            fs::File::create(&tmp).map_err(|err| AlignError::io("creating cache entry", err))?;
        file.write_all(bytes)
            .and_then(|_| file.sync_all())
            .map_err(|err| AlignError::io("writing cache entry", err))?;
        fs::rename(&tmp, path).map_err(|err| AlignError::io("committing cache entry", err))
    }

    fn remove_file(path: &Path) -> Result<()> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(AlignError::io("removing cache entry", err)),
        }
    }

    fn read_entry(path: &Path) -> Result<Option<CachedAlignment>> {
        let raw = match fs::read(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(AlignError::io("reading cache entry", err)),
        };
        match serde_json::from_slice(&raw) {
            Ok(entry) => Ok(Some(entry)),
            Err(err) => {
                warn!(path = %path.display(), %err, "discarding unreadable cache entry");
                Self::remove_file(path)?;
                Ok(None)
            }
        }
    }
}

impl AlignmentCache for FileCache {
    fn get(&self, song_id: &str) -> Result<Option<CachedAlignment>> {
        Self::read_entry(&self.alignment_path(song_id))
    }

    fn put(&self, song_id: &str, entry: &CachedAlignment) -> Result<()> {
        let bytes =
            serde_json::to_vec(entry).map_err(|err| AlignError::json("encoding alignment", err))?;
        self.write_atomic(song_id, &self.alignment_path(song_id), &bytes)?;
        debug!(song_id, version = %entry.pipeline_version, "alignment cached");
        Ok(())
    }

    fn remove(&self, song_id: &str) -> Result<()> {
        let writer = self.writer(song_id)?;
        let _guard = lock(&writer, "removing cache entry")?;
        Self::remove_file(&self.alignment_path(song_id))
    }

    fn invalidate_except(&self, version: &str) -> Result<usize> {
        let entries =
            fs::read_dir(&self.root).map_err(|err| AlignError::io("listing cache", err))?;
        let mut removed = 0;
        for entry in entries {
            let path = entry
                .map_err(|err| AlignError::io("listing cache", err))?
                .path();
            let is_alignment = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.ends_with(ALIGNMENT_SUFFIX));
            if !is_alignment {
                continue;
            }
            // Unreadable entries are deleted by `read_entry` itself.
            match Self::read_entry(&path)? {
                Some(cached) if cached.pipeline_version == version => {}
                Some(_) => {
                    Self::remove_file(&path)?;
                    removed += 1;
                }
                None => removed += 1,
            }
        }
        Ok(removed)
    }

    fn user_offset(&self, song_id: &str) -> Result<i64> {
        match fs::read(self.offset_path(song_id)) {
            Ok(raw) => serde_json::from_slice(&raw)
                .map_err(|err| AlignError::json("reading offset", err)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(0),
            Err(err) => Err(AlignError::io("reading offset", err)),
        }
    }

    fn set_user_offset(&self, song_id: &str, offset_ms: i64) -> Result<()> {
        let bytes =
            serde_json::to_vec(&offset_ms).map_err(|err| AlignError::json("encoding offset", err))?;
        self.write_atomic(song_id, &self.offset_path(song_id), &bytes)
    }
}

/// Hex encoding of the song id, safe as a file name on every platform.
fn file_key(song_id: &str) -> String {
    song_id.bytes().map(|byte| format!("{byte:02x}")).collect()
}
