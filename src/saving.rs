//! Local recovery cache for in-progress edits.
//!
//! Snapshots are best-effort: they let an accidental reload recover unsaved
//! edits, but the authoritative copy always lives in the store.

use bincode::{deserialize_from, serialize_into};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::CacheError;
use crate::gateway::FileId;
use crate::spreadsheet::Sheet;

/// Identifies one cached sheet of one stored file.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub file: FileId,
    pub sheet: String,
}

impl CacheKey {
    pub fn new(file: &FileId, sheet: impl Into<String>) -> Self {
        CacheKey {
            file: file.clone(),
            sheet: sheet.into(),
        }
    }

    /// File name safe on any platform: `<owner>_<id>_<sheet>.bin.gz`.
    pub fn file_name(&self) -> String {
        format!(
            "{}_{}_{}.bin.gz",
            sanitize(&self.file.owner),
            self.file.id,
            sanitize(&self.sheet)
        )
    }
}

fn sanitize(part: &str) -> String {
    part.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}

pub trait RecoveryCache {
    fn get(&self, key: &CacheKey) -> Option<Vec<u8>>;
    fn put(&self, key: &CacheKey, bytes: &[u8]) -> Result<(), CacheError>;
    fn remove(&self, key: &CacheKey) -> Result<(), CacheError>;
}

impl<T: RecoveryCache + ?Sized> RecoveryCache for &T {
    fn get(&self, key: &CacheKey) -> Option<Vec<u8>> {
        (**self).get(key)
    }

    fn put(&self, key: &CacheKey, bytes: &[u8]) -> Result<(), CacheError> {
        (**self).put(key, bytes)
    }

    fn remove(&self, key: &CacheKey) -> Result<(), CacheError> {
        (**self).remove(key)
    }
}

pub fn sheet_to_bytes(sheet: &Sheet) -> Result<Vec<u8>, CacheError> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut writer = BufWriter::new(encoder);
    serialize_into(&mut writer, sheet)?;
    let encoder = writer.into_inner().map_err(|e| e.into_error())?;
    Ok(encoder.finish()?)
}

pub fn sheet_from_bytes(bytes: &[u8]) -> Result<Sheet, CacheError> {
    let decoder = GzDecoder::new(bytes);
    let mut reader = BufReader::new(decoder);
    Ok(deserialize_from(&mut reader)?)
}

/// One gzip'd bincode file per key inside `dir`.
pub struct FsRecoveryCache {
    dir: PathBuf,
}

impl FsRecoveryCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FsRecoveryCache { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(key.file_name())
    }
}

impl RecoveryCache for FsRecoveryCache {
    fn get(&self, key: &CacheKey) -> Option<Vec<u8>> {
        fs::read(self.path_for(key)).ok()
    }

    fn put(&self, key: &CacheKey, bytes: &[u8]) -> Result<(), CacheError> {
        fs::create_dir_all(&self.dir)?;
        let mut file = File::create(self.path_for(key))?;
        file.write_all(bytes)?;
        Ok(())
    }

    fn remove(&self, key: &CacheKey) -> Result<(), CacheError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[derive(Default)]
pub struct MemoryRecoveryCache {
    entries: Mutex<HashMap<CacheKey, Vec<u8>>>,
}

impl MemoryRecoveryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("recovery cache mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RecoveryCache for MemoryRecoveryCache {
    fn get(&self, key: &CacheKey) -> Option<Vec<u8>> {
        self.entries
            .lock()
            .expect("recovery cache mutex poisoned")
            .get(key)
            .cloned()
    }

    fn put(&self, key: &CacheKey, bytes: &[u8]) -> Result<(), CacheError> {
        self.entries
            .lock()
            .expect("recovery cache mutex poisoned")
            .insert(key.clone(), bytes.to_vec());
        Ok(())
    }

    fn remove(&self, key: &CacheKey) -> Result<(), CacheError> {
        self.entries
            .lock()
            .expect("recovery cache mutex poisoned")
            .remove(key);
        Ok(())
    }
}
