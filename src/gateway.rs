//! Store for the authoritative copy of uploaded workbooks.
//!
//! The portal keeps each uploaded file as a versioned record owned by one
//! user. [`PersistenceGateway`] is the narrow contract the editor needs;
//! [`FsStore`] and [`MemoryStore`] implement it.

use chrono::{DateTime, Utc};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs::{self, File, create_dir_all};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::GatewayError;

/// Identity of a stored file as seen by the requesting user.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileId {
    pub id: i64,
    /// Username making the request; must own the record.
    pub owner: String,
}

impl FileId {
    pub fn new(id: i64, owner: impl Into<String>) -> Self {
        FileId {
            id,
            owner: owner.into(),
        }
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} ({})", self.id, self.owner)
    }
}

/// Metadata of one stored workbook.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoredFile {
    pub id: i64,
    pub owner: String,
    /// Original upload name, for listings.
    pub name: String,
    /// Starts at 1 and increments on every save.
    pub version: u32,
    /// Non-blank data rows of the primary sheet (NR_Inregistari).
    pub row_count: u32,
    pub updated_at: DateTime<Utc>,
}

impl StoredFile {
    pub fn file_id(&self) -> FileId {
        FileId::new(self.id, self.owner.clone())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct SaveReceipt {
    pub version: u32,
}

pub trait PersistenceGateway {
    fn load(&self, file: &FileId) -> Result<Vec<u8>, GatewayError>;
    fn save(&self, file: &FileId, bytes: &[u8], row_count: u32) -> Result<SaveReceipt, GatewayError>;
}

impl<T: PersistenceGateway + ?Sized> PersistenceGateway for &T {
    fn load(&self, file: &FileId) -> Result<Vec<u8>, GatewayError> {
        (**self).load(file)
    }

    fn save(&self, file: &FileId, bytes: &[u8], row_count: u32) -> Result<SaveReceipt, GatewayError> {
        (**self).save(file, bytes, row_count)
    }
}

/// Owner names become directory names: ASCII letters, digits, `_` and `-`.
fn check_owner(owner: &str) -> Result<(), GatewayError> {
    let valid = !owner.is_empty()
        && owner
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(GatewayError::InvalidOwner(owner.to_string()))
    }
}

fn authorize(record: &StoredFile, file: &FileId) -> Result<(), GatewayError> {
    if record.owner == file.owner {
        Ok(())
    } else {
        Err(GatewayError::Unauthorized {
            user: file.owner.clone(),
            id: file.id,
        })
    }
}

const INDEX_FILE: &str = "index.json";
const PENDING_SUFFIX: &str = "tmp";
const BACKUP_DIR: &str = "backup";

/// Directory-backed store.
///
/// Layout under `root`:
/// * `index.json`: metadata of every stored file
/// * `<owner>/<id>.xlsx.gz`: current blob
/// * `<owner>/backup/<id>.v<version>.xlsx.gz`: archived blobs
///
/// A save only replaces the current blob after the index has been updated,
/// so a failed save leaves the previous version and its archive intact.
pub struct FsStore {
    root: PathBuf,
    archive_previous: bool,
}

impl FsStore {
    /// Opens the store, creating the directory and an empty index when
    /// missing.
    pub fn open(root: impl Into<PathBuf>, archive_previous: bool) -> Result<Self, GatewayError> {
        let root = root.into();
        if !root.exists() {
            create_dir_all(&root)?;
        }
        let index = root.join(INDEX_FILE);
        if !index.exists() {
            let mut file = File::create(&index)?;
            file.write_all(b"[]")?;
        }
        Ok(FsStore {
            root,
            archive_previous,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn read_index(&self) -> Result<Vec<StoredFile>, GatewayError> {
        let mut contents = String::new();
        File::open(self.root.join(INDEX_FILE))?.read_to_string(&mut contents)?;
        Ok(serde_json::from_str(&contents)?)
    }

    fn write_index(&self, records: &[StoredFile]) -> Result<(), GatewayError> {
        let json = serde_json::to_string_pretty(records)?;
        let index = self.root.join(INDEX_FILE);
        let pending = index.with_extension(PENDING_SUFFIX);
        fs::write(&pending, json)?;
        fs::rename(&pending, &index)?;
        Ok(())
    }

    fn blob_path(&self, owner: &str, id: i64) -> PathBuf {
        self.root.join(owner).join(format!("{}.xlsx.gz", id))
    }

    fn backup_path(&self, owner: &str, id: i64, version: u32) -> PathBuf {
        self.root
            .join(owner)
            .join(BACKUP_DIR)
            .join(format!("{}.v{}.xlsx.gz", id, version))
    }

    fn write_blob(&self, path: &Path, bytes: &[u8]) -> Result<(), GatewayError> {
        if let Some(parent) = path.parent() {
            create_dir_all(parent)?;
        }
        let mut encoder = GzEncoder::new(File::create(path)?, Compression::default());
        encoder.write_all(bytes)?;
        encoder.finish()?;
        Ok(())
    }

    fn read_blob(&self, path: &Path) -> Result<Vec<u8>, GatewayError> {
        let mut decoder = GzDecoder::new(File::open(path)?);
        let mut bytes = Vec::new();
        decoder.read_to_end(&mut bytes)?;
        Ok(bytes)
    }

    /// First upload of a workbook; the new record starts at version 1.
    pub fn create(
        &self,
        owner: &str,
        name: &str,
        bytes: &[u8],
        row_count: u32,
    ) -> Result<StoredFile, GatewayError> {
        check_owner(owner)?;
        let mut records = self.read_index()?;
        let id = records.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        let record = StoredFile {
            id,
            owner: owner.to_string(),
            name: name.to_string(),
            version: 1,
            row_count,
            updated_at: Utc::now(),
        };
        self.write_blob(&self.blob_path(owner, id), bytes)?;
        records.push(record.clone());
        self.write_index(&records)?;
        info!("stored new file {} for {}", id, owner);
        Ok(record)
    }

    pub fn list(&self, owner: &str) -> Result<Vec<StoredFile>, GatewayError> {
        Ok(self
            .read_index()?
            .into_iter()
            .filter(|r| r.owner == owner)
            .collect())
    }

    pub fn record(&self, file: &FileId) -> Result<StoredFile, GatewayError> {
        let record = self
            .read_index()?
            .into_iter()
            .find(|r| r.id == file.id)
            .ok_or_else(|| GatewayError::NotFound(file.clone()))?;
        authorize(&record, file)?;
        Ok(record)
    }

    /// Bytes of an archived version.
    pub fn load_backup(&self, file: &FileId, version: u32) -> Result<Vec<u8>, GatewayError> {
        let record = self.record(file)?;
        let path = self.backup_path(&record.owner, record.id, version);
        if !path.exists() {
            return Err(GatewayError::NotFound(file.clone()));
        }
        self.read_blob(&path)
    }

    /// Versions archived for a file, oldest first.
    pub fn backups(&self, file: &FileId) -> Result<Vec<u32>, GatewayError> {
        let record = self.record(file)?;
        Ok((1..record.version)
            .filter(|v| self.backup_path(&record.owner, record.id, *v).exists())
            .collect())
    }
}

impl PersistenceGateway for FsStore {
    fn load(&self, file: &FileId) -> Result<Vec<u8>, GatewayError> {
        let record = self.record(file)?;
        self.read_blob(&self.blob_path(&record.owner, record.id))
    }

    fn save(&self, file: &FileId, bytes: &[u8], row_count: u32) -> Result<SaveReceipt, GatewayError> {
        let mut records = self.read_index()?;
        let record = records
            .iter_mut()
            .find(|r| r.id == file.id)
            .ok_or_else(|| GatewayError::NotFound(file.clone()))?;
        authorize(record, file)?;

        let current = self.blob_path(&record.owner, record.id);
        if self.archive_previous && current.exists() {
            let backup = self.backup_path(&record.owner, record.id, record.version);
            // An earlier failed save may have archived this version already.
            if !backup.exists() {
                if let Some(parent) = backup.parent() {
                    create_dir_all(parent)?;
                }
                fs::copy(&current, &backup)?;
                debug!("archived {} version {}", file, record.version);
            }
        }

        let pending = current.with_extension(PENDING_SUFFIX);
        self.write_blob(&pending, bytes)?;

        record.version += 1;
        record.row_count = row_count;
        record.updated_at = Utc::now();
        let receipt = SaveReceipt {
            version: record.version,
        };
        if let Err(e) = self.write_index(&records) {
            let _ = fs::remove_file(&pending);
            return Err(e);
        }
        fs::rename(&pending, &current)?;
        info!("saved {} as version {}", file, receipt.version);
        Ok(receipt)
    }
}

struct MemoryEntry {
    record: StoredFile,
    blob: Vec<u8>,
    backups: Vec<Vec<u8>>,
}

/// In-process store. Every save keeps the previous blob; saves and loads can
/// be made to fail to exercise error paths.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<i64, MemoryEntry>>,
    fail_saves: AtomicBool,
    fail_loads: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, owner: &str, name: &str, bytes: &[u8], row_count: u32) -> StoredFile {
        let mut entries = self.entries.lock().expect("memory store mutex poisoned");
        let id = entries.keys().max().copied().unwrap_or(0) + 1;
        let record = StoredFile {
            id,
            owner: owner.to_string(),
            name: name.to_string(),
            version: 1,
            row_count,
            updated_at: Utc::now(),
        };
        entries.insert(
            id,
            MemoryEntry {
                record: record.clone(),
                blob: bytes.to_vec(),
                backups: Vec::new(),
            },
        );
        record
    }

    pub fn record(&self, id: i64) -> Option<StoredFile> {
        let entries = self.entries.lock().expect("memory store mutex poisoned");
        entries.get(&id).map(|e| e.record.clone())
    }

    pub fn backup_count(&self, id: i64) -> usize {
        let entries = self.entries.lock().expect("memory store mutex poisoned");
        entries.get(&id).map(|e| e.backups.len()).unwrap_or(0)
    }

    pub fn set_failing_saves(&self, failing: bool) {
        self.fail_saves.store(failing, Ordering::SeqCst);
    }

    pub fn set_failing_loads(&self, failing: bool) {
        self.fail_loads.store(failing, Ordering::SeqCst);
    }
}

impl PersistenceGateway for MemoryStore {
    fn load(&self, file: &FileId) -> Result<Vec<u8>, GatewayError> {
        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(GatewayError::Server("load unavailable".to_string()));
        }
        let entries = self.entries.lock().expect("memory store mutex poisoned");
        let entry = entries
            .get(&file.id)
            .ok_or_else(|| GatewayError::NotFound(file.clone()))?;
        authorize(&entry.record, file)?;
        Ok(entry.blob.clone())
    }

    fn save(&self, file: &FileId, bytes: &[u8], row_count: u32) -> Result<SaveReceipt, GatewayError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(GatewayError::Server("save unavailable".to_string()));
        }
        let mut entries = self.entries.lock().expect("memory store mutex poisoned");
        let entry = entries
            .get_mut(&file.id)
            .ok_or_else(|| GatewayError::NotFound(file.clone()))?;
        authorize(&entry.record, file)?;
        let previous = std::mem::replace(&mut entry.blob, bytes.to_vec());
        entry.backups.push(previous);
        entry.record.version += 1;
        entry.record.row_count = row_count;
        entry.record.updated_at = Utc::now();
        Ok(SaveReceipt {
            version: entry.record.version,
        })
    }
}
