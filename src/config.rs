use serde::{Deserialize, Serialize};
use std::fs::{self, create_dir_all};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::rules::SheetKind;

const DATABASE_DIR: &str = "database";
const RECOVERY_DIR: &str = "database/.recovery";

/// Settings for the store, the recovery cache and the default page kind.
///
/// Read from a JSON file; missing fields fall back to the defaults.
///
/// ```
/// use paap_sheets::config::PortalConfig;
///
/// let config: PortalConfig = serde_json::from_str(r#"{"sheet_kind": "financiar"}"#).unwrap();
/// assert_eq!(config.data_dir.to_str(), Some("database"));
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    /// Root of the file store.
    pub data_dir: PathBuf,
    /// Directory for recovery snapshots.
    pub cache_dir: PathBuf,
    /// Copy the previous blob to `backup/` before each save.
    pub archive_previous_versions: bool,
    pub sheet_kind: SheetKind,
}

impl Default for PortalConfig {
    fn default() -> Self {
        PortalConfig {
            data_dir: PathBuf::from(DATABASE_DIR),
            cache_dir: PathBuf::from(RECOVERY_DIR),
            archive_previous_versions: true,
            sheet_kind: SheetKind::Paap,
        }
    }
}

impl PortalConfig {
    /// Loads the config at `path`, or the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => {
                let contents = fs::read_to_string(path)?;
                Ok(serde_json::from_str(&contents)?)
            }
            None => Ok(PortalConfig::default()),
        }
    }

    /// Creates the store and cache directories if they don't exist.
    pub fn init_dirs(&self) -> std::io::Result<()> {
        create_dir_all(&self.data_dir)?;
        create_dir_all(&self.cache_dir)?;
        Ok(())
    }
}
