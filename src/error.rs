use std::io;

use thiserror::Error;

use crate::gateway::FileId;

/// The workbook bytes could not be turned into sheets.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("failed to read workbook: {0}")]
    Read(String),
    #[error("workbook contains no sheets")]
    NoSheets,
    #[error("sheet name `{0}` appears more than once")]
    DuplicateSheet(String),
}

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("failed to write workbook: {0}")]
    Write(#[from] rust_xlsxwriter::XlsxError),
}

/// Failures of the store holding the authoritative copy.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("file {0} not found")]
    NotFound(FileId),
    #[error("user `{user}` may not access file {id}")]
    Unauthorized { user: String, id: i64 },
    #[error("`{0}` is not a valid owner name")]
    InvalidOwner(String),
    #[error("file {0} was modified concurrently")]
    Conflict(FileId),
    #[error("server error: {0}")]
    Server(String),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("corrupt store metadata: {0}")]
    Metadata(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("failed to encode cached sheet: {0}")]
    Codec(#[from] bincode::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] io::Error),
    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Errors surfaced to the user by the editor controller.
#[derive(Debug, Error)]
pub enum EditorError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error("no workbook is open")]
    NotLoaded,
    #[error("a save is already in progress")]
    SaveInFlight,
    #[error("{errors} validation errors exist, confirm to save anyway")]
    ConfirmationRequired { errors: usize },
}
