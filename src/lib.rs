/*!
# PAAP Sheets

Spreadsheet core of a grant-document portal, built in Rust.

## Overview

Beneficiaries upload three kinds of workbooks: the procurement plan (PAAP),
the procurement report (Achizitii) and the financial report (Financiar).
This crate checks every data cell against the column rules of its page,
keeps the category totals of the second sheet in step with the data, and
models the editor the portal shows around an open file.

## Architecture

### Workbook Layer
- **cell** / **spreadsheet**: typed cell values, sheets and workbooks
- **loader** / **downloader**: xlsx decoding (calamine) and encoding
  (rust_xlsxwriter), plus CSV export

### Rules Layer
- **numbers**: amount parsing and formatting per number style
- **rules**: per-page column rules and validation reports
- **aggregation**: P/S/L totals and the rewrite of the totals sheet

### Editor Layer
- **editor**: pure state machine for the open file (phases, filters, lock)
- **controller**: drives the editor against a store and a recovery cache

### Persistence Layer
- **gateway**: versioned, per-owner store of uploaded workbooks
- **saving**: gzip'd bincode snapshots of unsaved sheets
- **config**: JSON settings for directories and the default page kind

## Flow

1. `open` loads the bytes from the store, decodes them, recomputes totals and
   validates the primary sheet; cached snapshots are then restored.
2. Each accepted edit recomputes totals, revalidates and snapshots the active
   sheet to the recovery cache.
3. `save` asks for confirmation when errors exist, encodes, stores, reloads
   the authoritative copy and drops the snapshots.
*/

pub mod aggregation;
pub mod cell;
pub mod config;
pub mod controller;
pub mod downloader;
pub mod editor;
pub mod error;
pub mod gateway;
pub mod loader;
pub mod numbers;
pub mod rules;
pub mod saving;
pub mod spreadsheet;

pub use aggregation::*;
pub use cell::*;
pub use config::PortalConfig;
pub use controller::{EditorController, PendingSave};
pub use downloader::*;
pub use editor::*;
pub use error::*;
pub use gateway::*;
pub use loader::*;
pub use numbers::*;
pub use rules::*;
pub use saving::*;
pub use spreadsheet::*;
