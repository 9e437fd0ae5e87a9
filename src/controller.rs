use log::{info, warn};
use std::collections::BTreeSet;

use crate::cell::Cell;
use crate::downloader::encode_workbook;
use crate::editor::{EditorAction, SheetEditorState};
use crate::error::{EditorError, GatewayError};
use crate::gateway::{FileId, PersistenceGateway, SaveReceipt};
use crate::loader::decode_workbook;
use crate::rules::SheetKind;
use crate::saving::{CacheKey, RecoveryCache, sheet_from_bytes, sheet_to_bytes};

/// A save that has left the editor and awaits the store's answer.
#[derive(Debug)]
pub struct PendingSave {
    pub file: FileId,
    pub bytes: Vec<u8>,
    pub row_count: u32,
}

/// Drives a [`SheetEditorState`] and performs the I/O around it: the store
/// holding the authoritative copy, the workbook codec and the local recovery
/// cache.
pub struct EditorController<G: PersistenceGateway, C: RecoveryCache> {
    state: SheetEditorState,
    gateway: G,
    cache: C,
}

impl<G: PersistenceGateway, C: RecoveryCache> EditorController<G, C> {
    pub fn new(kind: SheetKind, gateway: G, cache: C) -> Self {
        EditorController {
            state: SheetEditorState::new(kind),
            gateway,
            cache,
        }
    }

    pub fn state(&self) -> &SheetEditorState {
        &self.state
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    fn dispatch(&mut self, action: EditorAction) {
        let state = std::mem::take(&mut self.state);
        self.state = state.reduce(action);
    }

    /// Loads `file` from the store, then puts back any sheets found in the
    /// recovery cache. On failure the previously open workbook stays.
    pub fn open(&mut self, file: FileId) -> Result<(), EditorError> {
        if self.state.is_saving() {
            return Err(EditorError::SaveInFlight);
        }
        self.dispatch(EditorAction::BeginLoad(file.clone()));

        let workbook = match self
            .gateway
            .load(&file)
            .map_err(EditorError::from)
            .and_then(|bytes| decode_workbook(&bytes).map_err(EditorError::from))
        {
            Ok(workbook) => workbook,
            Err(e) => {
                warn!("failed to open {}: {}", file, e);
                self.dispatch(EditorAction::LoadFailed(e.to_string()));
                return Err(e);
            }
        };

        self.dispatch(EditorAction::LoadSucceeded(workbook));
        let restored = self.restore_from_cache(&file);
        info!("opened {} ({} sheets restored from recovery)", file, restored);
        Ok(())
    }

    fn restore_from_cache(&mut self, file: &FileId) -> usize {
        let names: Vec<String> = self
            .state
            .workbook()
            .map(|w| w.sheet_names().iter().map(|n| n.to_string()).collect())
            .unwrap_or_default();

        let mut restored = 0;
        for name in names {
            let key = CacheKey::new(file, name.as_str());
            let Some(bytes) = self.cache.get(&key) else {
                continue;
            };
            match sheet_from_bytes(&bytes) {
                Ok(sheet) if sheet.name == name => {
                    self.dispatch(EditorAction::RestoreSheet(sheet));
                    restored += 1;
                }
                Ok(_) | Err(_) => {
                    warn!("discarding unreadable recovery snapshot {}", key.file_name());
                    self.forget(&key);
                }
            }
        }
        restored
    }

    fn forget(&self, key: &CacheKey) {
        if let Err(e) = self.cache.remove(key) {
            warn!("failed to clear recovery snapshot {}: {}", key.file_name(), e);
        }
    }

    // Failures are logged and dropped.
    fn snapshot_active_sheet(&self) {
        let (Some(file), Some(sheet)) = (self.state.file(), self.state.active_sheet()) else {
            return;
        };
        let key = CacheKey::new(file, sheet.name.as_str());
        let result = sheet_to_bytes(sheet).and_then(|bytes| self.cache.put(&key, &bytes));
        if let Err(e) = result {
            warn!("failed to write recovery snapshot {}: {}", key.file_name(), e);
        }
    }

    pub fn select_sheet(&mut self, name: &str) {
        self.dispatch(EditorAction::SelectSheet(name.to_string()));
    }

    pub fn enter_edit_mode(&mut self) {
        self.dispatch(EditorAction::EnterEditMode);
    }

    pub fn exit_edit_mode(&mut self) {
        self.dispatch(EditorAction::ExitEditMode);
    }

    /// Writes user input into the active sheet. Returns false when the edit
    /// was refused (header row, locked cell, not in edit mode).
    pub fn edit_cell(&mut self, row: usize, col: usize, input: &str) -> bool {
        let before = self.state.revision();
        self.dispatch(EditorAction::EditCell {
            row,
            col,
            value: Cell::from_input(input),
        });
        let changed = self.state.revision() != before;
        if changed {
            self.snapshot_active_sheet();
        }
        changed
    }

    /// Appends a blank row to the active sheet and returns its index.
    pub fn add_row(&mut self) -> Option<usize> {
        let before = self.state.revision();
        self.dispatch(EditorAction::AddRow);
        if self.state.revision() == before {
            return None;
        }
        self.snapshot_active_sheet();
        self.state.active_sheet().map(|s| s.height() - 1)
    }

    pub fn apply_filter(&mut self, col: usize, allowed: impl IntoIterator<Item = String>) {
        let allowed: BTreeSet<String> = allowed.into_iter().collect();
        self.dispatch(EditorAction::ApplyFilter { col, allowed });
    }

    pub fn clear_filter(&mut self, col: usize) {
        self.dispatch(EditorAction::ClearFilter(col));
    }

    pub fn open_filter_menu(&mut self, col: usize) {
        self.dispatch(EditorAction::OpenFilterMenu(col));
    }

    pub fn close_filter_menu(&mut self) {
        self.dispatch(EditorAction::CloseFilterMenu);
    }

    /// Freezes existing rows after a downstream submission.
    pub fn lock_after_submission(&mut self) {
        self.dispatch(EditorAction::Lock);
    }

    pub fn unlock(&mut self) {
        self.dispatch(EditorAction::Unlock);
    }

    /// First half of a save: checks the guards, encodes the workbook and
    /// moves the editor to `Saving`. Only one save may be pending.
    ///
    /// # Errors
    /// * [`EditorError::SaveInFlight`] while a previous save is pending
    /// * [`EditorError::ConfirmationRequired`] when validation errors exist
    ///   and `confirm_errors` is false
    pub fn begin_save(&mut self, confirm_errors: bool) -> Result<PendingSave, EditorError> {
        if self.state.is_saving() {
            return Err(EditorError::SaveInFlight);
        }
        let file = self.state.file().cloned().ok_or(EditorError::NotLoaded)?;
        let errors = self.state.primary_error_count();
        if errors > 0 && !confirm_errors {
            return Err(EditorError::ConfirmationRequired { errors });
        }

        self.dispatch(EditorAction::BeginSave);
        if !self.state.is_saving() {
            return Err(EditorError::NotLoaded);
        }

        let encoded = self
            .state
            .workbook()
            .ok_or(EditorError::NotLoaded)
            .and_then(|w| encode_workbook(w).map_err(EditorError::from));
        match encoded {
            Ok(bytes) => Ok(PendingSave {
                file,
                bytes,
                row_count: self.state.row_count(),
            }),
            Err(e) => {
                self.dispatch(EditorAction::SaveFailed(e.to_string()));
                Err(e)
            }
        }
    }

    /// Second half of a save: on success reloads the authoritative copy of
    /// the file `pending` was encoded from, then drops its recovery
    /// snapshots.
    pub fn finish_save(
        &mut self,
        pending: &PendingSave,
        outcome: Result<SaveReceipt, GatewayError>,
    ) -> Result<SaveReceipt, EditorError> {
        let file = &pending.file;
        let reloaded = outcome.map_err(EditorError::from).and_then(|receipt| {
            let bytes = self.gateway.load(file)?;
            Ok((receipt, decode_workbook(&bytes)?))
        });

        match reloaded {
            Ok((receipt, workbook)) => {
                let mut names: BTreeSet<String> =
                    workbook.sheet_names().iter().map(|n| n.to_string()).collect();
                if let Some(current) = self.state.workbook() {
                    names.extend(current.sheet_names().iter().map(|n| n.to_string()));
                }
                for name in names {
                    self.forget(&CacheKey::new(file, name));
                }
                self.dispatch(EditorAction::SaveSucceeded(workbook));
                info!("saved {} as version {}", file, receipt.version);
                Ok(receipt)
            }
            Err(e) => {
                warn!("save of {} failed: {}", file, e);
                self.dispatch(EditorAction::SaveFailed(e.to_string()));
                Err(e)
            }
        }
    }

    /// Encodes, stores and reloads the workbook.
    pub fn save(&mut self, confirm_errors: bool) -> Result<SaveReceipt, EditorError> {
        let pending = self.begin_save(confirm_errors)?;
        let outcome = self
            .gateway
            .save(&pending.file, &pending.bytes, pending.row_count);
        self.finish_save(&pending, outcome)
    }
}
