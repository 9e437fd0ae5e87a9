//! State of the open workbook and the transitions the user can trigger.
//!
//! [`SheetEditorState::reduce`] is a pure `(state, action) -> state`
//! function: it never touches the store, the codec or the recovery cache.
//! Those live in [`crate::controller`].

use std::collections::{BTreeMap, BTreeSet};

use log::debug;

use crate::aggregation::{AggregatedTotals, recompute_in_place};
use crate::cell::Cell;
use crate::gateway::FileId;
use crate::rules::{SheetKind, ValidationReport, validate_rows, validate_sheet};
use crate::spreadsheet::{HEADER_ROWS, PRIMARY_SHEET, Sheet, Workbook};

/// Lifecycle of the open file.
///
/// `Unloaded -> Loading -> Loaded -> Editing -> Saving -> Loaded`, with
/// `Saving -> Editing` when a save fails and `Loading -> Unloaded` when the
/// first load fails.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum EditorPhase {
    #[default]
    Unloaded,
    Loading,
    Loaded,
    Editing,
    Saving,
}

/// Restriction applied once the file has been submitted downstream.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum LockState {
    #[default]
    Unlocked,
    /// Existing rows are frozen except for `editable_col`; rows appended after
    /// the lock stay fully editable.
    LockedPartial {
        /// Sheet name -> row count at the moment of locking.
        frozen_rows: BTreeMap<String, usize>,
        editable_col: usize,
    },
}

impl LockState {
    pub fn is_cell_editable(&self, sheet: &str, row: usize, col: usize) -> bool {
        if row < HEADER_ROWS {
            return false;
        }
        match self {
            LockState::Unlocked => true,
            LockState::LockedPartial {
                frozen_rows,
                editable_col,
            } => col == *editable_col || row >= frozen_rows.get(sheet).copied().unwrap_or(0),
        }
    }

    pub fn is_locked(&self) -> bool {
        matches!(self, LockState::LockedPartial { .. })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum EditorAction {
    BeginLoad(FileId),
    LoadSucceeded(Workbook),
    LoadFailed(String),
    /// Puts back a sheet recovered from the local cache.
    RestoreSheet(Sheet),
    SelectSheet(String),
    EnterEditMode,
    ExitEditMode,
    EditCell { row: usize, col: usize, value: Cell },
    AddRow,
    ApplyFilter { col: usize, allowed: BTreeSet<String> },
    ClearFilter(usize),
    OpenFilterMenu(usize),
    CloseFilterMenu,
    BeginSave,
    /// Carries the workbook reloaded from the store after the save.
    SaveSucceeded(Workbook),
    SaveFailed(String),
    Lock,
    Unlock,
}

#[derive(Clone, Debug, Default)]
pub struct SheetEditorState {
    kind: SheetKind,
    phase: EditorPhase,
    /// Phase to fall back to when a reload of an open file fails.
    resume_phase: EditorPhase,
    file: Option<FileId>,
    pending_file: Option<FileId>,
    workbook: Option<Workbook>,
    active_sheet: usize,
    filters: BTreeMap<usize, BTreeSet<String>>,
    open_filter_menu: Option<usize>,
    lock: LockState,
    errors: ValidationReport,
    totals: Option<AggregatedTotals>,
    notice: Option<String>,
    revision: u64,
}

impl SheetEditorState {
    pub fn new(kind: SheetKind) -> Self {
        SheetEditorState {
            kind,
            ..Default::default()
        }
    }

    pub fn reduce(mut self, action: EditorAction) -> Self {
        match action {
            EditorAction::BeginLoad(file) => {
                if self.phase == EditorPhase::Saving {
                    return self;
                }
                if self.phase != EditorPhase::Loading {
                    self.resume_phase = self.phase;
                }
                self.phase = EditorPhase::Loading;
                self.pending_file = Some(file);
            }
            EditorAction::LoadSucceeded(workbook) => {
                if self.phase != EditorPhase::Loading {
                    return self;
                }
                let file = self.pending_file.take();
                if file != self.file {
                    self.lock = LockState::Unlocked;
                }
                self.file = file;
                self.workbook = Some(workbook);
                self.active_sheet = PRIMARY_SHEET;
                self.filters.clear();
                self.open_filter_menu = None;
                self.phase = EditorPhase::Loaded;
                self.notice = None;
                self.touch();
            }
            EditorAction::LoadFailed(message) => {
                if self.phase != EditorPhase::Loading {
                    return self;
                }
                self.pending_file = None;
                self.phase = if self.workbook.is_some() {
                    self.resume_phase
                } else {
                    EditorPhase::Unloaded
                };
                self.notice = Some(message);
            }
            EditorAction::RestoreSheet(sheet) => {
                if !matches!(self.phase, EditorPhase::Loaded | EditorPhase::Editing) {
                    return self;
                }
                let replaced = self
                    .workbook
                    .as_mut()
                    .is_some_and(|workbook| workbook.replace_sheet(sheet));
                if replaced {
                    self.phase = EditorPhase::Editing;
                    self.touch();
                }
            }
            EditorAction::SelectSheet(name) => {
                let Some(index) = self.workbook.as_ref().and_then(|w| w.position(&name)) else {
                    return self;
                };
                self.active_sheet = index;
                self.filters.clear();
                self.open_filter_menu = None;
                self.revalidate();
            }
            EditorAction::EnterEditMode => {
                if self.phase == EditorPhase::Loaded {
                    self.phase = EditorPhase::Editing;
                }
            }
            EditorAction::ExitEditMode => {
                if self.phase == EditorPhase::Editing {
                    self.phase = EditorPhase::Loaded;
                }
            }
            EditorAction::EditCell { row, col, value } => {
                if self.phase != EditorPhase::Editing || !self.is_cell_editable(row, col) {
                    return self;
                }
                let index = self.active_sheet;
                if let Some(sheet) = self.workbook.as_mut().and_then(|w| w.sheet_mut(index)) {
                    sheet.set(row, col, value);
                    self.touch();
                }
            }
            EditorAction::AddRow => {
                if !self.can_add_row() {
                    return self;
                }
                let index = self.active_sheet;
                if let Some(sheet) = self.workbook.as_mut().and_then(|w| w.sheet_mut(index)) {
                    let row = sheet.push_blank_row();
                    debug!("added row {} to `{}`", row, sheet.name);
                    self.touch();
                }
            }
            EditorAction::ApplyFilter { col, allowed } => {
                if allowed.is_empty() {
                    self.filters.remove(&col);
                } else {
                    self.filters.insert(col, allowed);
                }
                self.open_filter_menu = None;
                self.revalidate();
            }
            EditorAction::ClearFilter(col) => {
                self.filters.remove(&col);
                self.revalidate();
            }
            EditorAction::OpenFilterMenu(col) => {
                if self.workbook.is_some() {
                    self.open_filter_menu = Some(col);
                }
            }
            EditorAction::CloseFilterMenu => {
                self.open_filter_menu = None;
            }
            EditorAction::BeginSave => {
                if self.workbook.is_some()
                    && matches!(self.phase, EditorPhase::Loaded | EditorPhase::Editing)
                {
                    self.phase = EditorPhase::Saving;
                }
            }
            EditorAction::SaveSucceeded(workbook) => {
                if self.phase != EditorPhase::Saving {
                    return self;
                }
                let active_name = self.active_sheet().map(|s| s.name.clone());
                self.active_sheet = active_name
                    .and_then(|name| workbook.position(&name))
                    .unwrap_or(PRIMARY_SHEET);
                self.workbook = Some(workbook);
                self.phase = EditorPhase::Loaded;
                self.notice = None;
                self.touch();
            }
            EditorAction::SaveFailed(message) => {
                if self.phase == EditorPhase::Saving {
                    self.phase = EditorPhase::Editing;
                    self.notice = Some(message);
                }
            }
            EditorAction::Lock => {
                if let Some(workbook) = &self.workbook {
                    let frozen_rows = workbook
                        .sheets()
                        .iter()
                        .map(|s| (s.name.clone(), s.height()))
                        .collect();
                    self.lock = LockState::LockedPartial {
                        frozen_rows,
                        editable_col: self.kind.lock_editable_column(),
                    };
                }
            }
            EditorAction::Unlock => {
                self.lock = LockState::Unlocked;
            }
        }
        self
    }

    // Data changed: rescan totals and validation, bump the revision.
    fn touch(&mut self) {
        if let Some(workbook) = self.workbook.as_mut() {
            self.totals = recompute_in_place(workbook, self.kind);
        }
        self.revalidate();
        self.revision += 1;
    }

    fn revalidate(&mut self) {
        self.errors = if self.active_sheet == PRIMARY_SHEET {
            match self.active_sheet() {
                Some(sheet) => validate_rows(sheet, self.kind, self.visible_rows()),
                None => ValidationReport::default(),
            }
        } else {
            ValidationReport::default()
        };
    }

    pub fn kind(&self) -> SheetKind {
        self.kind
    }

    pub fn phase(&self) -> EditorPhase {
        self.phase
    }

    pub fn is_saving(&self) -> bool {
        self.phase == EditorPhase::Saving
    }

    pub fn file(&self) -> Option<&FileId> {
        self.file.as_ref()
    }

    pub fn workbook(&self) -> Option<&Workbook> {
        self.workbook.as_ref()
    }

    pub fn active_sheet_index(&self) -> usize {
        self.active_sheet
    }

    pub fn active_sheet(&self) -> Option<&Sheet> {
        self.workbook.as_ref()?.sheet(self.active_sheet)
    }

    pub fn filters(&self) -> &BTreeMap<usize, BTreeSet<String>> {
        &self.filters
    }

    pub fn open_filter_menu(&self) -> Option<usize> {
        self.open_filter_menu
    }

    pub fn lock(&self) -> &LockState {
        &self.lock
    }

    /// Validation messages for the visible rows of the primary sheet.
    pub fn errors(&self) -> &ValidationReport {
        &self.errors
    }

    pub fn totals(&self) -> Option<&AggregatedTotals> {
        self.totals.as_ref()
    }

    /// Last user-facing error, cleared by the next successful load or save.
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    /// Incremented on every data change.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Rows to render: both header rows, then data rows matching every
    /// active filter.
    pub fn visible_rows(&self) -> Vec<usize> {
        let Some(sheet) = self.active_sheet() else {
            return Vec::new();
        };
        (0..sheet.height())
            .filter(|&row| row < HEADER_ROWS || self.row_passes_filters(sheet, row))
            .collect()
    }

    fn row_passes_filters(&self, sheet: &Sheet, row: usize) -> bool {
        self.filters.iter().all(|(col, allowed)| {
            let value = sheet
                .get(row, *col)
                .map(Cell::display_value)
                .unwrap_or_default();
            allowed.contains(&value)
        })
    }

    /// Values offered in the filter menu of `col`.
    pub fn distinct_values(&self, col: usize) -> BTreeSet<String> {
        self.active_sheet()
            .map(|sheet| {
                sheet
                    .data_rows()
                    .map(|(_, row)| row.get(col).map(Cell::display_value).unwrap_or_default())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn is_totals_sheet_active(&self) -> bool {
        self.kind.totals_sheet() == Some(self.active_sheet)
    }

    /// Whether the user may type into `(row, col)` of the active sheet,
    /// edit mode aside.
    pub fn is_cell_editable(&self, row: usize, col: usize) -> bool {
        let Some(sheet) = self.active_sheet() else {
            return false;
        };
        if row >= sheet.height() || col >= sheet.width() || self.is_totals_sheet_active() {
            return false;
        }
        self.lock.is_cell_editable(&sheet.name, row, col)
    }

    pub fn can_add_row(&self) -> bool {
        self.phase == EditorPhase::Editing
            && self.active_sheet().is_some()
            && !self.is_totals_sheet_active()
    }

    /// Errors across every data row of the primary sheet, ignoring filters.
    pub fn primary_error_count(&self) -> usize {
        self.workbook
            .as_ref()
            .and_then(Workbook::primary)
            .map(|sheet| validate_sheet(sheet, self.kind).len())
            .unwrap_or(0)
    }

    /// Non-blank data rows of the primary sheet.
    pub fn row_count(&self) -> u32 {
        self.workbook
            .as_ref()
            .and_then(Workbook::primary)
            .map(|sheet| sheet.filled_row_count() as u32)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::row_from_strs;

    fn workbook() -> Workbook {
        Workbook::from_sheets(vec![
            Sheet::with_rows(
                "PAAP",
                vec![
                    row_from_strs(&["Cod", "Cat", "Proc", "Intern", "CPV", "Valoare", "Sursa", "Start", "End", "Obs"]),
                    row_from_strs(&["", "", "", "", "", "", "", "", "", ""]),
                    row_from_strs(&["C1", "P", "PP", "ACP01", "30190000-7", "1.000,00", "1.1", "01/02/2024", "01/03/2024", ""]),
                ],
            ),
            Sheet::new("Total"),
        ])
        .unwrap()
    }

    fn loaded() -> SheetEditorState {
        SheetEditorState::new(SheetKind::Paap)
            .reduce(EditorAction::BeginLoad(FileId::new(1, "ana")))
            .reduce(EditorAction::LoadSucceeded(workbook()))
    }

    #[test]
    fn load_recomputes_totals() {
        let state = loaded();
        assert_eq!(state.phase(), EditorPhase::Loaded);
        assert_eq!(state.totals().unwrap().products, 1000.0);
        let total = state.workbook().unwrap().sheet(1).unwrap();
        assert_eq!(total.get(2, 1), Some(&Cell::text("1.000,00")));
        assert!(state.errors().is_empty());
    }

    #[test]
    fn edits_require_edit_mode() {
        let state = loaded().reduce(EditorAction::EditCell {
            row: 2,
            col: 5,
            value: Cell::text("5,00"),
        });
        assert_eq!(state.totals().unwrap().products, 1000.0);
    }

    #[test]
    fn save_failure_returns_to_editing() {
        let state = loaded()
            .reduce(EditorAction::EnterEditMode)
            .reduce(EditorAction::BeginSave);
        assert!(state.is_saving());
        let state = state.reduce(EditorAction::SaveFailed("offline".into()));
        assert_eq!(state.phase(), EditorPhase::Editing);
        assert_eq!(state.notice(), Some("offline"));
    }

    #[test]
    fn lock_predicate() {
        let mut frozen = BTreeMap::new();
        frozen.insert("PAAP".to_string(), 5);
        let lock = LockState::LockedPartial {
            frozen_rows: frozen,
            editable_col: 9,
        };
        assert!(!lock.is_cell_editable("PAAP", 3, 0));
        assert!(lock.is_cell_editable("PAAP", 3, 9));
        assert!(lock.is_cell_editable("PAAP", 5, 0));
        assert!(!lock.is_cell_editable("PAAP", 1, 9));
        assert!(LockState::Unlocked.is_cell_editable("PAAP", 2, 0));
    }
}
