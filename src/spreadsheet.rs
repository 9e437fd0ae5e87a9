use crate::cell::Cell;
use crate::error::DecodeError;
use serde::{Deserialize, Serialize};

/// Rows 0 and 1 hold the header and sub-header labels.
pub const HEADER_ROWS: usize = 2;

/// Index of the sheet holding the raw, validated rows.
pub const PRIMARY_SHEET: usize = 0;

/// Index of the sheet receiving the derived category totals.
pub const TOTALS_SHEET: usize = 1;

/// One named grid of cells, row-major.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Default)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Vec<Cell>>,
}

impl Sheet {
    pub fn new(name: impl Into<String>) -> Self {
        Sheet {
            name: name.into(),
            rows: Vec::new(),
        }
    }

    pub fn with_rows(name: impl Into<String>, rows: Vec<Vec<Cell>>) -> Self {
        Sheet {
            name: name.into(),
            rows,
        }
    }

    /// Number of columns, taken as the widest row.
    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&Cell> {
        self.rows.get(row).and_then(|r| r.get(col))
    }

    /// Writes a cell, growing the grid with empty cells when needed.
    pub fn set(&mut self, row: usize, col: usize, value: Cell) {
        let width = self.width().max(col + 1);
        while self.rows.len() <= row {
            self.rows.push(vec![Cell::Empty; width]);
        }
        let target = &mut self.rows[row];
        if target.len() <= col {
            target.resize(col + 1, Cell::Empty);
        }
        target[col] = value;
    }

    /// Appends a blank row as wide as the sheet and returns its index.
    pub fn push_blank_row(&mut self) -> usize {
        let width = self.width();
        self.rows.push(vec![Cell::Empty; width]);
        self.rows.len() - 1
    }

    /// Data rows (everything below the two header rows) with their indexes.
    pub fn data_rows(&self) -> impl Iterator<Item = (usize, &Vec<Cell>)> {
        self.rows.iter().enumerate().skip(HEADER_ROWS)
    }

    /// Count of data rows holding at least one non-blank cell.
    pub fn filled_row_count(&self) -> usize {
        self.data_rows()
            .filter(|(_, row)| row.iter().any(|c| !c.is_empty()))
            .count()
    }

    pub fn col_to_letter(col: usize) -> String {
        let mut col = col + 1;
        let mut result = String::new();
        while col > 0 {
            col -= 1;
            result.push(((col % 26) as u8 + b'A') as char);
            col /= 26;
        }
        result.chars().rev().collect()
    }

    /// `A1`-style name of a zero-based position.
    pub fn get_cell_name(row: usize, col: usize) -> String {
        format!("{}{}", Self::col_to_letter(col), row + 1)
    }
}

/// Ordered collection of uniquely named sheets.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Default)]
pub struct Workbook {
    sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn new() -> Self {
        Workbook { sheets: Vec::new() }
    }

    pub fn from_sheets(sheets: Vec<Sheet>) -> Result<Self, DecodeError> {
        let mut workbook = Workbook::new();
        for sheet in sheets {
            workbook.push_sheet(sheet)?;
        }
        Ok(workbook)
    }

    pub fn push_sheet(&mut self, sheet: Sheet) -> Result<(), DecodeError> {
        if self.position(&sheet.name).is_some() {
            return Err(DecodeError::DuplicateSheet(sheet.name));
        }
        self.sheets.push(sheet);
        Ok(())
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }

    pub fn len(&self) -> usize {
        self.sheets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.sheets.iter().position(|s| s.name == name)
    }

    pub fn sheet(&self, index: usize) -> Option<&Sheet> {
        self.sheets.get(index)
    }

    pub fn sheet_mut(&mut self, index: usize) -> Option<&mut Sheet> {
        self.sheets.get_mut(index)
    }

    pub fn sheet_by_name(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    pub fn primary(&self) -> Option<&Sheet> {
        self.sheet(PRIMARY_SHEET)
    }

    /// Swaps in a sheet with the same name. Returns false when no such sheet
    /// exists.
    pub fn replace_sheet(&mut self, sheet: Sheet) -> bool {
        match self.position(&sheet.name) {
            Some(index) => {
                self.sheets[index] = sheet;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_letters() {
        assert_eq!(Sheet::col_to_letter(0), "A");
        assert_eq!(Sheet::col_to_letter(25), "Z");
        assert_eq!(Sheet::col_to_letter(26), "AA");
        assert_eq!(Sheet::col_to_letter(702), "AAA");
        assert_eq!(Sheet::get_cell_name(4, 2), "C5");
    }

    #[test]
    fn set_grows_the_grid() {
        let mut sheet = Sheet::new("Total");
        sheet.set(5, 1, Cell::text("x"));
        assert_eq!(sheet.height(), 6);
        assert_eq!(sheet.width(), 2);
        assert_eq!(sheet.get(5, 1), Some(&Cell::text("x")));
        assert_eq!(sheet.get(0, 0), Some(&Cell::Empty));
    }

    #[test]
    fn duplicate_sheet_names_are_rejected() {
        let result = Workbook::from_sheets(vec![Sheet::new("PAAP"), Sheet::new("PAAP")]);
        assert!(matches!(result, Err(DecodeError::DuplicateSheet(name)) if name == "PAAP"));
    }

    #[test]
    fn filled_rows_skip_headers_and_blanks() {
        let sheet = Sheet::with_rows(
            "PAAP",
            vec![
                vec![Cell::text("h")],
                vec![Cell::text("sub")],
                vec![Cell::text("C1")],
                vec![Cell::Empty],
                vec![Cell::Number(3.0)],
            ],
        );
        assert_eq!(sheet.filled_row_count(), 2);
    }
}
