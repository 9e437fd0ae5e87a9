use crate::cell::Cell;
use crate::error::DecodeError;
use crate::spreadsheet::{Sheet, Workbook};
use calamine::{Data, DataType, Range, Reader, open_workbook_auto_from_rs};
use chrono::NaiveTime;
use log::{debug, info};
use std::fs;
use std::io::Cursor;
use std::path::Path;

// Date cells are shown the way the date columns expect them typed.
const DATE_FORMAT: &str = "%d/%m/%Y";
const DATETIME_FORMAT: &str = "%d/%m/%Y %H:%M";

/// Decode workbook bytes (xlsx, xls, xlsb or ods) into sheets.
///
/// Sheet order is preserved. Cells formatted as dates become `DD/MM/YYYY`
/// text; durations stay numbers. Every sheet is padded so that cell positions
/// match the original grid even when the used range does not start at `A1`.
///
/// # Errors
/// * [`DecodeError::Read`] when the bytes are not a workbook
/// * [`DecodeError::NoSheets`] when the workbook has no sheets
///
/// # Examples
/// ```no_run
/// use paap_sheets::loader::decode_workbook;
///
/// let bytes = std::fs::read("paap.xlsx").unwrap();
/// match decode_workbook(&bytes) {
///     Ok(workbook) => println!("{} sheets", workbook.len()),
///     Err(e) => eprintln!("Error loading workbook: {}", e),
/// }
/// ```
pub fn decode_workbook(bytes: &[u8]) -> Result<Workbook, DecodeError> {
    let mut reader = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| DecodeError::Read(e.to_string()))?;

    let sheet_names: Vec<String> = reader.sheet_names().to_vec();
    if sheet_names.is_empty() {
        return Err(DecodeError::NoSheets);
    }

    let mut workbook = Workbook::new();
    for name in sheet_names {
        let range = reader
            .worksheet_range(&name)
            .map_err(|e| DecodeError::Read(format!("sheet `{}`: {}", name, e)))?;
        let rows = range_to_rows(&range);
        debug!("decoded sheet `{}` with {} rows", name, rows.len());
        workbook.push_sheet(Sheet::with_rows(name, rows))?;
    }

    Ok(workbook)
}

/// Reads and decodes a workbook file from disk.
pub fn load_workbook(filepath: impl AsRef<Path>) -> Result<Workbook, DecodeError> {
    let path = filepath.as_ref();
    let bytes = fs::read(path).map_err(|e| DecodeError::Read(format!("{}: {}", path.display(), e)))?;
    let workbook = decode_workbook(&bytes)?;
    info!("loaded {} ({} sheets)", path.display(), workbook.len());
    Ok(workbook)
}

fn range_to_rows(range: &Range<Data>) -> Vec<Vec<Cell>> {
    let Some((start_row, start_col)) = range.start() else {
        return Vec::new();
    };
    let start_row = start_row as usize;
    let start_col = start_col as usize;
    let width = start_col + range.width();

    let mut rows = Vec::with_capacity(start_row + range.height());
    for _ in 0..start_row {
        rows.push(vec![Cell::Empty; width]);
    }
    for source in range.rows() {
        let mut row = vec![Cell::Empty; start_col];
        row.extend(source.iter().map(cell_from_data));
        rows.push(row);
    }
    rows
}

fn cell_from_data(data: &Data) -> Cell {
    match data {
        Data::Empty | Data::Error(_) => Cell::Empty,
        Data::String(s) if s.is_empty() => Cell::Empty,
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Bool(b) => Cell::text(if *b { "TRUE" } else { "FALSE" }),
        Data::DateTime(dt) if dt.is_datetime() => match dt.as_datetime() {
            Some(ndt) if ndt.time() == NaiveTime::MIN => {
                Cell::Text(ndt.format(DATE_FORMAT).to_string())
            }
            Some(ndt) => Cell::Text(ndt.format(DATETIME_FORMAT).to_string()),
            None => Cell::Number(dt.as_f64()),
        },
        other => other.as_f64().map(Cell::Number).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_bytes_fail_to_decode() {
        let result = decode_workbook(b"definitely not a spreadsheet");
        assert!(matches!(result, Err(DecodeError::Read(_))));
    }

    #[test]
    fn data_conversion() {
        assert_eq!(cell_from_data(&Data::Int(4)), Cell::Number(4.0));
        assert_eq!(cell_from_data(&Data::String(String::new())), Cell::Empty);
        assert_eq!(cell_from_data(&Data::Bool(true)), Cell::text("TRUE"));
    }

    #[test]
    fn date_cells_become_text() {
        use calamine::{ExcelDateTime, ExcelDateTimeType};

        let date = ExcelDateTime::new(45323.0, ExcelDateTimeType::DateTime, false);
        assert_eq!(cell_from_data(&Data::DateTime(date)), Cell::text("01/02/2024"));
        let noon = ExcelDateTime::new(45323.5, ExcelDateTimeType::DateTime, false);
        assert_eq!(cell_from_data(&Data::DateTime(noon)), Cell::text("01/02/2024 12:00"));
        let duration = ExcelDateTime::new(1.5, ExcelDateTimeType::TimeDelta, false);
        assert_eq!(cell_from_data(&Data::DateTime(duration)), Cell::Number(1.5));
    }
}
