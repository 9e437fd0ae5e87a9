use crate::cell::Cell;
use crate::error::EncodeError;
use crate::spreadsheet::{Sheet, Workbook};
use rust_xlsxwriter::{Workbook as XlsxWorkbook, Worksheet};

/// Serialize every sheet of the workbook to XLSX bytes.
///
/// Sheet order and names are kept. Text cells are written as strings (so
/// locale-formatted amounts survive verbatim), numbers as numbers, and empty
/// cells are skipped.
///
/// # Examples
/// ```
/// use paap_sheets::downloader::encode_workbook;
/// use paap_sheets::spreadsheet::{Sheet, Workbook};
///
/// let workbook = Workbook::from_sheets(vec![Sheet::new("PAAP")]).unwrap();
/// let bytes = encode_workbook(&workbook).unwrap();
/// assert!(!bytes.is_empty());
/// ```
pub fn encode_workbook(workbook: &Workbook) -> Result<Vec<u8>, EncodeError> {
    let mut xlsx = XlsxWorkbook::new();

    for sheet in workbook.sheets() {
        let mut worksheet = Worksheet::new();
        worksheet.set_name(&sheet.name)?;

        for (r, row) in sheet.rows.iter().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                match cell {
                    Cell::Text(s) => {
                        worksheet.write_string(r as u32, c as u16, s)?;
                    }
                    Cell::Number(n) => {
                        worksheet.write_number(r as u32, c as u16, *n)?;
                    }
                    Cell::Empty => {}
                }
            }
        }

        xlsx.push_worksheet(worksheet);
    }

    Ok(xlsx.save_to_buffer()?)
}

/// Convert one sheet to CSV.
///
/// Values containing commas, quotes or newlines are quoted, with embedded
/// quotes doubled.
pub fn to_csv(sheet: &Sheet) -> String {
    let mut csv_content = String::new();
    let width = sheet.width();

    for row in &sheet.rows {
        for c in 0..width {
            if c > 0 {
                csv_content.push(',');
            }
            let value = row.get(c).map(Cell::display_value).unwrap_or_default();
            if value.contains(',') || value.contains('"') || value.contains('\n') {
                let escaped = value.replace('"', "\"\"");
                csv_content.push_str(&format!("\"{}\"", escaped));
            } else {
                csv_content.push_str(&value);
            }
        }
        csv_content.push('\n');
    }

    csv_content
}
