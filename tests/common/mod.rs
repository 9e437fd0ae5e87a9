#![allow(dead_code)]

use paap_sheets::cell::{Cell, row_from_strs};
use paap_sheets::spreadsheet::{Sheet, Workbook};

pub const PAAP_HEADER: [&str; 10] = [
    "Cod obiectiv",
    "Categorie",
    "Procedura",
    "Cod intern",
    "Cod CPV",
    "Valoare estimata",
    "Sursa finantare",
    "Data inceput",
    "Data finalizare",
    "Observatii",
];

pub const PAAP_PRODUCT: [&str; 10] = [
    "C1", "P", "PP", "ACP01", "30190000-7", "1.000,00", "1.1", "01/02/2024", "01/03/2024", "",
];

pub const PAAP_SERVICE: [&str; 10] = [
    "C2", "S", "AD", "ACS02", "79000000-4", "2.500,50", "2", "15/03/2024", "31/02/2024", "urgent",
];

pub const PAAP_WORKS: [&str; 10] = [
    "C3", "L", "LD", "ACL03", "45000000-7", "10.000,00", "1.2.1", "01/04/2024", "30/06/2024", "",
];

pub fn header_rows(header: &[&str]) -> Vec<Vec<Cell>> {
    let blank = vec![""; header.len()];
    vec![row_from_strs(header), row_from_strs(&blank)]
}

pub fn paap_workbook(data: &[&[&str]]) -> Workbook {
    let mut rows = header_rows(&PAAP_HEADER);
    rows.extend(data.iter().map(|r| row_from_strs(r)));
    Workbook::from_sheets(vec![Sheet::with_rows("PAAP", rows), Sheet::new("Total")]).unwrap()
}

pub fn achizitii_workbook(data: &[&[&str]]) -> Workbook {
    let header = [
        "Nr. crt",
        "Cod achizitie",
        "Categorie",
        "Cod CPV",
        "Valoare estimata",
        "Valoare contractata",
        "Data contract",
        "Stadiu",
    ];
    let mut rows = header_rows(&header);
    rows.extend(data.iter().map(|r| row_from_strs(r)));
    Workbook::from_sheets(vec![Sheet::with_rows("Achizitii", rows), Sheet::new("Total")]).unwrap()
}

/// Compares two sheets by displayed value, treating cells beyond either
/// grid as blank.
pub fn same_values(a: &Sheet, b: &Sheet) -> bool {
    let height = a.height().max(b.height());
    let width = a.width().max(b.width());
    (0..height).all(|row| {
        (0..width).all(|col| {
            let left = a.get(row, col).map(Cell::display_value).unwrap_or_default();
            let right = b.get(row, col).map(Cell::display_value).unwrap_or_default();
            left == right
        })
    })
}
