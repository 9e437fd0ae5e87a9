mod common;

use common::*;
use paap_sheets::aggregation::{compute_totals, recompute, recompute_in_place};
use paap_sheets::cell::Cell;
use paap_sheets::downloader::{encode_workbook, to_csv};
use paap_sheets::loader::{decode_workbook, load_workbook};
use paap_sheets::rules::{SheetKind, validate_sheet};
use paap_sheets::spreadsheet::{Sheet, Workbook};
use rust_xlsxwriter::{Format, Workbook as XlsxWorkbook};

#[test]
fn paap_totals_by_category() {
    let workbook = recompute(
        paap_workbook(&[&PAAP_PRODUCT, &PAAP_SERVICE, &PAAP_WORKS]),
        SheetKind::Paap,
    );
    let total = workbook.sheet(1).unwrap();

    let expected = [
        ("P", "1.000,00"),
        ("S", "2.500,50"),
        ("L", "10.000,00"),
        ("TOTAL", "13.500,50"),
    ];
    for (offset, (label, amount)) in expected.iter().enumerate() {
        assert_eq!(total.get(2 + offset, 0), Some(&Cell::text(*label)));
        assert_eq!(total.get(2 + offset, 1), Some(&Cell::text(*amount)));
    }
}

#[test]
fn unknown_categories_and_bad_amounts_are_skipped() {
    let mut unknown = PAAP_SERVICE;
    unknown[1] = "X";
    let mut garbage = PAAP_WORKS;
    garbage[5] = "lots";
    let mut workbook = paap_workbook(&[&PAAP_PRODUCT, &unknown, &garbage]);

    let totals = recompute_in_place(&mut workbook, SheetKind::Paap).unwrap();
    assert_eq!(totals.products, 1000.0);
    assert_eq!(totals.services, 0.0);
    assert_eq!(totals.works, 0.0);
    assert_eq!(totals.grand_total, 1000.0);
}

#[test]
fn empty_plan_totals_zero() {
    let workbook = recompute(paap_workbook(&[]), SheetKind::Paap);
    let total = workbook.sheet(1).unwrap();
    assert_eq!(total.get(5, 0), Some(&Cell::text("TOTAL")));
    assert_eq!(total.get(5, 1), Some(&Cell::text("0,00")));
}

#[test]
fn recompute_is_idempotent() {
    let once = recompute(paap_workbook(&[&PAAP_PRODUCT, &PAAP_WORKS]), SheetKind::Paap);
    let twice = recompute(once.clone(), SheetKind::Paap);
    assert_eq!(once, twice);
}

#[test]
fn recompute_leaves_other_cells_alone() {
    let mut workbook = paap_workbook(&[&PAAP_PRODUCT]);
    let mut total = Sheet::new("Total");
    total.set(0, 0, Cell::text("Centralizator"));
    total.set(8, 3, Cell::text("semnatura"));
    workbook.replace_sheet(total);

    let workbook = recompute(workbook, SheetKind::Paap);
    let total = workbook.sheet(1).unwrap();
    assert_eq!(total.get(0, 0), Some(&Cell::text("Centralizator")));
    assert_eq!(total.get(8, 3), Some(&Cell::text("semnatura")));
    assert_eq!(workbook.primary(), paap_workbook(&[&PAAP_PRODUCT]).primary());
}

#[test]
fn achizitii_does_not_strip_grouping_dots() {
    let row = ["1", "C1", "P", "30190000-7", "1.234,56", "", "01/02/2024", "F"];
    let paap_style = paap_workbook(&[&[
        "C1", "P", "PP", "ACP01", "30190000-7", "1.234,56", "1.1", "01/02/2024", "01/03/2024", "",
    ]]);

    let paap_totals = compute_totals(
        paap_style.primary().unwrap(),
        SheetKind::Paap.aggregation().unwrap(),
    );
    let achizitii = achizitii_workbook(&[&row]);
    let achizitii_totals = compute_totals(
        achizitii.primary().unwrap(),
        SheetKind::Achizitii.aggregation().unwrap(),
    );

    assert_eq!(paap_totals.products, 1234.56);
    assert_eq!(achizitii_totals.products, 0.0);
}

#[test]
fn achizitii_totals_use_plain_comma() {
    let workbook = recompute(
        achizitii_workbook(&[
            &["1", "C1", "P", "30190000-7", "1234,56", "", "01/02/2024", "F"],
            &["2", "C2", "L", "45000000-7", "100", "", "01/03/2024", "D"],
        ]),
        SheetKind::Achizitii,
    );
    let total = workbook.sheet(1).unwrap();
    assert_eq!(total.get(2, 1), Some(&Cell::text("1234,56")));
    assert_eq!(total.get(4, 1), Some(&Cell::text("100,00")));
    assert_eq!(total.get(5, 1), Some(&Cell::text("1334,56")));
}

#[test]
fn xlsx_round_trip_keeps_values() {
    let original = recompute(
        paap_workbook(&[&PAAP_PRODUCT, &PAAP_SERVICE]),
        SheetKind::Paap,
    );
    let bytes = encode_workbook(&original).unwrap();
    let decoded = decode_workbook(&bytes).unwrap();

    assert_eq!(decoded.sheet_names(), vec!["PAAP", "Total"]);
    for (left, right) in original.sheets().iter().zip(decoded.sheets()) {
        assert!(same_values(left, right), "sheet `{}` changed", left.name);
    }
    // Locale amounts stay text.
    assert_eq!(
        decoded.primary().unwrap().get(2, 5),
        Some(&Cell::text("1.000,00"))
    );
}

#[test]
fn numbers_survive_as_numbers() {
    let mut sheet = Sheet::new("Financiar");
    sheet.set(2, 0, Cell::Number(1.0));
    sheet.set(2, 5, Cell::Number(99.5));
    let workbook = Workbook::from_sheets(vec![sheet]).unwrap();

    let decoded = decode_workbook(&encode_workbook(&workbook).unwrap()).unwrap();
    let sheet = decoded.primary().unwrap();
    assert_eq!(sheet.get(2, 0), Some(&Cell::Number(1.0)));
    assert_eq!(sheet.get(2, 5), Some(&Cell::Number(99.5)));
    assert_eq!(sheet.get(0, 0), Some(&Cell::Empty));
}

#[test]
fn date_formatted_cells_read_as_dates() {
    let mut xlsx = XlsxWorkbook::new();
    let worksheet = xlsx.add_worksheet();
    worksheet.set_name("PAAP").unwrap();
    let date = Format::new().set_num_format("dd/mm/yyyy");
    for (col, value) in PAAP_PRODUCT.iter().enumerate() {
        match col {
            7 => worksheet.write_number_with_format(2, 7, 45323.0, &date),
            8 => worksheet.write_number_with_format(2, 8, 45352.0, &date),
            _ => worksheet.write_string(2, col as u16, *value),
        }
        .unwrap();
    }
    let bytes = xlsx.save_to_buffer().unwrap();

    let workbook = decode_workbook(&bytes).unwrap();
    let sheet = workbook.primary().unwrap();
    assert_eq!(sheet.get(2, 7), Some(&Cell::text("01/02/2024")));
    assert_eq!(sheet.get(2, 8), Some(&Cell::text("01/03/2024")));
    let report = validate_sheet(sheet, SheetKind::Paap);
    assert_eq!(report.get(2, 7), None);
    assert_eq!(report.get(2, 8), None);
}

#[test]
fn load_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("paap.xlsx");
    std::fs::write(&path, encode_workbook(&paap_workbook(&[&PAAP_WORKS])).unwrap()).unwrap();

    let workbook = load_workbook(&path).unwrap();
    assert_eq!(workbook.len(), 2);
    assert_eq!(workbook.primary().unwrap().filled_row_count(), 1);
    assert!(load_workbook(dir.path().join("missing.xlsx")).is_err());
}

#[test]
fn csv_export_of_primary_sheet() {
    let workbook = paap_workbook(&[&PAAP_PRODUCT]);
    let csv = to_csv(workbook.primary().unwrap());
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("Cod obiectiv,Categorie"));
    assert_eq!(lines[1], ",,,,,,,,,");
    assert!(lines[2].contains("\"1.000,00\""));
}
