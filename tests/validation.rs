mod common;

use common::*;
use paap_sheets::cell::Cell;
use paap_sheets::rules::{SheetKind, validate, validate_rows, validate_sheet};

fn paap(col: usize, value: &str) -> Option<String> {
    validate(&Cell::text(value), col, 2, SheetKind::Paap, None)
}

#[test]
fn header_rows_never_fail() {
    for row in 0..2 {
        for col in 0..10 {
            let cell = Cell::text("definitely wrong");
            assert_eq!(validate(&cell, col, row, SheetKind::Paap, None), None);
        }
    }
}

#[test]
fn valid_paap_rows_pass() {
    let workbook = paap_workbook(&[&PAAP_PRODUCT, &PAAP_SERVICE, &PAAP_WORKS]);
    let report = validate_sheet(workbook.primary().unwrap(), SheetKind::Paap);
    assert!(report.is_empty(), "{:?}", report);
}

#[test]
fn date_shape_only() {
    assert_eq!(paap(7, "31/02/2024"), None);
    assert!(paap(7, "2024-02-01").is_some());
    assert!(paap(7, "1/2/2024").is_some());
}

#[test]
fn grouped_amounts() {
    assert_eq!(paap(5, "1.234,56"), None);
    assert_eq!(paap(5, "999"), None);
    assert_eq!(paap(5, "12.345.678,9"), None);
    assert!(paap(5, "1234,56").is_some());
    assert!(paap(5, "1.234.56").is_some());
    assert!(paap(5, "1,234.56").is_some());
}

#[test]
fn cpv_codes() {
    assert_eq!(paap(4, "45000000-7"), None);
    assert!(paap(4, "45000000").is_some());
    assert!(paap(4, "4500000-7").is_some());
}

#[test]
fn procedure_tokens() {
    for token in ["PP", "AD", "CD", "LD", "NC"] {
        assert_eq!(paap(2, token), None, "{}", token);
    }
    assert!(paap(2, "pp").is_some());
    assert!(paap(2, "XX").is_some());
}

#[test]
fn blank_ruled_cells_are_flagged() {
    let message = validate(&Cell::Empty, 0, 2, SheetKind::Paap, None).unwrap();
    assert!(message.starts_with("Cod obiectiv:"), "{}", message);
    // Observatii carries no rule.
    assert_eq!(validate(&Cell::Empty, 9, 2, SheetKind::Paap, None), None);
}

#[test]
fn internal_code_echoes_category() {
    let row = paap_workbook(&[&PAAP_PRODUCT]).primary().unwrap().rows[2].clone();
    assert_eq!(
        validate(&Cell::text("ACP01"), 3, 2, SheetKind::Paap, Some(row.as_slice())),
        None
    );
    let message = validate(&Cell::text("ACS01"), 3, 2, SheetKind::Paap, Some(row.as_slice())).unwrap();
    assert!(message.starts_with("Cod intern:"), "{}", message);

    // Category comparison ignores case.
    let mut lower = row.clone();
    lower[1] = Cell::text("p");
    assert_eq!(
        validate(&Cell::text("ACP01"), 3, 2, SheetKind::Paap, Some(lower.as_slice())),
        None
    );

    // Shape is still checked first.
    assert!(validate(&Cell::text("AP1"), 3, 2, SheetKind::Paap, Some(row.as_slice())).is_some());
}

#[test]
fn changing_category_flags_internal_code() {
    let mut service = PAAP_SERVICE;
    service[1] = "L";
    let workbook = paap_workbook(&[&PAAP_PRODUCT, &service]);
    let report = validate_sheet(workbook.primary().unwrap(), SheetKind::Paap);
    assert_eq!(report.len(), 1);
    assert!(report.get(3, 3).is_some());
}

#[test]
fn achizitii_rules_differ_from_paap() {
    let kind = SheetKind::Achizitii;
    let check = |col: usize, value: &str| validate(&Cell::text(value), col, 2, kind, None);

    assert_eq!(check(4, "1234,56"), None);
    assert!(check(4, "1.234,56").is_some());
    assert_eq!(check(0, "12"), None);
    assert!(check(0, "12a").is_some());
    assert_eq!(check(7, "F"), None);
    assert!(check(7, "X").is_some());
}

#[test]
fn financiar_uses_dot_amounts() {
    let kind = SheetKind::Financiar;
    let check = |col: usize, value: &str| validate(&Cell::text(value), col, 2, kind, None);

    assert_eq!(check(5, "1234.56"), None);
    assert!(check(5, "1234,56").is_some());
    assert_eq!(check(3, "FV-000123"), None);
    assert!(check(3, "FV123").is_some());
    assert_eq!(check(2, "E"), None);
    assert!(check(2, "X").is_some());
}

#[test]
fn filtered_validation_skips_hidden_rows() {
    let mut bad = PAAP_SERVICE;
    bad[4] = "nope";
    let workbook = paap_workbook(&[&PAAP_PRODUCT, &bad]);
    let sheet = workbook.primary().unwrap();

    assert_eq!(validate_sheet(sheet, SheetKind::Paap).len(), 1);
    assert!(validate_rows(sheet, SheetKind::Paap, [0, 1, 2]).is_empty());
    assert_eq!(validate_rows(sheet, SheetKind::Paap, [3]).len(), 1);
}

#[test]
fn validation_is_repeatable() {
    let mut bad = PAAP_WORKS;
    bad[7] = "soon";
    let workbook = paap_workbook(&[&PAAP_PRODUCT, &bad]);
    let sheet = workbook.primary().unwrap();
    assert_eq!(
        validate_sheet(sheet, SheetKind::Paap),
        validate_sheet(sheet, SheetKind::Paap)
    );
}
