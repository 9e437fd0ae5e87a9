//! Position-specific cell rules.
//!
//! Every page kind carries its own `column -> rule` table. The acquisitions
//! and financial reports disagree on amount formats, so their tables stay
//! separate even where columns look alike.

use crate::cell::Cell;
use crate::spreadsheet::{HEADER_ROWS, Sheet};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

lazy_static! {
    static ref OBJECT_CODE_REGEX: Regex = Regex::new(r"^[A-Z]{1,3}\d{1,6}$").unwrap();
    static ref INTERNAL_CODE_REGEX: Regex = Regex::new(r"^[A-Z]{3}\d{2}$").unwrap();
    static ref CPV_REGEX: Regex = Regex::new(r"^\d{8}-\d$").unwrap();
    static ref GROUPED_COMMA_AMOUNT_REGEX: Regex =
        Regex::new(r"^\d{1,3}(\.\d{3})*(,\d{1,2})?$").unwrap();
    static ref COMMA_AMOUNT_REGEX: Regex = Regex::new(r"^\d+(,\d{1,2})?$").unwrap();
    static ref DOT_AMOUNT_REGEX: Regex = Regex::new(r"^\d+(\.\d{1,2})?$").unwrap();
    static ref DOTTED_NUMBER_REGEX: Regex = Regex::new(r"^\d+(\.\d+)*$").unwrap();
    // Shape only: 31/02/2024 passes.
    static ref DATE_REGEX: Regex = Regex::new(r"^\d{2}/\d{2}/\d{4}$").unwrap();
    static ref INTEGER_REGEX: Regex = Regex::new(r"^\d+$").unwrap();
    static ref DOCUMENT_NUMBER_REGEX: Regex = Regex::new(r"^[A-Z]{2}-\d{6}$").unwrap();
}

/// The page a workbook belongs to. Decides which rule table, totals layout
/// and lock column apply.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SheetKind {
    #[default]
    Paap,
    Achizitii,
    Financiar,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pattern {
    ObjectCode,
    InternalCode,
    Cpv,
    GroupedCommaAmount,
    CommaAmount,
    DotAmount,
    DottedNumber,
    Date,
    Integer,
    DocumentNumber,
}

impl Pattern {
    fn regex(self) -> &'static Regex {
        match self {
            Pattern::ObjectCode => &*OBJECT_CODE_REGEX,
            Pattern::InternalCode => &*INTERNAL_CODE_REGEX,
            Pattern::Cpv => &*CPV_REGEX,
            Pattern::GroupedCommaAmount => &*GROUPED_COMMA_AMOUNT_REGEX,
            Pattern::CommaAmount => &*COMMA_AMOUNT_REGEX,
            Pattern::DotAmount => &*DOT_AMOUNT_REGEX,
            Pattern::DottedNumber => &*DOTTED_NUMBER_REGEX,
            Pattern::Date => &*DATE_REGEX,
            Pattern::Integer => &*INTEGER_REGEX,
            Pattern::DocumentNumber => &*DOCUMENT_NUMBER_REGEX,
        }
    }

    fn expectation(self) -> &'static str {
        match self {
            Pattern::ObjectCode => "expected 1-3 capital letters followed by digits (e.g. C123)",
            Pattern::InternalCode => "expected 3 capital letters and 2 digits (e.g. ACP07)",
            Pattern::Cpv => "expected a CPV code like 45000000-7",
            Pattern::GroupedCommaAmount => "expected an amount like 1.234,56",
            Pattern::CommaAmount => "expected an amount like 1234,56",
            Pattern::DotAmount => "expected an amount like 1234.56",
            Pattern::DottedNumber => "expected dotted numbering like 1.2.3",
            Pattern::Date => "expected a date as DD/MM/YYYY",
            Pattern::Integer => "expected a whole number",
            Pattern::DocumentNumber => "expected a document number like FV-000123",
        }
    }

    pub fn is_match(self, value: &str) -> bool {
        self.regex().is_match(value)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnRule {
    /// Exact, case-sensitive token from a fixed set.
    OneOf(&'static [&'static str]),
    Matches(Pattern),
    /// Pattern plus: the third character must equal the whole value of
    /// `sibling_col` on the same row, ignoring case.
    MatchesAndEchoes { pattern: Pattern, sibling_col: usize },
}

impl ColumnRule {
    /// `Err` carries the reason shown next to the cell.
    pub fn check(&self, value: &str, sibling_row: Option<&[Cell]>) -> Result<(), String> {
        match self {
            ColumnRule::OneOf(allowed) => {
                if allowed.contains(&value) {
                    Ok(())
                } else {
                    Err(format!("expected one of {}", allowed.join(", ")))
                }
            }
            ColumnRule::Matches(pattern) => {
                if pattern.is_match(value) {
                    Ok(())
                } else {
                    Err(pattern.expectation().to_string())
                }
            }
            ColumnRule::MatchesAndEchoes {
                pattern,
                sibling_col,
            } => {
                if !pattern.is_match(value) {
                    return Err(pattern.expectation().to_string());
                }
                let Some(row) = sibling_row else {
                    return Ok(());
                };
                let sibling = row
                    .get(*sibling_col)
                    .map(Cell::display_value)
                    .unwrap_or_default();
                let third = value.chars().nth(2).map(String::from).unwrap_or_default();
                if third.eq_ignore_ascii_case(&sibling) {
                    Ok(())
                } else {
                    Err(format!(
                        "third character `{}` does not match column {} (`{}`)",
                        third,
                        Sheet::col_to_letter(*sibling_col),
                        sibling
                    ))
                }
            }
        }
    }
}

static EMPTY_CELL: Cell = Cell::Empty;

const CATEGORIES: &[&str] = &["P", "S", "L"];

const PAAP_RULES: &[(usize, ColumnRule)] = &[
    (0, ColumnRule::Matches(Pattern::ObjectCode)),
    (1, ColumnRule::OneOf(CATEGORIES)),
    (2, ColumnRule::OneOf(&["PP", "AD", "CD", "LD", "NC"])),
    (
        3,
        ColumnRule::MatchesAndEchoes {
            pattern: Pattern::InternalCode,
            sibling_col: 1,
        },
    ),
    (4, ColumnRule::Matches(Pattern::Cpv)),
    (5, ColumnRule::Matches(Pattern::GroupedCommaAmount)),
    (6, ColumnRule::Matches(Pattern::DottedNumber)),
    (7, ColumnRule::Matches(Pattern::Date)),
    (8, ColumnRule::Matches(Pattern::Date)),
];

const ACHIZITII_RULES: &[(usize, ColumnRule)] = &[
    (0, ColumnRule::Matches(Pattern::Integer)),
    (1, ColumnRule::Matches(Pattern::ObjectCode)),
    (2, ColumnRule::OneOf(CATEGORIES)),
    (3, ColumnRule::Matches(Pattern::Cpv)),
    (4, ColumnRule::Matches(Pattern::CommaAmount)),
    (5, ColumnRule::Matches(Pattern::CommaAmount)),
    (6, ColumnRule::Matches(Pattern::Date)),
    (7, ColumnRule::OneOf(&["F", "D", "P"])),
];

const FINANCIAR_RULES: &[(usize, ColumnRule)] = &[
    (0, ColumnRule::Matches(Pattern::Integer)),
    (1, ColumnRule::Matches(Pattern::DottedNumber)),
    (2, ColumnRule::OneOf(&["E", "N"])),
    (3, ColumnRule::Matches(Pattern::DocumentNumber)),
    (4, ColumnRule::Matches(Pattern::Date)),
    (5, ColumnRule::Matches(Pattern::DotAmount)),
    (6, ColumnRule::Matches(Pattern::DotAmount)),
];

impl SheetKind {
    pub fn rules(self) -> &'static [(usize, ColumnRule)] {
        match self {
            SheetKind::Paap => PAAP_RULES,
            SheetKind::Achizitii => ACHIZITII_RULES,
            SheetKind::Financiar => FINANCIAR_RULES,
        }
    }

    pub fn rule_for(self, col: usize) -> Option<&'static ColumnRule> {
        self.rules().iter().find(|(c, _)| *c == col).map(|(_, r)| r)
    }

    pub fn column_labels(self) -> &'static [&'static str] {
        match self {
            SheetKind::Paap => &[
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
            ],
            SheetKind::Achizitii => &[
                "Nr. crt",
                "Cod achizitie",
                "Categorie",
                "Cod CPV",
                "Valoare estimata",
                "Valoare contractata",
                "Data contract",
                "Stadiu",
            ],
            SheetKind::Financiar => &[
                "Nr. crt",
                "Linie bugetara",
                "Eligibilitate",
                "Nr. document",
                "Data document",
                "Suma bugetata",
                "Suma cheltuita",
                "Observatii",
            ],
        }
    }

    pub fn column_label(self, col: usize) -> String {
        self.column_labels()
            .get(col)
            .map(|l| l.to_string())
            .unwrap_or_else(|| format!("Column {}", Sheet::col_to_letter(col)))
    }

    /// Column that stays editable on existing rows once the file is locked.
    pub fn lock_editable_column(self) -> usize {
        match self {
            SheetKind::Paap => 9,
            SheetKind::Achizitii => 7,
            SheetKind::Financiar => 7,
        }
    }
}

impl fmt::Display for SheetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SheetKind::Paap => "paap",
            SheetKind::Achizitii => "achizitii",
            SheetKind::Financiar => "financiar",
        };
        f.write_str(name)
    }
}

impl FromStr for SheetKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "paap" => Ok(SheetKind::Paap),
            "achizitii" => Ok(SheetKind::Achizitii),
            "financiar" => Ok(SheetKind::Financiar),
            other => Err(format!("unknown sheet kind `{}`", other)),
        }
    }
}

/// Checks one cell. Header rows and columns without a rule yield `None`.
pub fn validate(
    cell: &Cell,
    col: usize,
    row: usize,
    kind: SheetKind,
    sibling_row: Option<&[Cell]>,
) -> Option<String> {
    if row < HEADER_ROWS {
        return None;
    }
    let rule = kind.rule_for(col)?;
    let value = cell.display_value();
    rule.check(&value, sibling_row)
        .err()
        .map(|reason| format!("{}: {}", kind.column_label(col), reason))
}

/// Per-cell messages, keyed by `(row, col)`. Always rebuilt from scratch.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ValidationReport {
    errors: BTreeMap<(usize, usize), String>,
}

impl ValidationReport {
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&str> {
        self.errors.get(&(row, col)).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&(usize, usize), &String)> {
        self.errors.iter()
    }

    fn check_row(&mut self, row_cells: &[Cell], row: usize, kind: SheetKind) {
        for (col, _) in kind.rules() {
            let cell = row_cells.get(*col).unwrap_or(&EMPTY_CELL);
            if let Some(message) = validate(cell, *col, row, kind, Some(row_cells)) {
                self.errors.insert((row, *col), message);
            }
        }
    }
}

/// Validates every data row of `sheet`.
pub fn validate_sheet(sheet: &Sheet, kind: SheetKind) -> ValidationReport {
    validate_rows(sheet, kind, HEADER_ROWS..sheet.height())
}

/// Validates only the given rows, e.g. the ones left visible by filters.
pub fn validate_rows(
    sheet: &Sheet,
    kind: SheetKind,
    rows: impl IntoIterator<Item = usize>,
) -> ValidationReport {
    let mut report = ValidationReport::default();
    for row in rows {
        if let Some(cells) = sheet.rows.get(row) {
            report.check_row(cells, row, kind);
        }
    }
    report
}
