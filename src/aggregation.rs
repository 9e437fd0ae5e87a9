//! Category totals derived from the primary sheet.
//!
//! The totals sheet is never patched incrementally: every recompute rescans
//! all data rows and overwrites the same eight cells.

use crate::cell::Cell;
use crate::numbers::NumberStyle;
use crate::rules::SheetKind;
use crate::spreadsheet::{PRIMARY_SHEET, Sheet, TOTALS_SHEET, Workbook};
use log::debug;
use serde::Serialize;

/// First row on the totals sheet receiving derived values (rows 2..=5).
pub const TOTALS_FIRST_ROW: usize = 2;
pub const TOTALS_LABEL_COL: usize = 0;
pub const TOTALS_VALUE_COL: usize = 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Category {
    /// Produse
    P,
    /// Servicii
    S,
    /// Lucrari
    L,
}

impl Category {
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "P" => Some(Category::P),
            "S" => Some(Category::S),
            "L" => Some(Category::L),
            _ => None,
        }
    }
}

/// Where a page keeps its category and amount columns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AggregationLayout {
    pub category_col: usize,
    pub value_col: usize,
    pub style: NumberStyle,
}

impl SheetKind {
    /// `None` for pages without a totals sheet.
    pub fn aggregation(self) -> Option<AggregationLayout> {
        match self {
            SheetKind::Paap => Some(AggregationLayout {
                category_col: 1,
                value_col: 5,
                style: NumberStyle::GroupedComma,
            }),
            SheetKind::Achizitii => Some(AggregationLayout {
                category_col: 2,
                value_col: 4,
                style: NumberStyle::Comma,
            }),
            SheetKind::Financiar => None,
        }
    }

    /// Index of the derived sheet that users may not edit or extend.
    pub fn totals_sheet(self) -> Option<usize> {
        self.aggregation().map(|_| TOTALS_SHEET)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct AggregatedTotals {
    pub products: f64,
    pub services: f64,
    pub works: f64,
    pub grand_total: f64,
}

impl AggregatedTotals {
    fn add(&mut self, category: Category, amount: f64) {
        match category {
            Category::P => self.products += amount,
            Category::S => self.services += amount,
            Category::L => self.works += amount,
        }
        self.grand_total = self.products + self.services + self.works;
    }

    /// Label/amount pairs in the order they appear on the totals sheet.
    pub fn lines(&self) -> [(&'static str, f64); 4] {
        [
            ("P", self.products),
            ("S", self.services),
            ("L", self.works),
            ("TOTAL", self.grand_total),
        ]
    }
}

/// Sums the amount column per category over all data rows. Rows with an
/// unknown category are skipped; unparsable amounts count as zero.
pub fn compute_totals(sheet: &Sheet, layout: AggregationLayout) -> AggregatedTotals {
    let mut totals = AggregatedTotals::default();
    for (_, row) in sheet.data_rows() {
        let code = row
            .get(layout.category_col)
            .map(Cell::display_value)
            .unwrap_or_default();
        let Some(category) = Category::from_code(&code) else {
            continue;
        };
        let amount = row
            .get(layout.value_col)
            .map(|c| layout.style.amount_of(c))
            .unwrap_or(0.0);
        totals.add(category, amount);
    }
    totals
}

/// Overwrites rows 2..=5, columns 0..=1 of the totals sheet.
pub fn write_totals(sheet: &mut Sheet, totals: &AggregatedTotals, style: NumberStyle) {
    for (offset, (label, amount)) in totals.lines().iter().enumerate() {
        let row = TOTALS_FIRST_ROW + offset;
        sheet.set(row, TOTALS_LABEL_COL, Cell::text(*label));
        sheet.set(row, TOTALS_VALUE_COL, Cell::Text(style.format(*amount)));
    }
}

/// Recomputes totals in place. Returns `None` when the page has no totals
/// or the workbook lacks the primary or totals sheet.
pub fn recompute_in_place(workbook: &mut Workbook, kind: SheetKind) -> Option<AggregatedTotals> {
    let layout = kind.aggregation()?;
    let totals = compute_totals(workbook.sheet(PRIMARY_SHEET)?, layout);
    let target = workbook.sheet_mut(TOTALS_SHEET)?;
    write_totals(target, &totals, layout.style);
    debug!(
        "recomputed totals for `{}`: P={} S={} L={} total={}",
        target.name, totals.products, totals.services, totals.works, totals.grand_total
    );
    Some(totals)
}

/// Pure form of [`recompute_in_place`].
pub fn recompute(mut workbook: Workbook, kind: SheetKind) -> Workbook {
    recompute_in_place(&mut workbook, kind);
    workbook
}
