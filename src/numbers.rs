//! Locale handling for amount columns.
//!
//! Pages do not agree on how amounts are written: the PAAP page groups
//! thousands with `.` and uses `,` for decimals, the acquisitions report uses
//! a bare `,` decimal and the financial report uses `.`. Each page keeps its
//! own style.

use crate::cell::Cell;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NumberStyle {
    /// `1.234,56`
    GroupedComma,
    /// `1234,56`
    Comma,
    /// `1234.56`
    Dot,
}

impl NumberStyle {
    /// Parses a locale-formatted amount. Returns `None` when the text is not
    /// a finite number.
    pub fn parse(self, text: &str) -> Option<f64> {
        let text = text.trim();
        let normalized = match self {
            NumberStyle::GroupedComma => text.replace('.', "").replace(',', "."),
            NumberStyle::Comma => text.replace(',', "."),
            NumberStyle::Dot => text.to_string(),
        };
        normalized.parse::<f64>().ok().filter(|v| v.is_finite())
    }

    /// Amount carried by a cell; anything unparsable counts as zero.
    pub fn amount_of(self, cell: &Cell) -> f64 {
        match cell {
            Cell::Number(n) if n.is_finite() => *n,
            Cell::Number(_) | Cell::Empty => 0.0,
            Cell::Text(s) => self.parse(s).unwrap_or(0.0),
        }
    }

    /// Formats with exactly two fraction digits.
    pub fn format(self, value: f64) -> String {
        let cents = (value * 100.0).round() as i64;
        let sign = if cents < 0 { "-" } else { "" };
        let cents = cents.unsigned_abs();
        let whole = (cents / 100).to_string();
        let frac = cents % 100;
        match self {
            NumberStyle::GroupedComma => format!("{sign}{},{frac:02}", group_thousands(&whole)),
            NumberStyle::Comma => format!("{sign}{whole},{frac:02}"),
            NumberStyle::Dot => format!("{sign}{whole}.{frac:02}"),
        }
    }
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(ch);
    }
    out
}
