use serde::{Deserialize, Serialize};
use std::fmt;

/// A single spreadsheet value.
///
/// The model enforces no column types; rules are applied afterwards by
/// position (see [`crate::rules`]).
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Default)]
pub enum Cell {
    Text(String),
    Number(f64),
    #[default]
    Empty,
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Number(_) => false,
        }
    }

    /// Trimmed textual form used by the validation rules and by filters.
    pub fn display_value(&self) -> String {
        match self {
            Cell::Text(s) => s.trim().to_string(),
            Cell::Number(n) => format_plain_number(*n),
            Cell::Empty => String::new(),
        }
    }

    /// Parses user input from the editor into a cell. Input is always kept
    /// as text so that locale-formatted amounts survive untouched.
    pub fn from_input(input: &str) -> Self {
        if input.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(input.to_string())
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_value())
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::from_input(value)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

// Whole numbers print without a fractional part ("12", not "12.0") so that
// numeric cells coming out of the codec still satisfy integer patterns.
fn format_plain_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// Builds a row of cells from string literals; empty strings become
/// [`Cell::Empty`].
pub fn row_from_strs(values: &[&str]) -> Vec<Cell> {
    values.iter().map(|v| Cell::from_input(v)).collect()
}
