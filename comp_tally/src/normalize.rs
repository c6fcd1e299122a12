//! Numeric coercion of the compensation columns.

use log::debug;

use crate::config::*;

/// Converts a cell to a number.
///
/// Numbers are kept (except NaN and infinities, which count as missing). Any other
/// content is read as text: everything that is not an ASCII digit or a decimal point is
/// dropped and the rest is parsed. Whatever cannot be parsed becomes 0.
///
/// ```
/// use comp_tally::CellValue;
/// use comp_tally::normalize::coerce_cell;
///
/// assert_eq!(coerce_cell(&CellValue::from("$75,000")), 75000.0);
/// assert_eq!(coerce_cell(&CellValue::from("n/a")), 0.0);
/// assert_eq!(coerce_cell(&CellValue::Empty), 0.0);
/// ```
pub fn coerce_cell(cell: &CellValue) -> f64 {
    match cell {
        CellValue::Number(x) if x.is_finite() => *x,
        CellValue::Number(_) | CellValue::Empty => 0.0,
        other => coerce_text(&other.as_text()),
    }
}

fn coerce_text(s: &str) -> f64 {
    let stripped: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    match stripped.parse::<f64>() {
        Ok(x) if x.is_finite() => x,
        _ => 0.0,
    }
}

/// Replaces every cell of the column by its numeric value.
pub fn coerce_column(column: &mut Column) {
    for v in column.values.iter_mut() {
        if !matches!(v, CellValue::Number(x) if x.is_finite()) {
            *v = CellValue::Number(coerce_cell(v));
        }
    }
}

impl ColumnMatcher {
    /// True if the column with this name is a compensation column.
    pub fn matches(&self, name: &str) -> bool {
        let fold = |s: &str| {
            if self.case_sensitive {
                s.to_string()
            } else {
                s.to_lowercase()
            }
        };
        match &self.mode {
            MatchMode::Explicit(names) => names.iter().any(|n| n == name),
            MatchMode::Exact => {
                let name = fold(name);
                self.terms.iter().any(|t| fold(t) == name)
            }
            MatchMode::Substring => {
                let name = fold(name);
                self.terms.iter().any(|t| name.contains(&fold(t)))
            }
        }
    }

    /// The compensation columns of the table, in table order.
    pub fn matching_columns(&self, table: &Table) -> Vec<String> {
        table
            .columns()
            .iter()
            .filter(|c| self.matches(&c.name))
            .map(|c| c.name.clone())
            .collect()
    }
}

/// Coerces all the compensation columns of a table to numbers.
///
/// The other columns are returned untouched. This never fails, and normalizing an
/// already normalized table does not change it.
pub fn normalize_table(table: &Table, matcher: &ColumnMatcher) -> Table {
    let mut res = table.clone();
    let targets = matcher.matching_columns(table);
    debug!("normalize_table: coercing columns {:?}", targets);
    for name in targets.iter() {
        if let Some(c) = res.column_mut(name) {
            coerce_column(c);
        }
    }
    res
}
