// ********* Input data structures ***********

use std::collections::HashSet;
use std::error::Error;
use std::fmt::Display;

/// The content of one cell of a table.
///
/// Readers produce whatever they find in the source. Only the columns that take
/// part in a numeric operation are coerced to `Number`.
#[derive(PartialEq, Debug, Clone)]
pub enum CellValue {
    /// A missing value (blank cell, missing field, unmatched side of a join).
    Empty,
    Number(f64),
    Text(String),
    Bool(bool),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    pub fn is_number(&self) -> bool {
        matches!(self, CellValue::Number(_))
    }

    /// The textual rendering of the cell, as it would appear in an exported file.
    /// Empty cells render as the empty string.
    pub fn as_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Number(x) => x.to_string(),
            CellValue::Text(s) => s.clone(),
            CellValue::Bool(b) => b.to_string(),
        }
    }
}

impl From<f64> for CellValue {
    fn from(x: f64) -> Self {
        CellValue::Number(x)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

#[derive(PartialEq, Debug, Clone)]
pub struct Column {
    pub name: String,
    pub values: Vec<CellValue>,
}

impl Column {
    pub fn new(name: &str, values: Vec<CellValue>) -> Column {
        Column {
            name: name.to_string(),
            values,
        }
    }

    pub fn numbers(name: &str, values: &[f64]) -> Column {
        Column::new(name, values.iter().map(|x| CellValue::Number(*x)).collect())
    }

    pub fn texts(name: &str, values: &[&str]) -> Column {
        Column::new(name, values.iter().map(|s| CellValue::from(*s)).collect())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// True if every cell of the column already holds a number.
    pub fn is_numeric(&self) -> bool {
        self.values.iter().all(|v| v.is_number())
    }
}

/// An ordered collection of named, row-aligned columns.
///
/// Invariants (checked at construction):
/// - column names are unique
/// - all the columns have the same length
#[derive(PartialEq, Debug, Clone, Default)]
pub struct Table {
    columns: Vec<Column>,
}

impl Table {
    pub fn new(columns: Vec<Column>) -> Result<Table, TallyError> {
        let mut seen: HashSet<&str> = HashSet::new();
        for c in columns.iter() {
            if !seen.insert(c.name.as_str()) {
                return Err(TallyError::InvalidTable(format!(
                    "duplicate column name {:?}",
                    c.name
                )));
            }
        }
        if let Some(first) = columns.first() {
            if let Some(bad) = columns.iter().find(|c| c.len() != first.len()) {
                return Err(TallyError::InvalidTable(format!(
                    "column {:?} has {} rows, expected {}",
                    bad.name,
                    bad.len(),
                    first.len()
                )));
            }
        }
        Ok(Table { columns })
    }

    pub fn empty() -> Table {
        Table::default()
    }

    pub fn row_count(&self) -> usize {
        self.columns.first().map(|c| c.len()).unwrap_or(0)
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.name == name)
    }

    /// Adds a column at the end, or replaces the column with the same name in place.
    pub fn set_column(&mut self, column: Column) -> Result<(), TallyError> {
        let others = self.columns.iter().filter(|c| c.name != column.name).count();
        if others > 0 && column.len() != self.row_count() {
            return Err(TallyError::InvalidTable(format!(
                "column {:?} has {} rows, expected {}",
                column.name,
                column.len(),
                self.row_count()
            )));
        }
        if let Some(existing) = self.column_mut(&column.name) {
            *existing = column;
        } else {
            self.columns.push(column);
        }
        Ok(())
    }

    /// A projection of the table on the given columns, in the requested order.
    pub fn select_columns(&self, names: &[String]) -> Result<Table, TallyError> {
        let mut res: Vec<Column> = Vec::new();
        for name in names {
            let c = self
                .column(name)
                .ok_or_else(|| TallyError::MissingColumn(name.clone()))?;
            res.push(c.clone());
        }
        Table::new(res)
    }

    /// The cells of one row, in column order.
    pub fn row(&self, idx: usize) -> Option<Vec<&CellValue>> {
        if idx >= self.row_count() {
            return None;
        }
        Some(self.columns.iter().map(|c| &c.values[idx]).collect())
    }

    /// All the rows as named fields, in column order.
    pub fn rows(&self) -> Vec<Vec<(String, CellValue)>> {
        (0..self.row_count())
            .map(|idx| {
                self.columns
                    .iter()
                    .map(|c| (c.name.clone(), c.values[idx].clone()))
                    .collect()
            })
            .collect()
    }
}

/// How the names of the columns are compared against the vocabulary.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum MatchMode {
    /// The column name contains one of the terms.
    /// This is ambiguous: a column named `Bonus Points` is treated as compensation.
    Substring,
    /// The column name is exactly one of the terms.
    Exact,
    /// Only the listed column names are considered. The vocabulary is ignored.
    Explicit(Vec<String>),
}

/// Decides which columns are "compensation-like".
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ColumnMatcher {
    pub terms: Vec<String>,
    pub mode: MatchMode,
    pub case_sensitive: bool,
}

impl ColumnMatcher {
    pub const DEFAULT_TERMS: [&'static str; 6] = [
        "Salary",
        "Bonus",
        "Benefits",
        "Stock",
        "Retirement",
        "Compensation",
    ];

    /// Case-insensitive substring matching over a wider vocabulary.
    pub const LENIENT_TERMS: [&'static str; 7] = [
        "salary",
        "wage",
        "pay",
        "bonus",
        "benefit",
        "compensation",
        "total",
    ];

    /// The three usual compensation columns, matched exactly without regard to case.
    pub const STANDARD_TERMS: [&'static str; 3] = ["Salary", "Bonus", "Benefits"];

    pub fn lenient() -> ColumnMatcher {
        ColumnMatcher {
            terms: ColumnMatcher::LENIENT_TERMS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            mode: MatchMode::Substring,
            case_sensitive: false,
        }
    }

    /// Sums exactly the `Salary`, `Bonus` and `Benefits` columns, whatever their case.
    pub fn standard() -> ColumnMatcher {
        ColumnMatcher {
            terms: ColumnMatcher::STANDARD_TERMS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            mode: MatchMode::Exact,
            case_sensitive: false,
        }
    }

    /// True if the table has all the columns of the `standard` preset.
    pub fn has_standard_columns(table: &Table) -> bool {
        let names: Vec<String> = table
            .column_names()
            .iter()
            .map(|n| n.to_lowercase())
            .collect();
        ColumnMatcher::STANDARD_TERMS
            .iter()
            .all(|t| names.contains(&t.to_lowercase()))
    }

    pub fn explicit(names: &[String]) -> ColumnMatcher {
        ColumnMatcher {
            mode: MatchMode::Explicit(names.to_vec()),
            ..ColumnMatcher::default()
        }
    }
}

impl Default for ColumnMatcher {
    fn default() -> Self {
        ColumnMatcher {
            terms: ColumnMatcher::DEFAULT_TERMS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            mode: MatchMode::Substring,
            case_sensitive: true,
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum JoinKind {
    Inner,
    /// Full outer join.
    Outer,
    Left,
    Right,
}

impl JoinKind {
    pub fn parse(s: &str) -> Option<JoinKind> {
        match s.to_lowercase().as_str() {
            "inner" => Some(JoinKind::Inner),
            "outer" | "full" => Some(JoinKind::Outer),
            "left" => Some(JoinKind::Left),
            "right" => Some(JoinKind::Right),
            _ => None,
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct AggregationRules {
    pub matcher: ColumnMatcher,
    /// The name of the derived column.
    pub derived_column: String,
    /// The column used for the per-group breakdown, if present in the table.
    pub group_column: Option<String>,
    /// Computes the per-column totals.
    pub breakdown: bool,
}

impl Default for AggregationRules {
    fn default() -> Self {
        AggregationRules {
            matcher: ColumnMatcher::default(),
            derived_column: AggregationRules::DEFAULT_DERIVED_COLUMN.to_string(),
            group_column: Some(AggregationRules::DEFAULT_GROUP_COLUMN.to_string()),
            breakdown: true,
        }
    }
}

impl AggregationRules {
    pub const DEFAULT_DERIVED_COLUMN: &'static str = "Total Compensation";
    pub const DEFAULT_GROUP_COLUMN: &'static str = "Department";
    /// The label of the last entry of the per-column breakdown.
    pub const BREAKDOWN_TOTAL: &'static str = "Total";
}

// ******** Output data structures *********

#[derive(PartialEq, Debug, Clone)]
pub struct Summary {
    pub grand_total: f64,
    pub average: f64,
    pub row_count: usize,
}

/// Statistics of the derived column for one value of the grouping column.
#[derive(PartialEq, Debug, Clone)]
pub struct GroupStats {
    pub group: String,
    pub sum: f64,
    pub mean: f64,
    pub count: usize,
}

#[derive(PartialEq, Debug, Clone)]
pub struct Aggregation {
    /// The working table with the coerced selected columns and the derived column.
    pub table: Table,
    /// The columns that were summed, in selection order.
    pub selected: Vec<String>,
    pub summary: Summary,
    /// Sorted by decreasing sum. `None` if the grouping column is absent.
    pub groups: Option<Vec<GroupStats>>,
    /// One total per selected column, then the grand total.
    pub breakdown: Option<Vec<(String, f64)>>,
}

/// Conditions that do not stop an operation but that the caller should know about.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum Warning {
    /// The sources did not have the same columns when stacking them.
    /// For each source label, the columns that were dropped.
    ColumnMismatch { dropped: Vec<(String, Vec<String>)> },
    /// The join key has repeated values: matching rows get multiplied.
    DuplicateKeys { side: String, keys: Vec<String> },
    /// The derived column was part of the selection and has been ignored.
    DerivedColumnSelected(String),
}

impl Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::ColumnMismatch { dropped } => {
                write!(f, "column sets differ, only common columns are kept")?;
                for (label, cols) in dropped.iter().filter(|(_, cols)| !cols.is_empty()) {
                    write!(f, "; dropped from {}: {}", label, cols.join(", "))?;
                }
                Ok(())
            }
            Warning::DuplicateKeys { side, keys } => write!(
                f,
                "duplicate join keys in {}: {} (rows may be multiplied)",
                side,
                keys.join(", ")
            ),
            Warning::DerivedColumnSelected(name) => write!(
                f,
                "column {:?} is the derived column and cannot be part of its own sum",
                name
            ),
        }
    }
}

/// A successful result, possibly with some warnings attached.
#[derive(PartialEq, Debug, Clone)]
pub struct Outcome<T> {
    pub value: T,
    pub warnings: Vec<Warning>,
}

impl<T> Outcome<T> {
    pub fn ok(value: T) -> Outcome<T> {
        Outcome {
            value,
            warnings: Vec::new(),
        }
    }

    pub fn with_warnings(value: T, warnings: Vec<Warning>) -> Outcome<T> {
        Outcome { value, warnings }
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Errors that prevent an operation from completing.
///
/// None of them is fatal to a session: the operation can be attempted again with
/// other parameters.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum TallyError {
    /// No source to work with.
    NoSources,
    /// The tables do not share any column.
    NoCommonColumns,
    MissingKeyColumn { column: String, side: String },
    MissingColumn(String),
    /// No column selected for the sum.
    EmptySelection,
    /// The working table has no rows.
    NoData,
    InvalidTable(String),
    UnknownSource(String),
    /// Several sources and no combined table: the caller must combine them first.
    AmbiguousWorkingTable(Vec<String>),
}

impl Error for TallyError {}

impl Display for TallyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TallyError::NoSources => write!(f, "no source table provided"),
            TallyError::NoCommonColumns => {
                write!(f, "the tables have no column in common, they cannot be combined")
            }
            TallyError::MissingKeyColumn { column, side } => {
                write!(f, "key column {:?} is missing from {}", column, side)
            }
            TallyError::MissingColumn(c) => write!(f, "column {:?} not found", c),
            TallyError::EmptySelection => write!(f, "no compensation column selected"),
            TallyError::NoData => write!(f, "no data: the working table has no rows"),
            TallyError::InvalidTable(msg) => write!(f, "invalid table: {}", msg),
            TallyError::UnknownSource(label) => write!(f, "unknown source {:?}", label),
            TallyError::AmbiguousWorkingTable(labels) => write!(
                f,
                "several sources ({}) and no combined table",
                labels.join(", ")
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_shape_is_checked() {
        let bad = Table::new(vec![
            Column::numbers("Pay", &[1.0, 2.0]),
            Column::numbers("Bonus", &[1.0]),
        ]);
        assert!(matches!(bad, Err(TallyError::InvalidTable(_))));
        let dup = Table::new(vec![
            Column::numbers("Pay", &[1.0]),
            Column::numbers("Pay", &[2.0]),
        ]);
        assert!(matches!(dup, Err(TallyError::InvalidTable(_))));
        assert_eq!(Table::empty().row_count(), 0);
    }

    #[test]
    fn projection_and_replacement() {
        let mut t = Table::new(vec![
            Column::texts("Name", &["a", "b"]),
            Column::numbers("Pay", &[1.0, 2.0]),
        ])
        .unwrap();
        let p = t
            .select_columns(&["Pay".to_string(), "Name".to_string()])
            .unwrap();
        assert_eq!(p.column_names(), vec!["Pay", "Name"]);
        assert_eq!(
            t.select_columns(&["Cost".to_string()]),
            Err(TallyError::MissingColumn("Cost".to_string()))
        );

        t.set_column(Column::numbers("Pay", &[3.0, 4.0])).unwrap();
        assert_eq!(t.column_names(), vec!["Name", "Pay"]);
        assert_eq!(t.row(1), Some(vec![&CellValue::from("b"), &CellValue::Number(4.0)]));
        assert!(t.set_column(Column::numbers("Total", &[1.0])).is_err());
        assert_eq!(t.row(2), None);
    }
}
