//! Combination of several sources into one working table.

use log::{debug, info, warn};

use std::collections::{HashMap, HashSet};

use crate::config::*;

/// Appends the rows of all the tables, keeping only the columns they have in common.
///
/// The columns follow the order of the first table. If the sources do not have the
/// same columns, a warning lists what was dropped from each of them.
///
/// Arguments:
/// * `sources` the labeled tables, in the order their rows should appear
pub fn stack_tables(sources: &[(String, Table)]) -> Result<Outcome<Table>, TallyError> {
    let ((_, first), rest) = sources.split_first().ok_or(TallyError::NoSources)?;
    if rest.is_empty() {
        return Ok(Outcome::ok(first.clone()));
    }

    let common: Vec<String> = first
        .column_names()
        .into_iter()
        .filter(|name| rest.iter().all(|(_, t)| t.has_column(name)))
        .collect();
    debug!("stack_tables: common columns: {:?}", common);
    if common.is_empty() {
        return Err(TallyError::NoCommonColumns);
    }

    let common_set: HashSet<&String> = common.iter().collect();
    let dropped: Vec<(String, Vec<String>)> = sources
        .iter()
        .map(|(label, t)| {
            let cols: Vec<String> = t
                .column_names()
                .into_iter()
                .filter(|c| !common_set.contains(c))
                .collect();
            (label.clone(), cols)
        })
        .collect();

    let mut warnings: Vec<Warning> = Vec::new();
    if dropped.iter().any(|(_, cols)| !cols.is_empty()) {
        let w = Warning::ColumnMismatch { dropped };
        warn!("stack_tables: {}", w);
        warnings.push(w);
    }

    let mut columns: Vec<Column> = Vec::new();
    for name in common.iter() {
        let mut values: Vec<CellValue> = Vec::new();
        for (_, t) in sources.iter() {
            // Presence was checked when computing the common columns.
            if let Some(c) = t.column(name) {
                values.extend(c.values.iter().cloned());
            }
        }
        columns.push(Column::new(name, values));
    }
    let res = Table::new(columns)?;
    info!(
        "stack_tables: stacked {} sources into {} rows and {} columns",
        sources.len(),
        res.row_count(),
        res.column_count()
    );
    Ok(Outcome::with_warnings(res, warnings))
}

/// The columns present in both tables, in the order of the left table.
/// These are the candidates for a join key.
pub fn common_columns(left: &Table, right: &Table) -> Vec<String> {
    left.column_names()
        .into_iter()
        .filter(|n| right.has_column(n))
        .collect()
}

// Empty keys never match anything.
fn key_of(cell: &CellValue) -> Option<String> {
    match cell {
        CellValue::Empty => None,
        c => Some(c.as_text()),
    }
}

// Map from key to the row indexes holding it.
fn build_key_index(column: &Column) -> HashMap<String, Vec<usize>> {
    let mut index: HashMap<String, Vec<usize>> = HashMap::new();
    for (idx, cell) in column.values.iter().enumerate() {
        if let Some(k) = key_of(cell) {
            index.entry(k).or_default().push(idx);
        }
    }
    index
}

// Repeated keys, in order of first appearance.
fn duplicate_keys(column: &Column, index: &HashMap<String, Vec<usize>>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut res: Vec<String> = Vec::new();
    for cell in column.values.iter() {
        if let Some(k) = key_of(cell) {
            if index.get(&k).map(|v| v.len() > 1).unwrap_or(false) && seen.insert(k.clone()) {
                res.push(k);
            }
        }
    }
    res
}

/// Joins two labeled tables on the equality of a key column.
///
/// The result has the key column first, then the other columns of the left table, then
/// the other columns of the right table. Columns found on both sides are suffixed with
/// the label of their source. Cells of an unmatched side are `Empty`.
///
/// Repeated keys are reported as warnings: every pair of matching rows produces an
/// output row, as in a relational join.
pub fn join_tables(
    left: (&str, &Table),
    right: (&str, &Table),
    key: &str,
    kind: JoinKind,
) -> Result<Outcome<Table>, TallyError> {
    let (left_label, left_t) = left;
    let (right_label, right_t) = right;

    if common_columns(left_t, right_t).is_empty() {
        return Err(TallyError::NoCommonColumns);
    }
    let left_key = left_t
        .column(key)
        .ok_or_else(|| TallyError::MissingKeyColumn {
            column: key.to_string(),
            side: left_label.to_string(),
        })?;
    let right_key = right_t
        .column(key)
        .ok_or_else(|| TallyError::MissingKeyColumn {
            column: key.to_string(),
            side: right_label.to_string(),
        })?;

    let left_index = build_key_index(left_key);
    let right_index = build_key_index(right_key);

    let mut warnings: Vec<Warning> = Vec::new();
    for (label, column, index) in [
        (left_label, left_key, &left_index),
        (right_label, right_key, &right_index),
    ] {
        let keys = duplicate_keys(column, index);
        if !keys.is_empty() {
            let w = Warning::DuplicateKeys {
                side: label.to_string(),
                keys,
            };
            warn!("join_tables: {}", w);
            warnings.push(w);
        }
    }

    let pairs = match_rows(left_key, right_key, &left_index, &right_index, kind);
    debug!("join_tables: {:?} join produced {} rows", kind, pairs.len());

    let mut columns: Vec<Column> = Vec::new();
    let key_values: Vec<CellValue> = pairs
        .iter()
        .map(|(l, r)| match (l, r) {
            (Some(l), _) => left_key.values[*l].clone(),
            (None, Some(r)) => right_key.values[*r].clone(),
            (None, None) => CellValue::Empty,
        })
        .collect();
    columns.push(Column::new(key, key_values));

    let pick = |c: &Column, idx: Option<usize>| -> CellValue {
        idx.map(|i| c.values[i].clone()).unwrap_or(CellValue::Empty)
    };
    for c in left_t.columns().iter().filter(|c| c.name != key) {
        let name = if right_t.has_column(&c.name) {
            format!("{}_{}", c.name, left_label)
        } else {
            c.name.clone()
        };
        let values = pairs.iter().map(|(l, _)| pick(c, *l)).collect();
        columns.push(Column::new(&name, values));
    }
    for c in right_t.columns().iter().filter(|c| c.name != key) {
        let name = if left_t.has_column(&c.name) {
            format!("{}_{}", c.name, right_label)
        } else {
            c.name.clone()
        };
        let values = pairs.iter().map(|(_, r)| pick(c, *r)).collect();
        columns.push(Column::new(&name, values));
    }

    let res = Table::new(columns)?;
    info!(
        "join_tables: {} ({} rows) and {} ({} rows) on {:?}: {} rows",
        left_label,
        left_t.row_count(),
        right_label,
        right_t.row_count(),
        key,
        res.row_count()
    );
    Ok(Outcome::with_warnings(res, warnings))
}

// The pairs of (left row, right row) of the join result.
fn match_rows(
    left_key: &Column,
    right_key: &Column,
    left_index: &HashMap<String, Vec<usize>>,
    right_index: &HashMap<String, Vec<usize>>,
    kind: JoinKind,
) -> Vec<(Option<usize>, Option<usize>)> {
    let mut pairs: Vec<(Option<usize>, Option<usize>)> = Vec::new();
    match kind {
        JoinKind::Inner | JoinKind::Left | JoinKind::Outer => {
            for (l, cell) in left_key.values.iter().enumerate() {
                match key_of(cell).and_then(|k| right_index.get(&k)) {
                    Some(matches) => {
                        for r in matches {
                            pairs.push((Some(l), Some(*r)));
                        }
                    }
                    None if kind != JoinKind::Inner => pairs.push((Some(l), None)),
                    None => {}
                }
            }
            if kind == JoinKind::Outer {
                for (r, cell) in right_key.values.iter().enumerate() {
                    if key_of(cell).and_then(|k| left_index.get(&k)).is_none() {
                        pairs.push((None, Some(r)));
                    }
                }
            }
        }
        JoinKind::Right => {
            for (r, cell) in right_key.values.iter().enumerate() {
                match key_of(cell).and_then(|k| left_index.get(&k)) {
                    Some(matches) => {
                        for l in matches {
                            pairs.push((Some(*l), Some(r)));
                        }
                    }
                    None => pairs.push((None, Some(r))),
                }
            }
        }
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hr() -> Table {
        Table::new(vec![
            Column::texts("Employee ID", &["001", "002", "003"]),
            Column::texts("Name", &["John Doe", "Jane Smith", "Bob Johnson"]),
            Column::numbers("Salary", &[75000.0, 65000.0, 80000.0]),
        ])
        .unwrap()
    }

    fn payroll() -> Table {
        Table::new(vec![
            Column::texts("Employee ID", &["002", "003", "004"]),
            Column::numbers("Bonus", &[3000.0, 7000.0, 1000.0]),
            Column::numbers("Salary", &[65500.0, 80000.0, 50000.0]),
        ])
        .unwrap()
    }

    fn labeled(tables: Vec<(&str, Table)>) -> Vec<(String, Table)> {
        tables
            .into_iter()
            .map(|(l, t)| (l.to_string(), t))
            .collect()
    }

    #[test]
    fn stack_identical_columns() {
        let res = stack_tables(&labeled(vec![("a", hr()), ("b", hr())])).unwrap();
        assert!(!res.has_warnings());
        assert_eq!(res.value.row_count(), 6);
        for c in res.value.columns() {
            assert_eq!(c.len(), 6);
        }
        assert_eq!(res.value.column_names(), hr().column_names());
    }

    #[test]
    fn stack_intersection_with_warning() {
        let res = stack_tables(&labeled(vec![("hr", hr()), ("payroll", payroll())])).unwrap();
        assert_eq!(
            res.value.column_names(),
            vec!["Employee ID".to_string(), "Salary".to_string()]
        );
        assert_eq!(res.value.row_count(), 6);
        assert_eq!(
            res.warnings,
            vec![Warning::ColumnMismatch {
                dropped: vec![
                    ("hr".to_string(), vec!["Name".to_string()]),
                    ("payroll".to_string(), vec!["Bonus".to_string()]),
                ]
            }]
        );
        assert_eq!(
            res.value.column("Employee ID").unwrap().values[3],
            CellValue::from("002")
        );
    }

    #[test]
    fn stack_disjoint_fails() {
        let a = Table::new(vec![Column::texts("A", &["x"])]).unwrap();
        let b = Table::new(vec![Column::texts("B", &["y"])]).unwrap();
        assert_eq!(
            stack_tables(&labeled(vec![("a", a), ("b", b)])),
            Err(TallyError::NoCommonColumns)
        );
    }

    #[test]
    fn stack_nothing() {
        assert_eq!(stack_tables(&[]), Err(TallyError::NoSources));
    }

    #[test]
    fn inner_join() {
        let res = join_tables(("hr", &hr()), ("payroll", &payroll()), "Employee ID", JoinKind::Inner)
            .unwrap();
        let t = res.value;
        assert_eq!(
            t.column_names(),
            vec![
                "Employee ID".to_string(),
                "Name".to_string(),
                "Salary_hr".to_string(),
                "Bonus".to_string(),
                "Salary_payroll".to_string(),
            ]
        );
        assert_eq!(t.row_count(), 2);
        assert_eq!(t.column("Name").unwrap(), &Column::texts("Name", &["Jane Smith", "Bob Johnson"]));
        assert_eq!(t.column("Bonus").unwrap(), &Column::numbers("Bonus", &[3000.0, 7000.0]));
    }

    #[test]
    fn left_right_outer_joins() {
        let left = join_tables(("hr", &hr()), ("payroll", &payroll()), "Employee ID", JoinKind::Left)
            .unwrap()
            .value;
        assert_eq!(left.row_count(), 3);
        assert_eq!(left.column("Bonus").unwrap().values[0], CellValue::Empty);

        let right = join_tables(("hr", &hr()), ("payroll", &payroll()), "Employee ID", JoinKind::Right)
            .unwrap()
            .value;
        assert_eq!(right.row_count(), 3);
        assert_eq!(
            right.column("Employee ID").unwrap(),
            &Column::texts("Employee ID", &["002", "003", "004"])
        );
        assert_eq!(right.column("Name").unwrap().values[2], CellValue::Empty);

        let outer = join_tables(("hr", &hr()), ("payroll", &payroll()), "Employee ID", JoinKind::Outer)
            .unwrap()
            .value;
        assert_eq!(
            outer.column("Employee ID").unwrap(),
            &Column::texts("Employee ID", &["001", "002", "003", "004"])
        );
    }

    #[test]
    fn inner_join_without_overlap_is_empty() {
        let other = Table::new(vec![
            Column::texts("Employee ID", &["100", "200"]),
            Column::numbers("Bonus", &[1.0, 2.0]),
        ])
        .unwrap();
        let res = join_tables(("hr", &hr()), ("other", &other), "Employee ID", JoinKind::Inner)
            .unwrap();
        assert_eq!(res.value.row_count(), 0);
        assert_eq!(res.value.column_count(), 4);
    }

    #[test]
    fn duplicate_keys_warn_and_multiply() {
        let dup = Table::new(vec![
            Column::texts("Employee ID", &["002", "002"]),
            Column::numbers("Bonus", &[1.0, 2.0]),
        ])
        .unwrap();
        let res = join_tables(("hr", &hr()), ("bonus", &dup), "Employee ID", JoinKind::Inner)
            .unwrap();
        assert_eq!(res.value.row_count(), 2);
        assert_eq!(
            res.warnings,
            vec![Warning::DuplicateKeys {
                side: "bonus".to_string(),
                keys: vec!["002".to_string()]
            }]
        );
    }

    #[test]
    fn join_failures() {
        assert_eq!(
            join_tables(("hr", &hr()), ("payroll", &payroll()), "Name", JoinKind::Inner),
            Err(TallyError::MissingKeyColumn {
                column: "Name".to_string(),
                side: "payroll".to_string()
            })
        );
        let other = Table::new(vec![Column::texts("X", &["1"])]).unwrap();
        assert_eq!(
            join_tables(("hr", &hr()), ("other", &other), "X", JoinKind::Inner),
            Err(TallyError::NoCommonColumns)
        );
        assert_eq!(
            common_columns(&hr(), &payroll()),
            vec!["Employee ID".to_string(), "Salary".to_string()]
        );
    }
}
