mod config;
pub mod builder;
pub mod combine;
pub mod manual;
pub mod normalize;
pub mod session;

use log::{debug, info, warn};

use std::collections::HashMap;

pub use crate::builder::{sample_table, TableBuilder};
pub use crate::combine::{common_columns, join_tables, stack_tables};
pub use crate::config::*;
pub use crate::normalize::{coerce_cell, normalize_table};
pub use crate::session::Session;

/// Average of a total over a number of rows.
///
/// Returns `TallyError::NoData` instead of dividing by zero.
pub fn average(total: f64, row_count: usize) -> Result<f64, TallyError> {
    if row_count == 0 {
        Err(TallyError::NoData)
    } else {
        Ok(total / row_count as f64)
    }
}

/// Computes the total compensation of each row and the associated statistics.
///
/// Arguments:
/// * `table` the working table
/// * `selection` the columns to sum. If not provided, the columns that match the
/// vocabulary of the rules are used.
/// * `rules` the rules that govern this aggregation
///
/// The returned table is the working table in which the selected columns have been
/// coerced to numbers and the derived column has been (re)computed. The input is
/// not modified: calling this function again with the same arguments gives the same
/// result.
///
/// ```
/// use comp_tally::*;
///
/// let table = sample_table();
/// let res = aggregate(&table, None, &AggregationRules::default())?.value;
/// assert_eq!(res.summary.grand_total, 270000.0);
/// assert_eq!(res.summary.average, 90000.0);
/// # Ok::<(), TallyError>(())
/// ```
pub fn aggregate(
    table: &Table,
    selection: Option<&[String]>,
    rules: &AggregationRules,
) -> Result<Outcome<Aggregation>, TallyError> {
    info!(
        "Processing {:?} rows, selection: {:?}, rules: {:?}",
        table.row_count(),
        selection,
        rules
    );
    let mut warnings: Vec<Warning> = Vec::new();

    let requested: Vec<String> = match selection {
        Some(cols) => cols.to_vec(),
        None => rules.matcher.matching_columns(table),
    };
    let mut selected: Vec<String> = Vec::new();
    for name in requested {
        if name == rules.derived_column {
            // Only an explicit selection deserves a warning. The default selection may
            // pick up the derived column of a previous run because of its name.
            if selection.is_some() {
                let w = Warning::DerivedColumnSelected(name);
                warn!("aggregate: {}", w);
                warnings.push(w);
            }
            continue;
        }
        if !table.has_column(&name) {
            return Err(TallyError::MissingColumn(name));
        }
        if !selected.contains(&name) {
            selected.push(name);
        }
    }
    debug!("aggregate: selected columns: {:?}", selected);
    if selected.is_empty() {
        return Err(TallyError::EmptySelection);
    }
    if table.row_count() == 0 {
        return Err(TallyError::NoData);
    }

    let mut res_table = table.clone();
    let mut totals: Vec<f64> = vec![0.0; table.row_count()];
    let mut breakdown: Vec<(String, f64)> = Vec::new();
    for name in selected.iter() {
        let c = res_table
            .column_mut(name)
            .ok_or_else(|| TallyError::MissingColumn(name.clone()))?;
        normalize::coerce_column(c);
        let mut column_total = 0.0;
        for (row_total, v) in totals.iter_mut().zip(c.values.iter()) {
            let x = normalize::coerce_cell(v);
            *row_total += x;
            column_total += x;
        }
        breakdown.push((name.clone(), column_total));
    }

    let grand_total: f64 = totals.iter().sum();
    let summary = Summary {
        grand_total,
        average: average(grand_total, table.row_count())?,
        row_count: table.row_count(),
    };
    breakdown.push((AggregationRules::BREAKDOWN_TOTAL.to_string(), grand_total));

    res_table.set_column(Column::numbers(&rules.derived_column, &totals))?;

    let groups = match &rules.group_column {
        Some(g) => res_table
            .column(g)
            .map(|group_col| group_stats(group_col, &totals)),
        None => None,
    };

    info!(
        "aggregate: total {} over {} rows (average {})",
        summary.grand_total, summary.row_count, summary.average
    );

    Ok(Outcome::with_warnings(
        Aggregation {
            table: res_table,
            selected,
            summary,
            groups,
            breakdown: if rules.breakdown { Some(breakdown) } else { None },
        },
        warnings,
    ))
}

// Sum, mean and count of the totals for each value of the group column, by decreasing
// sum. Rows without a group value are left out.
fn group_stats(group_col: &Column, totals: &[f64]) -> Vec<GroupStats> {
    let mut order: Vec<String> = Vec::new();
    let mut acc: HashMap<String, (f64, usize)> = HashMap::new();
    for (cell, total) in group_col.values.iter().zip(totals.iter()) {
        let key = cell.as_text();
        if key.is_empty() {
            continue;
        }
        let e = acc.entry(key.clone()).or_insert_with(|| {
            order.push(key);
            (0.0, 0)
        });
        e.0 += total;
        e.1 += 1;
    }
    let mut res: Vec<GroupStats> = order
        .into_iter()
        .filter_map(|group| {
            acc.get(&group).map(|(sum, count)| GroupStats {
                mean: sum / *count as f64,
                sum: *sum,
                count: *count,
                group,
            })
        })
        .collect();
    // Stable sort: ties keep their order of appearance.
    res.sort_by(|a, b| b.sum.total_cmp(&a.sum));
    debug!("group_stats: {:?}", res);
    res
}
