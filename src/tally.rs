mod config_reader;
mod io_common;
mod io_csv;
mod io_excel;
mod io_sheets;

use log::{debug, info, warn};

use comp_tally::*;
use snafu::{prelude::*, Snafu};

use std::fs;
use std::path::{Path, PathBuf};

use calamine::{open_workbook, Reader, Xlsx};

use serde_json::json;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::Args;
pub use crate::tally::config_reader::*;
use crate::tally::io_common::*;

#[derive(Debug, Snafu)]
pub enum RunError {
    #[snafu(display("Error opening file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("No data found in the worksheet"))]
    EmptyExcel {},
    #[snafu(display("Worksheet {name} not found in {path}"))]
    MissingWorksheet { name: String, path: String },
    #[snafu(display(
        "The workbook {path} has several worksheets ({names}), the worksheet name must be provided"
    ))]
    AmbiguousWorksheet { path: String, names: String },
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON content"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Error opening CSV file {path}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display("Error reading CSV line {lineno}"))]
    CsvLineParse { source: csv::Error, lineno: usize },
    #[snafu(display("Error writing CSV file {path}"))]
    CsvWrite { source: csv::Error, path: String },
    #[snafu(display("Error writing file {path}"))]
    WritingFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("No header row found in {path}"))]
    MissingHeader { path: String },
    #[snafu(display("Invalid table in {path}"))]
    InvalidSourceTable { source: TallyError, path: String },
    #[snafu(display("Invalid cell range {range}"))]
    InvalidCellRange { range: String },
    #[snafu(display("Provider not implemented {provider}"))]
    UnknownProvider { provider: String },
    #[snafu(display("Two sources have the label {label}"))]
    DuplicateLabel { label: String },
    #[snafu(display("Unknown join kind {kind} (expected inner, outer, left or right)"))]
    UnknownJoinKind { kind: String },
    #[snafu(display("A join requires a key column. Columns common to both sources: {candidates}"))]
    MissingJoinKey { candidates: String },
    #[snafu(display("Cannot compute the compensation"))]
    Tally { source: TallyError },
    #[snafu(display("Could not find the parent directory of {path}"))]
    MissingParentDir { path: String },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

type RunResult<T> = Result<T, RunError>;
type BRunResult<T> = Result<T, Box<RunError>>;

fn read_source(root_path: &Path, cfs: &FileSource, label: &str) -> BRunResult<Table> {
    let p: PathBuf = root_path.join(&cfs.file_path);
    let p2 = p.as_path().display().to_string();
    info!("Attempting to read source file {:?}", p2);
    let table = match cfs.provider()? {
        Provider::Csv => io_csv::read_csv_table(&p2, cfs),
        Provider::Xlsx => io_excel::read_excel_table(&p2, cfs),
        Provider::SheetsJson => io_sheets::read_sheets_json(&p2, cfs),
    }?;
    info!(
        "read_source: {}: {} rows, {} columns",
        label,
        table.row_count(),
        table.column_count()
    );
    Ok(table)
}

fn combine_sources(
    session: &mut Session,
    combine: &Option<CombineSettings>,
) -> RunResult<Vec<Warning>> {
    let labels = session.labels();
    if labels.len() < 2 {
        return Ok(Vec::new());
    }
    let mode = combine
        .as_ref()
        .map(|c| c.mode.as_str())
        .unwrap_or("stack");
    let warnings = match (mode, combine) {
        ("stack", _) => session.stack(&labels).context(TallySnafu {})?,
        ("join", Some(c)) => {
            if labels.len() != 2 {
                whatever!(
                    "A join requires exactly two sources, found {}",
                    labels.len()
                );
            }
            let kind = c.join_kind()?;
            let left = &labels[0];
            let right = &labels[1];
            let key = match c.key.as_deref() {
                Some(k) => k.to_string(),
                None => {
                    let candidates = match (session.source(left), session.source(right)) {
                        (Some(l), Some(r)) => common_columns(l, r),
                        _ => Vec::new(),
                    };
                    if candidates.is_empty() {
                        return Err(RunError::Tally {
                            source: TallyError::NoCommonColumns,
                        });
                    }
                    return MissingJoinKeySnafu {
                        candidates: candidates.join(", "),
                    }
                    .fail();
                }
            };
            session
                .join(left, right, &key, kind)
                .context(TallySnafu {})?
        }
        (x, _) => {
            whatever!("Unknown combination mode {:?} (expected stack or join)", x)
        }
    };
    Ok(warnings)
}

fn build_summary_js(
    config: &TallyConfig,
    labels: &[String],
    agg: &Aggregation,
    warnings: &[Warning],
) -> JSValue {
    let amount = |x: f64| json!(format!("{:.2}", x));
    let groups: Vec<JSValue> = agg
        .groups
        .iter()
        .flatten()
        .map(|g| {
            json!({
                "group": g.group,
                "sum": amount(g.sum),
                "mean": amount(g.mean),
                "count": g.count.to_string(),
            })
        })
        .collect();
    let breakdown: Vec<JSValue> = agg
        .breakdown
        .iter()
        .flatten()
        .map(|(column, total)| json!({ "column": column, "total": amount(*total) }))
        .collect();
    json!({
        "config": {
            "report": config.output_settings.report_name,
            "sources": labels,
            "selectedColumns": agg.selected,
        },
        "results": {
            "totalCompensation": amount(agg.summary.grand_total),
            "averageCompensation": amount(agg.summary.average),
            "employees": agg.summary.row_count.to_string(),
            "byGroup": groups,
            "breakdown": breakdown,
        },
        "warnings": warnings.iter().map(|w| w.to_string()).collect::<Vec<String>>(),
    })
}

fn write_output(out: &str, content: &str) -> BRunResult<()> {
    if out.is_empty() || out == "stdout" {
        println!("{}", content);
    } else {
        fs::write(out, content).context(WritingFileSnafu { path: out })?;
        info!("Summary written to {}", out);
    }
    Ok(())
}

/// Loads the sources, combines them and computes the compensation.
///
/// Arguments:
/// * `config` the description of the sources and of the selection
/// * `root_path` the directory against which the paths of the config are resolved
pub fn run_tally(
    config: &TallyConfig,
    root_path: &Path,
) -> BRunResult<(Outcome<Aggregation>, Vec<Warning>)> {
    info!("config: {:?}", config);
    let rules = config.selection.rules()?;

    if config.sources.is_empty() {
        return Err(Box::new(RunError::Tally {
            source: TallyError::NoSources,
        }));
    }

    let labels = source_labels(&config.sources)?;
    let mut session = Session::new(&rules);
    for (cfs, label) in config.sources.iter().zip(labels.iter()) {
        let table = read_source(root_path, cfs, label)?;
        session.add_source(label, table);
    }

    let mut warnings = combine_sources(&mut session, &config.combine)?;
    if let Some(cols) = &config.selection.columns {
        session.select(cols);
    }
    let res = session.aggregate().context(TallySnafu {})?;
    warnings.extend(res.warnings.iter().cloned());

    let s = &res.value.summary;
    info!("Total Compensation Cost: {}", format_currency(s.grand_total));
    info!(
        "Average Compensation per Employee: {}",
        format_currency(s.average)
    );
    info!("Employees: {}", s.row_count);
    for g in res.value.groups.iter().flatten() {
        info!(
            "  {}: {} ({} employees, average {})",
            g.group,
            format_currency(g.sum),
            g.count,
            format_currency(g.mean)
        );
    }
    Ok((res, warnings))
}

/// Runs a complete tabulation: computes the results, writes the processed table and the
/// summary, and checks the summary against a reference if one is provided.
pub fn run_report(
    config: &TallyConfig,
    root_path: &Path,
    out: Option<String>,
    check_summary_path: Option<String>,
) -> BRunResult<()> {
    let (res, warnings) = run_tally(config, root_path)?;
    let agg = &res.value;

    if let Some(table_file) = &config.output_settings.table_file_name {
        let out_dir = root_path.join(
            config
                .output_settings
                .output_directory
                .clone()
                .unwrap_or_default(),
        );
        fs::create_dir_all(&out_dir).context(WritingFileSnafu {
            path: out_dir.display().to_string(),
        })?;
        let exported = match &config.output_settings.display_columns {
            Some(cols) if !cols.is_empty() => agg
                .table
                .select_columns(cols)
                .context(TallySnafu {})?,
            _ => agg.table.clone(),
        };
        let table_path = out_dir.join(table_file).display().to_string();
        io_csv::write_csv_table(&exported, &table_path)?;
    }

    let labels = source_labels(&config.sources)?;
    let result_js = build_summary_js(config, &labels, agg, &warnings);
    let pretty_js_stats = serde_json::to_string_pretty(&result_js).context(ParsingJsonSnafu {})?;
    write_output(out.as_deref().unwrap_or("stdout"), &pretty_js_stats)?;

    // The reference summary, if provided for comparison
    if let Some(summary_p) = check_summary_path {
        let summary_ref = read_summary(&summary_p)?;
        let pretty_js_summary_ref =
            serde_json::to_string_pretty(&summary_ref).context(ParsingJsonSnafu {})?;
        if pretty_js_summary_ref != pretty_js_stats {
            warn!("Found differences with the reference string");
            print_diff(
                pretty_js_summary_ref.as_str(),
                pretty_js_stats.as_ref(),
                "\n",
            );
            return Err(Box::new(RunError::Whatever {
                message: "Difference detected between calculated summary and reference summary"
                    .to_string(),
                source: None,
            }));
        }
        info!("The summary matches the reference {}", summary_p);
    }
    Ok(())
}

/// Builds the configuration from the command line: either from the config file, or from
/// the input file. The other arguments override the values of the config file.
pub fn config_from_args(args: &Args) -> BRunResult<(TallyConfig, PathBuf)> {
    let (mut config, root_path) = if let Some(config_path) = &args.config {
        let config = read_config(config_path)?;
        let root_p = Path::new(config_path)
            .parent()
            .context(MissingParentDirSnafu {
                path: config_path.clone(),
            })?
            .to_path_buf();
        (config, root_p)
    } else {
        (TallyConfig::default(), PathBuf::new())
    };

    if !args.input.is_empty() {
        let default_type = args.input_type.clone().unwrap_or_else(|| "csv".to_string());
        config.sources = args
            .input
            .iter()
            .map(|path| {
                let provider = if args.input_type.is_none() && path.ends_with(".xlsx") {
                    "xlsx".to_string()
                } else {
                    default_type.clone()
                };
                FileSource {
                    excel_worksheet_name: args.excel_worksheet_name.clone(),
                    cell_range: args.cell_range.clone(),
                    ..FileSource::new(&provider, path)
                }
            })
            .collect();
    }
    if !args.columns.is_empty() {
        config.selection.columns = Some(args.columns.clone());
    }
    if let Some(g) = &args.group_by {
        config.selection.group_by = Some(g.clone());
    }
    if args.key.is_some() || args.join_kind.is_some() {
        config.combine = Some(CombineSettings {
            mode: "join".to_string(),
            key: args.key.clone(),
            join_kind: args.join_kind.clone(),
        });
    }
    if let Some(t) = &args.table_out {
        config.output_settings.table_file_name = Some(t.clone());
    }
    debug!("config_from_args: {:?}", config);
    Ok((config, root_path))
}

/// The expected layout of an input file, with example data.
pub fn expected_format() -> String {
    let sample = sample_table();
    let mut s = String::new();
    s.push_str("Your file should contain columns for employee information and compensation data.\n");
    s.push_str(&format!("Example columns: {}\n\n", sample.column_names().join(", ")));
    s.push_str(&sample.column_names().join(","));
    s.push('\n');
    for idx in 0..sample.row_count() {
        if let Some(row) = sample.row(idx) {
            let cells: Vec<String> = row.iter().map(|c| c.as_text()).collect();
            s.push_str(&cells.join(","));
            s.push('\n');
        }
    }
    s
}

#[cfg(test)]
fn run_report_test(test_name: &str, config_lpath: &str, summary_lpath: &str) {
    let _ = env_logger::builder().is_test(true).try_init();
    let test_dir = concat!(env!("CARGO_MANIFEST_DIR"), "/tests");
    info!("Running test {}", test_name);
    let config_path = format!("{}/{}/{}", test_dir, test_name, config_lpath);
    let config = read_config(&config_path).unwrap();
    let root_path = PathBuf::from(format!("{}/{}", test_dir, test_name));
    let out_dir = std::env::temp_dir().join(format!("comptally-{}", test_name));
    fs::create_dir_all(&out_dir).unwrap();
    let out = out_dir.join("summary.json").display().to_string();
    let res = run_report(
        &config,
        &root_path,
        Some(out),
        Some(format!("{}/{}/{}", test_dir, test_name, summary_lpath)),
    );
    if let Err(e) = res {
        panic!("Test {} failed: {}", test_name, e);
    }
}

#[cfg(test)]
fn test_wrapper(test_name: &str) {
    run_report_test(
        test_name,
        format!("{}_config.json", test_name).as_str(),
        format!("{}_expected_summary.json", test_name).as_str(),
    )
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn single_csv() {
        test_wrapper("single_csv");
    }

    #[test]
    fn stacked_sources() {
        test_wrapper("stacked_sources");
    }

    #[test]
    fn joined_sources() {
        test_wrapper("joined_sources");
    }

    #[test]
    fn sheets_payload() {
        test_wrapper("sheets_payload");
    }

    #[test]
    fn xlsx_workbook() {
        test_wrapper("xlsx_workbook");
    }

    #[test]
    fn same_file_names_are_all_read() {
        let test_dir = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/same_file_names");
        let config = TallyConfig {
            sources: vec![
                FileSource::new("csv", "east/employees.csv"),
                FileSource::new("csv", "west/employees.csv"),
            ],
            ..TallyConfig::default()
        };
        let (res, warnings) = run_tally(&config, Path::new(test_dir)).unwrap();
        assert!(warnings.is_empty());
        assert_eq!(res.value.summary.row_count, 2);
        assert_eq!(res.value.summary.grand_total, 300.0);

        let js = build_summary_js(
            &config,
            &source_labels(&config.sources).unwrap(),
            &res.value,
            &warnings,
        );
        assert_eq!(
            js["config"]["sources"],
            json!(["east/employees.csv", "west/employees.csv"])
        );
    }

    #[test]
    fn duplicate_labels_fail() {
        let test_dir = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/same_file_names");
        let config = TallyConfig {
            sources: vec![
                FileSource {
                    label: Some("hr".to_string()),
                    ..FileSource::new("csv", "east/employees.csv")
                },
                FileSource {
                    label: Some("hr".to_string()),
                    ..FileSource::new("csv", "west/employees.csv")
                },
            ],
            ..TallyConfig::default()
        };
        match run_tally(&config, Path::new(test_dir)) {
            Err(e) => assert!(matches!(*e, RunError::DuplicateLabel { .. })),
            Ok(_) => panic!("two sources with the same label should fail"),
        }
    }

    #[test]
    fn empty_output_goes_to_stdout() {
        assert!(write_output("", "{}").is_ok());
    }

    #[test]
    fn join_without_key() {
        let test_dir = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/joined_sources");
        let mut config = read_config(&format!("{}/joined_sources_config.json", test_dir)).unwrap();
        if let Some(c) = config.combine.as_mut() {
            c.key = None;
        }
        let res = run_tally(&config, Path::new(test_dir));
        match res {
            Err(e) => match *e {
                RunError::MissingJoinKey { candidates } => {
                    assert_eq!(candidates, "Employee ID")
                }
                other => panic!("unexpected error {:?}", other),
            },
            Ok(_) => panic!("the join should fail without a key"),
        }
    }

    #[test]
    fn disjoint_sources_cannot_be_stacked() {
        let test_dir = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/stacked_sources");
        let config = TallyConfig {
            sources: vec![
                FileSource::new("csv", "hr_east.csv"),
                FileSource::new("csv", "unrelated.csv"),
            ],
            ..TallyConfig::default()
        };
        let res = run_tally(&config, Path::new(test_dir));
        match res {
            Err(e) => assert!(matches!(
                *e,
                RunError::Tally {
                    source: TallyError::NoCommonColumns
                }
            )),
            Ok(_) => panic!("stacking should fail"),
        }
    }

    #[test]
    fn sample_format() {
        let s = expected_format();
        assert!(s.contains("Employee ID,Name,Department,Salary,Bonus,Benefits\n"));
        assert!(s.contains("001,John Doe,Engineering,75000,5000,12000\n"));
    }
}
