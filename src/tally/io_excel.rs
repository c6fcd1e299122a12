use calamine::DataType;

use comp_tally::builder::Builder;

use crate::tally::{io_common::*, *};

pub fn read_excel_table(path: &str, cfs: &FileSource) -> BRunResult<Table> {
    let cell_range = cfs.cell_range()?;
    let wrange = get_range(path, cfs, &cell_range)?;

    let origin = wrange.start().context(EmptyExcelSnafu {})?;
    let grid: Vec<Vec<DataType>> = wrange.rows().map(|r| r.to_vec()).collect();
    let grid = match &cell_range {
        Some(r) => apply_range(&grid, origin, r),
        None => grid,
    };

    let mut iter = grid.iter();
    let header = iter.next().context(EmptyExcelSnafu {})?;
    let headers: Vec<String> = header
        .iter()
        .enumerate()
        .map(|(idx, dt)| header_name(idx, &read_cell_calamine(dt).as_text()))
        .collect();
    debug!("read_excel_table: header: {:?}", headers);

    let mut builder = Builder::new(&headers).context(InvalidSourceTableSnafu { path })?;
    for (idx, row) in iter.enumerate() {
        let cells: Vec<CellValue> = row.iter().map(read_cell_calamine).collect();
        if cells.iter().all(|c| c.is_empty()) {
            continue;
        }
        debug!("read_excel_table: idx: {:?} row: {:?}", idx, &cells);
        builder
            .add_row(cells)
            .context(InvalidSourceTableSnafu { path })?;
    }
    let table = builder.build().context(InvalidSourceTableSnafu { path })?;
    Ok(table)
}

fn read_cell_calamine(cell: &DataType) -> CellValue {
    match cell {
        DataType::Int(i) => CellValue::Number(*i as f64),
        DataType::Float(f) => CellValue::Number(*f),
        // Dates are kept as their serial number.
        DataType::DateTime(f) => CellValue::Number(*f),
        DataType::String(s) if s.trim().is_empty() => CellValue::Empty,
        DataType::String(s) => CellValue::Text(s.clone()),
        DataType::Bool(b) => CellValue::Bool(*b),
        DataType::Empty => CellValue::Empty,
        _ => {
            debug!("read_cell_calamine: treating cell as empty: {:?}", cell);
            CellValue::Empty
        }
    }
}

// The worksheet comes from, in order: the cell range, the configuration, the only sheet
// of the workbook.
fn get_range(
    path: &str,
    cfs: &FileSource,
    cell_range: &Option<CellRange>,
) -> BRunResult<calamine::Range<DataType>> {
    let worksheet_name_o = cell_range
        .as_ref()
        .and_then(|r| r.sheet.clone())
        .or_else(|| cfs.excel_worksheet_name.clone());
    debug!(
        "read_excel_table: path: {:?} worksheet: {:?}",
        &path, &worksheet_name_o
    );
    let mut workbook: Xlsx<_> = open_workbook(path).context(OpeningExcelSnafu { path })?;

    // A worksheet name was provided, use it.
    if let Some(worksheet_name) = worksheet_name_o {
        let wrange = workbook
            .worksheet_range(&worksheet_name)
            .context(MissingWorksheetSnafu {
                name: worksheet_name.clone(),
                path,
            })?
            .context(OpeningExcelSnafu { path })?;
        Ok(wrange)
    } else {
        let all_worksheets = workbook.worksheets();
        match all_worksheets.as_slice() {
            [] => Err(Box::new(RunError::EmptyExcel {})),
            [(worksheet_name, wrange)] => {
                debug!(
                    "read_excel_table: path: {:?} worksheet: {:?}",
                    &path, &worksheet_name
                );
                Ok(wrange.clone())
            }
            _ => {
                let names: Vec<String> = all_worksheets.iter().map(|(n, _)| n.clone()).collect();
                Err(Box::new(RunError::AmbiguousWorksheet {
                    path: path.to_string(),
                    names: names.join(", "),
                }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cells() {
        assert_eq!(read_cell_calamine(&DataType::Int(3)), CellValue::Number(3.0));
        assert_eq!(
            read_cell_calamine(&DataType::String("  ".to_string())),
            CellValue::Empty
        );
        assert_eq!(
            read_cell_calamine(&DataType::String("$5".to_string())),
            CellValue::Text("$5".to_string())
        );
        assert_eq!(
            read_cell_calamine(&DataType::Error(calamine::CellErrorType::NA)),
            CellValue::Empty
        );
    }

    fn workbook(name: &str) -> String {
        format!("{}/tests/xlsx_workbook/{}", env!("CARGO_MANIFEST_DIR"), name)
    }

    #[test]
    fn single_worksheet() {
        let cfs = FileSource::new("xlsx", "employees.xlsx");
        let t = read_excel_table(&workbook("employees.xlsx"), &cfs).unwrap();
        assert_eq!(
            t.column_names(),
            vec!["Employee ID", "Name", "Department", "Salary", "Bonus", "Benefits"]
        );
        assert_eq!(t.row_count(), 3);
        assert_eq!(t.column("Employee ID").unwrap().values[0], CellValue::from("001"));
        assert_eq!(t.column("Salary").unwrap().values[1], CellValue::from("$65,000"));
        assert_eq!(t.column("Bonus").unwrap().values[2], CellValue::Empty);
    }

    #[test]
    fn several_worksheets_need_a_name() {
        let cfs = FileSource::new("xlsx", "regions.xlsx");
        let res = read_excel_table(&workbook("regions.xlsx"), &cfs);
        match res.map_err(|e| *e) {
            Err(RunError::AmbiguousWorksheet { names, .. }) => {
                assert_eq!(names, "Summary, Sheet1")
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn named_worksheet_with_offset() {
        // The data of this sheet starts at B2.
        let cfs = FileSource {
            excel_worksheet_name: Some("Sheet1".to_string()),
            ..FileSource::new("xlsx", "regions.xlsx")
        };
        let t = read_excel_table(&workbook("regions.xlsx"), &cfs).unwrap();
        assert_eq!(t.column_names(), vec!["Name", "Department", "Salary", "Bonus"]);
        assert_eq!(t.row_count(), 3);
        assert_eq!(
            t.column("Salary").unwrap(),
            &Column::numbers("Salary", &[90000.0, 60000.0, 55000.0])
        );

        let cfs = FileSource {
            excel_worksheet_name: Some("Payroll".to_string()),
            ..FileSource::new("xlsx", "regions.xlsx")
        };
        let res = read_excel_table(&workbook("regions.xlsx"), &cfs);
        assert!(matches!(
            res.map_err(|e| *e),
            Err(RunError::MissingWorksheet { .. })
        ));
    }

    #[test]
    fn cell_range_selects_sheet_and_cells() {
        let cfs = FileSource {
            cell_range: Some("Sheet1!B2:D4".to_string()),
            ..FileSource::new("xlsx", "regions.xlsx")
        };
        let t = read_excel_table(&workbook("regions.xlsx"), &cfs).unwrap();
        assert_eq!(t.column_names(), vec!["Name", "Department", "Salary"]);
        assert_eq!(t.column("Name").unwrap(), &Column::texts("Name", &["Ann", "Ben"]));
        assert_eq!(
            t.column("Salary").unwrap(),
            &Column::numbers("Salary", &[90000.0, 60000.0])
        );
    }

    #[test]
    fn missing_workbook() {
        let cfs = FileSource::new("xlsx", "missing.xlsx");
        let res = read_excel_table("/nonexistent/missing.xlsx", &cfs);
        assert!(matches!(res.map_err(|e| *e), Err(RunError::OpeningExcel { .. })));
    }
}
