// Reads the saved payload of a spreadsheet range read.

use serde::{Deserialize, Serialize};

use comp_tally::builder::Builder;

use crate::tally::{io_common::*, *};

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ValueRange {
    pub range: Option<String>,
    #[serde(rename = "majorDimension")]
    pub major_dimension: Option<String>,
    #[serde(default)]
    pub values: Vec<Vec<JSValue>>,
}

impl ValueRange {
    /// The rows of the payload, transposed if the values are given by columns.
    fn rows(&self) -> Vec<Vec<JSValue>> {
        if self.major_dimension.as_deref() != Some("COLUMNS") {
            return self.values.clone();
        }
        let height = self.values.iter().map(|c| c.len()).max().unwrap_or(0);
        (0..height)
            .map(|r| {
                self.values
                    .iter()
                    .map(|c| c.get(r).cloned().unwrap_or(JSValue::Null))
                    .collect()
            })
            .collect()
    }

    /// Position of the first value in the sheet.
    fn origin(&self) -> RunResult<(u32, u32)> {
        match self.range.as_deref() {
            Some(r) => {
                let cr = parse_cell_range(r)?;
                Ok((cr.start_row, cr.start_col))
            }
            None => Ok((0, 0)),
        }
    }
}

fn read_cell_json(v: &JSValue) -> CellValue {
    match v {
        JSValue::Null => CellValue::Empty,
        JSValue::Bool(b) => CellValue::Bool(*b),
        JSValue::Number(n) => n.as_f64().map(CellValue::Number).unwrap_or(CellValue::Empty),
        JSValue::String(s) => cell_from_text(s),
        other => CellValue::Text(other.to_string()),
    }
}

pub fn read_sheets_json(path: &str, cfs: &FileSource) -> BRunResult<Table> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let vr: ValueRange = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    debug!(
        "read_sheets_json: range: {:?} dimension: {:?}",
        vr.range, vr.major_dimension
    );

    let rows = vr.rows();
    let rows = match cfs.cell_range()? {
        Some(r) => apply_range(&rows, vr.origin()?, &r),
        None => rows,
    };

    let mut iter = rows.iter();
    let header = iter.next().context(MissingHeaderSnafu { path })?;
    let headers: Vec<String> = header
        .iter()
        .enumerate()
        .map(|(idx, v)| header_name(idx, &read_cell_json(v).as_text()))
        .collect();
    debug!("read_sheets_json: headers: {:?}", headers);

    let mut builder = Builder::new(&headers).context(InvalidSourceTableSnafu { path })?;
    for row in iter {
        // Trailing empty cells are omitted by the service: the builder pads the rows.
        let cells: Vec<CellValue> = row.iter().map(read_cell_json).collect();
        if cells.iter().all(|c| c.is_empty()) {
            continue;
        }
        builder
            .add_row(cells)
            .context(InvalidSourceTableSnafu { path })?;
    }
    let table = builder.build().context(InvalidSourceTableSnafu { path })?;
    Ok(table)
}
