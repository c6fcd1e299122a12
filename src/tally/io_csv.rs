// Primitives for reading and writing CSV files.

use comp_tally::builder::Builder;

use crate::tally::{io_common::*, *};

pub fn read_csv_table(path: &str, cfs: &FileSource) -> BRunResult<Table> {
    let rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(cfs.delimiter_byte()?)
        .from_path(path)
        .context(CsvOpenSnafu { path })?;
    let mut records = rdr.into_records();

    let header_line = records
        .next()
        .context(MissingHeaderSnafu { path })?
        .context(CsvLineParseSnafu { lineno: 1_usize })?;
    let headers: Vec<String> = header_line
        .iter()
        .enumerate()
        .map(|(idx, s)| header_name(idx, s))
        .collect();
    debug!("read_csv_table: headers: {:?}", headers);

    let mut builder = Builder::new(&headers).context(InvalidSourceTableSnafu { path })?;
    for (idx, line_r) in records.enumerate() {
        // The header is line 1.
        let lineno = idx + 2;
        let line = line_r.context(CsvLineParseSnafu { lineno })?;
        // Blank lines carry no record.
        if line.iter().all(|s| s.trim().is_empty()) {
            continue;
        }
        let cells = line.iter().map(cell_from_text).collect();
        debug!("read_csv_table: lineno: {:?} cells: {:?}", lineno, &cells);
        builder
            .add_row(cells)
            .context(InvalidSourceTableSnafu { path })?;
    }
    let table = builder.build().context(InvalidSourceTableSnafu { path })?;
    Ok(table)
}

/// Writes the table with a header row. Empty cells are written as empty fields.
pub fn write_csv_table(table: &Table, path: &str) -> BRunResult<()> {
    let mut wtr = csv::Writer::from_path(path).context(CsvWriteSnafu { path })?;
    wtr.write_record(table.column_names())
        .context(CsvWriteSnafu { path })?;
    for idx in 0..table.row_count() {
        if let Some(row) = table.row(idx) {
            wtr.write_record(row.iter().map(|c| c.as_text()))
                .context(CsvWriteSnafu { path })?;
        }
    }
    wtr.flush().context(WritingFileSnafu { path })?;
    info!(
        "write_csv_table: wrote {} rows to {}",
        table.row_count(),
        path
    );
    Ok(())
}
