pub use crate::config::*;

/// A builder for assembling a table row by row, from a header row.
///
/// This is the entry point for the readers: they produce a header and rows of cells
/// in the same order.
///
/// ```
/// pub use comp_tally::builder::TableBuilder;
/// pub use comp_tally::CellValue;
/// # use comp_tally::TallyError;
///
/// let mut builder = TableBuilder::new(&["Name".to_string(), "Salary".to_string()])?;
///
/// builder.add_row(vec![CellValue::from("Anna"), CellValue::Number(1000.0)])?;
/// // Missing cells at the end of a row are empty.
/// builder.add_row(vec![CellValue::from("Bob")])?;
///
/// let table = builder.build()?;
/// assert_eq!(table.row_count(), 2);
///
/// # Ok::<(), TallyError>(())
/// ```
pub struct Builder {
    pub(crate) _headers: Vec<String>,
    pub(crate) _rows: Vec<Vec<CellValue>>,
}

pub type TableBuilder = Builder;

impl Builder {
    pub fn new(headers: &[String]) -> Result<Builder, TallyError> {
        for (idx, h) in headers.iter().enumerate() {
            if h.trim().is_empty() {
                return Err(TallyError::InvalidTable(format!(
                    "blank header for column {}",
                    idx + 1
                )));
            }
            if headers[..idx].contains(h) {
                return Err(TallyError::InvalidTable(format!(
                    "duplicate header {:?}",
                    h
                )));
            }
        }
        Ok(Builder {
            _headers: headers.to_vec(),
            _rows: Vec::new(),
        })
    }

    pub fn row(mut self, cells: Vec<CellValue>) -> Result<Builder, TallyError> {
        self.add_row(cells)?;
        Ok(self)
    }

    /// Adds a row to the builder.
    ///
    /// A row shorter than the header is padded with empty cells.
    /// A row longer than the header is rejected, unless the extra cells are all empty.
    pub fn add_row(&mut self, mut cells: Vec<CellValue>) -> Result<(), TallyError> {
        let width = self._headers.len();
        if cells.len() > width {
            if cells[width..].iter().any(|c| !c.is_empty()) {
                return Err(TallyError::InvalidTable(format!(
                    "row {} has {} cells for {} columns",
                    self._rows.len() + 1,
                    cells.len(),
                    width
                )));
            }
            cells.truncate(width);
        }
        cells.resize(width, CellValue::Empty);
        self._rows.push(cells);
        Ok(())
    }

    pub fn build(self) -> Result<Table, TallyError> {
        let mut columns: Vec<Column> = self
            ._headers
            .iter()
            .map(|h| Column::new(h, Vec::with_capacity(self._rows.len())))
            .collect();
        for row in self._rows {
            for (c, v) in columns.iter_mut().zip(row.into_iter()) {
                c.values.push(v);
            }
        }
        Table::new(columns)
    }
}

/// Example data showing the expected layout of an input file.
pub fn sample_table() -> Table {
    let columns = vec![
        Column::texts("Employee ID", &["001", "002", "003"]),
        Column::texts("Name", &["John Doe", "Jane Smith", "Bob Johnson"]),
        Column::texts("Department", &["Engineering", "Marketing", "Finance"]),
        Column::numbers("Salary", &[75000.0, 65000.0, 80000.0]),
        Column::numbers("Bonus", &[5000.0, 3000.0, 7000.0]),
        Column::numbers("Benefits", &[12000.0, 10000.0, 13000.0]),
    ];
    Table::new(columns).unwrap_or_default()
}
