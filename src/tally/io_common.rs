use std::path::Path;

use comp_tally::CellValue;

use crate::tally::*;

pub fn simplify_file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .to_string()
}

/// Reads a cell given as text: blanks are empty, numbers are numbers, the rest is text.
///
/// Values with a leading zero (`007`) are identifiers and stay as text.
pub fn cell_from_text(s: &str) -> CellValue {
    let t = s.trim();
    if t.is_empty() {
        return CellValue::Empty;
    }
    let mut chars = t.chars();
    let leading_zero =
        chars.next() == Some('0') && chars.next().map(|c| c.is_ascii_digit()).unwrap_or(false);
    match t.parse::<f64>() {
        Ok(x) if x.is_finite() && !leading_zero => CellValue::Number(x),
        _ => CellValue::Text(s.to_string()),
    }
}

/// The name of a column from its header cell. Blank headers get a placeholder name.
pub fn header_name(idx: usize, s: &str) -> String {
    if s.trim().is_empty() {
        format!("Unnamed: {}", idx)
    } else {
        s.trim().to_string()
    }
}

/// Formats an amount of money: `$270,000.00`.
pub fn format_currency(x: f64) -> String {
    let s = format!("{:.2}", x.abs());
    let (int_part, dec_part) = s.split_once('.').unwrap_or((s.as_str(), "00"));
    let mut grouped = String::new();
    for (idx, c) in int_part.chars().enumerate() {
        if idx > 0 && (int_part.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    let sign = if x < 0.0 { "-" } else { "" };
    format!("{}${}.{}", sign, grouped, dec_part)
}

/// A rectangle of cells in A1 notation, with 0-based indexes.
/// Missing bounds are open.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct CellRange {
    pub sheet: Option<String>,
    pub start_row: u32,
    pub start_col: u32,
    pub end_row: Option<u32>,
    pub end_col: Option<u32>,
}

impl CellRange {
    pub fn contains(&self, row: u32, col: u32) -> bool {
        row >= self.start_row
            && col >= self.start_col
            && self.end_row.map(|r| row <= r).unwrap_or(true)
            && self.end_col.map(|c| col <= c).unwrap_or(true)
    }
}

// "AB" -> 27
fn column_index(letters: &str) -> Option<u32> {
    if letters.is_empty() {
        return None;
    }
    let mut res: u32 = 0;
    for c in letters.chars() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        let v = (c.to_ascii_uppercase() as u32) - ('A' as u32) + 1;
        res = res.checked_mul(26)?.checked_add(v)?;
    }
    Some(res - 1)
}

// "B12" -> (Some(11), 1), "B" -> (None, 1)
fn parse_cell_ref(s: &str) -> Option<(Option<u32>, u32)> {
    let s = s.replace('$', "");
    let split = s.find(|c: char| c.is_ascii_digit()).unwrap_or(s.len());
    let (letters, digits) = s.split_at(split);
    let col = column_index(letters)?;
    let row = if digits.is_empty() {
        None
    } else {
        let r = digits.parse::<u32>().ok()?;
        if r == 0 {
            return None;
        }
        Some(r - 1)
    };
    Some((row, col))
}

/// Parses a range reference such as `A1:F20`, `Sheet1!A1:F20`, `'My sheet'!B:D` or `C3`.
pub fn parse_cell_range(s: &str) -> RunResult<CellRange> {
    let (sheet, cells) = match s.rsplit_once('!') {
        Some((sheet, cells)) => (
            Some(sheet.trim_matches('\'').to_string()),
            cells.trim(),
        ),
        None => (None, s.trim()),
    };
    let (start, end) = match cells.split_once(':') {
        Some((a, b)) => (a, Some(b)),
        None => (cells, None),
    };
    let (start_row, start_col) =
        parse_cell_ref(start).context(InvalidCellRangeSnafu { range: s })?;
    let (end_row, end_col) = match end {
        Some(e) => {
            let (r, c) = parse_cell_ref(e).context(InvalidCellRangeSnafu { range: s })?;
            (r, Some(c))
        }
        None => (None, None),
    };
    let res = CellRange {
        sheet,
        start_row: start_row.unwrap_or(0),
        start_col,
        end_row,
        end_col,
    };
    ensure!(
        res.end_row.map(|r| r >= res.start_row).unwrap_or(true)
            && res.end_col.map(|c| c >= res.start_col).unwrap_or(true),
        InvalidCellRangeSnafu { range: s }
    );
    Ok(res)
}

/// Keeps the cells of a grid that fall within the range.
///
/// `origin` is the position (row, column) of the first cell of the grid in the sheet.
pub fn apply_range<T: Clone>(
    rows: &[Vec<T>],
    origin: (u32, u32),
    range: &CellRange,
) -> Vec<Vec<T>> {
    let (r0, c0) = origin;
    rows.iter()
        .enumerate()
        .filter(|(idx, _)| {
            let r = r0 + *idx as u32;
            r >= range.start_row && range.end_row.map(|e| r <= e).unwrap_or(true)
        })
        .map(|(idx, row)| {
            row.iter()
                .enumerate()
                .filter(|(jdx, _)| range.contains(r0 + idx as u32, c0 + *jdx as u32))
                .map(|(_, v)| v.clone())
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cells_from_text() {
        assert_eq!(cell_from_text(" 12.5 "), CellValue::Number(12.5));
        assert_eq!(cell_from_text(""), CellValue::Empty);
        assert_eq!(cell_from_text("001"), CellValue::Text("001".to_string()));
        assert_eq!(cell_from_text("0.5"), CellValue::Number(0.5));
        assert_eq!(cell_from_text("NaN"), CellValue::Text("NaN".to_string()));
        assert_eq!(
            cell_from_text("$75,000"),
            CellValue::Text("$75,000".to_string())
        );
    }

    #[test]
    fn currency() {
        assert_eq!(format_currency(270000.0), "$270,000.00");
        assert_eq!(format_currency(90000.0), "$90,000.00");
        assert_eq!(format_currency(999.999), "$1,000.00");
        assert_eq!(format_currency(12.5), "$12.50");
        assert_eq!(format_currency(-1234567.0), "-$1,234,567.00");
    }

    #[test]
    fn ranges() {
        assert_eq!(
            parse_cell_range("Sheet1!A1:F20").unwrap(),
            CellRange {
                sheet: Some("Sheet1".to_string()),
                start_row: 0,
                start_col: 0,
                end_row: Some(19),
                end_col: Some(5),
            }
        );
        let r = parse_cell_range("'My sheet'!AA3:AB").unwrap();
        assert_eq!(r.sheet, Some("My sheet".to_string()));
        assert_eq!((r.start_row, r.start_col), (2, 26));
        assert_eq!((r.end_row, r.end_col), (None, Some(27)));
        let r = parse_cell_range("B:D").unwrap();
        assert_eq!((r.start_row, r.start_col, r.end_col), (0, 1, Some(3)));
        assert!(parse_cell_range("A0").is_err());
        assert!(parse_cell_range("1A").is_err());
        assert!(parse_cell_range("C3:A1").is_err());
    }

    #[test]
    fn range_on_grid() {
        let grid: Vec<Vec<u32>> = vec![vec![1, 2, 3], vec![4, 5, 6], vec![7, 8, 9]];
        let r = parse_cell_range("B2:C3").unwrap();
        assert_eq!(apply_range(&grid, (0, 0), &r), vec![vec![5, 6], vec![8, 9]]);
        // The grid starts at B2 in the sheet.
        let r = parse_cell_range("B2:C2").unwrap();
        assert_eq!(apply_range(&grid, (1, 1), &r), vec![vec![1, 2]]);
    }
}
