/*!

This is the long-form manual for `comp_tally` and `comptally`.

## Input formats

The following providers are supported by the command line tool:
* `csv` Comma Separated Values (or any other single-byte delimiter)
* `xlsx` Excel workbooks
* `sheets_json` the saved response of a spreadsheet service for a range of cells

All of them expect the first row (of the selected range) to be the header row.
Column names must be unique and not blank.

### `csv`

Cells that look like numbers are read as numbers, blank cells are empty, everything else
is kept as text. Use the `delimiter` option for semicolon- or tab-separated files.

### `xlsx`

The worksheet is chosen with `excelWorksheetName`. If it is not provided, the workbook must
contain exactly one worksheet. The optional `cellRange` option (`A1:F20` or `Sheet1!A1:F20`)
restricts the cells that are read.

### `sheets_json`

A file containing the JSON payload returned by a spreadsheet service when reading a range:

```text
{
  "range": "Sheet1!A1:F4",
  "majorDimension": "ROWS",
  "values": [
    ["Employee ID", "Name", "Department", "Salary", "Bonus", "Benefits"],
    ["001", "John Doe", "Engineering", "75000", "5000", "12000"]
  ]
}
```

Fetching this payload (and the credentials it requires) is not handled here.

## Compensation columns

Unless the columns are listed explicitly, the compensation columns are found by comparing
their names with a vocabulary (`Salary`, `Bonus`, `Benefits`, `Stock`, `Retirement`,
`Compensation` by default):

* `substring` (default): the name contains a term. Note that a column named `Bonus Points`
  would then be counted as compensation.
* `exact`: the name is one of the terms.
* `explicit`: only the columns given in `columns` are used.
* `standard`: exactly the `Salary`, `Bonus` and `Benefits` columns, in any case. The `terms`
  option is ignored.

Matching is case-sensitive unless `caseSensitive` is set to `false`.

Every value of a compensation column is converted to a number: all the characters that are
not digits or decimal points are removed (`$75,000` becomes `75000`), and whatever cannot be
read as a number counts as 0. Note that this also removes minus signs.

## Combining sources

When several sources are provided, they must be combined into a single table. Each source is
known by its `label`, which defaults to its file name (or to its path, if two sources have the
same file name). Two sources cannot have the same explicit label.

* `stack` appends the rows of all the sources. Only the columns present in every source are
  kept, and a warning lists the others. Sources without any common column cannot be stacked.
* `join` matches the rows of exactly two sources on the value of a `key` column, following
  `joinKind` (`inner`, `outer`, `left`, `right`). Columns present in both sources (other than
  the key) are renamed with the label of their source as a suffix. Repeated key values are
  reported, and produce one row for each matching pair.

## Outputs

* the table, with a `Total Compensation` column that is the sum of the selected columns
* the total, the average per row and the number of rows
* if a `Department` column exists, the sum, mean and count per department, largest first
* the total of each selected column

An empty table is reported as having no data.

*/
