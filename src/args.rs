use clap::Parser;

/// This is a compensation tabulation program.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) The JSON file describing the sources, how to combine them and which
    /// columns to sum. For more information about the file format, read the documentation of the
    /// comp_tally::manual module.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,
    /// (file path) A reference file containing the expected summary in JSON format. If provided,
    /// comptally will check that the computed summary matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// (file path, 'stdout' or empty) If specified, the summary will be written in JSON format to
    /// the given location. It is printed on the standard output otherwise.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path, can be repeated) The input files. Setting this option overrides the sources
    /// that may be specified with the --config option.
    #[clap(short, long, value_parser)]
    pub input: Vec<String>,

    /// (default csv, or xlsx for .xlsx files) The type of the inputs: csv, xlsx or sheets_json.
    #[clap(long, value_parser)]
    pub input_type: Option<String>,

    /// (column name, can be repeated) The columns to sum. If not specified, the columns are
    /// found by name (Salary, Bonus, Benefits, ...).
    #[clap(long, value_parser)]
    pub columns: Vec<String>,

    /// (default Department) The column used to group the totals. Pass an empty string to
    /// disable the grouping.
    #[clap(long, value_parser)]
    pub group_by: Option<String>,

    /// (column name) Joins the two inputs on this column instead of stacking them.
    #[clap(long, value_parser)]
    pub key: Option<String>,

    /// (default inner) The kind of join: inner, outer, left or right.
    #[clap(long, value_parser)]
    pub join_kind: Option<String>,

    /// (file path) If specified, the processed table is written to this CSV file.
    #[clap(long, value_parser)]
    pub table_out: Option<String>,

    /// When using an Excel file, indicates the name of the worksheet to use.
    #[clap(long, value_parser)]
    pub excel_worksheet_name: Option<String>,

    /// (A1 notation, for example A1:F20) Restricts the cells read from the inputs.
    #[clap(long, value_parser)]
    pub cell_range: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
