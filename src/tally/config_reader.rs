use crate::tally::*;

use std::collections::{HashMap, HashSet};

use comp_tally::{AggregationRules, ColumnMatcher, JoinKind, MatchMode};
use serde::{Deserialize, Serialize};

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize, Default)]
pub struct OutputSettings {
    #[serde(rename = "reportName")]
    pub report_name: Option<String>,
    #[serde(rename = "outputDirectory")]
    pub output_directory: Option<String>,
    /// Where the processed table is written, as CSV.
    #[serde(rename = "tableFileName")]
    pub table_file_name: Option<String>,
    /// The columns of the processed table to export. All of them if not provided.
    #[serde(rename = "displayColumns")]
    pub display_columns: Option<Vec<String>>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct FileSource {
    pub label: Option<String>,
    pub provider: String,
    #[serde(rename = "filePath")]
    pub file_path: String,
    pub delimiter: Option<String>,
    #[serde(rename = "excelWorksheetName")]
    pub excel_worksheet_name: Option<String>,
    #[serde(rename = "cellRange")]
    pub cell_range: Option<String>,
}

impl FileSource {
    pub fn new(provider: &str, file_path: &str) -> FileSource {
        FileSource {
            label: None,
            provider: provider.to_string(),
            file_path: file_path.to_string(),
            delimiter: None,
            excel_worksheet_name: None,
            cell_range: None,
        }
    }

    /// The label of the source. Defaults to the name of the file.
    ///
    /// This name may be shared by several sources, see `source_labels`.
    pub fn label(&self) -> String {
        match self.explicit_label() {
            Some(l) => l.to_string(),
            None => simplify_file_name(&self.file_path),
        }
    }

    fn explicit_label(&self) -> Option<&str> {
        self.label.as_deref().filter(|l| !l.is_empty())
    }

    pub fn provider(&self) -> RunResult<Provider> {
        Provider::parse(&self.provider).context(UnknownProviderSnafu {
            provider: self.provider.clone(),
        })
    }

    pub fn delimiter_byte(&self) -> RunResult<u8> {
        match self.delimiter.as_deref() {
            None | Some("") => Ok(b','),
            Some("\\t") | Some("tab") => Ok(b'\t'),
            Some(d) if d.len() == 1 => Ok(d.as_bytes()[0]),
            Some(d) => whatever!("delimiter must be a single character, got {:?}", d),
        }
    }

    pub fn cell_range(&self) -> RunResult<Option<CellRange>> {
        self.cell_range
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(parse_cell_range)
            .transpose()
    }
}

/// The ingestion providers.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum Provider {
    Csv,
    Xlsx,
    SheetsJson,
}

impl Provider {
    pub fn parse(s: &str) -> Option<Provider> {
        match s {
            "csv" => Some(Provider::Csv),
            "xlsx" | "excel" => Some(Provider::Xlsx),
            "sheets_json" => Some(Provider::SheetsJson),
            _ => None,
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct CombineSettings {
    /// `stack` or `join`
    pub mode: String,
    pub key: Option<String>,
    #[serde(rename = "joinKind")]
    pub join_kind: Option<String>,
}

impl CombineSettings {
    pub fn join_kind(&self) -> RunResult<JoinKind> {
        match self.join_kind.as_deref() {
            None => Ok(JoinKind::Inner),
            Some(s) => JoinKind::parse(s).context(UnknownJoinKindSnafu { kind: s }),
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize, Default)]
pub struct SelectionSettings {
    /// The columns to sum. If not provided, they are found with the vocabulary.
    pub columns: Option<Vec<String>>,
    pub terms: Option<Vec<String>>,
    #[serde(rename = "matchMode")]
    pub match_mode: Option<String>,
    #[serde(rename = "caseSensitive")]
    pub case_sensitive: Option<bool>,
    /// An empty string disables the per-group statistics.
    #[serde(rename = "groupBy")]
    pub group_by: Option<String>,
    #[serde(rename = "derivedColumn")]
    pub derived_column: Option<String>,
    pub breakdown: Option<bool>,
}

impl SelectionSettings {
    pub fn rules(&self) -> RunResult<AggregationRules> {
        let defaults = AggregationRules::default();
        // The standard preset has its own vocabulary and ignores `terms`.
        let standard = self.match_mode.as_deref() == Some("standard");
        let mut matcher = if standard {
            ColumnMatcher::standard()
        } else {
            ColumnMatcher::default()
        };
        match &self.terms {
            Some(terms) if !standard => matcher.terms = terms.clone(),
            _ => (),
        }
        if let Some(cs) = self.case_sensitive {
            matcher.case_sensitive = cs;
        }
        matcher.mode = match self.match_mode.as_deref() {
            None | Some("substring") => MatchMode::Substring,
            Some("exact") | Some("standard") => MatchMode::Exact,
            Some("explicit") => match &self.columns {
                Some(cols) if !cols.is_empty() => MatchMode::Explicit(cols.clone()),
                _ => whatever!("matchMode explicit requires a list of columns"),
            },
            Some(x) => whatever!("unknown match mode: {}", x),
        };
        let group_column = match self.group_by.as_deref() {
            None => defaults.group_column,
            Some("") => None,
            Some(g) => Some(g.to_string()),
        };
        Ok(AggregationRules {
            matcher,
            derived_column: self
                .derived_column
                .clone()
                .filter(|s| !s.is_empty())
                .unwrap_or(defaults.derived_column),
            group_column,
            breakdown: self.breakdown.unwrap_or(defaults.breakdown),
        })
    }
}

/// The labels of the sources, in order. Every source gets a distinct label.
///
/// Explicit labels must be unique. A source without a label is named after its file, or
/// after its path when several sources share the same file name.
pub fn source_labels(sources: &[FileSource]) -> RunResult<Vec<String>> {
    let mut explicit: HashSet<&str> = HashSet::new();
    for cfs in sources.iter() {
        if let Some(l) = cfs.explicit_label() {
            if !explicit.insert(l) {
                return DuplicateLabelSnafu { label: l }.fail();
            }
        }
    }
    let mut name_counts: HashMap<String, usize> = HashMap::new();
    for cfs in sources.iter() {
        *name_counts.entry(cfs.label()).or_insert(0) += 1;
    }

    let mut labels: Vec<String> = Vec::new();
    for cfs in sources.iter() {
        let label = match cfs.explicit_label() {
            Some(l) => l.to_string(),
            None => {
                let name = cfs.label();
                let base = if name_counts.get(&name).copied().unwrap_or(0) > 1 {
                    cfs.file_path.clone()
                } else {
                    name
                };
                let mut candidate = base.clone();
                let mut idx = 2;
                while labels.contains(&candidate) || explicit.contains(candidate.as_str()) {
                    candidate = format!("{}#{}", base, idx);
                    idx += 1;
                }
                candidate
            }
        };
        labels.push(label);
    }
    debug!("source_labels: {:?}", labels);
    Ok(labels)
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize, Default)]
pub struct TallyConfig {
    #[serde(rename = "outputSettings", default)]
    pub output_settings: OutputSettings,
    pub sources: Vec<FileSource>,
    pub combine: Option<CombineSettings>,
    #[serde(default)]
    pub selection: SelectionSettings,
}

pub fn read_config(path: &str) -> BRunResult<TallyConfig> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let config: TallyConfig =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    debug!("read_config: {:?}", config);
    Ok(config)
}

pub fn read_summary(path: &str) -> BRunResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    Ok(js)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config() {
        let c: TallyConfig = serde_json::from_str(
            r#"{"sources": [{"provider": "csv", "filePath": "data/hr.csv"}]}"#,
        )
        .unwrap();
        assert_eq!(c.sources[0].label(), "hr.csv");
        assert_eq!(c.sources[0].provider().unwrap(), Provider::Csv);
        assert_eq!(c.sources[0].delimiter_byte().unwrap(), b',');
        assert_eq!(c.selection.rules().unwrap(), AggregationRules::default());
        assert_eq!(c.combine, None);
    }

    #[test]
    fn selection_rules() {
        let s = SelectionSettings {
            columns: Some(vec!["Pay".to_string()]),
            match_mode: Some("explicit".to_string()),
            group_by: Some("".to_string()),
            derived_column: Some("Cost".to_string()),
            ..SelectionSettings::default()
        };
        let r = s.rules().unwrap();
        assert_eq!(r.matcher.mode, MatchMode::Explicit(vec!["Pay".to_string()]));
        assert_eq!(r.group_column, None);
        assert_eq!(r.derived_column, "Cost");

        let bad = SelectionSettings {
            match_mode: Some("fuzzy".to_string()),
            ..SelectionSettings::default()
        };
        assert!(bad.rules().is_err());
    }

    #[test]
    fn standard_match_mode() {
        let s = SelectionSettings {
            match_mode: Some("standard".to_string()),
            ..SelectionSettings::default()
        };
        assert_eq!(s.rules().unwrap().matcher, ColumnMatcher::standard());
    }

    #[test]
    fn labels_are_distinct() {
        let sources = vec![
            FileSource::new("csv", "east/employees.csv"),
            FileSource::new("csv", "west/employees.csv"),
            FileSource::new("csv", "payroll.csv"),
        ];
        assert_eq!(
            source_labels(&sources).unwrap(),
            vec!["east/employees.csv", "west/employees.csv", "payroll.csv"]
        );

        let twice = vec![
            FileSource::new("csv", "hr.csv"),
            FileSource::new("csv", "hr.csv"),
        ];
        assert_eq!(source_labels(&twice).unwrap(), vec!["hr.csv", "hr.csv#2"]);

        // A file name that clashes with an explicit label falls back to its path.
        let mixed = vec![
            FileSource {
                label: Some("hr.csv".to_string()),
                ..FileSource::new("csv", "a.csv")
            },
            FileSource::new("csv", "data/hr.csv"),
        ];
        assert_eq!(source_labels(&mixed).unwrap(), vec!["hr.csv", "data/hr.csv"]);
    }

    #[test]
    fn explicit_labels_must_be_unique() {
        let sources = vec![
            FileSource {
                label: Some("hr".to_string()),
                ..FileSource::new("csv", "a.csv")
            },
            FileSource {
                label: Some("hr".to_string()),
                ..FileSource::new("csv", "b.csv")
            },
        ];
        assert!(matches!(
            source_labels(&sources),
            Err(RunError::DuplicateLabel { label }) if label == "hr"
        ));
    }

    #[test]
    fn combine_settings() {
        let c = CombineSettings {
            mode: "join".to_string(),
            key: Some("Employee ID".to_string()),
            join_kind: Some("full".to_string()),
        };
        assert_eq!(c.join_kind().unwrap(), JoinKind::Outer);
        let c = CombineSettings {
            join_kind: Some("cross".to_string()),
            ..c
        };
        assert!(c.join_kind().is_err());
    }
}
