//! The state of one user session: the sources, the combined table and the selection.
//!
//! A session is owned by its caller and is never shared. Dropping it (or calling
//! `reset`) discards all the tables.

use log::{debug, info, warn};

use crate::combine::{join_tables, stack_tables};
use crate::config::*;
use crate::normalize::normalize_table;

pub struct Session {
    rules: AggregationRules,
    sources: Vec<(String, Table)>,
    combined: Option<Table>,
    selection: Option<Vec<String>>,
}

impl Session {
    pub fn new(rules: &AggregationRules) -> Session {
        debug!("Session::new: rules: {:?}", rules);
        Session {
            rules: rules.clone(),
            sources: Vec::new(),
            combined: None,
            selection: None,
        }
    }

    pub fn rules(&self) -> &AggregationRules {
        &self.rules
    }

    /// Adds a source after normalizing it. A source with the same label is replaced.
    ///
    /// Any combined table is discarded since it no longer reflects the sources.
    pub fn add_source(&mut self, label: &str, table: Table) {
        let normalized = normalize_table(&table, &self.rules.matcher);
        info!(
            "Session: source {:?}: {} rows, columns {:?}",
            label,
            normalized.row_count(),
            normalized.column_names()
        );
        if let Some(existing) = self.sources.iter_mut().find(|(l, _)| l == label) {
            warn!("Session: replacing source {:?}", label);
            existing.1 = normalized;
        } else {
            self.sources.push((label.to_string(), normalized));
        }
        self.combined = None;
    }

    pub fn remove_source(&mut self, label: &str) -> Result<Table, TallyError> {
        let idx = self
            .sources
            .iter()
            .position(|(l, _)| l == label)
            .ok_or_else(|| TallyError::UnknownSource(label.to_string()))?;
        self.combined = None;
        Ok(self.sources.remove(idx).1)
    }

    pub fn source(&self, label: &str) -> Option<&Table> {
        self.sources
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, t)| t)
    }

    pub fn labels(&self) -> Vec<String> {
        self.sources.iter().map(|(l, _)| l.clone()).collect()
    }

    pub fn combined(&self) -> Option<&Table> {
        self.combined.as_ref()
    }

    fn labeled(&self, labels: &[String]) -> Result<Vec<(String, Table)>, TallyError> {
        labels
            .iter()
            .map(|l| {
                self.source(l)
                    .map(|t| (l.clone(), t.clone()))
                    .ok_or_else(|| TallyError::UnknownSource(l.clone()))
            })
            .collect()
    }

    /// Stacks the given sources (all of them if the list is empty) into the combined table.
    pub fn stack(&mut self, labels: &[String]) -> Result<Vec<Warning>, TallyError> {
        let sources = if labels.is_empty() {
            self.sources.clone()
        } else {
            self.labeled(labels)?
        };
        let res = stack_tables(&sources)?;
        self.combined = Some(res.value);
        Ok(res.warnings)
    }

    /// Joins two sources into the combined table.
    pub fn join(
        &mut self,
        left: &str,
        right: &str,
        key: &str,
        kind: JoinKind,
    ) -> Result<Vec<Warning>, TallyError> {
        let left_t = self
            .source(left)
            .ok_or_else(|| TallyError::UnknownSource(left.to_string()))?;
        let right_t = self
            .source(right)
            .ok_or_else(|| TallyError::UnknownSource(right.to_string()))?;
        let res = join_tables((left, left_t), (right, right_t), key, kind)?;
        // The join may bring back raw compensation columns under a suffixed name.
        self.combined = Some(normalize_table(&res.value, &self.rules.matcher));
        Ok(res.warnings)
    }

    /// The table subject to aggregation: the combined table if there is one,
    /// otherwise the only source.
    pub fn working_table(&self) -> Result<&Table, TallyError> {
        if let Some(t) = self.combined.as_ref() {
            return Ok(t);
        }
        match self.sources.as_slice() {
            [] => Err(TallyError::NoSources),
            [(_, t)] => Ok(t),
            _ => Err(TallyError::AmbiguousWorkingTable(self.labels())),
        }
    }

    pub fn select(&mut self, columns: &[String]) {
        self.selection = Some(columns.to_vec());
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    pub fn selection(&self) -> Option<&[String]> {
        self.selection.as_deref()
    }

    /// Runs the aggregation over the working table with the current selection.
    /// Nothing is cached: every call recomputes everything.
    pub fn aggregate(&self) -> Result<Outcome<Aggregation>, TallyError> {
        let table = self.working_table()?;
        crate::aggregate(table, self.selection(), &self.rules)
    }

    /// Discards all the tables and the selection.
    pub fn reset(&mut self) {
        debug!("Session::reset");
        self.sources.clear();
        self.combined = None;
        self.selection = None;
    }
}
