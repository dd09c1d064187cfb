//! The strain × defense-system table handed to the renderer.
//!
//! One row per strain in scope, carrying the columns the R script reads
//! (`index`, `strain`, `assembly`, `MLST`) followed by a 0/1 indicator column
//! per known defense system.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use crate::error::Result;
use crate::types::Strain;

/// Defense systems found in each assembly, keyed by assembly accession.
pub type Memberships = HashMap<String, BTreeSet<String>>;

const BASE_COLUMNS: [&str; 4] = ["index", "strain", "assembly", "MLST"];

/// Name of the indicator column for a defense system.
pub fn column_name(system: &str) -> String {
    format!("Defense_sys_{}", system)
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct Row {
    index: i64,
    strain: String,
    assembly: String,
    mlst: String,
    indicators: Vec<bool>,
}

/// One-hot encoded dataset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Dataset {
    systems: Vec<String>,
    rows: Vec<Row>,
}

impl Dataset {
    /// Build the table for `strains`, with one indicator column per entry of
    /// `systems`.
    pub fn build(strains: &[Strain], systems: &[String], memberships: &Memberships) -> Self {
        let rows = strains
            .iter()
            .map(|strain| {
                let found = memberships.get(&strain.assembly);
                Row {
                    index: strain.index,
                    strain: strain.strain.clone(),
                    assembly: strain.assembly.clone(),
                    mlst: strain.mlst.clone().unwrap_or_default(),
                    indicators: systems
                        .iter()
                        .map(|s| found.is_some_and(|set| set.contains(s)))
                        .collect(),
                }
            })
            .collect();

        Self {
            systems: systems.to_vec(),
            rows,
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn header(&self) -> Vec<String> {
        BASE_COLUMNS
            .iter()
            .map(|c| c.to_string())
            .chain(self.systems.iter().map(|s| column_name(s)))
            .collect()
    }

    /// The subset of `selected` carried by at least one row, in the order given.
    pub fn present_systems(&self, selected: &[String]) -> Vec<String> {
        selected
            .iter()
            .filter(|name| {
                self.systems
                    .iter()
                    .position(|s| s == *name)
                    .is_some_and(|col| self.rows.iter().any(|r| r.indicators[col]))
            })
            .cloned()
            .collect()
    }

    /// Write the table as CSV.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(self.header())?;

        for row in &self.rows {
            let mut record = vec![
                row.index.to_string(),
                row.strain.clone(),
                row.assembly.clone(),
                row.mlst.clone(),
            ];
            record.extend(
                row.indicators
                    .iter()
                    .map(|&hit| if hit { "1" } else { "0" }.to_string()),
            );
            writer.write_record(&record)?;
        }

        writer.flush()?;
        tracing::debug!("Wrote dataset with {} rows to {:?}", self.rows.len(), path);
        Ok(())
    }
}
