//! Data models for strains, defense systems and their associations.
//!
//! These mirror the rows the daemon reads from the database and the JSON
//! shapes the browser frontend expects.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Fallback color for a system whose label has no color entry.
pub const DEFAULT_SYSTEM_COLOR: &str = "#999999";

/// A bacterial isolate record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Strain {
    /// Numeric index; also the tip label in the phylogenetic tree.
    pub index: i64,
    /// Display name, e.g. "Pseudomonas aeruginosa PAO1".
    pub strain: String,
    /// Assembly accession, e.g. "GCF_000006765.1".
    pub assembly: String,
    pub isolation_type: Option<String>,
    /// Multi-locus sequence type, used for clade colouring.
    #[serde(rename = "MLST")]
    pub mlst: Option<String>,
}

impl Strain {
    pub fn new(index: i64, strain: &str, assembly: &str) -> Self {
        Self {
            index,
            strain: strain.to_string(),
            assembly: assembly.to_string(),
            isolation_type: None,
            mlst: None,
        }
    }

    pub fn with_mlst(mut self, mlst: &str) -> Self {
        self.mlst = Some(mlst.to_string());
        self
    }

    pub fn with_isolation_type(mut self, isolation_type: &str) -> Self {
        self.isolation_type = Some(isolation_type.to_string());
        self
    }
}

/// Name and assembly pair returned by the strain listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrainName {
    pub strain: String,
    pub assembly: String,
}

/// Index and name pair returned by the index listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrainIndex {
    pub index: i64,
    pub strain: String,
}

/// A named defense-system category.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefenseSystem {
    /// Identifier used in requests and dataset columns.
    pub name: String,
    /// Display label.
    pub label: String,
    /// Hex color, e.g. "#1F77B4".
    pub color: String,
}

impl DefenseSystem {
    pub fn new(name: &str, label: &str, color: &str) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            color: color.to_string(),
        }
    }
}

/// Label and color pair returned by the colors endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemColor {
    pub label: String,
    pub color: String,
}

/// A gene of a strain together with the defense system it belongs to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneDefenseSystem {
    pub locus_tag: String,
    pub gene: Option<String>,
    pub product: Option<String>,
    pub defense_system: String,
    pub start: Option<i64>,
    pub end: Option<i64>,
    pub strand: Option<String>,
}

/// Reference data loaded once at startup and shared with every handler.
///
/// Holds the known defense-system names (in database order) and the color
/// map keyed by upper-cased label.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    systems: Vec<DefenseSystem>,
    colors: HashMap<String, String>,
}

impl Catalog {
    pub fn new(systems: Vec<DefenseSystem>) -> Self {
        let colors = systems
            .iter()
            .map(|s| (s.label.to_uppercase(), s.color.clone()))
            .collect();
        Self { systems, colors }
    }

    /// Names of all known systems.
    pub fn system_names(&self) -> impl Iterator<Item = &str> {
        self.systems.iter().map(|s| s.name.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.systems.iter().any(|s| s.name == name)
    }

    pub fn len(&self) -> usize {
        self.systems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }

    /// Color for a system name, looked up by its upper-cased form.
    pub fn color_of(&self, name: &str) -> Option<&str> {
        self.colors.get(&name.to_uppercase()).map(String::as_str)
    }

    /// Color for a system name, or [`DEFAULT_SYSTEM_COLOR`] when unknown.
    pub fn color_or_default(&self, name: &str) -> &str {
        match self.color_of(name) {
            Some(color) => color,
            None => {
                tracing::warn!("No color configured for defense system {}", name);
                DEFAULT_SYSTEM_COLOR
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Catalog {
        Catalog::new(vec![
            DefenseSystem::new("CRISPR", "crispr", "#FF0000"),
            DefenseSystem::new("RM", "RM", "#00FF00"),
        ])
    }

    #[test]
    fn test_catalog_lookup_is_case_insensitive_on_label() {
        let catalog = catalog();
        assert_eq!(catalog.color_of("CRISPR"), Some("#FF0000"));
        assert_eq!(catalog.color_of("crispr"), Some("#FF0000"));
        assert_eq!(catalog.color_of("rm"), Some("#00FF00"));
    }

    #[test]
    fn test_catalog_membership_uses_exact_name() {
        let catalog = catalog();
        assert!(catalog.contains("CRISPR"));
        assert!(!catalog.contains("crispr"));
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.system_names().collect::<Vec<_>>(), vec!["CRISPR", "RM"]);
    }

    #[test]
    fn test_unknown_color_falls_back() {
        let catalog = catalog();
        assert_eq!(catalog.color_of("Gabija"), None);
        assert_eq!(catalog.color_or_default("Gabija"), DEFAULT_SYSTEM_COLOR);
    }

    #[test]
    fn test_strain_serializes_mlst_uppercase() {
        let strain = Strain::new(7, "E. coli K-12", "GCF_000005845.2").with_mlst("ST10");
        let json = serde_json::to_value(&strain).unwrap();
        assert_eq!(json["MLST"], "ST10");
        assert_eq!(json["index"], 7);
        assert!(json["isolation_type"].is_null());
    }
}
