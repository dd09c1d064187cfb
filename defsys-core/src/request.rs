//! Phylogenetic tree requests: validation and cache keys.
//!
//! A request names the defense systems to draw as rings, an optional subtree
//! of strain indexes and whether tips are coloured by MLST clade. Unknown
//! values are silently dropped, then both lists are sorted so that any two
//! requests with the same effective parameters share one cache entry.

use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use std::fmt;

use crate::types::Catalog;

/// A tree request as received from the client.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TreeRequest {
    pub systems: Vec<String>,
    pub subtree: Vec<i64>,
    pub mlst: bool,
}

impl TreeRequest {
    pub fn new(systems: Vec<String>, subtree: Vec<i64>, mlst: bool) -> Self {
        Self {
            systems,
            subtree,
            mlst,
        }
    }

    /// Drop unknown systems and strain indexes, then sort and dedup both lists.
    pub fn validate(self, catalog: &Catalog, strain_indexes: &HashSet<i64>) -> ValidatedTree {
        let systems: BTreeSet<String> = self
            .systems
            .into_iter()
            .filter(|s| catalog.contains(s))
            .collect();
        let subtree: BTreeSet<i64> = self
            .subtree
            .into_iter()
            .filter(|i| strain_indexes.contains(i))
            .collect();

        ValidatedTree {
            systems: systems.into_iter().collect(),
            subtree: subtree.into_iter().collect(),
            mlst: self.mlst,
        }
    }
}

/// A request whose lists only contain known values, in canonical order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ValidatedTree {
    /// Lexicographically sorted system names.
    pub systems: Vec<String>,
    /// Numerically sorted strain indexes.
    pub subtree: Vec<i64>,
    pub mlst: bool,
}

impl ValidatedTree {
    /// The string the cache key is derived from.
    ///
    /// Systems and indexes are each joined with `,` and the three sections
    /// with `|`, e.g. `CRISPR,RM|2,4|True`.
    pub fn key_material(&self) -> String {
        let subtree: Vec<String> = self.subtree.iter().map(i64::to_string).collect();
        format!(
            "{}|{}|{}",
            self.systems.join(","),
            subtree.join(","),
            if self.mlst { "True" } else { "False" }
        )
    }

    pub fn cache_key(&self) -> CacheKey {
        CacheKey::digest(self.key_material().as_bytes())
    }

    /// Number of strains the tree is restricted to; 0 for the full tree.
    pub fn item_count(&self) -> usize {
        self.subtree.len()
    }

    pub fn is_full_tree(&self) -> bool {
        self.subtree.is_empty()
    }
}

/// Content hash naming the cached dataset, script and image.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    fn digest(bytes: &[u8]) -> Self {
        Self(blake3::hash(bytes).to_hex().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn image_file(&self) -> String {
        format!("{}.png", self.0)
    }

    /// Where the renderer draws before the image is moved into place.
    pub fn partial_image_file(&self) -> String {
        format!("{}.png.part", self.0)
    }

    pub fn script_file(&self) -> String {
        format!("{}.R", self.0)
    }

    pub fn dataset_file(&self) -> String {
        format!("{}.csv", self.0)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DefenseSystem;

    fn catalog() -> Catalog {
        Catalog::new(vec![
            DefenseSystem::new("BREX", "BREX", "#111111"),
            DefenseSystem::new("CRISPR", "CRISPR", "#222222"),
            DefenseSystem::new("RM", "RM", "#333333"),
        ])
    }

    fn indexes() -> HashSet<i64> {
        (1..=30).collect()
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_validate_drops_unknown_values() {
        let validated = TreeRequest::new(strings(&["RM", "Zorya", "BREX"]), vec![3, 99, 1], true)
            .validate(&catalog(), &indexes());

        assert_eq!(validated.systems, strings(&["BREX", "RM"]));
        assert_eq!(validated.subtree, vec![1, 3]);
        assert!(validated.mlst);
    }

    #[test]
    fn test_subtree_sorts_numerically() {
        let validated =
            TreeRequest::new(vec![], vec![10, 2, 1], false).validate(&catalog(), &indexes());
        assert_eq!(validated.subtree, vec![1, 2, 10]);
        assert_eq!(validated.key_material(), "|1,2,10|False");
    }

    #[test]
    fn test_key_material_separates_values() {
        let validated = TreeRequest::new(strings(&["RM", "CRISPR"]), vec![4, 2], true)
            .validate(&catalog(), &indexes());
        assert_eq!(validated.key_material(), "CRISPR,RM|2,4|True");
    }

    #[test]
    fn test_adjacent_indexes_do_not_merge() {
        let a = TreeRequest::new(vec![], vec![1, 2, 3], false).validate(&catalog(), &indexes());
        let b = TreeRequest::new(vec![], vec![1, 23], false).validate(&catalog(), &indexes());
        assert_ne!(a.key_material(), b.key_material());
        assert_ne!(a.cache_key(), b.cache_key());
    }

    #[test]
    fn test_adjacent_system_names_do_not_merge() {
        let catalog = Catalog::new(vec![
            DefenseSystem::new("Abi", "Abi", "#111111"),
            DefenseSystem::new("AbiE", "AbiE", "#222222"),
            DefenseSystem::new("E", "E", "#333333"),
        ]);
        let a = TreeRequest::new(strings(&["Abi", "E"]), vec![], false)
            .validate(&catalog, &indexes());
        let b = TreeRequest::new(strings(&["AbiE"]), vec![], false).validate(&catalog, &indexes());
        assert_ne!(a.cache_key(), b.cache_key());
    }

    #[test]
    fn test_cache_key_ignores_input_order_and_duplicates() {
        let a = TreeRequest::new(strings(&["RM", "BREX"]), vec![5, 3, 7], false)
            .validate(&catalog(), &indexes());
        let b = TreeRequest::new(strings(&["BREX", "RM", "RM"]), vec![7, 5, 3, 3], false)
            .validate(&catalog(), &indexes());
        assert_eq!(a.cache_key(), b.cache_key());
    }

    #[test]
    fn test_cache_key_distinguishes_flag() {
        let a = TreeRequest::new(strings(&["RM"]), vec![1], false).validate(&catalog(), &indexes());
        let b = TreeRequest::new(strings(&["RM"]), vec![1], true).validate(&catalog(), &indexes());
        assert_ne!(a.cache_key(), b.cache_key());
    }

    #[test]
    fn test_invalid_values_share_key_with_empty_request() {
        let garbage = TreeRequest::new(strings(&["Nope"]), vec![1000], false)
            .validate(&catalog(), &indexes());
        let empty = TreeRequest::default().validate(&catalog(), &indexes());
        assert_eq!(garbage, empty);
        assert!(garbage.is_full_tree());
        assert_eq!(garbage.cache_key(), empty.cache_key());
    }

    #[test]
    fn test_cache_key_file_names() {
        let key = TreeRequest::default()
            .validate(&catalog(), &indexes())
            .cache_key();
        assert_eq!(key.as_str().len(), 64);
        assert!(key.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(key.image_file(), format!("{}.png", key));
        assert_eq!(key.partial_image_file(), format!("{}.png.part", key));
        assert_eq!(key.script_file(), format!("{}.R", key));
        assert_eq!(key.dataset_file(), format!("{}.csv", key));
    }
}
