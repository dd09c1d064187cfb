//! defsys core - domain logic for the strain / defense-system browser.
//!
//! This crate holds everything the HTTP daemon needs that does not touch the
//! database or the network:
//!
//! - **Types**: strains, defense systems, gene associations, the startup catalog
//! - **Tree requests**: validation against reference data and the cache key
//! - **Layout**: plot parameters derived from the number of displayed strains
//! - **Dataset**: one-hot strain × defense-system table written as CSV
//! - **Script**: the R program that draws the circular phylogenetic tree
//!
//! # Example
//!
//! ```
//! use defsys_core::request::TreeRequest;
//! use defsys_core::types::{Catalog, DefenseSystem};
//! use std::collections::HashSet;
//!
//! let catalog = Catalog::new(vec![
//!     DefenseSystem::new("CRISPR", "CRISPR", "#FF0000"),
//!     DefenseSystem::new("RM", "RM", "#00FF00"),
//! ]);
//! let known: HashSet<i64> = [1, 2, 3].into_iter().collect();
//!
//! let a = TreeRequest::new(vec!["RM".into(), "CRISPR".into()], vec![3, 1], false)
//!     .validate(&catalog, &known);
//! let b = TreeRequest::new(vec!["CRISPR".into(), "RM".into()], vec![1, 3], false)
//!     .validate(&catalog, &known);
//! assert_eq!(a.cache_key(), b.cache_key());
//! ```

pub mod dataset;
pub mod error;
pub mod layout;
pub mod request;
pub mod script;
pub mod strain_name;
pub mod types;

pub use error::{CoreError, Result};
pub use request::{CacheKey, TreeRequest, ValidatedTree};
pub use types::Catalog;
