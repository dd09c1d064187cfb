//! Storage layer for the defsys daemon.
//!
//! Provides DuckDB-based storage for strains, genes and defense systems with:
//! - Schema management
//! - Parameterized lookups backing each HTTP endpoint
//! - Bulk inserts for seeding and tests

mod schema;
mod strainbase;

pub use schema::SCHEMA_VERSION;
pub use strainbase::{AccessMode, GeneRecord, StoreStats, StrainBase};
