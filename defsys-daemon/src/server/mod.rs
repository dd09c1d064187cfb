//! HTTP server for the defsys daemon.
//!
//! Provides the REST API used by the browser frontend:
//! - Strain listings and defense-system colors
//! - Cached phylogenetic tree images
//! - Per-strain circos pages and gene tables
//! - Health and status checks

mod error;
mod http;
mod query;
pub mod state;

pub use error::ApiError;
pub use http::{create_router, CACHE_HEADER};
pub use query::parse_tree_query;
pub use state::AppState;
