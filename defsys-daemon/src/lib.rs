//! defsys daemon library - storage, tree rendering and the HTTP API.
//!
//! This library provides:
//! - Storage layer (DuckDB-based strain / gene / defense-system database)
//! - Tree renderer with an on-disk, content-addressed image cache
//! - axum router serving the browser endpoints
//! - Configuration loading from `defsys.toml`

pub mod config;
pub mod render;
pub mod server;
pub mod storage;
