//! Shared application state for the server.

use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;

use defsys_core::Catalog;

use crate::config::FilesConfig;
use crate::render::TreeRenderer;
use crate::storage::StrainBase;

/// Shared application state.
///
/// The catalog is read once at startup; everything else is queried per
/// request.
#[derive(Clone)]
pub struct AppState {
    /// DuckDB storage
    pub db: Arc<RwLock<StrainBase>>,
    /// Defense-system names and colors
    pub catalog: Arc<Catalog>,
    /// Tree renderer and image cache
    pub renderer: Arc<TreeRenderer>,
    /// Static file locations and the fallback strain
    pub files: FilesConfig,
    /// Server start time for uptime tracking
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        db: StrainBase,
        catalog: Catalog,
        renderer: TreeRenderer,
        files: FilesConfig,
    ) -> Self {
        Self {
            db: Arc::new(RwLock::new(db)),
            catalog: Arc::new(catalog),
            renderer: Arc::new(renderer),
            files,
            start_time: Instant::now(),
        }
    }

    /// Load the catalog from `db` and build the state around it.
    pub fn from_store(
        db: StrainBase,
        renderer: TreeRenderer,
        files: FilesConfig,
    ) -> anyhow::Result<Self> {
        let catalog = Catalog::new(db.defense_systems()?);
        tracing::info!("Loaded {} defense systems", catalog.len());
        Ok(Self::new(db, catalog, renderer, files))
    }

    /// Get uptime in seconds.
    pub fn uptime_seconds(&self) -> f64 {
        self.start_time.elapsed().as_secs_f64()
    }
}
