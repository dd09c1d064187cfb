//! HTTP routes and handlers for the strain browser API.

use axum::{
    extract::{Path, RawQuery, State},
    http::header,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use defsys_core::strain_name::parse_assembly;
use defsys_core::types::{GeneDefenseSystem, StrainIndex, StrainName, SystemColor};

use super::error::ApiError;
use super::query::parse_tree_query;
use super::state::AppState;
use crate::render::RenderInputs;
use crate::storage::SCHEMA_VERSION;

/// Header telling clients whether the tree came from the cache.
pub const CACHE_HEADER: &str = "x-defsys-cache";

type SharedState = Arc<AppState>;

/// Create the main router with all routes.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let router = Router::new()
        // Health and status
        .route("/health", get(health))
        .route("/status", get(status))
        // Gene lookup by assembly
        .route(
            "/api/v1/cluster/get_gene_strain_id/:assembly",
            get(gene_strain_id),
        );

    // Strain endpoints, versioned and bare
    let router = strain_routes(router, "/api/v1/strains");
    let router = strain_routes(router, "/strains");

    router
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

fn strain_routes(router: Router<SharedState>, prefix: &str) -> Router<SharedState> {
    router
        .route(prefix, get(strains_list))
        .route(&format!("{}/", prefix), get(strains_list))
        .route(&format!("{}/indexes", prefix), get(strains_indexes))
        .route(&format!("{}/phyloTree", prefix), get(phylogenetic_tree))
        .route(&format!("{}/strainCircos", prefix), get(default_circos))
        .route(
            &format!("{}/strainCircos/:strain_name", prefix),
            get(strain_circos),
        )
        .route(
            &format!("{}/strainGenesDefSystems/:strain_name", prefix),
            get(genes_def_systems),
        )
        .route(&format!("{}/defSystemsColors", prefix), get(def_systems_colors))
}

// =============================================================================
// Response Types
// =============================================================================

#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: Option<T>,
    error: Option<String>,
    duration_ms: u64,
}

impl<T: Serialize> ApiResponse<T> {
    fn ok(data: T, duration_ms: u64) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
            duration_ms,
        })
    }

    fn err(error: impl ToString, duration_ms: u64) -> Json<Self> {
        Json(Self {
            success: false,
            data: None,
            error: Some(error.to_string()),
            duration_ms,
        })
    }
}

// =============================================================================
// Health & Status
// =============================================================================

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "defsys-daemon"
    }))
}

#[derive(Serialize)]
struct StatusResponse {
    status: String,
    strain_count: usize,
    defense_system_count: usize,
    gene_count: usize,
    catalog_systems: usize,
    schema_version: String,
    cache_dir: String,
    cached_trees: usize,
    uptime_seconds: f64,
}

async fn status(State(state): State<SharedState>) -> impl IntoResponse {
    let start = Instant::now();

    let stats = state.db.read().await.stats();
    match stats {
        Ok(stats) => {
            let data = StatusResponse {
                status: "running".to_string(),
                strain_count: stats.strains,
                defense_system_count: stats.defense_systems,
                gene_count: stats.genes,
                catalog_systems: state.catalog.len(),
                schema_version: SCHEMA_VERSION.to_string(),
                cache_dir: state.renderer.cache_dir().display().to_string(),
                cached_trees: state.renderer.cached_image_count(),
                uptime_seconds: state.uptime_seconds(),
            };
            ApiResponse::ok(data, start.elapsed().as_millis() as u64)
        }
        Err(e) => ApiResponse::<StatusResponse>::err(e, start.elapsed().as_millis() as u64),
    }
}

// =============================================================================
// Strain Listings
// =============================================================================

/// Names and assembly ids of all strains.
async fn strains_list(
    State(state): State<SharedState>,
) -> Result<Json<Vec<StrainName>>, ApiError> {
    let db = state.db.read().await;
    Ok(Json(db.strain_names()?))
}

/// Index and name of all strains.
async fn strains_indexes(
    State(state): State<SharedState>,
) -> Result<Json<Vec<StrainIndex>>, ApiError> {
    let db = state.db.read().await;
    Ok(Json(db.strain_indexes()?))
}

async fn def_systems_colors(
    State(state): State<SharedState>,
) -> Result<Json<Vec<SystemColor>>, ApiError> {
    let colors = state.db.read().await.system_colors()?;
    if colors.is_empty() {
        return Err(ApiError::NoResults);
    }
    Ok(Json(colors))
}

// =============================================================================
// Phylogenetic Tree
// =============================================================================

/// Render (or fetch from cache) the circular tree for the requested systems
/// and subtree. Empty lists mean the full tree without rings.
async fn phylogenetic_tree(
    State(state): State<SharedState>,
    RawQuery(raw): RawQuery,
) -> Result<impl IntoResponse, ApiError> {
    let request = parse_tree_query(raw.as_deref())?;

    let known: HashSet<i64> = {
        let db = state.db.read().await;
        db.strain_indexes()?.into_iter().map(|s| s.index).collect()
    };
    let tree = request.validate(&state.catalog, &known);
    debug!(
        "Tree request: {} systems, {} strains, MLST={}",
        tree.systems.len(),
        tree.subtree.len(),
        tree.mlst
    );

    let db = Arc::clone(&state.db);
    let rendered = state
        .renderer
        .render(&tree, &state.catalog, move || async move {
            let db = db.read().await;
            Ok::<_, anyhow::Error>(RenderInputs {
                strains: db.strains()?,
                memberships: db.memberships()?,
            })
        })
        .await?;

    let cache = if rendered.cached { "hit" } else { "miss" };
    Ok((
        [
            (header::CONTENT_TYPE, "image/png"),
            (header::HeaderName::from_static(CACHE_HEADER), cache),
        ],
        rendered.bytes,
    ))
}

// =============================================================================
// Per-Strain Files and Genes
// =============================================================================

async fn serve_html(path: &std::path::Path) -> Result<impl IntoResponse, ApiError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to read {:?}: {}", path, e))?;
    Ok(([(header::CONTENT_TYPE, "text/html; charset=utf-8")], bytes))
}

/// The requested strain's circos page, or the default strain's.
fn requested_circos_file(state: &AppState, strain_name: &str) -> Option<PathBuf> {
    let assembly = parse_assembly(strain_name)?;
    let path = state.files.circos_file(assembly);
    path.is_file().then_some(path)
}

async fn serve_default_circos(state: &AppState) -> Result<impl IntoResponse, ApiError> {
    let default = state.files.default_circos_file();
    if !default.is_file() {
        return Err(ApiError::NotFound);
    }
    serve_html(&default).await
}

async fn default_circos(State(state): State<SharedState>) -> Result<impl IntoResponse, ApiError> {
    serve_default_circos(&state).await
}

async fn strain_circos(
    State(state): State<SharedState>,
    Path(strain_name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    match requested_circos_file(&state, &strain_name) {
        Some(path) => serve_html(&path).await.map(IntoResponse::into_response),
        None => {
            debug!("No circos page for {:?}, serving default", strain_name);
            serve_default_circos(&state)
                .await
                .map(IntoResponse::into_response)
        }
    }
}

/// Genes of a strain with their defense systems.
///
/// A name without an assembly is rejected; a strain without genes falls
/// back to the default strain.
async fn genes_def_systems(
    State(state): State<SharedState>,
    Path(strain_name): Path<String>,
) -> Result<Json<Vec<GeneDefenseSystem>>, ApiError> {
    let assembly = parse_assembly(&strain_name).ok_or(ApiError::WrongParameters)?;

    let db = state.db.read().await;
    let genes = db.genes_of_strain(assembly)?;
    if !genes.is_empty() {
        return Ok(Json(genes));
    }

    info!(
        "No genes for {}, falling back to {}",
        assembly, state.files.default_assembly
    );
    let genes = db.genes_of_strain(&state.files.default_assembly)?;
    if genes.is_empty() {
        return Err(ApiError::NoResults);
    }
    Ok(Json(genes))
}

/// Genes of an assembly, without fallback.
async fn gene_strain_id(
    State(state): State<SharedState>,
    Path(assembly): Path<String>,
) -> Result<Json<Vec<GeneDefenseSystem>>, ApiError> {
    let genes = state.db.read().await.genes_of_strain(&assembly)?;
    if genes.is_empty() {
        return Err(ApiError::NoResults);
    }
    Ok(Json(genes))
}
