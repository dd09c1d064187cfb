//! Phylogenetic tree rendering with a content-addressed file cache.
//!
//! Images live in the cache directory as `<key>.png`, next to the `<key>.csv`
//! dataset and `<key>.R` script that produced them. A cached image is served
//! without touching R. On a miss the renderer takes the per-key lock, checks
//! the cache again, writes dataset and script, runs the script and moves the
//! finished image into place. Entries are never invalidated.

mod locks;
mod runner;

pub use locks::{KeyGuard, KeyedLocks};
pub use runner::{RenderJob, RscriptRunner, RunOutput, ScriptRunner};

use std::collections::HashSet;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, error, info};

use defsys_core::dataset::{Dataset, Memberships};
use defsys_core::layout::LayoutParams;
use defsys_core::script::{Layer, TreeScript};
use defsys_core::types::{Catalog, Strain};
use defsys_core::{CacheKey, CoreError, ValidatedTree};

use crate::config::RenderConfig;

/// Errors that can occur while producing a tree image.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The renderer process could not be started.
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    /// The renderer exited unsuccessfully.
    #[error("renderer exited with status {code:?}")]
    Failed { code: Option<i32>, stderr: String },

    /// The renderer exited cleanly but produced no image.
    #[error("renderer produced no image at {0:?}")]
    MissingOutput(PathBuf),

    #[error("cache IO error: {0}")]
    Io(#[from] io::Error),

    #[error("failed to prepare render inputs: {0}")]
    Prepare(#[from] CoreError),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),

    #[error("render task aborted: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Database content a render needs on a cache miss.
#[derive(Debug, Clone, Default)]
pub struct RenderInputs {
    pub strains: Vec<Strain>,
    pub memberships: Memberships,
}

/// A rendered (or cached) tree image.
#[derive(Debug, Clone)]
pub struct RenderedTree {
    pub key: CacheKey,
    pub path: PathBuf,
    pub bytes: Vec<u8>,
    /// Whether the image was served from the cache.
    pub cached: bool,
}

/// Renders trees through a [`ScriptRunner`] and caches the results.
pub struct TreeRenderer {
    cache_dir: PathBuf,
    tree_file: Option<PathBuf>,
    runner: Arc<dyn ScriptRunner>,
    locks: KeyedLocks,
}

async fn read_if_exists(path: &Path) -> io::Result<Option<Vec<u8>>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Run `job` and move its image to `image`. Blocks.
fn run_to_cache(
    runner: &dyn ScriptRunner,
    job: &RenderJob,
    key: &CacheKey,
    image: &Path,
) -> Result<Vec<u8>, RenderError> {
    let output = match runner.run(job) {
        Ok(output) => output,
        Err(source) => {
            let program = runner.program().display().to_string();
            error!("Failed to start {}: {}", program, source);
            return Err(RenderError::Spawn { program, source });
        }
    };

    if !output.stdout.trim().is_empty() {
        debug!("Tree render {} output: {}", key, output.stdout.trim());
    }

    if !output.success {
        error!(
            "Tree render {} failed with status {:?}: {}",
            key,
            output.code,
            output.stderr.trim()
        );
        let _ = std::fs::remove_file(&job.output);
        return Err(RenderError::Failed {
            code: output.code,
            stderr: output.stderr,
        });
    }

    if !job.output.is_file() {
        error!("Tree render {} produced no image", key);
        return Err(RenderError::MissingOutput(job.output.clone()));
    }

    std::fs::rename(&job.output, image)?;
    Ok(std::fs::read(image)?)
}

impl TreeRenderer {
    /// Create a renderer, creating the cache directory if needed.
    pub fn new(config: &RenderConfig, runner: Arc<dyn ScriptRunner>) -> io::Result<Self> {
        std::fs::create_dir_all(&config.cache_dir)?;
        // R gets absolute paths regardless of its working directory.
        let cache_dir = config.cache_dir.canonicalize()?;

        Ok(Self {
            cache_dir,
            tree_file: config.tree_file.clone(),
            runner,
            locks: KeyedLocks::new(),
        })
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn image_path(&self, key: &CacheKey) -> PathBuf {
        self.cache_dir.join(key.image_file())
    }

    /// Number of finished images in the cache directory.
    pub fn cached_image_count(&self) -> usize {
        std::fs::read_dir(&self.cache_dir)
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .filter(|e| e.path().extension().is_some_and(|ext| ext == "png"))
                    .count()
            })
            .unwrap_or(0)
    }

    /// Return the image for `tree`, rendering it on a cache miss.
    ///
    /// `load` is only awaited on a miss, after the per-key lock is held.
    pub async fn render<F, Fut>(
        &self,
        tree: &ValidatedTree,
        catalog: &Catalog,
        load: F,
    ) -> Result<RenderedTree, RenderError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<RenderInputs>>,
    {
        let key = tree.cache_key();
        let image = self.image_path(&key);

        if let Some(bytes) = read_if_exists(&image).await? {
            debug!("Tree cache hit: {}", key);
            return Ok(RenderedTree {
                key,
                path: image,
                bytes,
                cached: true,
            });
        }

        let guard = self.locks.lock(key.as_str()).await;

        // Another request may have finished this key while we waited.
        if let Some(bytes) = read_if_exists(&image).await? {
            debug!("Tree rendered by a concurrent request: {}", key);
            return Ok(RenderedTree {
                key,
                path: image,
                bytes,
                cached: true,
            });
        }

        let start = Instant::now();
        let inputs = load().await?;
        let job = self.prepare(&key, tree, catalog, &inputs)?;

        // The key stays locked until the script exits, even if the caller
        // is dropped in the meantime.
        let runner = Arc::clone(&self.runner);
        let task_key = key.clone();
        let task_image = image.clone();
        let bytes = tokio::task::spawn_blocking(move || {
            let result = run_to_cache(runner.as_ref(), &job, &task_key, &task_image);
            drop(guard);
            result
        })
        .await??;

        info!(
            "Rendered tree {} ({} systems, {} strains) in {:?}",
            key,
            tree.systems.len(),
            tree.item_count(),
            start.elapsed()
        );

        Ok(RenderedTree {
            key,
            path: image,
            bytes,
            cached: false,
        })
    }

    /// Write the dataset and script for `key`.
    fn prepare(
        &self,
        key: &CacheKey,
        tree: &ValidatedTree,
        catalog: &Catalog,
        inputs: &RenderInputs,
    ) -> Result<RenderJob, RenderError> {
        let in_scope: Vec<Strain> = if tree.is_full_tree() {
            inputs.strains.clone()
        } else {
            let wanted: HashSet<i64> = tree.subtree.iter().copied().collect();
            inputs
                .strains
                .iter()
                .filter(|s| wanted.contains(&s.index))
                .cloned()
                .collect()
        };

        let columns: Vec<String> = catalog.system_names().map(str::to_string).collect();
        let dataset = Dataset::build(&in_scope, &columns, &inputs.memberships);

        // A subtree only gets rings for systems that occur in it.
        let systems = if tree.is_full_tree() {
            tree.systems.clone()
        } else {
            dataset.present_systems(&tree.systems)
        };

        let dataset_path = self.cache_dir.join(key.dataset_file());
        dataset.write_csv(&dataset_path)?;

        let output = self.cache_dir.join(key.partial_image_file());
        let script = TreeScript {
            dataset: dataset_path,
            output: output.clone(),
            tree_file: self.tree_file.clone(),
            subtree: tree.subtree.clone(),
            mlst: tree.mlst,
            layers: systems
                .iter()
                .map(|system| Layer {
                    system: system.clone(),
                    color: catalog.color_or_default(system).to_string(),
                })
                .collect(),
            layout: LayoutParams::for_count(tree.item_count()),
        };

        let script_path = self.cache_dir.join(key.script_file());
        std::fs::write(&script_path, script.render())?;
        debug!(
            "Prepared tree {}: {} rows, {} layers",
            key,
            dataset.row_count(),
            systems.len()
        );

        Ok(RenderJob {
            script: script_path,
            output,
            workdir: self.cache_dir.clone(),
        })
    }
}
