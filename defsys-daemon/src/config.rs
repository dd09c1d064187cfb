//! Daemon configuration loaded from `defsys.toml`.
//!
//! Every section is optional and falls back to defaults matching the layout
//! the browser frontend has always used (`static/def_Sys`, `static/Circos`).
//! Command-line flags override file values.
//!
//! # Example Configuration
//!
//! ```toml
//! [server]
//! host = "127.0.0.1"
//! port = 8800
//!
//! [database]
//! path = "defsys.duckdb"
//!
//! [render]
//! rscript = "/usr/bin/Rscript"
//! cache_dir = "static/def_Sys"
//! tree_file = "data/strains.nwk"
//!
//! [files]
//! circos_dir = "static/Circos"
//! default_assembly = "GCF_000404265.1"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Config file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "defsys.toml";

/// Strain served when the requested one is unknown or malformed.
pub const DEFAULT_ASSEMBLY: &str = "GCF_000404265.1";

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct DefsysConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    /// Tree rendering and the image cache.
    #[serde(default)]
    pub render: RenderConfig,

    /// Static per-strain files.
    #[serde(default)]
    pub files: FilesConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8800
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// DuckDB database file.
    #[serde(default = "default_database_path")]
    pub path: PathBuf,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("defsys.duckdb")
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RenderConfig {
    /// Rscript executable; a bare name is resolved through `PATH`.
    #[serde(default = "default_rscript")]
    pub rscript: PathBuf,

    /// Directory holding generated datasets, scripts and images.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Newick tree with strain indexes as tip labels.
    ///
    /// Default: the `our_tree.tree` file shipped with ggtreeExtra.
    #[serde(default)]
    pub tree_file: Option<PathBuf>,
}

fn default_rscript() -> PathBuf {
    PathBuf::from("Rscript")
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("static/def_Sys")
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            rscript: default_rscript(),
            cache_dir: default_cache_dir(),
            tree_file: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FilesConfig {
    /// Directory of `<assembly>.html` circos pages.
    #[serde(default = "default_circos_dir")]
    pub circos_dir: PathBuf,

    /// Assembly used whenever a requested strain cannot be served.
    #[serde(default = "default_assembly")]
    pub default_assembly: String,
}

fn default_circos_dir() -> PathBuf {
    PathBuf::from("static/Circos")
}

fn default_assembly() -> String {
    DEFAULT_ASSEMBLY.to_string()
}

impl FilesConfig {
    /// Circos page of `assembly`.
    pub fn circos_file(&self, assembly: &str) -> PathBuf {
        self.circos_dir.join(format!("{}.html", assembly))
    }

    /// Path of the default strain's circos page.
    pub fn default_circos_file(&self) -> PathBuf {
        self.circos_file(&self.default_assembly)
    }
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            circos_dir: default_circos_dir(),
            default_assembly: default_assembly(),
        }
    }
}

impl DefsysConfig {
    /// Load configuration.
    ///
    /// An explicitly given file must exist and parse. Without one,
    /// `defsys.toml` in the working directory is used if present; parse
    /// errors there are logged and defaults used instead.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            return toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path));
        }

        let path = Path::new(DEFAULT_CONFIG_FILE);
        if path.exists() {
            match std::fs::read_to_string(path) {
                Ok(content) => match toml::from_str(&content) {
                    Ok(config) => return Ok(config),
                    Err(e) => tracing::warn!("Failed to parse {}: {}", DEFAULT_CONFIG_FILE, e),
                },
                Err(e) => tracing::warn!("Failed to read {}: {}", DEFAULT_CONFIG_FILE, e),
            }
        }
        Ok(Self::default())
    }
}
