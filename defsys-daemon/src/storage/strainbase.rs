//! StrainBase - DuckDB-based storage for strains, genes and defense systems.

use anyhow::{Context, Result};
use duckdb::{params, Config, Connection};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use defsys_core::dataset::Memberships;
use defsys_core::types::{
    DefenseSystem, GeneDefenseSystem, Strain, StrainIndex, StrainName, SystemColor,
};

use super::schema::{SCHEMA_SQL, SCHEMA_VERSION};

/// Database access mode for concurrent access control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccessMode {
    /// Read-write mode (exclusive lock, for seeding)
    #[default]
    ReadWrite,
    /// Read-only mode (shared access, for serving)
    ReadOnly,
}

/// A gene row as stored, i.e. together with the assembly it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneRecord {
    pub assembly: String,
    pub gene: GeneDefenseSystem,
}

/// Row counts per table.
#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct StoreStats {
    pub strains: usize,
    pub defense_systems: usize,
    pub genes: usize,
}

/// StrainBase - DuckDB-based storage for the strain browser.
pub struct StrainBase {
    conn: Arc<Mutex<Connection>>,
    path: Option<PathBuf>,
}

impl StrainBase {
    /// Open or create a database in read-write mode.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_mode(path, AccessMode::ReadWrite)
    }

    /// Open an existing database in read-only mode.
    pub fn open_read_only(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_mode(path, AccessMode::ReadOnly)
    }

    /// Open a database with the specified access mode.
    pub fn open_with_mode(path: impl AsRef<Path>, mode: AccessMode) -> Result<Self> {
        let path = path.as_ref();

        let conn = match mode {
            AccessMode::ReadWrite => Connection::open(path)
                .with_context(|| format!("Failed to open database: {:?}", path))?,
            AccessMode::ReadOnly => {
                let config = Config::default()
                    .access_mode(duckdb::AccessMode::ReadOnly)
                    .map_err(|e| anyhow::anyhow!("Failed to set read-only mode: {}", e))?;
                Connection::open_with_flags(path, config).with_context(|| {
                    format!("Failed to open database in read-only mode: {:?}", path)
                })?
            }
        };

        let base = Self {
            conn: Arc::new(Mutex::new(conn)),
            path: Some(path.to_path_buf()),
        };

        // Only initialize schema in read-write mode
        if mode == AccessMode::ReadWrite {
            base.init_schema()?;
        }

        Ok(base)
    }

    /// Open a throwaway in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        let base = Self {
            conn: Arc::new(Mutex::new(conn)),
            path: None,
        };
        base.init_schema()?;
        Ok(base)
    }

    /// Location of the database file, `None` for in-memory databases.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Acquire the database connection lock, recovering from a poisoned mutex.
    fn acquire_conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        match self.conn.lock() {
            Ok(guard) => Ok(guard),
            Err(poisoned) => {
                tracing::warn!("Recovering from poisoned database mutex");
                Ok(poisoned.into_inner())
            }
        }
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.acquire_conn()?;

        conn.execute_batch(SCHEMA_SQL)
            .context("Failed to initialize schema")?;

        conn.execute(
            "INSERT OR REPLACE INTO metadata (key, value) VALUES ('schema_version', ?)",
            params![SCHEMA_VERSION],
        )
        .context("Failed to set schema version")?;

        Ok(())
    }

    /// Run a batch of SQL statements, e.g. a seed script.
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        let conn = self.acquire_conn()?;
        conn.execute_batch(sql).context("Failed to execute SQL batch")?;
        Ok(())
    }

    /// Insert strains, updating rows whose index already exists.
    pub fn insert_strains(&self, strains: &[Strain]) -> Result<()> {
        let conn = self.acquire_conn()?;
        let mut stmt = conn.prepare(
            "INSERT INTO strains (strain_index, strain, assembly, isolation_type, mlst)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT (strain_index) DO UPDATE SET
                 strain = excluded.strain,
                 isolation_type = excluded.isolation_type,
                 mlst = excluded.mlst",
        )?;
        for strain in strains {
            stmt.execute(params![
                strain.index,
                strain.strain,
                strain.assembly,
                strain.isolation_type,
                strain.mlst,
            ])
            .with_context(|| format!("Failed to insert strain: {}", strain.assembly))?;
        }
        tracing::debug!("insert_strains: {} rows", strains.len());
        Ok(())
    }

    /// Insert or replace defense systems.
    pub fn insert_defense_systems(&self, systems: &[DefenseSystem]) -> Result<()> {
        let conn = self.acquire_conn()?;
        let mut stmt = conn.prepare(
            "INSERT OR REPLACE INTO defense_systems (name, label, color) VALUES (?, ?, ?)",
        )?;
        for system in systems {
            stmt.execute(params![system.name, system.label, system.color])
                .with_context(|| format!("Failed to insert defense system: {}", system.name))?;
        }
        tracing::debug!("insert_defense_systems: {} rows", systems.len());
        Ok(())
    }

    /// Append genes using an appender for better performance.
    pub fn insert_genes(&self, genes: &[GeneRecord]) -> Result<()> {
        let conn = self.acquire_conn()?;
        {
            let mut appender = conn
                .appender("genes")
                .context("Failed to create gene appender")?;
            for record in genes {
                let g = &record.gene;
                appender.append_row(params![
                    record.assembly,
                    g.locus_tag,
                    g.gene,
                    g.product,
                    g.defense_system,
                    g.start,
                    g.end,
                    g.strand,
                ])?;
            }
            appender.flush()?;
        }
        tracing::debug!("insert_genes: {} rows", genes.len());
        Ok(())
    }

    /// Names and assemblies of all strains.
    pub fn strain_names(&self) -> Result<Vec<StrainName>> {
        let conn = self.acquire_conn()?;
        let mut stmt =
            conn.prepare("SELECT strain, assembly FROM strains ORDER BY strain_index")?;
        let rows = stmt.query_map([], |row| {
            Ok(StrainName {
                strain: row.get(0)?,
                assembly: row.get(1)?,
            })
        })?;
        Ok(rows.collect::<duckdb::Result<Vec<_>>>()?)
    }

    /// Indexes and names of all strains.
    pub fn strain_indexes(&self) -> Result<Vec<StrainIndex>> {
        let conn = self.acquire_conn()?;
        let mut stmt =
            conn.prepare("SELECT strain_index, strain FROM strains ORDER BY strain_index")?;
        let rows = stmt.query_map([], |row| {
            Ok(StrainIndex {
                index: row.get(0)?,
                strain: row.get(1)?,
            })
        })?;
        Ok(rows.collect::<duckdb::Result<Vec<_>>>()?)
    }

    /// Full strain records including isolation type and MLST.
    pub fn strains(&self) -> Result<Vec<Strain>> {
        let conn = self.acquire_conn()?;
        let mut stmt = conn.prepare(
            "SELECT strain_index, strain, assembly, isolation_type, mlst
             FROM strains ORDER BY strain_index",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(Strain {
                index: row.get(0)?,
                strain: row.get(1)?,
                assembly: row.get(2)?,
                isolation_type: row.get(3)?,
                mlst: row.get(4)?,
            })
        })?;
        Ok(rows.collect::<duckdb::Result<Vec<_>>>()?)
    }

    /// All defense systems in name order.
    pub fn defense_systems(&self) -> Result<Vec<DefenseSystem>> {
        let conn = self.acquire_conn()?;
        let mut stmt = conn.prepare("SELECT name, label, color FROM defense_systems ORDER BY name")?;
        let rows = stmt.query_map([], |row| {
            Ok(DefenseSystem {
                name: row.get(0)?,
                label: row.get(1)?,
                color: row.get(2)?,
            })
        })?;
        Ok(rows.collect::<duckdb::Result<Vec<_>>>()?)
    }

    /// Label and color of every defense system.
    pub fn system_colors(&self) -> Result<Vec<SystemColor>> {
        Ok(self
            .defense_systems()?
            .into_iter()
            .map(|s| SystemColor {
                label: s.label,
                color: s.color,
            })
            .collect())
    }

    /// Genes of one assembly that belong to a defense system.
    pub fn genes_of_strain(&self, assembly: &str) -> Result<Vec<GeneDefenseSystem>> {
        let conn = self.acquire_conn()?;
        let mut stmt = conn.prepare(
            "SELECT locus_tag, gene, product, defense_system, start_pos, end_pos, strand
             FROM genes WHERE assembly = ? ORDER BY start_pos, locus_tag",
        )?;
        let rows = stmt.query_map(params![assembly], |row| {
            Ok(GeneDefenseSystem {
                locus_tag: row.get(0)?,
                gene: row.get(1)?,
                product: row.get(2)?,
                defense_system: row.get(3)?,
                start: row.get(4)?,
                end: row.get(5)?,
                strand: row.get(6)?,
            })
        })?;
        rows.collect::<duckdb::Result<Vec<_>>>()
            .with_context(|| format!("Failed to load genes for {}", assembly))
    }

    /// Which defense systems each assembly carries.
    pub fn memberships(&self) -> Result<Memberships> {
        let conn = self.acquire_conn()?;
        let mut stmt = conn.prepare("SELECT DISTINCT assembly, defense_system FROM genes")?;
        let mut rows = stmt.query([])?;

        let mut memberships = Memberships::new();
        while let Some(row) = rows.next()? {
            let assembly: String = row.get(0)?;
            let system: String = row.get(1)?;
            memberships.entry(assembly).or_default().insert(system);
        }
        Ok(memberships)
    }

    /// Row counts per table.
    pub fn stats(&self) -> Result<StoreStats> {
        let conn = self.acquire_conn()?;
        let strains: usize = conn.query_row("SELECT COUNT(*) FROM strains", [], |row| row.get(0))?;
        let defense_systems: usize =
            conn.query_row("SELECT COUNT(*) FROM defense_systems", [], |row| row.get(0))?;
        let genes: usize = conn.query_row("SELECT COUNT(*) FROM genes", [], |row| row.get(0))?;
        Ok(StoreStats {
            strains,
            defense_systems,
            genes,
        })
    }
}
