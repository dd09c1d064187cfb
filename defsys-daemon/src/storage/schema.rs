//! Database schema definitions for the strain browser.

/// SQL schema for creating the defsys database tables.
pub const SCHEMA_SQL: &str = r#"
-- Strains: one row per bacterial isolate
CREATE TABLE IF NOT EXISTS strains (
    strain_index BIGINT PRIMARY KEY,
    strain VARCHAR NOT NULL,
    assembly VARCHAR NOT NULL UNIQUE,
    isolation_type VARCHAR,
    mlst VARCHAR
);

-- Defense systems with their display label and color
CREATE TABLE IF NOT EXISTS defense_systems (
    name VARCHAR PRIMARY KEY,
    label VARCHAR NOT NULL,
    color VARCHAR NOT NULL
);

-- Genes annotated with the defense system they belong to
CREATE TABLE IF NOT EXISTS genes (
    assembly VARCHAR NOT NULL,
    locus_tag VARCHAR NOT NULL,
    gene VARCHAR,
    product VARCHAR,
    defense_system VARCHAR NOT NULL,
    start_pos BIGINT,
    end_pos BIGINT,
    strand VARCHAR
);

-- Metadata table: schema version
CREATE TABLE IF NOT EXISTS metadata (
    key VARCHAR PRIMARY KEY,
    value VARCHAR
);

CREATE INDEX IF NOT EXISTS idx_genes_assembly ON genes(assembly);
CREATE INDEX IF NOT EXISTS idx_genes_system ON genes(defense_system);
"#;

/// Schema version recorded in the metadata table.
pub const SCHEMA_VERSION: &str = "1.0.0";
