//! Shared fixtures for the HTTP integration tests.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

use defsys_core::types::{DefenseSystem, GeneDefenseSystem, Strain};
use defsys_daemon::config::{FilesConfig, RenderConfig};
use defsys_daemon::render::{RenderJob, RunOutput, ScriptRunner, TreeRenderer};
use defsys_daemon::server::{create_router, AppState};
use defsys_daemon::storage::{GeneRecord, StrainBase};

pub const DEFAULT_ASSEMBLY: &str = "GCF_000404265.1";
pub const DEFAULT_CIRCOS: &str = "<html>default strain</html>";

/// Stands in for Rscript: counts runs and writes a fake image.
pub struct CountingRunner {
    pub calls: AtomicUsize,
    pub succeed: bool,
    pub delay: Duration,
}

impl CountingRunner {
    pub fn new(succeed: bool) -> Arc<Self> {
        Self::with_delay(succeed, Duration::ZERO)
    }

    pub fn with_delay(succeed: bool, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            succeed,
            delay,
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ScriptRunner for CountingRunner {
    fn run(&self, job: &RenderJob) -> io::Result<RunOutput> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(self.delay);
        if !self.succeed {
            return Ok(RunOutput {
                success: false,
                code: Some(1),
                stderr: "there is no package called 'ggtreeExtra'".to_string(),
                ..Default::default()
            });
        }
        let script = std::fs::read(&job.script)?;
        let mut image = b"\x89PNG\r\n".to_vec();
        image.extend_from_slice(format!("run-{}-{}", n, script.len()).as_bytes());
        std::fs::write(&job.output, image)?;
        Ok(RunOutput {
            success: true,
            code: Some(0),
            ..Default::default()
        })
    }

    fn program(&self) -> &Path {
        Path::new("counting-rscript")
    }
}

pub struct TestApp {
    pub router: Router,
    pub runner: Arc<CountingRunner>,
    pub cache_dir: PathBuf,
    pub circos_dir: PathBuf,
    _dir: TempDir,
}

fn gene(assembly: &str, locus_tag: &str, system: &str, start: i64) -> GeneRecord {
    GeneRecord {
        assembly: assembly.to_string(),
        gene: GeneDefenseSystem {
            locus_tag: locus_tag.to_string(),
            gene: Some(format!("{}_gene", system.to_lowercase())),
            product: None,
            defense_system: system.to_string(),
            start: Some(start),
            end: Some(start + 1200),
            strand: Some("-".to_string()),
        },
    }
}

pub fn seed(db: &StrainBase) {
    db.insert_strains(&[
        Strain::new(1, "Pseudomonas aeruginosa PAO1", DEFAULT_ASSEMBLY)
            .with_mlst("ST549")
            .with_isolation_type("wound"),
        Strain::new(2, "Pseudomonas aeruginosa PA14", "GCF_000014625.1").with_mlst("ST253"),
        Strain::new(3, "Pseudomonas aeruginosa LESB58", "GCF_000026645.1").with_mlst("ST146"),
    ])
    .unwrap();
    db.insert_defense_systems(&[
        DefenseSystem::new("BREX", "BREX", "#1F77B4"),
        DefenseSystem::new("CRISPR", "CRISPR", "#FF7F0E"),
        DefenseSystem::new("RM", "RM", "#2CA02C"),
    ])
    .unwrap();
    db.insert_genes(&[
        gene(DEFAULT_ASSEMBLY, "PA0001", "RM", 10_000),
        gene(DEFAULT_ASSEMBLY, "PA0002", "CRISPR", 20_000),
        gene("GCF_000014625.1", "PA14_00010", "BREX", 500),
    ])
    .unwrap();
}

/// Build an app over a seeded in-memory database.
pub fn app(runner: Arc<CountingRunner>) -> TestApp {
    app_with(runner, true, true)
}

pub fn app_with(runner: Arc<CountingRunner>, seeded: bool, default_circos: bool) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let cache_dir = dir.path().join("def_Sys");
    let circos_dir = dir.path().join("Circos");
    std::fs::create_dir_all(&circos_dir).unwrap();

    if default_circos {
        std::fs::write(
            circos_dir.join(format!("{}.html", DEFAULT_ASSEMBLY)),
            DEFAULT_CIRCOS,
        )
        .unwrap();
    }
    std::fs::write(
        circos_dir.join("GCF_000014625.1.html"),
        "<html>PA14</html>",
    )
    .unwrap();

    let db = StrainBase::open_in_memory().unwrap();
    if seeded {
        seed(&db);
    }

    let render_config = RenderConfig {
        cache_dir: cache_dir.clone(),
        ..Default::default()
    };
    let renderer = TreeRenderer::new(&render_config, runner.clone()).unwrap();
    let files = FilesConfig {
        circos_dir: circos_dir.clone(),
        default_assembly: DEFAULT_ASSEMBLY.to_string(),
    };
    let state = AppState::from_store(db, renderer, files).unwrap();

    TestApp {
        router: create_router(state),
        runner,
        cache_dir,
        circos_dir,
        _dir: dir,
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).expect("response is not JSON")
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

pub async fn get(router: &Router, uri: &str) -> TestResponse {
    let response = router
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec();
    TestResponse {
        status,
        headers,
        body,
    }
}
