//! Concurrency integration tests.
//!
//! - Simultaneous tree requests for one key run the renderer once
//! - Requests for different keys do not wait on each other's results
//! - Several read-only handles can query one database file

mod common;

use axum::http::StatusCode;
use common::{app, get, seed, CountingRunner};
use defsys_daemon::server::CACHE_HEADER;
use defsys_daemon::storage::StrainBase;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;
use tempfile::tempdir;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_misses_render_once() {
    let app = app(CountingRunner::with_delay(true, Duration::from_millis(150)));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let router = app.router.clone();
            // Same effective request, spelled differently each time.
            let uri = if i % 2 == 0 {
                "/api/v1/strains/phyloTree?systems=RM&systems=BREX&subtree=1&subtree=2"
            } else {
                "/strains/phyloTree?subtree=2&systems=BREX&subtree=1&systems=RM"
            };
            tokio::spawn(async move { get(&router, uri).await })
        })
        .collect();

    let mut bodies = Vec::new();
    let mut misses = 0;
    for handle in handles {
        let res = handle.await.expect("request task panicked");
        assert_eq!(res.status, StatusCode::OK);
        if res.header(CACHE_HEADER) == Some("miss") {
            misses += 1;
        }
        bodies.push(res.body);
    }

    assert_eq!(app.runner.calls(), 1, "renderer should run exactly once");
    assert_eq!(misses, 1);
    assert!(bodies.windows(2).all(|w| w[0] == w[1]));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_distinct_keys_render_independently() {
    let app = app(CountingRunner::with_delay(true, Duration::from_millis(50)));

    let uris = [
        "/api/v1/strains/phyloTree?systems=RM",
        "/api/v1/strains/phyloTree?systems=BREX",
        "/api/v1/strains/phyloTree?systems=CRISPR",
        "/api/v1/strains/phyloTree?systems=RM&MLST=true",
    ];
    let handles: Vec<_> = uris
        .iter()
        .map(|&uri| {
            let router = app.router.clone();
            tokio::spawn(async move { get(&router, uri).await })
        })
        .collect();

    let mut bodies = Vec::new();
    for handle in handles {
        let res = handle.await.expect("request task panicked");
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.header(CACHE_HEADER), Some("miss"));
        bodies.push(res.body);
    }

    assert_eq!(app.runner.calls(), uris.len());
    bodies.sort();
    bodies.dedup();
    assert_eq!(bodies.len(), uris.len(), "each key gets its own image");
}

/// Several read-only handles on one file can query at the same time.
#[test]
fn test_concurrent_readers() {
    let dir = tempdir().expect("Failed to create temp dir");
    let db_path = dir.path().join("defsys.duckdb");

    {
        let db = StrainBase::open(&db_path).expect("Failed to open database");
        seed(&db);
    }

    let db_path = Arc::new(db_path);
    let barrier = Arc::new(Barrier::new(3));

    let handles: Vec<_> = (0..3)
        .map(|i| {
            let path = Arc::clone(&db_path);
            let barrier = Arc::clone(&barrier);

            thread::spawn(move || {
                barrier.wait();

                let db = StrainBase::open_read_only(&*path)
                    .unwrap_or_else(|e| panic!("Reader {} failed to open DB: {}", i, e));
                let strains = db
                    .strain_names()
                    .unwrap_or_else(|e| panic!("Reader {} got error: {}", i, e));
                let colors = db.system_colors().expect("colors query failed");
                (strains.len(), colors.len())
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let counts = handle
            .join()
            .unwrap_or_else(|_| panic!("Reader thread {} panicked", i));
        assert_eq!(counts, (3, 3), "Reader {} saw wrong counts", i);
    }
}

/// Read-only handles never create the schema.
#[test]
fn test_read_only_does_not_write() {
    let dir = tempdir().expect("Failed to create temp dir");
    let db_path = dir.path().join("defsys.duckdb");

    {
        let db = StrainBase::open(&db_path).expect("Failed to open database");
        seed(&db);
    }

    let db = StrainBase::open_read_only(&db_path).expect("Failed to open read-only");
    assert!(db
        .execute_batch("INSERT INTO metadata (key, value) VALUES ('k', 'v')")
        .is_err());
    assert_eq!(db.stats().unwrap().genes, 3);
}
