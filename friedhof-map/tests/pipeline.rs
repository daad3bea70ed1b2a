//! Tests d'intégration du pipeline avec un transport en mémoire

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use friedhof::{ClassificationTag, Extent};
use friedhof_map::fetch::EntryState;
use friedhof_map::{
    Config, DatasetCache, DiagnosticLevel, FetchError, Pipeline, PipelineError, PipelineState,
    RunReport, RunStatus, Transport,
};
use serde_json::json;
use tokio::sync::Notify;

/// Transport en mémoire : réponses par jeu de données, appels comptés,
/// réponse retenue jusqu'à `release()` si une barrière est posée
struct MemoryTransport {
    responses: HashMap<String, Result<Vec<u8>, FetchError>>,
    calls: AtomicUsize,
    gate: Option<Notify>,
}

impl MemoryTransport {
    fn new() -> Self {
        Self {
            responses: HashMap::new(),
            calls: AtomicUsize::new(0),
            gate: None,
        }
    }

    fn gated(mut self) -> Self {
        self.gate = Some(Notify::new());
        self
    }

    fn with_json(mut self, dataset: &str, body: serde_json::Value) -> Self {
        self.responses
            .insert(dataset.to_string(), Ok(body.to_string().into_bytes()));
        self
    }

    fn with_error(mut self, dataset: &str, error: FetchError) -> Self {
        self.responses.insert(dataset.to_string(), Err(error));
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.notify_waiters();
        }
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn get(&self, dataset: &str) -> Result<Vec<u8>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.responses
            .get(dataset)
            .cloned()
            .unwrap_or_else(|| Err(FetchError::status(dataset, 404, "Not Found")))
    }
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
}

/// Configuration sans reprojection (coordonnées comparables telles quelles)
fn identity_config() -> Config {
    Config {
        source_crs: "EPSG:3857".into(),
        target_crs: "EPSG:3857".into(),
        ..Config::default()
    }
}

fn graves_body() -> serde_json::Value {
    json!({
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "id": 1,
                "geometry": {"type": "Polygon", "coordinates": [[[0, 0], [10, 0], [10, 10], [0, 10], [0, 0]]]},
                "properties": {
                    "grabId": "G-1",
                    "grabnummer": "A-01",
                    "nutzungsfristende": "2020-12-31",
                    "verstorbene": [{"vorname": "Anna", "nachname": "Schmitz"}]
                }
            },
            {
                "type": "Feature",
                "id": 2,
                "geometry": {"type": "Polygon", "coordinates": "not-an-array"},
                "properties": {"grabId": "G-2", "nutzungsfristende": "2030-01-01"}
            }
        ]
    })
}

fn plots_body() -> serde_json::Value {
    json!({
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "id": "P-1",
                "geometry": {"type": "Polygon", "coordinates": [[[20, 5], [30, 5], [30, 15], [20, 15], [20, 5]]]},
                "properties": {
                    "grabId": "P-1",
                    "verstorbene": [{"vorname": "Karl", "nachname": "Berger", "sterbedatum": "1999-02-03"}]
                }
            }
        ]
    })
}

fn cemetery_transport() -> MemoryTransport {
    MemoryTransport::new()
        .with_json("grab", graves_body())
        .with_json("grabstelle", plots_body())
}

#[tokio::test]
async fn test_end_to_end_run() {
    let transport = Arc::new(cemetery_transport());
    let cache = Arc::new(DatasetCache::new(transport.clone()));
    let pipeline = Pipeline::new(cache, &identity_config()).unwrap();
    assert_eq!(pipeline.state(), PipelineState::Idle);

    let output = pipeline.run_at(today()).await.unwrap();

    assert_eq!(pipeline.state(), PipelineState::Succeeded);
    assert_eq!(output.graves.len(), 1);
    assert_eq!(output.plots.len(), 1);
    assert_eq!(output.graves[0].tag, ClassificationTag::ExpiredGrave);
    assert_eq!(output.plots[0].tag, ClassificationTag::OccupiedPlot);

    assert_eq!(output.diagnostics.len(), 1);
    let dropped = &output.diagnostics[0];
    assert_eq!(dropped.level, DiagnosticLevel::Dropped);
    assert_eq!(dropped.dataset_id, "grab");
    assert_eq!(dropped.feature_index, 1);

    // emprise des deux géométries valides uniquement
    assert_eq!(output.extent, Extent::new(0.0, 0.0, 30.0, 15.0));
    assert_eq!(transport.calls(), 2);

    let report = RunReport::from_output(&output);
    assert_eq!(report.status, RunStatus::PartialSuccess);
    assert_eq!(report.total_kept(), 2);
    assert_eq!(report.total_dropped(), 1);
}

#[tokio::test]
async fn test_run_reprojects_to_target() {
    let transport = Arc::new(
        MemoryTransport::new()
            .with_json(
                "grab",
                json!({
                    "type": "FeatureCollection",
                    "features": [{
                        "type": "Feature",
                        "geometry": {"type": "Polygon", "coordinates": [[
                            [386858.0, 5664073.0], [386868.0, 5664073.0], [386868.0, 5664083.0], [386858.0, 5664073.0]
                        ]]},
                        "properties": {"nutzungsfristende": "2050-01-01"}
                    }]
                }),
            )
            .with_json("grabstelle", json!({"type": "FeatureCollection", "features": []})),
    );
    let cache = Arc::new(DatasetCache::new(transport));
    let pipeline = Pipeline::new(cache, &Config::default()).unwrap();

    let output = pipeline.run_at(today()).await.unwrap();

    let first = output.graves[0].ring.0[0];
    assert!((first.x - 821_925.23).abs() < 0.5);
    assert!((first.y - 6_642_007.15).abs() < 0.5);
    assert_eq!(output.graves[0].tag, ClassificationTag::None);
    assert!(output.diagnostics.is_empty());
}

#[tokio::test]
async fn test_both_datasets_fail() {
    let transport = Arc::new(
        MemoryTransport::new()
            .with_error("grab", FetchError::status("grab", 500, "Internal Server Error"))
            .with_error("grabstelle", FetchError::unreachable("grabstelle", "timed out")),
    );
    let cache = Arc::new(DatasetCache::new(transport));
    let pipeline = Pipeline::new(cache, &identity_config()).unwrap();
    let mut states = pipeline.subscribe();

    let err = pipeline.run_at(today()).await.unwrap_err();

    assert!(matches!(err, PipelineError::Datasets(_)));
    assert_eq!(err.failures().len(), 2);
    assert_eq!(err.failures()[0].dataset(), "grab");
    assert_eq!(err.failures()[1].dataset(), "grabstelle");

    assert!(states.has_changed().unwrap());
    assert!(matches!(*states.borrow_and_update(), PipelineState::Failed(_)));

    let report = RunReport::from_error(&err, today());
    assert_eq!(report.status, RunStatus::Failed);
    assert_eq!(report.errors.len(), 2);
}

#[tokio::test]
async fn test_one_dataset_fails_whole_run() {
    let transport = Arc::new(
        MemoryTransport::new()
            .with_json("grab", graves_body())
            .with_error("grabstelle", FetchError::status("grabstelle", 503, "Service Unavailable")),
    );
    let cache = Arc::new(DatasetCache::new(transport));
    let pipeline = Pipeline::new(cache, &identity_config()).unwrap();

    let err = pipeline.run_at(today()).await.unwrap_err();

    assert_eq!(err.failures().len(), 1);
    assert_eq!(err.failures()[0].http_status(), Some(503));
    assert!(matches!(pipeline.state(), PipelineState::Failed(ref m) if m.contains("HTTP 503")));
}

#[tokio::test]
async fn test_concurrent_runs_share_fetches() {
    let transport = Arc::new(cemetery_transport().gated());
    let cache = Arc::new(DatasetCache::new(transport.clone()));
    let first = Pipeline::new(Arc::clone(&cache), &identity_config()).unwrap();
    let second = Pipeline::new(Arc::clone(&cache), &identity_config()).unwrap();

    let runs = async { tokio::join!(first.run_at(today()), second.run_at(today())) };
    let release = async {
        // attendre que les deux requêtes soient en vol
        while cache.state("grab") != EntryState::InFlight
            || cache.state("grabstelle") != EntryState::InFlight
        {
            tokio::task::yield_now().await;
        }
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        transport.release();
    };
    let ((a, b), ()) = tokio::join!(runs, release);

    assert_eq!(a.unwrap().graves.len(), 1);
    assert_eq!(b.unwrap().plots.len(), 1);
    assert_eq!(transport.calls(), 2);
}

#[tokio::test]
async fn test_failure_is_not_retried() {
    let transport = Arc::new(
        MemoryTransport::new()
            .with_json("grab", graves_body())
            .with_error("grabstelle", FetchError::unreachable("grabstelle", "connection refused")),
    );
    let cache = Arc::new(DatasetCache::new(transport.clone()));
    let pipeline = Pipeline::new(cache, &identity_config()).unwrap();

    assert!(pipeline.run_at(today()).await.is_err());
    assert!(pipeline.run_at(today()).await.is_err());
    assert_eq!(transport.calls(), 2);
}

#[tokio::test]
async fn test_malformed_feature_shapes_do_not_fail_the_run() {
    let transport = Arc::new(
        MemoryTransport::new()
            .with_json(
                "grab",
                json!({
                    "type": "FeatureCollection",
                    "features": [
                        {
                            "type": "Feature",
                            "geometry": {"type": "Polygon", "coordinates": [[[0, 0], [10, 0], [10, 10], [0, 0]]]},
                            "properties": "oops"
                        },
                        {
                            "type": "Feature",
                            "geometry": {"type": "Polygon", "coordinates": [[[0, 0], [5, 0], [5, 5], [0, 0]]]},
                            "properties": {"nutzungsfristende": "2000-01-01", "anonym": "nein"}
                        }
                    ]
                }),
            )
            .with_json(
                "grabstelle",
                json!({
                    "type": "FeatureCollection",
                    "features": [
                        {
                            "type": "Feature",
                            "geometry": {"type": null, "coordinates": [[[20, 5], [30, 5], [30, 15], [20, 5]]]},
                            "properties": {"verstorbene": [{"vorname": "Karl"}]}
                        },
                        null
                    ]
                }),
            ),
    );
    let cache = Arc::new(DatasetCache::new(transport));
    let pipeline = Pipeline::new(cache, &identity_config()).unwrap();

    let output = pipeline.run_at(today()).await.unwrap();

    assert_eq!(pipeline.state(), PipelineState::Succeeded);
    assert_eq!(output.graves.len(), 2);
    assert_eq!(output.graves[0].tag, ClassificationTag::None);
    assert_eq!(output.graves[1].tag, ClassificationTag::ExpiredGrave);
    assert!(output.plots.is_empty());

    let levels: Vec<_> = output
        .diagnostics
        .iter()
        .map(|d| (d.dataset_id.as_str(), d.feature_index, d.level))
        .collect();
    assert_eq!(
        levels,
        vec![
            ("grab", 0, DiagnosticLevel::Warning),
            ("grabstelle", 0, DiagnosticLevel::Dropped),
            ("grabstelle", 1, DiagnosticLevel::Dropped),
        ]
    );
    assert_eq!(output.extent, Extent::new(0.0, 0.0, 10.0, 10.0));
}

#[tokio::test(flavor = "current_thread")]
async fn test_large_collection_on_single_threaded_runtime() {
    let features: Vec<_> = (0..500_i32)
        .map(|i| {
            let x = f64::from(i) * 10.0;
            let end = if i % 2 == 0 { "2000-01-01" } else { "2099-01-01" };
            json!({
                "type": "Feature",
                "id": i,
                "geometry": {"type": "Polygon", "coordinates": [[[x, 0.0], [x + 5.0, 0.0], [x + 5.0, 5.0], [x, 0.0]]]},
                "properties": {"nutzungsfristende": end}
            })
        })
        .collect();
    let transport = Arc::new(
        MemoryTransport::new()
            .with_json("grab", json!({"type": "FeatureCollection", "features": features}))
            .with_json("grabstelle", plots_body()),
    );
    let cache = Arc::new(DatasetCache::new(transport));
    let pipeline = Pipeline::new(cache, &identity_config()).unwrap();

    let output = pipeline.run_at(today()).await.unwrap();

    assert_eq!(output.graves.len(), 500);
    assert!(output.graves.iter().enumerate().all(|(i, f)| f.index == i));
    assert_eq!(output.count_tag(ClassificationTag::ExpiredGrave), 250);
    assert_eq!(output.extent, Extent::new(0.0, 0.0, 4995.0, 15.0));
    assert!(output.diagnostics.is_empty());
}

#[tokio::test]
async fn test_rerun_restarts_from_loading() {
    let transport = Arc::new(cemetery_transport());
    let cache = Arc::new(DatasetCache::new(transport.clone()));
    let pipeline = Pipeline::new(cache, &identity_config()).unwrap();
    let mut states = pipeline.subscribe();

    pipeline.run_at(today()).await.unwrap();
    assert_eq!(*states.borrow_and_update(), PipelineState::Succeeded);

    let mut rerun = std::pin::pin!(pipeline.run_at(today()));
    if futures::poll!(rerun.as_mut()).is_pending() {
        // le traitement tourne encore : l'état publié est celui de ce run
        assert_eq!(pipeline.state(), PipelineState::Loading);
    }
    let output = rerun.await.unwrap();

    assert!(states.has_changed().unwrap());
    assert_eq!(*states.borrow_and_update(), PipelineState::Succeeded);
    assert_eq!(output.graves.len(), 1);
    // second run servi par le cache
    assert_eq!(transport.calls(), 2);
}

#[tokio::test]
async fn test_empty_datasets_give_empty_extent() {
    let empty = json!({"type": "FeatureCollection", "features": []});
    let transport = Arc::new(
        MemoryTransport::new()
            .with_json("grab", empty.clone())
            .with_json("grabstelle", empty),
    );
    let cache = Arc::new(DatasetCache::new(transport));
    let pipeline = Pipeline::new(cache, &identity_config()).unwrap();

    let output = pipeline.run_at(today()).await.unwrap();

    assert!(output.extent.is_empty());
    assert!(friedhof_map::fit(
        &output.extent,
        output.target_crs,
        &friedhof_map::ViewOptions::default()
    )
    .is_err());
}

#[test]
fn test_unsupported_crs_rejected_before_fetch() {
    let transport = Arc::new(cemetery_transport());
    let cache = Arc::new(DatasetCache::new(transport.clone()));
    let config = Config {
        source_crs: "EPSG:2154".into(),
        ..Config::default()
    };

    let err = Pipeline::new(cache, &config).err().unwrap();

    assert!(matches!(err, PipelineError::Crs(_)));
    assert_eq!(transport.calls(), 0);
}
