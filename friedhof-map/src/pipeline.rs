//! Orchestration : fetch → normalisation → reprojection → classification → emprise
//!
//! Machine à états d'une exécution : `Idle → Loading → {Succeeded, Failed}`.
//! L'état décrit la dernière exécution : une nouvelle exécution repart de
//! `Loading`, y compris après un état terminal.
//! Les deux jeux de données sont récupérés en parallèle et l'orchestrateur
//! attend que les deux soient terminés. L'échec d'un jeu de données fait
//! échouer l'exécution entière ; l'échec d'une feature est isolé en
//! diagnostic. Le traitement par feature (rayon) tourne hors du runtime
//! tokio, dans `spawn_blocking`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use friedhof::classify::{self, ClassificationTag};
use friedhof::{
    normalize_polygon, ClassifiedFeature, Extent, FeatureProperties, RawFeature,
    RawFeatureCollection, RingPolicy,
};
use rayon::prelude::*;
use serde::Serialize;
use serde_json::Map;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::config::{Config, DatasetConfig};
use crate::fetch::{DatasetCache, FetchError};
use crate::reproject_lite::{Crs, CrsError, Reprojector};

/// État de la dernière exécution du pipeline.
///
/// `Idle` n'est visible qu'avant la première exécution ; chaque appel à
/// [`Pipeline::run_at`] publie `Loading` puis un état terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Loading,
    Succeeded,
    Failed(String),
}

/// Gravité d'un diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticLevel {
    /// Feature écartée de la sortie
    Dropped,
    /// Feature conservée, classification dégradée à `none`
    Warning,
}

/// Diagnostic attaché à une feature
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub dataset_id: String,
    pub feature_index: usize,
    pub reason: String,
}

/// Erreur terminale d'une exécution
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Un ou deux jeux de données n'ont pas pu être récupérés ou décodés
    #[error("{}", describe_failures(.0))]
    Datasets(Vec<FetchError>),

    /// CRS source ou cible inconnu (erreur de configuration)
    #[error(transparent)]
    Crs(#[from] CrsError),

    /// La tâche de traitement des features a été interrompue
    #[error("Feature processing aborted: {0}")]
    Processing(String),
}

impl PipelineError {
    /// Échecs de jeux de données (vide pour une erreur de configuration)
    pub fn failures(&self) -> &[FetchError] {
        match self {
            Self::Datasets(failures) => failures,
            Self::Crs(_) | Self::Processing(_) => &[],
        }
    }
}

fn describe_failures(failures: &[FetchError]) -> String {
    let parts: Vec<String> = failures.iter().map(ToString::to_string).collect();
    format!("Unable to load cemetery data: {}", parts.join("; "))
}

/// Résultat d'une exécution réussie
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub graves: Vec<ClassifiedFeature>,
    pub plots: Vec<ClassifiedFeature>,
    /// Emprise des deux collections, dans le CRS cible (peut être vide)
    pub extent: Extent,
    pub diagnostics: Vec<Diagnostic>,
    pub graves_dataset: String,
    pub plots_dataset: String,
    pub source_crs: Crs,
    pub target_crs: Crs,
    /// Date de référence de la classification
    pub evaluated_on: NaiveDate,
    pub elapsed: Duration,
}

impl PipelineOutput {
    /// Diagnostics des features écartées
    pub fn dropped(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.level == DiagnosticLevel::Dropped)
    }

    /// Nombre de features portant `tag`, toutes collections confondues
    pub fn count_tag(&self, tag: ClassificationTag) -> usize {
        self.graves
            .iter()
            .chain(self.plots.iter())
            .filter(|f| f.tag == tag)
            .count()
    }
}

/// Paramètres partagés par le traitement de chaque feature
#[derive(Clone, Copy)]
struct FeatureContext<'a> {
    dataset: &'a DatasetConfig,
    reprojector: &'a Reprojector,
    ring_policy: RingPolicy,
    today: NaiveDate,
}

/// Orchestrateur du pipeline
pub struct Pipeline {
    cache: Arc<DatasetCache>,
    graves: DatasetConfig,
    plots: DatasetConfig,
    reprojector: Reprojector,
    ring_policy: RingPolicy,
    state: watch::Sender<PipelineState>,
}

impl Pipeline {
    /// Crée un pipeline ; les CRS sont validés immédiatement.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Crs`] si un CRS de la configuration est inconnu.
    pub fn new(cache: Arc<DatasetCache>, config: &Config) -> Result<Self, PipelineError> {
        let reprojector = Reprojector::from_ids(&config.source_crs, &config.target_crs)?;
        info!(reprojection = %reprojector.description(), "Pipeline configured");

        let (state, _) = watch::channel(PipelineState::Idle);
        Ok(Self {
            cache,
            graves: config.graves.clone(),
            plots: config.plots.clone(),
            reprojector,
            ring_policy: config.ring_policy,
            state,
        })
    }

    /// Abonnement aux changements d'état
    pub fn subscribe(&self) -> watch::Receiver<PipelineState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> PipelineState {
        self.state.borrow().clone()
    }

    pub fn reprojector(&self) -> &Reprojector {
        &self.reprojector
    }

    /// Exécute le pipeline avec la date du jour
    pub async fn run(&self) -> Result<PipelineOutput, PipelineError> {
        self.run_at(classify::today()).await
    }

    /// Exécute le pipeline avec une date de référence fixée.
    ///
    /// Peut être rappelée : les jeux de données viennent alors du cache et
    /// l'état repasse par `Loading`.
    pub async fn run_at(&self, today: NaiveDate) -> Result<PipelineOutput, PipelineError> {
        let started = Instant::now();
        self.state.send_replace(PipelineState::Loading);
        info!(
            graves = %self.graves.id,
            plots = %self.plots.id,
            today = %today,
            "Loading cemetery data"
        );

        // barrière : on attend les deux résultats, même si l'un échoue
        let (graves, plots) = tokio::join!(
            self.cache.get_or_fetch(&self.graves.id),
            self.cache.get_or_fetch(&self.plots.id)
        );

        let (graves, plots) = match (graves, plots) {
            (Ok(graves), Ok(plots)) => (graves, plots),
            (graves, plots) => {
                let failures: Vec<FetchError> =
                    [graves.err(), plots.err()].into_iter().flatten().collect();
                let err = PipelineError::Datasets(failures);
                error!(error = %err, "Pipeline failed");
                self.state.send_replace(PipelineState::Failed(err.to_string()));
                return Err(err);
            }
        };

        let processed = tokio::task::spawn_blocking({
            let graves_dataset = self.graves.clone();
            let plots_dataset = self.plots.clone();
            let reprojector = self.reprojector;
            let ring_policy = self.ring_policy;
            move || {
                let context = |dataset| FeatureContext {
                    dataset,
                    reprojector: &reprojector,
                    ring_policy,
                    today,
                };
                let mut diagnostics = Vec::new();
                let graves = process_collection(context(&graves_dataset), &graves, &mut diagnostics);
                let plots = process_collection(context(&plots_dataset), &plots, &mut diagnostics);
                (graves, plots, diagnostics)
            }
        })
        .await;

        let (graves, plots, diagnostics) = match processed {
            Ok(processed) => processed,
            Err(e) => {
                let err = PipelineError::Processing(e.to_string());
                error!(error = %err, "Failed to join processing task");
                self.state.send_replace(PipelineState::Failed(err.to_string()));
                return Err(err);
            }
        };

        let extent = Extent::from_rings(graves.iter().chain(plots.iter()).map(|f| &f.ring));
        if extent.is_empty() {
            warn!("No valid geometry, extent is empty");
        }

        let output = PipelineOutput {
            graves,
            plots,
            extent,
            diagnostics,
            graves_dataset: self.graves.id.clone(),
            plots_dataset: self.plots.id.clone(),
            source_crs: self.reprojector.source(),
            target_crs: self.reprojector.target(),
            evaluated_on: today,
            elapsed: started.elapsed(),
        };

        info!(
            graves = output.graves.len(),
            plots = output.plots.len(),
            expired = output.count_tag(ClassificationTag::ExpiredGrave),
            occupied = output.count_tag(ClassificationTag::OccupiedPlot),
            dropped = output.dropped().count(),
            "Pipeline succeeded"
        );
        self.state.send_replace(PipelineState::Succeeded);
        Ok(output)
    }
}

/// Traite une collection en parallèle ; l'ordre des features est conservé
fn process_collection(
    ctx: FeatureContext<'_>,
    collection: &RawFeatureCollection,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<ClassifiedFeature> {
    check_declared_crs(ctx, collection);
    if collection.is_empty() {
        warn!(dataset = %ctx.dataset.id, "No features found in response");
    }

    let outcomes: Vec<_> = collection
        .features
        .par_iter()
        .enumerate()
        .map(|(index, feature)| process_feature(ctx, index, feature))
        .collect();

    let mut features = Vec::with_capacity(outcomes.len());
    for outcome in outcomes {
        match outcome {
            Ok((feature, warning)) => {
                if let Some(warning) = warning {
                    debug!(
                        dataset = %warning.dataset_id,
                        index = warning.feature_index,
                        reason = %warning.reason,
                        "Classification degraded"
                    );
                    diagnostics.push(warning);
                }
                features.push(feature);
            }
            Err(dropped) => {
                warn!(
                    dataset = %dropped.dataset_id,
                    index = dropped.feature_index,
                    reason = %dropped.reason,
                    "Feature dropped"
                );
                diagnostics.push(dropped);
            }
        }
    }

    debug!(
        dataset = %ctx.dataset.id,
        kept = features.len(),
        total = collection.len(),
        "Collection processed"
    );
    features
}

/// Le CRS n'est jamais détecté depuis le payload ; une divergence est signalée
fn check_declared_crs(ctx: FeatureContext<'_>, collection: &RawFeatureCollection) {
    let Some(declared) = collection.declared_crs() else {
        return;
    };
    let configured = ctx.reprojector.source();
    match Crs::parse(declared) {
        Ok(crs) if crs != configured => warn!(
            dataset = %ctx.dataset.id,
            declared = %crs,
            configured = %configured,
            "Declared CRS differs from configured source CRS"
        ),
        Ok(_) => {}
        Err(_) => debug!(dataset = %ctx.dataset.id, declared, "Unrecognized declared CRS"),
    }
}

/// Traite une feature : Ok(feature, avertissement éventuel) ou Err(diagnostic)
fn process_feature(
    ctx: FeatureContext<'_>,
    index: usize,
    feature: &RawFeature,
) -> Result<(ClassifiedFeature, Option<Diagnostic>), Diagnostic> {
    let diagnostic = |level, reason: String| Diagnostic {
        level,
        dataset_id: ctx.dataset.id.clone(),
        feature_index: index,
        reason,
    };

    let geometry = feature
        .geometry()
        .map_err(|e| diagnostic(DiagnosticLevel::Dropped, e.reason().to_string()))?;
    let polygon = normalize_polygon(&geometry.coordinates, ctx.ring_policy)
        .map_err(|e| diagnostic(DiagnosticLevel::Dropped, e.to_string()))?;

    let ring = ctx.reprojector.reproject(&polygon.exterior);
    let holes = polygon
        .holes
        .iter()
        .map(|hole| ctx.reprojector.reproject(hole))
        .collect();

    // sac de propriétés inutilisable : feature conservée, classification `none`
    let (properties, typed) = match feature.property_bag() {
        Ok(properties) => {
            let typed = FeatureProperties::from_bag(ctx.dataset.kind, &properties);
            (properties, typed)
        }
        Err(e) => (
            Map::new(),
            FeatureProperties::Unknown {
                reason: e.reason().to_string(),
            },
        ),
    };
    let classification = classify::evaluate(&typed, ctx.today);
    let warning = classification
        .warning
        .map(|reason| diagnostic(DiagnosticLevel::Warning, reason));

    Ok((
        ClassifiedFeature {
            index,
            id: feature.id.clone(),
            ring,
            holes,
            properties,
            typed,
            tag: classification.tag,
        },
        warning,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use friedhof::FeatureKind;
    use serde_json::json;

    fn context_fixture() -> (DatasetConfig, Reprojector) {
        (
            DatasetConfig::new("grab", FeatureKind::Grave),
            Reprojector::from_ids("EPSG:25832", "EPSG:25832").unwrap(),
        )
    }

    fn feature(value: serde_json::Value) -> RawFeature {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_process_feature_expired() {
        let (dataset, reprojector) = context_fixture();
        let ctx = FeatureContext {
            dataset: &dataset,
            reprojector: &reprojector,
            ring_policy: RingPolicy::OuterOnly,
            today: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
        };
        let raw = feature(json!({
            "type": "Feature",
            "id": 12,
            "geometry": {"type": "Polygon", "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 0]], [[0.2, 0.2], [0.4, 0.2], [0.2, 0.2]]]},
            "properties": {"nutzungsfristende": "2001-03-31", "grabnummer": "B-17"}
        }));

        let (classified, warning) = process_feature(ctx, 3, &raw).unwrap();
        assert_eq!(classified.tag, ClassificationTag::ExpiredGrave);
        assert_eq!(classified.index, 3);
        assert_eq!(classified.ring.0.len(), 4);
        assert!(classified.holes.is_empty());
        assert!(classified.is_grave());
        assert_eq!(classified.properties["grabnummer"], "B-17");
        assert!(warning.is_none());
    }

    #[test]
    fn test_process_feature_dropped() {
        let (dataset, reprojector) = context_fixture();
        let ctx = FeatureContext {
            dataset: &dataset,
            reprojector: &reprojector,
            ring_policy: RingPolicy::OuterOnly,
            today: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
        };

        let malformed = feature(json!({"type": "Feature", "geometry": {"type": "Polygon", "coordinates": "not-an-array"}}));
        let err = process_feature(ctx, 7, &malformed).unwrap_err();
        assert_eq!(err.level, DiagnosticLevel::Dropped);
        assert_eq!(err.feature_index, 7);
        assert_eq!(err.dataset_id, "grab");
        assert!(err.reason.contains("must be an array"));

        let no_geometry = feature(json!({"type": "Feature", "properties": {}}));
        let err = process_feature(ctx, 8, &no_geometry).unwrap_err();
        assert_eq!(err.reason, "feature has no geometry");
    }

    #[test]
    fn test_process_feature_bad_property_bag_is_kept() {
        let (dataset, reprojector) = context_fixture();
        let ctx = FeatureContext {
            dataset: &dataset,
            reprojector: &reprojector,
            ring_policy: RingPolicy::OuterOnly,
            today: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
        };
        let raw = feature(json!({
            "type": "Feature",
            "geometry": {"type": "Polygon", "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 0]]]},
            "properties": "oops"
        }));

        let (classified, warning) = process_feature(ctx, 2, &raw).unwrap();
        assert_eq!(classified.tag, ClassificationTag::None);
        assert!(classified.properties.is_empty());
        assert!(matches!(classified.typed, FeatureProperties::Unknown { .. }));

        let warning = warning.unwrap();
        assert_eq!(warning.level, DiagnosticLevel::Warning);
        assert_eq!(warning.feature_index, 2);
        assert_eq!(
            warning.reason,
            "invalid properties: properties must be an object, got a string"
        );
    }

    #[test]
    fn test_process_feature_bad_geometry_descriptor_is_dropped() {
        let (dataset, reprojector) = context_fixture();
        let ctx = FeatureContext {
            dataset: &dataset,
            reprojector: &reprojector,
            ring_policy: RingPolicy::OuterOnly,
            today: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
        };

        let null_type = feature(json!({
            "type": "Feature",
            "geometry": {"type": null, "coordinates": [[0, 0], [1, 0], [1, 1]]},
            "properties": {"nutzungsfristende": "2001-03-31"}
        }));
        let err = process_feature(ctx, 0, &null_type).unwrap_err();
        assert_eq!(err.level, DiagnosticLevel::Dropped);
        assert_eq!(err.reason, "geometry type must be a string, got null");

        let not_an_object = feature(json!("Feature"));
        let err = process_feature(ctx, 1, &not_an_object).unwrap_err();
        assert_eq!(err.reason, "feature must be an object, got a string");
    }

    #[test]
    fn test_process_feature_keeps_holes() {
        let (dataset, reprojector) = context_fixture();
        let ctx = FeatureContext {
            dataset: &dataset,
            reprojector: &reprojector,
            ring_policy: RingPolicy::KeepHoles,
            today: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
        };
        let raw = feature(json!({
            "type": "Feature",
            "geometry": {"type": "Polygon", "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 0]], [[0.2, 0.2], [0.4, 0.2], [0.2, 0.2]]]},
            "properties": {}
        }));

        let (classified, warning) = process_feature(ctx, 0, &raw).unwrap();
        assert_eq!(classified.holes.len(), 1);
        // pas de date de fin : classification dégradée mais feature conservée
        assert_eq!(classified.tag, ClassificationTag::None);
        assert_eq!(warning.unwrap().level, DiagnosticLevel::Warning);
    }

    #[test]
    fn test_error_message_lists_failures() {
        let err = PipelineError::Datasets(vec![
            FetchError::status("grab", 500, "Internal Server Error"),
            FetchError::unreachable("grabstelle", "timed out"),
        ]);
        let message = err.to_string();

        assert!(message.contains("grab: HTTP 500"));
        assert!(message.contains("grabstelle: network unreachable"));
        assert_eq!(err.failures().len(), 2);

        let aborted = PipelineError::Processing("task panicked".into());
        assert!(aborted.failures().is_empty());
        assert_eq!(aborted.to_string(), "Feature processing aborted: task panicked");
    }
}
