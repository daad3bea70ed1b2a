//! Rapport d'exécution avec graceful degradation
//!
//! Collecte les résultats d'une exécution du pipeline (succès ou échec),
//! les affiche sur la console et les sauvegarde en JSON.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use friedhof::ClassifiedFeature;
use serde::Serialize;

use crate::pipeline::{Diagnostic, DiagnosticLevel, PipelineError, PipelineOutput};

/// Statut global de l'exécution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunStatus {
    /// Toutes les features ont été retenues
    Success,
    /// Au moins une feature écartée
    PartialSuccess,
    /// Aucun résultat (jeu de données ou configuration en échec)
    Failed,
}

/// Statistiques par jeu de données
#[derive(Debug, Clone, Default, Serialize)]
pub struct DatasetStats {
    /// Features retenues
    pub kept: usize,
    /// Features écartées (géométrie invalide)
    pub dropped: usize,
    /// Features retenues avec classification dégradée
    pub warnings: usize,
    /// Répartition par tag de classification
    pub by_tag: BTreeMap<String, usize>,
}

impl DatasetStats {
    pub fn total(&self) -> usize {
        self.kept + self.dropped
    }

    fn from_features(features: &[ClassifiedFeature]) -> Self {
        let mut stats = Self {
            kept: features.len(),
            ..Default::default()
        };
        for feature in features {
            *stats.by_tag.entry(feature.tag.to_string()).or_default() += 1;
        }
        stats
    }

    fn record(&mut self, diagnostic: &Diagnostic) {
        match diagnostic.level {
            DiagnosticLevel::Dropped => self.dropped += 1,
            DiagnosticLevel::Warning => self.warnings += 1,
        }
    }
}

/// Rapport complet d'une exécution
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Date de référence de la classification
    pub evaluated_on: NaiveDate,
    /// Durée de l'exécution
    pub duration_secs: f64,
    /// Statut global
    pub status: RunStatus,
    /// CRS des coordonnées produites
    pub target_crs: Option<String>,
    /// Emprise `[min_x, min_y, max_x, max_y]`, absente si vide
    pub bbox: Option<Vec<f64>>,

    /// Statistiques par jeu de données
    pub by_dataset: BTreeMap<String, DatasetStats>,

    /// Diagnostics par feature
    pub diagnostics: Vec<Diagnostic>,
    /// Erreurs terminales
    pub errors: Vec<String>,
}

impl RunReport {
    /// Rapport d'une exécution réussie
    pub fn from_output(output: &PipelineOutput) -> Self {
        let mut by_dataset = BTreeMap::new();
        by_dataset.insert(
            output.graves_dataset.clone(),
            DatasetStats::from_features(&output.graves),
        );
        by_dataset.insert(
            output.plots_dataset.clone(),
            DatasetStats::from_features(&output.plots),
        );
        for diagnostic in &output.diagnostics {
            by_dataset
                .entry(diagnostic.dataset_id.clone())
                .or_insert_with(DatasetStats::default)
                .record(diagnostic);
        }

        let status = if output.dropped().next().is_some() {
            RunStatus::PartialSuccess
        } else {
            RunStatus::Success
        };

        Self {
            evaluated_on: output.evaluated_on,
            duration_secs: output.elapsed.as_secs_f64(),
            status,
            target_crs: Some(output.target_crs.to_string()),
            bbox: output.extent.to_bbox(),
            by_dataset,
            diagnostics: output.diagnostics.clone(),
            errors: Vec::new(),
        }
    }

    /// Rapport d'une exécution en échec
    pub fn from_error(error: &PipelineError, evaluated_on: NaiveDate) -> Self {
        let errors = match error.failures() {
            [] => vec![error.to_string()],
            failures => failures.iter().map(ToString::to_string).collect(),
        };

        Self {
            evaluated_on,
            duration_secs: 0.0,
            status: RunStatus::Failed,
            target_crs: None,
            bbox: None,
            by_dataset: BTreeMap::new(),
            diagnostics: Vec::new(),
            errors,
        }
    }

    /// Nombre total de features retenues
    pub fn total_kept(&self) -> usize {
        self.by_dataset.values().map(|s| s.kept).sum()
    }

    /// Nombre total de features écartées
    pub fn total_dropped(&self) -> usize {
        self.by_dataset.values().map(|s| s.dropped).sum()
    }

    fn count_tag(&self, tag: &str) -> usize {
        self.by_dataset
            .values()
            .filter_map(|s| s.by_tag.get(tag))
            .sum()
    }

    /// Affiche le rapport sur la console
    pub fn display(&self) {
        println!("\n{}", "=".repeat(60));
        println!("CEMETERY REPORT - {}", self.evaluated_on);
        println!("{}", "=".repeat(60));

        println!("\nStatus: {:?}", self.status);
        println!("Duration: {:.2}s", self.duration_secs);
        if let Some(crs) = &self.target_crs {
            println!("CRS: {}", crs);
        }
        if let Some(bbox) = &self.bbox {
            println!(
                "Extent: [{:.2}, {:.2}, {:.2}, {:.2}]",
                bbox[0], bbox[1], bbox[2], bbox[3]
            );
        }

        if !self.by_dataset.is_empty() {
            println!("\n--- BY DATASET ---");
            for (dataset, stats) in &self.by_dataset {
                let tags: Vec<String> = stats
                    .by_tag
                    .iter()
                    .map(|(tag, n)| format!("{} {}", n, tag))
                    .collect();
                println!(
                    "  {}: {} kept, {} dropped, {} warnings ({})",
                    dataset,
                    stats.kept,
                    stats.dropped,
                    stats.warnings,
                    tags.join(", ")
                );
            }
        }

        if !self.diagnostics.is_empty() {
            println!("\n--- DIAGNOSTICS ({}) ---", self.diagnostics.len());
            for d in self.diagnostics.iter().take(20) {
                println!(
                    "  {:?} [{}#{}] {}",
                    d.level, d.dataset_id, d.feature_index, d.reason
                );
            }
            if self.diagnostics.len() > 20 {
                println!("  ... and {} more", self.diagnostics.len() - 20);
            }
        }

        if !self.errors.is_empty() {
            println!("\n--- ERRORS ({}) ---", self.errors.len());
            for e in &self.errors {
                println!("  {}", e);
            }
        }

        println!("\n{}", "=".repeat(60));
    }

    /// Sauvegarde le rapport en JSON
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .context(format!("Failed to write report: {}", path.display()))?;
        Ok(())
    }

    /// Affichage compact pour le résumé
    pub fn summary(&self) -> String {
        format!(
            "{}: {} features, {} expired graves, {} occupied plots, {} dropped",
            self.evaluated_on,
            self.total_kept(),
            self.count_tag("expired-grave"),
            self.count_tag("occupied-plot"),
            self.total_dropped()
        )
    }
}
