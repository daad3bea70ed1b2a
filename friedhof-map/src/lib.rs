//! # friedhof-map
//!
//! Chargement des données du cimetière de Wipperfürth depuis le WebGIS,
//! normalisation, reprojection et classification des tombes et emplacements.
//!
//! ## Features
//!
//! - Récupération des deux jeux de données avec cache single-flight
//! - Reprojection en Rust pur (UTM, Web Mercator, WGS84)
//! - Rapport d'exécution et export GeoJSON
//! - Cadrage de la vue sur l'emprise
//!
//! ## Usage CLI
//!
//! ```bash
//! # Charger les données et écrire graves.geojson, plots.geojson, report.json
//! friedhof-map --output ./out/
//!
//! # Reprojeter un point
//! friedhof-map reproject 386858 5664073 --from EPSG:25832 --to EPSG:4326
//! ```

pub mod config;
pub mod export;
pub mod fetch;
pub mod pipeline;
pub mod report;
pub mod reproject_lite;
pub mod viewport;

pub use config::{Config, DatasetConfig};
pub use fetch::{DatasetCache, FetchError, HttpTransport, Transport};
pub use pipeline::{
    Diagnostic, DiagnosticLevel, Pipeline, PipelineError, PipelineOutput, PipelineState,
};
pub use report::{RunReport, RunStatus};
pub use reproject_lite::{Crs, CrsError, Reprojector};
pub use viewport::{fit, View, ViewOptions, ViewportError};
