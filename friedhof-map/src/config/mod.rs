//! Configuration du système

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use friedhof::{FeatureKind, RingPolicy};
use serde::{Deserialize, Serialize};

/// URL de base du WebGIS de Wipperfürth
pub const DEFAULT_API_URL: &str = "https://wipperfuerth.pgconnect.de/api/v1/webgis";

/// Configuration principale
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// URL de base de l'API ; un jeu de données est servi sous `{api_url}/{id}`
    pub api_url: String,

    /// Jeu de données des fiches de tombes
    pub graves: DatasetConfig,

    /// Jeu de données des emplacements
    pub plots: DatasetConfig,

    /// CRS des coordonnées reçues (jamais détecté depuis le payload)
    pub source_crs: String,

    /// CRS des coordonnées produites
    pub target_crs: String,

    /// Conservation des trous des polygones
    pub ring_policy: RingPolicy,

    /// Timeout HTTP par requête, en secondes
    pub timeout_secs: Option<u64>,
}

/// Configuration d'un jeu de données
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DatasetConfig {
    /// Identifiant (segment d'URL)
    pub id: String,

    /// Nature des features
    pub kind: FeatureKind,
}

impl DatasetConfig {
    pub fn new(id: impl Into<String>, kind: FeatureKind) -> Self {
        Self {
            id: id.into(),
            kind,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.into(),
            graves: DatasetConfig::new("grab", FeatureKind::Grave),
            plots: DatasetConfig::new("grabstelle", FeatureKind::Plot),
            source_crs: "EPSG:25832".into(),
            target_crs: "EPSG:3857".into(),
            ring_policy: RingPolicy::OuterOnly,
            timeout_secs: Some(30),
        }
    }
}

impl Config {
    /// Charge une configuration depuis un fichier JSON
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;

        serde_json::from_str(&content).context("Failed to parse config JSON")
    }

    /// Charge la configuration depuis les variables d'environnement
    pub fn from_env() -> Self {
        Self::default().with_env()
    }

    /// Surcharge les champs présents dans l'environnement
    pub fn with_env(mut self) -> Self {
        if let Ok(url) = std::env::var("FRIEDHOF_API_URL") {
            self.api_url = url;
        }
        if let Ok(id) = std::env::var("FRIEDHOF_GRAVES_DATASET") {
            self.graves.id = id;
        }
        if let Ok(id) = std::env::var("FRIEDHOF_PLOTS_DATASET") {
            self.plots.id = id;
        }
        if let Ok(crs) = std::env::var("FRIEDHOF_SOURCE_CRS") {
            self.source_crs = crs;
        }
        if let Ok(crs) = std::env::var("FRIEDHOF_TARGET_CRS") {
            self.target_crs = crs;
        }
        if let Some(keep) = std::env::var("FRIEDHOF_KEEP_HOLES")
            .ok()
            .and_then(|v| parse_bool(&v))
        {
            self.ring_policy = if keep {
                RingPolicy::KeepHoles
            } else {
                RingPolicy::OuterOnly
            };
        }
        if let Some(secs) = std::env::var("FRIEDHOF_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            self.timeout_secs = Some(secs);
        }
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
