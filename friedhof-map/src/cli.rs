//! Définition et implémentation des commandes CLI
//!
//! - commande par défaut : WebGIS → GeoJSON + rapport
//! - `reproject` : transformation d'un point

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Subcommand};
use friedhof::{classify, RingPolicy};
use tracing::{info, warn};

use friedhof_map::export::export_to_geojson;
use friedhof_map::{
    fit, Config, DatasetCache, HttpTransport, Pipeline, PipelineOutput, Reprojector, RunReport,
    ViewOptions,
};

#[derive(Subcommand)]
pub enum Commands {
    /// Transform a single point between two CRS
    Reproject {
        /// Easting / longitude
        #[arg(allow_negative_numbers = true)]
        x: f64,

        /// Northing / latitude
        #[arg(allow_negative_numbers = true)]
        y: f64,

        /// Source CRS (e.g., EPSG:25832)
        #[arg(long, default_value = "EPSG:25832")]
        from: String,

        /// Target CRS (e.g., EPSG:4326)
        #[arg(long, default_value = "EPSG:4326")]
        to: String,
    },
}

/// Arguments de la commande par défaut
#[derive(Args, Default)]
pub struct RunArgs {
    /// Path to a JSON config file (défaut : variables d'environnement)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output directory for GeoJSON files and report (défaut : ./output)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// WebGIS API base URL
    #[arg(long)]
    pub api_url: Option<String>,

    /// CRS of the published coordinates (e.g., EPSG:25832)
    #[arg(long)]
    pub source_crs: Option<String>,

    /// CRS of the exported coordinates (e.g., EPSG:3857)
    #[arg(long)]
    pub target_crs: Option<String>,

    /// Keep polygon holes instead of the outer ring only
    #[arg(long)]
    pub keep_holes: bool,

    /// HTTP timeout per request, in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Reference date for classification (défaut : aujourd'hui)
    #[arg(long)]
    pub today: Option<String>,
}

impl RunArgs {
    /// Configuration effective : fichier ou environnement, puis arguments
    fn resolve_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?.with_env(),
            None => Config::from_env(),
        };

        if let Some(url) = &self.api_url {
            config.api_url = url.clone();
        }
        if let Some(crs) = &self.source_crs {
            config.source_crs = crs.clone();
        }
        if let Some(crs) = &self.target_crs {
            config.target_crs = crs.clone();
        }
        if self.keep_holes {
            config.ring_policy = RingPolicy::KeepHoles;
        }
        if let Some(secs) = self.timeout {
            config.timeout_secs = Some(secs);
        }
        Ok(config)
    }

    fn reference_date(&self) -> Result<NaiveDate> {
        match &self.today {
            Some(raw) => classify::parse_date(raw)
                .ok_or_else(|| anyhow::anyhow!("Invalid date: '{}'. Expected YYYY-MM-DD", raw)),
            None => Ok(classify::today()),
        }
    }
}

/// Exécute la commande par défaut
pub async fn cmd_run(args: RunArgs) -> Result<()> {
    let config = args.resolve_config()?;
    let today = args.reference_date()?;
    let output = args.output.clone().unwrap_or_else(|| PathBuf::from("output"));

    std::fs::create_dir_all(&output)
        .context(format!("Failed to create output directory: {}", output.display()))?;

    let transport = HttpTransport::new(&config.api_url, config.timeout())?;
    let cache = Arc::new(DatasetCache::new(Arc::new(transport)));
    let pipeline = Pipeline::new(cache, &config)?;

    match pipeline.run_at(today).await {
        Ok(result) => {
            write_outputs(&result, &output)?;
            let report = RunReport::from_output(&result);
            report.save_to_file(&output.join("report.json"))?;
            report.display();
            info!("{}", report.summary());

            match fit(&result.extent, result.target_crs, &ViewOptions::default()) {
                Ok(view) => info!(
                    x = view.center.x,
                    y = view.center.y,
                    zoom = view.zoom,
                    "Suggested view"
                ),
                Err(e) => warn!(error = %e, "No view to suggest"),
            }
            Ok(())
        }
        Err(e) => {
            let report = RunReport::from_error(&e, today);
            report.save_to_file(&output.join("report.json"))?;
            report.display();
            Err(e.into())
        }
    }
}

fn write_outputs(result: &PipelineOutput, output: &Path) -> Result<()> {
    for (name, features) in [("graves", &result.graves), ("plots", &result.plots)] {
        let output_file = output.join(format!("{}.geojson", name));
        export_to_geojson(features, result.target_crs, &output_file)?;
        info!(
            "Exported {} {} to {}",
            features.len(),
            name,
            output_file.display()
        );
    }
    Ok(())
}

/// Exécute la commande reproject
pub fn cmd_reproject(x: f64, y: f64, from: &str, to: &str) -> Result<()> {
    let reprojector = Reprojector::from_ids(from, to)?;
    let (tx, ty) = reprojector.transform_point(x, y);

    let decimals = if reprojector.target().is_projected() { 3 } else { 8 };
    println!(
        "{:.*} {:.*} ({})",
        decimals,
        tx,
        decimals,
        ty,
        reprojector.target()
    );
    Ok(())
}
