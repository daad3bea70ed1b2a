//! Point d'entrée CLI pour friedhof-map

use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::{fmt, EnvFilter};

// Charger .env au démarrage
fn load_env() {
    // Chercher .env dans le répertoire courant ou parent
    if dotenvy::dotenv().is_err() {
        // Essayer depuis le répertoire du binaire
        if let Ok(exe) = std::env::current_exe() {
            if let Some(dir) = exe.parent() {
                let _ = dotenvy::from_path(dir.join(".env"));
            }
        }
    }
}

mod cli;

use cli::{Commands, RunArgs};

/// Charger les tombes et emplacements du cimetière de Wipperfürth
#[derive(Parser)]
#[command(name = "friedhof-map")]
#[command(author, version)]
#[command(about = "Charger, classer et exporter les données du cimetière (WebGIS → GeoJSON)")]
#[command(long_about = "Récupère les tombes et emplacements publiés par le WebGIS, les reprojette, les classe (tombes expirées, emplacements occupés) et les exporte en GeoJSON avec un rapport.\n\nUtilisez 'reproject' pour transformer un point isolé.")]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    /// Augmenter la verbosité (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Mode silencieux
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Sous-commande (défaut: chargement et export)
    #[command(subcommand)]
    command: Option<Commands>,

    /// Arguments du chargement (commande par défaut)
    #[command(flatten)]
    run: Option<RunArgs>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Charger .env avant tout
    load_env();

    let cli = Cli::parse();

    // Configurer le logging
    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Some(Commands::Reproject { x, y, from, to }) => {
            info!(x, y, from = %from, to = %to, "Reprojection d'un point");
            cli::cmd_reproject(x, y, &from, &to)?;
        }
        None => {
            // Commande par défaut : chargement depuis le WebGIS
            let args = cli.run.unwrap_or_default();
            cli::cmd_run(args).await?;
        }
    }

    Ok(())
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => Level::WARN,
        (_, 0) => Level::INFO,
        (_, 1) => Level::DEBUG,
        (_, _) => Level::TRACE,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .init();
}
