//! kanata-border CLI
//!
//! Configuration tool for kanata-border.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use kanata_border_config::{Config, LayerAction};

#[derive(Parser, Debug)]
#[command(name = "kanata-border")]
#[command(about = "Layer border indicator for kanata")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "~/.config/kanata-border/config.kdl")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate the configuration file
    Validate,

    /// Show the border action for every configured layer
    Colors,
}

fn main() -> miette::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    // Expand tilde in config path
    let config_path: PathBuf = shellexpand::tilde(&cli.config).into_owned().into();

    match cli.command {
        Commands::Validate => cmd_validate(&config_path),
        Commands::Colors => cmd_colors(&config_path),
    }
}

fn cmd_validate(config_path: &Path) -> miette::Result<()> {
    println!("Validating configuration: {}", config_path.display());

    let config = kanata_border_config::parse_config(config_path)?;

    println!("Configuration is valid!");
    println!("  Kanata address: {}", config.connection.address);
    println!(
        "  Retry delay: {} ms",
        config.connection.retry_delay.as_millis()
    );
    println!(
        "  Border: {} px, tint alpha {}, tint strength {}",
        config.border.width, config.border.tint_alpha, config.border.tint_strength
    );
    println!("  Layers: {}", config.layers.entries().count());
    Ok(())
}

fn cmd_colors(config_path: &Path) -> miette::Result<()> {
    let config = kanata_border_config::load_config(config_path)?;

    for line in palette_report(&config) {
        println!("{}", line);
    }
    Ok(())
}

fn palette_report(config: &Config) -> Vec<String> {
    let palette = &config.layers;
    let mut lines = Vec::new();

    for (layer, _) in palette.entries() {
        let action = match palette.resolve(layer) {
            LayerAction::Hide => "Hidden".to_string(),
            LayerAction::Show(color) => color.to_string(),
        };
        lines.push(format!("{:<15} → {}", layer, action));
    }

    lines.push(format!("{:<15} → {}", "(other)", palette.fallback()));
    lines.push(format!("Hidden layers: {}", palette.hidden().join(", ")));
    lines
}
