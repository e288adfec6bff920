//! kanata-border daemon
//!
//! Follows kanata's active layer and draws a colored screen-edge border for it.

mod indicator;
mod kanata_ipc;
mod overlay;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use kanata_border_config::LogLevel;
use tokio::signal::unix::{signal, SignalKind};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, reload, EnvFilter, Registry};

use crate::indicator::LayerIndicator;
use crate::kanata_ipc::{LayerEventDispatcher, DEFAULT_CHANNEL_BUFFER};
use crate::overlay::{Surface, Tint, X11Overlay};

#[derive(Parser, Debug)]
#[command(name = "kanata-borderd")]
#[command(about = "Screen-edge layer indicator for kanata")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "~/.config/kanata-border/config.kdl")]
    config: String,

    /// Kanata TCP server address (overrides config setting)
    #[arg(short, long)]
    address: Option<String>,

    /// Border thickness in pixels (overrides config setting)
    #[arg(short = 'w', long)]
    border_width: Option<u16>,

    /// X display to draw on (defaults to $DISPLAY)
    #[arg(short, long)]
    display: Option<String>,
}

/// Handle for swapping the log filter once the config has been read
type FilterHandle = reload::Handle<EnvFilter, Registry>;

/// Install the global subscriber before anything logs
///
/// `RUST_LOG` wins when set and is never replaced. Otherwise logging starts at
/// `info` and the returned handle lets the config's `log-level` take over.
fn init_tracing() -> Option<FilterHandle> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer())
                .init();
            None
        }
        Err(_) => {
            let (filter, handle) = reload::Layer::new(EnvFilter::new("info"));
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer())
                .init();
            Some(handle)
        }
    }
}

fn apply_log_level(handle: &FilterHandle, level: LogLevel) -> Result<(), reload::Error> {
    handle.reload(EnvFilter::new(level.as_filter()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let filter_handle = init_tracing();

    // Expand tilde in config path
    let config_path: PathBuf = shellexpand::tilde(&args.config).into_owned().into();
    let mut config = kanata_border_config::load_config(&config_path)?;

    if let Some(handle) = &filter_handle {
        if let Err(e) = apply_log_level(handle, config.global.log_level) {
            tracing::warn!("Failed to apply log level from config: {}", e);
        }
    }
    if config_path.exists() {
        tracing::info!("Loaded configuration from {}", config_path.display());
    }

    if let Some(address) = args.address {
        config.connection.address = address;
    }
    if let Some(width) = args.border_width.filter(|w| *w > 0) {
        config.border.width = width;
    }

    let mut overlay = X11Overlay::new(Tint::from(&config.border));
    if let Err(e) = overlay.initialize(args.display.as_deref()) {
        tracing::error!("Failed to create overlay: {}", e);
        tracing::error!("Make sure you're running X11 (not Wayland) and DISPLAY is set");
        std::process::exit(1);
    }

    let mut terminate = signal(SignalKind::terminate())?;

    let (dispatcher, mut events) = LayerEventDispatcher::new(
        config.connection.address.clone(),
        config.connection.retry_delay,
        DEFAULT_CHANNEL_BUFFER,
    );
    let reader = dispatcher.spawn_reader();

    tracing::info!(
        "kanata-border starting, waiting for kanata at {}",
        config.connection.address
    );

    let mut indicator = LayerIndicator::new(overlay, config.layers, config.border.width);

    // Dropping the indicator future on a signal leaves the overlay to us alone
    tokio::select! {
        _ = indicator.run(&mut events) => {
            tracing::warn!("Kanata event reader stopped");
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received SIGINT, shutting down...");
        }
        _ = terminate.recv() => {
            tracing::info!("Received SIGTERM, shutting down...");
        }
    }

    reader.abort();
    indicator.surface_mut().cleanup();
    tracing::info!("Overlay removed");

    Ok(())
}
