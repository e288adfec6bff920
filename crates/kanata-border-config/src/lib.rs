//! Configuration parsing for kanata-border
//!
//! This crate handles parsing KDL configuration files and resolving
//! kanata layer names to the border action that should be shown for them.

mod error;
mod model;
mod palette;
mod parser;

pub use error::ConfigError;
pub use model::*;
pub use palette::{LayerAction, LayerPalette};
pub use parser::{load_config, parse_config, parse_config_str};
