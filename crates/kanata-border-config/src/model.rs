//! Configuration data model

use std::time::Duration;

use crate::palette::LayerPalette;

/// Default kanata TCP server endpoint
pub const DEFAULT_ADDRESS: &str = "127.0.0.1:5829";

/// Default delay between connection attempts
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Default border thickness in pixels
pub const DEFAULT_BORDER_WIDTH: u16 = 8;

/// Default tint opacity: 0 = none, 8 = subtle, 25 = visible, 40 = strong, max 255
pub const DEFAULT_TINT_ALPHA: u8 = 8;

/// Default fraction of the layer color used for the full-screen tint
pub const DEFAULT_TINT_STRENGTH: f64 = 0.03;

/// Root configuration structure
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub global: GlobalConfig,
    pub connection: ConnectionConfig,
    pub border: BorderConfig,
    pub layers: LayerPalette,
}

/// Global settings
#[derive(Debug, Clone, Default)]
pub struct GlobalConfig {
    pub log_level: LogLevel,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive string understood by `tracing_subscriber::EnvFilter`
    pub fn as_filter(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            _ => Err(format!("Unknown log level: {}", s)),
        }
    }
}

/// Connection to the kanata TCP server
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// `host:port` of kanata's TCP server
    pub address: String,
    /// Fixed wait between connection attempts (no backoff growth)
    pub retry_delay: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

/// Border appearance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BorderConfig {
    /// Thickness of each edge rectangle in pixels
    pub width: u16,
    /// Alpha of the full-screen tint
    pub tint_alpha: u8,
    /// Multiplier applied to the layer color for the tint
    pub tint_strength: f64,
}

impl Default for BorderConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_BORDER_WIDTH,
            tint_alpha: DEFAULT_TINT_ALPHA,
            tint_strength: DEFAULT_TINT_STRENGTH,
        }
    }
}

/// An RGB color with channels in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Color {
    pub const BLUE: Color = Color::new(0.3, 0.6, 1.0);
    pub const GREEN: Color = Color::new(0.45, 0.91, 0.74);
    pub const MAGENTA: Color = Color::new(1.0, 0.3, 1.0);
    pub const RED: Color = Color::new(1.0, 0.2, 0.2);
    pub const YELLOW: Color = Color::new(1.0, 1.0, 0.3);
    pub const CYAN: Color = Color::new(0.3, 1.0, 1.0);
    pub const PURPLE: Color = Color::new(0.6, 0.3, 1.0);
    pub const ORANGE: Color = Color::new(1.0, 0.6, 0.2);
    pub const GREY: Color = Color::new(0.5, 0.5, 0.5);

    pub const fn new(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }

    /// All channels are finite and within `[0, 1]`
    pub fn is_valid(&self) -> bool {
        [self.r, self.g, self.b]
            .iter()
            .all(|c| c.is_finite() && (0.0..=1.0).contains(c))
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RGB({:.1}, {:.1}, {:.1})", self.r, self.g, self.b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_display_matches_status_line_format() {
        assert_eq!(Color::CYAN.to_string(), "RGB(0.3, 1.0, 1.0)");
        assert_eq!(Color::GREEN.to_string(), "RGB(0.5, 0.9, 0.7)");
    }

    #[test]
    fn test_color_validity() {
        assert!(Color::new(0.0, 0.5, 1.0).is_valid());
        assert!(!Color::new(1.1, 0.0, 0.0).is_valid());
        assert!(!Color::new(0.0, -0.1, 0.0).is_valid());
        assert!(!Color::new(0.0, 0.0, f64::NAN).is_valid());
    }

    #[test]
    fn test_log_level_round_trips_to_filter() {
        for name in ["trace", "debug", "info", "warn", "error"] {
            let level: LogLevel = name.parse().unwrap();
            assert_eq!(level.as_filter(), name);
        }
        assert_eq!("WARNING".parse::<LogLevel>(), Ok(LogLevel::Warn));
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.connection.address, "127.0.0.1:5829");
        assert_eq!(config.connection.retry_delay, Duration::from_secs(5));
        assert_eq!(config.border.width, 8);
        assert_eq!(config.border.tint_alpha, 8);
        assert_eq!(config.global.log_level, LogLevel::Info);
    }
}
