//! KDL configuration parser

use std::path::Path;
use std::time::Duration;

use miette::SourceSpan;

use crate::error::ConfigError;
use crate::model::*;
use crate::palette::LayerPalette;

/// Parse a configuration file from the given path
pub fn parse_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config_str(&content)
}

/// Parse the configuration file, or fall back to built-in defaults if it does not exist
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        tracing::info!(
            "No configuration at {}, using built-in defaults",
            path.display()
        );
        return Ok(Config::default());
    }
    parse_config(path)
}

/// Parse configuration from a string
pub fn parse_config_str(content: &str) -> Result<Config, ConfigError> {
    let doc: kdl::KdlDocument = content.parse().map_err(|e: kdl::KdlError| {
        // kdl uses an older miette version, so we need to extract offset/len manually
        let offset = e.span.offset();
        let len = e.span.len();
        let span = miette::SourceSpan::from((offset, len));
        ConfigError::ParseError {
            src: content.to_string(),
            span,
            source: e,
        }
    })?;

    let mut config = Config::default();

    for node in doc.nodes() {
        match node.name().value() {
            "global" => {
                config.global = parse_global(node, content)?;
            }
            "connection" => {
                config.connection = parse_connection(node, content)?;
            }
            "border" => {
                config.border = parse_border(node, content)?;
            }
            "layers" => {
                config.layers = parse_layers(node, content)?;
            }
            name => {
                tracing::warn!("Unknown top-level node: {}", name);
            }
        }
    }

    Ok(config)
}

fn parse_global(node: &kdl::KdlNode, source: &str) -> Result<GlobalConfig, ConfigError> {
    let mut global = GlobalConfig::default();

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "log-level" => {
                    if let Some(val) = first_string(child) {
                        global.log_level = val
                            .parse()
                            .map_err(|e| invalid(source, first_entry_span(child), e))?;
                    }
                }
                name => {
                    tracing::warn!("Unknown global config option: {}", name);
                }
            }
        }
    }

    Ok(global)
}

fn parse_connection(node: &kdl::KdlNode, source: &str) -> Result<ConnectionConfig, ConfigError> {
    let mut connection = ConnectionConfig::default();

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "address" => {
                    let address = first_string(child).ok_or_else(|| {
                        missing(
                            source,
                            child,
                            "connection address (e.g., `address \"127.0.0.1:5829\"`)",
                        )
                    })?;
                    if address.trim().is_empty() {
                        return Err(invalid(
                            source,
                            first_entry_span(child),
                            "connection address must not be empty",
                        ));
                    }
                    connection.address = address.to_string();
                }
                "retry-delay-ms" => {
                    let ms = integer_in_range(child, source, "retry-delay-ms", 1, i64::from(u32::MAX))?;
                    connection.retry_delay = Duration::from_millis(ms as u64);
                }
                name => {
                    tracing::warn!("Unknown connection config option: {}", name);
                }
            }
        }
    }

    Ok(connection)
}

fn parse_border(node: &kdl::KdlNode, source: &str) -> Result<BorderConfig, ConfigError> {
    let mut border = BorderConfig::default();

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "width" => {
                    border.width =
                        integer_in_range(child, source, "width", 1, i64::from(u16::MAX))? as u16;
                }
                "tint-alpha" => {
                    border.tint_alpha = integer_in_range(child, source, "tint-alpha", 0, 255)? as u8;
                }
                "tint-strength" => {
                    let strength = child
                        .entries()
                        .first()
                        .and_then(entry_as_f64)
                        .ok_or_else(|| missing(source, child, "tint-strength value"))?;
                    if !(0.0..=1.0).contains(&strength) {
                        return Err(invalid(
                            source,
                            first_entry_span(child),
                            format!("tint-strength must be between 0 and 1, got {}", strength),
                        ));
                    }
                    border.tint_strength = strength;
                }
                name => {
                    tracing::warn!("Unknown border config option: {}", name);
                }
            }
        }
    }

    Ok(border)
}

fn parse_layers(node: &kdl::KdlNode, source: &str) -> Result<LayerPalette, ConfigError> {
    let mut palette = LayerPalette::default();

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "hidden" => {
                    let hidden = child
                        .entries()
                        .iter()
                        .map(|entry| match (entry.name(), entry.value().as_string()) {
                            (None, Some(layer)) => Ok(layer.to_string()),
                            _ => Err(invalid(
                                source,
                                entry_span(entry),
                                format!("hidden layers must be plain strings, got {}", entry.value()),
                            )),
                        })
                        .collect::<Result<_, _>>()?;
                    palette.set_hidden(hidden);
                }
                "fallback" => {
                    palette.set_fallback(parse_color(child, source, 0, "fallback")?);
                }
                "layer" => {
                    let name = first_string(child).ok_or_else(|| {
                        missing(
                            source,
                            child,
                            "layer name (e.g., `layer \"vim-normal\" 0.3 1.0 1.0`)",
                        )
                    })?;
                    let color = parse_color(child, source, 1, name)?;
                    palette.set_color(name, color);
                }
                name => {
                    tracing::warn!("Unknown layers config option: {}", name);
                }
            }
        }
    }

    Ok(palette)
}

/// Read the entries from `start` on as an RGB color
///
/// Exactly three plain numbers are accepted. Properties and strings are
/// rejected rather than skipped.
fn parse_color(
    node: &kdl::KdlNode,
    source: &str,
    start: usize,
    context: &str,
) -> Result<Color, ConfigError> {
    let channels = node
        .entries()
        .iter()
        .skip(start)
        .map(|entry| match (entry.name(), entry_as_f64(entry)) {
            (None, Some(channel)) => Ok(channel),
            (Some(property), _) => Err(invalid(
                source,
                entry_span(entry),
                format!(
                    "'{}' color channels must be plain numbers, got property `{}`",
                    context,
                    property.value()
                ),
            )),
            (None, None) => Err(invalid(
                source,
                entry_span(entry),
                format!("'{}' color channel must be a number, got {}", context, entry.value()),
            )),
        })
        .collect::<Result<Vec<f64>, _>>()?;

    let &[r, g, b] = channels.as_slice() else {
        return Err(invalid(
            source,
            node_span(node),
            format!(
                "'{}' needs exactly three color channels (r g b), got {}",
                context,
                channels.len()
            ),
        ));
    };

    let color = Color::new(r, g, b);
    if !color.is_valid() {
        return Err(invalid(
            source,
            node_span(node),
            format!("'{}' color channels must be between 0 and 1, got {}", context, color),
        ));
    }

    Ok(color)
}

fn first_string(node: &kdl::KdlNode) -> Option<&str> {
    node.entries().first().and_then(|e| e.value().as_string())
}

fn integer_in_range(
    node: &kdl::KdlNode,
    source: &str,
    name: &str,
    min: i64,
    max: i64,
) -> Result<i64, ConfigError> {
    let value = node
        .entries()
        .first()
        .and_then(|e| e.value().as_i64())
        .ok_or_else(|| missing(source, node, format!("{} value (integer)", name)))?;

    if value < min || value > max {
        return Err(invalid(
            source,
            first_entry_span(node),
            format!("{} must be between {} and {}, got {}", name, min, max, value),
        ));
    }

    Ok(value)
}

/// KDL distinguishes `1` from `1.0`; accept either for color channels
fn entry_as_f64(entry: &kdl::KdlEntry) -> Option<f64> {
    let value = entry.value();
    value.as_f64().or_else(|| value.as_i64().map(|v| v as f64))
}

fn invalid(source: &str, span: SourceSpan, message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        message: message.into(),
        src: source.to_string(),
        span,
    }
}

fn missing(source: &str, node: &kdl::KdlNode, field: impl Into<String>) -> ConfigError {
    ConfigError::MissingField {
        field: field.into(),
        src: source.to_string(),
        span: node_span(node),
    }
}

// Spans are rebuilt from offset/len for the same miette version reason as above

fn node_span(node: &kdl::KdlNode) -> SourceSpan {
    let span = node.name().span();
    SourceSpan::from((span.offset(), span.len()))
}

fn entry_span(entry: &kdl::KdlEntry) -> SourceSpan {
    let span = entry.span();
    SourceSpan::from((span.offset(), span.len()))
}

/// Span of the node's first argument, or of its name when it has none
fn first_entry_span(node: &kdl::KdlNode) -> SourceSpan {
    node.entries()
        .first()
        .map(entry_span)
        .unwrap_or_else(|| node_span(node))
}
