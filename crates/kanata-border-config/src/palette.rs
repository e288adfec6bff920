//! Layer name to border action resolution

use std::collections::BTreeMap;

use crate::model::Color;

/// Layers that hide the overlay unless the config says otherwise
pub const DEFAULT_HIDDEN_LAYERS: [&str; 2] = ["default", "meta-layer"];

/// What the overlay should do when a layer becomes active
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LayerAction {
    /// Unmap the overlay
    Hide,
    /// Map the overlay and draw the border in this color
    Show(Color),
}

/// Mapping from kanata layer names to border colors
///
/// Hidden layers take precedence over color entries: a layer listed in
/// both places always resolves to [`LayerAction::Hide`].
#[derive(Debug, Clone, PartialEq)]
pub struct LayerPalette {
    colors: BTreeMap<String, Color>,
    hidden: Vec<String>,
    fallback: Color,
}

impl Default for LayerPalette {
    fn default() -> Self {
        let colors = [
            ("default", Color::BLUE),
            ("vim-normal", Color::CYAN),
            ("visual-mode", Color::MAGENTA),
            ("vim-shifted", Color::ORANGE),
            ("visual-shifted", Color::ORANGE),
            ("delete-ops", Color::RED),
            ("yank-ops", Color::YELLOW),
            ("g-ops", Color::GREEN),
            ("meta-layer", Color::PURPLE),
            ("escape", Color::GREY),
        ]
        .into_iter()
        .map(|(name, color)| (name.to_string(), color))
        .collect();

        Self {
            colors,
            hidden: DEFAULT_HIDDEN_LAYERS.iter().map(|s| s.to_string()).collect(),
            fallback: Color::CYAN,
        }
    }
}

impl LayerPalette {
    /// Resolve the action for a newly activated layer
    pub fn resolve(&self, layer: &str) -> LayerAction {
        if self.is_hidden(layer) {
            LayerAction::Hide
        } else {
            LayerAction::Show(self.color_for(layer))
        }
    }

    /// Table color for a layer, or the fallback. Ignores the hidden list.
    pub fn color_for(&self, layer: &str) -> Color {
        self.colors.get(layer).copied().unwrap_or(self.fallback)
    }

    pub fn is_hidden(&self, layer: &str) -> bool {
        self.hidden.iter().any(|h| h == layer)
    }

    pub fn set_color(&mut self, layer: impl Into<String>, color: Color) {
        self.colors.insert(layer.into(), color);
    }

    pub fn set_hidden(&mut self, layers: Vec<String>) {
        self.hidden = layers;
    }

    pub fn set_fallback(&mut self, color: Color) {
        self.fallback = color;
    }

    pub fn fallback(&self) -> Color {
        self.fallback
    }

    pub fn hidden(&self) -> &[String] {
        &self.hidden
    }

    /// Configured layers in name order
    pub fn entries(&self) -> impl Iterator<Item = (&str, Color)> {
        self.colors.iter().map(|(name, color)| (name.as_str(), *color))
    }
}
