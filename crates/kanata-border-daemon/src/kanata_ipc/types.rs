//! Messages received from kanata

use serde::Deserialize;

/// Notification that kanata switched to a different layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerChangeEvent {
    /// Name of the newly active layer
    pub layer: String,
}

/// Wire shape of a kanata status line. Every other message type kanata
/// sends decodes to `layer_change: None`.
#[derive(Debug, Deserialize)]
struct KanataMessage {
    #[serde(rename = "LayerChange")]
    layer_change: Option<LayerChangePayload>,
}

#[derive(Debug, Deserialize)]
struct LayerChangePayload {
    #[serde(default)]
    new: String,
}

impl LayerChangeEvent {
    pub fn new(layer: impl Into<String>) -> Self {
        Self {
            layer: layer.into(),
        }
    }

    /// Decode one line from kanata
    ///
    /// Returns `Ok(None)` for valid JSON that is not a layer change, or a
    /// layer change with an empty name. Bytes that are not UTF-8 are a
    /// decode error like any other malformed JSON.
    pub fn decode(line: impl AsRef<[u8]>) -> Result<Option<Self>, serde_json::Error> {
        let message: KanataMessage = serde_json::from_slice(line.as_ref())?;

        Ok(message
            .layer_change
            .map(|payload| payload.new)
            .filter(|layer| !layer.is_empty())
            .map(Self::new))
    }

    /// Best-effort decode: malformed lines are dropped
    pub fn from_line(line: impl AsRef<[u8]>) -> Option<Self> {
        match Self::decode(line) {
            Ok(event) => event,
            Err(e) => {
                tracing::trace!("Ignoring undecodable line from kanata: {}", e);
                None
            }
        }
    }
}
