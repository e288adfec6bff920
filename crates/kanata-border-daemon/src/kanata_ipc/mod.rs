//! Kanata TCP client for layer-change notifications
//!
//! Kanata exposes a TCP server (enabled with `--port`) that pushes one JSON
//! object per line whenever its state changes. This module only cares about
//! layer changes:
//!
//! ```json
//! {"LayerChange":{"new":"vim-normal"}}
//! ```
//!
//! The connection is read-only; nothing is ever written back to kanata.
//!
//! ## Architecture
//!
//! - `KanataEventStream`: a single connection, yields decoded layer changes
//! - `LayerEventDispatcher`: reader task that reconnects forever and forwards
//!   events through an mpsc channel
//! - `KanataError`: error types for connection and read failures

mod error;
mod events;
mod types;

pub use events::{LayerEventDispatcher, LayerEventReceiver, DEFAULT_CHANNEL_BUFFER};
pub use types::LayerChangeEvent;
