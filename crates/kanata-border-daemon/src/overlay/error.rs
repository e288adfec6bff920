//! Error types for the overlay window

use thiserror::Error;
use x11rb::errors::{ConnectError, ConnectionError, ReplyError, ReplyOrIdError};

/// Errors that can occur while creating or drawing the overlay
#[derive(Debug, Error)]
pub enum OverlayError {
    /// No X server reachable (`DISPLAY` unset, or running under Wayland without Xwayland)
    #[error("Cannot open X display: {0}")]
    ConnectFailed(#[from] ConnectError),

    /// The X connection broke while sending a request
    #[error("X11 connection error: {0}")]
    Connection(#[from] ConnectionError),

    /// The X server answered a request with an error
    #[error("X11 request failed: {0}")]
    Reply(#[from] ReplyError),

    /// Request failed or the connection ran out of resource IDs
    #[error("X11 request failed: {0}")]
    ReplyOrId(#[from] ReplyOrIdError),

    /// Click-through needs an empty input shape
    #[error("X server does not support the SHAPE extension")]
    ShapeUnsupported,
}
