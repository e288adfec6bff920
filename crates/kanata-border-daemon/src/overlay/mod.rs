//! Full-screen click-through overlay used to draw the layer border
//!
//! The overlay is a borderless, always-on-top dock window with an empty input
//! shape, so it never takes focus or clicks. On a 32-bit visual with a
//! running compositor the tint is translucent; without one the alpha byte is
//! ignored by the server.
//!
//! `Surface` is the seam between the layer indicator and the display server.
//! `X11Overlay` is the real implementation; tests drive the indicator with a
//! recording fake.

mod error;
mod geometry;
mod x11;

use kanata_border_config::{BorderConfig, Color};

pub use x11::X11Overlay;

/// Operations the layer indicator needs from a drawing surface
///
/// Every operation is a no-op on a surface that is not initialized.
pub trait Surface {
    /// Map the window
    fn show(&mut self);

    /// Unmap the window
    fn hide(&mut self);

    /// Clear, tint the whole screen, then paint four opaque edge rectangles
    /// `width` pixels thick
    fn draw_border(&mut self, color: Color, width: u16);

    /// Release all display resources. Safe to call more than once.
    fn cleanup(&mut self);
}

/// Full-screen background tint
///
/// Alpha and strength are fixed per overlay; they do not depend on the
/// color being drawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tint {
    pub alpha: u8,
    pub strength: f64,
}

impl From<&BorderConfig> for Tint {
    fn from(border: &BorderConfig) -> Self {
        Self {
            alpha: border.tint_alpha,
            strength: border.tint_strength,
        }
    }
}

impl Tint {
    /// ARGB pixel for the tint fill
    pub fn pixel(&self, color: Color) -> u32 {
        argb_pixel(self.alpha, color, self.strength)
    }
}

/// Opaque ARGB pixel for the border rectangles
pub fn border_pixel(color: Color) -> u32 {
    argb_pixel(0xff, color, 1.0)
}

fn argb_pixel(alpha: u8, color: Color, scale: f64) -> u32 {
    let channel = |c: f64| (c * 255.0 * scale).clamp(0.0, 255.0) as u32;

    (u32::from(alpha) << 24) | (channel(color.r) << 16) | (channel(color.g) << 8) | channel(color.b)
}
