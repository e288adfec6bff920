//! X11 implementation of the overlay surface

use kanata_border_config::Color;
use tracing::{debug, info, warn};
use x11rb::connection::{Connection, RequestConnection as _};
use x11rb::protocol::shape::{self, ConnectionExt as _};
use x11rb::protocol::xproto::{
    Atom, AtomEnum, ChangeGCAux, ClipOrdering, ColormapAlloc, ConfigureWindowAux,
    ConnectionExt as _, CreateGCAux, CreateWindowAux, PropMode, Rectangle, Screen, VisualClass,
    Visualid, WindowClass,
};
use x11rb::protocol::{xproto, Event};
use x11rb::rust_connection::RustConnection;
use x11rb::wrapper::ConnectionExt as _;

use super::error::OverlayError;
use super::geometry::border_rects;
use super::{border_pixel, Surface, Tint};

/// `WM_CLASS` instance and class name, NUL separated
const WM_CLASS: &[u8] = b"kanata-border\0kanata-border\0";

/// Display server resources owned by an initialized overlay
struct OverlayState {
    conn: RustConnection,
    root: xproto::Window,
    window: xproto::Window,
    colormap: xproto::Colormap,
    gc: xproto::Gcontext,
    width: u16,
    height: u16,
}

/// Overlay window on an X11 display
///
/// Starts uninitialized; call [`X11Overlay::initialize`] to connect and
/// create the window. Dropping the overlay runs [`Surface::cleanup`].
pub struct X11Overlay {
    state: Option<OverlayState>,
    tint: Tint,
}

impl X11Overlay {
    pub fn new(tint: Tint) -> Self {
        Self { state: None, tint }
    }

    #[cfg(test)]
    pub fn is_initialized(&self) -> bool {
        self.state.is_some()
    }

    /// Connect to the X server and create the overlay window
    ///
    /// `display` overrides `$DISPLAY`. Calling this on an already
    /// initialized overlay does nothing.
    ///
    /// # Errors
    ///
    /// Returns `OverlayError::ConnectFailed` if no X server is reachable,
    /// `OverlayError::ShapeUnsupported` if the window could not be made
    /// click-through, or a request error if window setup fails. Nothing is
    /// left behind on error: dropping the connection frees every resource
    /// created so far.
    pub fn initialize(&mut self, display: Option<&str>) -> Result<(), OverlayError> {
        if self.state.is_some() {
            return Ok(());
        }

        let (conn, screen_num) = x11rb::connect(display)?;

        let screen = &conn.setup().roots[screen_num];
        let root = screen.root;
        let (width, height) = (screen.width_in_pixels, screen.height_in_pixels);
        let (depth, visual) = find_argb_visual(screen).unwrap_or_else(|| {
            debug!("No 32-bit TrueColor visual, tint will be opaque");
            (screen.root_depth, screen.root_visual)
        });

        if conn.extension_information(shape::X11_EXTENSION_NAME)?.is_none() {
            return Err(OverlayError::ShapeUnsupported);
        }

        let colormap = conn.generate_id()?;
        conn.create_colormap(ColormapAlloc::NONE, colormap, root, visual)?;

        let window = conn.generate_id()?;
        let attributes = CreateWindowAux::new()
            .override_redirect(1)
            .background_pixel(0)
            .border_pixel(0)
            .colormap(colormap);
        conn.create_window(
            depth,
            window,
            root,
            0,
            0,
            width,
            height,
            0,
            WindowClass::INPUT_OUTPUT,
            visual,
            &attributes,
        )?;

        conn.change_property8(
            PropMode::REPLACE,
            window,
            AtomEnum::WM_CLASS,
            AtomEnum::STRING,
            WM_CLASS,
        )?;

        let wm_window_type = intern(&conn, b"_NET_WM_WINDOW_TYPE")?;
        let wm_window_type_dock = intern(&conn, b"_NET_WM_WINDOW_TYPE_DOCK")?;
        conn.change_property32(
            PropMode::REPLACE,
            window,
            wm_window_type,
            AtomEnum::ATOM,
            &[wm_window_type_dock],
        )?;

        let wm_state = intern(&conn, b"_NET_WM_STATE")?;
        let states = [
            intern(&conn, b"_NET_WM_STATE_ABOVE")?,
            intern(&conn, b"_NET_WM_STATE_SKIP_TASKBAR")?,
            intern(&conn, b"_NET_WM_STATE_SKIP_PAGER")?,
        ];
        conn.change_property32(PropMode::REPLACE, window, wm_state, AtomEnum::ATOM, &states)?;

        // Empty input region: clicks fall through to the windows below
        conn.shape_rectangles(
            shape::SO::SET,
            shape::SK::INPUT,
            ClipOrdering::UNSORTED,
            window,
            0,
            0,
            &[],
        )?;

        conn.map_window(window)?;

        let gc = conn.generate_id()?;
        conn.create_gc(gc, window, &CreateGCAux::new())?;
        conn.flush()?;

        info!("Overlay window created ({}x{}, depth {})", width, height, depth);

        self.state = Some(OverlayState {
            conn,
            root,
            window,
            colormap,
            gc,
            width,
            height,
        });

        Ok(())
    }

    fn try_draw_border(&mut self, color: Color, width: u16) -> Result<(), OverlayError> {
        let Some(state) = self.state.as_mut() else {
            return Ok(());
        };

        state.drain_events()?;

        // Follow resolution changes without re-initializing
        let geometry = state.conn.get_geometry(state.root)?.reply()?;
        if (geometry.width, geometry.height) != (state.width, state.height) {
            debug!(
                "Screen resized from {}x{} to {}x{}",
                state.width, state.height, geometry.width, geometry.height
            );
            state.conn.configure_window(
                state.window,
                &ConfigureWindowAux::new()
                    .width(u32::from(geometry.width))
                    .height(u32::from(geometry.height)),
            )?;
            state.width = geometry.width;
            state.height = geometry.height;
        }

        let conn = &state.conn;
        conn.clear_area(false, state.window, 0, 0, 0, 0)?;

        conn.change_gc(state.gc, &ChangeGCAux::new().foreground(self.tint.pixel(color)))?;
        conn.poly_fill_rectangle(
            state.window,
            state.gc,
            &[Rectangle {
                x: 0,
                y: 0,
                width: state.width,
                height: state.height,
            }],
        )?;

        conn.change_gc(state.gc, &ChangeGCAux::new().foreground(border_pixel(color)))?;
        conn.poly_fill_rectangle(
            state.window,
            state.gc,
            &border_rects(state.width, state.height, width),
        )?;

        conn.flush()?;
        Ok(())
    }

    fn try_set_mapped(&mut self, mapped: bool) -> Result<(), OverlayError> {
        let Some(state) = self.state.as_mut() else {
            return Ok(());
        };

        state.drain_events()?;
        if mapped {
            state.conn.map_window(state.window)?;
        } else {
            state.conn.unmap_window(state.window)?;
        }
        state.conn.flush()?;
        Ok(())
    }
}

impl OverlayState {
    /// Discard queued events so they do not pile up; we never redraw on
    /// expose. Asynchronous request errors arrive here too.
    fn drain_events(&self) -> Result<(), OverlayError> {
        while let Some(event) = self.conn.poll_for_event()? {
            if let Event::Error(e) = event {
                warn!("X11 error: {:?}", e);
            }
        }
        Ok(())
    }

    fn release(self) -> Result<(), OverlayError> {
        self.conn.free_gc(self.gc)?;
        self.conn.destroy_window(self.window)?;
        self.conn.free_colormap(self.colormap)?;
        self.conn.flush()?;
        Ok(())
    }
}

impl Surface for X11Overlay {
    fn show(&mut self) {
        if let Err(e) = self.try_set_mapped(true) {
            warn!("Failed to show overlay: {}", e);
        }
    }

    fn hide(&mut self) {
        if let Err(e) = self.try_set_mapped(false) {
            warn!("Failed to hide overlay: {}", e);
        }
    }

    fn draw_border(&mut self, color: Color, width: u16) {
        if let Err(e) = self.try_draw_border(color, width) {
            warn!("Failed to draw border: {}", e);
        }
    }

    fn cleanup(&mut self) {
        // The connection is closed when `state` is dropped
        if let Some(state) = self.state.take() {
            if let Err(e) = state.release() {
                debug!("Error while releasing overlay resources: {}", e);
            }
        }
    }
}

impl Drop for X11Overlay {
    fn drop(&mut self) {
        self.cleanup();
    }
}

fn intern(conn: &RustConnection, name: &[u8]) -> Result<Atom, OverlayError> {
    Ok(conn.intern_atom(false, name)?.reply()?.atom)
}

fn find_argb_visual(screen: &Screen) -> Option<(u8, Visualid)> {
    screen
        .allowed_depths
        .iter()
        .filter(|d| d.depth == 32)
        .flat_map(|d| d.visuals.iter())
        .find(|v| v.class == VisualClass::TRUE_COLOR)
        .map(|v| (32, v.visual_id))
}
