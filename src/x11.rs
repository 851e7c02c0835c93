// X11 implementation of the overlay window.
// Visual expectation: an undecorated window above everything else whose
// pixels carry real alpha, and which never receives a single click.

use std::borrow::Cow;

use log::{info, warn};
use x11rb::connection::Connection;
use x11rb::image::{BitsPerPixel, Image, ImageOrder, ScanlinePad};
use x11rb::protocol::shape::SK;
use x11rb::protocol::xfixes::ConnectionExt as _;
use x11rb::protocol::xproto::{
    Colormap, ColormapAlloc, ConfigureWindowAux, ConnectionExt as _, CreateGCAux, CreateWindowAux,
    Gcontext, Visualid, VisualClass, Window, WindowClass,
};
use x11rb::rust_connection::RustConnection;

use crate::error::Error;
use crate::overlay::OverlayBackend;
use crate::types::{Rect, Size};

const DEPTH: u8 = 32;

// Shorthand for the many protocol errors we only ever report.
fn display_err<E: std::fmt::Display>(what: &'static str) -> impl FnOnce(E) -> Error {
    move |e| Error::Display(format!("{what}: {e}"))
}

/// Resources that exist once the window has been created.
struct OverlayWindow {
    window: Window,
    gc: Gcontext,
}

pub struct X11Backend {
    conn: RustConnection,
    root: Window,
    screen: Size,
    visual: Visualid,
    colormap: Colormap,
    overlay: Option<OverlayWindow>,
}

impl X11Backend {
    /// Connect to `$DISPLAY` and negotiate a 32-bit TrueColor visual.
    pub fn connect() -> Result<Self, Error> {
        let (conn, screen_num) =
            x11rb::connect(None).map_err(display_err("connect"))?;

        let screen = &conn.setup().roots[screen_num];
        let root = screen.root;
        let size = Size::new(
            u32::from(screen.width_in_pixels),
            u32::from(screen.height_in_pixels),
        );

        let visual = screen
            .allowed_depths
            .iter()
            .filter(|d| d.depth == DEPTH)
            .flat_map(|d| d.visuals.iter())
            .find(|v| v.class == VisualClass::TRUE_COLOR)
            .map(|v| v.visual_id)
            .ok_or(Error::NoTrueColorVisual)?;

        // An ARGB window needs a colormap of its own visual.
        let colormap = conn
            .generate_id()
            .map_err(display_err("colormap id"))?;
        conn.create_colormap(ColormapAlloc::NONE, colormap, root, visual)
            .map_err(display_err("create colormap"))?;

        // Input shapes live in XFixes; the version handshake is mandatory.
        conn.xfixes_query_version(5, 0)
            .map_err(display_err("xfixes"))?
            .reply()
            .map_err(display_err("xfixes version"))?;

        info!("screen {size}, visual 0x{visual:x} depth {DEPTH}");

        Ok(Self { conn, root, screen: size, visual, colormap, overlay: None })
    }

    fn overlay(&self) -> Result<&OverlayWindow, Error> {
        self.overlay
            .as_ref()
            .ok_or_else(|| Error::Display("overlay window not created".into()))
    }

    fn flush(&self) -> Result<(), Error> {
        self.conn.flush().map_err(display_err("flush"))
    }
}

impl OverlayBackend for X11Backend {
    fn screen_size(&self) -> Size {
        self.screen
    }

    fn create_window(&mut self, rect: Rect) -> Result<(), Error> {
        let window = self
            .conn
            .generate_id()
            .map_err(display_err("window id"))?;

        // override_redirect: no decorations, no window manager placement, stays on top.
        let aux = CreateWindowAux::new()
            .override_redirect(1u32)
            .colormap(self.colormap)
            .background_pixel(0u32)
            .border_pixel(0u32);

        self.conn
            .create_window(
                DEPTH,
                window,
                self.root,
                rect.x as i16,
                rect.y as i16,
                rect.width as u16,
                rect.height as u16,
                0,
                WindowClass::INPUT_OUTPUT,
                self.visual,
                &aux,
            )
            .map_err(display_err("create window"))?;

        // Empty input region: every click and key goes to whatever is underneath.
        let region = self
            .conn
            .generate_id()
            .map_err(display_err("region id"))?;
        self.conn
            .xfixes_create_region(region, &[])
            .map_err(display_err("create region"))?;
        self.conn
            .xfixes_set_window_shape_region(window, SK::INPUT, 0, 0, region)
            .map_err(display_err("input shape"))?;
        self.conn
            .xfixes_destroy_region(region)
            .map_err(display_err("destroy region"))?;

        let gc = self
            .conn
            .generate_id()
            .map_err(display_err("gc id"))?;
        self.conn
            .create_gc(gc, window, &CreateGCAux::new())
            .map_err(display_err("create gc"))?;

        self.conn
            .map_window(window)
            .map_err(display_err("map window"))?;
        self.overlay = Some(OverlayWindow { window, gc });
        self.flush()
    }

    fn move_resize(&mut self, rect: Rect) -> Result<(), Error> {
        let window = self.overlay()?.window;
        let aux = ConfigureWindowAux::new()
            .x(rect.x)
            .y(rect.y)
            .width(rect.width)
            .height(rect.height);
        self.conn
            .configure_window(window, &aux)
            .map_err(display_err("configure window"))?;
        self.flush()
    }

    fn realized_size(&mut self) -> Result<Size, Error> {
        let window = self.overlay()?.window;
        let geo = self
            .conn
            .get_geometry(window)
            .map_err(display_err("get geometry"))?
            .reply()
            .map_err(display_err("geometry reply"))?;
        Ok(Size::new(u32::from(geo.width), u32::from(geo.height)))
    }

    fn put_image(&mut self, size: Size, bgra: &[u8]) -> Result<(), Error> {
        let overlay = self.overlay()?;
        let image = Image::new(
            size.width as u16,
            size.height as u16,
            ScanlinePad::Pad32,
            DEPTH,
            BitsPerPixel::B32,
            ImageOrder::LsbFirst,
            Cow::Borrowed(bgra),
        )
        .map_err(display_err("image"))?;

        // Large frames are split over several PutImage requests.
        image
            .put(&self.conn, overlay.window, overlay.gc, 0, 0)
            .map_err(display_err("put image"))?;
        self.flush()
    }
}

impl Drop for X11Backend {
    fn drop(&mut self) {
        if let Some(overlay) = self.overlay.take() {
            let _ = self.conn.free_gc(overlay.gc);
            let _ = self.conn.destroy_window(overlay.window);
        }
        let _ = self.conn.free_colormap(self.colormap);
        if let Err(e) = self.conn.flush() {
            warn!("closing display: {e}");
        }
    }
}
