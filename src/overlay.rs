// The overlay window and the pixel buffer that backs it.
// Visual expectation: a borderless, always-on-top picture you can click
// straight through. Geometry changes always come with a fresh buffer.

use log::debug;

use crate::error::Error;
use crate::types::{BYTES_PER_PIXEL, PixelView, Rect, Size};

/// What the surface needs from a windowing system.
pub trait OverlayBackend {
    /// Size of the whole screen (root window).
    fn screen_size(&self) -> Size;

    /// Create and map the click-through overlay at `rect`.
    fn create_window(&mut self, rect: Rect) -> Result<(), Error>;

    /// Reposition/resize the native window.
    fn move_resize(&mut self, rect: Rect) -> Result<(), Error>;

    /// Size the display server actually gave the window.
    fn realized_size(&mut self) -> Result<Size, Error>;

    /// Push a full-window B,G,R,A image.
    fn put_image(&mut self, size: Size, bgra: &[u8]) -> Result<(), Error>;
}

/// Geometry presets reachable from the debug UI.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Preset {
    /// Reduced size, bottom-right corner.
    Corner,
    /// Reduced size, quarter offset.
    Center,
    /// Whole screen at the origin.
    Full,
    /// Back to reduced size at the quarter offset.
    Small,
}

/// Screen size plus the reduced overlay size derived from the video aspect.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Layout {
    pub screen: Size,
    pub reduced: Size,
}

impl Layout {
    /// Reduced overlay: half the screen wide, height matching the video aspect.
    pub fn new(screen: Size, video: Size) -> Self {
        let width = screen.width / 2;
        // Exact in integers; 960 wide at 4:3 is 720 tall, not 719.
        let height = (u64::from(width) * u64::from(video.height) / u64::from(video.width.max(1))) as u32;
        Self { screen, reduced: Size::new(width, height) }
    }

    pub fn preset(&self, preset: Preset) -> Rect {
        let (sw, sh) = (self.screen.width as i32, self.screen.height as i32);
        let Size { width: ow, height: oh } = self.reduced;
        match preset {
            Preset::Corner => Rect::new(sw - ow as i32, sh - oh as i32, ow, oh),
            Preset::Center | Preset::Small => Rect::new(sw / 4, sh / 4, ow, oh),
            Preset::Full => Rect::new(0, 0, self.screen.width, self.screen.height),
        }
    }
}

/// Owned backing storage, sized to the realized window.
struct PixelBuffer {
    size: Size,
    data: Vec<u8>,
}

impl PixelBuffer {
    fn empty() -> Self {
        Self { size: Size::default(), data: Vec::new() }
    }

    fn reallocate(&mut self, size: Size) {
        self.size = size;
        self.data.clear();
        self.data.resize(size.area() * BYTES_PER_PIXEL, 0);
    }
}

pub struct OverlaySurface<B: OverlayBackend> {
    backend: B,
    layout: Layout,
    geometry: Rect,
    buffer: PixelBuffer,
    // Set by `move_resize`, cleared by `reacquire_buffer`.
    stale: bool,
}

impl<B: OverlayBackend> OverlaySurface<B> {
    /// Create the overlay full screen or at reduced size, then acquire its buffer.
    pub fn create(mut backend: B, layout: Layout, full_screen: bool) -> Result<Self, Error> {
        let geometry = layout.preset(if full_screen { Preset::Full } else { Preset::Small });
        backend.create_window(geometry)?;

        let mut surface = Self {
            backend,
            layout,
            geometry,
            buffer: PixelBuffer::empty(),
            stale: true,
        };
        surface.reacquire_buffer()?;
        Ok(surface)
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn geometry(&self) -> Rect {
        self.geometry
    }

    /// Size of the current buffer (== realized window size when not stale).
    pub fn size(&self) -> Size {
        self.buffer.size
    }

    /// Move/resize only. The buffer is stale until `reacquire_buffer`.
    pub fn move_resize(&mut self, rect: Rect) -> Result<(), Error> {
        self.backend.move_resize(rect)?;
        self.geometry = rect;
        self.stale = true;
        Ok(())
    }

    /// Re-read the realized window size and resize the backing storage to match.
    pub fn reacquire_buffer(&mut self) -> Result<(), Error> {
        let size = self.backend.realized_size()?;
        self.buffer.reallocate(size);
        self.stale = false;
        debug!("overlay buffer reacquired at {size}");
        Ok(())
    }

    /// Resize-then-reacquire as one step; no write can land in between.
    pub fn apply_preset(&mut self, preset: Preset) -> Result<(), Error> {
        let rect = self.layout.preset(preset);
        debug!("overlay preset {preset:?} -> {rect:?}");
        self.move_resize(rect)?;
        self.reacquire_buffer()
    }

    /// Writable view of the buffer the next blit will show.
    pub fn buffer_mut(&mut self) -> Result<PixelView<'_>, Error> {
        self.ensure_fresh()?;
        Ok(PixelView::new(self.buffer.size, &mut self.buffer.data))
    }

    /// Current buffer contents (read-only), e.g. for the preview.
    pub fn pixels(&self) -> &[u8] {
        &self.buffer.data
    }

    /// Push the whole buffer to the display.
    pub fn blit(&mut self) -> Result<(), Error> {
        self.ensure_fresh()?;
        self.backend.put_image(self.buffer.size, &self.buffer.data)
    }

    fn ensure_fresh(&self) -> Result<(), Error> {
        if self.stale {
            return Err(Error::StaleBuffer {
                buffer: self.buffer.size,
                window: self.geometry.size(),
            });
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn backend(&self) -> &B {
        &self.backend
    }
}
