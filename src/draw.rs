// Debug preview window + software drawing utilities.
// Visual effects provided here:
// 1) A small window that mirrors what the overlay currently shows.
// 2) An "ALPHA NN" slider strip along its bottom edge (click or drag to set).
// 3) A tiny 5x7 bitmap font to label the slider.

use std::thread;
use std::time::{Duration, Instant};

use minifb::{Key, KeyRepeat, MouseButton, MouseMode, Window, WindowOptions};

use crate::error::Error;
use crate::overlay::Preset;
use crate::types::{AlphaCell, BYTES_PER_PIXEL, Size};

/// Height of the slider strip under the preview, in pixels.
pub const SLIDER_HEIGHT: usize = 16;

// How often the key poll pumps window events while waiting.
const POLL_STEP: Duration = Duration::from_millis(4);

/// What the user asked for from the debug UI.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UiCommand {
    Quit,
    Preset(Preset),
}

/// The optional debug UI as seen by the loop.
pub trait ControlPanel {
    /// Mirror the overlay's B,G,R,A pixels.
    fn show(&mut self, bgra: &[u8], size: Size, alpha: u8) -> Result<(), Error>;

    /// Wait up to `timeout` for a command, feeding slider moves into `alpha`.
    fn wait_key(&mut self, timeout: Duration, alpha: &AlphaCell) -> Result<Option<UiCommand>, Error>;
}

/// Keys the preview understands.
pub fn command_for_key(key: Key) -> Option<UiCommand> {
    match key {
        Key::Escape => Some(UiCommand::Quit),
        Key::R => Some(UiCommand::Preset(Preset::Corner)),
        Key::C => Some(UiCommand::Preset(Preset::Center)),
        Key::F => Some(UiCommand::Preset(Preset::Full)),
        Key::S => Some(UiCommand::Preset(Preset::Small)),
        _ => None,
    }
}

/// Slider percent for a mouse x inside a strip `width` pixels wide.
pub fn slider_value(x: f32, width: usize) -> u8 {
    if width <= 1 {
        return 0;
    }
    let t = (x / (width - 1) as f32).clamp(0.0, 1.0);
    (t * 100.0).round() as u8
}

pub struct Drawer {
    window: Window,     // the on-screen preview you see
    canvas: FrameBuffer, // preview pixels + slider strip
    shown_alpha: u8,
}

impl Drawer {
    /// Create the preview sized to `preview` plus the slider strip.
    /// Visual: a new resizable window appears with your chosen title.
    pub fn new(title: &str, preview: Size) -> Result<Self, Error> {
        let width = (preview.width as usize).max(1);
        let height = (preview.height as usize).max(1) + SLIDER_HEIGHT;
        let options = WindowOptions { resize: true, ..WindowOptions::default() };
        let window = Window::new(title, width, height, options)
            .map_err(|e| Error::WindowInit(e.to_string()))?;

        Ok(Self {
            window,
            canvas: FrameBuffer { width, height, pixels: vec![0u32; width * height] },
            shown_alpha: u8::MAX,
        })
    }

    fn present(&mut self) -> Result<(), Error> {
        self.window
            .update_with_buffer(&self.canvas.pixels, self.canvas.width, self.canvas.height)
            .map_err(|e| Error::WindowUpdate(e.to_string()))
    }

    /// Mouse inside the slider strip with the left button held -> new percent.
    fn slider_drag(&self) -> Option<u8> {
        if !self.window.get_mouse_down(MouseButton::Left) {
            return None;
        }
        let (mx, my) = self.window.get_mouse_pos(MouseMode::Discard)?;
        let strip_top = (self.canvas.height - SLIDER_HEIGHT) as f32;
        (my >= strip_top).then(|| slider_value(mx, self.canvas.width))
    }
}

impl ControlPanel for Drawer {
    fn show(&mut self, bgra: &[u8], size: Size, alpha: u8) -> Result<(), Error> {
        let preview_height = self.canvas.height - SLIDER_HEIGHT;
        scale_bgra_into(bgra, size, &mut self.canvas, preview_height);
        draw_slider(&mut self.canvas, alpha);
        self.shown_alpha = alpha;
        self.present()
    }

    fn wait_key(&mut self, timeout: Duration, alpha: &AlphaCell) -> Result<Option<UiCommand>, Error> {
        let deadline = Instant::now() + timeout;
        loop {
            // Pumps window events; also re-shows the last buffer.
            self.window.update();

            if !self.window.is_open() {
                return Ok(Some(UiCommand::Quit));
            }

            if let Some(value) = self.slider_drag() {
                alpha.set(value);
                if value != self.shown_alpha {
                    draw_slider(&mut self.canvas, value);
                    self.shown_alpha = value;
                    self.present()?;
                }
            }

            let keys = self.window.get_keys_pressed(KeyRepeat::No);
            if let Some(cmd) = keys.into_iter().find_map(command_for_key) {
                return Ok(Some(cmd));
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            thread::sleep(POLL_STEP.min(deadline - now));
        }
    }
}

/* ---------- Software drawing: preview scaling, slider, tiny bitmap font ---------- */

/// Packed 0x00RRGGBB pixels, the layout minifb displays.
pub struct FrameBuffer {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<u32>,
}

/// Nearest-scale B,G,R,A overlay pixels into the top `rows` rows of `fb`.
/// Visual: the preview shows the overlay colors (alpha itself is not visible).
fn scale_bgra_into(bgra: &[u8], size: Size, fb: &mut FrameBuffer, rows: usize) {
    let (sw, sh) = (size.width as usize, size.height as usize);
    if sw == 0 || sh == 0 || bgra.len() < sw * sh * BYTES_PER_PIXEL {
        return;
    }
    for y in 0..rows.min(fb.height) {
        let sy = (y * sh / rows).min(sh - 1);
        for x in 0..fb.width {
            let sx = (x * sw / fb.width).min(sw - 1);
            let i = (sy * sw + sx) * BYTES_PER_PIXEL;
            let (b, g, r) = (bgra[i] as u32, bgra[i + 1] as u32, bgra[i + 2] as u32);
            fb.pixels[y * fb.width + x] = (r << 16) | (g << 8) | b;
        }
    }
}

/// Put a pixel on the framebuffer if (x,y) is inside bounds.
#[inline]
fn put_pixel(fb: &mut FrameBuffer, x: i32, y: i32, color: u32) {
    if x < 0 || y < 0 {
        return;
    }
    let (x, y) = (x as usize, y as usize);
    if x >= fb.width || y >= fb.height {
        return;
    }
    let idx = y * fb.width + x;
    fb.pixels[idx] = color;
}

/// Redraw the slider strip for `alpha` percent.
/// Visual: a dark bar, filled from the left up to the value, labelled "ALPHA NN".
pub fn draw_slider(fb: &mut FrameBuffer, alpha: u8) {
    let top = fb.height.saturating_sub(SLIDER_HEIGHT);
    let filled = fb.width * usize::from(alpha.min(100)) / 100;
    for y in top..fb.height {
        for x in 0..fb.width {
            let color = if x < filled { 0x00_33_66_99 } else { 0x00_20_20_20 };
            fb.pixels[y * fb.width + x] = color;
        }
    }
    let label = format!("ALPHA {alpha}");
    let text_y = top as i32 + ((SLIDER_HEIGHT as i32 - 7) / 2);
    draw_text_5x7(fb, 4, text_y, &label, 0x00_FF_FF_FF);
}

/* ---------- 5x7 bitmap font (just what the slider label needs) ---------- */

/// Return a 5x7 glyph bitmap for a limited character set.
/// Each u8 is a row; the low 5 bits are the pixels (bit 4 = leftmost).
fn glyph5x7(ch: char) -> Option<[u8; 7]> {
    macro_rules! g { ($a:expr,$b:expr,$c:expr,$d:expr,$e:expr,$f:expr,$g:expr) => {
        Some([$a,$b,$c,$d,$e,$f,$g])
    }; }

    match ch {
        '0' => g!(0b01110,0b10001,0b10011,0b10101,0b11001,0b10001,0b01110),
        '1' => g!(0b00100,0b01100,0b00100,0b00100,0b00100,0b00100,0b01110),
        '2' => g!(0b01110,0b10001,0b00001,0b00010,0b00100,0b01000,0b11111),
        '3' => g!(0b11110,0b00001,0b00001,0b01110,0b00001,0b00001,0b11110),
        '4' => g!(0b00010,0b00110,0b01010,0b10010,0b11111,0b00010,0b00010),
        '5' => g!(0b11111,0b10000,0b11110,0b00001,0b00001,0b10001,0b01110),
        '6' => g!(0b00110,0b01000,0b10000,0b11110,0b10001,0b10001,0b01110),
        '7' => g!(0b11111,0b00001,0b00010,0b00100,0b01000,0b01000,0b01000),
        '8' => g!(0b01110,0b10001,0b10001,0b01110,0b10001,0b10001,0b01110),
        '9' => g!(0b01110,0b10001,0b10001,0b01111,0b00001,0b00010,0b01100),

        'A' => g!(0b01110,0b10001,0b10001,0b11111,0b10001,0b10001,0b10001),
        'H' => g!(0b10001,0b10001,0b10001,0b11111,0b10001,0b10001,0b10001),
        'L' => g!(0b10000,0b10000,0b10000,0b10000,0b10000,0b10000,0b11111),
        'P' => g!(0b11110,0b10001,0b10001,0b11110,0b10000,0b10000,0b10000),

        ' ' => g!(0b00000,0b00000,0b00000,0b00000,0b00000,0b00000,0b00000),

        _ => None,
    }
}

/// Draw a single 5x7 character at (x,y).
/// Visual: a tiny glyph with a 1-pixel black shadow for contrast.
fn draw_char_5x7(fb: &mut FrameBuffer, x: i32, y: i32, ch: char, color: u32) {
    if let Some(rows) = glyph5x7(ch) {
        for (shadow, c) in [(1, 0x00000000), (0, color)] {
            for (ry, rowbits) in rows.iter().enumerate() {
                for rx in 0..5 {
                    if (rowbits & (1 << (4 - rx))) != 0 {
                        put_pixel(fb, x + rx as i32 + shadow, y + ry as i32 + shadow, c);
                    }
                }
            }
        }
    }
}

/// Draw a text string using 5x7 glyphs, 1-pixel spacing.
pub fn draw_text_5x7(fb: &mut FrameBuffer, mut x: i32, y: i32, text: &str, color: u32) {
    for ch in text.chars() {
        draw_char_5x7(fb, x, y, ch, color);
        x += 6;
    }
}
