// Core types shared by capture, transform, overlay and the loop.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// One camera image at native resolution, 3 channels (R,G,B).
/// Lives for a single loop iteration.
pub type Frame = image::RgbImage;

/// Bytes per overlay pixel (B,G,R,A).
pub const BYTES_PER_PIXEL: usize = 4;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn area(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Window placement in root-window coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

/// How the alpha setting is applied to the overlay pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlphaMode {
    /// Scale all four channels (also darkens the colors).
    UniformScale,
    /// Scale only the alpha channel; colors stay at full intensity.
    AlphaChannelOnly,
}

/// Process-wide transparency percent (0..=100).
///
/// Single writer (the debug slider), read once per tick by the transform.
/// Relaxed ordering: a slightly stale read just shows last frame's opacity.
#[derive(Debug)]
pub struct AlphaCell(AtomicU8);

impl AlphaCell {
    pub fn new(percent: u8) -> Self {
        Self(AtomicU8::new(percent.min(100)))
    }

    pub fn get(&self) -> u8 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn set(&self, percent: u8) {
        self.0.store(percent.min(100), Ordering::Relaxed);
    }
}

/// Borrowed, writable view of the overlay's B,G,R,A backing storage.
/// Handed out by the surface each tick; never owned by the writer.
pub struct PixelView<'a> {
    size: Size,
    data: &'a mut [u8],
}

impl<'a> PixelView<'a> {
    pub fn new(size: Size, data: &'a mut [u8]) -> Self {
        debug_assert_eq!(data.len(), size.area() * BYTES_PER_PIXEL);
        Self { size, data }
    }

    pub fn size(&self) -> Size {
        self.size
    }

    /// Mutable rows, each `width * 4` bytes.
    pub fn rows_mut(&mut self) -> impl Iterator<Item = &mut [u8]> {
        let stride = (self.size.width as usize * BYTES_PER_PIXEL).max(1);
        self.data.chunks_exact_mut(stride)
    }
}
