// Camera frame -> overlay pixels, in one pass.
// Visual expectation: the camera picture fills the whole overlay,
// with its opacity set by the alpha percent.

use crate::types::{AlphaMode, BYTES_PER_PIXEL, Frame, PixelView};

/// Source index for destination index `d` under nearest-neighbour scaling.
#[inline]
fn nearest(d: usize, src_len: usize, dst_len: usize) -> usize {
    ((d * src_len) / dst_len).min(src_len - 1)
}

/// `floor(v * percent / 100)` for every byte value.
fn scale_table(percent: u8) -> [u8; 256] {
    let p = u32::from(percent.min(100));
    let mut lut = [0u8; 256];
    for (v, out) in lut.iter_mut().enumerate() {
        *out = (v as u32 * p / 100) as u8;
    }
    lut
}

/// Convert RGB -> BGRA (opaque), nearest-resize into `dst`, then apply alpha.
///
/// `dst` is the overlay's own backing storage; nothing is allocated per pixel.
/// Zero-sized source or target leaves `dst` untouched.
pub fn transform_into(frame: &Frame, dst: &mut PixelView<'_>, alpha: u8, mode: AlphaMode) {
    let (sw, sh) = (frame.width() as usize, frame.height() as usize);
    let target = dst.size();
    let (dw, dh) = (target.width as usize, target.height as usize);
    if sw == 0 || sh == 0 || dw == 0 || dh == 0 {
        return;
    }

    let lut = scale_table(alpha);
    let opaque = lut[255];

    // Column lookup is the same for every row.
    let cols: Vec<usize> = (0..dw).map(|x| nearest(x, sw, dw) * 3).collect();
    let src = frame.as_raw();

    for (y, row) in dst.rows_mut().enumerate() {
        let sy = nearest(y, sh, dh);
        let src_row = &src[sy * sw * 3..(sy + 1) * sw * 3];

        for (px, &sx) in row.chunks_exact_mut(BYTES_PER_PIXEL).zip(&cols) {
            let (r, g, b) = (src_row[sx], src_row[sx + 1], src_row[sx + 2]);
            match mode {
                // Scales color along with opacity, so the overlay also gets darker.
                AlphaMode::UniformScale => {
                    px[0] = lut[b as usize];
                    px[1] = lut[g as usize];
                    px[2] = lut[r as usize];
                }
                AlphaMode::AlphaChannelOnly => {
                    px[0] = b;
                    px[1] = g;
                    px[2] = r;
                }
            }
            px[3] = opaque;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Size;
    use image::Rgb;

    fn run(frame: &Frame, size: Size, alpha: u8, mode: AlphaMode) -> Vec<u8> {
        let mut data = vec![0u8; size.area() * BYTES_PER_PIXEL];
        let mut view = PixelView::new(size, &mut data);
        transform_into(frame, &mut view, alpha, mode);
        data
    }

    #[test]
    fn uniform_scale_floors_every_channel() {
        let frame = Frame::from_pixel(1, 1, Rgb([200, 100, 7]));
        let out = run(&frame, Size::new(1, 1), 30, AlphaMode::UniformScale);
        // B,G,R,A = floor(7*.3), floor(100*.3), floor(200*.3), floor(255*.3)
        assert_eq!(out, vec![2, 30, 60, 76]);
    }

    #[test]
    fn alpha_only_keeps_colors() {
        let frame = Frame::from_pixel(1, 1, Rgb([200, 100, 7]));
        let out = run(&frame, Size::new(1, 1), 30, AlphaMode::AlphaChannelOnly);
        assert_eq!(out, vec![7, 100, 200, 76]);
    }

    #[test]
    fn uniform_scale_matches_formula_for_all_percents() {
        let frame = Frame::from_pixel(1, 1, Rgb([255, 128, 1]));
        for a in 0..=100u8 {
            let out = run(&frame, Size::new(1, 1), a, AlphaMode::UniformScale);
            let f = |v: u32| (v * a as u32 / 100) as u8;
            assert_eq!(out, vec![f(1), f(128), f(255), f(255)], "alpha {a}");
        }
    }

    #[test]
    fn extremes_of_alpha() {
        let frame = Frame::from_pixel(1, 1, Rgb([10, 20, 30]));
        assert_eq!(run(&frame, Size::new(1, 1), 0, AlphaMode::UniformScale), vec![0, 0, 0, 0]);
        assert_eq!(run(&frame, Size::new(1, 1), 0, AlphaMode::AlphaChannelOnly), vec![30, 20, 10, 0]);
        assert_eq!(run(&frame, Size::new(1, 1), 100, AlphaMode::UniformScale), vec![30, 20, 10, 255]);
    }

    #[test]
    fn nearest_neighbour_upscale_repeats_pixels() {
        let mut frame = Frame::new(2, 1);
        frame.put_pixel(0, 0, Rgb([1, 1, 1]));
        frame.put_pixel(1, 0, Rgb([2, 2, 2]));
        let out = run(&frame, Size::new(4, 2), 100, AlphaMode::AlphaChannelOnly);
        let blues: Vec<u8> = out.chunks_exact(4).map(|p| p[0]).collect();
        assert_eq!(blues, vec![1, 1, 2, 2, 1, 1, 2, 2]);
    }

    #[test]
    fn nearest_neighbour_downscale_samples_floor() {
        let mut frame = Frame::new(4, 4);
        for (x, y, px) in frame.enumerate_pixels_mut() {
            *px = Rgb([(y * 4 + x) as u8, 0, 0]);
        }
        let out = run(&frame, Size::new(2, 2), 100, AlphaMode::AlphaChannelOnly);
        let reds: Vec<u8> = out.chunks_exact(4).map(|p| p[2]).collect();
        assert_eq!(reds, vec![0, 2, 8, 10]);
    }

    #[test]
    fn empty_target_is_noop() {
        let frame = Frame::from_pixel(2, 2, Rgb([9, 9, 9]));
        assert!(run(&frame, Size::new(0, 0), 50, AlphaMode::UniformScale).is_empty());
    }
}
