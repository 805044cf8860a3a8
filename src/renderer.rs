//! Software raster target the camera draws into.

use crate::color::{Color, blend_over};
use crate::texture::TextureFrame;

/// `0RGB` pixel buffer, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameBuffer {
    width: usize,
    height: usize,
    pixels: Vec<u32>,
}

impl FrameBuffer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width * height],
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [u32] {
        &mut self.pixels
    }

    /// Reallocate if the size changed; contents are cleared either way.
    pub fn resize(&mut self, width: usize, height: usize) {
        if width != self.width || height != self.height {
            self.width = width;
            self.height = height;
            self.pixels = vec![0; width * height];
        } else {
            self.pixels.fill(0);
        }
    }

    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> u32 {
        self.pixels[y * self.width + x]
    }

    pub fn clear(&mut self, pixel: u32) {
        self.pixels.fill(pixel);
    }

    /// Sky above `split`, ground below it.
    pub fn fill_sky_and_ground(&mut self, split: f64, sky: u32, ground: u32) {
        let mid = (split.round().max(0.0) as usize).min(self.height);
        let width = self.width;
        for y in 0..mid {
            let row = y * width;
            self.pixels[row..row + width].fill(sky);
        }
        for y in mid..self.height {
            let row = y * width;
            self.pixels[row..row + width].fill(ground);
        }
    }

    /// Clip a span to `[0, limit)`.
    fn clip(start: f64, len: f64, limit: usize) -> Option<(usize, usize)> {
        if !(start.is_finite() && len.is_finite()) || len <= 0.0 {
            return None;
        }
        let s = start.floor().max(0.0);
        let e = (start + len).ceil().min(limit as f64);
        if s >= e {
            return None;
        }
        Some((s as usize, e as usize))
    }

    /// Fill a rectangle, compositing by the colour's alpha.
    pub fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64, color: Color) {
        let Some((x0, x1)) = Self::clip(x, w, self.width) else {
            return;
        };
        let Some((y0, y1)) = Self::clip(y, h, self.height) else {
            return;
        };
        let src = color.to_pixel();
        for yi in y0..y1 {
            let row = yi * self.width;
            for px in &mut self.pixels[row + x0..row + x1] {
                *px = blend_over(*px, src, color.a);
            }
        }
    }

    /// Stretch texel column `u` of `frame` over the screen rectangle.
    /// Transparent texels leave the destination untouched.
    pub fn draw_texture_slice(
        &mut self,
        frame: &TextureFrame,
        u: usize,
        x: f64,
        y: f64,
        w: f64,
        h: f64,
    ) {
        let Some((x0, x1)) = Self::clip(x, w, self.width) else {
            return;
        };
        let Some((y0, y1)) = Self::clip(y, h, self.height) else {
            return;
        };
        let tex_h = frame.height as f64;
        for yi in y0..y1 {
            // Sample at the pixel centre
            let v = (((yi as f64 + 0.5) - y) / h * tex_h).floor().max(0.0) as usize;
            let texel = frame.texel(u, v);
            if texel >> 24 == 0 {
                continue;
            }
            let row = yi * self.width;
            self.pixels[row + x0..row + x1].fill(texel & 0x00FF_FFFF);
        }
    }

    /// Bresenham line, clipped per pixel.
    pub fn draw_line(&mut self, x0: i64, y0: i64, x1: i64, y1: i64, pixel: u32) {
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let (mut x, mut y) = (x0, y0);
        let mut err = dx + dy;
        loop {
            self.put(x, y, pixel);
            if x == x1 && y == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    #[inline]
    pub fn put(&mut self, x: i64, y: i64, pixel: u32) {
        if x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height {
            self.pixels[y as usize * self.width + x as usize] = pixel;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::pack_rgb;
    use crate::texture::OPAQUE;

    #[test]
    fn sky_and_ground_split() {
        let mut fb = FrameBuffer::new(4, 10);
        fb.fill_sky_and_ground(3.0, 1, 2);
        assert_eq!(fb.pixel(0, 2), 1);
        assert_eq!(fb.pixel(3, 3), 2);
        fb.fill_sky_and_ground(-5.0, 1, 2);
        assert_eq!(fb.pixel(0, 0), 2);
        fb.fill_sky_and_ground(50.0, 1, 2);
        assert_eq!(fb.pixel(0, 9), 1);
    }

    #[test]
    fn fill_rect_clips_to_the_buffer() {
        let mut fb = FrameBuffer::new(4, 4);
        fb.fill_rect(-2.0, 2.0, 3.0, 100.0, Color::rgb(255, 0, 0));
        assert_eq!(fb.pixel(0, 2), pack_rgb(255, 0, 0));
        assert_eq!(fb.pixel(0, 3), pack_rgb(255, 0, 0));
        assert_eq!(fb.pixel(1, 3), 0);
        assert_eq!(fb.pixel(0, 1), 0);
    }

    #[test]
    fn translucent_fill_blends() {
        let mut fb = FrameBuffer::new(1, 1);
        fb.clear(pack_rgb(0, 0, 0));
        fb.fill_rect(0.0, 0.0, 1.0, 1.0, Color::rgba(200, 100, 50, 0.5));
        assert_eq!(fb.pixel(0, 0), pack_rgb(100, 50, 25));
    }

    #[test]
    fn texture_slice_stretches_and_skips_transparent_texels() {
        let frame = TextureFrame::new(2, 2, vec![OPAQUE | 1, 0, OPAQUE | 3, OPAQUE | 4]).unwrap();
        let mut fb = FrameBuffer::new(1, 4);
        fb.clear(9);
        fb.draw_texture_slice(&frame, 0, 0.0, 0.0, 1.0, 4.0);
        assert_eq!(fb.pixels(), &[1, 1, 3, 3]);
        fb.clear(9);
        fb.draw_texture_slice(&frame, 1, 0.0, 0.0, 1.0, 4.0);
        assert_eq!(fb.pixels(), &[9, 9, 4, 4]);
    }

    #[test]
    fn line_endpoints_are_drawn() {
        let mut fb = FrameBuffer::new(5, 5);
        fb.draw_line(0, 0, 4, 2, 7);
        assert_eq!(fb.pixel(0, 0), 7);
        assert_eq!(fb.pixel(4, 2), 7);
        fb.draw_line(-3, -3, 10, 10, 8);
        assert_eq!(fb.pixel(2, 2), 8);
    }
}
