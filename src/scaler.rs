use rayon::{
    iter::{IndexedParallelIterator, ParallelIterator},
    slice::ParallelSliceMut,
};

use crate::renderer::FrameBuffer;

/// Source neighbours and 8.8 fixed-point weight for each destination index
/// along one axis.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AxisTaps {
    lo: Vec<usize>,
    hi: Vec<usize>,
    weight: Vec<u16>,
}

impl AxisTaps {
    pub fn new(dst_len: usize, src_len: usize) -> Self {
        let mut taps = Self {
            lo: Vec::with_capacity(dst_len),
            hi: Vec::with_capacity(dst_len),
            weight: Vec::with_capacity(dst_len),
        };
        if dst_len == 0 || src_len == 0 {
            return taps;
        }
        let last = src_len - 1;
        let step = src_len as f32 / dst_len as f32;
        for i in 0..dst_len {
            let f = i as f32 * step;
            let lo = (f.floor() as usize).min(last);
            taps.lo.push(lo);
            taps.hi.push((lo + 1).min(last));
            taps.weight.push(((f - lo as f32) * 256.0).round().clamp(0.0, 256.0) as u16);
        }
        taps
    }

    pub fn len(&self) -> usize {
        self.lo.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lo.is_empty()
    }
}

/// Precomputed mapping from dest pixels to src neighbours + weights
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScaleLut {
    x: AxisTaps,
    y: AxisTaps,
    src_w: usize,
    src_h: usize,
}

impl ScaleLut {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(dst_w: usize, dst_h: usize, src_w: usize, src_h: usize) -> Self {
        Self {
            x: AxisTaps::new(dst_w, src_w),
            y: AxisTaps::new(dst_h, src_h),
            src_w,
            src_h,
        }
    }

    pub fn dst_size(&self) -> (usize, usize) {
        (self.x.len(), self.y.len())
    }

    pub fn src_size(&self) -> (usize, usize) {
        (self.src_w, self.src_h)
    }

    /// Whether this table was built for these sizes.
    pub fn matches(&self, dst_w: usize, dst_h: usize, src_w: usize, src_h: usize) -> bool {
        self.dst_size() == (dst_w, dst_h) && self.src_size() == (src_w, src_h)
    }
}

#[inline]
fn lerp_color_u32(a: u32, b: u32, w256: u32) -> u32 {
    // w256 in [0, 256]; inv = 256 - w256
    let inv = 256 - w256;
    // R and B together (00RR00BB), G on its own
    let rb = (((a & 0x00FF00FF) * inv + (b & 0x00FF00FF) * w256) >> 8) & 0x00FF00FF;
    let g = (((a & 0x0000FF00) * inv + (b & 0x0000FF00) * w256) >> 8) & 0x0000FF00;
    rb | g
}

/// Parallel bilinear stretch of `src` into the `dw`-wide `dst`.
/// Rows are processed in parallel for cache friendly writes.
///
/// Does nothing if `lut` was built for other sizes.
pub fn blit_bilinear_stretch(dst: &mut [u32], dw: usize, src: &FrameBuffer, lut: &ScaleLut) {
    let dh = if dw == 0 { 0 } else { dst.len() / dw };
    if !lut.matches(dw, dh, src.width(), src.height()) || lut.x.is_empty() {
        log::warn!(
            "scale table {:?} -> {:?} does not fit a {}x{} -> {dw}x{dh} blit",
            lut.src_size(),
            lut.dst_size(),
            src.width(),
            src.height()
        );
        return;
    }
    let sw = src.width();
    let pixels = src.pixels();

    dst.par_chunks_mut(dw).enumerate().for_each(|(y, dst_row)| {
        let wy = lut.y.weight[y] as u32;
        let row0 = lut.y.lo[y] * sw;
        let row1 = lut.y.hi[y] * sw;

        for (x, out) in dst_row.iter_mut().enumerate() {
            let x0 = lut.x.lo[x];
            let x1 = lut.x.hi[x];
            let wx = lut.x.weight[x] as u32;

            let top = lerp_color_u32(pixels[row0 + x0], pixels[row0 + x1], wx);
            let bot = lerp_color_u32(pixels[row1 + x0], pixels[row1 + x1], wx);
            *out = lerp_color_u32(top, bot, wy);
        }
    });
}
