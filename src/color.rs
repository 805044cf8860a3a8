/// RGBA colour; alpha is a coverage fraction in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Color {
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const BLACK: Color = Color::rgb(0, 0, 0);

    #[inline]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    #[inline]
    pub fn rgba(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self {
            r,
            g,
            b,
            a: a.clamp(0.0, 1.0),
        }
    }

    /// Only fully opaque colours hide what is behind them.
    #[inline]
    pub fn is_opaque(&self) -> bool {
        self.a >= 1.0
    }

    /// Pack into the `0RGB` layout softbuffer presents.
    #[inline]
    pub fn to_pixel(&self) -> u32 {
        pack_rgb(self.r, self.g, self.b)
    }

    /// `#rrggbb`, alpha ignored.
    pub fn to_hex_string(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::WHITE
    }
}

#[inline]
pub fn pack_rgb(r: u8, g: u8, b: u8) -> u32 {
    (b as u32) | ((g as u32) << 8) | ((r as u32) << 16)
}

/// Composite `src` over the packed pixel `dst` with coverage `alpha`.
#[inline]
pub fn blend_over(dst: u32, src: u32, alpha: f32) -> u32 {
    if alpha >= 1.0 {
        return src & 0x00FF_FFFF;
    }
    if alpha <= 0.0 {
        return dst;
    }
    // 8-bit fixed point weight, same trick the scaler uses
    let w = (alpha * 256.0).round() as u32;
    let inv = 256 - w;
    let rb = (((dst & 0x00FF00FF) * inv + (src & 0x00FF00FF) * w) >> 8) & 0x00FF00FF;
    let g = (((dst & 0x0000FF00) * inv + (src & 0x0000FF00) * w) >> 8) & 0x0000FF00;
    rb | g
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packs_into_zero_rgb() {
        assert_eq!(pack_rgb(0x12, 0x34, 0x56), 0x0012_3456);
        assert_eq!(Color::rgb(255, 0, 0).to_pixel(), 0x00FF_0000);
    }

    #[test]
    fn alpha_is_clamped_and_opacity_is_exact() {
        assert_eq!(Color::rgba(1, 2, 3, 4.0).a, 1.0);
        assert!(Color::rgb(1, 2, 3).is_opaque());
        assert!(!Color::rgba(1, 2, 3, 0.5).is_opaque());
    }

    #[test]
    fn blend_half_way() {
        let out = blend_over(pack_rgb(0, 0, 0), pack_rgb(200, 100, 50), 0.5);
        assert_eq!(out, pack_rgb(100, 50, 25));
    }

    #[test]
    fn blend_extremes() {
        let dst = pack_rgb(10, 20, 30);
        let src = pack_rgb(40, 50, 60);
        assert_eq!(blend_over(dst, src, 1.0), src);
        assert_eq!(blend_over(dst, src, 0.0), dst);
    }

    #[test]
    fn hex_string() {
        assert_eq!(Color::rgb(255, 128, 0).to_hex_string(), "#ff8000");
    }
}
