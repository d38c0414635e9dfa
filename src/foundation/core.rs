pub use kurbo::{Point, Rect};

/// Pixel size of the drawing surface stacked over the video.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Viewport {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Viewport {
    /// Create a viewport, clamping each dimension to at least one pixel.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
        }
    }

    /// Viewport with the same dimensions as the video's intrinsic size.
    pub fn from_video(video: VideoSize) -> Self {
        Self::new(video.width, video.height)
    }

    pub fn width_f64(self) -> f64 {
        f64::from(self.width)
    }

    pub fn height_f64(self) -> f64 {
        f64::from(self.height)
    }

    pub fn aspect(self) -> f64 {
        self.width_f64() / self.height_f64()
    }
}

/// Intrinsic (decoded) size of the video picture.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct VideoSize {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl VideoSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Return `true` when either dimension is zero.
    pub fn is_degenerate(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Width over height. Undefined for degenerate sizes.
    pub fn aspect(self) -> f64 {
        f64::from(self.width) / f64::from(self.height)
    }
}

/// Straight-alpha RGBA8 color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8 {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    /// Same color with alpha scaled by `factor` (clamped to `[0, 1]`).
    pub fn with_alpha_scaled(self, factor: f64) -> Self {
        let f = factor.clamp(0.0, 1.0);
        Self {
            a: (f64::from(self.a) * f).round() as u8,
            ..self
        }
    }
}

/// Parse a `WxH` size string such as `1920x1080`.
pub fn parse_size(s: &str) -> Option<(u32, u32)> {
    let (w, h) = s.trim().split_once(['x', 'X'])?;
    let w = w.trim().parse::<u32>().ok()?;
    let h = h.trim().parse::<u32>().ok()?;
    Some((w, h))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn viewport_never_collapses_to_zero() {
        let v = Viewport::new(0, 0);
        assert_eq!((v.width, v.height), (1, 1));
    }

    #[test]
    fn degenerate_video_sizes() {
        assert!(VideoSize::new(0, 1080).is_degenerate());
        assert!(!VideoSize::new(1920, 1080).is_degenerate());
    }

    #[test]
    fn alpha_scaling_clamps() {
        let c = Rgba8::opaque(10, 20, 30);
        assert_eq!(c.with_alpha_scaled(0.5).a, 128);
        assert_eq!(c.with_alpha_scaled(4.0).a, 255);
        assert_eq!(c.with_alpha_scaled(-1.0).a, 0);
    }

    #[test]
    fn size_strings() {
        assert_eq!(parse_size("1920x1080"), Some((1920, 1080)));
        assert_eq!(parse_size(" 800X400 "), Some((800, 400)));
        assert_eq!(parse_size("800"), None);
        assert_eq!(parse_size("ax4"), None);
    }
}
