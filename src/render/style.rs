use crate::foundation::core::Rgba8;
use crate::foundation::error::OverlayResult;
use crate::overlay::model::Severity;

/// Runtime overlay controls. Changes apply on the next tick.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct OverlayStyle {
    pub show_keypoints: bool,
    pub show_skeleton: bool,
    pub show_focus: bool,
    /// Whole-overlay alpha in `[0, 1]`.
    pub opacity: f64,
    /// Keypoint dot radius in pixels.
    pub dot_radius: f64,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            show_keypoints: true,
            show_skeleton: true,
            show_focus: true,
            opacity: 1.0,
            dot_radius: 5.0,
        }
    }
}

impl OverlayStyle {
    /// Parse a (possibly partial) style from JSON. Missing fields take defaults.
    pub fn from_json_slice(bytes: &[u8]) -> OverlayResult<Self> {
        let style: Self = serde_json::from_slice(bytes)?;
        Ok(style.sanitized())
    }

    pub fn sanitized(mut self) -> Self {
        self.opacity = if self.opacity.is_finite() {
            self.opacity.clamp(0.0, 1.0)
        } else {
            1.0
        };
        if !self.dot_radius.is_finite() || self.dot_radius <= 0.0 {
            self.dot_radius = Self::default().dot_radius;
        }
        self
    }
}

pub mod palette {
    use super::Rgba8;

    pub const DANGER: Rgba8 = Rgba8::opaque(0xff, 0x5c, 0x80);
    pub const WARN: Rgba8 = Rgba8::opaque(0xff, 0xd1, 0x66);
    pub const MINT: Rgba8 = Rgba8::opaque(0x7b, 0xff, 0xba);
    pub const BONE: Rgba8 = Rgba8::new(103, 40, 245, 230);
    pub const BONE_GLOW: Rgba8 = Rgba8::new(103, 40, 245, 153);
    pub const CHIP_BG: Rgba8 = Rgba8::new(0, 0, 0, 153);
}

pub fn severity_color(severity: Severity) -> Rgba8 {
    match severity {
        Severity::Danger => palette::DANGER,
        Severity::Warn => palette::WARN,
        Severity::Info => palette::MINT,
    }
}

pub const FOCUS_LINE_WIDTH: f64 = 2.0;
pub const FOCUS_GLOW_RADIUS: f64 = 12.0;
pub const BONE_LINE_WIDTH: f64 = 2.0;
pub const BONE_GLOW_RADIUS: f64 = 8.0;

pub const LABEL_FONT_SIZE: f32 = 12.0;
pub const LABEL_PAD_X: f64 = 8.0;
pub const LABEL_CHIP_HEIGHT: f64 = 20.0;
pub const LABEL_BASELINE: f64 = 14.0;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_style_json_fills_defaults() {
        let s = OverlayStyle::from_json_slice(br#"{"show_skeleton":false,"opacity":3}"#).unwrap();
        assert!(!s.show_skeleton);
        assert!(s.show_keypoints && s.show_focus);
        assert_eq!(s.opacity, 1.0);
        assert_eq!(s.dot_radius, 5.0);
    }

    #[test]
    fn sanitize_repairs_bad_values() {
        let s = OverlayStyle {
            opacity: f64::NAN,
            dot_radius: -2.0,
            ..OverlayStyle::default()
        }
        .sanitized();
        assert_eq!((s.opacity, s.dot_radius), (1.0, 5.0));

        let s = OverlayStyle {
            opacity: -0.4,
            ..OverlayStyle::default()
        }
        .sanitized();
        assert_eq!(s.opacity, 0.0);
    }

    #[test]
    fn severity_colors() {
        assert_eq!(severity_color(Severity::Danger), palette::DANGER);
        assert_eq!(severity_color(Severity::Warn), palette::WARN);
        assert_eq!(severity_color(Severity::Info), palette::MINT);
    }
}
