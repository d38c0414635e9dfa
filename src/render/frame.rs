use crate::foundation::error::{OverlayError, OverlayResult};

/// Rendered RGBA8 pixels, row-major, tightly packed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameRGBA {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    pub premultiplied: bool,
}

impl FrameRGBA {
    /// Fully transparent frame.
    pub fn transparent(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize * 4],
            premultiplied: true,
        }
    }

    /// RGBA at `(x, y)` as stored.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        Some([
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ])
    }

    pub fn is_fully_transparent(&self) -> bool {
        self.data.chunks_exact(4).all(|px| px[3] == 0)
    }

    /// Straight-alpha copy, suitable for PNG output.
    pub fn to_straight_rgba8(&self) -> OverlayResult<Vec<u8>> {
        if self.data.len() != self.width as usize * self.height as usize * 4 {
            return Err(OverlayError::render("frame byte length mismatch"));
        }
        if !self.premultiplied {
            return Ok(self.data.clone());
        }
        let mut out = self.data.clone();
        for px in out.chunks_exact_mut(4) {
            let a = u16::from(px[3]);
            if a == 0 || a == 255 {
                continue;
            }
            for c in &mut px[..3] {
                *c = ((u16::from(*c) * 255 + a / 2) / a).min(255) as u8;
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unpremultiply_half_alpha() {
        let f = FrameRGBA {
            width: 1,
            height: 1,
            data: vec![64, 0, 128, 128],
            premultiplied: true,
        };
        assert_eq!(f.to_straight_rgba8().unwrap(), vec![128, 0, 255, 128]);
    }

    #[test]
    fn transparent_and_opaque_pixels_are_untouched() {
        let f = FrameRGBA {
            width: 2,
            height: 1,
            data: vec![0, 0, 0, 0, 9, 8, 7, 255],
            premultiplied: true,
        };
        assert_eq!(f.to_straight_rgba8().unwrap(), f.data);
        assert_eq!(f.pixel(1, 0), Some([9, 8, 7, 255]));
        assert_eq!(f.pixel(2, 0), None);
        assert!(!f.is_fully_transparent());
        assert!(FrameRGBA::transparent(3, 3).is_fully_transparent());
    }

    #[test]
    fn length_mismatch_is_rejected() {
        let f = FrameRGBA {
            width: 2,
            height: 2,
            data: vec![0; 4],
            premultiplied: true,
        };
        assert!(f.to_straight_rgba8().is_err());
    }
}
