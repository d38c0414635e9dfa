use crate::foundation::core::{Point, Rect, VideoSize, Viewport};

/// Region of `viewport` covered by visible picture when the video is fitted with
/// `object-fit: contain`.
///
/// A viewport wider than the video pillarboxes (full height, centered horizontally); otherwise
/// it letterboxes (full width, centered vertically). A degenerate video size covers the whole
/// viewport.
pub fn content_rect(viewport: Viewport, video: VideoSize) -> Rect {
    let (vw, vh) = (viewport.width_f64(), viewport.height_f64());
    if video.is_degenerate() {
        return Rect::new(0.0, 0.0, vw, vh);
    }

    let video_aspect = video.aspect();
    if viewport.aspect() > video_aspect {
        let w = vh * video_aspect;
        let x = (vw - w) / 2.0;
        Rect::new(x, 0.0, x + w, vh)
    } else {
        let h = vw / video_aspect;
        let y = (vh - h) / 2.0;
        Rect::new(0.0, y, vw, y + h)
    }
}

/// Maps normalized `[0, 1]` video coordinates into viewport pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ContentMapper {
    pub rect: Rect,
}

impl ContentMapper {
    pub fn new(viewport: Viewport, video: VideoSize) -> Self {
        Self {
            rect: content_rect(viewport, video),
        }
    }

    pub fn map_point(&self, x: f64, y: f64) -> Point {
        Point::new(
            self.rect.x0 + x * self.rect.width(),
            self.rect.y0 + y * self.rect.height(),
        )
    }

    /// Map a normalized top-left + size box.
    pub fn map_box(&self, x: f64, y: f64, w: f64, h: f64) -> Rect {
        let p = self.map_point(x, y);
        Rect::new(
            p.x,
            p.y,
            p.x + w * self.rect.width(),
            p.y + h * self.rect.height(),
        )
    }
}
