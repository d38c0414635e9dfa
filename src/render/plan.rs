use crate::foundation::core::{Point, Rect, Rgba8, Viewport};
use crate::foundation::math::clamp_lo;
use crate::overlay::model::{OverlayDocument, OverlayFrame};
use crate::render::style::{
    LABEL_BASELINE, LABEL_CHIP_HEIGHT, LABEL_PAD_X, OverlayStyle, severity_color,
};
use crate::render::viewport::ContentMapper;

/// One draw command in viewport pixel space. Ops are executed in order; later ops draw on top.
#[derive(Clone, Debug, PartialEq)]
pub enum OverlayOp {
    FocusBox {
        rect: Rect,
        color: Rgba8,
        label: Option<LabelChip>,
    },
    Bone {
        from: Point,
        to: Point,
    },
    Joint {
        center: Point,
        radius: f64,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct LabelChip {
    pub rect: Rect,
    pub text: String,
    /// Left end of the text baseline.
    pub origin: Point,
}

/// Text advance measurement used to size label chips.
pub trait TextMeasure {
    fn measure(&mut self, text: &str) -> f64;
}

/// Compile one resolved frame into draw ops.
///
/// Order: focus boxes, then skeleton bones, then keypoint joints, each pass gated by its
/// visibility toggle. Bones need both endpoints present and visible; joints skip keypoints
/// below the confidence threshold.
#[tracing::instrument(level = "trace", skip_all, fields(people = frame.people.len()))]
pub fn plan_overlay(
    doc: &OverlayDocument,
    frame: &OverlayFrame,
    mapper: &ContentMapper,
    viewport: Viewport,
    style: &OverlayStyle,
    measure: &mut dyn TextMeasure,
) -> Vec<OverlayOp> {
    let mut ops = Vec::new();

    if style.show_focus {
        for b in &frame.focus {
            let rect = mapper.map_box(b.x, b.y, b.w, b.h);
            if !rect.is_finite() {
                continue;
            }
            let label = (!b.label.is_empty())
                .then(|| label_chip(&b.label, rect, viewport, measure));
            ops.push(OverlayOp::FocusBox {
                rect,
                color: severity_color(b.severity),
                label,
            });
        }
    }

    if style.show_skeleton {
        for person in &frame.people {
            let pts = &person.keypoints;
            for &[ia, ib] in &doc.skeleton_pairs {
                let (Some(a), Some(b)) = (pts.get(ia), pts.get(ib)) else {
                    continue;
                };
                if !a.is_visible() || !b.is_visible() {
                    continue;
                }
                ops.push(OverlayOp::Bone {
                    from: mapper.map_point(a.x, a.y),
                    to: mapper.map_point(b.x, b.y),
                });
            }
        }
    }

    if style.show_keypoints {
        for person in &frame.people {
            for k in person.keypoints.iter().filter(|k| k.is_visible()) {
                ops.push(OverlayOp::Joint {
                    center: mapper.map_point(k.x, k.y),
                    radius: style.dot_radius,
                });
            }
        }
    }

    ops
}

/// Chip sits above the box's top-left corner, kept inside the viewport.
fn label_chip(
    text: &str,
    anchor: Rect,
    viewport: Viewport,
    measure: &mut dyn TextMeasure,
) -> LabelChip {
    let tw = measure.measure(text).max(0.0);
    let chip_w = tw + LABEL_PAD_X * 2.0;
    let (vw, vh) = (viewport.width_f64(), viewport.height_f64());

    let px = clamp_lo(anchor.x0, 0.0, vw - chip_w - 8.0);
    let py = clamp_lo(anchor.y0 - LABEL_CHIP_HEIGHT, 0.0, vh - 24.0);
    LabelChip {
        rect: Rect::new(px, py, px + chip_w, py + LABEL_CHIP_HEIGHT),
        text: text.to_owned(),
        origin: Point::new(px + LABEL_PAD_X, py + LABEL_BASELINE),
    }
}

/// Fixed per-character advance. Used when no font is available.
#[derive(Clone, Copy, Debug)]
pub struct FixedAdvance(pub f64);

impl TextMeasure for FixedAdvance {
    fn measure(&mut self, text: &str) -> f64 {
        self.0 * text.chars().count() as f64
    }
}
