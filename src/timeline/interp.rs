use std::borrow::Cow;

use crate::foundation::math::lerp;
use crate::overlay::model::{FocusBox, Keypoint, OverlayDocument, OverlayFrame, Person};
use crate::timeline::locate::bracket;

/// Blend two frames positionally.
///
/// The result has A's structure: person `i` keypoint `j` pairs with the same position in B, and
/// any position B lacks keeps A's value untouched. Confidence is taken from B when B has one.
/// Ids, labels and severities always come from A.
pub fn interpolate(a: &OverlayFrame, b: &OverlayFrame, alpha: f64) -> OverlayFrame {
    let people = a
        .people
        .iter()
        .enumerate()
        .map(|(i, pa)| match b.people.get(i) {
            Some(pb) => blend_person(pa, pb, alpha),
            None => pa.clone(),
        })
        .collect();

    let focus = a
        .focus
        .iter()
        .enumerate()
        .map(|(i, fa)| match b.focus.get(i) {
            Some(fb) => blend_box(fa, fb, alpha),
            None => fa.clone(),
        })
        .collect();

    OverlayFrame {
        key: lerp(a.key, b.key, alpha),
        people,
        focus,
    }
}

fn blend_person(a: &Person, b: &Person, alpha: f64) -> Person {
    let keypoints = a
        .keypoints
        .iter()
        .enumerate()
        .map(|(j, ka)| match b.keypoints.get(j) {
            Some(kb) => blend_keypoint(ka, kb, alpha),
            None => *ka,
        })
        .collect();
    Person {
        id: a.id.clone(),
        keypoints,
    }
}

fn blend_keypoint(a: &Keypoint, b: &Keypoint, alpha: f64) -> Keypoint {
    Keypoint {
        x: lerp(a.x, b.x, alpha),
        y: lerp(a.y, b.y, alpha),
        c: b.c.or(a.c),
    }
}

fn blend_box(a: &FocusBox, b: &FocusBox, alpha: f64) -> FocusBox {
    FocusBox {
        label: a.label.clone(),
        x: lerp(a.x, b.x, alpha),
        y: lerp(a.y, b.y, alpha),
        w: lerp(a.w, b.w, alpha),
        h: lerp(a.h, b.h, alpha),
        severity: a.severity,
    }
}

/// The frame to draw at `seconds` of playback.
///
/// Borrows the floor frame when no blending is needed (interpolation off, past the final frame,
/// or exactly on a key). `None` for a document without frames.
pub fn resolve_frame(
    doc: &OverlayDocument,
    seconds: f64,
    interpolate_frames: bool,
) -> Option<Cow<'_, OverlayFrame>> {
    let query = doc.query_key(seconds);
    let br = bracket(&doc.frames, query)?;
    let floor = &doc.frames[br.floor];
    match br.next {
        Some(next) if interpolate_frames && br.alpha > 0.0 => Some(Cow::Owned(interpolate(
            floor,
            &doc.frames[next],
            br.alpha,
        ))),
        _ => Some(Cow::Borrowed(floor)),
    }
}
