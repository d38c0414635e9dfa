//! Conversion from the offline pose-estimation pipeline's per-frame detections.
//!
//! The pipeline writes pixel-space detections:
//!
//! ```json
//! { "fps": 30.0, "size": {"w": 1920, "h": 1080},
//!   "frames": [{ "index": 0, "time": 0.0,
//!                "detections": [{ "track_id": 3, "bbox_xyxy": [x0,y0,x1,y1], "score": 0.9,
//!                                 "class": "person", "keypoints": [{"x":..,"y":..,"c":..}] }] }] }
//! ```
//!
//! The result is a time-keyed v1 document with coordinates normalized to the frame size and the
//! COCO-17 skeleton.

use crate::foundation::error::{OverlayError, OverlayResult};
use crate::overlay::model::{
    FocusBox, FrameKeyKind, Keypoint, OverlayDocument, OverlayFrame, Person, Severity,
};

/// COCO-17 limb connections (0-based keypoint indices).
pub const COCO_SKELETON: [[usize; 2]; 19] = [
    [15, 13],
    [13, 11],
    [16, 14],
    [14, 12],
    [11, 12],
    [5, 11],
    [6, 12],
    [5, 6],
    [5, 7],
    [6, 8],
    [7, 9],
    [8, 10],
    [1, 2],
    [0, 1],
    [0, 2],
    [1, 3],
    [2, 4],
    [3, 5],
    [4, 6],
];

#[derive(Clone, Debug)]
pub struct ImportOpts {
    /// Emit each person's bounding box as an info focus box labeled with the person id.
    pub bbox_focus: bool,
    /// Drop detections scored below this. Unscored detections are kept.
    pub min_score: f64,
}

impl Default for ImportOpts {
    fn default() -> Self {
        Self {
            bbox_focus: false,
            min_score: 0.0,
        }
    }
}

#[derive(Clone, Debug, serde::Deserialize)]
pub struct PoseAnnotations {
    #[serde(default)]
    pub source: Option<String>,
    pub fps: f64,
    pub size: FrameSize,
    #[serde(default)]
    pub frames: Vec<AnnotatedFrame>,
}

#[derive(Clone, Copy, Debug, serde::Deserialize)]
pub struct FrameSize {
    pub w: u32,
    pub h: u32,
}

#[derive(Clone, Debug, serde::Deserialize)]
pub struct AnnotatedFrame {
    pub index: u64,
    #[serde(default)]
    pub time: Option<f64>,
    #[serde(default)]
    pub detections: Vec<Detection>,
}

#[derive(Clone, Debug, serde::Deserialize)]
pub struct Detection {
    #[serde(default)]
    pub track_id: Option<i64>,
    #[serde(default)]
    pub bbox_xyxy: Option<[f64; 4]>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub class: Option<String>,
    #[serde(default)]
    pub keypoints: Vec<Keypoint>,
}

impl PoseAnnotations {
    pub fn from_json_slice(bytes: &[u8]) -> OverlayResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Convert pipeline detections into an overlay document.
#[tracing::instrument(skip_all, fields(frames = ann.frames.len()))]
pub fn import_pose_annotations(
    ann: &PoseAnnotations,
    opts: &ImportOpts,
) -> OverlayResult<OverlayDocument> {
    if ann.size.w == 0 || ann.size.h == 0 {
        return Err(OverlayError::validation("annotation frame size must be non-zero"));
    }
    if !ann.fps.is_finite() || ann.fps <= 0.0 {
        return Err(OverlayError::validation("annotation fps must be finite and > 0"));
    }
    let sx = f64::from(ann.size.w);
    let sy = f64::from(ann.size.h);

    let mut frames = Vec::with_capacity(ann.frames.len());
    let mut dropped = 0usize;
    for af in &ann.frames {
        let mut people = Vec::new();
        let mut focus = Vec::new();
        for (n, det) in af.detections.iter().enumerate() {
            if det.class.as_deref().is_some_and(|c| c != "person") {
                continue;
            }
            if det.score.is_some_and(|s| s < opts.min_score) {
                dropped += 1;
                continue;
            }

            let id = match det.track_id {
                Some(tid) => tid.to_string(),
                None => format!("p{n}"),
            };
            let keypoints = det
                .keypoints
                .iter()
                .map(|k| Keypoint {
                    x: k.x / sx,
                    y: k.y / sy,
                    c: k.c,
                })
                .collect();

            if opts.bbox_focus
                && let Some([x0, y0, x1, y1]) = det.bbox_xyxy
            {
                focus.push(FocusBox {
                    label: format!("#{id}"),
                    x: x0.min(x1) / sx,
                    y: y0.min(y1) / sy,
                    w: (x1 - x0).abs() / sx,
                    h: (y1 - y0).abs() / sy,
                    severity: Severity::Info,
                });
            }
            people.push(Person { id, keypoints });
        }

        frames.push(OverlayFrame {
            key: af.time.unwrap_or(af.index as f64 / ann.fps),
            people,
            focus,
        });
    }

    if dropped > 0 {
        tracing::debug!(dropped, min_score = opts.min_score, "low-score detections dropped");
    }

    let mut doc = OverlayDocument {
        fps: Some(ann.fps),
        key_kind: FrameKeyKind::Time,
        skeleton_pairs: COCO_SKELETON.to_vec(),
        frames,
    };
    doc.sort_frames();
    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "source": "clip.mp4", "fps": 25.0, "size": {"w": 200, "h": 100},
        "frames": [
            {"index": 1, "time": 0.04, "detections": [
                {"track_id": 7, "bbox_xyxy": [20, 10, 60, 90], "score": 0.9, "class": "person",
                 "keypoints": [{"x": 100, "y": 50, "c": 0.8}, {"x": 0, "y": 0}]},
                {"track_id": null, "bbox_xyxy": [0, 0, 1, 1], "score": 0.1, "class": "person",
                 "keypoints": []},
                {"track_id": 9, "class": "ball", "keypoints": []}
            ]},
            {"index": 0, "detections": []}
        ]
    }"#;

    #[test]
    fn normalizes_pixels_and_orders_frames() {
        let ann = PoseAnnotations::from_json_slice(SAMPLE.as_bytes()).unwrap();
        let doc = import_pose_annotations(&ann, &ImportOpts::default()).unwrap();

        assert_eq!(doc.key_kind, FrameKeyKind::Time);
        assert_eq!(doc.skeleton_pairs.len(), COCO_SKELETON.len());
        assert_eq!(doc.frames[0].key, 0.0);
        assert_eq!(doc.frames[1].key, 0.04);

        let people = &doc.frames[1].people;
        assert_eq!(people.len(), 2);
        assert_eq!(people[0].id, "7");
        assert_eq!(people[0].keypoints[0].x, 0.5);
        assert_eq!(people[0].keypoints[0].y, 0.5);
        assert_eq!(people[0].keypoints[0].c, Some(0.8));
        assert_eq!(people[1].id, "p1");
        assert!(doc.frames[1].focus.is_empty());
    }

    #[test]
    fn min_score_and_bbox_focus() {
        let ann = PoseAnnotations::from_json_slice(SAMPLE.as_bytes()).unwrap();
        let opts = ImportOpts {
            bbox_focus: true,
            min_score: 0.5,
        };
        let doc = import_pose_annotations(&ann, &opts).unwrap();
        let frame = &doc.frames[1];
        assert_eq!(frame.people.len(), 1);
        assert_eq!(frame.focus.len(), 1);
        let b = &frame.focus[0];
        assert_eq!(b.label, "#7");
        assert_eq!((b.x, b.y, b.w, b.h), (0.1, 0.1, 0.2, 0.8));
    }

    #[test]
    fn rejects_zero_size() {
        let ann = PoseAnnotations {
            source: None,
            fps: 30.0,
            size: FrameSize { w: 0, h: 10 },
            frames: vec![],
        };
        assert!(import_pose_annotations(&ann, &ImportOpts::default()).is_err());
    }

    #[test]
    fn imported_documents_serialize_as_v1() {
        let ann = PoseAnnotations::from_json_slice(SAMPLE.as_bytes()).unwrap();
        let doc = import_pose_annotations(&ann, &ImportOpts::default()).unwrap();
        let back = OverlayDocument::from_json_slice(doc.to_json_pretty().unwrap().as_bytes())
            .unwrap();
        assert_eq!(back, doc);
    }
}
