use crate::foundation::error::{OverlayError, OverlayResult};

/// Only supported document schema tag.
pub const SCHEMA_V1: &str = "v1";

/// Fallback rate for frame-keyed documents that omit `fps`.
pub const DEFAULT_FPS: f64 = 30.0;

/// Keypoints below this confidence are treated as absent.
pub const CONFIDENCE_THRESHOLD: f64 = 0.2;

/// Which temporal key the frames of a document carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub enum FrameKeyKind {
    /// `t`: seconds.
    Time,
    /// `f`: integer frame index, converted through `fps`.
    Index,
}

/// One pose/focus annotation document, normalized for lookup.
///
/// Frames are sorted ascending by `key` on parse. The JSON form carries either `t` or `f` per
/// frame; after parsing every frame holds a single numeric key in the document's key domain.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "RawDocument", into = "RawDocument")]
pub struct OverlayDocument {
    pub fps: Option<f64>,
    pub key_kind: FrameKeyKind,
    pub skeleton_pairs: Vec<[usize; 2]>,
    pub frames: Vec<OverlayFrame>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct OverlayFrame {
    /// Seconds for [`FrameKeyKind::Time`], frame index for [`FrameKeyKind::Index`].
    pub key: f64,
    pub people: Vec<Person>,
    pub focus: Vec<FocusBox>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Person {
    pub id: String,
    /// Order matters: skeleton pairs index into this list.
    #[serde(default)]
    pub keypoints: Vec<Keypoint>,
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Keypoint {
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub c: Option<f64>,
}

impl Keypoint {
    /// Drawable: finite coordinates and confidence absent or at least [`CONFIDENCE_THRESHOLD`].
    pub fn is_visible(&self) -> bool {
        self.x.is_finite()
            && self.y.is_finite()
            && self.c.is_none_or(|c| c >= CONFIDENCE_THRESHOLD)
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FocusBox {
    pub label: String,
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
    #[serde(default)]
    pub severity: Severity,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Severity {
    #[default]
    Info,
    Warn,
    Danger,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Danger => "danger",
        }
    }
}

// Unknown tags fall back to info.
impl From<String> for Severity {
    fn from(s: String) -> Self {
        match s.as_str() {
            "danger" => Self::Danger,
            "warn" => Self::Warn,
            _ => Self::Info,
        }
    }
}

impl From<Severity> for String {
    fn from(s: Severity) -> Self {
        s.as_str().to_owned()
    }
}

impl OverlayDocument {
    /// Parse and validate a v1 document from JSON bytes.
    pub fn from_json_slice(bytes: &[u8]) -> OverlayResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn to_json_pretty(&self) -> OverlayResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Frame rate used to convert seconds into frame indices.
    pub fn effective_fps(&self) -> f64 {
        self.fps.unwrap_or(DEFAULT_FPS)
    }

    /// Convert a playback position into this document's key domain.
    pub fn query_key(&self, seconds: f64) -> f64 {
        let secs = sanitize_secs(seconds);
        match self.key_kind {
            FrameKeyKind::Time => secs,
            FrameKeyKind::Index => (secs * self.effective_fps()).floor(),
        }
    }

    /// Convert a frame key back into seconds.
    pub fn key_to_secs(&self, key: f64) -> f64 {
        match self.key_kind {
            FrameKeyKind::Time => key,
            FrameKeyKind::Index => key / self.effective_fps(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// `(first, last)` frame keys, or `None` for an empty document.
    pub fn key_span(&self) -> Option<(f64, f64)> {
        Some((self.frames.first()?.key, self.frames.last()?.key))
    }

    /// Re-establish ascending key order. Stable, so duplicate keys keep file order.
    pub fn sort_frames(&mut self) {
        self.frames.sort_by(|a, b| a.key.total_cmp(&b.key));
    }
}

pub(crate) fn sanitize_secs(seconds: f64) -> f64 {
    if seconds.is_finite() { seconds.max(0.0) } else { 0.0 }
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
struct RawDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    fps: Option<f64>,
    schema: String,
    #[serde(rename = "skeletonPairs", default)]
    skeleton_pairs: Vec<[usize; 2]>,
    #[serde(default)]
    frames: Vec<RawFrame>,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
struct RawFrame {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    t: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    f: Option<u64>,
    #[serde(default)]
    people: Vec<Person>,
    #[serde(default)]
    focus: Vec<FocusBox>,
}

impl TryFrom<RawDocument> for OverlayDocument {
    type Error = OverlayError;

    fn try_from(raw: RawDocument) -> OverlayResult<Self> {
        if raw.schema != SCHEMA_V1 {
            return Err(OverlayError::validation(format!(
                "unsupported overlay schema '{}' (expected '{SCHEMA_V1}')",
                raw.schema
            )));
        }
        if let Some(fps) = raw.fps
            && (!fps.is_finite() || fps <= 0.0)
        {
            return Err(OverlayError::validation("fps must be finite and > 0"));
        }

        let key_kind = match raw.frames.first() {
            None => FrameKeyKind::Time,
            Some(f) if f.t.is_some() => FrameKeyKind::Time,
            Some(f) if f.f.is_some() => FrameKeyKind::Index,
            Some(_) => {
                return Err(OverlayError::validation(
                    "first frame carries neither 't' nor 'f'",
                ));
            }
        };

        let mut frames = Vec::with_capacity(raw.frames.len());
        for (i, f) in raw.frames.into_iter().enumerate() {
            let key = match key_kind {
                FrameKeyKind::Time => f.t.ok_or_else(|| {
                    OverlayError::validation(format!("frame {i} is missing 't'"))
                })?,
                FrameKeyKind::Index => f.f.ok_or_else(|| {
                    OverlayError::validation(format!("frame {i} is missing 'f'"))
                })? as f64,
            };
            if !key.is_finite() {
                return Err(OverlayError::validation(format!(
                    "frame {i} has a non-finite key"
                )));
            }
            frames.push(OverlayFrame {
                key,
                people: f.people,
                focus: f.focus,
            });
        }

        let mut doc = Self {
            fps: raw.fps,
            key_kind,
            skeleton_pairs: raw.skeleton_pairs,
            frames,
        };
        doc.sort_frames();
        Ok(doc)
    }
}

impl From<OverlayDocument> for RawDocument {
    fn from(doc: OverlayDocument) -> Self {
        let key_kind = doc.key_kind;
        Self {
            fps: doc.fps,
            schema: SCHEMA_V1.to_owned(),
            skeleton_pairs: doc.skeleton_pairs,
            frames: doc
                .frames
                .into_iter()
                .map(|f| RawFrame {
                    t: (key_kind == FrameKeyKind::Time).then_some(f.key),
                    f: (key_kind == FrameKeyKind::Index).then_some(f.key.max(0.0) as u64),
                    people: f.people,
                    focus: f.focus,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> OverlayResult<OverlayDocument> {
        OverlayDocument::from_json_slice(s.as_bytes())
    }

    #[test]
    fn time_keyed_frames_are_sorted_on_load() {
        let doc = parse(
            r#"{"schema":"v1","skeletonPairs":[[0,1]],"frames":[
                {"t":1.0,"people":[],"focus":[]},
                {"t":0.0,"people":[],"focus":[]},
                {"t":0.5,"people":[],"focus":[]}
            ]}"#,
        )
        .unwrap();
        assert_eq!(doc.key_kind, FrameKeyKind::Time);
        let keys: Vec<f64> = doc.frames.iter().map(|f| f.key).collect();
        assert_eq!(keys, vec![0.0, 0.5, 1.0]);
        assert_eq!(doc.skeleton_pairs, vec![[0, 1]]);
    }

    #[test]
    fn duplicate_keys_keep_file_order() {
        let doc = parse(
            r#"{"schema":"v1","frames":[
                {"t":1.0,"people":[{"id":"late","keypoints":[]}]},
                {"t":0.0},
                {"t":1.0,"people":[{"id":"later","keypoints":[]}]}
            ]}"#,
        )
        .unwrap();
        assert_eq!(doc.frames[1].people[0].id, "late");
        assert_eq!(doc.frames[2].people[0].id, "later");
    }

    #[test]
    fn frame_keyed_documents_convert_through_fps() {
        let doc = parse(r#"{"schema":"v1","fps":25,"frames":[{"f":10},{"f":0}]}"#).unwrap();
        assert_eq!(doc.key_kind, FrameKeyKind::Index);
        assert_eq!(doc.frames[0].key, 0.0);
        assert_eq!(doc.query_key(1.0), 25.0);
        assert_eq!(doc.query_key(0.039), 0.0);
        assert_eq!(doc.key_to_secs(50.0), 2.0);
    }

    #[test]
    fn frame_keyed_without_fps_uses_default() {
        let doc = parse(r#"{"schema":"v1","frames":[{"f":3}]}"#).unwrap();
        assert_eq!(doc.query_key(1.0), DEFAULT_FPS);
    }

    #[test]
    fn query_key_sanitizes_bad_times() {
        let doc = parse(r#"{"schema":"v1","frames":[]}"#).unwrap();
        assert_eq!(doc.query_key(-4.0), 0.0);
        assert_eq!(doc.query_key(f64::NAN), 0.0);
    }

    #[test]
    fn rejects_other_schemas_and_bad_fps() {
        assert!(parse(r#"{"schema":"v2","frames":[]}"#).is_err());
        assert!(parse(r#"{"schema":"v1","fps":0,"frames":[]}"#).is_err());
        assert!(parse(r#"{"schema":"v1","fps":-3,"frames":[]}"#).is_err());
    }

    #[test]
    fn rejects_mixed_or_keyless_frames() {
        assert!(parse(r#"{"schema":"v1","frames":[{"t":0.0},{"f":3}]}"#).is_err());
        assert!(parse(r#"{"schema":"v1","frames":[{"people":[]}]}"#).is_err());
    }

    #[test]
    fn severity_defaults_and_unknown_tags() {
        let doc = parse(
            r#"{"schema":"v1","frames":[{"t":0,"focus":[
                {"label":"a","x":0,"y":0,"w":0.1,"h":0.1},
                {"label":"b","x":0,"y":0,"w":0.1,"h":0.1,"severity":"danger"},
                {"label":"c","x":0,"y":0,"w":0.1,"h":0.1,"severity":"critical"}
            ]}]}"#,
        )
        .unwrap();
        let sev: Vec<Severity> = doc.frames[0].focus.iter().map(|b| b.severity).collect();
        assert_eq!(sev, vec![Severity::Info, Severity::Danger, Severity::Info]);
    }

    #[test]
    fn serializes_back_to_wire_form() {
        let doc = parse(r#"{"schema":"v1","fps":30,"frames":[{"f":2,"people":[]}]}"#).unwrap();
        let v: serde_json::Value = serde_json::from_str(&doc.to_json_pretty().unwrap()).unwrap();
        assert_eq!(v["schema"], "v1");
        assert_eq!(v["frames"][0]["f"], 2);
        assert!(v["frames"][0].get("t").is_none());
    }

    #[test]
    fn keypoint_visibility() {
        let kp = |c| Keypoint { x: 0.5, y: 0.5, c };
        assert!(kp(None).is_visible());
        assert!(kp(Some(0.2)).is_visible());
        assert!(!kp(Some(0.19)).is_visible());
        assert!(
            !Keypoint {
                x: f64::NAN,
                y: 0.5,
                c: None
            }
            .is_visible()
        );
    }
}
