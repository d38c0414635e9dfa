//! Posemark draws pose-estimation overlays (skeletons, keypoints and labeled focus boxes) in sync
//! with video playback.
//!
//! The public API is player-oriented:
//!
//! - Load an [`OverlayDocument`] from a file or URL (or import one from pose-pipeline output)
//! - Create an [`OverlayPlayer`], tell it the video size and viewport
//! - Call [`OverlayPlayer::tick`] once per display frame with the current playback position
//!
//! [`BurnInSession`] drives the same pipeline offline, drawing onto every frame of a video file
//! and streaming the result into a [`FrameSink`].
#![forbid(unsafe_code)]

mod foundation;

/// Burn-in output sinks.
pub mod encode;
/// Video probing and decoding through the system `ffmpeg`.
pub mod media;
/// Overlay document model, loading, caching and import.
pub mod overlay;
/// Interactive overlay player.
pub mod player;
/// Draw planning and rasterization.
pub mod render;
/// Offline burn-in.
pub mod session;
/// Playback clock, frame location and interpolation.
pub mod timeline;

pub use crate::foundation::core::{Point, Rect, Rgba8, VideoSize, Viewport, parse_size};
pub use crate::foundation::error::{OverlayError, OverlayResult};

pub use crate::encode::ffmpeg::{FfmpegSink, FfmpegSinkOpts};
pub use crate::encode::sink::{FrameSink, InMemorySink, SinkConfig};
pub use crate::media::{VideoSourceInfo, decode_video_frame_rgba8, probe_video};
pub use crate::overlay::cache::OverlayCache;
pub use crate::overlay::import::{ImportOpts, PoseAnnotations, import_pose_annotations};
pub use crate::overlay::loader::{OverlaySource, fetch_overlay, load_document};
pub use crate::overlay::model::{
    FocusBox, FrameKeyKind, Keypoint, OverlayDocument, OverlayFrame, Person, Severity,
};
pub use crate::player::{OverlayPlayer, PlayerOpts, PlayerState, TickOutcome};
pub use crate::render::cpu::BackgroundFrame;
pub use crate::render::frame::FrameRGBA;
pub use crate::render::style::OverlayStyle;
pub use crate::render::text::{LABEL_FONT_ENV, LabelFontSource};
pub use crate::session::{BurnInOpts, BurnInSession, BurnInStats};
pub use crate::timeline::clock::{FrameClock, ManualClock, PlaybackClock};
