//! Burn-in output sinks.
//!
//! Sinks consume rendered frames in presentation order and are driven by
//! [`crate::session::BurnInSession::render_to_sink`].

/// `ffmpeg`-based sink (MP4 output via system `ffmpeg`).
pub mod ffmpeg;
/// Generic frame sink trait and the in-memory sink.
pub mod sink;
