use std::path::Path;

use crate::encode::sink::{FrameSink, SinkConfig};
use crate::foundation::core::Viewport;
use crate::foundation::error::{OverlayError, OverlayResult};
use crate::media::{VideoFrameStream, VideoSourceInfo, probe_video};
use crate::overlay::model::{DEFAULT_FPS, OverlayDocument};
use crate::player::{OverlayPlayer, PlayerOpts};
use crate::render::cpu::BackgroundFrame;
use crate::render::style::OverlayStyle;
use crate::render::text::LabelFontSource;
use crate::timeline::clock::{FrameClock, PlaybackClock};

/// Options for an offline burn-in.
#[derive(Clone, Debug)]
pub struct BurnInOpts {
    /// Output size. Defaults to the source video size; other sizes letterbox the picture.
    pub size: Option<Viewport>,
    pub style: OverlayStyle,
    pub interpolate: bool,
    pub label_font: LabelFontSource,
    /// Stop after this many frames.
    pub max_frames: Option<u64>,
}

impl Default for BurnInOpts {
    fn default() -> Self {
        Self {
            size: None,
            style: OverlayStyle::default(),
            interpolate: true,
            label_font: LabelFontSource::Auto,
            max_frames: None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BurnInStats {
    pub frames: u64,
    /// Frames on which at least one overlay element was drawn.
    pub overlay_frames_drawn: u64,
}

/// Draws an overlay onto every frame of a video file.
///
/// Frame `i` is paired with overlay time `i / fps`, the same position an interactive player would
/// report while presenting that frame.
#[derive(Debug)]
pub struct BurnInSession {
    info: VideoSourceInfo,
    fps: f64,
    viewport: Viewport,
    max_frames: Option<u64>,
    player: OverlayPlayer,
}

impl BurnInSession {
    #[tracing::instrument(skip_all, fields(video = %video_path.display()))]
    pub fn new(
        video_path: &Path,
        overlay: Option<OverlayDocument>,
        opts: BurnInOpts,
    ) -> OverlayResult<Self> {
        let info = probe_video(video_path)?;
        if info.width == 0 || info.height == 0 {
            return Err(OverlayError::validation("source video has zero size"));
        }
        let fps = if info.fps > 0.0 {
            info.fps
        } else {
            tracing::warn!(fallback = DEFAULT_FPS, "video frame rate unknown");
            DEFAULT_FPS
        };
        let viewport = opts.size.unwrap_or(Viewport::from_video(info.size()));

        let mut player = OverlayPlayer::new(PlayerOpts {
            interpolate: opts.interpolate,
            style: opts.style,
            viewport,
            label_font: opts.label_font,
            cache: None,
        });
        player.on_video_loaded(info.size());
        player.set_document(overlay);

        Ok(Self {
            info,
            fps,
            viewport,
            max_frames: opts.max_frames,
            player,
        })
    }

    pub fn info(&self) -> &VideoSourceInfo {
        &self.info
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    pub fn output_size(&self) -> Viewport {
        self.viewport
    }

    /// Decode, draw and push every frame, bracketed by `begin`/`end` on the sink.
    #[tracing::instrument(skip_all, fields(video = %self.info.source_path.display()))]
    pub fn render_to_sink(&mut self, sink: &mut dyn FrameSink) -> OverlayResult<BurnInStats> {
        sink.begin(SinkConfig {
            width: self.viewport.width,
            height: self.viewport.height,
            fps: self.fps,
        })?;

        let mut stream = VideoFrameStream::open(&self.info)?;
        let mut stats = BurnInStats::default();
        while self.max_frames.is_none_or(|max| stats.frames < max) {
            let Some(rgba) = stream.next_frame()? else {
                break;
            };
            let clock = FrameClock {
                fps: self.fps,
                frame: stats.frames,
            };
            let background = BackgroundFrame {
                width: self.info.width,
                height: self.info.height,
                rgba: &rgba,
            };
            let (frame, ops) = self
                .player
                .render_counted(clock.current_time_secs(), Some(background))?;
            sink.push_frame(stats.frames, &frame)?;

            stats.frames += 1;
            if ops > 0 {
                stats.overlay_frames_drawn += 1;
            }
        }
        sink.end()?;

        tracing::info!(
            frames = stats.frames,
            overlay_frames = stats.overlay_frames_drawn,
            "burn-in finished"
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_video_is_an_error() {
        let err = BurnInSession::new(
            Path::new("target/posemark-no-such-video.mp4"),
            None,
            BurnInOpts::default(),
        )
        .unwrap_err();
        assert!(matches!(err, OverlayError::Load(_)));
    }
}
