use std::sync::Arc;
use std::time::Duration;

use crate::foundation::core::{VideoSize, Viewport};
use crate::foundation::error::OverlayResult;
use crate::overlay::cache::OverlayCache;
use crate::overlay::loader::{LoadResult, OverlaySource, PendingOverlay, spawn_fetch};
use crate::overlay::model::OverlayDocument;
use crate::render::cpu::{BackgroundFrame, CpuOverlayRenderer};
use crate::render::frame::FrameRGBA;
use crate::render::plan::plan_overlay;
use crate::render::style::OverlayStyle;
use crate::render::text::{LabelFontSource, resolve_label_font};
use crate::render::viewport::{ContentMapper, content_rect};
use crate::timeline::clock::PlaybackClock;
use crate::timeline::interp::resolve_frame;

/// Construction options for [`OverlayPlayer`].
#[derive(Clone, Debug)]
pub struct PlayerOpts {
    /// Blend between bracketing frames instead of holding the floor frame.
    pub interpolate: bool,
    pub style: OverlayStyle,
    /// Initial drawing surface size.
    pub viewport: Viewport,
    pub label_font: LabelFontSource,
    /// Share loaded documents between players.
    pub cache: Option<Arc<OverlayCache>>,
}

impl Default for PlayerOpts {
    fn default() -> Self {
        Self {
            interpolate: true,
            style: OverlayStyle::default(),
            viewport: Viewport::new(640, 360),
            label_font: LabelFontSource::Auto,
            cache: None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayerState {
    /// Video metadata or the overlay fetch is still outstanding.
    AwaitingData,
    Active,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    AwaitingData,
    Drawn(FrameRGBA),
}

/// Draws a pose overlay in sync with an externally driven video.
///
/// The host calls [`OverlayPlayer::tick`] once per display frame. A document load runs on a
/// background thread; a newer source, [`OverlayPlayer::close`] or drop supersedes it, and late
/// results from superseded loads are discarded.
pub struct OverlayPlayer {
    interpolate: bool,
    style: OverlayStyle,
    viewport: Viewport,
    cache: Option<Arc<OverlayCache>>,
    renderer: CpuOverlayRenderer,

    video: Option<VideoSize>,
    generation: u64,
    pending: Option<PendingOverlay>,
    resolved: bool,
    document: Option<Arc<OverlayDocument>>,
    closed: bool,
}

impl std::fmt::Debug for OverlayPlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverlayPlayer")
            .field("state", &self.state())
            .field("generation", &self.generation)
            .field("viewport", &self.viewport)
            .field("video", &self.video)
            .field("has_document", &self.document.is_some())
            .finish()
    }
}

impl OverlayPlayer {
    pub fn new(opts: PlayerOpts) -> Self {
        let font = match resolve_label_font(&opts.label_font) {
            Ok(font) => font,
            Err(e) => {
                tracing::warn!(error = %e, "label font unavailable; labels render without text");
                None
            }
        };
        Self {
            interpolate: opts.interpolate,
            style: opts.style.sanitized(),
            viewport: opts.viewport,
            cache: opts.cache,
            renderer: CpuOverlayRenderer::new(font.as_ref()),
            video: None,
            generation: 0,
            pending: None,
            resolved: true,
            document: None,
            closed: false,
        }
    }

    /// Replace the overlay source. Any in-flight load is cancelled and the held document is
    /// dropped immediately; `None` resolves to an empty overlay.
    pub fn set_overlay_src(&mut self, source: Option<OverlaySource>) {
        self.supersede();
        self.closed = false;
        match source {
            None => {
                self.resolved = true;
                tracing::debug!(generation = self.generation, "overlay source cleared");
            }
            Some(source) => {
                tracing::debug!(generation = self.generation, source = %source, "overlay fetch started");
                self.resolved = false;
                self.pending = Some(spawn_fetch(source, self.generation, self.cache.clone()));
            }
        }
    }

    /// Install an already loaded document, superseding any in-flight fetch.
    pub fn set_document(&mut self, document: Option<OverlayDocument>) {
        self.supersede();
        self.closed = false;
        self.document = document.map(Arc::new);
        self.resolved = true;
    }

    /// Video metadata is known; the overlay can map into its content rect.
    pub fn on_video_loaded(&mut self, video: VideoSize) {
        tracing::debug!(width = video.width, height = video.height, "video loaded");
        self.video = Some(video);
    }

    pub fn resize(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn style(&self) -> &OverlayStyle {
        &self.style
    }

    pub fn style_mut(&mut self) -> &mut OverlayStyle {
        &mut self.style
    }

    pub fn set_style(&mut self, style: OverlayStyle) {
        self.style = style.sanitized();
    }

    pub fn set_interpolate(&mut self, interpolate: bool) {
        self.interpolate = interpolate;
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn document(&self) -> Option<&Arc<OverlayDocument>> {
        self.document.as_ref()
    }

    pub fn state(&self) -> PlayerState {
        if !self.closed && self.video.is_some() && self.resolved {
            PlayerState::Active
        } else {
            PlayerState::AwaitingData
        }
    }

    /// Take a finished load, if any.
    pub fn poll(&mut self) {
        let Some(result) = self.pending.as_ref().and_then(|p| p.try_take()) else {
            return;
        };
        self.accept(result);
    }

    /// Block until the current load resolves or `timeout` elapses. Returns whether it resolved.
    pub fn wait_for_overlay(&mut self, timeout: Duration) -> bool {
        if let Some(result) = self.pending.as_ref().and_then(|p| p.wait(timeout)) {
            self.accept(result);
        }
        self.resolved
    }

    /// One display frame: clear, resolve the frame at the clock's position, map, draw.
    pub fn tick(&mut self, clock: &dyn PlaybackClock) -> OverlayResult<TickOutcome> {
        self.poll();
        if self.state() != PlayerState::Active {
            return Ok(TickOutcome::AwaitingData);
        }
        let (frame, _) = self.draw(clock.current_time_secs(), None)?;
        Ok(TickOutcome::Drawn(frame))
    }

    /// Draw the overlay at `seconds` regardless of state, optionally over a video picture.
    ///
    /// Without video metadata the viewport itself is treated as the video.
    pub fn render_at(
        &mut self,
        seconds: f64,
        background: Option<BackgroundFrame<'_>>,
    ) -> OverlayResult<FrameRGBA> {
        self.poll();
        self.draw(seconds, background).map(|(frame, _)| frame)
    }

    /// Like [`Self::render_at`], also reporting how many draw ops were issued.
    pub(crate) fn render_counted(
        &mut self,
        seconds: f64,
        background: Option<BackgroundFrame<'_>>,
    ) -> OverlayResult<(FrameRGBA, usize)> {
        self.draw(seconds, background)
    }

    /// Cancel any load and drop the document. Subsequent ticks report `AwaitingData`.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.supersede();
        self.resolved = false;
        self.closed = true;
    }

    fn supersede(&mut self) {
        self.generation += 1;
        if let Some(pending) = self.pending.take() {
            pending.cancel();
        }
        self.document = None;
    }

    fn accept(&mut self, result: LoadResult) {
        if result.generation != self.generation || self.closed {
            tracing::debug!(
                got = result.generation,
                current = self.generation,
                "stale overlay load dropped"
            );
            return;
        }
        tracing::debug!(
            generation = result.generation,
            loaded = result.document.is_some(),
            "overlay resolved"
        );
        self.document = result.document;
        self.resolved = true;
        self.pending = None;
    }

    fn draw(
        &mut self,
        seconds: f64,
        background: Option<BackgroundFrame<'_>>,
    ) -> OverlayResult<(FrameRGBA, usize)> {
        let viewport = self.viewport;
        let video = self
            .video
            .unwrap_or(VideoSize::new(viewport.width, viewport.height));
        let content = content_rect(viewport, video);

        let style = self.style.clone().sanitized();
        let doc = self.document.clone();
        let ops = match doc.as_deref() {
            Some(doc) => match resolve_frame(doc, seconds, self.interpolate) {
                Some(frame) => {
                    let mapper = ContentMapper::new(viewport, video);
                    let mut measure = self.renderer.measure();
                    plan_overlay(doc, &frame, &mapper, viewport, &style, &mut measure)
                }
                None => Vec::new(),
            },
            None => Vec::new(),
        };

        let frame = self.renderer.render(
            &ops,
            viewport,
            style.opacity,
            background.map(|bg| (bg, content)),
        )?;
        Ok((frame, ops.len()))
    }
}

impl Drop for OverlayPlayer {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::model::{FrameKeyKind, Keypoint, OverlayFrame, Person};

    fn opts() -> PlayerOpts {
        PlayerOpts {
            viewport: Viewport::new(64, 64),
            label_font: LabelFontSource::Disabled,
            ..PlayerOpts::default()
        }
    }

    fn one_point_doc() -> OverlayDocument {
        OverlayDocument {
            fps: None,
            key_kind: FrameKeyKind::Time,
            skeleton_pairs: vec![],
            frames: vec![OverlayFrame {
                key: 0.0,
                people: vec![Person {
                    id: "a".to_owned(),
                    keypoints: vec![Keypoint {
                        x: 0.5,
                        y: 0.5,
                        c: Some(0.9),
                    }],
                }],
                focus: vec![],
            }],
        }
    }

    #[test]
    fn waits_for_video_metadata() {
        let mut p = OverlayPlayer::new(opts());
        assert_eq!(p.state(), PlayerState::AwaitingData);
        assert_eq!(p.tick(&0.0).unwrap(), TickOutcome::AwaitingData);

        p.on_video_loaded(VideoSize::new(64, 64));
        assert_eq!(p.state(), PlayerState::Active);
        let TickOutcome::Drawn(frame) = p.tick(&0.0).unwrap() else {
            panic!("expected a drawn frame");
        };
        assert!(frame.is_fully_transparent());
    }

    #[test]
    fn style_changes_apply_on_next_tick() {
        let mut p = OverlayPlayer::new(opts());
        p.on_video_loaded(VideoSize::new(64, 64));
        p.set_document(Some(one_point_doc()));

        let TickOutcome::Drawn(shown) = p.tick(&0.0).unwrap() else {
            panic!("expected a drawn frame");
        };
        assert_eq!(shown.pixel(32, 32).unwrap()[3], 255);

        p.style_mut().show_keypoints = false;
        let TickOutcome::Drawn(hidden) = p.tick(&0.0).unwrap() else {
            panic!("expected a drawn frame");
        };
        assert!(hidden.is_fully_transparent());
    }

    #[test]
    fn out_of_range_style_edits_are_sanitized_at_draw() {
        let mut p = OverlayPlayer::new(opts());
        p.on_video_loaded(VideoSize::new(64, 64));
        p.set_document(Some(one_point_doc()));

        p.style_mut().opacity = 5.0;
        p.style_mut().dot_radius = -1.0;
        let TickOutcome::Drawn(frame) = p.tick(&0.0).unwrap() else {
            panic!("expected a drawn frame");
        };
        // Drawn at full opacity with the default 5px radius.
        assert_eq!(frame.pixel(32, 32).unwrap()[3], 255);
        assert_eq!(frame.pixel(35, 32).unwrap()[3], 255);
        assert_eq!(frame.pixel(42, 32).unwrap()[3], 0);

        p.style_mut().opacity = f64::NAN;
        let TickOutcome::Drawn(frame) = p.tick(&0.0).unwrap() else {
            panic!("expected a drawn frame");
        };
        assert_eq!(frame.pixel(32, 32).unwrap()[3], 255);
    }

    #[test]
    fn stale_generation_results_are_dropped() {
        let mut p = OverlayPlayer::new(opts());
        p.on_video_loaded(VideoSize::new(64, 64));
        p.set_overlay_src(Some(OverlaySource::parse("target/posemark-never-read.json")));
        let stale = p.generation();
        p.set_overlay_src(Some(OverlaySource::parse("target/posemark-never-read-2.json")));

        p.accept(LoadResult {
            generation: stale,
            document: Some(Arc::new(one_point_doc())),
        });
        assert!(p.document().is_none());
        assert_eq!(p.state(), PlayerState::AwaitingData);
    }

    #[test]
    fn close_cancels_and_blocks_drawing() {
        let mut p = OverlayPlayer::new(opts());
        p.on_video_loaded(VideoSize::new(64, 64));
        p.set_document(Some(one_point_doc()));
        p.close();
        assert!(p.document().is_none());
        assert_eq!(p.tick(&0.0).unwrap(), TickOutcome::AwaitingData);
    }

    #[test]
    fn resize_changes_output_dimensions() {
        let mut p = OverlayPlayer::new(opts());
        p.on_video_loaded(VideoSize::new(64, 64));
        p.resize(Viewport::new(0, 20));
        let TickOutcome::Drawn(frame) = p.tick(&0.0).unwrap() else {
            panic!("expected a drawn frame");
        };
        assert_eq!((frame.width, frame.height), (1, 20));
    }
}
