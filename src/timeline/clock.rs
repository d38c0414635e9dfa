use std::cell::Cell;

/// Source of the current playback position, read once per tick.
///
/// Implementations report the position whether playing, paused or seeking; the renderer never
/// drives playback.
pub trait PlaybackClock {
    fn current_time_secs(&self) -> f64;
}

/// Settable clock standing in for an interactive video element.
#[derive(Debug, Default)]
pub struct ManualClock {
    secs: Cell<f64>,
}

impl ManualClock {
    pub fn new(secs: f64) -> Self {
        Self {
            secs: Cell::new(secs),
        }
    }

    /// Seek.
    pub fn set(&self, secs: f64) {
        self.secs.set(secs);
    }

    pub fn advance(&self, delta_secs: f64) {
        self.secs.set(self.secs.get() + delta_secs);
    }
}

impl PlaybackClock for ManualClock {
    fn current_time_secs(&self) -> f64 {
        self.secs.get()
    }
}

/// Presentation time of decoded frame `frame` at a constant rate.
#[derive(Clone, Copy, Debug)]
pub struct FrameClock {
    pub fps: f64,
    pub frame: u64,
}

impl PlaybackClock for FrameClock {
    fn current_time_secs(&self) -> f64 {
        if self.fps.is_finite() && self.fps > 0.0 {
            self.frame as f64 / self.fps
        } else {
            0.0
        }
    }
}

impl PlaybackClock for f64 {
    fn current_time_secs(&self) -> f64 {
        *self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_seeks_and_advances() {
        let c = ManualClock::new(1.0);
        c.advance(0.5);
        assert_eq!(c.current_time_secs(), 1.5);
        c.set(0.25);
        assert_eq!(c.current_time_secs(), 0.25);
    }

    #[test]
    fn frame_clock_divides_by_rate() {
        let c = FrameClock {
            fps: 25.0,
            frame: 50,
        };
        assert_eq!(c.current_time_secs(), 2.0);
        let bad = FrameClock { fps: 0.0, frame: 9 };
        assert_eq!(bad.current_time_secs(), 0.0);
    }
}
