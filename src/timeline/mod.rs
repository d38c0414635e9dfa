//! Playback time to overlay frame: clock, locator and interpolator.

pub mod clock;
pub mod interp;
pub mod locate;
