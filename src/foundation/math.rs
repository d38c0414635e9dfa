/// Linear blend that reproduces `a` at `alpha == 0` and `b` at `alpha == 1` exactly.
pub fn lerp(a: f64, b: f64, alpha: f64) -> f64 {
    a * (1.0 - alpha) + b * alpha
}

/// `max(lo, min(hi, v))`. Returns `lo` when `hi < lo` instead of panicking like `f64::clamp`.
pub fn clamp_lo(v: f64, lo: f64, hi: f64) -> f64 {
    lo.max(hi.min(v))
}

pub(crate) fn mul_div255_u16(x: u16, y: u16) -> u16 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u16
}
