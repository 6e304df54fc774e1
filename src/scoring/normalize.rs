use super::policy::Range;

/// Value used for missing or non-numeric input.
pub const NEUTRAL: f64 = 0.5;

/// Linear map of `value` from [min, max] onto [0, 1], clamped.
///
/// NaN (missing data) maps to [`NEUTRAL`] so absent inputs bias neither extreme.
/// A degenerate range also yields [`NEUTRAL`].
#[inline]
pub fn normalize(value: f64, min: f64, max: f64) -> f64 {
    if value.is_nan() || !(max > min) {
        return NEUTRAL;
    }
    ((value - min) / (max - min)).clamp(0.0, 1.0)
}

#[inline]
pub fn normalize_in(value: f64, range: Range) -> f64 {
    normalize(value, range.min, range.max)
}
