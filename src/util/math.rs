//! Small numeric helpers shared by the pipeline stages.

/// Linear blend from `from` toward `to` by `alpha`.
///
/// `alpha = 1` returns `to`, `alpha = 0` returns `from`.
#[inline]
pub(crate) fn lerp(from: f32, to: f32, alpha: f32) -> f32 {
    from * (1.0 - alpha) + to * alpha
}

/// Returns true when `value` is finite and within `[0, 1]`.
#[inline]
pub(crate) fn is_unit(value: f32) -> bool {
    value.is_finite() && (0.0..=1.0).contains(&value)
}

/// Returns true when `value` is finite and strictly positive.
#[inline]
pub(crate) fn is_positive(value: f32) -> bool {
    value.is_finite() && value > 0.0
}

#[cfg(test)]
mod tests {
    use super::{is_positive, is_unit, lerp};

    #[test]
    fn lerp_hits_endpoints_and_midpoint() {
        assert!((lerp(100.0, 110.0, 0.0) - 100.0).abs() < 1e-6);
        assert!((lerp(100.0, 110.0, 1.0) - 110.0).abs() < 1e-6);
        assert!((lerp(100.0, 110.0, 0.7) - 107.0).abs() < 1e-4);
    }

    #[test]
    fn unit_interval_rejects_nan_and_out_of_range() {
        assert!(is_unit(0.0));
        assert!(is_unit(1.0));
        assert!(!is_unit(1.01));
        assert!(!is_unit(-0.1));
        assert!(!is_unit(f32::NAN));
    }

    #[test]
    fn positive_rejects_zero_and_infinity() {
        assert!(is_positive(0.5));
        assert!(!is_positive(0.0));
        assert!(!is_positive(f32::INFINITY));
    }
}
