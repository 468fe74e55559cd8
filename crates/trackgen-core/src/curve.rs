//! Progress shaping curves.
//!
//! Remaps a linear progress value in `0..=range` onto an eased curve so
//! transitions such as roll-in, altitude capture or a turbulence bump do not
//! start and stop abruptly. A slope class is the percentage of the range
//! spent in each exponential ease zone; valid classes are `1..=50`.
//!
//! The ease zone is `A * (e^(k*x) - 1)` with `k * breakpoint` fixed at
//! [`EASE_EXPONENT`], and `A` is chosen so the slope at the breakpoint equals
//! the slope of the linear section that follows it.

/// Product of the exponential rate and the ease-zone width.
pub const EASE_EXPONENT: f64 = 3.0;

/// Largest slope class; at 50 the two ease zones meet in the middle.
pub const MAX_SLOPE_CLASS: u8 = 50;

/// Ease-in, linear middle, ease-out.
///
/// Unknown slope classes and non-positive ranges return `value` unchanged.
pub fn shape(range: f64, value: f64, slope_class: u8) -> f64 {
    let Some(breakpoint) = breakpoint(range, slope_class) else {
        return value;
    };
    let x = value.clamp(0.0, range);
    let half = range / 2.0;
    if x <= half {
        eased(x, breakpoint, half, half)
    } else {
        range - eased(range - x, breakpoint, half, half)
    }
}

/// Ease-in only: slow start, linear finish.
pub fn accelerate(range: f64, value: f64, slope_class: u8) -> f64 {
    let Some(breakpoint) = breakpoint(range, slope_class) else {
        return value;
    };
    eased(value.clamp(0.0, range), breakpoint, range, range)
}

/// Ease-out only: linear start, slow finish.
pub fn decelerate(range: f64, value: f64, slope_class: u8) -> f64 {
    let Some(breakpoint) = breakpoint(range, slope_class) else {
        return value;
    };
    range - eased(range - value.clamp(0.0, range), breakpoint, range, range)
}

/// True for slope classes the shaper knows how to apply.
pub fn is_known_slope(slope_class: u8) -> bool {
    (1..=MAX_SLOPE_CLASS).contains(&slope_class)
}

fn breakpoint(range: f64, slope_class: u8) -> Option<f64> {
    if !is_known_slope(slope_class) || !range.is_finite() || range <= 0.0 {
        return None;
    }
    Some(range * f64::from(slope_class) / 100.0)
}

/// Exponential ease over `[0, breakpoint]`, then linear so that `x == end`
/// maps to `target`.
fn eased(x: f64, breakpoint: f64, end: f64, target: f64) -> f64 {
    let decay = (-EASE_EXPONENT).exp();
    let knee = breakpoint * (1.0 - decay) / EASE_EXPONENT;
    let slope = target / (knee + end - breakpoint);
    if x <= breakpoint {
        slope * (breakpoint / EASE_EXPONENT) * decay * ((EASE_EXPONENT * x / breakpoint).exp() - 1.0)
    } else {
        slope * (knee + x - breakpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_maps_to_zero() {
        for slope in [1, 10, 25, 50] {
            assert_eq!(shape(100.0, 0.0, slope), 0.0);
            assert_eq!(accelerate(100.0, 0.0, slope), 0.0);
            assert!(decelerate(100.0, 0.0, slope).abs() < 1e-12);
        }
    }

    #[test]
    fn full_range_maps_to_range() {
        for slope in [1, 10, 25, 50] {
            assert!((shape(80.0, 80.0, slope) - 80.0).abs() < 1e-9);
            assert!((accelerate(80.0, 80.0, slope) - 80.0).abs() < 1e-9);
            assert!((decelerate(80.0, 80.0, slope) - 80.0).abs() < 1e-9);
        }
    }

    #[test]
    fn unknown_slope_is_identity() {
        assert_eq!(shape(10.0, 3.3, 0), 3.3);
        assert_eq!(shape(10.0, 3.3, 51), 3.3);
        assert_eq!(accelerate(10.0, 7.0, 200), 7.0);
        assert_eq!(decelerate(10.0, 7.0, 99), 7.0);
    }

    #[test]
    fn ease_in_lags_linear_progress() {
        let early = shape(100.0, 5.0, 20);
        assert!(early < 5.0, "ease-in should lag, got {early}");
        let late = shape(100.0, 95.0, 20);
        assert!(late > 95.0, "ease-out should lead, got {late}");
        assert!(accelerate(100.0, 5.0, 20) < 5.0);
        assert!(decelerate(100.0, 95.0, 20) > 95.0);
    }

    #[test]
    fn shape_is_symmetric_about_midpoint() {
        let range = 60.0;
        for value in [3.0, 11.0, 29.0] {
            let lower = shape(range, value, 15);
            let upper = shape(range, range - value, 15);
            assert!((lower + upper - range).abs() < 1e-9);
        }
        assert!((shape(range, 30.0, 15) - 30.0).abs() < 1e-9);
    }

    #[test]
    fn continuous_at_breakpoint() {
        let range = 100.0;
        let b = 25.0;
        let below = shape(range, b - 1e-9, 25);
        let above = shape(range, b + 1e-9, 25);
        assert!((above - below).abs() < 1e-6);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn shape_is_monotonic(
                range in 1.0..10_000.0_f64,
                a in 0.0..1.0_f64,
                b in 0.0..1.0_f64,
                slope in 1u8..=50
            ) {
                let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
                prop_assert!(shape(range, lo * range, slope) <= shape(range, hi * range, slope) + 1e-9);
                prop_assert!(accelerate(range, lo * range, slope) <= accelerate(range, hi * range, slope) + 1e-9);
                prop_assert!(decelerate(range, lo * range, slope) <= decelerate(range, hi * range, slope) + 1e-9);
            }
        }
    }
}
