//! Hundredths Fixed-Point Arithmetic
//!
//! Angles and orbit progress are stored as integer hundredths so that the
//! per-tick angular motion is exact and identical on client and server.
//!
//! ## Format
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Centi: i32, value = units * 100                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Angle 359.99°   ->  35999                                  │
//! │  Angular speed 1.00°/tick -> 100                            │
//! │  Orbit radius 5.0 -> 500                                    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Angular speed is defined as `round(π / size * speed, 2 decimals)`, which is
//! exactly representable here, so accumulated rotation never drifts.

use std::f64::consts::PI;

/// Fixed-point number with two decimal places, stored as i32.
pub type Centi = i32;

/// 1.0 in hundredths
pub const CENTI_ONE: Centi = 100;

/// 360 degrees
pub const FULL_TURN: Centi = 360 * CENTI_ONE;

/// 180 degrees
pub const HALF_TURN: Centi = 180 * CENTI_ONE;

/// Convert a float to hundredths (rounded half away from zero).
#[inline]
pub fn to_centi(f: f64) -> Centi {
    (f * CENTI_ONE as f64).round() as Centi
}

/// Convert hundredths to float for geometry and display.
#[inline]
pub fn to_float(c: Centi) -> f64 {
    c as f64 / CENTI_ONE as f64
}

/// Whole degrees to hundredths.
#[inline]
pub const fn degrees(d: i32) -> Centi {
    d * CENTI_ONE
}

/// Normalize an angle into `[0, 360)`.
#[inline]
pub fn wrap_angle(angle: Centi) -> Centi {
    angle.rem_euclid(FULL_TURN)
}

/// Signed shortest rotation from `from` to `to`, in `(-180, 180]`.
///
/// Positive means `to` lies ahead of `from` in the direction of increasing
/// angle, so a ship rotating with direction `+1` reaches it first.
#[inline]
pub fn angle_difference(from: Centi, to: Centi) -> Centi {
    let d = (to - from).rem_euclid(FULL_TURN);
    if d > HALF_TURN {
        d - FULL_TURN
    } else {
        d
    }
}

/// Magnitude of the shortest rotation between two angles, in `[0, 180]`.
#[inline]
pub fn angle_distance(a: Centi, b: Centi) -> Centi {
    angle_difference(a, b).abs()
}

/// Rotate an angle by half a turn.
#[inline]
pub fn flip(angle: Centi) -> Centi {
    wrap_angle(angle + HALF_TURN)
}

/// Per-tick angular speed around a body of the given radius.
///
/// `π / radius * speed`, rounded to two decimals. Smaller bodies spin ships
/// faster so that the perceived orbital velocity stays constant.
#[inline]
pub fn angular_speed(radius: f64, speed: f64) -> Centi {
    if radius <= 0.0 {
        return 0;
    }
    to_centi(PI / radius * speed)
}

/// `|value| < limit * num / den`, evaluated without rounding.
#[inline]
pub fn within_ratio(value: Centi, limit: Centi, num: i32, den: i32) -> bool {
    (value.abs() as i64) * (den as i64) < (limit as i64) * (num as i64)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_constants() {
        assert_eq!(FULL_TURN, 36000);
        assert_eq!(HALF_TURN, 18000);
        assert_eq!(degrees(90), 9000);
    }

    #[test]
    fn test_wrap_angle() {
        assert_eq!(wrap_angle(36000), 0);
        assert_eq!(wrap_angle(-100), 35900);
        assert_eq!(wrap_angle(72050), 50);
    }

    #[test]
    fn test_angle_difference_signs() {
        assert_eq!(angle_difference(0, 9000), 9000);
        assert_eq!(angle_difference(9000, 0), -9000);
        // Shortest way across zero
        assert_eq!(angle_difference(35900, 100), 200);
        assert_eq!(angle_difference(100, 35900), -200);
        // Opposite angles resolve to +180
        assert_eq!(angle_difference(0, 18000), 18000);
        assert_eq!(angle_difference(18000, 0), 18000);
    }

    #[test]
    fn test_angular_speed_rounding() {
        // π / 10 * (10 / π) = 1.00
        assert_eq!(angular_speed(10.0, 10.0 / PI), 100);
        // π / 20 * 4 = 0.628.. -> 0.63
        assert_eq!(angular_speed(20.0, 4.0), 63);
        assert_eq!(angular_speed(0.0, 4.0), 0);
    }

    #[test]
    fn test_within_ratio() {
        // 74 < 100 * 0.75
        assert!(within_ratio(74, 100, 3, 4));
        assert!(within_ratio(-74, 100, 3, 4));
        assert!(!within_ratio(75, 100, 3, 4));
    }

    #[test]
    fn test_flip() {
        assert_eq!(flip(0), 18000);
        assert_eq!(flip(27000), 9000);
    }

    proptest! {
        #[test]
        fn prop_difference_in_range(a in -100_000i32..100_000, b in -100_000i32..100_000) {
            let d = angle_difference(a, b);
            prop_assert!(d > -HALF_TURN && d <= HALF_TURN);
            prop_assert_eq!(wrap_angle(a + d), wrap_angle(b));
        }

        #[test]
        fn prop_distance_symmetric(a in 0i32..FULL_TURN, b in 0i32..FULL_TURN) {
            prop_assert_eq!(angle_distance(a, b), angle_distance(b, a));
        }
    }
}
