//! Planar Geometry
//!
//! Positions on the star map and the distance/bearing helpers shared by the
//! router, the ship state machine and the replica.

use std::fmt;
use serde::{Serialize, Deserialize};

use super::angle::{Centi, degrees, wrap_angle};

/// A point on the star map.
#[derive(Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    /// X coordinate (map units)
    pub x: f64,
    /// Y coordinate (map units)
    pub y: f64,
}

impl Point {
    /// Origin
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    /// Create a new point.
    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    #[inline]
    pub fn distance(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Direction from `self` towards `other` in degrees, `[0, 360)`.
    #[inline]
    pub fn angle_to(self, other: Self) -> f64 {
        let deg = (other.y - self.y).atan2(other.x - self.x).to_degrees();
        (deg + 360.0) % 360.0
    }

    /// Direction from `self` towards `other`, rounded to whole degrees.
    ///
    /// Ships align to whole-degree bearings before departing.
    #[inline]
    pub fn bearing_to(self, other: Self) -> Centi {
        wrap_angle(degrees(self.angle_to(other).round() as i32))
    }
}

impl fmt::Debug for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2})", self.x, self.y)
    }
}

/// Gap between the surfaces of two round bodies.
#[inline]
pub fn surface_distance(a: Point, a_radius: f64, b: Point, b_radius: f64) -> f64 {
    a.distance(b) - a_radius - b_radius
}

/// Distance a ship actually flies between two bodies.
///
/// The ship leaves from its orbit around `a` and stops at the same orbit
/// around `b`, so twice the orbit radius is taken off the surface gap.
#[inline]
pub fn orbit_distance(a: Point, a_radius: f64, b: Point, b_radius: f64, orbit: f64) -> f64 {
    surface_distance(a, a_radius, b, b_radius) - orbit * 2.0
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(3.0, 4.0);
        assert_eq!(a.distance(b), 5.0);
        assert_eq!(b.distance(a), 5.0);
    }

    #[test]
    fn test_angle_to_quadrants() {
        let o = Point::ZERO;
        let close = |a: f64, b: f64| (a - b).abs() < 1e-9;
        assert!(close(o.angle_to(Point::new(10.0, 0.0)), 0.0));
        assert!(close(o.angle_to(Point::new(0.0, 10.0)), 90.0));
        assert!(close(o.angle_to(Point::new(-10.0, 0.0)), 180.0));
        assert!(close(o.angle_to(Point::new(0.0, -10.0)), 270.0));
    }

    #[test]
    fn test_bearing_rounds_to_whole_degrees() {
        let o = Point::ZERO;
        // atan2(1, 100) ~ 0.57 degrees -> 1
        assert_eq!(o.bearing_to(Point::new(100.0, 1.0)), 100);
        // Just below 360 rounds up and wraps to 0
        assert_eq!(o.bearing_to(Point::new(1000.0, -1.0)), 0);
    }

    #[test]
    fn test_orbit_distance() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(500.0, 0.0);
        assert_eq!(surface_distance(a, 10.0, b, 10.0), 480.0);
        assert_eq!(orbit_distance(a, 10.0, b, 10.0, 5.0), 470.0);
    }
}
