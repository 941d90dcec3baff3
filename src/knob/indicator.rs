//! Knob indicator geometry

use super::Point;

/// Where the sweep starts, in screen degrees (0 = +x, clockwise because y grows down)
pub const START_ANGLE_DEGREES: f64 = 270.0;

/// Degrees covered by the full range; the remaining gap is the visual end stop
pub const SWEEP_DEGREES: f64 = 352.0;

/// Indicator line from the knob centre to `tip`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Indicator {
    /// Drawing angle in degrees, 0-360
    pub angle_degrees: f64,
    pub center: Point,
    pub tip: Point,
    /// Radius of the knob body ring
    pub ring_radius: f64,
}

impl Indicator {
    /// Geometry for a value at `fraction` (0.0-1.0) of the range
    pub fn new(fraction: f64, size: f64) -> Self {
        let angle_degrees = (START_ANGLE_DEGREES + fraction * SWEEP_DEGREES) % 360.0;
        let length = (size - 20.0) / 3.0;
        let theta = angle_degrees.to_radians();
        let center = Point::new(size / 2.0, size / 2.0);

        Self {
            angle_degrees,
            center,
            tip: Point::new(
                center.x + theta.cos() * length,
                center.y + theta.sin() * length,
            ),
            ring_radius: (size - 10.0) / 6.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knob::{ControlRange, RotaryKnob};

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_minimum_points_up() {
        let ind = Indicator::new(0.0, 80.0);
        assert_eq!(ind.angle_degrees, 270.0);
        assert!(close(ind.tip.x, 40.0));
        assert!(close(ind.tip.y, 40.0 - 20.0));
    }

    #[test]
    fn test_maximum_stops_short_of_full_turn() {
        let ind = Indicator::new(1.0, 100.0);
        assert!(close(ind.angle_degrees, 262.0));
    }

    #[test]
    fn test_render_is_pure() {
        let knob = RotaryKnob::new(ControlRange::new(0.0, 21000.0, 10.0).unwrap());
        let a = knob.render(10500.0, 80.0);
        let b = knob.render(10500.0, 80.0);
        assert_eq!(a, b);
        assert!(close(a.angle_degrees, (270.0 + 176.0) % 360.0));
    }

    #[test]
    fn test_render_clamps_out_of_range_values() {
        let knob = RotaryKnob::new(ControlRange::new(0.0, 100.0, 1.0).unwrap());
        assert_eq!(knob.render(-20.0, 80.0), knob.render(0.0, 80.0));
        assert_eq!(knob.render(f64::NAN, 80.0), knob.render(0.0, 80.0));
    }
}
