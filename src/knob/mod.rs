//! Rotary input transducer
//!
//! Turns a pointer gesture into a bounded, quantized control value.
//!
//! ## Gesture model
//!
//! - **Vertical** (default): the value follows the pointer's vertical
//!   displacement from where the gesture started. Upward drag increases the
//!   value; `sensitivity_px` pixels cover the full range. The mapping is
//!   anchored to the gesture start, so it never drifts with event rate.
//! - **Angular**: the value follows the pointer's angle around the knob
//!   centre, absolutely, over the same sweep the indicator draws.
//!
//! State machine: `Idle --start--> Dragging --move--> Dragging --end--> Idle`.
//! Move and end events while idle are stale and silently ignored.

mod indicator;

pub use indicator::{Indicator, START_ANGLE_DEGREES, SWEEP_DEGREES};

use crate::scale::{check_range, DomainError};
use tracing::trace;

/// Default drag distance for a full sweep
pub const DEFAULT_SENSITIVITY_PX: f64 = 200.0;

/// Pointer position in host coordinates (y grows downward)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// `{min, max, step}` in control units
///
/// `max - min` need not be a multiple of `step`; the last step before `max`
/// may then be shorter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlRange {
    min: f64,
    max: f64,
    step: f64,
    /// Decimal places of `min` and `step`, used to strip float noise
    decimals: i32,
}

impl ControlRange {
    pub fn new(min: f64, max: f64, step: f64) -> Result<Self, DomainError> {
        check_range("control", min, max)?;
        if !step.is_finite() || step <= 0.0 {
            return Err(DomainError::InvalidStep(step));
        }
        Ok(Self {
            min,
            max,
            step,
            decimals: decimal_places(step).max(decimal_places(min)),
        })
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    /// Snap to the nearest multiple of `step` from `min`, then clamp
    pub fn quantize(&self, raw: f64) -> f64 {
        let steps = ((raw - self.min) / self.step).round();
        let snapped = self.min + steps * self.step;
        let scale = 10f64.powi(self.decimals);
        let tidy = if snapped.is_finite() {
            (snapped * scale).round() / scale
        } else {
            snapped
        };
        tidy.clamp(self.min, self.max)
    }

    /// Position of `value` within the range, 0.0-1.0
    pub fn fraction(&self, value: f64) -> f64 {
        if value.is_nan() {
            return 0.0;
        }
        ((value - self.min) / self.span()).clamp(0.0, 1.0)
    }

    fn sanitize(&self, value: f64) -> f64 {
        if value.is_nan() {
            self.min
        } else {
            value.clamp(self.min, self.max)
        }
    }
}

fn decimal_places(x: f64) -> i32 {
    let mut places = 0;
    let mut scaled = x.abs();
    while places < 9 && (scaled - scaled.round()).abs() > 1e-9 * scaled.max(1.0) {
        scaled *= 10.0;
        places += 1;
    }
    places
}

/// How pointer motion maps to value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureMode {
    /// Relative to the gesture start; `sensitivity_px` pixels per full range
    Vertical { sensitivity_px: f64 },
    /// Absolute; pointer angle around `center`
    Angular { center: Point },
}

impl GestureMode {
    pub fn vertical(sensitivity_px: f64) -> Self {
        let sensitivity_px = if sensitivity_px.is_finite() && sensitivity_px >= 1.0 {
            sensitivity_px
        } else {
            DEFAULT_SENSITIVITY_PX
        };
        GestureMode::Vertical { sensitivity_px }
    }
}

impl Default for GestureMode {
    fn default() -> Self {
        GestureMode::Vertical {
            sensitivity_px: DEFAULT_SENSITIVITY_PX,
        }
    }
}

/// Ephemeral drag state, alive between pointer-down and pointer-up
#[derive(Debug, Clone, Copy)]
struct GestureSession {
    start_pointer: Point,
    start_value: f64,
    last_emitted: f64,
}

/// One knob's gesture transducer
#[derive(Debug, Clone)]
pub struct RotaryKnob {
    range: ControlRange,
    mode: GestureMode,
    session: Option<GestureSession>,
}

impl RotaryKnob {
    pub fn new(range: ControlRange) -> Self {
        Self {
            range,
            mode: GestureMode::default(),
            session: None,
        }
    }

    pub fn with_mode(mut self, mode: GestureMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn range(&self) -> &ControlRange {
        &self.range
    }

    pub fn mode(&self) -> GestureMode {
        self.mode
    }

    /// Move the angular centre (e.g. after the widget was laid out again)
    pub fn set_mode(&mut self, mode: GestureMode) {
        self.mode = mode;
    }

    pub fn is_dragging(&self) -> bool {
        self.session.is_some()
    }

    /// Pointer-down: open a session anchored at `pointer` and `current_value`
    pub fn on_gesture_start(&mut self, pointer: Point, current_value: f64) {
        let start_value = self.range.sanitize(current_value);
        self.session = Some(GestureSession {
            start_pointer: pointer,
            start_value,
            last_emitted: start_value,
        });
    }

    /// Pointer-move: returns the new value when it differs from the last one
    pub fn on_gesture_move(&mut self, pointer: Point) -> Option<f64> {
        let Some(session) = self.session.as_mut() else {
            trace!("Ignoring stale gesture move");
            return None;
        };

        let raw = match self.mode {
            GestureMode::Vertical { sensitivity_px } => {
                let dy = session.start_pointer.y - pointer.y;
                if dy.is_nan() {
                    return None;
                }
                session.start_value + (dy / sensitivity_px) * self.range.span()
            }
            GestureMode::Angular { center } => {
                let fraction = angular_fraction(center, pointer)?;
                self.range.min + fraction * self.range.span()
            }
        };

        let snapped = self.range.quantize(raw);
        if snapped.is_nan() || snapped == session.last_emitted {
            return None;
        }
        session.last_emitted = snapped;
        Some(snapped)
    }

    /// Pointer-up: close the session
    pub fn on_gesture_end(&mut self) {
        if self.session.take().is_none() {
            trace!("Ignoring stale gesture end");
        }
    }

    /// Step the value by whole steps, e.g. from arrow keys
    pub fn nudge(&self, current_value: f64, steps: i32) -> f64 {
        let base = self.range.sanitize(current_value);
        self.range.quantize(base + steps as f64 * self.range.step)
    }

    /// Indicator geometry for `value` on a widget `size` pixels square
    pub fn render(&self, value: f64, size: f64) -> Indicator {
        Indicator::new(self.range.fraction(value), size)
    }
}

/// Fraction of the sweep pointed at, or `None` when the direction is undefined
fn angular_fraction(center: Point, pointer: Point) -> Option<f64> {
    let dx = pointer.x - center.x;
    let dy = pointer.y - center.y;
    if dx.is_nan() || dy.is_nan() || (dx == 0.0 && dy == 0.0) {
        return None;
    }
    let degrees = dy.atan2(dx).to_degrees().rem_euclid(360.0);
    let mut rel = (degrees - START_ANGLE_DEGREES).rem_euclid(360.0);
    if rel > SWEEP_DEGREES {
        // Inside the dead gap: snap to whichever end stop is closer
        rel = if rel - SWEEP_DEGREES < 360.0 - rel {
            SWEEP_DEGREES
        } else {
            0.0
        };
    }
    Some(rel / SWEEP_DEGREES)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn percent_knob() -> RotaryKnob {
        RotaryKnob::new(ControlRange::new(0.0, 100.0, 1.0).unwrap())
    }

    #[test]
    fn test_drag_up_half_sensitivity_hits_max_once() {
        let mut knob = percent_knob();
        knob.on_gesture_start(Point::new(10.0, 300.0), 50.0);

        assert_eq!(knob.on_gesture_move(Point::new(10.0, 200.0)), Some(100.0));
        // Further upward motion stays pinned at max, no repeat event
        assert_eq!(knob.on_gesture_move(Point::new(10.0, 150.0)), None);
        assert_eq!(knob.on_gesture_move(Point::new(10.0, 200.0)), None);
    }

    #[test]
    fn test_drag_is_anchored_to_gesture_start() {
        let mut knob = percent_knob();
        knob.on_gesture_start(Point::new(0.0, 100.0), 20.0);

        assert_eq!(knob.on_gesture_move(Point::new(0.0, 90.0)), Some(25.0));
        assert_eq!(knob.on_gesture_move(Point::new(0.0, 80.0)), Some(30.0));
        // Back to the start position returns the start value, not an accumulation
        assert_eq!(knob.on_gesture_move(Point::new(0.0, 100.0)), Some(20.0));
        assert_eq!(knob.on_gesture_move(Point::new(0.0, 140.0)), Some(0.0));
    }

    #[test]
    fn test_no_event_without_value_change() {
        let mut knob = percent_knob();
        knob.on_gesture_start(Point::new(0.0, 100.0), 40.0);
        // 0.4px is below half a step
        assert_eq!(knob.on_gesture_move(Point::new(0.0, 99.6)), None);
    }

    #[test]
    fn test_stale_events_are_ignored() {
        let mut knob = percent_knob();
        assert_eq!(knob.on_gesture_move(Point::new(0.0, 0.0)), None);
        knob.on_gesture_end();
        assert!(!knob.is_dragging());

        knob.on_gesture_start(Point::new(0.0, 0.0), 10.0);
        assert!(knob.is_dragging());
        knob.on_gesture_end();
        assert_eq!(knob.on_gesture_move(Point::new(0.0, -100.0)), None);
    }

    #[test]
    fn test_non_finite_pointer_never_leaks() {
        let mut knob = percent_knob();
        knob.on_gesture_start(Point::new(0.0, 0.0), 50.0);
        assert_eq!(knob.on_gesture_move(Point::new(0.0, f64::NAN)), None);
        assert_eq!(knob.on_gesture_move(Point::new(0.0, f64::NEG_INFINITY)), Some(100.0));
        assert_eq!(knob.on_gesture_move(Point::new(0.0, f64::INFINITY)), Some(0.0));
    }

    #[test]
    fn test_non_finite_start_value_is_sanitized() {
        let mut knob = percent_knob();
        knob.on_gesture_start(Point::new(0.0, 0.0), f64::NAN);
        assert_eq!(knob.on_gesture_move(Point::new(0.0, -2.0)), Some(1.0));
    }

    #[test]
    fn test_fractional_step_has_no_float_noise() {
        let range = ControlRange::new(0.0, 10.0, 0.1).unwrap();
        let mut knob = RotaryKnob::new(range);
        knob.on_gesture_start(Point::new(0.0, 0.0), 0.0);
        // 6px of 200px over a span of 10 -> 0.3
        assert_eq!(knob.on_gesture_move(Point::new(0.0, -6.0)), Some(0.3));
    }

    #[test]
    fn test_uneven_last_step_clamps_to_max() {
        let range = ControlRange::new(0.0, 25.0, 10.0).unwrap();
        assert_eq!(range.quantize(24.0), 20.0);
        assert_eq!(range.quantize(26.0), 25.0);
        assert_eq!(range.quantize(-7.0), 0.0);
    }

    #[test]
    fn test_step_counts_from_min() {
        let range = ControlRange::new(1.0, 20.0, 2.0).unwrap();
        assert_eq!(range.quantize(4.2), 5.0);
        assert_eq!(range.quantize(1.9), 1.0);
    }

    #[test]
    fn test_invalid_ranges() {
        assert!(ControlRange::new(1.0, 1.0, 1.0).is_err());
        assert!(ControlRange::new(0.0, 1.0, 0.0).is_err());
        assert!(ControlRange::new(0.0, f64::INFINITY, 1.0).is_err());
    }

    #[test]
    fn test_nudge() {
        let knob = RotaryKnob::new(ControlRange::new(0.0, 21000.0, 10.0).unwrap());
        assert_eq!(knob.nudge(100.0, 3), 130.0);
        assert_eq!(knob.nudge(5.0, -1), 0.0);
        assert_eq!(knob.nudge(20995.0, 5), 21000.0);
    }

    #[test]
    fn test_angular_mode_is_absolute() {
        let center = Point::new(50.0, 50.0);
        let mut knob = percent_knob().with_mode(GestureMode::Angular { center });
        knob.on_gesture_start(Point::new(50.0, 0.0), 73.0);

        // Straight up is the start of the sweep
        assert_eq!(knob.on_gesture_move(Point::new(50.0, 0.0)), Some(0.0));
        // Straight down is 180 degrees into the 352 degree sweep
        let expected = (180.0_f64 / 352.0 * 100.0).round();
        assert_eq!(knob.on_gesture_move(Point::new(50.0, 100.0)), Some(expected));
        // Pointer on the centre has no direction
        assert_eq!(knob.on_gesture_move(center), None);
    }

    #[test]
    fn test_angular_gap_snaps_to_nearest_stop() {
        let center = Point::new(0.0, 0.0);
        // 358 degrees past the start: inside the gap, closer to the start
        let theta = (START_ANGLE_DEGREES + 358.0).to_radians();
        let near_start = Point::new(theta.cos(), theta.sin());
        assert_eq!(angular_fraction(center, near_start), Some(0.0));

        let theta = (START_ANGLE_DEGREES + 353.0).to_radians();
        let near_end = Point::new(theta.cos(), theta.sin());
        assert_eq!(angular_fraction(center, near_end), Some(1.0));
    }

    proptest! {
        #[test]
        fn prop_emitted_values_stay_in_range_and_on_step(
            start in -50.0f64..150.0,
            dy in -5000.0f64..5000.0,
            step_idx in 0usize..4,
        ) {
            let (min, max, step) = [(0.0, 100.0, 1.0), (0.0, 21000.0, 10.0), (1.0, 20.0, 1.0), (0.0, 1.0, 0.01)][step_idx];
            let range = ControlRange::new(min, max, step).unwrap();
            let mut knob = RotaryKnob::new(range);
            knob.on_gesture_start(Point::new(0.0, 0.0), start);
            if let Some(v) = knob.on_gesture_move(Point::new(0.0, -dy)) {
                prop_assert!(v >= min && v <= max);
                let steps = (v - min) / step;
                prop_assert!((steps - steps.round()).abs() < 1e-6 || v == max);
            }
        }
    }
}
