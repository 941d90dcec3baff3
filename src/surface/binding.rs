//! Knob ↔ group field binding
//!
//! Connects a [`RotaryKnob`] (control units) through a [`ScaleTransform`] to
//! one numeric field of a parameter group (physical units). Emitted control
//! values become edits on the group's engine.

use super::format::ValueFormat;
use crate::knob::{ControlRange, GestureMode, Indicator, Point, RotaryKnob, START_ANGLE_DEGREES, SWEEP_DEGREES};
use crate::scale::{DomainError, IdentityScale, LinearScale, LogScale, ScaleTransform};
use crate::sync::{GroupHandle, ParamValue, ParameterGroup};
use std::fmt;

/// Edge length of a standard knob, in pixels
pub const DEFAULT_KNOB_SIZE: f64 = 80.0;

pub struct KnobBinding<G: ParameterGroup> {
    pub field: G::Field,
    pub label: &'static str,
    /// Widget edge length in pixels
    pub size: f64,
    knob: RotaryKnob,
    scale: Box<dyn ScaleTransform>,
    format: ValueFormat,
}

impl<G: ParameterGroup> fmt::Debug for KnobBinding<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KnobBinding")
            .field("field", &self.field)
            .field("label", &self.label)
            .field("range", self.knob.range())
            .field("scale", &self.scale)
            .finish()
    }
}

impl<G: ParameterGroup> KnobBinding<G> {
    pub fn new(
        field: G::Field,
        label: &'static str,
        range: ControlRange,
        scale: Box<dyn ScaleTransform>,
        format: ValueFormat,
    ) -> Self {
        Self {
            field,
            label,
            size: DEFAULT_KNOB_SIZE,
            knob: RotaryKnob::new(range),
            scale,
            format,
        }
    }

    /// Control units are physical units
    pub fn direct(
        field: G::Field,
        label: &'static str,
        (min, max, step): (f64, f64, f64),
        format: ValueFormat,
    ) -> Result<Self, DomainError> {
        Ok(Self::new(
            field,
            label,
            ControlRange::new(min, max, step)?,
            Box::new(IdentityScale),
            format,
        ))
    }

    /// Integer knob `0..=control_max` over a linear physical range
    pub fn linear(
        field: G::Field,
        label: &'static str,
        control_max: f64,
        (physical_min, physical_max): (f64, f64),
        format: ValueFormat,
    ) -> Result<Self, DomainError> {
        Ok(Self::new(
            field,
            label,
            ControlRange::new(0.0, control_max, 1.0)?,
            Box::new(LinearScale::new(0.0, control_max, physical_min, physical_max)?),
            format,
        ))
    }

    /// 0-100 knob over a logarithmic physical range
    pub fn logarithmic(
        field: G::Field,
        label: &'static str,
        (physical_min, physical_max): (f64, f64),
        format: ValueFormat,
    ) -> Result<Self, DomainError> {
        Ok(Self::new(
            field,
            label,
            ControlRange::new(0.0, 100.0, 1.0)?,
            Box::new(LogScale::percent(physical_min, physical_max)?),
            format,
        ))
    }

    pub fn with_size(mut self, size: f64) -> Self {
        self.size = size;
        self
    }

    pub fn with_mode(mut self, mode: GestureMode) -> Self {
        self.knob.set_mode(mode);
        self
    }

    pub fn range(&self) -> &ControlRange {
        self.knob.range()
    }

    pub fn is_dragging(&self) -> bool {
        self.knob.is_dragging()
    }

    /// Physical value of the bound field in `snapshot`
    pub fn physical(&self, snapshot: &G) -> f64 {
        snapshot.get(self.field).as_number().unwrap_or(f64::NAN)
    }

    /// Knob position for `snapshot`
    pub fn control(&self, snapshot: &G) -> f64 {
        self.scale.to_control(self.physical(snapshot))
    }

    pub fn begin(&mut self, pointer: Point, snapshot: &G) {
        let current = self.control(snapshot);
        self.knob.on_gesture_start(pointer, current);
    }

    /// Forward a pointer move; returns the physical value sent as an edit
    pub fn drag(&mut self, pointer: Point, handle: &GroupHandle<G>) -> Option<f64> {
        let control = self.knob.on_gesture_move(pointer)?;
        let physical = self.scale.to_physical(control);
        handle.apply_edit(self.field, ParamValue::Number(physical));
        Some(physical)
    }

    pub fn end(&mut self) {
        self.knob.on_gesture_end();
    }

    /// Pointer path for a drag of `dy` pixels, up being positive
    ///
    /// Vertical knobs move straight up from the centre. Angular knobs start on
    /// the ring at the current position and turn clockwise by `dy` out of
    /// `sweep_px` pixels per full sweep, stopping at the end stops.
    pub fn drag_path(&self, snapshot: &G, dy: f64, sweep_px: f64) -> (Point, Point) {
        match self.knob.mode() {
            GestureMode::Vertical { .. } => {
                let center = Point::new(self.size / 2.0, self.size / 2.0);
                (center, Point::new(center.x, center.y - dy))
            }
            GestureMode::Angular { center } => {
                let radius = self.size / 2.0;
                let on_ring = |sweep: f64| {
                    let theta = (START_ANGLE_DEGREES + sweep).to_radians();
                    Point::new(center.x + theta.cos() * radius, center.y + theta.sin() * radius)
                };
                let from = self.range().fraction(self.control(snapshot)) * SWEEP_DEGREES;
                let to = (from + dy / sweep_px * SWEEP_DEGREES).clamp(0.0, SWEEP_DEGREES);
                (on_ring(from), on_ring(to))
            }
        }
    }

    /// Move by whole steps; returns the physical value sent, if it changed
    pub fn step(&self, snapshot: &G, steps: i32, handle: &GroupHandle<G>) -> Option<f64> {
        let current = self.control(snapshot);
        let next = self.knob.nudge(current, steps);
        if next == current {
            return None;
        }
        let physical = self.scale.to_physical(next);
        handle.apply_edit(self.field, ParamValue::Number(physical));
        Some(physical)
    }

    pub fn indicator(&self, snapshot: &G) -> Indicator {
        self.knob.render(self.control(snapshot), self.size)
    }

    pub fn display(&self, snapshot: &G) -> String {
        self.format.format(self.physical(snapshot))
    }
}
