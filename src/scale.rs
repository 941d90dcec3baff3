//! Value scale transforms
//!
//! A knob always works in *control units* (the integer-ish range its gesture
//! manipulates, e.g. 0-100). A [`ScaleTransform`] maps those onto the
//! *physical units* the synth server expects (gain ratio, seconds, Hz), so one
//! drag sensitivity can cover a parameter spanning several decades as well as
//! a narrow linear band.
//!
//! Every implementation obeys the round-trip law: for any integer `c` inside
//! the control range, `to_control(to_physical(c)) == c`.

use std::fmt;
use thiserror::Error;

/// Invalid scale construction
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DomainError {
    /// Logarithmic scales are undefined at or below zero
    #[error("logarithmic scale requires a positive physical minimum (got {0})")]
    NonPositiveMinimum(f64),

    /// `min >= max`, or a bound is not finite
    #[error("invalid {kind} range [{min}, {max}]")]
    InvalidRange {
        kind: &'static str,
        min: f64,
        max: f64,
    },

    /// Quantization step must be positive and finite
    #[error("invalid step {0}")]
    InvalidStep(f64),
}

/// Bijection between control units and physical units
pub trait ScaleTransform: Send + Sync + fmt::Debug {
    /// Physical value → control value
    fn to_control(&self, physical: f64) -> f64;

    /// Control value → physical value
    fn to_physical(&self, control: f64) -> f64;
}

pub(crate) fn check_range(kind: &'static str, min: f64, max: f64) -> Result<(), DomainError> {
    if !min.is_finite() || !max.is_finite() || min >= max {
        return Err(DomainError::InvalidRange { kind, min, max });
    }
    Ok(())
}

/// Control units are the physical units
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityScale;

impl ScaleTransform for IdentityScale {
    fn to_control(&self, physical: f64) -> f64 {
        physical
    }

    fn to_physical(&self, control: f64) -> f64 {
        control
    }
}

/// Affine map of an integer control range onto a physical range
///
/// Echo feedback, for instance, is a 0-100 knob over a 0.0-1.0 ratio.
#[derive(Debug, Clone, Copy)]
pub struct LinearScale {
    control_min: f64,
    control_max: f64,
    physical_min: f64,
    physical_max: f64,
}

impl LinearScale {
    pub fn new(
        control_min: f64,
        control_max: f64,
        physical_min: f64,
        physical_max: f64,
    ) -> Result<Self, DomainError> {
        check_range("control", control_min, control_max)?;
        check_range("physical", physical_min, physical_max)?;
        Ok(Self {
            control_min,
            control_max,
            physical_min,
            physical_max,
        })
    }

    fn control_span(&self) -> f64 {
        self.control_max - self.control_min
    }

    fn physical_span(&self) -> f64 {
        self.physical_max - self.physical_min
    }
}

impl ScaleTransform for LinearScale {
    fn to_control(&self, physical: f64) -> f64 {
        if physical.is_nan() {
            return self.control_min;
        }
        let ratio = (physical - self.physical_min) / self.physical_span();
        (self.control_min + ratio * self.control_span())
            .round()
            .clamp(self.control_min, self.control_max)
    }

    fn to_physical(&self, control: f64) -> f64 {
        let ratio = (control - self.control_min) / self.control_span();
        self.physical_min + ratio * self.physical_span()
    }
}

/// Logarithmic map, for parameters spanning decades (gain)
///
/// With the usual 0-100 control range this is
/// `round(100 * ln(v / min) / ln(max / min))`.
#[derive(Debug, Clone, Copy)]
pub struct LogScale {
    control_min: f64,
    control_max: f64,
    physical_min: f64,
    /// `ln(max / min)`, cached
    log_ratio: f64,
}

impl LogScale {
    pub fn new(
        control_min: f64,
        control_max: f64,
        physical_min: f64,
        physical_max: f64,
    ) -> Result<Self, DomainError> {
        check_range("control", control_min, control_max)?;
        if physical_min.is_nan() || physical_min <= 0.0 {
            return Err(DomainError::NonPositiveMinimum(physical_min));
        }
        check_range("physical", physical_min, physical_max)?;
        Ok(Self {
            control_min,
            control_max,
            physical_min,
            log_ratio: (physical_max / physical_min).ln(),
        })
    }

    /// Log scale over the default 0-100 knob
    pub fn percent(physical_min: f64, physical_max: f64) -> Result<Self, DomainError> {
        Self::new(0.0, 100.0, physical_min, physical_max)
    }
}

impl ScaleTransform for LogScale {
    fn to_control(&self, physical: f64) -> f64 {
        // ln is undefined at or below zero; such values pin to the bottom
        if physical.is_nan() || physical <= self.physical_min {
            return self.control_min;
        }
        let ratio = (physical / self.physical_min).ln() / self.log_ratio;
        (self.control_min + ratio * (self.control_max - self.control_min))
            .round()
            .clamp(self.control_min, self.control_max)
    }

    fn to_physical(&self, control: f64) -> f64 {
        let ratio = (control - self.control_min) / (self.control_max - self.control_min);
        self.physical_min * (self.log_ratio * ratio).exp()
    }
}
