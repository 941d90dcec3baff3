//! Readouts shown under each knob

/// How a physical value is printed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueFormat {
    /// `x.xx Hz`, or `x.xx kHz` from 1000 Hz up
    Frequency,
    /// N significant digits (gain)
    Significant(usize),
    /// N decimals
    Fixed(usize),
    /// Rounded whole number
    Integer,
}

impl ValueFormat {
    pub fn format(self, value: f64) -> String {
        if !value.is_finite() {
            return value.to_string();
        }
        match self {
            ValueFormat::Frequency => format_frequency(value),
            ValueFormat::Significant(digits) => to_precision(value, digits.max(1)),
            ValueFormat::Fixed(decimals) => format!("{:.*}", decimals, value),
            ValueFormat::Integer => format!("{}", value.round() as i64),
        }
    }
}

pub fn format_frequency(hz: f64) -> String {
    if hz >= 1000.0 {
        format!("{:.2} kHz", hz / 1000.0)
    } else {
        format!("{:.2} Hz", hz)
    }
}

/// `digits` significant digits; exponent notation outside 1e-6..1e`digits`
fn to_precision(value: f64, digits: usize) -> String {
    if value == 0.0 {
        return format!("{:.*}", digits - 1, 0.0);
    }
    // Let the formatter do the rounding, then read back the exponent
    let sci = format!("{:.*e}", digits - 1, value);
    let Some((mantissa, exp)) = sci.split_once('e') else {
        return sci;
    };
    let exp: i32 = exp.parse().unwrap_or(0);
    if exp < -6 || exp >= digits as i32 {
        let sign = if exp >= 0 { "+" } else { "" };
        format!("{}e{}{}", mantissa, sign, exp)
    } else {
        let decimals = (digits as i32 - 1 - exp).max(0) as usize;
        format!("{:.*}", decimals, value)
    }
}
