//! Loop recorder transport settings

use super::{expect_integer, WireFormat};
use crate::sync::{EditError, ParamValue, ParameterGroup};
use serde_json::{json, Map, Value};
use std::fmt;
use std::ops::RangeInclusive;

pub const TRACKS: RangeInclusive<i64> = 1..=4;
pub const BPM_RANGE: RangeInclusive<i64> = 30..=300;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RecorderField {
    Track,
    Bpm,
    Metronome,
    /// Observed only; driven by record/stop actions
    Recording,
}

impl fmt::Display for RecorderField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecorderField::Track => "track",
            RecorderField::Bpm => "bpm",
            RecorderField::Metronome => "metronome",
            RecorderField::Recording => "recording",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecorderTransport {
    pub track: i64,
    pub bpm: i64,
    pub metronome: bool,
    pub recording: bool,
}

impl Default for RecorderTransport {
    fn default() -> Self {
        Self {
            track: 1,
            bpm: 120,
            metronome: false,
            recording: false,
        }
    }
}

fn on_off(on: bool) -> &'static str {
    if on {
        "on"
    } else {
        "off"
    }
}

fn in_range(field: RecorderField, value: &ParamValue, range: RangeInclusive<i64>) -> Result<i64, EditError> {
    let n = expect_integer(field, value)?;
    if !range.contains(&n) {
        return Err(EditError::invalid(field, n));
    }
    Ok(n)
}

impl ParameterGroup for RecorderTransport {
    type Field = RecorderField;

    fn label(&self) -> String {
        "recorder".to_string()
    }

    fn fields() -> &'static [RecorderField] {
        &[
            RecorderField::Track,
            RecorderField::Bpm,
            RecorderField::Metronome,
            RecorderField::Recording,
        ]
    }

    fn get(&self, field: RecorderField) -> ParamValue {
        match field {
            RecorderField::Track => ParamValue::Number(self.track as f64),
            RecorderField::Bpm => ParamValue::Number(self.bpm as f64),
            RecorderField::Metronome => ParamValue::Toggle(self.metronome),
            RecorderField::Recording => ParamValue::Toggle(self.recording),
        }
    }

    fn set(&mut self, field: RecorderField, value: ParamValue) -> Result<(), EditError> {
        match field {
            RecorderField::Track => self.track = in_range(field, &value, TRACKS)?,
            RecorderField::Bpm => self.bpm = in_range(field, &value, BPM_RANGE)?,
            RecorderField::Metronome | RecorderField::Recording => {
                let on = value
                    .as_toggle()
                    .ok_or_else(|| EditError::wrong_kind(field, "toggle", &value))?;
                if field == RecorderField::Metronome {
                    self.metronome = on;
                } else {
                    self.recording = on;
                }
            }
        }
        Ok(())
    }

    fn is_editable(field: RecorderField) -> bool {
        field != RecorderField::Recording
    }
}

impl WireFormat for RecorderTransport {
    fn read_path() -> &'static str {
        "/api/recorder"
    }

    fn write_path() -> &'static str {
        "/api/recorder"
    }

    fn decode(&self, body: &Value) -> Result<Self, String> {
        let defaults = RecorderTransport::default();
        let integer = |key: &str, default: i64| match body.get(key) {
            None | Some(Value::Null) => Ok(default),
            Some(v) => v
                .as_f64()
                .map(|n| n.round() as i64)
                .ok_or_else(|| format!("'{}' is not a number: {}", key, v)),
        };
        let metronome = match body.get("metronome") {
            None | Some(Value::Null) => defaults.metronome,
            Some(Value::String(s)) if s == "on" => true,
            Some(Value::String(s)) if s == "off" => false,
            Some(Value::Bool(b)) => *b,
            Some(v) => return Err(format!("'metronome' must be \"on\" or \"off\": {}", v)),
        };

        Ok(RecorderTransport {
            track: integer("track", defaults.track)?,
            bpm: integer("bpm", defaults.bpm)?,
            metronome,
            recording: body
                .get("recording")
                .and_then(Value::as_bool)
                .unwrap_or(defaults.recording),
        })
    }

    fn encode_patch(&self, changed: &[RecorderField]) -> Value {
        let mut body = Map::new();
        body.insert("action".to_string(), json!("set"));
        for &field in changed {
            let value = match field {
                RecorderField::Track => json!(self.track),
                RecorderField::Bpm => json!(self.bpm),
                RecorderField::Metronome => json!(on_off(self.metronome)),
                RecorderField::Recording => continue,
            };
            body.insert(field.to_string(), value);
        }
        Value::Object(body)
    }
}
