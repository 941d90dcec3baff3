//! One oscillator of the synth voice

use super::{expect_integer, expect_number, json_number, WireFormat};
use crate::sync::{EditError, ParamValue, ParameterGroup};
use serde_json::{json, Map, Value};
use std::fmt;
use std::str::FromStr;

/// Waveform presets the server knows, in menu order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Waveform {
    SuperSaw,
    FatTriangle,
    PulseSquare,
    SineSawDrone,
    SuperSawWithSub,
    GlitchMix,
    LushPad,
    RetroLead,
    BassGrowl,
    AmbientDrone,
    SynthStab,
    GlassBells,
    OrganTone,
    Sine,
    Triangular,
    Saw,
    Square,
    None,
}

impl Waveform {
    pub const ALL: [Waveform; 18] = [
        Waveform::SuperSaw,
        Waveform::FatTriangle,
        Waveform::PulseSquare,
        Waveform::SineSawDrone,
        Waveform::SuperSawWithSub,
        Waveform::GlitchMix,
        Waveform::LushPad,
        Waveform::RetroLead,
        Waveform::BassGrowl,
        Waveform::AmbientDrone,
        Waveform::SynthStab,
        Waveform::GlassBells,
        Waveform::OrganTone,
        Waveform::Sine,
        Waveform::Triangular,
        Waveform::Saw,
        Waveform::Square,
        Waveform::None,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Waveform::SuperSaw => "SuperSaw",
            Waveform::FatTriangle => "FatTriangle",
            Waveform::PulseSquare => "PulseSquare",
            Waveform::SineSawDrone => "SineSawDrone",
            Waveform::SuperSawWithSub => "SuperSawWithSub",
            Waveform::GlitchMix => "GlitchMix",
            Waveform::LushPad => "LushPad",
            Waveform::RetroLead => "RetroLead",
            Waveform::BassGrowl => "BassGrowl",
            Waveform::AmbientDrone => "AmbientDrone",
            Waveform::SynthStab => "SynthStab",
            Waveform::GlassBells => "GlassBells",
            Waveform::OrganTone => "OrganTone",
            Waveform::Sine => "Sine",
            Waveform::Triangular => "Triangular",
            Waveform::Saw => "Saw",
            Waveform::Square => "Square",
            Waveform::None => "None",
        }
    }
}

impl fmt::Display for Waveform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Waveform {
    type Err = String;

    /// Case-insensitive, so REPL input like `supersaw` works
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Waveform::ALL
            .iter()
            .copied()
            .find(|w| w.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown waveform '{}'", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OscillatorField {
    Sound,
    Volume,
    Detune,
    Octave,
}

impl fmt::Display for OscillatorField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OscillatorField::Sound => "sound",
            OscillatorField::Volume => "volume",
            OscillatorField::Detune => "detune",
            OscillatorField::Octave => "octave",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Oscillator {
    /// Position in the server's oscillator array
    pub index: usize,
    pub sound: Waveform,
    /// 0.0-1.0
    pub volume: f64,
    pub detune: i64,
    pub octave: i64,
}

impl Oscillator {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            sound: Waveform::Sine,
            volume: 0.5,
            detune: 0,
            octave: 0,
        }
    }
}

impl ParameterGroup for Oscillator {
    type Field = OscillatorField;

    fn label(&self) -> String {
        format!("oscillator {}", self.index + 1)
    }

    fn fields() -> &'static [OscillatorField] {
        &[
            OscillatorField::Sound,
            OscillatorField::Volume,
            OscillatorField::Detune,
            OscillatorField::Octave,
        ]
    }

    fn get(&self, field: OscillatorField) -> ParamValue {
        match field {
            OscillatorField::Sound => ParamValue::Text(self.sound.to_string()),
            OscillatorField::Volume => ParamValue::Number(self.volume),
            OscillatorField::Detune => ParamValue::Number(self.detune as f64),
            OscillatorField::Octave => ParamValue::Number(self.octave as f64),
        }
    }

    fn set(&mut self, field: OscillatorField, value: ParamValue) -> Result<(), EditError> {
        match field {
            OscillatorField::Sound => {
                let name = value
                    .as_text()
                    .ok_or_else(|| EditError::wrong_kind(field, "text", &value))?;
                self.sound = name.parse().map_err(|_| EditError::invalid(field, name))?;
            }
            OscillatorField::Volume => {
                let n = expect_number(field, &value)?;
                if !(0.0..=1.0).contains(&n) {
                    return Err(EditError::invalid(field, n));
                }
                self.volume = n;
            }
            OscillatorField::Detune => self.detune = expect_integer(field, &value)?,
            OscillatorField::Octave => self.octave = expect_integer(field, &value)?,
        }
        Ok(())
    }
}

impl WireFormat for Oscillator {
    fn read_path() -> &'static str {
        "/api/oscillators"
    }

    fn write_path() -> &'static str {
        "/api/oscillators"
    }

    fn decode(&self, body: &Value) -> Result<Self, String> {
        let list = body
            .as_array()
            .ok_or_else(|| "expected an array of oscillators".to_string())?;
        let entry = list
            .get(self.index)
            .ok_or_else(|| format!("server has no oscillator {} ({} total)", self.index + 1, list.len()))?;

        let number = |key: &str| {
            entry
                .get(key)
                .and_then(Value::as_f64)
                .ok_or_else(|| format!("oscillator {}: missing numeric '{}'", self.index + 1, key))
        };
        let sound = entry
            .get("sound")
            .and_then(Value::as_str)
            .ok_or_else(|| format!("oscillator {}: missing 'sound'", self.index + 1))?
            .parse::<Waveform>()?;

        Ok(Oscillator {
            index: self.index,
            sound,
            volume: number("volume")?,
            detune: number("detune")?.round() as i64,
            octave: number("octave")?.round() as i64,
        })
    }

    fn encode_patch(&self, changed: &[OscillatorField]) -> Value {
        let mut body = Map::new();
        body.insert("id".to_string(), json!(self.index));
        for &field in changed {
            let value = match field {
                OscillatorField::Sound => json!(self.sound.as_str()),
                OscillatorField::Volume => json_number(self.volume),
                OscillatorField::Detune => json!(self.detune),
                OscillatorField::Octave => json!(self.octave),
            };
            body.insert(field.to_string(), value);
        }
        Value::Object(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_waveform_names() {
        assert_eq!(Waveform::ALL.len(), 18);
        for w in Waveform::ALL {
            assert_eq!(w.as_str().parse::<Waveform>(), Ok(w));
        }
        assert_eq!("glassbells".parse::<Waveform>(), Ok(Waveform::GlassBells));
        assert!("Noise".parse::<Waveform>().is_err());
    }

    #[test]
    fn test_decode_picks_own_index() {
        let body = json!([
            {"volume": 0.5, "octave": 0, "detune": 0, "sound": "Sine"},
            {"volume": 0.25, "octave": -1, "detune": 7, "sound": "SuperSaw"}
        ]);
        let osc = Oscillator::new(1).decode(&body).unwrap();
        assert_eq!(osc.index, 1);
        assert_eq!(osc.sound, Waveform::SuperSaw);
        assert_eq!(osc.volume, 0.25);
        assert_eq!(osc.octave, -1);
        assert_eq!(osc.detune, 7);
    }

    #[test]
    fn test_decode_errors() {
        let body = json!([{"volume": 0.5, "octave": 0, "detune": 0, "sound": "Sine"}]);
        assert!(Oscillator::new(3).decode(&body).is_err());

        let body = json!([{"volume": 0.5, "octave": 0, "detune": 0, "sound": "Kazoo"}]);
        let err = Oscillator::new(0).decode(&body).unwrap_err();
        assert!(err.contains("Kazoo"));
    }

    #[test]
    fn test_patch_carries_id() {
        let mut osc = Oscillator::new(2);
        osc.sound = Waveform::LushPad;
        assert_eq!(
            osc.encode_patch(&[OscillatorField::Sound]),
            json!({"id": 2, "sound": "LushPad"})
        );
    }

    #[test]
    fn test_set_validates() {
        let mut osc = Oscillator::new(0);
        assert!(osc.set(OscillatorField::Sound, "RetroLead".into()).is_ok());
        assert_eq!(osc.sound, Waveform::RetroLead);
        assert!(matches!(
            osc.set(OscillatorField::Sound, "Kazoo".into()),
            Err(EditError::InvalidValue { .. })
        ));
        assert!(matches!(
            osc.set(OscillatorField::Sound, 3.0.into()),
            Err(EditError::WrongKind { .. })
        ));
        assert!(osc.set(OscillatorField::Volume, 1.5.into()).is_err());
        assert!(osc.set(OscillatorField::Octave, 0.5.into()).is_err());
        assert!(osc.set(OscillatorField::Octave, (-2.0).into()).is_ok());
        assert_eq!(osc.octave, -2);
        assert_eq!(osc.sound, Waveform::RetroLead);
    }
}
