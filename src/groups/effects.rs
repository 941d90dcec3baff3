//! Global effects configuration

use super::{expect_number, insert_path, json_number, number_at, WireFormat};
use crate::sync::{EditError, ParamValue, ParameterGroup};
use serde_json::{Map, Value};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EffectsField {
    Gain,
    Highpass,
    Lowpass,
    Attack,
    Decay,
    Sustain,
    Release,
    EchoRate,
    EchoFeedback,
    EchoMix,
    VibratoDepth,
    VibratoFrequency,
    TremoloDepth,
    TremoloFrequency,
    ReverbDry,
    ReverbWet,
}

impl EffectsField {
    pub const ALL: [EffectsField; 16] = [
        EffectsField::Gain,
        EffectsField::Highpass,
        EffectsField::Lowpass,
        EffectsField::Attack,
        EffectsField::Decay,
        EffectsField::Sustain,
        EffectsField::Release,
        EffectsField::EchoRate,
        EffectsField::EchoFeedback,
        EffectsField::EchoMix,
        EffectsField::VibratoDepth,
        EffectsField::VibratoFrequency,
        EffectsField::TremoloDepth,
        EffectsField::TremoloFrequency,
        EffectsField::ReverbDry,
        EffectsField::ReverbWet,
    ];

    /// Wire path of the field in `/api/config` bodies
    pub fn path(self) -> &'static str {
        match self {
            EffectsField::Gain => "gain",
            EffectsField::Highpass => "highpass",
            EffectsField::Lowpass => "lowpass",
            EffectsField::Attack => "adsr.attack",
            EffectsField::Decay => "adsr.decay",
            EffectsField::Sustain => "adsr.sustain",
            EffectsField::Release => "adsr.release",
            EffectsField::EchoRate => "echo.rate",
            EffectsField::EchoFeedback => "echo.feedback",
            EffectsField::EchoMix => "echo.mix",
            EffectsField::VibratoDepth => "vibrato.depth",
            EffectsField::VibratoFrequency => "vibrato.frequency",
            EffectsField::TremoloDepth => "tremolo.depth",
            EffectsField::TremoloFrequency => "tremolo.frequency",
            EffectsField::ReverbDry => "reverb.dry",
            EffectsField::ReverbWet => "reverb.wet",
        }
    }

    /// Value used when a read omits the field; `None` means required
    fn read_default(self) -> Option<f64> {
        match self {
            EffectsField::Highpass => Some(0.0),
            EffectsField::Lowpass => Some(21000.0),
            EffectsField::VibratoDepth | EffectsField::TremoloDepth => Some(0.0),
            EffectsField::VibratoFrequency | EffectsField::TremoloFrequency => Some(5.0),
            EffectsField::ReverbDry => Some(1.0),
            EffectsField::ReverbWet => Some(0.0),
            _ => None,
        }
    }
}

impl fmt::Display for EffectsField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Adsr {
    pub attack: f64,
    pub decay: f64,
    pub sustain: f64,
    pub release: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Echo {
    /// Seconds
    pub rate: f64,
    pub feedback: f64,
    pub mix: f64,
}

/// Vibrato or tremolo
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Modulator {
    pub depth: f64,
    /// Hz
    pub frequency: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reverb {
    pub dry: f64,
    pub wet: f64,
}

/// Master gain, filters, envelope and effect chain settings
#[derive(Debug, Clone, PartialEq)]
pub struct EffectsConfig {
    /// Linear amplitude, 1e-6 to 1e-3
    pub gain: f64,
    /// Cutoffs in Hz
    pub highpass: f64,
    pub lowpass: f64,
    pub adsr: Adsr,
    pub echo: Echo,
    pub vibrato: Modulator,
    pub tremolo: Modulator,
    pub reverb: Reverb,
}

impl Default for EffectsConfig {
    fn default() -> Self {
        Self {
            // Knob position 50 on the log gain scale
            gain: 1e-6 * 1000f64.powf(0.5),
            highpass: 0.0,
            lowpass: 21000.0,
            adsr: Adsr {
                attack: 5.0,
                decay: 5.0,
                sustain: 10.0,
                release: 5.0,
            },
            echo: Echo {
                rate: 0.3,
                feedback: 0.5,
                mix: 0.5,
            },
            vibrato: Modulator {
                depth: 0.0,
                frequency: 5.0,
            },
            tremolo: Modulator {
                depth: 0.0,
                frequency: 5.0,
            },
            reverb: Reverb { dry: 1.0, wet: 0.0 },
        }
    }
}

impl EffectsConfig {
    fn slot(&mut self, field: EffectsField) -> &mut f64 {
        match field {
            EffectsField::Gain => &mut self.gain,
            EffectsField::Highpass => &mut self.highpass,
            EffectsField::Lowpass => &mut self.lowpass,
            EffectsField::Attack => &mut self.adsr.attack,
            EffectsField::Decay => &mut self.adsr.decay,
            EffectsField::Sustain => &mut self.adsr.sustain,
            EffectsField::Release => &mut self.adsr.release,
            EffectsField::EchoRate => &mut self.echo.rate,
            EffectsField::EchoFeedback => &mut self.echo.feedback,
            EffectsField::EchoMix => &mut self.echo.mix,
            EffectsField::VibratoDepth => &mut self.vibrato.depth,
            EffectsField::VibratoFrequency => &mut self.vibrato.frequency,
            EffectsField::TremoloDepth => &mut self.tremolo.depth,
            EffectsField::TremoloFrequency => &mut self.tremolo.frequency,
            EffectsField::ReverbDry => &mut self.reverb.dry,
            EffectsField::ReverbWet => &mut self.reverb.wet,
        }
    }

    pub fn value(&self, field: EffectsField) -> f64 {
        match field {
            EffectsField::Gain => self.gain,
            EffectsField::Highpass => self.highpass,
            EffectsField::Lowpass => self.lowpass,
            EffectsField::Attack => self.adsr.attack,
            EffectsField::Decay => self.adsr.decay,
            EffectsField::Sustain => self.adsr.sustain,
            EffectsField::Release => self.adsr.release,
            EffectsField::EchoRate => self.echo.rate,
            EffectsField::EchoFeedback => self.echo.feedback,
            EffectsField::EchoMix => self.echo.mix,
            EffectsField::VibratoDepth => self.vibrato.depth,
            EffectsField::VibratoFrequency => self.vibrato.frequency,
            EffectsField::TremoloDepth => self.tremolo.depth,
            EffectsField::TremoloFrequency => self.tremolo.frequency,
            EffectsField::ReverbDry => self.reverb.dry,
            EffectsField::ReverbWet => self.reverb.wet,
        }
    }
}

impl ParameterGroup for EffectsConfig {
    type Field = EffectsField;

    fn label(&self) -> String {
        "effects".to_string()
    }

    fn fields() -> &'static [EffectsField] {
        &EffectsField::ALL
    }

    fn get(&self, field: EffectsField) -> ParamValue {
        ParamValue::Number(self.value(field))
    }

    fn set(&mut self, field: EffectsField, value: ParamValue) -> Result<(), EditError> {
        let n = expect_number(field, &value)?;
        if n < 0.0 {
            return Err(EditError::invalid(field, n));
        }
        *self.slot(field) = n;
        Ok(())
    }
}

impl WireFormat for EffectsConfig {
    fn read_path() -> &'static str {
        "/api/config"
    }

    fn write_path() -> &'static str {
        "/api/config"
    }

    fn decode(&self, body: &Value) -> Result<Self, String> {
        let mut config = EffectsConfig::default();
        for field in EffectsField::ALL {
            *config.slot(field) = number_at(body, field.path(), field.read_default())?;
        }
        Ok(config)
    }

    fn encode_patch(&self, changed: &[EffectsField]) -> Value {
        let mut root = Map::new();
        for &field in changed {
            insert_path(&mut root, field.path(), json_number(self.value(field)));
        }
        Value::Object(root)
    }
}
