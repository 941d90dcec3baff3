//! Knob layouts for each synth panel

use super::binding::KnobBinding;
use super::format::ValueFormat;
use crate::groups::recorder::BPM_RANGE;
use crate::groups::{EffectsConfig, EffectsField, Oscillator, OscillatorField, RecorderField, RecorderTransport};
use crate::scale::DomainError;

const FILTER_RANGE: (f64, f64, f64) = (0.0, 21000.0, 10.0);
const ENVELOPE_RANGE: (f64, f64, f64) = (1.0, 20.0, 1.0);

/// Gain (log), filters, envelope, echo, vibrato, tremolo and reverb
pub fn effects_knobs() -> Result<Vec<KnobBinding<EffectsConfig>>, DomainError> {
    use EffectsField::*;
    Ok(vec![
        KnobBinding::logarithmic(Gain, "Gain", (1e-6, 1e-3), ValueFormat::Significant(4))?.with_size(100.0),
        KnobBinding::direct(Highpass, "High-pass", FILTER_RANGE, ValueFormat::Frequency)?,
        KnobBinding::direct(Lowpass, "Low-pass", FILTER_RANGE, ValueFormat::Frequency)?,
        KnobBinding::direct(Attack, "Attack", ENVELOPE_RANGE, ValueFormat::Integer)?,
        KnobBinding::direct(Decay, "Decay", ENVELOPE_RANGE, ValueFormat::Integer)?,
        KnobBinding::direct(Sustain, "Sustain", ENVELOPE_RANGE, ValueFormat::Integer)?,
        KnobBinding::direct(Release, "Release", ENVELOPE_RANGE, ValueFormat::Integer)?,
        KnobBinding::linear(EchoRate, "Echo rate", 300.0, (0.0, 3.0), ValueFormat::Fixed(2))?,
        KnobBinding::linear(EchoFeedback, "Echo feedback", 100.0, (0.0, 1.0), ValueFormat::Fixed(2))?,
        KnobBinding::linear(EchoMix, "Echo mix", 100.0, (0.0, 1.0), ValueFormat::Fixed(2))?,
        KnobBinding::direct(VibratoDepth, "Vibrato depth", (0.0, 10.0, 0.1), ValueFormat::Fixed(1))?,
        KnobBinding::direct(VibratoFrequency, "Vibrato freq", (0.0, 30.0, 0.1), ValueFormat::Frequency)?,
        KnobBinding::direct(TremoloDepth, "Tremolo depth", (0.0, 1.0, 0.01), ValueFormat::Fixed(2))?,
        KnobBinding::direct(TremoloFrequency, "Tremolo freq", (0.0, 30.0, 0.1), ValueFormat::Frequency)?,
        KnobBinding::linear(ReverbDry, "Reverb dry", 100.0, (0.0, 1.0), ValueFormat::Fixed(2))?,
        KnobBinding::linear(ReverbWet, "Reverb wet", 100.0, (0.0, 1.0), ValueFormat::Fixed(2))?,
    ])
}

pub fn oscillator_knobs() -> Result<Vec<KnobBinding<Oscillator>>, DomainError> {
    Ok(vec![KnobBinding::direct(
        OscillatorField::Volume,
        "Volume",
        (0.0, 1.0, 0.01),
        ValueFormat::Fixed(2),
    )?])
}

pub fn recorder_knobs() -> Result<Vec<KnobBinding<RecorderTransport>>, DomainError> {
    Ok(vec![KnobBinding::direct(
        RecorderField::Bpm,
        "BPM",
        (*BPM_RANGE.start() as f64, *BPM_RANGE.end() as f64, 1.0),
        ValueFormat::Integer,
    )?])
}
