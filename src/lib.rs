//! Synth Surface - knob-driven control surface for a remote synthesizer
//!
//! The audio engine runs elsewhere and exposes an HTTP API. This crate
//! provides the pieces that sit in front of it:
//! - [`knob`]: rotary knob gesture transducer
//! - [`scale`]: control ↔ physical value transforms
//! - [`sync`]: debounced reconciliation engine, one per parameter group
//! - [`groups`] and [`remote`]: the synth's groups and their HTTP transport
//! - [`surface`]: panels of knobs bound to engines
//! - [`simulator`]: in-memory stand-in for the synth server

pub mod cli;
pub mod config;
pub mod groups;
pub mod keyboard;
pub mod knob;
pub mod remote;
pub mod scale;
pub mod simulator;
pub mod surface;
pub mod sync;
