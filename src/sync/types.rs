//! Value and status types shared by every parameter group

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A single parameter value: numeric (knobs), text (waveform names) or toggle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// On/off switches (metronome, recording)
    Toggle(bool),
    /// Physical-unit number
    Number(f64),
    /// Named choice
    Text(String),
}

impl ParamValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            ParamValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ParamValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_toggle(&self) -> Option<bool> {
        match self {
            ParamValue::Toggle(b) => Some(*b),
            _ => None,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ParamValue::Toggle(_) => "toggle",
            ParamValue::Number(_) => "number",
            ParamValue::Text(_) => "text",
        }
    }

    /// Parse user input: `on`/`off`/`true`/`false`, a number, or free text
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        match input.to_ascii_lowercase().as_str() {
            "on" | "true" => return ParamValue::Toggle(true),
            "off" | "false" => return ParamValue::Toggle(false),
            _ => {}
        }
        match input.parse::<f64>() {
            Ok(n) if n.is_finite() => ParamValue::Number(n),
            _ => ParamValue::Text(input.to_string()),
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Toggle(true) => write!(f, "on"),
            ParamValue::Toggle(false) => write!(f, "off"),
            ParamValue::Number(n) => write!(f, "{}", n),
            ParamValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<f64> for ParamValue {
    fn from(n: f64) -> Self {
        ParamValue::Number(n)
    }
}

impl From<bool> for ParamValue {
    fn from(b: bool) -> Self {
        ParamValue::Toggle(b)
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::Text(s.to_string())
    }
}

/// Rejected edit; `local` is left untouched
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EditError {
    #[error("field '{field}' expects a {expected} value, got {got} '{value}'")]
    WrongKind {
        field: String,
        expected: &'static str,
        got: &'static str,
        value: String,
    },

    #[error("'{value}' is not a valid value for '{field}'")]
    InvalidValue { field: String, value: String },

    #[error("field '{0}' is read-only")]
    ReadOnly(String),

    #[error("unknown field '{0}'")]
    UnknownField(String),

    #[error("group engine has shut down")]
    EngineStopped,
}

impl EditError {
    pub fn wrong_kind(field: impl fmt::Display, expected: &'static str, got: &ParamValue) -> Self {
        EditError::WrongKind {
            field: field.to_string(),
            expected,
            got: got.kind(),
            value: got.to_string(),
        }
    }

    pub fn invalid(field: impl fmt::Display, value: impl fmt::Display) -> Self {
        EditError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
        }
    }
}

/// Where a group is in its initial load
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    /// Initial read outstanding
    Loading,
    /// Initial read succeeded; edits are synchronized
    Loaded,
    /// Initial read failed; the group stays unloaded for good
    Failed(String),
}

impl fmt::Display for LoadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadState::Loading => write!(f, "loading"),
            LoadState::Loaded => write!(f, "loaded"),
            LoadState::Failed(reason) => write!(f, "not loaded ({})", reason),
        }
    }
}

/// What the surface renders for one group
#[derive(Debug, Clone)]
pub struct GroupView<G> {
    pub load: LoadState,
    /// Locally edited snapshot (authoritative for rendering)
    pub local: G,
    /// A debounced write is scheduled
    pub pending: bool,
    /// Most recent transport failure, cleared by the next successful write
    pub last_error: Option<String>,
    /// Writes fired so far
    pub writes: u64,
}

impl<G> GroupView<G> {
    /// The snapshot, only once the group has loaded
    pub fn loaded(&self) -> Option<&G> {
        match self.load {
            LoadState::Loaded => Some(&self.local),
            _ => None,
        }
    }
}
