//! The synth's parameter groups and their JSON wire formats
//!
//! | Group | Read | Write |
//! |---|---|---|
//! | [`EffectsConfig`] | `GET /api/config` | `POST /api/config`, nested changed leaves |
//! | [`Oscillator`] | `GET /api/oscillators` (array) | `POST /api/oscillators`, `{"id", ..changed}` |
//! | [`RecorderTransport`] | `GET /api/recorder` | `POST /api/recorder`, `{"action":"set", ..changed}` |

pub mod effects;
pub mod oscillator;
pub mod recorder;

pub use effects::{EffectsConfig, EffectsField};
pub use oscillator::{Oscillator, OscillatorField, Waveform};
pub use recorder::{RecorderField, RecorderTransport};

use crate::sync::{EditError, ParamValue, ParameterGroup};
use serde_json::{Map, Value};

/// JSON encoding of a group for the HTTP remote
pub trait WireFormat: ParameterGroup {
    fn read_path() -> &'static str;

    fn write_path() -> &'static str;

    /// Build a snapshot from a read response; `self` supplies identity
    fn decode(&self, body: &Value) -> Result<Self, String>;

    /// Write body carrying `changed` fields plus identifying keys
    fn encode_patch(&self, changed: &[Self::Field]) -> Value;
}

/// Follow a dotted path (`echo.mix`) into nested objects
pub(crate) fn lookup<'a>(body: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(body, |node, key| node.get(key))
}

/// Insert `value` at a dotted path, creating intermediate objects
pub(crate) fn insert_path(root: &mut Map<String, Value>, path: &str, value: Value) {
    let mut keys = path.split('.').peekable();
    let mut node = root;
    while let Some(key) = keys.next() {
        if keys.peek().is_none() {
            node.insert(key.to_string(), value);
            return;
        }
        let child = node
            .entry(key.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !child.is_object() {
            *child = Value::Object(Map::new());
        }
        match child {
            Value::Object(map) => node = map,
            _ => return,
        }
    }
}

/// Number at `path`, or `default` when absent
pub(crate) fn number_at(body: &Value, path: &str, default: Option<f64>) -> Result<f64, String> {
    match lookup(body, path) {
        Some(v) => v
            .as_f64()
            .ok_or_else(|| format!("'{}' is not a number: {}", path, v)),
        None => default.ok_or_else(|| format!("missing '{}'", path)),
    }
}

/// JSON number, written as an integer when it has no fraction
pub(crate) fn json_number(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        Value::from(n as i64)
    } else {
        Value::from(n)
    }
}

pub(crate) fn expect_number(field: impl std::fmt::Display, value: &ParamValue) -> Result<f64, EditError> {
    match value.as_number() {
        Some(n) if n.is_finite() => Ok(n),
        Some(n) => Err(EditError::invalid(field, n)),
        None => Err(EditError::wrong_kind(field, "number", value)),
    }
}

pub(crate) fn expect_integer(field: impl std::fmt::Display, value: &ParamValue) -> Result<i64, EditError> {
    let n = expect_number(&field, value)?;
    if n.fract() != 0.0 {
        return Err(EditError::invalid(field, n));
    }
    Ok(n as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lookup_nested() {
        let body = json!({"gain": 0.5, "echo": {"mix": 0.25}});
        assert_eq!(lookup(&body, "echo.mix"), Some(&json!(0.25)));
        assert_eq!(lookup(&body, "gain"), Some(&json!(0.5)));
        assert_eq!(lookup(&body, "echo.rate"), None);
        assert_eq!(lookup(&body, "gain.x"), None);
    }

    #[test]
    fn test_insert_path_merges_siblings() {
        let mut root = Map::new();
        insert_path(&mut root, "echo.mix", json!(0.5));
        insert_path(&mut root, "echo.rate", json!(1.2));
        insert_path(&mut root, "gain", json!(0.001));
        assert_eq!(
            Value::Object(root),
            json!({"echo": {"mix": 0.5, "rate": 1.2}, "gain": 0.001})
        );
    }

    #[test]
    fn test_number_defaults() {
        let body = json!({"highpass": "x"});
        assert_eq!(number_at(&body, "lowpass", Some(21000.0)), Ok(21000.0));
        assert!(number_at(&body, "gain", None).is_err());
        assert!(number_at(&body, "highpass", Some(0.0)).is_err());
    }

    #[test]
    fn test_integers_stay_integers() {
        assert_eq!(json_number(3.0), json!(3));
        assert_eq!(json_number(0.25), json!(0.25));
        assert_eq!(expect_integer("octave", &ParamValue::Number(-1.0)), Ok(-1));
        assert!(expect_integer("octave", &ParamValue::Number(1.5)).is_err());
    }
}
