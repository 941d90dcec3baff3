//! Parameter group abstraction
//!
//! A group is one logical set of co-edited parameters synchronized as a
//! unit (the global effects config, one oscillator, the recorder transport).
//! Each group is a concrete struct with a fixed field enum, so the set of
//! editable keys is checked at compile time.

use super::types::{EditError, ParamValue};
use std::fmt::{Debug, Display};
use std::hash::Hash;

pub trait ParameterGroup: Clone + Debug + Send + Sync + 'static {
    /// Field identifier; `Display` yields the field's wire path (e.g. `echo.mix`)
    type Field: Copy + Eq + Ord + Hash + Debug + Display + Send + Sync + 'static;

    /// Label for logs and status lines, e.g. `oscillator 2`
    fn label(&self) -> String;

    /// Every field, in display order
    fn fields() -> &'static [Self::Field];

    fn get(&self, field: Self::Field) -> ParamValue;

    /// Store `value`, validating its kind and domain
    ///
    /// Must accept any value previously returned by [`get`](Self::get) for
    /// the same field, including read-only fields.
    fn set(&mut self, field: Self::Field, value: ParamValue) -> Result<(), EditError>;

    /// Whether users may edit the field; observed-only fields return false
    fn is_editable(_field: Self::Field) -> bool {
        true
    }

    /// Look a field up by its wire path
    fn field_named(name: &str) -> Option<Self::Field> {
        Self::fields()
            .iter()
            .copied()
            .find(|f| f.to_string().eq_ignore_ascii_case(name))
    }

    /// Fields whose values differ from `other`
    fn changed_fields(&self, other: &Self) -> Vec<Self::Field> {
        Self::fields()
            .iter()
            .copied()
            .filter(|&f| self.get(f) != other.get(f))
            .collect()
    }
}
