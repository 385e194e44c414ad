use std::collections::{BTreeSet, HashSet};
use std::fmt::{Display, Formatter};

use indexmap::IndexMap;
use serde_json::Value;

use super::error::{FormError, FormResult};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct FieldKey(&'static str);

impl FieldKey {
    pub const fn new(value: &'static str) -> Self {
        Self(value)
    }

    pub const fn as_str(self) -> &'static str {
        self.0
    }
}

impl Display for FieldKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0)
    }
}

impl From<FieldKey> for String {
    fn from(key: FieldKey) -> Self {
        key.0.to_string()
    }
}

impl AsRef<str> for FieldKey {
    fn as_ref(&self) -> &str {
        self.0
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum ErrorKind {
    Required,
    Custom,
    /// Kinds owned by the binding layer, e.g. `email` or `pattern`.
    Other(String),
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Required => f.write_str("required"),
            ErrorKind::Custom => f.write_str("custom"),
            ErrorKind::Other(kind) => f.write_str(kind),
        }
    }
}

/// Live state of one bound field, written by the binding layer.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldState {
    pub value: String,
    pub dirty: bool,
    pub model_value: Value,
    pub errors: BTreeSet<ErrorKind>,
}

impl Default for FieldState {
    fn default() -> Self {
        Self::new("")
    }
}

impl FieldState {
    pub fn new(value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            model_value: Value::String(value.clone()),
            value,
            dirty: false,
            errors: BTreeSet::new(),
        }
    }

    /// Sets the view and model value the way user input does, marking the
    /// field dirty.
    pub fn set_view_value(&mut self, value: impl Into<String>) {
        let value = value.into();
        self.model_value = Value::String(value.clone());
        self.value = value;
        self.dirty = true;
    }

    /// Adds or removes exactly `kind`; other error kinds are untouched.
    pub fn set_validity(&mut self, kind: ErrorKind, is_valid: bool) {
        if is_valid {
            self.errors.remove(&kind);
        } else {
            self.errors.insert(kind);
        }
    }

    pub fn with_error(mut self, kind: ErrorKind) -> Self {
        self.errors.insert(kind);
        self
    }

    pub fn has_error(&self, kind: &ErrorKind) -> bool {
        self.errors.contains(kind)
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn is_invalid(&self) -> bool {
        !self.is_valid()
    }

    pub fn set_pristine(&mut self) {
        self.dirty = false;
    }
}

#[derive(Clone, Debug, Default)]
pub struct FormState {
    submitted: bool,
    fields: IndexMap<String, FieldState>,
}

impl FormState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submitted(&self) -> bool {
        self.submitted
    }

    pub(super) fn set_submitted(&mut self, submitted: bool) {
        self.submitted = submitted;
    }

    pub fn bind(&mut self, name: impl Into<String>, field: FieldState) -> FormResult<()> {
        let name = name.into();
        if self.fields.contains_key(&name) {
            return Err(FormError::DuplicateField(name));
        }
        self.fields.insert(name, field);
        Ok(())
    }

    pub fn unbind(&mut self, name: &str) -> Option<FieldState> {
        self.fields.shift_remove(name)
    }

    pub fn is_bound(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn field(&self, name: &str) -> Option<&FieldState> {
        self.fields.get(name)
    }

    pub fn field_mut(&mut self, name: &str) -> Option<&mut FieldState> {
        self.fields.get_mut(name)
    }

    pub fn try_field_mut(&mut self, name: &str) -> FormResult<&mut FieldState> {
        self.fields
            .get_mut(name)
            .ok_or_else(|| FormError::UnknownField(name.to_string()))
    }

    /// Bound fields in registration order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldState)> {
        self.fields
            .iter()
            .map(|(name, field)| (name.as_str(), field))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn is_valid(&self) -> bool {
        self.fields.values().all(FieldState::is_valid)
    }

    pub(super) fn fields_mut(&mut self) -> impl Iterator<Item = &mut FieldState> {
        self.fields.values_mut()
    }

    /// Drops bound fields whose names are not in `names`, returning them.
    pub(super) fn retain_names(&mut self, names: &HashSet<&str>) -> Vec<String> {
        let mut dropped = Vec::new();
        self.fields.retain(|name, _| {
            let keep = names.contains(name.as_str());
            if !keep {
                dropped.push(name.clone());
            }
            keep
        });
        dropped
    }
}
