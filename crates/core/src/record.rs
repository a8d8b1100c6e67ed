//! The in-memory clinical record.
//!
//! A record is a flat set of optional attributes keyed by the ids in
//! [`crate::fields`]. Unset attributes are simply absent; writing an empty
//! string or empty list clears the slot, so "empty" and "unset" never
//! diverge. The record enforces field kinds on every write but knows nothing
//! about sections, visibility, or validation — that is schema and controller
//! territory.

use crate::fields::{self, FieldKind};
use crate::therapy::{PerioperativeTherapy, TherapyLine};
use crate::{FormError, FormResult};
use chrono::NaiveDate;
use crf_types::{DictCode, RegistryType};
use std::collections::BTreeMap;

/// A single field value, tagged with its semantic kind.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Code(DictCode),
    Date(NaiveDate),
    Number(f64),
    Flag(bool),
    Codes(Vec<DictCode>),
    TherapyLines(Vec<TherapyLine>),
    Perioperative(Vec<PerioperativeTherapy>),
}

impl FieldValue {
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldValue::Text(_) => FieldKind::Text,
            FieldValue::Code(_) => FieldKind::Code,
            FieldValue::Date(_) => FieldKind::Date,
            FieldValue::Number(_) => FieldKind::Number,
            FieldValue::Flag(_) => FieldKind::Flag,
            FieldValue::Codes(_) => FieldKind::Codes,
            FieldValue::TherapyLines(_) => FieldKind::TherapyLines,
            FieldValue::Perioperative(_) => FieldKind::Perioperative,
        }
    }

    /// Whether the value carries no content. Empty values are normalized to
    /// "unset" on write; a `false` flag is content, not emptiness.
    fn is_empty(&self) -> bool {
        match self {
            FieldValue::Text(s) => s.trim().is_empty(),
            FieldValue::Codes(v) => v.is_empty(),
            FieldValue::TherapyLines(v) => v.is_empty(),
            FieldValue::Perioperative(v) => v.is_empty(),
            _ => false,
        }
    }
}

/// One patient's registry record.
///
/// The registry type is fixed at creation and selects the active schema for
/// the record's whole lifetime. The record is owned exclusively by the form
/// controller during an edit session.
#[derive(Debug, Clone, PartialEq)]
pub struct ClinicalRecord {
    registry: RegistryType,
    values: BTreeMap<&'static str, FieldValue>,
}

impl ClinicalRecord {
    /// Creates an empty record for the given registry.
    pub fn new(registry: RegistryType) -> Self {
        Self {
            registry,
            values: BTreeMap::new(),
        }
    }

    pub fn registry(&self) -> RegistryType {
        self.registry
    }

    /// Sets or clears a field.
    ///
    /// `None` clears; a `Some` value must match the field's declared kind.
    /// Empty text and empty code lists are normalized to "cleared". Returns
    /// the canonical field id.
    ///
    /// # Errors
    ///
    /// `FormError::UnknownField` for an undeclared id,
    /// `FormError::InvalidInput` for a kind mismatch.
    pub fn set(&mut self, field: &str, value: Option<FieldValue>) -> FormResult<&'static str> {
        let id =
            fields::canonical(field).ok_or_else(|| FormError::UnknownField(field.to_owned()))?;
        let expected = fields::kind(id).expect("canonical id always has a kind");

        match value {
            Some(value) if value.kind() != expected => Err(FormError::InvalidInput(format!(
                "field '{id}' expects {expected:?}, got {:?}",
                value.kind()
            ))),
            Some(value) if value.is_empty() => {
                self.values.remove(id);
                Ok(id)
            }
            Some(value) => {
                self.values.insert(id, value);
                Ok(id)
            }
            None => {
                self.values.remove(id);
                Ok(id)
            }
        }
    }

    /// Clears a field. Equivalent to `set(field, None)`.
    pub fn clear(&mut self, field: &str) -> FormResult<&'static str> {
        self.set(field, None)
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.values.get(field)
    }

    /// Whether a field currently holds a value.
    pub fn is_filled(&self, field: &str) -> bool {
        self.values.contains_key(field)
    }

    pub fn text(&self, field: &str) -> Option<&str> {
        match self.values.get(field) {
            Some(FieldValue::Text(s)) => Some(s),
            _ => None,
        }
    }

    pub fn code(&self, field: &str) -> Option<&DictCode> {
        match self.values.get(field) {
            Some(FieldValue::Code(c)) => Some(c),
            _ => None,
        }
    }

    pub fn date(&self, field: &str) -> Option<NaiveDate> {
        match self.values.get(field) {
            Some(FieldValue::Date(d)) => Some(*d),
            _ => None,
        }
    }

    pub fn number(&self, field: &str) -> Option<f64> {
        match self.values.get(field) {
            Some(FieldValue::Number(n)) => Some(*n),
            _ => None,
        }
    }

    /// Tri-state flag: `None` when untouched.
    pub fn flag(&self, field: &str) -> Option<bool> {
        match self.values.get(field) {
            Some(FieldValue::Flag(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn codes(&self, field: &str) -> &[DictCode] {
        match self.values.get(field) {
            Some(FieldValue::Codes(v)) => v,
            _ => &[],
        }
    }

    pub fn therapy_lines(&self, field: &str) -> &[TherapyLine] {
        match self.values.get(field) {
            Some(FieldValue::TherapyLines(v)) => v,
            _ => &[],
        }
    }

    pub fn perioperative(&self, field: &str) -> &[PerioperativeTherapy] {
        match self.values.get(field) {
            Some(FieldValue::Perioperative(v)) => v,
            _ => &[],
        }
    }

    /// Whether the code field holds exactly `code`.
    pub fn code_is(&self, field: &str, code: &str) -> bool {
        self.code(field).map(|c| c.as_str() == code).unwrap_or(false)
    }

    /// Whether the multi-select field contains `code`.
    pub fn codes_contain(&self, field: &str, code: &str) -> bool {
        self.codes(field).iter().any(|c| c.as_str() == code)
    }

    /// Ids of currently set fields, in stable order.
    pub fn set_fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.values.keys().copied()
    }
}
