//! Wire payloads: the flat JSON object exchanged with the record store.
//!
//! Scalar fields travel as JSON scalars; dates as `YYYY-MM-DD` strings. The
//! composite lists (therapy lines, perioperative therapy) travel as JSON
//! *text* inside a string field — that is how stored records already look,
//! and loading must accept it byte-for-byte. Loading is lenient throughout:
//! a malformed value is dropped with a warning, never a hard error, because
//! a single bad field must not make a whole record unopenable.

use crate::fields::{self, FieldKind};
use crate::record::{ClinicalRecord, FieldValue};
use crate::therapy::{self, PerioperativeTherapy, TherapyLine};
use crf_types::{DictCode, RegistryType};
use serde_json::{Map, Value};

/// A flat wire object, keyed by field id.
pub type Payload = Map<String, Value>;

/// Payload key carrying the registry discriminator on record creation.
pub const REGISTRY_TYPE_KEY: &str = "registry_type";

fn value_to_wire(value: &FieldValue) -> Value {
    match value {
        FieldValue::Text(s) => Value::String(s.clone()),
        FieldValue::Code(c) => Value::String(c.as_str().to_owned()),
        FieldValue::Date(d) => Value::String(d.format("%Y-%m-%d").to_string()),
        FieldValue::Number(n) => serde_json::Number::from_f64(*n)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        FieldValue::Flag(b) => Value::Bool(*b),
        FieldValue::Codes(codes) => Value::Array(
            codes
                .iter()
                .map(|c| Value::String(c.as_str().to_owned()))
                .collect(),
        ),
        // Composite lists are embedded as JSON text.
        FieldValue::TherapyLines(lines) => {
            Value::String(serde_json::to_string(lines).unwrap_or_else(|_| "[]".into()))
        }
        FieldValue::Perioperative(entries) => {
            Value::String(serde_json::to_string(entries).unwrap_or_else(|_| "[]".into()))
        }
    }
}

/// Serializes every set field of the record.
pub fn to_payload(record: &ClinicalRecord) -> Payload {
    let mut payload = Payload::new();
    for field in record.set_fields() {
        if let Some(value) = record.get(field) {
            payload.insert(field.to_owned(), value_to_wire(value));
        }
    }
    payload
}

/// The creation payload: the full record plus the registry discriminator.
pub fn create_payload(record: &ClinicalRecord) -> Payload {
    let mut payload = to_payload(record);
    payload.insert(
        REGISTRY_TYPE_KEY.to_owned(),
        Value::String(record.registry().as_str().to_owned()),
    );
    payload
}

/// A partial payload carrying only the given fields.
///
/// Fields that are currently unset serialize as `null` so a clear reaches
/// the store instead of silently surviving there.
pub fn patch_payload<'a>(
    record: &ClinicalRecord,
    fields: impl IntoIterator<Item = &'a str>,
) -> Payload {
    let mut payload = Payload::new();
    for field in fields {
        let wire = record.get(field).map(value_to_wire).unwrap_or(Value::Null);
        payload.insert(field.to_owned(), wire);
    }
    payload
}

fn composite_text(field: &str, value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        // Some stores hand the list back already parsed.
        Value::Array(_) => Some(value.to_string()),
        Value::Null => None,
        Value::String(_) => None,
        other => {
            tracing::warn!(field, value = %other, "unexpected composite value, dropping");
            None
        }
    }
}

fn wire_to_value(field: &'static str, kind: FieldKind, raw: &Value) -> Option<FieldValue> {
    if raw.is_null() {
        return None;
    }
    match kind {
        FieldKind::Text => raw.as_str().map(|s| FieldValue::Text(s.to_owned())),
        FieldKind::Code => raw
            .as_str()
            .and_then(|s| DictCode::new(s).ok())
            .map(FieldValue::Code),
        FieldKind::Date => raw
            .as_str()
            .and_then(therapy::lenient::parse_day)
            .map(FieldValue::Date),
        FieldKind::Number => match raw {
            Value::Number(n) => n.as_f64().map(FieldValue::Number),
            Value::String(s) => s.trim().parse::<f64>().ok().map(FieldValue::Number),
            _ => None,
        },
        FieldKind::Flag => raw.as_bool().map(FieldValue::Flag),
        FieldKind::Codes => raw.as_array().map(|items| {
            FieldValue::Codes(
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .filter_map(|s| DictCode::new(s).ok())
                    .collect(),
            )
        }),
        FieldKind::TherapyLines => {
            let text = composite_text(field, raw)?;
            match serde_json::from_str::<Vec<TherapyLine>>(&text) {
                Ok(lines) => Some(FieldValue::TherapyLines(lines)),
                Err(error) => {
                    tracing::warn!(field, %error, "malformed therapy-line list, loading empty");
                    None
                }
            }
        }
        FieldKind::Perioperative => {
            let text = composite_text(field, raw)?;
            match serde_json::from_str::<Vec<PerioperativeTherapy>>(&text) {
                Ok(entries) => Some(FieldValue::Perioperative(entries)),
                Err(error) => {
                    tracing::warn!(field, %error, "malformed perioperative list, loading empty");
                    None
                }
            }
        }
    }
}

/// Builds a record from a stored payload.
///
/// Unknown keys are skipped; known keys with unparseable values are dropped
/// with a warning. The result is always a loadable record.
pub fn from_payload(registry: RegistryType, payload: &Payload) -> ClinicalRecord {
    let mut record = ClinicalRecord::new(registry);
    for (key, raw) in payload {
        let Some(field) = fields::canonical(key) else {
            continue;
        };
        let kind = fields::kind(field).expect("canonical id always has a kind");
        if let Some(value) = wire_to_value(field, kind, raw) {
            // Kind is matched by construction, set cannot fail here.
            let _ = record.set(field, Some(value));
        }
    }
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_scalars_round_trip() {
        let mut rec = ClinicalRecord::new(RegistryType::Alk);
        rec.set(fields::PATIENT_CODE, Some(FieldValue::Text("AB-17".into())))
            .unwrap();
        rec.set(fields::BIRTH_DATE, Some(FieldValue::Date(day(1958, 2, 9))))
            .unwrap();
        rec.set(fields::CNS_METASTASES, Some(FieldValue::Flag(false)))
            .unwrap();
        rec.set(fields::HEIGHT, Some(FieldValue::Number(171.0))).unwrap();

        let payload = to_payload(&rec);
        assert_eq!(payload["birth_date"], json!("1958-02-09"));
        assert_eq!(payload["cns_metastases"], json!(false));

        let back = from_payload(RegistryType::Alk, &payload);
        assert_eq!(back, rec);
    }

    #[test]
    fn test_create_payload_carries_registry_discriminator() {
        let rec = ClinicalRecord::new(RegistryType::Ros1);
        let payload = create_payload(&rec);
        assert_eq!(payload[REGISTRY_TYPE_KEY], json!("ROS1"));
    }

    #[test]
    fn test_patch_payload_nulls_cleared_fields() {
        let mut rec = ClinicalRecord::new(RegistryType::Alk);
        rec.set(fields::PATIENT_CODE, Some(FieldValue::Text("AB-17".into())))
            .unwrap();

        let patch = patch_payload(&rec, [fields::PATIENT_CODE, fields::GENDER]);
        assert_eq!(patch["patient_code"], json!("AB-17"));
        assert_eq!(patch["gender"], Value::Null);
        assert_eq!(patch.len(), 2);
    }

    #[test]
    fn test_composite_list_travels_as_json_text() {
        let mut rec = ClinicalRecord::new(RegistryType::Ros1);
        let mut line = TherapyLine::empty(1);
        line.start_date = Some(day(2023, 4, 15));
        rec.set(
            fields::METASTATIC_THERAPY_LINES,
            Some(FieldValue::TherapyLines(vec![line])),
        )
        .unwrap();

        let payload = to_payload(&rec);
        let raw = payload["metastatic_therapy_lines"]
            .as_str()
            .expect("composite list should be a string");
        assert!(raw.starts_with('['));

        let back = from_payload(RegistryType::Ros1, &payload);
        assert_eq!(back.therapy_lines(fields::METASTATIC_THERAPY_LINES).len(), 1);
    }

    #[test]
    fn test_malformed_composite_text_loads_as_empty() {
        let mut payload = Payload::new();
        payload.insert(
            fields::METASTATIC_THERAPY_LINES.to_owned(),
            json!("{not valid json"),
        );
        let rec = from_payload(RegistryType::Ros1, &payload);
        assert!(rec.therapy_lines(fields::METASTATIC_THERAPY_LINES).is_empty());
        assert!(!rec.is_filled(fields::METASTATIC_THERAPY_LINES));
    }

    #[test]
    fn test_legacy_datetime_suffix_is_tolerated() {
        let mut payload = Payload::new();
        payload.insert(
            fields::INITIAL_DIAGNOSIS_DATE.to_owned(),
            json!("2020-06-01T00:00:00"),
        );
        let rec = from_payload(RegistryType::Alk, &payload);
        assert_eq!(rec.date(fields::INITIAL_DIAGNOSIS_DATE), Some(day(2020, 6, 1)));
    }

    #[test]
    fn test_unknown_keys_are_skipped() {
        let mut payload = Payload::new();
        payload.insert("id".to_owned(), json!("abc"));
        payload.insert("gender".to_owned(), json!("FEMALE"));
        let rec = from_payload(RegistryType::Alk, &payload);
        assert!(rec.code_is(fields::GENDER, "FEMALE"));
        assert_eq!(rec.set_fields().count(), 1);
    }

    #[test]
    fn test_numeric_string_is_accepted_for_number_fields() {
        let mut payload = Payload::new();
        payload.insert(fields::PDL1_TPS.to_owned(), json!("45"));
        let rec = from_payload(RegistryType::Ros1, &payload);
        assert_eq!(rec.number(fields::PDL1_TPS), Some(45.0));
    }
}
