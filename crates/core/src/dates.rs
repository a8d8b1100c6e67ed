//! Chronological consistency rules between date fields.
//!
//! Rules are declarative pairs: a field, the field it is compared against,
//! and the direction that constitutes a violation. A rule fires only when
//! *both* dates are present; validation is advisory and re-run on every edit
//! of either endpoint. Record dates are already day-granular
//! ([`chrono::NaiveDate`]), so same-day values never false-positive.

use crate::fields;
use crate::record::ClinicalRecord;
use crate::therapy::TherapyLine;

/// Direction of a chronological violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateOp {
    /// Violated when the field's value is before the compared value.
    Before,
    /// Violated when the field's value is after the compared value.
    After,
}

/// One pairwise rule between two scalar date fields.
#[derive(Debug, Clone, Copy)]
pub struct DateRule {
    pub field: &'static str,
    pub compared_to: &'static str,
    pub op: DateOp,
    pub message: &'static str,
}

/// The rule table, in declaration order. Order matters: when several rules
/// on one field fire at once, the first one wins.
pub const RULES: &[DateRule] = &[
    DateRule {
        field: fields::BIRTH_DATE,
        compared_to: fields::INITIAL_DIAGNOSIS_DATE,
        op: DateOp::After,
        message: "Birth date cannot be after the initial diagnosis date",
    },
    DateRule {
        field: fields::ALK_DIAGNOSIS_DATE,
        compared_to: fields::INITIAL_DIAGNOSIS_DATE,
        op: DateOp::Before,
        message: "ALK diagnosis date cannot be before the initial diagnosis date",
    },
    DateRule {
        field: fields::METASTATIC_DIAGNOSIS_DATE,
        compared_to: fields::INITIAL_DIAGNOSIS_DATE,
        op: DateOp::Before,
        message: "Metastatic phase date cannot be before the initial diagnosis date",
    },
    DateRule {
        field: fields::PREVIOUS_THERAPY_END_DATE,
        compared_to: fields::PREVIOUS_THERAPY_START_DATE,
        op: DateOp::Before,
        message: "End date cannot be before the start date",
    },
    DateRule {
        field: fields::ALECTINIB_END_DATE,
        compared_to: fields::ALECTINIB_START_DATE,
        op: DateOp::Before,
        message: "End date cannot be before the start date",
    },
    DateRule {
        field: fields::PROGRESSION_DATE,
        compared_to: fields::ALECTINIB_START_DATE,
        op: DateOp::Before,
        message: "Progression date cannot be before the treatment start date",
    },
    DateRule {
        field: fields::NEXT_LINE_START_DATE,
        compared_to: fields::ALECTINIB_END_DATE,
        op: DateOp::Before,
        message: "Next-line start date cannot be before the prior treatment end date",
    },
    DateRule {
        field: fields::NEXT_LINE_END_DATE,
        compared_to: fields::NEXT_LINE_START_DATE,
        op: DateOp::Before,
        message: "End date cannot be before the start date",
    },
    DateRule {
        field: fields::RADICAL_CRT_END_DATE,
        compared_to: fields::RADICAL_CRT_START_DATE,
        op: DateOp::Before,
        message: "Chemoradiation end date cannot be before its start date",
    },
    DateRule {
        field: fields::RELAPSE_DATE,
        compared_to: fields::RADICAL_SURGERY_DATE,
        op: DateOp::Before,
        message: "Relapse date must be after the radical treatment",
    },
];

/// Validates one scalar date field against the rule table.
///
/// Returns the first firing rule's message, or `None` when the field is
/// empty, has no rules, or no rule fires. Rules whose comparison field is
/// absent are skipped.
pub fn validate(field: &str, record: &ClinicalRecord) -> Option<&'static str> {
    let value = record.date(field)?;
    for rule in RULES.iter().filter(|r| r.field == field) {
        let Some(compared) = record.date(rule.compared_to) else {
            continue;
        };
        let fires = match rule.op {
            DateOp::Before => value < compared,
            DateOp::After => value > compared,
        };
        if fires {
            return Some(rule.message);
        }
    }
    None
}

/// Fields whose rules compare against `field`.
///
/// Editing a comparison endpoint must re-trigger validation of every
/// dependent field, not just the edited one.
pub fn dependents_of(field: &str) -> impl Iterator<Item = &'static str> + '_ {
    RULES
        .iter()
        .filter(move |r| r.compared_to == field)
        .map(|r| r.field)
}

/// A chronology violation inside the therapy-line list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineDateError {
    pub line_number: u32,
    pub message: &'static str,
}

/// Validates the metastatic therapy-line list.
///
/// Within a line: end date and progression date must not precede the line's
/// start date. Across lines: each line must start no earlier than the
/// previous line ended, and the first line must start no earlier than the
/// relapse date (falling back to the metastatic diagnosis date, then the
/// initial diagnosis date).
pub fn validate_lines(record: &ClinicalRecord) -> Vec<LineDateError> {
    let lines = record.therapy_lines(fields::METASTATIC_THERAPY_LINES);
    let mut errors = Vec::new();

    let phase_start = phase_start(record);

    let mut previous_end: Option<chrono::NaiveDate> = None;
    for (index, line) in lines.iter().enumerate() {
        check_line(line, &mut errors);

        if let (Some(start), Some(min)) = (line.start_date, phase_start) {
            if index == 0 && start < min {
                errors.push(LineDateError {
                    line_number: line.line_number,
                    message:
                        "First-line start date cannot be before the relapse or metastatic phase date",
                });
            }
        }
        if let (Some(start), Some(prev_end)) = (line.start_date, previous_end) {
            if index > 0 && start < prev_end {
                errors.push(LineDateError {
                    line_number: line.line_number,
                    message: "Line start date cannot be before the previous line's end date",
                });
            }
        }
        previous_end = line.end_date;
    }
    errors
}

fn phase_start(record: &ClinicalRecord) -> Option<chrono::NaiveDate> {
    record
        .date(fields::RELAPSE_DATE)
        .or_else(|| record.date(fields::METASTATIC_DIAGNOSIS_DATE))
        .or_else(|| record.date(fields::INITIAL_DIAGNOSIS_DATE))
}

/// The first-line chronology violation, if any.
///
/// This is the only line check that hard-blocks saving the metastatic
/// section; the other line violations stay advisory like the scalar rules.
pub fn first_line_conflict(record: &ClinicalRecord) -> Option<LineDateError> {
    let line = record.therapy_lines(fields::METASTATIC_THERAPY_LINES).first()?;
    let start = line.start_date?;
    let min = phase_start(record)?;
    (start < min).then(|| LineDateError {
        line_number: line.line_number,
        message: "First-line start date cannot be before the relapse or metastatic phase date",
    })
}

fn check_line(line: &TherapyLine, errors: &mut Vec<LineDateError>) {
    if let (Some(start), Some(end)) = (line.start_date, line.end_date) {
        if end < start {
            errors.push(LineDateError {
                line_number: line.line_number,
                message: "End date cannot be before the start date",
            });
        }
    }
    if let (Some(start), Some(progression)) = (line.start_date, line.progression_date) {
        if progression < start {
            errors.push(LineDateError {
                line_number: line.line_number,
                message: "Progression date cannot be before the line's start date",
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::FieldValue;
    use chrono::NaiveDate;
    use crf_types::RegistryType;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record_with(dates: &[(&str, NaiveDate)]) -> ClinicalRecord {
        let mut rec = ClinicalRecord::new(RegistryType::Ros1);
        for (field, date) in dates {
            rec.set(field, Some(FieldValue::Date(*date))).unwrap();
        }
        rec
    }

    #[test]
    fn test_before_rule_fires_when_value_precedes_comparison() {
        let rec = record_with(&[
            (fields::ALK_DIAGNOSIS_DATE, day(2020, 1, 1)),
            (fields::INITIAL_DIAGNOSIS_DATE, day(2020, 6, 1)),
        ]);
        let msg = validate(fields::ALK_DIAGNOSIS_DATE, &rec).expect("rule should fire");
        assert!(msg.contains("ALK diagnosis date"));
    }

    #[test]
    fn test_after_rule_fires_for_birth_date_past_diagnosis() {
        let rec = record_with(&[
            (fields::BIRTH_DATE, day(2021, 1, 1)),
            (fields::INITIAL_DIAGNOSIS_DATE, day(2020, 6, 1)),
        ]);
        assert!(validate(fields::BIRTH_DATE, &rec).is_some());
    }

    #[test]
    fn test_rule_skipped_when_either_endpoint_absent() {
        let rec = record_with(&[(fields::ALK_DIAGNOSIS_DATE, day(2020, 1, 1))]);
        assert_eq!(validate(fields::ALK_DIAGNOSIS_DATE, &rec), None);

        let rec = record_with(&[(fields::INITIAL_DIAGNOSIS_DATE, day(2020, 6, 1))]);
        assert_eq!(validate(fields::ALK_DIAGNOSIS_DATE, &rec), None);
    }

    #[test]
    fn test_same_day_does_not_fire() {
        let rec = record_with(&[
            (fields::PREVIOUS_THERAPY_END_DATE, day(2020, 3, 15)),
            (fields::PREVIOUS_THERAPY_START_DATE, day(2020, 3, 15)),
        ]);
        assert_eq!(validate(fields::PREVIOUS_THERAPY_END_DATE, &rec), None);
    }

    #[test]
    fn test_every_rule_fires_exactly_on_its_violation() {
        for rule in RULES {
            let rec = match rule.op {
                DateOp::Before => record_with(&[
                    (rule.field, day(2020, 1, 1)),
                    (rule.compared_to, day(2020, 2, 1)),
                ]),
                DateOp::After => record_with(&[
                    (rule.field, day(2020, 2, 1)),
                    (rule.compared_to, day(2020, 1, 1)),
                ]),
            };
            assert_eq!(
                validate(rule.field, &rec),
                Some(rule.message),
                "rule for {} should fire",
                rule.field
            );
        }
    }

    #[test]
    fn test_dependents_of_comparison_field() {
        let dependents: Vec<_> = dependents_of(fields::INITIAL_DIAGNOSIS_DATE).collect();
        assert!(dependents.contains(&fields::BIRTH_DATE));
        assert!(dependents.contains(&fields::ALK_DIAGNOSIS_DATE));
        assert!(dependents.contains(&fields::METASTATIC_DIAGNOSIS_DATE));
    }

    #[test]
    fn test_line_end_before_start_is_reported() {
        use crate::therapy::TherapyLine;
        let mut line = TherapyLine::empty(1);
        line.start_date = Some(day(2023, 5, 1));
        line.end_date = Some(day(2023, 4, 1));

        let mut rec = ClinicalRecord::new(RegistryType::Ros1);
        rec.set(
            fields::METASTATIC_THERAPY_LINES,
            Some(FieldValue::TherapyLines(vec![line])),
        )
        .unwrap();

        let errors = validate_lines(&rec);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].line_number, 1);
    }

    #[test]
    fn test_first_line_before_relapse_date_is_reported() {
        use crate::therapy::TherapyLine;
        let mut line = TherapyLine::empty(1);
        line.start_date = Some(day(2023, 1, 1));

        let mut rec = record_with(&[(fields::RELAPSE_DATE, day(2023, 3, 1))]);
        rec.set(
            fields::METASTATIC_THERAPY_LINES,
            Some(FieldValue::TherapyLines(vec![line])),
        )
        .unwrap();

        let errors = validate_lines(&rec);
        assert!(errors
            .iter()
            .any(|e| e.message.contains("First-line start date")));
    }

    #[test]
    fn test_first_line_conflict_ignores_other_line_violations() {
        use crate::therapy::TherapyLine;
        let mut line = TherapyLine::empty(1);
        line.start_date = Some(day(2023, 5, 1));
        line.end_date = Some(day(2023, 4, 1));

        let mut rec = record_with(&[(fields::METASTATIC_DIAGNOSIS_DATE, day(2023, 3, 1))]);
        rec.set(
            fields::METASTATIC_THERAPY_LINES,
            Some(FieldValue::TherapyLines(vec![line])),
        )
        .unwrap();

        // End-before-start is advisory only; the first line starts after the
        // metastatic phase date, so there is no hard conflict.
        assert!(first_line_conflict(&rec).is_none());
        assert_eq!(validate_lines(&rec).len(), 1);

        rec.set(
            fields::METASTATIC_DIAGNOSIS_DATE,
            Some(FieldValue::Date(day(2023, 6, 1))),
        )
            .unwrap();
        let conflict = first_line_conflict(&rec).expect("start precedes phase date");
        assert_eq!(conflict.line_number, 1);
    }

    #[test]
    fn test_line_overlap_with_previous_line_is_reported() {
        use crate::therapy::TherapyLine;
        let mut first = TherapyLine::empty(1);
        first.start_date = Some(day(2023, 1, 1));
        first.end_date = Some(day(2023, 6, 1));
        let mut second = TherapyLine::empty(2);
        second.start_date = Some(day(2023, 5, 1));

        let mut rec = ClinicalRecord::new(RegistryType::Ros1);
        rec.set(
            fields::METASTATIC_THERAPY_LINES,
            Some(FieldValue::TherapyLines(vec![first, second])),
        )
        .unwrap();

        let errors = validate_lines(&rec);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].line_number, 2);
    }
}
