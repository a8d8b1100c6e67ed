//! Cascading resets and auto-fills triggered by field edits.
//!
//! When a gating field is cleared or flipped off, its dependent answers are
//! stale and must be wiped in the same edit, not left behind to leak into a
//! later save. Rules are declarative: a trigger field, a condition on the
//! post-edit record, the fields to reset, and an optional flag to force.
//! [`apply`] returns every field it touched so the caller can mark them
//! dirty and re-validate them.

use crate::fields::{self, codes};
use crate::record::{ClinicalRecord, FieldValue};
use crate::FormResult;

/// Condition on the record *after* the triggering edit.
#[derive(Debug, Clone, Copy)]
pub enum Condition {
    /// The trigger flag is set to `true`.
    FlagSet,
    /// The trigger flag is anything but `true` (false or cleared).
    FlagCleared,
    /// The trigger multi-select contains the code.
    CodesContain(&'static str),
}

/// One cascade rule.
#[derive(Debug, Clone, Copy)]
pub struct CascadeRule {
    pub trigger: &'static str,
    pub condition: Condition,
    /// Fields wiped when the condition holds.
    pub resets: &'static [&'static str],
    /// A flag forced to a value when the condition holds.
    pub sets_flag: Option<(&'static str, bool)>,
}

pub const RULES: &[CascadeRule] = &[
    // Asserting "no previous therapy" wipes the whole prior-therapy block.
    CascadeRule {
        trigger: fields::NO_PREVIOUS_THERAPY,
        condition: Condition::FlagSet,
        resets: &[
            fields::HAD_PREVIOUS_THERAPY,
            fields::PREVIOUS_THERAPY_TYPES,
            fields::PREVIOUS_THERAPY_START_DATE,
            fields::PREVIOUS_THERAPY_END_DATE,
            fields::PREVIOUS_THERAPY_RESPONSE,
            fields::PREVIOUS_THERAPY_STOP_REASON,
        ],
        sets_flag: None,
    },
    // Selecting the CNS metastasis site implies CNS involvement.
    CascadeRule {
        trigger: fields::METASTASES_SITES,
        condition: Condition::CodesContain(codes::CNS),
        resets: &[],
        sets_flag: Some((fields::CNS_METASTASES, true)),
    },
    // Withdrawing CNS involvement wipes the CNS sub-answers.
    CascadeRule {
        trigger: fields::CNS_METASTASES,
        condition: Condition::FlagCleared,
        resets: &[
            fields::CNS_MEASURABLE,
            fields::CNS_SYMPTOMATIC,
            fields::CNS_RADIOTHERAPY,
            fields::INTRACRANIAL_RESPONSE,
        ],
        sets_flag: None,
    },
    CascadeRule {
        trigger: fields::HAD_TREATMENT_INTERRUPTION,
        condition: Condition::FlagCleared,
        resets: &[
            fields::INTERRUPTION_REASON,
            fields::INTERRUPTION_DURATION_MONTHS,
        ],
        sets_flag: None,
    },
    CascadeRule {
        trigger: fields::PROGRESSION_ON_NEXT_LINE,
        condition: Condition::FlagCleared,
        resets: &[
            fields::PROGRESSION_ON_NEXT_LINE_DATE,
            fields::NEXT_LINE_PROGRESSION_TYPE,
            fields::NEXT_LINE_PROGRESSION_SITES,
            fields::NEXT_LINE_PROGRESSION_SITES_OTHER_TEXT,
        ],
        sets_flag: None,
    },
    // Withdrawing "radical treatment conducted" wipes the whole subtree.
    CascadeRule {
        trigger: fields::RADICAL_TREATMENT_CONDUCTED,
        condition: Condition::FlagCleared,
        resets: &[
            fields::RADICAL_SURGERY_CONDUCTED,
            fields::RADICAL_SURGERY_DATE,
            fields::RADICAL_CRT_CONDUCTED,
            fields::RADICAL_CRT_START_DATE,
            fields::RADICAL_CRT_END_DATE,
            fields::RADICAL_CRT_CONSOLIDATION,
            fields::RADICAL_CRT_CONSOLIDATION_DRUG,
            fields::RADICAL_CRT_CONSOLIDATION_END_DATE,
            fields::RADICAL_PERIOPERATIVE_THERAPY,
            fields::RADICAL_TREATMENT_OUTCOME,
            fields::RELAPSE_DATE,
        ],
        sets_flag: None,
    },
    CascadeRule {
        trigger: fields::RADICAL_SURGERY_CONDUCTED,
        condition: Condition::FlagCleared,
        resets: &[fields::RADICAL_SURGERY_DATE],
        sets_flag: None,
    },
    CascadeRule {
        trigger: fields::RADICAL_CRT_CONDUCTED,
        condition: Condition::FlagCleared,
        resets: &[
            fields::RADICAL_CRT_START_DATE,
            fields::RADICAL_CRT_END_DATE,
            fields::RADICAL_CRT_CONSOLIDATION,
            fields::RADICAL_CRT_CONSOLIDATION_DRUG,
            fields::RADICAL_CRT_CONSOLIDATION_END_DATE,
        ],
        sets_flag: None,
    },
    CascadeRule {
        trigger: fields::RADICAL_CRT_CONSOLIDATION,
        condition: Condition::FlagCleared,
        resets: &[
            fields::RADICAL_CRT_CONSOLIDATION_DRUG,
            fields::RADICAL_CRT_CONSOLIDATION_END_DATE,
        ],
        sets_flag: None,
    },
];

fn condition_holds(condition: Condition, trigger: &str, record: &ClinicalRecord) -> bool {
    match condition {
        Condition::FlagSet => record.flag(trigger) == Some(true),
        Condition::FlagCleared => record.flag(trigger) != Some(true),
        Condition::CodesContain(code) => record.codes_contain(trigger, code),
    }
}

/// Runs every rule triggered by an edit of `edited`, after the edit has been
/// written to the record.
///
/// Returns the fields changed by the cascade (the edited field itself is not
/// included). Forced flags recurse: a cascade that flips a flag runs that
/// flag's own rules too.
pub fn apply(edited: &str, record: &mut ClinicalRecord) -> FormResult<Vec<&'static str>> {
    let mut touched = Vec::new();
    run_rules(edited, record, &mut touched)?;
    Ok(touched)
}

fn run_rules(
    edited: &str,
    record: &mut ClinicalRecord,
    touched: &mut Vec<&'static str>,
) -> FormResult<()> {
    for rule in RULES.iter().filter(|r| r.trigger == edited) {
        if !condition_holds(rule.condition, rule.trigger, record) {
            continue;
        }
        for field in rule.resets {
            if record.is_filled(field) {
                record.clear(field)?;
                touched.push(field);
            }
        }
        if let Some((flag, value)) = rule.sets_flag {
            if record.flag(flag) != Some(value) {
                record.set(flag, Some(FieldValue::Flag(value)))?;
                touched.push(flag);
                run_rules(flag, record, touched)?;
            }
        }
    }
    Ok(())
}
