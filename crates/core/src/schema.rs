//! Per-registry form schemas: sections, visibility, and required rules.
//!
//! The two registries share an engine but not a schema. Each schema is a
//! declarative table of [`Section`]s; the registry type is a lookup key here
//! and nowhere else — no call site branches on it again. Visibility and
//! required-ness are predicates over the *live* record and are re-evaluated
//! on every query, never cached, because upstream edits (e.g. toggling "no
//! previous therapy") change which sections and fields are relevant.

use crate::fields::{self, codes};
use crate::record::ClinicalRecord;
use crf_types::RegistryType;

/// How a section decides it is "required-satisfied".
///
/// Most sections use the generic rule: every required field that is
/// currently visible must be filled. A few carry compound predicates that
/// cannot be expressed as a field list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequiredRule {
    /// All visible fields in `required_fields` are filled.
    Fields,
    /// Satisfied by "no previous therapy", or by a fully described therapy.
    PriorTherapy,
    /// Satisfied by "not conducted", or by at least one documented modality.
    RadicalTreatment,
    /// Trivially satisfied unless targeted therapy has been stopped.
    NextLine,
}

/// One named, orderable group of fields in the form.
pub struct Section {
    pub id: &'static str,
    pub title: &'static str,
    /// Every field counting toward the completion percentage.
    pub full_fields: &'static [&'static str],
    /// Fields feeding the generic required rule. Hidden fields are skipped.
    pub required_fields: &'static [&'static str],
    pub visible: fn(&ClinicalRecord) -> bool,
    pub required: RequiredRule,
}

impl std::fmt::Debug for Section {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Section")
            .field("id", &self.id)
            .field("required", &self.required)
            .finish()
    }
}

fn always(_: &ClinicalRecord) -> bool {
    true
}

fn alectinib_stopped(record: &ClinicalRecord) -> bool {
    record.code_is(fields::ALECTINIB_THERAPY_STATUS, codes::STOPPED)
}

static ALK_SECTIONS: &[Section] = &[
    Section {
        id: "current-status",
        title: "Current status",
        full_fields: &[fields::CURRENT_STATUS, fields::LAST_CONTACT_DATE],
        required_fields: &[fields::CURRENT_STATUS],
        visible: always,
        required: RequiredRule::Fields,
    },
    Section {
        id: "patient-basic",
        title: "Patient code and basic data",
        full_fields: &[
            fields::PATIENT_CODE,
            fields::DATE_FILLED,
            fields::GENDER,
            fields::BIRTH_DATE,
            fields::HEIGHT,
            fields::WEIGHT,
            fields::COMORBIDITIES,
            fields::SMOKING_STATUS,
        ],
        required_fields: &[fields::GENDER, fields::BIRTH_DATE],
        visible: always,
        required: RequiredRule::Fields,
    },
    Section {
        id: "diagnosis-alk",
        title: "Diagnosis and ALK testing",
        full_fields: &[
            fields::INITIAL_DIAGNOSIS_DATE,
            fields::TNM_STAGE,
            fields::METASTATIC_DISEASE_DATE,
            fields::HISTOLOGY,
            fields::ALK_DIAGNOSIS_DATE,
            fields::ALK_METHODS,
            fields::ALK_FUSION_VARIANT,
            fields::TP53_COMUTATION,
            fields::TTF1_EXPRESSION,
        ],
        required_fields: &[fields::INITIAL_DIAGNOSIS_DATE, fields::ALK_DIAGNOSIS_DATE],
        visible: always,
        required: RequiredRule::Fields,
    },
    Section {
        id: "previous-therapy",
        title: "Previous systemic therapy",
        full_fields: &[
            fields::NO_PREVIOUS_THERAPY,
            fields::HAD_PREVIOUS_THERAPY,
            fields::PREVIOUS_THERAPY_TYPES,
            fields::PREVIOUS_THERAPY_START_DATE,
            fields::PREVIOUS_THERAPY_END_DATE,
            fields::PREVIOUS_THERAPY_RESPONSE,
            fields::PREVIOUS_THERAPY_STOP_REASON,
        ],
        required_fields: &[
            fields::PREVIOUS_THERAPY_TYPES,
            fields::PREVIOUS_THERAPY_START_DATE,
            fields::PREVIOUS_THERAPY_END_DATE,
            fields::PREVIOUS_THERAPY_RESPONSE,
            fields::PREVIOUS_THERAPY_STOP_REASON,
        ],
        visible: always,
        required: RequiredRule::PriorTherapy,
    },
    Section {
        id: "alectinib-complete",
        title: "Alectinib treatment",
        full_fields: &[
            fields::ALECTINIB_START_DATE,
            fields::STAGE_AT_ALECTINIB_START,
            fields::ALECTINIB_THERAPY_STATUS,
            fields::ECOG_AT_START,
            fields::METASTASES_SITES,
            fields::CNS_METASTASES,
            fields::MAXIMUM_RESPONSE,
            fields::EARLIEST_RESPONSE_DATE,
            fields::PROGRESSION_DURING_ALECTINIB,
        ],
        required_fields: &[fields::ALECTINIB_START_DATE, fields::ALECTINIB_THERAPY_STATUS],
        visible: always,
        required: RequiredRule::Fields,
    },
    Section {
        id: "next-line",
        title: "Next line of therapy",
        full_fields: &[
            fields::NEXT_LINE_TREATMENTS,
            fields::NEXT_LINE_START_DATE,
            fields::PROGRESSION_ON_NEXT_LINE,
            fields::NEXT_LINE_END_DATE,
            fields::TOTAL_LINES_AFTER_ALECTINIB,
        ],
        required_fields: &[fields::NEXT_LINE_TREATMENTS, fields::NEXT_LINE_START_DATE],
        visible: alectinib_stopped,
        required: RequiredRule::NextLine,
    },
];

static ROS1_SECTIONS: &[Section] = &[
    Section {
        id: "current-status",
        title: "Current status",
        full_fields: &[fields::CURRENT_STATUS, fields::LAST_CONTACT_DATE],
        required_fields: &[fields::CURRENT_STATUS],
        visible: always,
        required: RequiredRule::Fields,
    },
    Section {
        id: "patient-basic",
        title: "Basic data",
        full_fields: &[
            fields::PATIENT_CODE,
            fields::DATE_FILLED,
            fields::GENDER,
            fields::BIRTH_DATE,
            fields::HEIGHT,
            fields::WEIGHT,
            fields::COMORBIDITIES,
            fields::SMOKING_STATUS,
        ],
        required_fields: &[fields::GENDER, fields::BIRTH_DATE],
        visible: always,
        required: RequiredRule::Fields,
    },
    Section {
        id: "diagnosis-ros1",
        title: "Diagnosis and ROS1 testing",
        full_fields: &[
            fields::INITIAL_DIAGNOSIS_DATE,
            fields::TNM_STAGE,
            fields::HISTOLOGY,
            fields::ROS1_FUSION_VARIANT,
            fields::TP53_COMUTATION,
            fields::TTF1_EXPRESSION,
        ],
        required_fields: &[fields::INITIAL_DIAGNOSIS_DATE, fields::ROS1_FUSION_VARIANT],
        visible: always,
        required: RequiredRule::Fields,
    },
    Section {
        id: "pdl1-status",
        title: "PD-L1 status",
        full_fields: &[fields::PDL1_STATUS, fields::PDL1_TPS],
        // PD-L1 TPS is hidden (and therefore not required) until a known
        // status is chosen; the generic rule then demands it.
        required_fields: &[fields::PDL1_STATUS, fields::PDL1_TPS],
        visible: always,
        required: RequiredRule::Fields,
    },
    Section {
        id: "radical-treatment",
        title: "Radical treatment",
        full_fields: &[
            fields::RADICAL_TREATMENT_CONDUCTED,
            fields::RADICAL_SURGERY_CONDUCTED,
            fields::RADICAL_SURGERY_DATE,
            fields::RADICAL_CRT_CONDUCTED,
            fields::RADICAL_CRT_START_DATE,
            fields::RADICAL_CRT_END_DATE,
            fields::RADICAL_CRT_CONSOLIDATION,
            fields::RADICAL_PERIOPERATIVE_THERAPY,
            fields::RADICAL_TREATMENT_OUTCOME,
            fields::RELAPSE_DATE,
        ],
        required_fields: &[],
        visible: always,
        required: RequiredRule::RadicalTreatment,
    },
    Section {
        id: "metastatic-therapy",
        title: "Metastatic therapy lines",
        full_fields: &[fields::METASTATIC_DIAGNOSIS_DATE, fields::METASTATIC_THERAPY_LINES],
        required_fields: &[fields::METASTATIC_DIAGNOSIS_DATE, fields::METASTATIC_THERAPY_LINES],
        visible: always,
        required: RequiredRule::Fields,
    },
];

/// The ordered section list for a registry.
pub fn sections(registry: RegistryType) -> &'static [Section] {
    match registry {
        RegistryType::Alk => ALK_SECTIONS,
        RegistryType::Ros1 => ROS1_SECTIONS,
    }
}

/// Looks up a section by id within a registry's schema.
pub fn section(registry: RegistryType, id: &str) -> Option<&'static Section> {
    sections(registry).iter().find(|s| s.id == id)
}

/// Whether a field is currently shown, given the record's sibling values.
///
/// A field hidden here never blocks section completion, even when it appears
/// in a required list.
pub fn field_visible(record: &ClinicalRecord, field: &str) -> bool {
    let flag = |f: &str| record.flag(f) == Some(true);
    match field {
        // Prior-therapy details appear only once a therapy is asserted.
        fields::HAD_PREVIOUS_THERAPY => record.flag(fields::NO_PREVIOUS_THERAPY) != Some(true),
        fields::PREVIOUS_THERAPY_TYPES
        | fields::PREVIOUS_THERAPY_START_DATE
        | fields::PREVIOUS_THERAPY_END_DATE
        | fields::PREVIOUS_THERAPY_RESPONSE
        | fields::PREVIOUS_THERAPY_STOP_REASON => {
            record.flag(fields::NO_PREVIOUS_THERAPY) != Some(true)
                && flag(fields::HAD_PREVIOUS_THERAPY)
        }

        // CNS sub-fields require the CNS-involvement flag.
        fields::CNS_MEASURABLE
        | fields::CNS_SYMPTOMATIC
        | fields::CNS_RADIOTHERAPY
        | fields::INTRACRANIAL_RESPONSE => flag(fields::CNS_METASTASES),

        // TPS is asked only for a known PD-L1 status.
        fields::PDL1_TPS => record
            .code(fields::PDL1_STATUS)
            .map(|c| c.as_str() != codes::UNKNOWN)
            .unwrap_or(false),

        // Progression details appear once progression is recorded.
        fields::LOCAL_TREATMENT_AT_PROGRESSION
        | fields::PROGRESSION_SITES
        | fields::PROGRESSION_DATE
        | fields::CONTINUED_AFTER_PROGRESSION => record
            .code(fields::PROGRESSION_DURING_ALECTINIB)
            .map(|c| c.as_str() != codes::NONE)
            .unwrap_or(false),

        // End-of-treatment block is only relevant once therapy stopped.
        fields::ALECTINIB_END_DATE
        | fields::ALECTINIB_STOP_REASON
        | fields::HAD_TREATMENT_INTERRUPTION
        | fields::HAD_DOSE_REDUCTION => {
            record.code_is(fields::ALECTINIB_THERAPY_STATUS, codes::STOPPED)
        }
        fields::INTERRUPTION_REASON | fields::INTERRUPTION_DURATION_MONTHS => {
            flag(fields::HAD_TREATMENT_INTERRUPTION)
        }

        // Radical-treatment sub-trees.
        fields::RADICAL_SURGERY_CONDUCTED
        | fields::RADICAL_CRT_CONDUCTED
        | fields::RADICAL_PERIOPERATIVE_THERAPY
        | fields::RADICAL_TREATMENT_OUTCOME => flag(fields::RADICAL_TREATMENT_CONDUCTED),
        fields::RADICAL_SURGERY_DATE => {
            flag(fields::RADICAL_TREATMENT_CONDUCTED) && flag(fields::RADICAL_SURGERY_CONDUCTED)
        }
        fields::RADICAL_CRT_START_DATE
        | fields::RADICAL_CRT_END_DATE
        | fields::RADICAL_CRT_CONSOLIDATION => {
            flag(fields::RADICAL_TREATMENT_CONDUCTED) && flag(fields::RADICAL_CRT_CONDUCTED)
        }
        fields::RADICAL_CRT_CONSOLIDATION_DRUG | fields::RADICAL_CRT_CONSOLIDATION_END_DATE => {
            flag(fields::RADICAL_CRT_CONDUCTED) && flag(fields::RADICAL_CRT_CONSOLIDATION)
        }
        fields::RELAPSE_DATE => {
            record.code_is(fields::RADICAL_TREATMENT_OUTCOME, codes::RELAPSE)
        }

        // Next-line progression details.
        fields::PROGRESSION_ON_NEXT_LINE_DATE
        | fields::NEXT_LINE_PROGRESSION_TYPE
        | fields::NEXT_LINE_PROGRESSION_SITES => flag(fields::PROGRESSION_ON_NEXT_LINE),

        // `OTHER` sentinel unlocks the companion free-text field.
        fields::METASTASES_SITES_OTHER_TEXT => {
            record.codes_contain(fields::METASTASES_SITES, codes::OTHER)
        }
        fields::PROGRESSION_SITES_OTHER_TEXT => {
            record.codes_contain(fields::PROGRESSION_SITES, codes::OTHER)
        }
        fields::NEXT_LINE_PROGRESSION_SITES_OTHER_TEXT => {
            record.codes_contain(fields::NEXT_LINE_PROGRESSION_SITES, codes::OTHER)
        }
        fields::NEXT_LINE_TREATMENTS_OTHER_TEXT => {
            record.codes_contain(fields::NEXT_LINE_TREATMENTS, codes::OTHER)
        }
        fields::COMORBIDITIES_OTHER_TEXT => {
            record.codes_contain(fields::COMORBIDITIES, codes::OTHER)
        }

        _ => true,
    }
}

/// Evaluates a section's required predicate against the record.
pub fn required_met(section: &Section, record: &ClinicalRecord) -> bool {
    match section.required {
        RequiredRule::Fields => visible_required_filled(section, record),
        RequiredRule::PriorTherapy => {
            if record.flag(fields::NO_PREVIOUS_THERAPY) == Some(true) {
                return true;
            }
            record.flag(fields::HAD_PREVIOUS_THERAPY) == Some(true)
                && visible_required_filled(section, record)
        }
        RequiredRule::RadicalTreatment => match record.flag(fields::RADICAL_TREATMENT_CONDUCTED) {
            Some(false) => true,
            Some(true) => {
                let surgery = record.flag(fields::RADICAL_SURGERY_CONDUCTED) == Some(true)
                    && record.is_filled(fields::RADICAL_SURGERY_DATE);
                let chemoradiation = record.flag(fields::RADICAL_CRT_CONDUCTED) == Some(true)
                    && record.is_filled(fields::RADICAL_CRT_START_DATE);
                let perioperative =
                    !record.perioperative(fields::RADICAL_PERIOPERATIVE_THERAPY).is_empty();
                surgery || chemoradiation || perioperative
            }
            None => false,
        },
        RequiredRule::NextLine => {
            if !record.code_is(fields::ALECTINIB_THERAPY_STATUS, codes::STOPPED) {
                return true;
            }
            visible_required_filled(section, record)
        }
    }
}

fn visible_required_filled(section: &Section, record: &ClinicalRecord) -> bool {
    section
        .required_fields
        .iter()
        .filter(|f| field_visible(record, f))
        .all(|f| record.is_filled(f))
}
