//! Field identifiers and kinds for the clinical record.
//!
//! Every attribute a form can edit is declared here once, with its semantic
//! kind. The rest of the engine (schema tables, cascades, date rules,
//! progress counting, wire payloads) refers to fields exclusively through
//! these constants, so adding a field is a single-table change.

/// Semantic kind of a record field.
///
/// The kind determines how a value is validated on edit, how it counts
/// toward section completion, and how it travels in the wire payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Categorical code drawn from a dictionary category.
    Code,
    /// Free text.
    Text,
    /// Calendar date, day granularity.
    Date,
    /// Numeric value (integers included; the wire format does not distinguish).
    Number,
    /// Tri-state boolean: unset / true / false.
    Flag,
    /// Multi-select set of dictionary codes.
    Codes,
    /// Repeatable metastatic therapy-line list.
    TherapyLines,
    /// Repeatable perioperative therapy list.
    Perioperative,
}

// Shared across both registries.
pub const PATIENT_CODE: &str = "patient_code";
pub const DATE_FILLED: &str = "date_filled";
pub const CURRENT_STATUS: &str = "current_status";
pub const LAST_CONTACT_DATE: &str = "last_contact_date";
pub const GENDER: &str = "gender";
pub const BIRTH_DATE: &str = "birth_date";
pub const HEIGHT: &str = "height";
pub const WEIGHT: &str = "weight";
pub const COMORBIDITIES: &str = "comorbidities";
pub const COMORBIDITIES_OTHER_TEXT: &str = "comorbidities_other_text";
pub const SMOKING_STATUS: &str = "smoking_status";
pub const INITIAL_DIAGNOSIS_DATE: &str = "initial_diagnosis_date";
pub const TNM_STAGE: &str = "tnm_stage";
pub const METASTATIC_DISEASE_DATE: &str = "metastatic_disease_date";
pub const HISTOLOGY: &str = "histology";
pub const TP53_COMUTATION: &str = "tp53_comutation";
pub const TTF1_EXPRESSION: &str = "ttf1_expression";

// ALK molecular diagnostics.
pub const ALK_DIAGNOSIS_DATE: &str = "alk_diagnosis_date";
pub const ALK_METHODS: &str = "alk_methods";
pub const ALK_FUSION_VARIANT: &str = "alk_fusion_variant";

// Prior systemic therapy (ALK).
pub const HAD_PREVIOUS_THERAPY: &str = "had_previous_therapy";
pub const NO_PREVIOUS_THERAPY: &str = "no_previous_therapy";
pub const PREVIOUS_THERAPY_TYPES: &str = "previous_therapy_types";
pub const PREVIOUS_THERAPY_START_DATE: &str = "previous_therapy_start_date";
pub const PREVIOUS_THERAPY_END_DATE: &str = "previous_therapy_end_date";
pub const PREVIOUS_THERAPY_RESPONSE: &str = "previous_therapy_response";
pub const PREVIOUS_THERAPY_STOP_REASON: &str = "previous_therapy_stop_reason";

// Alectinib course (ALK).
pub const ALECTINIB_START_DATE: &str = "alectinib_start_date";
pub const STAGE_AT_ALECTINIB_START: &str = "stage_at_alectinib_start";
pub const ECOG_AT_START: &str = "ecog_at_start";
pub const METASTASES_SITES: &str = "metastases_sites";
pub const METASTASES_SITES_OTHER_TEXT: &str = "metastases_sites_other_text";
pub const CNS_METASTASES: &str = "cns_metastases";
pub const CNS_MEASURABLE: &str = "cns_measurable";
pub const CNS_SYMPTOMATIC: &str = "cns_symptomatic";
pub const CNS_RADIOTHERAPY: &str = "cns_radiotherapy";
pub const ALECTINIB_THERAPY_STATUS: &str = "alectinib_therapy_status";
pub const MAXIMUM_RESPONSE: &str = "maximum_response";
pub const EARLIEST_RESPONSE_DATE: &str = "earliest_response_date";
pub const INTRACRANIAL_RESPONSE: &str = "intracranial_response";
pub const PROGRESSION_DURING_ALECTINIB: &str = "progression_during_alectinib";
pub const LOCAL_TREATMENT_AT_PROGRESSION: &str = "local_treatment_at_progression";
pub const PROGRESSION_SITES: &str = "progression_sites";
pub const PROGRESSION_SITES_OTHER_TEXT: &str = "progression_sites_other_text";
pub const PROGRESSION_DATE: &str = "progression_date";
pub const CONTINUED_AFTER_PROGRESSION: &str = "continued_after_progression";
pub const ALECTINIB_END_DATE: &str = "alectinib_end_date";
pub const ALECTINIB_STOP_REASON: &str = "alectinib_stop_reason";
pub const HAD_TREATMENT_INTERRUPTION: &str = "had_treatment_interruption";
pub const INTERRUPTION_REASON: &str = "interruption_reason";
pub const INTERRUPTION_DURATION_MONTHS: &str = "interruption_duration_months";
pub const HAD_DOSE_REDUCTION: &str = "had_dose_reduction";

// Post-alectinib line (ALK).
pub const NEXT_LINE_TREATMENTS: &str = "next_line_treatments";
pub const NEXT_LINE_TREATMENTS_OTHER_TEXT: &str = "next_line_treatments_other_text";
pub const NEXT_LINE_START_DATE: &str = "next_line_start_date";
pub const NEXT_LINE_END_DATE: &str = "next_line_end_date";
pub const PROGRESSION_ON_NEXT_LINE: &str = "progression_on_next_line";
pub const PROGRESSION_ON_NEXT_LINE_DATE: &str = "progression_on_next_line_date";
pub const NEXT_LINE_PROGRESSION_TYPE: &str = "next_line_progression_type";
pub const NEXT_LINE_PROGRESSION_SITES: &str = "next_line_progression_sites";
pub const NEXT_LINE_PROGRESSION_SITES_OTHER_TEXT: &str = "next_line_progression_sites_other_text";
pub const TOTAL_LINES_AFTER_ALECTINIB: &str = "total_lines_after_alectinib";

// ROS1 diagnostics and biomarkers.
pub const ROS1_FUSION_VARIANT: &str = "ros1_fusion_variant";
pub const PDL1_STATUS: &str = "pdl1_status";
pub const PDL1_TPS: &str = "pdl1_tps";

// Radical treatment (ROS1).
pub const RADICAL_TREATMENT_CONDUCTED: &str = "radical_treatment_conducted";
pub const RADICAL_SURGERY_CONDUCTED: &str = "radical_surgery_conducted";
pub const RADICAL_SURGERY_DATE: &str = "radical_surgery_date";
pub const RADICAL_CRT_CONDUCTED: &str = "radical_crt_conducted";
pub const RADICAL_CRT_START_DATE: &str = "radical_crt_start_date";
pub const RADICAL_CRT_END_DATE: &str = "radical_crt_end_date";
pub const RADICAL_CRT_CONSOLIDATION: &str = "radical_crt_consolidation";
pub const RADICAL_CRT_CONSOLIDATION_DRUG: &str = "radical_crt_consolidation_drug";
pub const RADICAL_CRT_CONSOLIDATION_END_DATE: &str = "radical_crt_consolidation_end_date";
pub const RADICAL_PERIOPERATIVE_THERAPY: &str = "radical_perioperative_therapy";
pub const RADICAL_TREATMENT_OUTCOME: &str = "radical_treatment_outcome";
pub const RELAPSE_DATE: &str = "relapse_date";

// Metastatic phase (ROS1).
pub const METASTATIC_DIAGNOSIS_DATE: &str = "metastatic_diagnosis_date";
pub const METASTATIC_THERAPY_LINES: &str = "metastatic_therapy_lines";

/// Well-known dictionary codes the engine branches on.
pub mod codes {
    /// Central nervous system metastasis site.
    pub const CNS: &str = "CNS";
    /// Multi-select sentinel requiring a companion free-text field.
    pub const OTHER: &str = "OTHER";
    /// Targeted therapy has been stopped.
    pub const STOPPED: &str = "STOPPED";
    /// Radical treatment outcome: disease relapsed.
    pub const RELAPSE: &str = "RELAPSE";
    /// PD-L1 status was not assessed.
    pub const UNKNOWN: &str = "UNKNOWN";
    /// No progression observed.
    pub const NONE: &str = "NONE";
    /// Platinum agents that turn a two-drug regimen into a platinum doublet.
    pub const CISPLATIN: &str = "CISPLATIN";
    pub const CARBOPLATIN: &str = "CARBOPLATIN";
    /// Drug catalog parent classes.
    pub const CHEMOTHERAPY: &str = "CHEMOTHERAPY";
    pub const IMMUNOTHERAPY: &str = "IMMUNOTHERAPY";
    pub const TARGETED: &str = "TARGETED";
}

/// The full field table: one entry per record attribute.
const FIELD_TABLE: &[(&str, FieldKind)] = &[
    (PATIENT_CODE, FieldKind::Text),
    (DATE_FILLED, FieldKind::Date),
    (CURRENT_STATUS, FieldKind::Code),
    (LAST_CONTACT_DATE, FieldKind::Date),
    (GENDER, FieldKind::Code),
    (BIRTH_DATE, FieldKind::Date),
    (HEIGHT, FieldKind::Number),
    (WEIGHT, FieldKind::Number),
    (COMORBIDITIES, FieldKind::Codes),
    (COMORBIDITIES_OTHER_TEXT, FieldKind::Text),
    (SMOKING_STATUS, FieldKind::Code),
    (INITIAL_DIAGNOSIS_DATE, FieldKind::Date),
    (TNM_STAGE, FieldKind::Code),
    (METASTATIC_DISEASE_DATE, FieldKind::Date),
    (HISTOLOGY, FieldKind::Code),
    (TP53_COMUTATION, FieldKind::Code),
    (TTF1_EXPRESSION, FieldKind::Code),
    (ALK_DIAGNOSIS_DATE, FieldKind::Date),
    (ALK_METHODS, FieldKind::Codes),
    (ALK_FUSION_VARIANT, FieldKind::Code),
    (HAD_PREVIOUS_THERAPY, FieldKind::Flag),
    (NO_PREVIOUS_THERAPY, FieldKind::Flag),
    (PREVIOUS_THERAPY_TYPES, FieldKind::Codes),
    (PREVIOUS_THERAPY_START_DATE, FieldKind::Date),
    (PREVIOUS_THERAPY_END_DATE, FieldKind::Date),
    (PREVIOUS_THERAPY_RESPONSE, FieldKind::Code),
    (PREVIOUS_THERAPY_STOP_REASON, FieldKind::Code),
    (ALECTINIB_START_DATE, FieldKind::Date),
    (STAGE_AT_ALECTINIB_START, FieldKind::Code),
    (ECOG_AT_START, FieldKind::Number),
    (METASTASES_SITES, FieldKind::Codes),
    (METASTASES_SITES_OTHER_TEXT, FieldKind::Text),
    (CNS_METASTASES, FieldKind::Flag),
    (CNS_MEASURABLE, FieldKind::Code),
    (CNS_SYMPTOMATIC, FieldKind::Code),
    (CNS_RADIOTHERAPY, FieldKind::Code),
    (ALECTINIB_THERAPY_STATUS, FieldKind::Code),
    (MAXIMUM_RESPONSE, FieldKind::Code),
    (EARLIEST_RESPONSE_DATE, FieldKind::Date),
    (INTRACRANIAL_RESPONSE, FieldKind::Code),
    (PROGRESSION_DURING_ALECTINIB, FieldKind::Code),
    (LOCAL_TREATMENT_AT_PROGRESSION, FieldKind::Code),
    (PROGRESSION_SITES, FieldKind::Codes),
    (PROGRESSION_SITES_OTHER_TEXT, FieldKind::Text),
    (PROGRESSION_DATE, FieldKind::Date),
    (CONTINUED_AFTER_PROGRESSION, FieldKind::Flag),
    (ALECTINIB_END_DATE, FieldKind::Date),
    (ALECTINIB_STOP_REASON, FieldKind::Code),
    (HAD_TREATMENT_INTERRUPTION, FieldKind::Flag),
    (INTERRUPTION_REASON, FieldKind::Code),
    (INTERRUPTION_DURATION_MONTHS, FieldKind::Number),
    (HAD_DOSE_REDUCTION, FieldKind::Flag),
    (NEXT_LINE_TREATMENTS, FieldKind::Codes),
    (NEXT_LINE_TREATMENTS_OTHER_TEXT, FieldKind::Text),
    (NEXT_LINE_START_DATE, FieldKind::Date),
    (NEXT_LINE_END_DATE, FieldKind::Date),
    (PROGRESSION_ON_NEXT_LINE, FieldKind::Flag),
    (PROGRESSION_ON_NEXT_LINE_DATE, FieldKind::Date),
    (NEXT_LINE_PROGRESSION_TYPE, FieldKind::Code),
    (NEXT_LINE_PROGRESSION_SITES, FieldKind::Codes),
    (NEXT_LINE_PROGRESSION_SITES_OTHER_TEXT, FieldKind::Text),
    (TOTAL_LINES_AFTER_ALECTINIB, FieldKind::Number),
    (ROS1_FUSION_VARIANT, FieldKind::Code),
    (PDL1_STATUS, FieldKind::Code),
    (PDL1_TPS, FieldKind::Number),
    (RADICAL_TREATMENT_CONDUCTED, FieldKind::Flag),
    (RADICAL_SURGERY_CONDUCTED, FieldKind::Flag),
    (RADICAL_SURGERY_DATE, FieldKind::Date),
    (RADICAL_CRT_CONDUCTED, FieldKind::Flag),
    (RADICAL_CRT_START_DATE, FieldKind::Date),
    (RADICAL_CRT_END_DATE, FieldKind::Date),
    (RADICAL_CRT_CONSOLIDATION, FieldKind::Flag),
    (RADICAL_CRT_CONSOLIDATION_DRUG, FieldKind::Text),
    (RADICAL_CRT_CONSOLIDATION_END_DATE, FieldKind::Date),
    (RADICAL_PERIOPERATIVE_THERAPY, FieldKind::Perioperative),
    (RADICAL_TREATMENT_OUTCOME, FieldKind::Code),
    (RELAPSE_DATE, FieldKind::Date),
    (METASTATIC_DIAGNOSIS_DATE, FieldKind::Date),
    (METASTATIC_THERAPY_LINES, FieldKind::TherapyLines),
];

/// Returns the kind of a field, or `None` for an unknown id.
pub fn kind(field: &str) -> Option<FieldKind> {
    FIELD_TABLE
        .iter()
        .find(|(id, _)| *id == field)
        .map(|(_, k)| *k)
}

/// Resolves a field id to its canonical `'static` form.
///
/// Edits arrive from the embedding shell as borrowed strings; interning them
/// against the field table lets the rest of the engine key maps and dirty
/// sets by `&'static str`.
pub fn canonical(field: &str) -> Option<&'static str> {
    FIELD_TABLE
        .iter()
        .find(|(id, _)| *id == field)
        .map(|(id, _)| *id)
}

/// All declared field ids, in table order.
pub fn all() -> impl Iterator<Item = &'static str> {
    FIELD_TABLE.iter().map(|(id, _)| *id)
}
