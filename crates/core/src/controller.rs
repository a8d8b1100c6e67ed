//! The form controller: a pure state machine over the clinical record.
//!
//! Every user interaction is an [`Action`]; [`FormState::apply`] mutates the
//! in-memory state and returns the [`Command`]s the embedding shell must
//! execute (schedule an autosave, persist the record). The controller never
//! performs IO itself, which keeps every rule — cascades, date checks,
//! advance gates — testable without a store or a clock.

use crate::dates::{self, LineDateError};
use crate::dictionary::DrugCatalog;
use crate::fields::{self, codes, FieldKind};
use crate::payload::{self, Payload};
use crate::progress::{self, SectionProgress};
use crate::record::{ClinicalRecord, FieldValue};
use crate::schema::{self, Section};
use crate::store::RecordId;
use crate::therapy::{self, PerioperativeTherapy, TherapyLine};
use crate::{FormError, FormResult};
use crf_types::RegistryType;
use std::collections::{BTreeMap, BTreeSet};

/// A user interaction with the form.
#[derive(Debug, Clone)]
pub enum Action {
    /// Set or clear one field. `None` clears.
    Edit {
        field: String,
        value: Option<FieldValue>,
    },
    /// Append an empty metastatic therapy line.
    AppendLine,
    /// Remove the line at `index`; later lines renumber.
    RemoveLine { index: usize },
    /// Replace the line at `index`. Its number is preserved and its therapy
    /// reclassified.
    UpdateLine { index: usize, line: TherapyLine },
    AppendPerioperative,
    RemovePerioperative { index: usize },
    UpdatePerioperative {
        index: usize,
        entry: PerioperativeTherapy,
    },
    /// Jump to a visible section without validation.
    SelectSection { id: String },
    /// Validate the current section's gates and request a save.
    Advance,
}

/// Side effect requested from the embedding shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// (Re)arm the debounced autosave timer.
    ScheduleAutosave,
    /// Create the record in the store; the state has no id yet.
    PersistCreate,
    /// Save the full record, then call [`FormState::complete_advance`].
    PersistFull,
}

/// Where the cursor landed after a successful save-and-advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceOutcome {
    MovedTo(&'static str),
    /// The completed section was the last visible one.
    WorkflowComplete,
}

/// One sidebar row.
#[derive(Debug, Clone)]
pub struct SectionOverview {
    pub id: &'static str,
    pub title: &'static str,
    pub progress: SectionProgress,
}

/// The live editing state of one record.
#[derive(Debug)]
pub struct FormState {
    record: ClinicalRecord,
    record_id: Option<RecordId>,
    cursor: usize,
    errors: BTreeMap<String, String>,
    dirty: BTreeSet<&'static str>,
    catalog: DrugCatalog,
}

impl FormState {
    /// A fresh, unsaved record.
    pub fn new(registry: RegistryType, catalog: DrugCatalog) -> Self {
        Self {
            record: ClinicalRecord::new(registry),
            record_id: None,
            cursor: 0,
            errors: BTreeMap::new(),
            dirty: BTreeSet::new(),
            catalog,
        }
    }

    /// Rebuilds state from a stored payload.
    ///
    /// Stored derived therapy codes may predate the current drug catalog, so
    /// every embedded selection is reclassified. All date rules are evaluated
    /// up front so pre-existing inconsistencies surface immediately.
    pub fn load(
        registry: RegistryType,
        record_id: RecordId,
        stored: &Payload,
        catalog: DrugCatalog,
    ) -> Self {
        let mut record = payload::from_payload(registry, stored);
        reclassify_lists(&mut record, &catalog);
        let mut state = Self {
            record,
            record_id: Some(record_id),
            cursor: 0,
            errors: BTreeMap::new(),
            dirty: BTreeSet::new(),
            catalog,
        };
        for field in fields::all() {
            state.revalidate_field(field);
        }
        state.refresh_line_errors();
        state
    }

    pub fn record(&self) -> &ClinicalRecord {
        &self.record
    }

    pub fn record_id(&self) -> Option<RecordId> {
        self.record_id
    }

    pub fn set_record_id(&mut self, id: RecordId) {
        self.record_id = Some(id);
    }

    pub fn catalog(&self) -> &DrugCatalog {
        &self.catalog
    }

    /// The advisory validation errors, keyed by field id (line errors use
    /// `metastatic_therapy_lines.N`).
    pub fn validation_errors(&self) -> &BTreeMap<String, String> {
        &self.errors
    }

    pub fn current_section(&self) -> &'static Section {
        &schema::sections(self.record.registry())[self.cursor]
    }

    /// The sidebar: every currently visible section with its progress.
    pub fn section_list(&self) -> Vec<SectionOverview> {
        schema::sections(self.record.registry())
            .iter()
            .filter(|s| (s.visible)(&self.record))
            .map(|s| SectionOverview {
                id: s.id,
                title: s.title,
                progress: progress::compute(s, &self.record),
            })
            .collect()
    }

    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    /// Drains the dirty set for an autosave patch.
    pub fn take_dirty(&mut self) -> BTreeSet<&'static str> {
        std::mem::take(&mut self.dirty)
    }

    /// Re-marks fields dirty after a failed save, so nothing is lost.
    pub fn restore_dirty(&mut self, fields: BTreeSet<&'static str>) {
        self.dirty.extend(fields);
    }

    /// Applies one action, returning the commands for the shell.
    pub fn apply(&mut self, action: Action) -> FormResult<Vec<Command>> {
        match action {
            Action::Edit { field, value } => {
                // The repeatable lists are managed through the list actions,
                // which keep line numbers contiguous; a wholesale write
                // could smuggle in arbitrary numbering.
                let id = fields::canonical(&field)
                    .ok_or_else(|| FormError::UnknownField(field.clone()))?;
                if matches!(
                    fields::kind(id),
                    Some(FieldKind::TherapyLines | FieldKind::Perioperative)
                ) {
                    return Err(FormError::InvalidInput(format!(
                        "field '{id}' is list-managed, use the list actions"
                    )));
                }
                self.record.set(id, value)?;
                self.after_edit(id)?;
                Ok(vec![Command::ScheduleAutosave])
            }
            Action::AppendLine => {
                let mut lines = self.record.therapy_lines(fields::METASTATIC_THERAPY_LINES).to_vec();
                lines.push(TherapyLine::empty(lines.len() as u32 + 1));
                self.write_lines(lines)
            }
            Action::RemoveLine { index } => {
                let mut lines = self.record.therapy_lines(fields::METASTATIC_THERAPY_LINES).to_vec();
                if index >= lines.len() {
                    return Err(FormError::InvalidInput(format!(
                        "no therapy line at index {index}"
                    )));
                }
                lines.remove(index);
                therapy::renumber(&mut lines);
                self.write_lines(lines)
            }
            Action::UpdateLine { index, line } => {
                let mut lines = self.record.therapy_lines(fields::METASTATIC_THERAPY_LINES).to_vec();
                let slot = lines.get_mut(index).ok_or_else(|| {
                    FormError::InvalidInput(format!("no therapy line at index {index}"))
                })?;
                *slot = line;
                slot.line_number = index as u32 + 1;
                slot.therapy.reclassify(&self.catalog);
                self.write_lines(lines)
            }
            Action::AppendPerioperative => {
                let mut entries = self
                    .record
                    .perioperative(fields::RADICAL_PERIOPERATIVE_THERAPY)
                    .to_vec();
                entries.push(PerioperativeTherapy::empty());
                self.write_perioperative(entries)
            }
            Action::RemovePerioperative { index } => {
                let mut entries = self
                    .record
                    .perioperative(fields::RADICAL_PERIOPERATIVE_THERAPY)
                    .to_vec();
                if index >= entries.len() {
                    return Err(FormError::InvalidInput(format!(
                        "no perioperative entry at index {index}"
                    )));
                }
                entries.remove(index);
                self.write_perioperative(entries)
            }
            Action::UpdatePerioperative { index, entry } => {
                let mut entries = self
                    .record
                    .perioperative(fields::RADICAL_PERIOPERATIVE_THERAPY)
                    .to_vec();
                let slot = entries.get_mut(index).ok_or_else(|| {
                    FormError::InvalidInput(format!("no perioperative entry at index {index}"))
                })?;
                *slot = entry;
                slot.therapy.reclassify(&self.catalog);
                self.write_perioperative(entries)
            }
            Action::SelectSection { id } => {
                let sections = schema::sections(self.record.registry());
                let index = sections
                    .iter()
                    .position(|s| s.id == id && (s.visible)(&self.record))
                    .ok_or(FormError::UnknownSection(id))?;
                self.cursor = index;
                Ok(Vec::new())
            }
            Action::Advance => {
                let missing = self.advance_blockers();
                if !missing.is_empty() {
                    return Err(FormError::RequiredFieldMissing(missing.join(", ")));
                }
                Ok(vec![if self.record_id.is_none() {
                    Command::PersistCreate
                } else {
                    Command::PersistFull
                }])
            }
        }
    }

    /// Moves the cursor past the section just saved.
    ///
    /// Called by the shell after the [`Command::PersistCreate`] or
    /// [`Command::PersistFull`] requested by `Advance` has succeeded. Hidden
    /// sections are skipped.
    pub fn complete_advance(&mut self) -> AdvanceOutcome {
        let sections = schema::sections(self.record.registry());
        let next = sections
            .iter()
            .enumerate()
            .skip(self.cursor + 1)
            .find(|(_, s)| (s.visible)(&self.record));
        match next {
            Some((index, section)) => {
                self.cursor = index;
                AdvanceOutcome::MovedTo(section.id)
            }
            None => AdvanceOutcome::WorkflowComplete,
        }
    }

    fn after_edit(&mut self, edited: &'static str) -> FormResult<()> {
        let touched = crate::cascade::apply(edited, &mut self.record)?;
        self.dirty.insert(edited);
        self.revalidate_field(edited);
        for field in touched {
            self.dirty.insert(field);
            self.revalidate_field(field);
        }
        self.refresh_line_errors();
        Ok(())
    }

    fn write_lines(&mut self, lines: Vec<TherapyLine>) -> FormResult<Vec<Command>> {
        self.record
            .set(fields::METASTATIC_THERAPY_LINES, Some(FieldValue::TherapyLines(lines)))?;
        self.dirty.insert(fields::METASTATIC_THERAPY_LINES);
        self.refresh_line_errors();
        Ok(vec![Command::ScheduleAutosave])
    }

    fn write_perioperative(&mut self, entries: Vec<PerioperativeTherapy>) -> FormResult<Vec<Command>> {
        self.record.set(
            fields::RADICAL_PERIOPERATIVE_THERAPY,
            Some(FieldValue::Perioperative(entries)),
        )?;
        self.dirty.insert(fields::RADICAL_PERIOPERATIVE_THERAPY);
        Ok(vec![Command::ScheduleAutosave])
    }

    /// Re-evaluates the date rules of `field` and of every field comparing
    /// against it.
    fn revalidate_field(&mut self, field: &'static str) {
        self.refresh_date_error(field);
        for dependent in dates::dependents_of(field).collect::<Vec<_>>() {
            self.refresh_date_error(dependent);
        }
    }

    fn refresh_date_error(&mut self, field: &'static str) {
        match dates::validate(field, &self.record) {
            Some(message) => {
                self.errors.insert(field.to_owned(), message.to_owned());
            }
            None => {
                self.errors.remove(field);
            }
        }
    }

    fn refresh_line_errors(&mut self) {
        let prefix = format!("{}.", fields::METASTATIC_THERAPY_LINES);
        self.errors.retain(|key, _| !key.starts_with(&prefix));
        for LineDateError {
            line_number,
            message,
        } in dates::validate_lines(&self.record)
        {
            self.errors
                .insert(format!("{prefix}{line_number}"), message.to_owned());
        }
    }

    /// The registry-specific hard gates blocking save-and-advance out of the
    /// current section.
    ///
    /// Only these gates block. Incomplete sections save and advance freely —
    /// capture is incremental, and the required predicate feeds the sidebar
    /// status, not the save path. All date-rule violations except the
    /// first-line chronology stay advisory.
    fn advance_blockers(&self) -> Vec<String> {
        let mut missing: Vec<String> = Vec::new();

        match self.current_section().id {
            "pdl1-status" => {
                let known_status = self
                    .record
                    .code(fields::PDL1_STATUS)
                    .map(|c| c.as_str() != codes::UNKNOWN)
                    .unwrap_or(false);
                if known_status && !self.record.is_filled(fields::PDL1_TPS) {
                    missing.push(fields::PDL1_TPS.to_owned());
                }
            }
            "radical-treatment" => {
                if self
                    .record
                    .code_is(fields::RADICAL_TREATMENT_OUTCOME, codes::RELAPSE)
                    && !self.record.is_filled(fields::RELAPSE_DATE)
                {
                    missing.push(fields::RELAPSE_DATE.to_owned());
                }
            }
            "metastatic-therapy" => {
                if let Some(conflict) = dates::first_line_conflict(&self.record) {
                    missing.push(format!(
                        "{}.{}: {}",
                        fields::METASTATIC_THERAPY_LINES,
                        conflict.line_number,
                        conflict.message
                    ));
                }
            }
            _ => {}
        }

        missing
    }
}

fn reclassify_lists(record: &mut ClinicalRecord, catalog: &DrugCatalog) {
    let mut lines = record.therapy_lines(fields::METASTATIC_THERAPY_LINES).to_vec();
    if !lines.is_empty() {
        for line in &mut lines {
            line.therapy.reclassify(catalog);
        }
        let _ = record.set(
            fields::METASTATIC_THERAPY_LINES,
            Some(FieldValue::TherapyLines(lines)),
        );
    }

    let mut entries = record.perioperative(fields::RADICAL_PERIOPERATIVE_THERAPY).to_vec();
    if !entries.is_empty() {
        for entry in &mut entries {
            entry.therapy.reclassify(catalog);
        }
        let _ = record.set(
            fields::RADICAL_PERIOPERATIVE_THERAPY,
            Some(FieldValue::Perioperative(entries)),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use crf_types::DictCode;

    fn code(c: &str) -> FieldValue {
        FieldValue::Code(DictCode::new(c).unwrap())
    }

    fn day(y: i32, m: u32, d: u32) -> FieldValue {
        FieldValue::Date(NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    fn edit(field: &str, value: FieldValue) -> Action {
        Action::Edit {
            field: field.to_owned(),
            value: Some(value),
        }
    }

    fn alk_state() -> FormState {
        FormState::new(RegistryType::Alk, DrugCatalog::default())
    }

    fn ros1_state() -> FormState {
        FormState::new(RegistryType::Ros1, DrugCatalog::default())
    }

    #[test]
    fn test_edit_marks_dirty_and_schedules_autosave() {
        let mut state = alk_state();
        let commands = state
            .apply(edit(fields::GENDER, code("FEMALE")))
            .unwrap();
        assert_eq!(commands, vec![Command::ScheduleAutosave]);
        assert!(state.is_dirty());
        assert!(state.take_dirty().contains(fields::GENDER));
        assert!(!state.is_dirty());
    }

    #[test]
    fn test_cascade_fields_become_dirty_too() {
        let mut state = alk_state();
        state
            .apply(edit(fields::HAD_PREVIOUS_THERAPY, FieldValue::Flag(true)))
            .unwrap();
        state
            .apply(edit(fields::PREVIOUS_THERAPY_RESPONSE, code("PR")))
            .unwrap();
        state.take_dirty();

        state
            .apply(edit(fields::NO_PREVIOUS_THERAPY, FieldValue::Flag(true)))
            .unwrap();
        let dirty = state.take_dirty();
        assert!(dirty.contains(fields::NO_PREVIOUS_THERAPY));
        assert!(dirty.contains(fields::HAD_PREVIOUS_THERAPY));
        assert!(dirty.contains(fields::PREVIOUS_THERAPY_RESPONSE));
        assert!(!state.record().is_filled(fields::PREVIOUS_THERAPY_RESPONSE));
    }

    #[test]
    fn test_date_error_appears_and_clears_on_either_endpoint() {
        let mut state = alk_state();
        state
            .apply(edit(fields::INITIAL_DIAGNOSIS_DATE, day(2020, 6, 1)))
            .unwrap();
        state
            .apply(edit(fields::ALK_DIAGNOSIS_DATE, day(2020, 1, 1)))
            .unwrap();
        assert!(state.validation_errors().contains_key(fields::ALK_DIAGNOSIS_DATE));

        // Fixing the *comparison* endpoint clears the dependent's error.
        state
            .apply(edit(fields::INITIAL_DIAGNOSIS_DATE, day(2019, 12, 1)))
            .unwrap();
        assert!(state.validation_errors().is_empty());
    }

    #[test]
    fn test_advance_saves_partially_filled_sections() {
        // Capture is incremental: an unmet required field (current_status)
        // never blocks saving the section, only registry hard gates do.
        let mut state = alk_state();
        state
            .apply(edit(fields::LAST_CONTACT_DATE, day(2024, 11, 2)))
            .unwrap();
        let commands = state.apply(Action::Advance).unwrap();
        assert_eq!(commands, vec![Command::PersistCreate]);
    }

    #[test]
    fn test_known_pdl1_status_gates_advance_on_tps() {
        let mut state = ros1_state();
        state
            .apply(Action::SelectSection {
                id: "pdl1-status".to_owned(),
            })
            .unwrap();

        // Unassessed status never demands a TPS value.
        state.apply(edit(fields::PDL1_STATUS, code(codes::UNKNOWN))).unwrap();
        assert!(state.apply(Action::Advance).is_ok());

        state.apply(edit(fields::PDL1_STATUS, code("POSITIVE"))).unwrap();
        let err = state.apply(Action::Advance).unwrap_err();
        assert!(
            matches!(err, FormError::RequiredFieldMissing(ref msg) if msg.contains("pdl1_tps"))
        );

        state
            .apply(edit(fields::PDL1_TPS, FieldValue::Number(55.0)))
            .unwrap();
        assert!(state.apply(Action::Advance).is_ok());
    }

    #[test]
    fn test_advance_persists_full_once_record_exists() {
        let mut state = alk_state();
        state.set_record_id(RecordId::new());
        state
            .apply(edit(fields::CURRENT_STATUS, code("ALIVE")))
            .unwrap();
        assert_eq!(state.apply(Action::Advance).unwrap(), vec![Command::PersistFull]);
    }

    #[test]
    fn test_complete_advance_skips_hidden_sections() {
        let mut state = alk_state();
        state
            .apply(edit(fields::ALECTINIB_THERAPY_STATUS, code("ONGOING")))
            .unwrap();
        state
            .apply(Action::SelectSection {
                id: "alectinib-complete".to_owned(),
            })
            .unwrap();

        // Next-line is hidden while therapy is ongoing, so the workflow ends.
        assert_eq!(state.complete_advance(), AdvanceOutcome::WorkflowComplete);

        state
            .apply(edit(fields::ALECTINIB_THERAPY_STATUS, code(codes::STOPPED)))
            .unwrap();
        assert_eq!(
            state.complete_advance(),
            AdvanceOutcome::MovedTo("next-line")
        );
    }

    #[test]
    fn test_select_section_rejects_hidden_and_unknown() {
        let mut state = alk_state();
        let err = state
            .apply(Action::SelectSection {
                id: "next-line".to_owned(),
            })
            .unwrap_err();
        assert!(matches!(err, FormError::UnknownSection(_)));

        let err = state
            .apply(Action::SelectSection {
                id: "radical-treatment".to_owned(),
            })
            .unwrap_err();
        assert!(matches!(err, FormError::UnknownSection(_)));
    }

    #[test]
    fn test_line_append_and_remove_renumber() {
        let mut state = ros1_state();
        state.apply(Action::AppendLine).unwrap();
        state.apply(Action::AppendLine).unwrap();
        state.apply(Action::AppendLine).unwrap();
        state.apply(Action::RemoveLine { index: 1 }).unwrap();

        let numbers: Vec<u32> = state
            .record()
            .therapy_lines(fields::METASTATIC_THERAPY_LINES)
            .iter()
            .map(|l| l.line_number)
            .collect();
        assert_eq!(numbers, vec![1, 2]);

        let err = state.apply(Action::RemoveLine { index: 7 }).unwrap_err();
        assert!(matches!(err, FormError::InvalidInput(_)));
    }

    #[test]
    fn test_edit_rejects_list_managed_fields() {
        let mut state = ros1_state();
        let mut line = TherapyLine::empty(5);
        line.line_number = 5;
        let err = state
            .apply(edit(
                fields::METASTATIC_THERAPY_LINES,
                FieldValue::TherapyLines(vec![line]),
            ))
            .unwrap_err();
        assert!(matches!(err, FormError::InvalidInput(msg) if msg.contains("list-managed")));

        // Clearing goes through the list actions too.
        let err = state
            .apply(Action::Edit {
                field: fields::RADICAL_PERIOPERATIVE_THERAPY.to_owned(),
                value: None,
            })
            .unwrap_err();
        assert!(matches!(err, FormError::InvalidInput(_)));
    }

    #[test]
    fn test_update_line_reclassifies_therapy() {
        let catalog = DrugCatalog::from_pairs([("CRIZOTINIB", codes::TARGETED)]);
        let mut state = FormState::new(RegistryType::Ros1, catalog);
        state.apply(Action::AppendLine).unwrap();

        let mut line = state.record().therapy_lines(fields::METASTATIC_THERAPY_LINES)[0].clone();
        line.therapy = crate::therapy::TherapySelection::from_codes(
            [DictCode::new("CRIZOTINIB").unwrap()],
            &DrugCatalog::default(),
        );
        state.apply(Action::UpdateLine { index: 0, line }).unwrap();

        let stored = &state.record().therapy_lines(fields::METASTATIC_THERAPY_LINES)[0];
        assert_eq!(
            stored.therapy.composition().class,
            Some(crate::therapy::TherapyClass::Targeted)
        );
    }

    #[test]
    fn test_relapse_outcome_gates_advance_on_relapse_date() {
        let mut state = ros1_state();
        state
            .apply(Action::SelectSection {
                id: "radical-treatment".to_owned(),
            })
            .unwrap();
        state
            .apply(edit(fields::RADICAL_TREATMENT_CONDUCTED, FieldValue::Flag(true)))
            .unwrap();
        state
            .apply(edit(fields::RADICAL_SURGERY_CONDUCTED, FieldValue::Flag(true)))
            .unwrap();
        state
            .apply(edit(fields::RADICAL_SURGERY_DATE, day(2021, 5, 10)))
            .unwrap();
        state
            .apply(edit(fields::RADICAL_TREATMENT_OUTCOME, code(codes::RELAPSE)))
            .unwrap();

        let err = state.apply(Action::Advance).unwrap_err();
        assert!(
            matches!(err, FormError::RequiredFieldMissing(ref msg) if msg.contains("relapse_date"))
        );

        state
            .apply(edit(fields::RELAPSE_DATE, day(2022, 1, 5)))
            .unwrap();
        assert!(state.apply(Action::Advance).is_ok());
    }

    #[test]
    fn test_line_chronology_blocks_metastatic_advance() {
        let mut state = ros1_state();
        state
            .apply(Action::SelectSection {
                id: "metastatic-therapy".to_owned(),
            })
            .unwrap();
        state
            .apply(edit(fields::METASTATIC_DIAGNOSIS_DATE, day(2023, 3, 1)))
            .unwrap();
        state.apply(Action::AppendLine).unwrap();

        let mut line = state.record().therapy_lines(fields::METASTATIC_THERAPY_LINES)[0].clone();
        line.start_date = NaiveDate::from_ymd_opt(2023, 1, 1);
        state.apply(Action::UpdateLine { index: 0, line }).unwrap();
        assert!(state
            .validation_errors()
            .contains_key("metastatic_therapy_lines.1"));

        let err = state.apply(Action::Advance).unwrap_err();
        assert!(matches!(err, FormError::RequiredFieldMissing(_)));
    }

    #[test]
    fn test_within_line_date_violations_stay_advisory() {
        let mut state = ros1_state();
        state
            .apply(Action::SelectSection {
                id: "metastatic-therapy".to_owned(),
            })
            .unwrap();
        state
            .apply(edit(fields::METASTATIC_DIAGNOSIS_DATE, day(2023, 1, 1)))
            .unwrap();
        state.apply(Action::AppendLine).unwrap();

        let mut line = state.record().therapy_lines(fields::METASTATIC_THERAPY_LINES)[0].clone();
        line.start_date = NaiveDate::from_ymd_opt(2023, 5, 1);
        line.end_date = NaiveDate::from_ymd_opt(2023, 4, 1);
        state.apply(Action::UpdateLine { index: 0, line }).unwrap();

        // The violation is reported but does not hard-block the save.
        assert!(state
            .validation_errors()
            .contains_key("metastatic_therapy_lines.1"));
        assert_eq!(state.apply(Action::Advance).unwrap(), vec![Command::PersistCreate]);
    }

    #[test]
    fn test_load_reclassifies_stored_therapy_against_catalog() {
        let mut seeded = ros1_state();
        seeded.apply(Action::AppendLine).unwrap();
        let mut line = seeded.record().therapy_lines(fields::METASTATIC_THERAPY_LINES)[0].clone();
        line.therapy = crate::therapy::TherapySelection::from_codes(
            [DictCode::new("ENTRECTINIB").unwrap()],
            &DrugCatalog::default(),
        );
        seeded.apply(Action::UpdateLine { index: 0, line }).unwrap();
        let stored = payload::to_payload(seeded.record());

        let catalog = DrugCatalog::from_pairs([("ENTRECTINIB", codes::TARGETED)]);
        let state = FormState::load(RegistryType::Ros1, RecordId::new(), &stored, catalog);
        let loaded = &state.record().therapy_lines(fields::METASTATIC_THERAPY_LINES)[0];
        assert_eq!(
            loaded.therapy.composition().class,
            Some(crate::therapy::TherapyClass::Targeted)
        );
    }
}
