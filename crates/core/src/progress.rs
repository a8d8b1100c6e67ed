//! Section completion metrics for the navigation sidebar.
//!
//! Progress is derived, never stored: both numbers come straight from the
//! record, so computing them twice in a row always agrees. The percentage is
//! a coarse fill ratio over the section's visible fields; the status is the
//! section's required predicate and is what gates save-and-advance.

use crate::record::ClinicalRecord;
use crate::schema::{self, Section};
use serde::Serialize;

/// Tri-state completion of a section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionStatus {
    Unfilled,
    PartiallyFilled,
    Complete,
}

/// Display color band for a percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorBand {
    None,
    Red,
    Yellow,
    Green,
}

/// A section's computed progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SectionProgress {
    /// Filled share of the section's visible fields, 0..=100.
    pub percentage: u8,
    pub status: SectionStatus,
}

impl SectionProgress {
    /// Color band: red below 70, yellow below 90, green from 90, and no band
    /// at all while the section is untouched.
    pub fn color(&self) -> ColorBand {
        match self.percentage {
            0 => ColorBand::None,
            p if p < 70 => ColorBand::Red,
            p if p < 90 => ColorBand::Yellow,
            _ => ColorBand::Green,
        }
    }
}

/// Computes a section's progress against the record.
///
/// The percentage is a fixed-denominator ratio over the section's whole
/// field list, hidden or not — the figure is a rough "how much is written
/// down" indicator and must not jump when a conditional block toggles.
/// Visibility only matters to the required predicate behind `status`.
pub fn compute(section: &Section, record: &ClinicalRecord) -> SectionProgress {
    let total = section.full_fields.len();
    let filled = section
        .full_fields
        .iter()
        .filter(|f| record.is_filled(f))
        .count();

    let percentage = if total == 0 {
        0
    } else {
        ((filled * 100 + total / 2) / total) as u8
    };

    let status = if schema::required_met(section, record) {
        SectionStatus::Complete
    } else if filled > 0 {
        SectionStatus::PartiallyFilled
    } else {
        SectionStatus::Unfilled
    };

    SectionProgress { percentage, status }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::{self, codes};
    use crate::record::FieldValue;
    use chrono::NaiveDate;
    use crf_types::{DictCode, RegistryType};

    fn code(c: &str) -> FieldValue {
        FieldValue::Code(DictCode::new(c).unwrap())
    }

    fn day(y: i32, m: u32, d: u32) -> FieldValue {
        FieldValue::Date(NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    fn basic_section() -> &'static Section {
        schema::section(RegistryType::Alk, "patient-basic").unwrap()
    }

    #[test]
    fn test_untouched_section_is_unfilled_with_no_band() {
        let rec = ClinicalRecord::new(RegistryType::Alk);
        let progress = compute(basic_section(), &rec);
        assert_eq!(progress.percentage, 0);
        assert_eq!(progress.status, SectionStatus::Unfilled);
        assert_eq!(progress.color(), ColorBand::None);
    }

    #[test]
    fn test_partial_fill_reports_partial_status() {
        let mut rec = ClinicalRecord::new(RegistryType::Alk);
        rec.set(fields::GENDER, Some(code("FEMALE"))).unwrap();
        rec.set(fields::HEIGHT, Some(FieldValue::Number(168.0))).unwrap();

        let progress = compute(basic_section(), &rec);
        // 2 of 8 fields.
        assert_eq!(progress.percentage, 25);
        assert_eq!(progress.status, SectionStatus::PartiallyFilled);
        assert_eq!(progress.color(), ColorBand::Red);
    }

    #[test]
    fn test_required_fields_drive_completion_not_percentage() {
        let mut rec = ClinicalRecord::new(RegistryType::Alk);
        rec.set(fields::GENDER, Some(code("MALE"))).unwrap();
        rec.set(fields::BIRTH_DATE, Some(day(1955, 7, 1))).unwrap();

        let progress = compute(basic_section(), &rec);
        assert_eq!(progress.status, SectionStatus::Complete);
        assert!(progress.percentage < 100, "optional fields still missing");
    }

    #[test]
    fn test_compute_is_idempotent() {
        let mut rec = ClinicalRecord::new(RegistryType::Alk);
        rec.set(fields::CURRENT_STATUS, Some(code("ALIVE"))).unwrap();
        let section = schema::section(RegistryType::Alk, "current-status").unwrap();
        assert_eq!(compute(section, &rec), compute(section, &rec));
    }

    #[test]
    fn test_next_line_complete_while_therapy_ongoing() {
        let mut rec = ClinicalRecord::new(RegistryType::Alk);
        rec.set(fields::ALECTINIB_THERAPY_STATUS, Some(code("ONGOING")))
            .unwrap();

        let section = schema::section(RegistryType::Alk, "next-line").unwrap();
        let progress = compute(section, &rec);
        assert_eq!(progress.status, SectionStatus::Complete);
        assert_eq!(progress.percentage, 0);

        rec.set(fields::ALECTINIB_THERAPY_STATUS, Some(code(codes::STOPPED)))
            .unwrap();
        assert_eq!(compute(section, &rec).status, SectionStatus::Unfilled);
    }

    #[test]
    fn test_percentage_counts_hidden_fields_in_the_denominator() {
        let mut rec = ClinicalRecord::new(RegistryType::Ros1);
        let section = schema::section(RegistryType::Ros1, "pdl1-status").unwrap();

        // TPS is hidden for an UNKNOWN status, yet still one of the
        // section's two fields: half filled, but required is satisfied.
        rec.set(fields::PDL1_STATUS, Some(code(codes::UNKNOWN))).unwrap();
        let progress = compute(section, &rec);
        assert_eq!(progress.percentage, 50);
        assert_eq!(progress.status, SectionStatus::Complete);
    }

    #[test]
    fn test_color_bands() {
        let band = |percentage| SectionProgress {
            percentage,
            status: SectionStatus::PartiallyFilled,
        }
        .color();
        assert_eq!(band(1), ColorBand::Red);
        assert_eq!(band(69), ColorBand::Red);
        assert_eq!(band(70), ColorBand::Yellow);
        assert_eq!(band(89), ColorBand::Yellow);
        assert_eq!(band(90), ColorBand::Green);
        assert_eq!(band(100), ColorBand::Green);
    }
}
