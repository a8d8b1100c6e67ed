//! Therapy composition: drug selections and their derived classification.
//!
//! A therapy is entered as a set of drug codes. Its class (chemotherapy,
//! immunotherapy, ...) and regimen (monotherapy, platinum doublet, ...) are
//! *derived* — a pure function of the drug set and the drug catalog — and are
//! recomputed on every mutation. They are never directly settable.

use crate::dictionary::DrugCatalog;
use crate::fields::codes;
use chrono::NaiveDate;
use crf_types::DictCode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Derived therapy class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TherapyClass {
    Chemotherapy,
    Immunotherapy,
    Chemoimmunotherapy,
    Targeted,
    Other,
}

/// Derived regimen, determined by drug count alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Regimen {
    Monotherapy,
    PlatinumDoublet,
    NonPlatinumDoublet,
    OtherRegimen,
}

impl TherapyClass {
    pub fn as_code(&self) -> &'static str {
        match self {
            TherapyClass::Chemotherapy => "CHEMOTHERAPY",
            TherapyClass::Immunotherapy => "IMMUNOTHERAPY",
            TherapyClass::Chemoimmunotherapy => "CHEMOIMMUNOTHERAPY",
            TherapyClass::Targeted => "TARGETED",
            TherapyClass::Other => "OTHER",
        }
    }
}

impl Regimen {
    pub fn as_code(&self) -> &'static str {
        match self {
            Regimen::Monotherapy => "MONOTHERAPY",
            Regimen::PlatinumDoublet => "PLATINUM_DOUBLET",
            Regimen::NonPlatinumDoublet => "NON_PLATINUM_DOUBLET",
            Regimen::OtherRegimen => "OTHER_REGIMEN",
        }
    }
}

/// The derived `{class, regimen}` pair. An empty drug set resolves to
/// `{None, None}` (unclassified, serialized as empty strings).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Composition {
    pub class: Option<TherapyClass>,
    pub regimen: Option<Regimen>,
}

/// Classifies a drug set.
///
/// Unknown codes are ignored for classification but stay in the selection.
/// The checks are ordered — first match wins:
///
/// 1. chemo + immuno drugs present → chemoimmunotherapy
/// 2. any chemo drug → chemotherapy; any immuno → immunotherapy; any
///    targeted → targeted; otherwise → other
/// 3. regimen by count: 1 → monotherapy; 2 → platinum doublet when the pair
///    includes cisplatin or carboplatin, else non-platinum doublet; any other
///    count → other regimen
///
/// The input is a set, so the result is invariant under insertion order.
pub fn resolve(drug_codes: &BTreeSet<DictCode>, catalog: &DrugCatalog) -> Composition {
    if drug_codes.is_empty() {
        return Composition::default();
    }

    let mut has_chemo = false;
    let mut has_immuno = false;
    let mut has_targeted = false;
    let mut has_platinum = false;
    for code in drug_codes {
        match catalog.parent_class(code.as_str()) {
            Some(codes::CHEMOTHERAPY) => has_chemo = true,
            Some(codes::IMMUNOTHERAPY) => has_immuno = true,
            Some(codes::TARGETED) => has_targeted = true,
            _ => {}
        }
        if code.as_str() == codes::CISPLATIN || code.as_str() == codes::CARBOPLATIN {
            has_platinum = true;
        }
    }

    let class = if has_chemo && has_immuno {
        TherapyClass::Chemoimmunotherapy
    } else if has_chemo {
        TherapyClass::Chemotherapy
    } else if has_immuno {
        TherapyClass::Immunotherapy
    } else if has_targeted {
        TherapyClass::Targeted
    } else {
        TherapyClass::Other
    };

    let regimen = match drug_codes.len() {
        1 => Regimen::Monotherapy,
        2 if has_platinum => Regimen::PlatinumDoublet,
        2 => Regimen::NonPlatinumDoublet,
        _ => Regimen::OtherRegimen,
    };

    Composition {
        class: Some(class),
        regimen: Some(regimen),
    }
}

/// A therapy chosen on the form: the drug set plus its derived classification.
///
/// # Wire format
///
/// Serialized with the historical payload field names: `custom_drugs`,
/// `therapy_class`, `regimen_code` (empty strings when unclassified).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TherapySelection {
    drug_codes: BTreeSet<DictCode>,
    composition: Composition,
}

impl TherapySelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a selection from codes, deriving the classification.
    pub fn from_codes(
        drug_codes: impl IntoIterator<Item = DictCode>,
        catalog: &DrugCatalog,
    ) -> Self {
        let drug_codes: BTreeSet<DictCode> = drug_codes.into_iter().collect();
        let composition = resolve(&drug_codes, catalog);
        Self {
            drug_codes,
            composition,
        }
    }

    pub fn drug_codes(&self) -> &BTreeSet<DictCode> {
        &self.drug_codes
    }

    pub fn composition(&self) -> Composition {
        self.composition
    }

    pub fn is_empty(&self) -> bool {
        self.drug_codes.is_empty()
    }

    /// Adds a drug and re-derives the classification. Adding a drug that is
    /// already present is a no-op.
    pub fn add_drug(&mut self, code: DictCode, catalog: &DrugCatalog) {
        self.drug_codes.insert(code);
        self.composition = resolve(&self.drug_codes, catalog);
    }

    /// Removes a drug and re-derives the classification.
    pub fn remove_drug(&mut self, code: &DictCode, catalog: &DrugCatalog) {
        self.drug_codes.remove(code);
        self.composition = resolve(&self.drug_codes, catalog);
    }

    /// Re-derives the classification against a (possibly newer) catalog.
    ///
    /// Used after loading a record, when the stored derived codes may predate
    /// the current drug catalog.
    pub fn reclassify(&mut self, catalog: &DrugCatalog) {
        self.composition = resolve(&self.drug_codes, catalog);
    }
}

#[derive(Serialize, Deserialize)]
struct TherapySelectionWire {
    #[serde(default)]
    custom_drugs: Vec<DictCode>,
    #[serde(default)]
    therapy_class: String,
    #[serde(default)]
    regimen_code: String,
}

impl Serialize for TherapySelection {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let wire = TherapySelectionWire {
            custom_drugs: self.drug_codes.iter().cloned().collect(),
            therapy_class: self
                .composition
                .class
                .map(|c| c.as_code().to_owned())
                .unwrap_or_default(),
            regimen_code: self
                .composition
                .regimen
                .map(|r| r.as_code().to_owned())
                .unwrap_or_default(),
        };
        wire.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for TherapySelection {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let wire = TherapySelectionWire::deserialize(deserializer)?;
        let drug_codes: BTreeSet<DictCode> = wire.custom_drugs.into_iter().collect();
        // Stored derived codes are kept as-is until a catalog is available;
        // `reclassify` re-derives them after load.
        let composition = Composition {
            class: serde_json::from_value(serde_json::Value::String(wire.therapy_class)).ok(),
            regimen: serde_json::from_value(serde_json::Value::String(wire.regimen_code)).ok(),
        };
        Ok(Self {
            drug_codes,
            composition,
        })
    }
}

/// Lenient serde helpers for dates and codes inside composite lists.
///
/// Historical payloads store absent values as empty strings and dates with an
/// appended midnight time; both must load cleanly.
pub(crate) mod lenient {
    use chrono::NaiveDate;
    use crf_types::DictCode;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn parse_day(raw: &str) -> Option<NaiveDate> {
        let day = raw.split('T').next().unwrap_or(raw);
        NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
    }

    pub fn date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        Ok(raw.as_deref().and_then(parse_day))
    }

    pub fn date_ser<S>(value: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(d) => serializer.serialize_str(&d.format("%Y-%m-%d").to_string()),
            None => serializer.serialize_str(""),
        }
    }

    pub fn code<'de, D>(deserializer: D) -> Result<Option<DictCode>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        Ok(raw.and_then(|s| DictCode::new(s).ok()))
    }

    pub fn code_ser<S>(value: &Option<DictCode>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(c) => serializer.serialize_str(c.as_str()),
            None => serializer.serialize_str(""),
        }
    }
}

/// One line of metastatic-phase treatment history.
///
/// Lines are ordered by `line_number`, 1-based and contiguous; the list
/// operations in the controller renumber on every insert and removal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TherapyLine {
    pub line_number: u32,
    #[serde(default)]
    pub therapy: TherapySelection,
    #[serde(
        default,
        deserialize_with = "lenient::date",
        serialize_with = "lenient::date_ser"
    )]
    pub start_date: Option<NaiveDate>,
    #[serde(
        default,
        deserialize_with = "lenient::date",
        serialize_with = "lenient::date_ser"
    )]
    pub end_date: Option<NaiveDate>,
    #[serde(
        default,
        deserialize_with = "lenient::code",
        serialize_with = "lenient::code_ser"
    )]
    pub response: Option<DictCode>,
    #[serde(
        default,
        deserialize_with = "lenient::code",
        serialize_with = "lenient::code_ser"
    )]
    pub stop_reason: Option<DictCode>,
    #[serde(
        default,
        deserialize_with = "lenient::date",
        serialize_with = "lenient::date_ser"
    )]
    pub progression_date: Option<NaiveDate>,
    #[serde(
        default,
        deserialize_with = "lenient::code",
        serialize_with = "lenient::code_ser"
    )]
    pub progression_type: Option<DictCode>,
    #[serde(default)]
    pub progression_sites: Vec<DictCode>,
    #[serde(
        default,
        deserialize_with = "lenient::code",
        serialize_with = "lenient::code_ser"
    )]
    pub local_treatment_at_progression: Option<DictCode>,
}

impl TherapyLine {
    /// An empty line with the given number.
    pub fn empty(line_number: u32) -> Self {
        Self {
            line_number,
            therapy: TherapySelection::new(),
            start_date: None,
            end_date: None,
            response: None,
            stop_reason: None,
            progression_date: None,
            progression_type: None,
            progression_sites: Vec::new(),
            local_treatment_at_progression: None,
        }
    }
}

/// Rewrites `line_number` to the contiguous 1-based sequence.
pub fn renumber(lines: &mut [TherapyLine]) {
    for (index, line) in lines.iter_mut().enumerate() {
        line.line_number = index as u32 + 1;
    }
}

/// Whether a perioperative therapy ran before or after surgery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PerioperativeKind {
    Neoadjuvant,
    Adjuvant,
}

fn perioperative_kind<'de, D>(deserializer: D) -> Result<Option<PerioperativeKind>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Option<String> = Deserialize::deserialize(deserializer)?;
    Ok(match raw.as_deref() {
        Some("NEOADJUVANT") => Some(PerioperativeKind::Neoadjuvant),
        Some("ADJUVANT") => Some(PerioperativeKind::Adjuvant),
        _ => None,
    })
}

/// One entry of perioperative (neoadjuvant/adjuvant) therapy. Unordered list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerioperativeTherapy {
    #[serde(rename = "type", default, deserialize_with = "perioperative_kind")]
    pub kind: Option<PerioperativeKind>,
    #[serde(default)]
    pub therapy: TherapySelection,
    #[serde(
        default,
        deserialize_with = "lenient::date",
        serialize_with = "lenient::date_ser"
    )]
    pub start_date: Option<NaiveDate>,
    #[serde(
        default,
        deserialize_with = "lenient::date",
        serialize_with = "lenient::date_ser"
    )]
    pub end_date: Option<NaiveDate>,
}

impl PerioperativeTherapy {
    pub fn empty() -> Self {
        Self {
            kind: None,
            therapy: TherapySelection::new(),
            start_date: None,
            end_date: None,
        }
    }
}
