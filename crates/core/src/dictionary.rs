//! Reference-data ("dictionary") collaborator boundary.
//!
//! Dictionaries are flat code lists grouped by category (`histology`,
//! `chemo_drugs`, `response`, ...). The engine fetches them once per session
//! through [`DictionaryProvider`], groups them in a [`DictionaryCache`], and
//! treats the codes as authoritative from then on — no re-validation against
//! any schema.

use crf_types::DictCode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Dictionary category holding the drug catalog used by the therapy resolver.
pub const DRUG_CATEGORY: &str = "chemo_drugs";

/// One reference-data row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DictionaryEntry {
    pub category: String,
    pub code: DictCode,
    /// Display label shown to clinicians.
    pub label: String,
    /// Parent code, e.g. a drug's therapy class.
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub sort_order: i32,
}

/// Errors from the dictionary collaborator.
#[derive(Debug, thiserror::Error)]
pub enum DictionaryError {
    #[error("dictionary fetch failed: {0}")]
    Fetch(String),
}

/// Read-only source of reference data, typically a remote service.
pub trait DictionaryProvider {
    /// Fetches all entries, or the entries of one category.
    fn fetch(
        &self,
        category: Option<&str>,
    ) -> impl std::future::Future<Output = Result<Vec<DictionaryEntry>, DictionaryError>>;
}

/// Dictionary entries grouped by category, sorted for display.
#[derive(Debug, Clone, Default)]
pub struct DictionaryCache {
    by_category: BTreeMap<String, Vec<DictionaryEntry>>,
}

impl DictionaryCache {
    /// Loads and groups every dictionary entry from the provider.
    pub async fn load<P: DictionaryProvider>(provider: &P) -> Result<Self, DictionaryError> {
        let entries = provider.fetch(None).await?;
        Ok(Self::from_entries(entries))
    }

    /// Groups entries by category and sorts each group by `sort_order`.
    pub fn from_entries(entries: impl IntoIterator<Item = DictionaryEntry>) -> Self {
        let mut by_category: BTreeMap<String, Vec<DictionaryEntry>> = BTreeMap::new();
        for entry in entries {
            by_category.entry(entry.category.clone()).or_default().push(entry);
        }
        for group in by_category.values_mut() {
            group.sort_by_key(|e| e.sort_order);
        }
        Self { by_category }
    }

    /// Entries of one category, in display order. Empty for unknown categories.
    pub fn category(&self, category: &str) -> &[DictionaryEntry] {
        self.by_category
            .get(category)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Builds the drug catalog from the `chemo_drugs` category.
    pub fn drug_catalog(&self) -> DrugCatalog {
        DrugCatalog::from_entries(self.category(DRUG_CATEGORY))
    }
}

/// Maps a drug code to its parent therapy class for composition resolution.
#[derive(Debug, Clone, Default)]
pub struct DrugCatalog {
    parent_by_code: BTreeMap<String, String>,
}

impl DrugCatalog {
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = &'a DictionaryEntry>) -> Self {
        let mut parent_by_code = BTreeMap::new();
        for entry in entries {
            match &entry.parent {
                Some(parent) if !parent.is_empty() => {
                    parent_by_code.insert(entry.code.as_str().to_owned(), parent.clone());
                }
                _ => {
                    // Drugs without a class still appear in selections; they
                    // just do not contribute to classification.
                    tracing::warn!(code = entry.code.as_str(), "drug entry has no parent class");
                }
            }
        }
        Self { parent_by_code }
    }

    /// Builds a catalog directly from `(code, parent class)` pairs.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self {
            parent_by_code: pairs
                .into_iter()
                .map(|(code, parent)| (code.to_owned(), parent.to_owned()))
                .collect(),
        }
    }

    /// The parent therapy class of a drug code, if the catalog knows it.
    pub fn parent_class(&self, code: &str) -> Option<&str> {
        self.parent_by_code.get(code).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.parent_by_code.is_empty()
    }
}
