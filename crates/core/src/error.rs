use crate::store::StoreError;

/// Errors produced by the form engine.
///
/// The taxonomy mirrors how failures are surfaced to the user:
///
/// - [`FormError::InvalidInput`] and [`FormError::UnknownField`] are caller
///   bugs (wrong field id, wrong value kind) and are rejected outright.
/// - [`FormError::RequiredFieldMissing`] is raised only when advancing past a
///   section whose registry-specific hard gates are unmet; the user corrects
///   the input and retries. Advisory date-rule violations never use this
///   path — they are carried in the validation-error map instead.
/// - [`FormError::Persistence`] wraps a storage failure; the in-memory record
///   is left untouched so the save can be retried without data loss.
#[derive(Debug, thiserror::Error)]
pub enum FormError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("unknown field: {0}")]
    UnknownField(String),

    #[error("unknown section: {0}")]
    UnknownSection(String),

    #[error("required fields missing: {0}")]
    RequiredFieldMissing(String),

    #[error("persistence failed: {0}")]
    Persistence(#[from] StoreError),

    #[error("failed to serialize record: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("record has not been created yet")]
    RecordNotCreated,
}

pub type FormResult<T> = std::result::Result<T, FormError>;
