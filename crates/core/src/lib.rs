//! Dynamic clinical-form engine for the ALK and ROS1 lung-cancer registries.
//!
//! The engine turns a per-registry schema — sections, conditional
//! visibility, required rules, cascades, and date constraints — into a
//! headless form controller that any shell (CLI, service, UI bridge) can
//! drive:
//!
//! - [`schema`] declares the two registry schemas and answers visibility and
//!   required-ness questions against the live record.
//! - [`controller::FormState`] is the pure state machine: actions in,
//!   commands out, no IO.
//! - [`session::FormSession`] wraps the state machine with a record store
//!   and the debounced autosave clock.
//! - [`therapy`] derives therapy class and regimen from drug selections.
//!
//! Persistence and reference data enter through the [`store::RecordStore`]
//! and [`dictionary::DictionaryProvider`] traits.

pub mod cascade;
pub mod config;
pub mod controller;
pub mod dates;
pub mod dictionary;
mod error;
pub mod fields;
pub mod payload;
pub mod progress;
pub mod record;
pub mod schema;
pub mod session;
pub mod store;
pub mod therapy;

pub use config::EngineConfig;
pub use controller::{Action, AdvanceOutcome, Command, FormState, SectionOverview};
pub use error::{FormError, FormResult};
pub use record::{ClinicalRecord, FieldValue};
pub use session::FormSession;
pub use store::{MemoryStore, RecordId, RecordStore, StoreError};
