//! The editing session: the async shell around [`FormState`].
//!
//! The session owns the store handle and the autosave clock. Autosave is
//! debounced: every edit re-arms a single deadline, and once the quiet
//! period elapses the accumulated dirty fields go out as one partial save.
//! The session holds no background task — the embedding shell polls
//! [`FormSession::flush_due_autosave`] from its event loop, which keeps the
//! timing deterministic and the session `&mut`-exclusive (no save can ever
//! race an edit).

use crate::config::EngineConfig;
use crate::controller::{Action, AdvanceOutcome, Command, FormState, SectionOverview};
use crate::dictionary::DrugCatalog;
use crate::payload;
use crate::record::FieldValue;
use crate::store::{RecordId, RecordStore};
use crate::{FormError, FormResult};
use crf_types::RegistryType;
use tokio::time::Instant;

pub struct FormSession<S: RecordStore> {
    state: FormState,
    store: S,
    config: EngineConfig,
    autosave_deadline: Option<Instant>,
}

impl<S: RecordStore> FormSession<S> {
    /// Starts a session over a fresh, not-yet-persisted record.
    pub fn new(registry: RegistryType, catalog: DrugCatalog, store: S, config: EngineConfig) -> Self {
        Self {
            state: FormState::new(registry, catalog),
            store,
            config,
            autosave_deadline: None,
        }
    }

    /// Opens a session over a stored record.
    pub async fn open(
        registry: RegistryType,
        id: RecordId,
        catalog: DrugCatalog,
        store: S,
        config: EngineConfig,
    ) -> FormResult<Self> {
        let stored = store.fetch(id).await?;
        Ok(Self {
            state: FormState::load(registry, id, &stored, catalog),
            store,
            config,
            autosave_deadline: None,
        })
    }

    pub fn state(&self) -> &FormState {
        &self.state
    }

    pub fn section_list(&self) -> Vec<SectionOverview> {
        self.state.section_list()
    }

    /// The armed autosave deadline, if any.
    pub fn autosave_deadline(&self) -> Option<Instant> {
        self.autosave_deadline
    }

    /// Applies an edit-like action, arming the autosave timer.
    pub fn apply(&mut self, action: Action) -> FormResult<()> {
        let commands = self.state.apply(action)?;
        for command in commands {
            match command {
                Command::ScheduleAutosave => {
                    self.autosave_deadline = Some(Instant::now() + self.config.autosave_debounce());
                }
                // Persist commands only come out of `Advance`, which goes
                // through `advance()` instead.
                Command::PersistCreate | Command::PersistFull => {
                    return Err(FormError::InvalidInput(
                        "advance must go through FormSession::advance".to_owned(),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Convenience wrapper for a single field edit.
    pub fn edit(&mut self, field: &str, value: Option<FieldValue>) -> FormResult<()> {
        self.apply(Action::Edit {
            field: field.to_owned(),
            value,
        })
    }

    /// Navigates to another section.
    ///
    /// A pending autosave stays armed and fires on its own schedule — a
    /// sidebar jump stays inside the record, so there is nothing to flush
    /// eagerly. Leaving the record goes through [`FormSession::close`].
    pub fn select_section(&mut self, id: &str) -> FormResult<()> {
        let commands = self.state.apply(Action::SelectSection { id: id.to_owned() })?;
        debug_assert!(commands.is_empty());
        Ok(())
    }

    /// Saves the current section and moves on.
    ///
    /// Validation gates run first; a gate failure leaves the store untouched.
    /// The first successful advance creates the record, later ones replace it
    /// wholesale. On success the dirty set and any pending autosave are
    /// cleared, since the full record just went out.
    pub async fn advance(&mut self) -> FormResult<AdvanceOutcome> {
        let commands = self.state.apply(Action::Advance)?;
        for command in commands {
            match command {
                Command::PersistCreate => {
                    let id = self.store.create(payload::create_payload(self.state.record())).await?;
                    self.state.set_record_id(id);
                    tracing::info!(record_id = %id, "record created");
                }
                Command::PersistFull => {
                    let id = self.state.record_id().ok_or(FormError::RecordNotCreated)?;
                    self.store.update(id, payload::to_payload(self.state.record())).await?;
                }
                Command::ScheduleAutosave => {}
            }
        }
        self.state.take_dirty();
        self.autosave_deadline = None;
        Ok(self.state.complete_advance())
    }

    /// Flushes the autosave if its quiet period has elapsed. Call from the
    /// event loop; a no-op while the timer is unarmed or still running.
    pub async fn flush_due_autosave(&mut self) -> FormResult<()> {
        match self.autosave_deadline {
            Some(deadline) if Instant::now() >= deadline => self.flush_pending().await,
            _ => Ok(()),
        }
    }

    /// Ends the session, flushing unsaved edits.
    pub async fn close(mut self) -> FormResult<()> {
        self.flush_pending().await
    }

    /// Sends the dirty fields as one partial save.
    ///
    /// Records that were never created are skipped — creation is the
    /// province of the first save-and-advance, not of autosave. On store
    /// failure the dirty set is restored so no edit is lost; the next edit
    /// re-arms the timer and retries.
    async fn flush_pending(&mut self) -> FormResult<()> {
        self.autosave_deadline = None;
        if !self.state.is_dirty() {
            return Ok(());
        }
        let Some(id) = self.state.record_id() else {
            return Ok(());
        };

        let dirty = self.state.take_dirty();
        let patch = payload::patch_payload(self.state.record(), dirty.iter().copied());
        match self.store.patch(id, patch).await {
            Ok(()) => {
                tracing::debug!(record_id = %id, fields = dirty.len(), "autosaved");
                Ok(())
            }
            Err(error) => {
                self.state.restore_dirty(dirty);
                tracing::warn!(record_id = %id, %error, "autosave failed, edits retained");
                Err(error.into())
            }
        }
    }
}
