// ============================================================================
// src/session.rs - Per-view tracker session
// ============================================================================
//
// Write path: edit controller → optimistic patch → remote write → refetch.
// A failed write rolls its patch back and is kept as `last_error`; a
// successful one is superseded by the refetch that follows it. Confirmed
// inserts and deletes are applied to the local list before that refetch, so
// a failed reload still shows them.
//
// ============================================================================

use crate::core::{
    Company, FieldValue, NewOpportunity, Opportunity, OpportunityField, Result, TrackerError,
};
use crate::edit::{EditController, EditKey, EditState, EditTransition, KeyOutcome};
use crate::state::{AppState, OptimisticState, Patch, PatchTicket};
use crate::store::{ConfirmedDelete, PendingDelete, RemoteStore};
use crate::view::{
    FilterState, SortField, SortState, TableRow, TimelineColumn, ViewQuery, group_by_phase,
};
use log::{info, warn};
use std::sync::Arc;
use tracing::{Instrument, Level, event, info_span};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Loading,
    Ready,
    /// The first load failed; `refetch` retries it.
    Failed { message: String },
}

/// Optimistic patch applied locally, waiting for its remote write.
#[derive(Debug)]
#[must_use = "the remote write only happens in TrackerSession::complete"]
pub struct StagedWrite {
    ticket: PatchTicket,
    patch: Patch,
}

impl StagedWrite {
    pub fn patch(&self) -> &Patch {
        &self.patch
    }
}

/// Company change applied locally: the id and the denormalized name.
#[derive(Debug)]
#[must_use = "the remote writes only happen in TrackerSession::complete_company"]
pub struct StagedCompany {
    company_id: StagedWrite,
    company: StagedWrite,
    previous_id: FieldValue,
}

impl StagedCompany {
    pub fn record_id(&self) -> &str {
        &self.company_id.patch.id
    }
}

pub struct TrackerSession<S: RemoteStore> {
    store: Arc<S>,
    load_state: LoadState,
    records: OptimisticState,
    companies: Vec<Company>,
    editor: EditController,
    app_state: AppState,
    last_error: Option<TrackerError>,
}

impl<S: RemoteStore> TrackerSession<S> {
    pub fn new(store: Arc<S>, app_state: AppState) -> Self {
        Self {
            store,
            load_state: LoadState::Loading,
            records: OptimisticState::default(),
            companies: Vec::new(),
            editor: EditController::new(),
            app_state,
            last_error: None,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn load_state(&self) -> &LoadState {
        &self.load_state
    }

    pub fn records(&self) -> &OptimisticState {
        &self.records
    }

    pub fn record(&self, id: &str) -> Option<&Arc<Opportunity>> {
        self.records.get(id)
    }

    pub fn companies(&self) -> &[Company] {
        &self.companies
    }

    pub fn edit_state(&self) -> &EditState {
        self.editor.state()
    }

    pub fn app_state(&self) -> &AppState {
        &self.app_state
    }

    pub fn app_state_mut(&mut self) -> &mut AppState {
        &mut self.app_state
    }

    pub fn filters_mut(&mut self) -> &mut FilterState {
        &mut self.app_state.filters
    }

    pub fn sort(&self) -> SortState {
        self.app_state.sort
    }

    pub fn toggle_sort(&mut self, field: SortField) {
        self.app_state.sort.toggle(field);
    }

    pub fn last_error(&self) -> Option<&TrackerError> {
        self.last_error.as_ref()
    }

    pub fn take_error(&mut self) -> Option<TrackerError> {
        self.last_error.take()
    }

    // ------------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------------

    /// Reloads both tables. The result replaces the displayed list outright.
    pub async fn refetch(&mut self) -> Result<()> {
        let fetched = futures::try_join!(self.store.list_all(), self.store.list_companies());
        match fetched {
            Ok((opportunities, companies)) => {
                info!(
                    "Loaded {} opportunities and {} companies",
                    opportunities.len(),
                    companies.len()
                );
                self.records.replace_authoritative(opportunities);
                self.companies = companies;
                self.load_state = LoadState::Ready;
                Ok(())
            }
            Err(err) => {
                warn!("Refetch failed: {}", err);
                if self.load_state != LoadState::Ready {
                    self.load_state = LoadState::Failed {
                        message: err.to_string(),
                    };
                }
                self.last_error = Some(err.clone());
                Err(err)
            }
        }
    }

    /// Displayed records after the active filter and sort.
    pub fn visible(&self) -> Vec<Arc<Opportunity>> {
        ViewQuery::new(&self.app_state.filters, self.app_state.sort).apply(self.records.displayed())
    }

    pub fn table_rows(&self) -> Vec<TableRow> {
        self.visible()
            .iter()
            .map(|record| TableRow::build(record, self.editor.state()))
            .collect()
    }

    /// Filtered records grouped by phase, in remote order.
    pub fn timeline(&self) -> Vec<TimelineColumn> {
        let filtered: Vec<Arc<Opportunity>> = self
            .records
            .displayed()
            .iter()
            .filter(|record| self.app_state.filters.matches(record))
            .cloned()
            .collect();
        group_by_phase(&filtered)
    }

    // ------------------------------------------------------------------------
    // Inline edits
    // ------------------------------------------------------------------------

    pub fn begin_edit(&mut self, id: &str, field: OpportunityField) -> Result<EditTransition> {
        let record = self
            .records
            .get(id)
            .cloned()
            .ok_or_else(|| TrackerError::NotFound(id.to_string()))?;
        self.editor.begin(&record, field)
    }

    pub fn set_draft(&mut self, draft: impl Into<String>) -> Result<()> {
        self.editor.set_draft(draft)
    }

    /// Draft keys only; `Accept` goes through [`Self::stage_commit`].
    pub fn edit_key(&mut self, key: EditKey) -> KeyOutcome {
        match key {
            EditKey::Accept => KeyOutcome::Ignored,
            other => self.editor.handle_key(other),
        }
    }

    pub fn cancel_edit(&mut self) -> bool {
        self.editor.cancel().is_some()
    }

    /// Validates the draft and applies it locally. A validation failure keeps
    /// the cell in edit mode and nothing is written.
    pub fn stage_commit(&mut self) -> Result<StagedWrite> {
        let patch = self.editor.commit()?;
        self.stage(patch)
    }

    /// One-shot local apply for a select-type field.
    pub fn stage_select(
        &mut self,
        id: &str,
        field: OpportunityField,
        value: FieldValue,
    ) -> Result<StagedWrite> {
        if self.records.get(id).is_none() {
            return Err(TrackerError::NotFound(id.to_string()));
        }
        let patch = self.editor.select(id, field, value)?;
        self.stage(patch)
    }

    fn stage(&mut self, patch: Patch) -> Result<StagedWrite> {
        let ticket = self.records.apply(patch.clone())?;
        Ok(StagedWrite { ticket, patch })
    }

    /// Sends the staged write. On failure the patch is rolled back and the
    /// error is both returned and kept as `last_error`. A failed refetch after
    /// a successful write does not fail the write; it lands in `last_error`.
    pub async fn complete(&mut self, staged: StagedWrite) -> Result<()> {
        self.send(staged).await?;
        let _ = self.refetch().await;
        Ok(())
    }

    async fn send(&mut self, staged: StagedWrite) -> Result<()> {
        let StagedWrite { ticket, patch } = staged;
        let span = info_span!(
            "tracker.remote_update",
            record_id = %patch.id,
            field = %patch.field
        );

        let written = self
            .store
            .update_field(&patch.id, patch.field, &patch.value)
            .instrument(span)
            .await;

        match written {
            Ok(()) => {
                self.records.confirm(ticket);
                event!(Level::DEBUG, record_id = %patch.id, "remote update confirmed");
                Ok(())
            }
            Err(err) => {
                event!(Level::WARN, record_id = %patch.id, error = %err, "remote update failed");
                self.records.rollback(ticket)?;
                self.last_error = Some(err.clone());
                Err(err)
            }
        }
    }

    pub async fn commit_edit(&mut self) -> Result<()> {
        let staged = self.stage_commit()?;
        self.complete(staged).await
    }

    pub async fn select_field(
        &mut self,
        id: &str,
        field: OpportunityField,
        value: FieldValue,
    ) -> Result<()> {
        let staged = self.stage_select(id, field, value)?;
        self.complete(staged).await
    }

    /// Points the record at another company locally: `company_id` and the
    /// denormalized `company` name, as two patches.
    pub fn stage_company(&mut self, id: &str, company_id: &str) -> Result<StagedCompany> {
        let company = self
            .companies
            .iter()
            .find(|company| company.id == company_id)
            .cloned()
            .ok_or_else(|| TrackerError::NotFound(company_id.to_string()))?;
        let previous_id = self
            .records
            .authoritative()
            .iter()
            .find(|record| record.id == id)
            .map(|record| record.field_value(OpportunityField::CompanyId))
            .ok_or_else(|| TrackerError::NotFound(id.to_string()))?;

        let id_write = self.stage_select(
            id,
            OpportunityField::CompanyId,
            FieldValue::Text(company.id.clone()),
        )?;
        match self.stage_select(id, OpportunityField::Company, FieldValue::Text(company.name)) {
            Ok(name_write) => Ok(StagedCompany {
                company_id: id_write,
                company: name_write,
                previous_id,
            }),
            Err(err) => {
                self.records.rollback(id_write.ticket)?;
                Err(err)
            }
        }
    }

    /// Writes `company_id`, then `company`. If the name write fails after the
    /// id landed, the previous id is written back so the row does not pair
    /// the new id with the old name.
    pub async fn complete_company(&mut self, staged: StagedCompany) -> Result<()> {
        let StagedCompany {
            company_id,
            company,
            previous_id,
        } = staged;
        let id = company_id.patch.id.clone();
        let id_ticket = company_id.ticket;

        if let Err(err) = self.send(company_id).await {
            self.records.rollback(company.ticket)?;
            return Err(err);
        }
        let name_err = match self.send(company).await {
            Ok(()) => {
                let _ = self.refetch().await;
                return Ok(());
            }
            Err(err) => err,
        };

        let restored = self
            .store
            .update_field(&id, OpportunityField::CompanyId, &previous_id)
            .await;
        let err = match restored {
            Ok(()) => {
                event!(Level::WARN, record_id = %id, error = %name_err, "company change reverted");
                self.records.rollback(id_ticket)?;
                name_err
            }
            Err(restore_err) => {
                event!(
                    Level::ERROR,
                    record_id = %id,
                    error = %restore_err,
                    "company id written but name and revert both failed"
                );
                TrackerError::RemoteWrite(format!(
                    "company id of '{}' changed but its name was not updated ({}); revert failed: {}",
                    id, name_err, restore_err
                ))
            }
        };
        let _ = self.refetch().await;
        self.last_error = Some(err.clone());
        Err(err)
    }

    pub async fn select_company(&mut self, id: &str, company_id: &str) -> Result<()> {
        let staged = self.stage_company(id, company_id)?;
        self.complete_company(staged).await
    }

    // ------------------------------------------------------------------------
    // Insert / delete
    // ------------------------------------------------------------------------

    /// Inserts a new opportunity and reloads. Returns the new id.
    pub async fn create_opportunity(&mut self, mut opportunity: NewOpportunity) -> Result<String> {
        opportunity.validate()?;
        if opportunity.id.is_empty() {
            opportunity.id = Uuid::new_v4().to_string();
        }
        if let Err(err) = self.store.insert(&opportunity).await {
            self.last_error = Some(err.clone());
            return Err(err);
        }
        info!("Created opportunity '{}'", opportunity.id);
        let id = opportunity.id.clone();
        let mut created = opportunity.into_opportunity();
        created.companies = created
            .company_id
            .as_ref()
            .and_then(|company_id| self.companies.iter().find(|company| &company.id == company_id))
            .cloned();
        self.records.insert(created);
        let _ = self.refetch().await;
        Ok(id)
    }

    /// First half of a delete: the caller must show the prompt and confirm.
    pub fn request_delete(&self, id: &str) -> Result<PendingDelete> {
        let record = self
            .records
            .get(id)
            .ok_or_else(|| TrackerError::NotFound(id.to_string()))?;
        Ok(PendingDelete::new(id, record.name.clone()))
    }

    pub async fn delete(&mut self, confirmed: ConfirmedDelete) -> Result<()> {
        if self.editor.state().session().is_some_and(|session| session.record_id == confirmed.id()) {
            self.editor.cancel();
        }
        if let Err(err) = self.store.delete_record(&confirmed).await {
            warn!("Delete of '{}' failed: {}", confirmed.id(), err);
            self.last_error = Some(err.clone());
            return Err(err);
        }
        info!("Deleted opportunity '{}'", confirmed.id());
        self.records.remove(confirmed.id());
        let _ = self.refetch().await;
        Ok(())
    }
}
