// ============================================================================
// src/state/optimistic.rs - Optimistic record list
// ============================================================================
//
// The displayed list is always `authoritative` with every pending patch
// applied in issue order. A refetch replaces `authoritative` and drops every
// pending patch; a failed write drops only its own patch.
//
// ============================================================================

use crate::core::{FieldValue, Opportunity, OpportunityField, Result};
use log::debug;
use std::sync::Arc;

/// Single-field change to one record.
#[derive(Debug, Clone, PartialEq)]
pub struct Patch {
    pub id: String,
    pub field: OpportunityField,
    pub value: FieldValue,
}

impl Patch {
    pub fn new(id: impl Into<String>, field: OpportunityField, value: FieldValue) -> Self {
        Self {
            id: id.into(),
            field,
            value,
        }
    }
}

/// Handle for a patch that is waiting on its remote write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PatchTicket(u64);

/// Returns `records` with `patch` applied.
///
/// Only the record whose id matches is rebuilt; every other entry is the same
/// `Arc` as in the input and order is preserved. A patch for an unknown id
/// leaves the list unchanged.
pub fn apply_patch(records: &[Arc<Opportunity>], patch: &Patch) -> Result<Vec<Arc<Opportunity>>> {
    records
        .iter()
        .map(|record| {
            if record.id != patch.id {
                return Ok(Arc::clone(record));
            }
            let mut updated = Opportunity::clone(record);
            updated.set_field(patch.field, patch.value.clone())?;
            Ok(Arc::new(updated))
        })
        .collect()
}

#[derive(Debug, Clone)]
struct PendingPatch {
    ticket: PatchTicket,
    patch: Patch,
    confirmed: bool,
}

#[derive(Debug, Clone, Default)]
pub struct OptimisticState {
    authoritative: Vec<Arc<Opportunity>>,
    displayed: Vec<Arc<Opportunity>>,
    pending: Vec<PendingPatch>,
    next_ticket: u64,
}

impl OptimisticState {
    pub fn new(records: Vec<Opportunity>) -> Self {
        let authoritative: Vec<Arc<Opportunity>> = records.into_iter().map(Arc::new).collect();
        Self {
            displayed: authoritative.clone(),
            authoritative,
            pending: Vec::new(),
            next_ticket: 0,
        }
    }

    /// Applies `patch` to the displayed list immediately.
    pub fn apply(&mut self, patch: Patch) -> Result<PatchTicket> {
        self.displayed = apply_patch(&self.displayed, &patch)?;
        let ticket = PatchTicket(self.next_ticket);
        self.next_ticket += 1;
        debug!(
            "Optimistic patch #{} on '{}': {} = {}",
            ticket.0, patch.id, patch.field, patch.value
        );
        self.pending.push(PendingPatch {
            ticket,
            patch,
            confirmed: false,
        });
        Ok(ticket)
    }

    /// The remote write for `ticket` succeeded. The patch stays displayed
    /// until the next authoritative list arrives.
    pub fn confirm(&mut self, ticket: PatchTicket) -> bool {
        match self.pending.iter_mut().find(|pending| pending.ticket == ticket) {
            Some(pending) => {
                pending.confirmed = true;
                true
            }
            None => false,
        }
    }

    /// The remote write for `ticket` failed: drop the patch and rebuild the
    /// displayed list from the authoritative one.
    ///
    /// Returns the dropped patch, or `None` when a refetch already superseded it.
    pub fn rollback(&mut self, ticket: PatchTicket) -> Result<Option<Patch>> {
        let Some(index) = self.pending.iter().position(|pending| pending.ticket == ticket) else {
            return Ok(None);
        };
        let removed = self.pending.remove(index);
        self.rebuild()?;
        debug!("Rolled back patch #{} on '{}'", ticket.0, removed.patch.id);
        Ok(Some(removed.patch))
    }

    /// Replaces the authoritative list. Every pending patch is discarded;
    /// there is no merge.
    pub fn replace_authoritative(&mut self, records: Vec<Opportunity>) {
        if !self.pending.is_empty() {
            debug!(
                "Authoritative list supersedes {} pending patch(es)",
                self.pending.len()
            );
        }
        self.authoritative = records.into_iter().map(Arc::new).collect();
        self.displayed = self.authoritative.clone();
        self.pending.clear();
    }

    /// Drops a record the store no longer holds, with any patches aimed at
    /// it. Returns whether the record was present.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.authoritative.len();
        self.authoritative.retain(|record| record.id != id);
        self.displayed.retain(|record| record.id != id);
        self.pending.retain(|pending| pending.patch.id != id);
        self.authoritative.len() != before
    }

    /// Appends a record the store has just accepted, ahead of the next
    /// authoritative list.
    pub fn insert(&mut self, record: Opportunity) {
        let record = Arc::new(record);
        self.authoritative.push(Arc::clone(&record));
        self.displayed.push(record);
    }

    fn rebuild(&mut self) -> Result<()> {
        let mut displayed = self.authoritative.clone();
        for pending in &self.pending {
            displayed = apply_patch(&displayed, &pending.patch)?;
        }
        self.displayed = displayed;
        Ok(())
    }

    pub fn displayed(&self) -> &[Arc<Opportunity>] {
        &self.displayed
    }

    pub fn authoritative(&self) -> &[Arc<Opportunity>] {
        &self.authoritative
    }

    pub fn get(&self, id: &str) -> Option<&Arc<Opportunity>> {
        self.displayed.iter().find(|record| record.id == id)
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn unconfirmed_len(&self) -> usize {
        self.pending.iter().filter(|pending| !pending.confirmed).count()
    }

    pub fn is_pending(&self, ticket: PatchTicket) -> bool {
        self.pending.iter().any(|pending| pending.ticket == ticket)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> OptimisticState {
        OptimisticState::new(vec![
            Opportunity::new("a", "Alpha"),
            Opportunity::new("b", "Beta"),
        ])
    }

    fn rename(id: &str, name: &str) -> Patch {
        Patch::new(id, OpportunityField::Name, FieldValue::Text(name.to_string()))
    }

    #[test]
    fn unknown_id_leaves_list_untouched() {
        let state = state();
        let patched = apply_patch(state.displayed(), &rename("zzz", "Nope")).unwrap();
        for (before, after) in state.displayed().iter().zip(&patched) {
            assert!(Arc::ptr_eq(before, after));
        }
    }

    #[test]
    fn rollback_keeps_later_patches() {
        let mut state = state();
        let first = state.apply(rename("a", "First")).unwrap();
        let _second = state
            .apply(Patch::new(
                "a",
                OpportunityField::Description,
                FieldValue::Text("kept".to_string()),
            ))
            .unwrap();

        state.rollback(first).unwrap();

        let record = state.get("a").unwrap();
        assert_eq!(record.name, "Alpha");
        assert_eq!(record.description.as_deref(), Some("kept"));
        assert_eq!(state.pending_len(), 1);
    }

    #[test]
    fn rollback_after_refetch_is_a_no_op() {
        let mut state = state();
        let ticket = state.apply(rename("a", "First")).unwrap();
        state.replace_authoritative(vec![Opportunity::new("a", "Server")]);
        assert_eq!(state.rollback(ticket).unwrap(), None);
        assert_eq!(state.get("a").unwrap().name, "Server");
    }

    #[test]
    fn invalid_patch_is_not_recorded() {
        let mut state = state();
        let result = state.apply(Patch::new("a", OpportunityField::Phase, FieldValue::Integer(8)));
        assert!(result.is_err());
        assert_eq!(state.pending_len(), 0);
    }

    #[test]
    fn remove_drops_record_and_its_patches() {
        let mut state = state();
        let ticket = state.apply(rename("a", "First")).unwrap();
        state.apply(rename("b", "Second")).unwrap();
        assert_eq!(state.unconfirmed_len(), 2);

        assert!(state.remove("a"));

        assert!(state.get("a").is_none());
        assert!(!state.is_pending(ticket));
        assert_eq!(state.get("b").unwrap().name, "Second");
        assert!(!state.remove("a"));
    }

    #[test]
    fn inserted_record_survives_rollback() {
        let mut state = state();
        let ticket = state.apply(rename("a", "First")).unwrap();
        state.insert(Opportunity::new("c", "Gamma"));

        state.rollback(ticket).unwrap();

        assert_eq!(state.get("c").unwrap().name, "Gamma");
        assert_eq!(state.displayed().len(), 3);
    }
}
