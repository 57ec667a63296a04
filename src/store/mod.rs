//! Data access to the remote table store.

pub mod memory;
pub mod rest;

use crate::core::{Company, FieldValue, NewOpportunity, Opportunity, OpportunityField, Result};
use async_trait::async_trait;
use serde_json::{Map, Value as JsonValue};

pub use memory::{MemoryStore, WriteRecord};
pub use rest::RestStore;

/// Point reads and writes against the opportunity and company tables.
///
/// Use `MemoryStore` for tests and offline runs, `RestStore` against a
/// PostgREST endpoint. There is no concurrency token: the last write to land
/// wins at the remote store.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// All opportunities joined with their company, ordered by `sort_order`.
    async fn list_all(&self) -> Result<Vec<Opportunity>>;

    async fn list_companies(&self) -> Result<Vec<Company>>;

    /// Partial update of one record; the body has exactly one key.
    async fn update_field(&self, id: &str, field: OpportunityField, value: &FieldValue)
    -> Result<()>;

    async fn insert(&self, opportunity: &NewOpportunity) -> Result<()>;

    /// Destructive; only reachable through [`PendingDelete::confirm`].
    async fn delete_record(&self, confirmed: &ConfirmedDelete) -> Result<()>;
}

/// Body of a single-field update: `{ "<column>": <value> }`.
pub fn update_body(field: OpportunityField, value: &FieldValue) -> JsonValue {
    let mut body = Map::with_capacity(1);
    body.insert(field.column().to_string(), value.to_json());
    JsonValue::Object(body)
}

/// A delete the user has been asked about but not yet answered.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "a pending delete does nothing until confirmed"]
pub struct PendingDelete {
    id: String,
    name: String,
}

impl PendingDelete {
    pub(crate) fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn prompt(&self) -> String {
        format!(
            "Are you sure you want to delete this opportunity? ({})",
            self.name
        )
    }

    pub fn confirm(self) -> ConfirmedDelete {
        ConfirmedDelete { id: self.id }
    }

    pub fn decline(self) -> String {
        self.id
    }
}

/// Proof that the user confirmed a delete. Not constructible outside
/// [`PendingDelete::confirm`].
#[derive(Debug, PartialEq, Eq)]
pub struct ConfirmedDelete {
    id: String,
}

impl ConfirmedDelete {
    pub fn id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_body_has_exactly_one_key() {
        let body = update_body(OpportunityField::EstimatedSom, &FieldValue::Number(150000.0));
        let object = body.as_object().unwrap();
        assert_eq!(object.len(), 1);
        assert_eq!(object["estimated_som"], serde_json::json!(150000.0));
    }

    #[test]
    fn confirmation_carries_the_id() {
        let pending = PendingDelete::new("opp-1", "Forecasting");
        assert!(pending.prompt().contains("Forecasting"));
        assert_eq!(pending.confirm().id(), "opp-1");
    }
}
