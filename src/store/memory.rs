use super::{ConfirmedDelete, RemoteStore, update_body};
use crate::core::{
    Company, FieldValue, Indicator, NewOpportunity, Opportunity, OpportunityField, Phase, Result,
    TrackerError,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use log::debug;
use serde_json::Value as JsonValue;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

/// Write observed by a [`MemoryStore`], in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteRecord {
    Update { id: String, body: JsonValue },
    Insert { id: String },
    Delete { id: String },
}

/// In-process table store with the same contract as the remote one.
#[derive(Debug, Default)]
pub struct MemoryStore {
    opportunities: RwLock<Vec<Opportunity>>,
    companies: RwLock<Vec<Company>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    /// Successful writes left before one write is rejected.
    fail_write_after: Mutex<Option<usize>>,
    writes: Mutex<Vec<WriteRecord>>,
}

impl MemoryStore {
    pub fn new(opportunities: Vec<Opportunity>, companies: Vec<Company>) -> Self {
        Self {
            opportunities: RwLock::new(opportunities),
            companies: RwLock::new(companies),
            ..Self::default()
        }
    }

    /// Small seeded dataset for offline runs.
    pub fn demo() -> Self {
        let companies = vec![
            Company::new("co-northwind", "Northwind Logistics"),
            Company::new("co-acme", "Acme Health"),
            Company::new("co-globex", "Globex Retail"),
        ];

        let seeds: [(&str, &str, usize, Phase, &str, Option<f64>, Option<(i32, u32, u32)>); 6] = [
            ("opp-route", "Route optimisation", 0, Phase::MvpPilot, "in_progress", Some(150000.0), Some((2025, 3, 1))),
            ("opp-claims", "Claims triage assistant", 1, Phase::Poc, "planned", Some(420000.0), Some((2025, 1, 15))),
            ("opp-churn", "Churn early warning", 2, Phase::Discovery, "paused", None, None),
            ("opp-pricing", "Dynamic pricing", 2, Phase::FullDeployment, "done", Some(980000.0), Some((2024, 11, 30))),
            ("opp-notes", "Clinical note summaries", 1, Phase::Identification, "Needs review", Some(60000.0), None),
            ("opp-forecast", "Demand forecasting", 0, Phase::Poc, "not_go", Some(0.0), Some((2025, 6, 10))),
        ];

        let opportunities = seeds
            .into_iter()
            .enumerate()
            .map(|(index, (id, name, company, phase, status, som, date))| {
                let mut opportunity = Opportunity::new(id, name);
                opportunity.company_id = Some(companies[company].id.clone());
                opportunity.company = Some(companies[company].name.clone());
                opportunity.phase = phase;
                opportunity.status = status.to_string();
                opportunity.estimated_som = som;
                opportunity.target_date =
                    date.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d));
                opportunity.messaging_indicator = Some(Indicator::ALL[index % 3]);
                opportunity.campaign_indicator = Some(Indicator::ALL[(index + 1) % 3]);
                opportunity.pricing_indicator = if index % 2 == 0 {
                    Some(Indicator::Green)
                } else {
                    None
                };
                opportunity.sales_alignment_indicator = Some(Indicator::Amber);
                if index % 3 == 0 {
                    opportunity
                        .demo_links
                        .push(format!("https://demo.example.com/{}", id));
                }
                opportunity.sort_order = index as i64;
                opportunity
            })
            .collect();

        Self::new(opportunities, companies)
    }

    /// While set, every read fails with `RemoteRead`.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// While set, every write fails with `RemoteWrite`.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Lets `successes` more writes through, rejects the next one, then
    /// accepts writes again.
    pub fn fail_write_after(&self, successes: usize) {
        if let Ok(mut remaining) = self.fail_write_after.lock() {
            *remaining = Some(successes);
        }
    }

    pub fn writes(&self) -> Vec<WriteRecord> {
        self.writes
            .lock()
            .map(|writes| writes.clone())
            .unwrap_or_default()
    }

    /// Current row as stored, without the company join.
    pub async fn get(&self, id: &str) -> Option<Opportunity> {
        self.opportunities
            .read()
            .await
            .iter()
            .find(|opportunity| opportunity.id == id)
            .cloned()
    }

    /// Simulates another client writing the same field.
    pub async fn overwrite(&self, id: &str, field: OpportunityField, value: FieldValue) -> Result<()> {
        let mut opportunities = self.opportunities.write().await;
        let opportunity = opportunities
            .iter_mut()
            .find(|opportunity| opportunity.id == id)
            .ok_or_else(|| TrackerError::NotFound(id.to_string()))?;
        opportunity.set_field(field, value)
    }

    fn check_reads(&self) -> Result<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(TrackerError::RemoteRead(
                "memory store is rejecting reads".to_string(),
            ));
        }
        Ok(())
    }

    fn check_writes(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(TrackerError::RemoteWrite(
                "memory store is rejecting writes".to_string(),
            ));
        }
        if let Ok(mut remaining) = self.fail_write_after.lock() {
            match *remaining {
                Some(0) => {
                    *remaining = None;
                    return Err(TrackerError::RemoteWrite(
                        "memory store rejected this write".to_string(),
                    ));
                }
                Some(left) => *remaining = Some(left - 1),
                None => {}
            }
        }
        Ok(())
    }

    fn record(&self, write: WriteRecord) {
        if let Ok(mut writes) = self.writes.lock() {
            writes.push(write);
        }
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn list_all(&self) -> Result<Vec<Opportunity>> {
        self.check_reads()?;
        let companies = self.companies.read().await;
        let mut opportunities = self.opportunities.read().await.clone();
        opportunities.sort_by_key(|opportunity| opportunity.sort_order);
        for opportunity in &mut opportunities {
            opportunity.companies = opportunity
                .company_id
                .as_ref()
                .and_then(|id| companies.iter().find(|company| &company.id == id))
                .cloned();
        }
        Ok(opportunities)
    }

    async fn list_companies(&self) -> Result<Vec<Company>> {
        self.check_reads()?;
        let mut companies = self.companies.read().await.clone();
        companies.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(companies)
    }

    async fn update_field(
        &self,
        id: &str,
        field: OpportunityField,
        value: &FieldValue,
    ) -> Result<()> {
        self.check_writes()?;
        let mut opportunities = self.opportunities.write().await;
        let opportunity = opportunities
            .iter_mut()
            .find(|opportunity| opportunity.id == id)
            .ok_or_else(|| TrackerError::NotFound(id.to_string()))?;

        let mut updated = opportunity.clone();
        updated
            .set_field(field, value.clone())
            .map_err(|err| TrackerError::RemoteWrite(err.to_string()))?;
        *opportunity = updated;

        debug!("memory store: {} updated on '{}'", field, id);
        self.record(WriteRecord::Update {
            id: id.to_string(),
            body: update_body(field, value),
        });
        Ok(())
    }

    async fn insert(&self, opportunity: &NewOpportunity) -> Result<()> {
        self.check_writes()?;
        let mut opportunities = self.opportunities.write().await;
        if opportunities.iter().any(|existing| existing.id == opportunity.id) {
            return Err(TrackerError::RemoteWrite(format!(
                "duplicate key value '{}'",
                opportunity.id
            )));
        }
        opportunities.push(opportunity.clone().into_opportunity());
        self.record(WriteRecord::Insert {
            id: opportunity.id.clone(),
        });
        Ok(())
    }

    async fn delete_record(&self, confirmed: &ConfirmedDelete) -> Result<()> {
        self.check_writes()?;
        let mut opportunities = self.opportunities.write().await;
        let before = opportunities.len();
        opportunities.retain(|opportunity| opportunity.id != confirmed.id());
        if opportunities.len() == before {
            return Err(TrackerError::NotFound(confirmed.id().to_string()));
        }
        self.record(WriteRecord::Delete {
            id: confirmed.id().to_string(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn list_all_joins_companies_in_sort_order() {
        let store = MemoryStore::demo();
        let opportunities = store.list_all().await.unwrap();
        assert_eq!(opportunities.len(), 6);
        assert!(
            opportunities
                .windows(2)
                .all(|pair| pair[0].sort_order <= pair[1].sort_order)
        );
        let route = opportunities.iter().find(|o| o.id == "opp-route").unwrap();
        assert_eq!(
            route.companies.as_ref().map(|c| c.name.as_str()),
            Some("Northwind Logistics")
        );
    }

    #[tokio::test]
    async fn update_of_missing_row_is_not_found() {
        let store = MemoryStore::demo();
        let err = store
            .update_field("nope", OpportunityField::Name, &FieldValue::Text("x".into()))
            .await
            .unwrap_err();
        assert_eq!(err, TrackerError::NotFound("nope".to_string()));
        assert!(store.writes().is_empty());
    }

    #[tokio::test]
    async fn rejected_values_leave_the_row_alone() {
        let store = MemoryStore::demo();
        let err = store
            .update_field("opp-route", OpportunityField::Phase, &FieldValue::Integer(12))
            .await
            .unwrap_err();
        assert!(matches!(err, TrackerError::RemoteWrite(_)));
        assert_eq!(store.get("opp-route").await.unwrap().phase, Phase::MvpPilot);
    }

    #[tokio::test]
    async fn one_shot_write_failure_after_successes() {
        let store = MemoryStore::demo();
        store.fail_write_after(1);
        let rename = |name: &str| FieldValue::Text(name.to_string());

        assert!(store.update_field("opp-route", OpportunityField::Name, &rename("a")).await.is_ok());
        let err = store
            .update_field("opp-route", OpportunityField::Name, &rename("b"))
            .await
            .unwrap_err();
        assert!(matches!(err, TrackerError::RemoteWrite(_)));
        assert!(store.update_field("opp-route", OpportunityField::Name, &rename("c")).await.is_ok());

        assert_eq!(store.get("opp-route").await.unwrap().name, "c");
        assert_eq!(store.writes().len(), 2);
    }
}
