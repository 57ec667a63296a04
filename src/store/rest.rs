use super::{ConfirmedDelete, RemoteStore, update_body};
use crate::config::TrackerConfig;
use crate::core::{
    Company, FieldValue, NewOpportunity, Opportunity, OpportunityField, Result, TrackerError,
};
use async_trait::async_trait;
use log::{debug, warn};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

const PREFER: &str = "Prefer";
const RETURN_REPRESENTATION: &str = "return=representation";

/// PostgREST-backed store.
pub struct RestStore {
    client: Client,
    config: TrackerConfig,
}

impl RestStore {
    pub fn new(config: TrackerConfig) -> Result<Self> {
        config.validate()?;

        let mut headers = HeaderMap::new();
        headers.insert("apikey", header_value(&config.api_key)?);
        headers.insert(
            AUTHORIZATION,
            header_value(&format!("Bearer {}", config.bearer()))?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()
            .map_err(|err| TrackerError::Config(format!("Failed to build HTTP client: {}", err)))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    fn opportunities_url(&self) -> String {
        self.config.rest_url(&self.config.opportunities_table)
    }

    async fn read<T: DeserializeOwned>(&self, request: RequestBuilder, what: &str) -> Result<T> {
        let response = request
            .send()
            .await
            .map_err(|err| TrackerError::RemoteRead(format!("{}: {}", what, err)))?;
        let response = check_status(response, what, TrackerError::RemoteRead).await?;
        response
            .json::<T>()
            .await
            .map_err(|err| TrackerError::RemoteRead(format!("{}: invalid body: {}", what, err)))
    }

    /// Sends a write that returns the affected rows; no rows means the id
    /// matched nothing.
    async fn write_returning(&self, request: RequestBuilder, id: &str, what: &str) -> Result<()> {
        let response = request
            .header(PREFER, RETURN_REPRESENTATION)
            .send()
            .await
            .map_err(|err| TrackerError::RemoteWrite(format!("{}: {}", what, err)))?;
        let response = check_status(response, what, TrackerError::RemoteWrite).await?;
        let rows: Vec<JsonValue> = response
            .json()
            .await
            .map_err(|err| TrackerError::RemoteWrite(format!("{}: invalid body: {}", what, err)))?;
        if rows.is_empty() {
            return Err(TrackerError::NotFound(id.to_string()));
        }
        Ok(())
    }
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|_| TrackerError::Config("credential contains invalid header characters".to_string()))
}

async fn check_status(
    response: Response,
    what: &str,
    error: fn(String) -> TrackerError,
) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    warn!("{} failed with {}: {}", what, status, body);
    Err(error(format!("{} returned {}: {}", what, status, body)))
}

#[async_trait]
impl RemoteStore for RestStore {
    async fn list_all(&self) -> Result<Vec<Opportunity>> {
        // Alias keeps the joined key stable when the companies table is renamed.
        let select = format!("*,companies:{}(*)", self.config.companies_table);
        let request = self
            .client
            .get(self.opportunities_url())
            .query(&[("select", select.as_str()), ("order", "sort_order.asc")]);
        let opportunities: Vec<Opportunity> = self.read(request, "list opportunities").await?;
        debug!("Fetched {} opportunities", opportunities.len());
        Ok(opportunities)
    }

    async fn list_companies(&self) -> Result<Vec<Company>> {
        let request = self
            .client
            .get(self.config.rest_url(&self.config.companies_table))
            .query(&[("select", "*"), ("order", "name.asc")]);
        self.read(request, "list companies").await
    }

    async fn update_field(
        &self,
        id: &str,
        field: OpportunityField,
        value: &FieldValue,
    ) -> Result<()> {
        let request = self
            .client
            .patch(self.opportunities_url())
            .query(&[("id", format!("eq.{}", id))])
            .json(&update_body(field, value));
        self.write_returning(request, id, &format!("update {}", field))
            .await
    }

    async fn insert(&self, opportunity: &NewOpportunity) -> Result<()> {
        let request = self.client.post(self.opportunities_url()).json(opportunity);
        self.write_returning(request, &opportunity.id, "insert opportunity")
            .await
    }

    async fn delete_record(&self, confirmed: &ConfirmedDelete) -> Result<()> {
        let request = self
            .client
            .delete(self.opportunities_url())
            .query(&[("id", format!("eq.{}", confirmed.id()))]);
        self.write_returning(request, confirmed.id(), "delete opportunity")
            .await
    }
}
