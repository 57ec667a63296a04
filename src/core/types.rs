use super::{Result, TrackerError};
use chrono::{DateTime, NaiveDate, Utc};
use log::warn;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

// ============================================================================
// Phase
// ============================================================================

/// Lifecycle stage of an opportunity, stored remotely as an integer 0-4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(into = "i64")]
pub enum Phase {
    #[default]
    Identification,
    Discovery,
    Poc,
    MvpPilot,
    FullDeployment,
}

impl Phase {
    pub const ALL: [Phase; 5] = [
        Phase::Identification,
        Phase::Discovery,
        Phase::Poc,
        Phase::MvpPilot,
        Phase::FullDeployment,
    ];

    pub fn number(self) -> i64 {
        match self {
            Phase::Identification => 0,
            Phase::Discovery => 1,
            Phase::Poc => 2,
            Phase::MvpPilot => 3,
            Phase::FullDeployment => 4,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Phase::Identification => "Identification",
            Phase::Discovery => "Discovery",
            Phase::Poc => "PoC",
            Phase::MvpPilot => "MVP Pilot",
            Phase::FullDeployment => "Full Deployment",
        }
    }

    pub fn short_name(self) -> String {
        format!("P{}", self.number())
    }
}

impl TryFrom<i64> for Phase {
    type Error = TrackerError;

    fn try_from(value: i64) -> Result<Self> {
        Phase::ALL
            .into_iter()
            .find(|phase| phase.number() == value)
            .ok_or_else(|| {
                TrackerError::validation("phase", format!("phase must be 0-4, got {}", value))
            })
    }
}

impl From<Phase> for i64 {
    fn from(phase: Phase) -> Self {
        phase.number()
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Phase {} ({})", self.number(), self.name())
    }
}

/// Rows written by other clients may carry a phase outside 0-4; those read as
/// phase 0 instead of failing the whole list.
fn lenient_phase<'de, D>(deserializer: D) -> std::result::Result<Phase, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<i64>::deserialize(deserializer)?;
    Ok(match raw {
        Some(number) => Phase::try_from(number).unwrap_or_else(|_| {
            warn!("Out-of-range phase {} read as phase 0", number);
            Phase::Identification
        }),
        None => Phase::Identification,
    })
}

// ============================================================================
// Status
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpportunityStatus {
    Done,
    InProgress,
    Paused,
    Planned,
    NotGo,
}

impl OpportunityStatus {
    pub const ALL: [OpportunityStatus; 5] = [
        OpportunityStatus::Done,
        OpportunityStatus::InProgress,
        OpportunityStatus::Paused,
        OpportunityStatus::Planned,
        OpportunityStatus::NotGo,
    ];

    /// Key stored in the remote `status` column.
    pub fn key(self) -> &'static str {
        match self {
            OpportunityStatus::Done => "done",
            OpportunityStatus::InProgress => "in_progress",
            OpportunityStatus::Paused => "paused",
            OpportunityStatus::Planned => "planned",
            OpportunityStatus::NotGo => "not_go",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            OpportunityStatus::Done => "Done",
            OpportunityStatus::InProgress => "In-Progress",
            OpportunityStatus::Paused => "Paused",
            OpportunityStatus::Planned => "Planned",
            OpportunityStatus::NotGo => "Not-Go",
        }
    }

    fn aliases(self) -> &'static [&'static str] {
        match self {
            OpportunityStatus::Done => &["done"],
            OpportunityStatus::InProgress => &["in_progress", "in-progress", "in progress"],
            OpportunityStatus::Paused => &["paused"],
            OpportunityStatus::Planned => &["planned"],
            OpportunityStatus::NotGo => &["not_go", "not-go", "not go"],
        }
    }
}

/// Outcome of reading the free-text `status` column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusParse {
    Known(OpportunityStatus),
    Unknown(String),
}

impl StatusParse {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        OpportunityStatus::ALL
            .into_iter()
            .find(|status| {
                status
                    .aliases()
                    .iter()
                    .any(|alias| alias.eq_ignore_ascii_case(trimmed))
            })
            .map(StatusParse::Known)
            .unwrap_or_else(|| StatusParse::Unknown(raw.to_string()))
    }

    pub fn known(&self) -> Option<OpportunityStatus> {
        match self {
            StatusParse::Known(status) => Some(*status),
            StatusParse::Unknown(_) => None,
        }
    }

    pub fn label(&self) -> String {
        match self {
            StatusParse::Known(status) => status.label().to_string(),
            StatusParse::Unknown(raw) if raw.trim().is_empty() => "Unknown".to_string(),
            StatusParse::Unknown(raw) => raw.clone(),
        }
    }
}

// ============================================================================
// Indicators
// ============================================================================

/// Readiness signal colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Indicator {
    Green,
    Amber,
    Red,
}

impl Indicator {
    pub const ALL: [Indicator; 3] = [Indicator::Green, Indicator::Amber, Indicator::Red];

    pub fn key(self) -> &'static str {
        match self {
            Indicator::Green => "green",
            Indicator::Amber => "amber",
            Indicator::Red => "red",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Indicator::ALL
            .into_iter()
            .find(|indicator| indicator.key().eq_ignore_ascii_case(raw.trim()))
    }
}

/// Reads an indicator column with the same tolerance as [`Indicator::parse`];
/// unrecognised text reads as no signal.
fn lenient_indicator<'de, D>(deserializer: D) -> std::result::Result<Option<Indicator>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|raw| {
        let parsed = Indicator::parse(&raw);
        if parsed.is_none() && !raw.trim().is_empty() {
            warn!("Unknown indicator '{}' read as no signal", raw);
        }
        parsed
    }))
}

/// The four readiness signals tracked per opportunity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorKind {
    Messaging,
    Campaign,
    Pricing,
    SalesAlignment,
}

impl IndicatorKind {
    pub const ALL: [IndicatorKind; 4] = [
        IndicatorKind::Messaging,
        IndicatorKind::Campaign,
        IndicatorKind::Pricing,
        IndicatorKind::SalesAlignment,
    ];

    pub fn label(self) -> &'static str {
        match self {
            IndicatorKind::Messaging => "Messaging",
            IndicatorKind::Campaign => "Campaign",
            IndicatorKind::Pricing => "Pricing",
            IndicatorKind::SalesAlignment => "Sales Alignment",
        }
    }
}

// ============================================================================
// Rows
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Company {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let name = name.into();
        let slug = name
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("-");
        Self {
            id: id.into(),
            name,
            slug,
            created_at: None,
            updated_at: None,
        }
    }
}

/// Reference to a file held by the external attachment storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
    #[serde(default)]
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    pub id: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(deserialize_with = "null_as_empty")]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient_phase")]
    pub phase: Phase,
    #[serde(default)]
    pub stage: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub status: String,
    #[serde(default)]
    pub arr: Option<f64>,
    #[serde(default)]
    pub nrr: Option<f64>,
    #[serde(default)]
    pub estimated_som: Option<f64>,
    #[serde(default)]
    pub som_currency: Option<String>,
    #[serde(default)]
    pub next_steps: Option<String>,
    #[serde(default)]
    pub target_date: Option<NaiveDate>,
    #[serde(default)]
    pub issues: Option<String>,
    #[serde(default)]
    pub unlocks: Option<String>,
    #[serde(default, deserialize_with = "lenient_indicator")]
    pub messaging_indicator: Option<Indicator>,
    #[serde(default, deserialize_with = "lenient_indicator")]
    pub campaign_indicator: Option<Indicator>,
    #[serde(default, deserialize_with = "lenient_indicator")]
    pub pricing_indicator: Option<Indicator>,
    #[serde(default, deserialize_with = "lenient_indicator")]
    pub sales_alignment_indicator: Option<Indicator>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub company_id: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub demo_links: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub sort_order: i64,
    #[serde(default)]
    pub customer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Joined company row; read only, never written back.
    #[serde(default, skip_serializing)]
    pub companies: Option<Company>,
}

impl Opportunity {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            parent_id: None,
            name: name.into(),
            description: None,
            phase: Phase::default(),
            stage: None,
            status: OpportunityStatus::Planned.key().to_string(),
            arr: None,
            nrr: None,
            estimated_som: None,
            som_currency: None,
            next_steps: None,
            target_date: None,
            issues: None,
            unlocks: None,
            messaging_indicator: None,
            campaign_indicator: None,
            pricing_indicator: None,
            sales_alignment_indicator: None,
            company: None,
            company_id: None,
            demo_links: Vec::new(),
            attachments: Vec::new(),
            sort_order: 0,
            customer: None,
            created_at: None,
            updated_at: None,
            companies: None,
        }
    }

    pub fn status(&self) -> StatusParse {
        StatusParse::parse(&self.status)
    }

    /// Joined company name, then the denormalized copy, then empty.
    pub fn company_name(&self) -> &str {
        self.companies
            .as_ref()
            .map(|company| company.name.as_str())
            .filter(|name| !name.is_empty())
            .or(self.company.as_deref().filter(|name| !name.is_empty()))
            .unwrap_or("")
    }

    pub fn indicator(&self, kind: IndicatorKind) -> Option<Indicator> {
        match kind {
            IndicatorKind::Messaging => self.messaging_indicator,
            IndicatorKind::Campaign => self.campaign_indicator,
            IndicatorKind::Pricing => self.pricing_indicator,
            IndicatorKind::SalesAlignment => self.sales_alignment_indicator,
        }
    }

    /// Indicator as displayed; a missing signal shows as red.
    pub fn indicator_or_red(&self, kind: IndicatorKind) -> Indicator {
        self.indicator(kind).unwrap_or(Indicator::Red)
    }
}

/// Payload for an explicit insert. The id has no remote default.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewOpportunity {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub phase: Phase,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_som: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    pub sort_order: i64,
}

impl NewOpportunity {
    /// Draft with an empty id; the session assigns one on insert.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            description: None,
            phase: Phase::default(),
            status: OpportunityStatus::Planned.key().to_string(),
            estimated_som: None,
            target_date: None,
            company_id: None,
            company: None,
            sort_order: 0,
        }
    }

    pub fn phase(mut self, phase: Phase) -> Self {
        self.phase = phase;
        self
    }

    pub fn company(mut self, company: &Company) -> Self {
        self.company_id = Some(company.id.clone());
        self.company = Some(company.name.clone());
        self
    }

    pub fn estimated_som(mut self, som: f64) -> Self {
        self.estimated_som = Some(som);
        self
    }

    pub fn target_date(mut self, date: NaiveDate) -> Self {
        self.target_date = Some(date);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(TrackerError::validation("name", "name cannot be empty"));
        }
        if let Some(som) = self.estimated_som {
            if !som.is_finite() {
                return Err(TrackerError::validation(
                    "estimated_som",
                    "estimate must be a finite number",
                ));
            }
        }
        Ok(())
    }

    pub fn into_opportunity(self) -> Opportunity {
        let mut opportunity = Opportunity::new(self.id, self.name);
        opportunity.description = self.description;
        opportunity.phase = self.phase;
        opportunity.status = self.status;
        opportunity.estimated_som = self.estimated_som;
        opportunity.target_date = self.target_date;
        opportunity.company_id = self.company_id;
        opportunity.company = self.company;
        opportunity.sort_order = self.sort_order;
        opportunity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parse_matches_aliases_case_insensitively() {
        assert_eq!(
            StatusParse::parse("In-Progress"),
            StatusParse::Known(OpportunityStatus::InProgress)
        );
        assert_eq!(
            StatusParse::parse(" NOT_GO "),
            StatusParse::Known(OpportunityStatus::NotGo)
        );
        assert_eq!(
            StatusParse::parse("blocked"),
            StatusParse::Unknown("blocked".to_string())
        );
    }

    #[test]
    fn unknown_status_labels_use_raw_text() {
        assert_eq!(StatusParse::parse("blocked").label(), "blocked");
        assert_eq!(StatusParse::parse("").label(), "Unknown");
        assert_eq!(StatusParse::parse("paused").label(), "Paused");
    }

    #[test]
    fn opportunity_reads_null_lists_and_bad_phase() {
        let row = serde_json::json!({
            "id": "opp-1",
            "name": "Churn model",
            "phase": 9,
            "status": "planned",
            "demo_links": null,
            "attachments": null,
            "target_date": "2024-03-01"
        });
        let opportunity: Opportunity = serde_json::from_value(row).unwrap();
        assert_eq!(opportunity.phase, Phase::Identification);
        assert!(opportunity.demo_links.is_empty());
        assert!(opportunity.attachments.is_empty());
        assert_eq!(
            opportunity.target_date,
            NaiveDate::from_ymd_opt(2024, 3, 1)
        );
    }

    #[test]
    fn indicators_read_case_insensitively() {
        let row = serde_json::json!({
            "id": "opp-1",
            "name": "Churn model",
            "messaging_indicator": "Green",
            "campaign_indicator": " AMBER ",
            "pricing_indicator": "purple",
            "sales_alignment_indicator": null
        });
        let opportunity: Opportunity = serde_json::from_value(row).unwrap();
        assert_eq!(opportunity.messaging_indicator, Some(Indicator::Green));
        assert_eq!(opportunity.campaign_indicator, Some(Indicator::Amber));
        assert_eq!(opportunity.pricing_indicator, None);
        assert_eq!(opportunity.sales_alignment_indicator, None);
        assert_eq!(opportunity.indicator_or_red(IndicatorKind::Pricing), Indicator::Red);
    }

    #[test]
    fn company_name_prefers_joined_row() {
        let mut opportunity = Opportunity::new("opp-1", "Pricing copilot");
        opportunity.company = Some("Stale Name".to_string());
        assert_eq!(opportunity.company_name(), "Stale Name");

        opportunity.companies = Some(Company::new("co-1", "Acme Corp"));
        assert_eq!(opportunity.company_name(), "Acme Corp");
    }

    #[test]
    fn phase_rejects_out_of_range_numbers() {
        assert_eq!(Phase::try_from(3).unwrap(), Phase::MvpPilot);
        assert!(matches!(
            Phase::try_from(5),
            Err(TrackerError::Validation { .. })
        ));
    }
}
