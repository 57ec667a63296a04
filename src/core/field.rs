//! Catalogue of user-editable opportunity fields.
//!
//! Every inline edit and every select commit names one [`OpportunityField`]
//! and carries one [`FieldValue`]; the remote update body is built from
//! exactly that pair.

use super::types::{Indicator, IndicatorKind, Opportunity, Phase};
use super::{Result, TrackerError};
use chrono::NaiveDate;
use serde_json::{Value as JsonValue, json};
use std::fmt;

/// How a field is edited in the table view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Free text edited through a draft.
    Text,
    /// Number edited through a draft and parsed on commit.
    Numeric,
    /// Chosen from a fixed set; commits immediately.
    Select,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpportunityField {
    Name,
    Description,
    NextSteps,
    EstimatedSom,
    Phase,
    Status,
    Indicator(IndicatorKind),
    CompanyId,
    Company,
    TargetDate,
}

impl OpportunityField {
    pub const ALL: [OpportunityField; 13] = [
        OpportunityField::Name,
        OpportunityField::Description,
        OpportunityField::NextSteps,
        OpportunityField::EstimatedSom,
        OpportunityField::Phase,
        OpportunityField::Status,
        OpportunityField::Indicator(IndicatorKind::Messaging),
        OpportunityField::Indicator(IndicatorKind::Campaign),
        OpportunityField::Indicator(IndicatorKind::Pricing),
        OpportunityField::Indicator(IndicatorKind::SalesAlignment),
        OpportunityField::CompanyId,
        OpportunityField::Company,
        OpportunityField::TargetDate,
    ];

    /// Remote column name.
    pub fn column(self) -> &'static str {
        match self {
            OpportunityField::Name => "name",
            OpportunityField::Description => "description",
            OpportunityField::NextSteps => "next_steps",
            OpportunityField::EstimatedSom => "estimated_som",
            OpportunityField::Phase => "phase",
            OpportunityField::Status => "status",
            OpportunityField::Indicator(IndicatorKind::Messaging) => "messaging_indicator",
            OpportunityField::Indicator(IndicatorKind::Campaign) => "campaign_indicator",
            OpportunityField::Indicator(IndicatorKind::Pricing) => "pricing_indicator",
            OpportunityField::Indicator(IndicatorKind::SalesAlignment) => {
                "sales_alignment_indicator"
            }
            OpportunityField::CompanyId => "company_id",
            OpportunityField::Company => "company",
            OpportunityField::TargetDate => "target_date",
        }
    }

    pub fn from_column(column: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|field| field.column() == column)
            .ok_or_else(|| TrackerError::InvalidField(column.to_string()))
    }

    pub fn kind(self) -> FieldKind {
        match self {
            OpportunityField::Name
            | OpportunityField::Description
            | OpportunityField::NextSteps => FieldKind::Text,
            OpportunityField::EstimatedSom => FieldKind::Numeric,
            OpportunityField::Phase
            | OpportunityField::Status
            | OpportunityField::Indicator(_)
            | OpportunityField::CompanyId
            | OpportunityField::Company
            | OpportunityField::TargetDate => FieldKind::Select,
        }
    }

    pub fn is_draft_editable(self) -> bool {
        self.kind() != FieldKind::Select
    }
}

impl fmt::Display for OpportunityField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// Typed candidate value for a single field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Text(String),
    Number(f64),
    Integer(i64),
    Date(NaiveDate),
}

impl FieldValue {
    pub fn to_json(&self) -> JsonValue {
        match self {
            FieldValue::Null => JsonValue::Null,
            FieldValue::Text(text) => json!(text),
            FieldValue::Number(number) => json!(number),
            FieldValue::Integer(number) => json!(number),
            FieldValue::Date(date) => json!(date.format("%Y-%m-%d").to_string()),
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Null => "null",
            FieldValue::Text(_) => "text",
            FieldValue::Number(_) => "number",
            FieldValue::Integer(_) => "integer",
            FieldValue::Date(_) => "date",
        }
    }

    fn optional_text(text: &Option<String>) -> Self {
        match text {
            Some(text) => FieldValue::Text(text.clone()),
            None => FieldValue::Null,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => f.write_str("null"),
            FieldValue::Text(text) => f.write_str(text),
            FieldValue::Number(number) => write!(f, "{}", number),
            FieldValue::Integer(number) => write!(f, "{}", number),
            FieldValue::Date(date) => write!(f, "{}", date.format("%Y-%m-%d")),
        }
    }
}

fn mismatch(field: OpportunityField, value: &FieldValue) -> TrackerError {
    TrackerError::validation(
        field.column(),
        format!("cannot store a {} value", value.type_name()),
    )
}

fn indicator_slot(opportunity: &mut Opportunity, kind: IndicatorKind) -> &mut Option<Indicator> {
    match kind {
        IndicatorKind::Messaging => &mut opportunity.messaging_indicator,
        IndicatorKind::Campaign => &mut opportunity.campaign_indicator,
        IndicatorKind::Pricing => &mut opportunity.pricing_indicator,
        IndicatorKind::SalesAlignment => &mut opportunity.sales_alignment_indicator,
    }
}

impl Opportunity {
    pub fn field_value(&self, field: OpportunityField) -> FieldValue {
        match field {
            OpportunityField::Name => FieldValue::Text(self.name.clone()),
            OpportunityField::Description => FieldValue::optional_text(&self.description),
            OpportunityField::NextSteps => FieldValue::optional_text(&self.next_steps),
            OpportunityField::EstimatedSom => self
                .estimated_som
                .map(FieldValue::Number)
                .unwrap_or(FieldValue::Null),
            OpportunityField::Phase => FieldValue::Integer(self.phase.number()),
            OpportunityField::Status => FieldValue::Text(self.status.clone()),
            OpportunityField::Indicator(kind) => self
                .indicator(kind)
                .map(|indicator| FieldValue::Text(indicator.key().to_string()))
                .unwrap_or(FieldValue::Null),
            OpportunityField::CompanyId => FieldValue::optional_text(&self.company_id),
            OpportunityField::Company => FieldValue::optional_text(&self.company),
            OpportunityField::TargetDate => self
                .target_date
                .map(FieldValue::Date)
                .unwrap_or(FieldValue::Null),
        }
    }

    /// Draft text seeded into the editor: numbers without the display
    /// formatting, null as empty.
    pub fn edit_representation(&self, field: OpportunityField) -> String {
        match self.field_value(field) {
            FieldValue::Null => String::new(),
            other => other.to_string(),
        }
    }

    /// Writes `value` into `field`, rejecting values of the wrong shape.
    pub fn set_field(&mut self, field: OpportunityField, value: FieldValue) -> Result<()> {
        match (field, value) {
            (OpportunityField::Name, FieldValue::Text(text)) => self.name = text,
            (OpportunityField::Description, FieldValue::Text(text)) => {
                self.description = Some(text)
            }
            (OpportunityField::Description, FieldValue::Null) => self.description = None,
            (OpportunityField::NextSteps, FieldValue::Text(text)) => self.next_steps = Some(text),
            (OpportunityField::NextSteps, FieldValue::Null) => self.next_steps = None,
            (OpportunityField::EstimatedSom, FieldValue::Number(number)) => {
                self.estimated_som = Some(number)
            }
            (OpportunityField::EstimatedSom, FieldValue::Integer(number)) => {
                self.estimated_som = Some(number as f64)
            }
            (OpportunityField::EstimatedSom, FieldValue::Null) => self.estimated_som = None,
            (OpportunityField::Phase, FieldValue::Integer(number)) => {
                self.phase = Phase::try_from(number)?
            }
            (OpportunityField::Status, FieldValue::Text(text)) => self.status = text,
            (OpportunityField::Indicator(kind), FieldValue::Text(text)) => {
                let indicator = Indicator::parse(&text).ok_or_else(|| {
                    TrackerError::validation(
                        field.column(),
                        format!("'{}' is not green, amber or red", text),
                    )
                })?;
                *indicator_slot(self, kind) = Some(indicator);
            }
            (OpportunityField::Indicator(kind), FieldValue::Null) => {
                *indicator_slot(self, kind) = None
            }
            (OpportunityField::CompanyId, FieldValue::Text(id)) => {
                // A joined row for another company would shadow the new name.
                if self.companies.as_ref().is_some_and(|company| company.id != id) {
                    self.companies = None;
                }
                self.company_id = Some(id)
            }
            (OpportunityField::CompanyId, FieldValue::Null) => {
                self.companies = None;
                self.company_id = None
            }
            (OpportunityField::Company, FieldValue::Text(name)) => self.company = Some(name),
            (OpportunityField::Company, FieldValue::Null) => self.company = None,
            (OpportunityField::TargetDate, FieldValue::Date(date)) => {
                self.target_date = Some(date)
            }
            (OpportunityField::TargetDate, FieldValue::Null) => self.target_date = None,
            (field, value) => return Err(mismatch(field, &value)),
        }
        Ok(())
    }
}
