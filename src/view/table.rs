//! Row view models for the table view.

use crate::core::{Indicator, IndicatorKind, Opportunity, OpportunityField, Phase};
use crate::edit::EditState;
use crate::view::display::{format_som, format_target_date};
use crate::view::sort::SortField;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableColumn {
    Phase,
    Company,
    Name,
    Som,
    Status,
    Indicator(IndicatorKind),
    Demo,
    Files,
    Target,
}

impl TableColumn {
    pub const ALL: [TableColumn; 12] = [
        TableColumn::Phase,
        TableColumn::Company,
        TableColumn::Name,
        TableColumn::Som,
        TableColumn::Status,
        TableColumn::Indicator(IndicatorKind::Messaging),
        TableColumn::Indicator(IndicatorKind::Campaign),
        TableColumn::Indicator(IndicatorKind::Pricing),
        TableColumn::Indicator(IndicatorKind::SalesAlignment),
        TableColumn::Demo,
        TableColumn::Files,
        TableColumn::Target,
    ];

    pub fn header(self) -> &'static str {
        match self {
            TableColumn::Phase => "Phase",
            TableColumn::Company => "Company",
            TableColumn::Name => "Opportunity",
            TableColumn::Som => "SOM",
            TableColumn::Status => "Status",
            TableColumn::Indicator(IndicatorKind::Messaging) => "M",
            TableColumn::Indicator(IndicatorKind::Campaign) => "C",
            TableColumn::Indicator(IndicatorKind::Pricing) => "P",
            TableColumn::Indicator(IndicatorKind::SalesAlignment) => "S",
            TableColumn::Demo => "Demo",
            TableColumn::Files => "Files",
            TableColumn::Target => "Target",
        }
    }

    /// Key into the persisted column widths.
    pub fn width_key(self) -> &'static str {
        match self {
            TableColumn::Phase => "phase",
            TableColumn::Company => "company",
            TableColumn::Name => "name",
            TableColumn::Som => "som",
            TableColumn::Status => "status",
            TableColumn::Indicator(IndicatorKind::Messaging) => "m",
            TableColumn::Indicator(IndicatorKind::Campaign) => "c",
            TableColumn::Indicator(IndicatorKind::Pricing) => "p",
            TableColumn::Indicator(IndicatorKind::SalesAlignment) => "s",
            TableColumn::Demo => "demo",
            TableColumn::Files => "files",
            TableColumn::Target => "target",
        }
    }

    /// Key into [`crate::view::display::COLUMN_DESCRIPTIONS`].
    pub fn description_key(self) -> &'static str {
        match self {
            TableColumn::Phase => "phase",
            TableColumn::Company => "company",
            TableColumn::Name => "name",
            TableColumn::Som => "estimated_som",
            TableColumn::Status => "status",
            TableColumn::Indicator(IndicatorKind::Messaging) => "messaging",
            TableColumn::Indicator(IndicatorKind::Campaign) => "campaign",
            TableColumn::Indicator(IndicatorKind::Pricing) => "pricing",
            TableColumn::Indicator(IndicatorKind::SalesAlignment) => "sales",
            TableColumn::Demo => "demo_links",
            TableColumn::Files => "attachments",
            TableColumn::Target => "target_date",
        }
    }

    pub fn sort_field(self) -> Option<SortField> {
        match self {
            TableColumn::Phase => Some(SortField::Phase),
            TableColumn::Company => Some(SortField::Company),
            TableColumn::Name => Some(SortField::Name),
            TableColumn::Som => Some(SortField::EstimatedSom),
            TableColumn::Status => Some(SortField::Status),
            TableColumn::Target => Some(SortField::TargetDate),
            TableColumn::Indicator(_) | TableColumn::Demo | TableColumn::Files => None,
        }
    }

    /// Field written when the cell is activated.
    pub fn field(self) -> Option<OpportunityField> {
        match self {
            TableColumn::Phase => Some(OpportunityField::Phase),
            TableColumn::Company => Some(OpportunityField::CompanyId),
            TableColumn::Name => Some(OpportunityField::Name),
            TableColumn::Som => Some(OpportunityField::EstimatedSom),
            TableColumn::Status => Some(OpportunityField::Status),
            TableColumn::Indicator(kind) => Some(OpportunityField::Indicator(kind)),
            TableColumn::Target => Some(OpportunityField::TargetDate),
            TableColumn::Demo | TableColumn::Files => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub id: String,
    pub phase: Phase,
    pub phase_label: String,
    pub company: String,
    pub name: String,
    pub som: String,
    pub status: String,
    pub indicators: [Indicator; 4],
    pub demo_links: usize,
    pub attachments: usize,
    pub target: String,
    /// Field of this row currently held in a draft, if any.
    pub editing: Option<OpportunityField>,
}

impl TableRow {
    pub fn build(record: &Opportunity, edit: &EditState) -> Self {
        let editing = edit
            .session()
            .filter(|session| session.record_id == record.id)
            .map(|session| session.field);

        Self {
            id: record.id.clone(),
            phase: record.phase,
            phase_label: record.phase.short_name(),
            company: record.company_name().to_string(),
            name: record.name.clone(),
            som: format_som(record.estimated_som),
            status: record.status().label(),
            indicators: IndicatorKind::ALL.map(|kind| record.indicator_or_red(kind)),
            demo_links: record.demo_links.len(),
            attachments: record.attachments.len(),
            target: format_target_date(record.target_date),
            editing,
        }
    }

    /// Text shown in `column` when the cell is not being edited.
    pub fn cell(&self, column: TableColumn) -> String {
        match column {
            TableColumn::Phase => self.phase_label.clone(),
            TableColumn::Company => self.company.clone(),
            TableColumn::Name => self.name.clone(),
            TableColumn::Som => self.som.clone(),
            TableColumn::Status => self.status.clone(),
            TableColumn::Indicator(kind) => {
                let index = IndicatorKind::ALL
                    .iter()
                    .position(|candidate| *candidate == kind)
                    .unwrap_or(0);
                self.indicators[index].key().to_string()
            }
            TableColumn::Demo => count_or_dash(self.demo_links),
            TableColumn::Files => count_or_dash(self.attachments),
            TableColumn::Target => self.target.clone(),
        }
    }
}

fn count_or_dash(count: usize) -> String {
    if count == 0 {
        "-".to_string()
    } else {
        count.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edit::EditController;

    #[test]
    fn row_marks_the_cell_being_edited() {
        let mut record = Opportunity::new("opp-1", "Forecasting");
        record.estimated_som = Some(150000.0);
        record.demo_links = vec!["https://demo.example/one".to_string()];

        let mut controller = EditController::new();
        controller.begin(&record, OpportunityField::Name).unwrap();

        let row = TableRow::build(&record, controller.state());
        assert_eq!(row.editing, Some(OpportunityField::Name));
        assert_eq!(row.cell(TableColumn::Som), "$150k");
        assert_eq!(row.cell(TableColumn::Demo), "1");
        assert_eq!(row.cell(TableColumn::Files), "-");
        assert_eq!(
            row.cell(TableColumn::Indicator(IndicatorKind::Campaign)),
            "red"
        );

        let other = Opportunity::new("opp-2", "Other");
        assert_eq!(TableRow::build(&other, controller.state()).editing, None);
    }
}
