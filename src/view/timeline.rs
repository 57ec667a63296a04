//! Phase columns for the timeline (card) view.

use crate::core::{Indicator, IndicatorKind, Opportunity, OpportunityStatus, Phase, StatusParse};
use crate::view::display::{format_som_compact, format_target_date, item_count_label};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub struct TimelineCard {
    pub id: String,
    pub company: String,
    pub status: String,
    pub name: String,
    pub som: Option<String>,
    pub target: Option<String>,
    pub has_links: bool,
    pub has_attachments: bool,
    pub indicators: [Indicator; 4],
}

impl TimelineCard {
    pub fn build(record: &Opportunity) -> Self {
        let company = match record.company_name() {
            "" => "Unknown".to_string(),
            name => name.to_string(),
        };
        let status = if record.status.trim().is_empty() {
            StatusParse::Known(OpportunityStatus::Planned)
        } else {
            record.status()
        };

        Self {
            id: record.id.clone(),
            company,
            status: status.label(),
            name: record.name.clone(),
            som: format_som_compact(record.estimated_som),
            target: record
                .target_date
                .map(|date| format_target_date(Some(date))),
            has_links: !record.demo_links.is_empty(),
            has_attachments: !record.attachments.is_empty(),
            indicators: IndicatorKind::ALL.map(|kind| record.indicator_or_red(kind)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimelineColumn {
    pub phase: Phase,
    pub cards: Vec<TimelineCard>,
}

impl TimelineColumn {
    pub fn count_label(&self) -> String {
        item_count_label(self.cards.len())
    }
}

/// One column per phase, cards in the order given.
pub fn group_by_phase(records: &[Arc<Opportunity>]) -> Vec<TimelineColumn> {
    Phase::ALL
        .into_iter()
        .map(|phase| TimelineColumn {
            phase,
            cards: records
                .iter()
                .filter(|record| record.phase == phase)
                .map(|record| TimelineCard::build(record))
                .collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_phase_gets_a_column() {
        let mut pilot = Opportunity::new("a", "Pilot");
        pilot.phase = Phase::MvpPilot;
        let records = vec![Arc::new(pilot), Arc::new(Opportunity::new("b", "Idea"))];

        let columns = group_by_phase(&records);
        assert_eq!(columns.len(), 5);
        assert_eq!(columns[0].count_label(), "1 item");
        assert_eq!(columns[1].count_label(), "0 items");
        assert_eq!(columns[3].cards[0].id, "a");
    }

    #[test]
    fn card_falls_back_for_missing_company_and_status() {
        let mut record = Opportunity::new("a", "Pilot");
        record.status = String::new();
        let card = TimelineCard::build(&record);
        assert_eq!(card.company, "Unknown");
        assert_eq!(card.status, "Planned");
        assert_eq!(card.som, None);
        assert_eq!(card.target, None);
    }
}
