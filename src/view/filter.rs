use crate::core::Opportunity;
use crate::view::sort::SortState;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    #[default]
    All,
    Select,
}

impl SelectionMode {
    pub fn toggled(self) -> Self {
        match self {
            SelectionMode::All => SelectionMode::Select,
            SelectionMode::Select => SelectionMode::All,
        }
    }
}

/// Which opportunities and companies are shown.
///
/// In `Select` mode only the listed ids pass; an empty selection shows nothing.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterState {
    pub opportunity_mode: SelectionMode,
    pub selected_opportunity_ids: Vec<String>,
    pub company_mode: SelectionMode,
    pub selected_company_ids: Vec<String>,
}

impl FilterState {
    pub fn set_opportunity_mode(&mut self, mode: SelectionMode) {
        self.opportunity_mode = mode;
    }

    pub fn toggle_opportunity(&mut self, id: &str) {
        toggle_id(&mut self.selected_opportunity_ids, id);
    }

    pub fn set_selected_opportunities(&mut self, ids: Vec<String>) {
        self.selected_opportunity_ids = ids;
    }

    pub fn set_company_mode(&mut self, mode: SelectionMode) {
        self.company_mode = mode;
    }

    pub fn toggle_company(&mut self, id: &str) {
        toggle_id(&mut self.selected_company_ids, id);
    }

    pub fn set_selected_companies(&mut self, ids: Vec<String>) {
        self.selected_company_ids = ids;
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn is_active(&self) -> bool {
        self.opportunity_mode == SelectionMode::Select || self.company_mode == SelectionMode::Select
    }

    pub fn matches(&self, record: &Opportunity) -> bool {
        let opportunity_ok = match self.opportunity_mode {
            SelectionMode::All => true,
            SelectionMode::Select => self.selected_opportunity_ids.contains(&record.id),
        };
        let company_ok = match self.company_mode {
            SelectionMode::All => true,
            SelectionMode::Select => record
                .company_id
                .as_ref()
                .is_some_and(|id| self.selected_company_ids.contains(id)),
        };
        opportunity_ok && company_ok
    }
}

fn toggle_id(ids: &mut Vec<String>, id: &str) {
    if let Some(index) = ids.iter().position(|existing| existing == id) {
        ids.remove(index);
    } else {
        ids.push(id.to_string());
    }
}

/// Filter then sort, as the table view shows records.
#[derive(Debug, Clone, Copy)]
pub struct ViewQuery<'a> {
    pub filter: &'a FilterState,
    pub sort: SortState,
}

impl<'a> ViewQuery<'a> {
    pub fn new(filter: &'a FilterState, sort: SortState) -> Self {
        Self { filter, sort }
    }

    pub fn apply(&self, records: &[Arc<Opportunity>]) -> Vec<Arc<Opportunity>> {
        let mut visible: Vec<Arc<Opportunity>> = records
            .iter()
            .filter(|record| self.filter.matches(record))
            .cloned()
            .collect();
        self.sort.sort(&mut visible);
        visible
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggling_twice_removes_the_id() {
        let mut filter = FilterState::default();
        filter.toggle_opportunity("a");
        filter.toggle_opportunity("b");
        filter.toggle_opportunity("a");
        assert_eq!(filter.selected_opportunity_ids, vec!["b".to_string()]);
    }

    #[test]
    fn company_filter_excludes_unassigned_records() {
        let mut filter = FilterState::default();
        filter.set_company_mode(SelectionMode::Select);
        filter.set_selected_companies(vec!["co-1".to_string()]);

        let mut assigned = Opportunity::new("a", "Assigned");
        assigned.company_id = Some("co-1".to_string());
        let unassigned = Opportunity::new("b", "Unassigned");

        assert!(filter.matches(&assigned));
        assert!(!filter.matches(&unassigned));
    }

    #[test]
    fn clear_resets_both_modes() {
        let mut filter = FilterState::default();
        filter.set_opportunity_mode(SelectionMode::Select);
        filter.toggle_company("co-1");
        filter.clear();
        assert!(!filter.is_active());
        assert!(filter.selected_company_ids.is_empty());
    }
}
