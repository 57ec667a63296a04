// ============================================================================
// src/view/sort.rs - Column sorting for the record list
// ============================================================================
//
// Comparator Pattern: one comparator per sortable column, chosen by
// `SortField`. Ascending uses a stable sort; descending is the exact reverse
// of the ascending sequence. There is no secondary tie-break key.
//
// ============================================================================

use crate::core::Opportunity;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    Name,
    Company,
    EstimatedSom,
    Status,
    Phase,
    TargetDate,
}

impl SortField {
    pub const ALL: [SortField; 6] = [
        SortField::Phase,
        SortField::Company,
        SortField::Name,
        SortField::EstimatedSom,
        SortField::Status,
        SortField::TargetDate,
    ];

    /// Compare two records by this field, ascending.
    pub fn compare(self, a: &Opportunity, b: &Opportunity) -> Ordering {
        match self {
            SortField::Name => compare_text(&a.name, &b.name),
            SortField::Company => compare_text(a.company_name(), b.company_name()),
            SortField::EstimatedSom => {
                compare_numbers(a.estimated_som.unwrap_or(0.0), b.estimated_som.unwrap_or(0.0))
            }
            SortField::Status => compare_text(&a.status, &b.status),
            SortField::Phase => a.phase.number().cmp(&b.phase.number()),
            SortField::TargetDate => compare_text(&iso_date(a), &iso_date(b)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

/// Active sort column and direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortState {
    pub field: SortField,
    pub direction: SortDirection,
}

impl Default for SortState {
    fn default() -> Self {
        Self {
            field: SortField::Phase,
            direction: SortDirection::Asc,
        }
    }
}

impl SortState {
    pub fn new(field: SortField, direction: SortDirection) -> Self {
        Self { field, direction }
    }

    /// Same field flips the direction; a new field starts ascending.
    pub fn toggle(&mut self, field: SortField) {
        if self.field == field {
            self.direction = self.direction.flipped();
        } else {
            self.field = field;
            self.direction = SortDirection::Asc;
        }
    }

    pub fn sort(&self, records: &mut [Arc<Opportunity>]) {
        sort_records(records, self.field, self.direction);
    }
}

pub fn sort_records(records: &mut [Arc<Opportunity>], field: SortField, direction: SortDirection) {
    records.sort_by(|a, b| field.compare(a, b));
    if direction == SortDirection::Desc {
        records.reverse();
    }
}

/// Case-insensitive comparison on the Unicode lowercase folding.
fn compare_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

fn compare_numbers(a: f64, b: f64) -> Ordering {
    let difference = a - b;
    if difference < 0.0 {
        Ordering::Less
    } else if difference > 0.0 {
        Ordering::Greater
    } else {
        Ordering::Equal
    }
}

fn iso_date(record: &Opportunity) -> String {
    record
        .target_date
        .map(|date| date.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(id: &str, name: &str) -> Arc<Opportunity> {
        Arc::new(Opportunity::new(id, name))
    }

    #[test]
    fn toggle_flips_then_resets() {
        let mut state = SortState::default();
        state.toggle(SortField::Phase);
        assert_eq!(state.direction, SortDirection::Desc);

        state.toggle(SortField::Name);
        assert_eq!(state, SortState::new(SortField::Name, SortDirection::Asc));
    }

    #[test]
    fn text_sort_ignores_case() {
        let mut records = vec![named("1", "beta"), named("2", "Alpha"), named("3", "Gamma")];
        sort_records(&mut records, SortField::Name, SortDirection::Asc);
        let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "beta", "Gamma"]);
    }

    #[test]
    fn missing_estimate_sorts_as_zero() {
        let mut big = Opportunity::new("big", "Big");
        big.estimated_som = Some(500.0);
        let mut negative = Opportunity::new("neg", "Negative");
        negative.estimated_som = Some(-10.0);
        let mut records = vec![Arc::new(big), named("none", "None"), Arc::new(negative)];

        sort_records(&mut records, SortField::EstimatedSom, SortDirection::Asc);
        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["neg", "none", "big"]);
    }
}
