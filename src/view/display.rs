//! Display transforms shared by the table and timeline views.

use crate::core::{Result, TrackerError};
use chrono::NaiveDate;

/// Default client-side upload limit.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

const KIB: u64 = 1024;
const MIB: u64 = 1024 * 1024;

/// SOM in thousands with a dollar sign: `150000` → `$150k`.
/// A missing or zero estimate shows as `-`.
pub fn format_som(som: Option<f64>) -> String {
    match thousands(som) {
        Some(k) => format!("${}k", k),
        None => "-".to_string(),
    }
}

/// Card variant of [`format_som`] without the currency sign; `None` when the
/// card should not show an estimate at all.
pub fn format_som_compact(som: Option<f64>) -> Option<String> {
    thousands(som).map(|k| format!("{}k", k))
}

fn thousands(som: Option<f64>) -> Option<i64> {
    som.filter(|value| *value != 0.0 && value.is_finite())
        .map(|value| (value / 1000.0).round() as i64)
}

/// Short month and day, e.g. `Mar 1`.
pub fn format_target_date(date: Option<NaiveDate>) -> String {
    date.map(|date| date.format("%b %-d").to_string())
        .unwrap_or_else(|| "-".to_string())
}

pub fn format_file_size(bytes: Option<u64>) -> String {
    match bytes {
        None | Some(0) => String::new(),
        Some(bytes) if bytes < KIB => format!("{} B", bytes),
        Some(bytes) if bytes < MIB => format!("{:.1} KB", bytes as f64 / KIB as f64),
        Some(bytes) => format!("{:.1} MB", bytes as f64 / MIB as f64),
    }
}

pub fn validate_upload_size(size: u64, max_size: u64) -> Result<()> {
    if size > max_size {
        return Err(TrackerError::validation(
            "attachments",
            format!(
                "File too large. Max size is {}MB",
                (max_size as f64 / MIB as f64).round() as u64
            ),
        ));
    }
    Ok(())
}

/// `1 item`, `3 items`.
pub fn item_count_label(count: usize) -> String {
    if count == 1 {
        "1 item".to_string()
    } else {
        format!("{} items", count)
    }
}

/// Header help text for a table column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDescription {
    pub key: &'static str,
    pub title: &'static str,
    pub description: &'static str,
}

pub const COLUMN_DESCRIPTIONS: &[ColumnDescription] = &[
    ColumnDescription {
        key: "phase",
        title: "Phase",
        description: "Current stage in the opportunity lifecycle: Phase 0 (Identification), Phase 1 (Discovery), Phase 2 (PoC), Phase 3 (MVP Pilot), Phase 4 (Full Deployment)",
    },
    ColumnDescription {
        key: "company",
        title: "Company",
        description: "The portfolio company associated with this opportunity",
    },
    ColumnDescription {
        key: "name",
        title: "Opportunity",
        description: "Name or title of the initiative or project",
    },
    ColumnDescription {
        key: "description",
        title: "Description",
        description: "Brief description of the opportunity scope and objectives",
    },
    ColumnDescription {
        key: "estimated_som",
        title: "1-yr SOM",
        description: "Estimated 1-year Serviceable Obtainable Market - the projected revenue potential within the first year",
    },
    ColumnDescription {
        key: "status",
        title: "Status",
        description: "Current status: Done (complete), In-Progress (active work), Paused (on hold), Planned (scheduled), Not-Go (rejected)",
    },
    ColumnDescription {
        key: "messaging",
        title: "Messaging",
        description: "Readiness of marketing messaging and value proposition. Green = Ready, Amber = In Progress, Red = Needs Attention",
    },
    ColumnDescription {
        key: "campaign",
        title: "Campaign",
        description: "Marketing campaign readiness and execution status. Green = Ready, Amber = In Progress, Red = Needs Attention",
    },
    ColumnDescription {
        key: "pricing",
        title: "Pricing",
        description: "Pricing strategy and model readiness. Green = Ready, Amber = In Progress, Red = Needs Attention",
    },
    ColumnDescription {
        key: "sales",
        title: "Sales Alignment",
        description: "Sales team readiness and alignment with the opportunity. Green = Ready, Amber = In Progress, Red = Needs Attention",
    },
    ColumnDescription {
        key: "next_steps",
        title: "Next Steps",
        description: "Immediate action items or next milestones for this opportunity",
    },
    ColumnDescription {
        key: "target_date",
        title: "Target Date",
        description: "Target completion or milestone date for the current phase",
    },
    ColumnDescription {
        key: "demo_links",
        title: "Demo",
        description: "Demo links and recordings for this opportunity",
    },
    ColumnDescription {
        key: "attachments",
        title: "Files",
        description: "Attached files, screenshots, and documents",
    },
];

pub fn column_description(key: &str) -> Option<&'static ColumnDescription> {
    COLUMN_DESCRIPTIONS.iter().find(|entry| entry.key == key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn som_rounds_to_thousands() {
        assert_eq!(format_som(Some(150000.0)), "$150k");
        assert_eq!(format_som(Some(2500.0)), "$3k");
        assert_eq!(format_som(Some(400.0)), "$0k");
        assert_eq!(format_som(Some(0.0)), "-");
        assert_eq!(format_som(None), "-");
        assert_eq!(format_som_compact(Some(75000.0)).as_deref(), Some("75k"));
    }

    #[test]
    fn file_sizes_pick_a_unit() {
        assert_eq!(format_file_size(None), "");
        assert_eq!(format_file_size(Some(512)), "512 B");
        assert_eq!(format_file_size(Some(1536)), "1.5 KB");
        assert_eq!(format_file_size(Some(2 * 1024 * 1024)), "2.0 MB");
    }

    #[test]
    fn upload_limit_reports_megabytes() {
        assert!(validate_upload_size(1024, DEFAULT_MAX_UPLOAD_BYTES).is_ok());
        let err = validate_upload_size(DEFAULT_MAX_UPLOAD_BYTES + 1, DEFAULT_MAX_UPLOAD_BYTES)
            .unwrap_err();
        assert_eq!(
            err,
            TrackerError::validation("attachments", "File too large. Max size is 10MB")
        );
    }

    #[test]
    fn dates_show_month_and_day() {
        assert_eq!(
            format_target_date(NaiveDate::from_ymd_opt(2024, 3, 1)),
            "Mar 1"
        );
        assert_eq!(format_target_date(None), "-");
    }
}
