//! Client-side application state that survives restarts.
//!
//! Loaded once at startup and saved at shutdown; nothing reads the file in
//! between.

use crate::core::{Result, TrackerError};
use crate::view::{FilterState, SortState};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

pub const MIN_COLUMN_WIDTH: u16 = 20;

pub const DEFAULT_COLUMN_WIDTHS: &[(&str, u16)] = &[
    ("expand", 24),
    ("phase", 55),
    ("company", 70),
    ("name", 120),
    ("som", 50),
    ("status", 85),
    ("m", 45),
    ("c", 50),
    ("p", 48),
    ("s", 48),
    ("nextSteps", 100),
    ("demo", 50),
    ("files", 50),
    ("target", 55),
    ("delete", 28),
];

pub fn default_column_widths() -> BTreeMap<String, u16> {
    DEFAULT_COLUMN_WIDTHS
        .iter()
        .map(|(column, width)| (column.to_string(), *width))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppState {
    pub sidebar_collapsed: bool,
    pub filters: FilterState,
    pub column_widths: BTreeMap<String, u16>,
    pub sort: SortState,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            sidebar_collapsed: false,
            filters: FilterState::default(),
            column_widths: default_column_widths(),
            sort: SortState::default(),
        }
    }
}

impl AppState {
    /// Reads the state file; a missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!("No state file at '{}', using defaults", path.display());
                return Ok(Self::default());
            }
            Err(err) => {
                return Err(TrackerError::Io(format!(
                    "Failed to read state file '{}': {}",
                    path.display(),
                    err
                )));
            }
        };
        let state: Self = serde_json::from_slice(&bytes).map_err(|err| {
            TrackerError::Serialization(format!(
                "Corrupt state file '{}': {}",
                path.display(),
                err
            ))
        })?;
        Ok(state.normalized())
    }

    /// Writes the state file through a temp file in the same directory and a
    /// rename.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(parent).map_err(|err| {
            TrackerError::Io(format!(
                "Failed to create parent directory '{}': {}",
                parent.display(),
                err
            ))
        })?;

        let bytes = serde_json::to_vec_pretty(self)?;
        let mut tmp = NamedTempFile::new_in(parent)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|err| {
            TrackerError::Io(format!(
                "Failed to replace state file '{}': {}",
                path.display(),
                err.error
            ))
        })?;
        info!("Saved application state to '{}'", path.display());
        Ok(())
    }

    pub fn toggle_sidebar(&mut self) {
        self.sidebar_collapsed = !self.sidebar_collapsed;
    }

    pub fn set_sidebar_collapsed(&mut self, collapsed: bool) {
        self.sidebar_collapsed = collapsed;
    }

    pub fn column_width(&self, column: &str) -> u16 {
        self.column_widths
            .get(column)
            .copied()
            .unwrap_or(MIN_COLUMN_WIDTH)
    }

    pub fn set_column_width(&mut self, column: &str, width: u16) {
        self.column_widths
            .insert(column.to_string(), width.max(MIN_COLUMN_WIDTH));
    }

    pub fn reset_column_widths(&mut self) {
        self.column_widths = default_column_widths();
    }

    /// Fills in columns added since the file was written and clamps widths.
    fn normalized(mut self) -> Self {
        for (column, width) in DEFAULT_COLUMN_WIDTHS {
            self.column_widths
                .entry(column.to_string())
                .or_insert(*width);
        }
        for width in self.column_widths.values_mut() {
            *width = (*width).max(MIN_COLUMN_WIDTH);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widths_never_drop_below_minimum() {
        let mut state = AppState::default();
        state.set_column_width("name", 3);
        assert_eq!(state.column_width("name"), MIN_COLUMN_WIDTH);
        state.set_column_width("name", 300);
        assert_eq!(state.column_width("name"), 300);
        state.reset_column_widths();
        assert_eq!(state.column_width("name"), 120);
    }

    #[test]
    fn partial_files_fill_in_defaults() {
        let state: AppState =
            serde_json::from_str(r#"{"sidebar_collapsed": true, "column_widths": {"name": 5}}"#)
                .unwrap();
        let state = state.normalized();
        assert!(state.sidebar_collapsed);
        assert_eq!(state.column_width("name"), MIN_COLUMN_WIDTH);
        assert_eq!(state.column_width("target"), 55);
    }
}
