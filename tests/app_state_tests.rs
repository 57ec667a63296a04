/// Persisted application state tests
///
/// Run with: cargo test --test app_state_tests
use pipeline_tracker::state::{AppState, MIN_COLUMN_WIDTH};
use pipeline_tracker::view::{SelectionMode, SortDirection, SortField};
use tempfile::TempDir;

#[test]
fn test_missing_file_loads_defaults() {
    let dir = TempDir::new().unwrap();

    let state = AppState::load(dir.path().join("absent.json")).unwrap();

    assert_eq!(state, AppState::default());
    assert_eq!(state.sort.field, SortField::Phase);
    assert_eq!(state.column_width("name"), 120);
}

#[test]
fn test_state_survives_a_restart() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("state.json");

    let mut state = AppState::default();
    state.toggle_sidebar();
    state.filters.set_company_mode(SelectionMode::Select);
    state.filters.toggle_company("co-acme");
    state.sort.toggle(SortField::TargetDate);
    state.sort.toggle(SortField::TargetDate);
    state.set_column_width("company", 140);
    state.save(&path).unwrap();

    let loaded = AppState::load(&path).unwrap();

    assert_eq!(loaded, state);
    assert!(loaded.sidebar_collapsed);
    assert_eq!(loaded.sort.direction, SortDirection::Desc);
    assert_eq!(loaded.column_width("company"), 140);
}

#[test]
fn test_widths_are_clamped_and_backfilled_on_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("state.json");
    std::fs::write(&path, r#"{ "column_widths": { "name": 3 } }"#)
        .unwrap();

    let loaded = AppState::load(&path).unwrap();

    assert_eq!(loaded.column_width("name"), MIN_COLUMN_WIDTH);
    assert_eq!(loaded.column_width("status"), 85);
    assert!(!loaded.sidebar_collapsed);
}

#[test]
fn test_corrupt_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("state.json");
    std::fs::write(&path, "{ not json").unwrap();

    assert!(AppState::load(&path).is_err());
}
