/// Optimistic reducer tests
///
/// Structural sharing and rollback behaviour of the displayed list.
/// Run with: cargo test --test optimistic_reducer_tests
use pipeline_tracker::core::{FieldValue, Opportunity, OpportunityField, Phase, TrackerError};
use pipeline_tracker::state::{OptimisticState, Patch, apply_patch};
use std::sync::Arc;

fn records() -> Vec<Arc<Opportunity>> {
    ["a", "b", "c", "d"]
        .iter()
        .enumerate()
        .map(|(index, id)| {
            let mut record = Opportunity::new(*id, format!("Opportunity {}", id));
            record.sort_order = index as i64;
            Arc::new(record)
        })
        .collect()
}

#[test]
fn test_patch_touches_only_the_target_record() {
    let before = records();
    let patch = Patch::new("c", OpportunityField::Phase, FieldValue::Integer(2));

    let after = apply_patch(&before, &patch).unwrap();

    assert_eq!(after.len(), before.len());
    for (old, new) in before.iter().zip(after.iter()) {
        if old.id == "c" {
            assert!(!Arc::ptr_eq(old, new));
            assert_eq!(new.phase, Phase::Poc);

            let mut expected = (**old).clone();
            expected.phase = Phase::Poc;
            assert_eq!(**new, expected);
        } else {
            assert!(Arc::ptr_eq(old, new), "record {} was copied", old.id);
        }
    }
}

#[test]
fn test_patch_for_unknown_id_keeps_every_record() {
    let before = records();
    let patch = Patch::new("zzz", OpportunityField::Name, FieldValue::Text("x".into()));

    let after = apply_patch(&before, &patch).unwrap();

    assert!(before.iter().zip(after.iter()).all(|(a, b)| Arc::ptr_eq(a, b)));
}

#[test]
fn test_patch_with_wrong_value_type_is_rejected() {
    let before = records();
    let patch = Patch::new("a", OpportunityField::EstimatedSom, FieldValue::Text("lots".into()));

    let err = apply_patch(&before, &patch).unwrap_err();

    assert!(matches!(err, TrackerError::InvalidField(_) | TrackerError::Validation { .. }));
}

#[test]
fn test_rollback_keeps_later_patches() {
    let mut state = OptimisticState::new(records().iter().map(|r| (**r).clone()).collect());

    let first = state
        .apply(Patch::new("a", OpportunityField::Name, FieldValue::Text("First".into())))
        .unwrap();
    let second = state
        .apply(Patch::new("b", OpportunityField::Name, FieldValue::Text("Second".into())))
        .unwrap();

    let dropped = state.rollback(first).unwrap();

    assert_eq!(dropped.map(|patch| patch.id), Some("a".to_string()));
    assert_eq!(state.get("a").unwrap().name, "Opportunity a");
    assert_eq!(state.get("b").unwrap().name, "Second");
    assert!(state.is_pending(second));
    assert_eq!(state.pending_len(), 1);
}

#[test]
fn test_authoritative_list_supersedes_patches() {
    let mut state = OptimisticState::new(records().iter().map(|r| (**r).clone()).collect());
    let ticket = state
        .apply(Patch::new("d", OpportunityField::EstimatedSom, FieldValue::Number(9000.0)))
        .unwrap();
    assert!(state.confirm(ticket));

    let mut fresh = Opportunity::new("d", "Opportunity d");
    fresh.estimated_som = Some(1000.0);
    state.replace_authoritative(vec![fresh]);

    assert_eq!(state.pending_len(), 0);
    assert_eq!(state.displayed().len(), 1);
    assert_eq!(state.get("d").unwrap().estimated_som, Some(1000.0));
    assert_eq!(state.rollback(ticket).unwrap(), None);
    assert!(!state.confirm(ticket));
}
