//! Inline cell editing.
//!
//! Text and numeric cells go through a draft (`Idle → Editing → Idle`);
//! select-type cells commit straight from `Idle` via
//! [`EditController::select`]. Activating a cell while another one holds a
//! draft cancels that draft without writing it.

mod controller;

pub use controller::{
    EditController, EditKey, EditSession, EditState, EditTransition, KeyOutcome, coerce_draft,
};
