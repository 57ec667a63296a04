pub mod app_state;
pub mod optimistic;

pub use app_state::{AppState, DEFAULT_COLUMN_WIDTHS, MIN_COLUMN_WIDTH};
pub use optimistic::{OptimisticState, Patch, PatchTicket, apply_patch};
