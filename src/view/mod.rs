pub mod display;
pub mod filter;
pub mod sort;
pub mod table;
pub mod timeline;

pub use filter::{FilterState, SelectionMode, ViewQuery};
pub use sort::{SortDirection, SortField, SortState, sort_records};
pub use table::{TableColumn, TableRow};
pub use timeline::{TimelineCard, TimelineColumn, group_by_phase};
