// ============================================================================
// Pipeline Tracker Library
// ============================================================================

pub mod config;
pub mod core;
pub mod edit;
pub mod session;
pub mod state;
pub mod store;
pub mod view;

// Re-export main types for convenience
pub use config::TrackerConfig;
pub use core::{
    Company, FieldKind, FieldValue, Indicator, IndicatorKind, NewOpportunity, Opportunity,
    OpportunityField, OpportunityStatus, Phase, Result, TrackerError,
};
pub use edit::{EditController, EditKey, EditState};
pub use session::{LoadState, StagedCompany, StagedWrite, TrackerSession};
pub use state::{AppState, OptimisticState, Patch};
pub use store::{ConfirmedDelete, MemoryStore, PendingDelete, RemoteStore, RestStore};
pub use view::{FilterState, SortDirection, SortField, SortState};

// ============================================================================
// Entry points
// ============================================================================

/// Session over the seeded in-memory store
///
/// Useful for demos and tests; nothing leaves the process.
///
/// # Examples
///
/// ```
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use pipeline_tracker::{AppState, SortField};
///
/// let mut session = pipeline_tracker::demo_session(AppState::default());
/// session.refetch().await?;
///
/// session.toggle_sort(SortField::Name);
/// for record in session.visible() {
///     println!("{} ({})", record.name, record.phase);
/// }
/// # Ok(())
/// # }
/// ```
pub fn demo_session(app_state: AppState) -> TrackerSession<MemoryStore> {
    TrackerSession::new(std::sync::Arc::new(MemoryStore::demo()), app_state)
}

/// Session over a PostgREST endpoint
///
/// # Examples
///
/// ```no_run
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use pipeline_tracker::{AppState, TrackerConfig};
///
/// let config = TrackerConfig::new("https://project.example.co", "anon-key")
///     .access_token("user-jwt");
///
/// let mut session = pipeline_tracker::connect(config, AppState::default())?;
/// session.refetch().await?;
/// # Ok(())
/// # }
/// ```
pub fn connect(config: TrackerConfig, app_state: AppState) -> Result<TrackerSession<RestStore>> {
    let store = RestStore::new(config)?;
    Ok(TrackerSession::new(std::sync::Arc::new(store), app_state))
}
