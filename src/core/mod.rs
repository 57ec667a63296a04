pub mod error;
pub mod field;
pub mod types;

pub use error::{Result, TrackerError};
pub use field::{FieldKind, FieldValue, OpportunityField};
pub use types::{
    Attachment, Company, Indicator, IndicatorKind, NewOpportunity, Opportunity,
    OpportunityStatus, Phase, StatusParse,
};
