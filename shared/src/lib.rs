//! Fitlog Shared Library
//!
//! Domain models, input validation, health metrics and timestamp handling
//! used by the sync engine and by any front end embedding it.

pub mod errors;
pub mod health_metrics;
pub mod models;
pub mod plan_builder;
pub mod timestamps;
pub mod validation;

// Re-export commonly used items
pub use errors::*;
pub use health_metrics::*;
pub use models::*;
pub use plan_builder::PlanBuilder;
