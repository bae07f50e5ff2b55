//! Aggregation services
//!
//! Pure functions that derive statistics from the raw logs held by the
//! local store. Each takes an explicit `now` so results are reproducible.

pub mod body;
pub mod nutrition;
pub mod progress;

pub use body::{BodyService, LatestBodyStats};
pub use nutrition::{NutritionService, RecommendedMeal, TodayNutrition};
pub use progress::{ProgressService, ProgressSummary, WeeklyStats};
