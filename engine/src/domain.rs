//! The six record domains kept locally and mirrored remotely

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    WorkoutSessions,
    BodyStats,
    Meals,
    WaterLogs,
    Goals,
    CustomPlans,
}

impl Domain {
    pub const ALL: [Domain; 6] = [
        Domain::WorkoutSessions,
        Domain::BodyStats,
        Domain::Meals,
        Domain::WaterLogs,
        Domain::Goals,
        Domain::CustomPlans,
    ];

    /// Label used in logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::WorkoutSessions => "workout_sessions",
            Domain::BodyStats => "body_stats",
            Domain::Meals => "meals",
            Domain::WaterLogs => "water_logs",
            Domain::Goals => "goals",
            Domain::CustomPlans => "custom_plans",
        }
    }

    /// Remote table name
    pub fn table(&self) -> &'static str {
        match self {
            Domain::WorkoutSessions => "workout_sessions",
            Domain::BodyStats => "body_stats",
            Domain::Meals => "nutrition_meals",
            Domain::WaterLogs => "nutrition_water_logs",
            Domain::Goals => "nutrition_goals",
            Domain::CustomPlans => "custom_workout_plans",
        }
    }

    /// Remote timestamp column rows are ordered by (newest first)
    pub fn order_column(&self) -> &'static str {
        match self {
            Domain::WorkoutSessions => "session_date",
            Domain::BodyStats => "stats_date",
            Domain::Meals | Domain::WaterLogs => "logged_at",
            Domain::Goals => "updated_at",
            Domain::CustomPlans => "created_at",
        }
    }

    /// Durable local storage key
    pub fn storage_key(&self) -> &'static str {
        match self {
            Domain::WorkoutSessions => "workout-sessions",
            Domain::BodyStats => "body-stats",
            Domain::Meals => "nutrition-meals",
            Domain::WaterLogs => "nutrition-water-logs",
            Domain::Goals => "nutrition-goals",
            Domain::CustomPlans => "custom-workout-plans",
        }
    }

    /// Prefix of locally assigned record ids
    pub fn id_prefix(&self) -> &'static str {
        match self {
            Domain::WorkoutSessions => "session",
            Domain::BodyStats => "stats",
            Domain::Meals => "meal",
            Domain::WaterLogs => "water",
            Domain::Goals => "goals",
            Domain::CustomPlans => "plan",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_keys_and_tables_are_distinct() {
        let keys: HashSet<_> = Domain::ALL.iter().map(|d| d.storage_key()).collect();
        let tables: HashSet<_> = Domain::ALL.iter().map(|d| d.table()).collect();
        assert_eq!(keys.len(), 6);
        assert_eq!(tables.len(), 6);
    }

    #[test]
    fn test_meal_domain_mapping() {
        assert_eq!(Domain::Meals.table(), "nutrition_meals");
        assert_eq!(Domain::Meals.order_column(), "logged_at");
        assert_eq!(Domain::Meals.storage_key(), "nutrition-meals");
    }
}
