//! Error types for the Fitlog domain model

use thiserror::Error;
use validator::ValidationErrors;

/// Errors raised while parsing domain values
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("Invalid meal type: {0}")]
    InvalidMealType(String),

    #[error("Invalid difficulty level: {0}")]
    InvalidDifficulty(String),

    #[error("Invalid goal type: {0}")]
    InvalidGoalType(String),
}

/// Errors raised while assembling a custom workout plan
#[derive(Error, Debug)]
pub enum PlanBuilderError {
    #[error("Invalid plan: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("Day {0} is not part of this plan")]
    UnknownDay(u8),

    #[error("Day {0} is a rest day and cannot hold exercises")]
    RestDay(u8),

    #[error("Day {day} has no exercise at position {index}")]
    UnknownExercise { day: u8, index: usize },

    #[error("At least one day must be a workout day")]
    NoWorkoutDays,

    #[error("Workout day {0} has no exercises")]
    EmptyWorkoutDay(u8),
}
