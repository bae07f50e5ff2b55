//! Data models for the Fitlog application
//!
//! Stored records carry a local identifier assigned on the device and, once
//! uploaded or pulled, the identifier of their remote row. Logs are
//! append-only; only whole custom plans are ever removed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::errors::ModelError;
use crate::timestamps::lenient;
use crate::validation::{finite, not_blank};

// ============================================================================
// Enumerations
// ============================================================================

/// Meal slot a food entry belongs to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

impl MealType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MealType::Breakfast => "breakfast",
            MealType::Lunch => "lunch",
            MealType::Dinner => "dinner",
            MealType::Snack => "snack",
        }
    }
}

impl fmt::Display for MealType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MealType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "breakfast" => Ok(MealType::Breakfast),
            "lunch" => Ok(MealType::Lunch),
            "dinner" => Ok(MealType::Dinner),
            "snack" => Ok(MealType::Snack),
            _ => Err(ModelError::InvalidMealType(s.to_string())),
        }
    }
}

/// Difficulty of a custom workout plan
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DifficultyLevel {
    Beginner,
    Intermediate,
    Advanced,
}

impl DifficultyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            DifficultyLevel::Beginner => "beginner",
            DifficultyLevel::Intermediate => "intermediate",
            DifficultyLevel::Advanced => "advanced",
        }
    }
}

impl FromStr for DifficultyLevel {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "beginner" => Ok(DifficultyLevel::Beginner),
            "intermediate" => Ok(DifficultyLevel::Intermediate),
            "advanced" => Ok(DifficultyLevel::Advanced),
            _ => Err(ModelError::InvalidDifficulty(s.to_string())),
        }
    }
}

/// Training goal a plan (or a recommended meal) targets
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum GoalType {
    WeightLoss,
    MuscleGain,
    Maintenance,
    Strength,
    Endurance,
}

impl GoalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GoalType::WeightLoss => "weight_loss",
            GoalType::MuscleGain => "muscle_gain",
            GoalType::Maintenance => "maintenance",
            GoalType::Strength => "strength",
            GoalType::Endurance => "endurance",
        }
    }
}

impl FromStr for GoalType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "weight_loss" => Ok(GoalType::WeightLoss),
            "muscle_gain" => Ok(GoalType::MuscleGain),
            "maintenance" => Ok(GoalType::Maintenance),
            "strength" => Ok(GoalType::Strength),
            "endurance" => Ok(GoalType::Endurance),
            _ => Err(ModelError::InvalidGoalType(s.to_string())),
        }
    }
}

// ============================================================================
// Workout sessions
// ============================================================================

/// A completed exercise session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkoutSession {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<Uuid>,
    pub plan_name: String,
    pub exercise_name: String,
    /// Workout time in seconds; rest periods are not included
    pub duration_secs: u32,
    pub sets: u32,
    pub reps: u32,
    pub completed_sets: u32,
    pub calories_burned: u32,
    #[serde(default, with = "lenient")]
    pub date: Option<DateTime<Utc>>,
}

/// Input for logging a workout session
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "completed_within_planned"))]
pub struct NewWorkoutSession {
    #[validate(length(max = 200))]
    pub plan_name: String,
    #[validate(length(max = 200), custom(function = "not_blank"))]
    pub exercise_name: String,
    #[validate(range(max = 86_400))]
    pub duration_secs: u32,
    #[validate(range(max = 100))]
    pub sets: u32,
    #[validate(range(max = 1000))]
    pub reps: u32,
    pub completed_sets: u32,
    /// Defaults to the time the session is stored
    #[serde(default, with = "lenient")]
    pub date: Option<DateTime<Utc>>,
}

fn completed_within_planned(input: &NewWorkoutSession) -> Result<(), ValidationError> {
    if input.completed_sets > input.sets {
        return Err(ValidationError::new("completed_sets_exceed_sets"));
    }
    Ok(())
}

// ============================================================================
// Body stats
// ============================================================================

/// A body measurement entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BodyStats {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<Uuid>,
    /// Weight in kg
    pub weight: f64,
    /// Circumferences in cm
    pub waist: Option<f64>,
    pub hip: Option<f64>,
    pub chest: Option<f64>,
    pub arm: Option<f64>,
    /// Body fat percentage
    pub body_fat: Option<f64>,
    pub bmi: Option<f64>,
    #[serde(default, with = "lenient")]
    pub date: Option<DateTime<Utc>>,
}

/// Input for logging body measurements
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct NewBodyStats {
    #[validate(range(min = 20.0, max = 500.0), custom(function = "finite"))]
    pub weight: f64,
    #[validate(range(min = 0.0, max = 500.0), custom(function = "finite"))]
    pub waist: Option<f64>,
    #[validate(range(min = 0.0, max = 500.0), custom(function = "finite"))]
    pub hip: Option<f64>,
    #[validate(range(min = 0.0, max = 500.0), custom(function = "finite"))]
    pub chest: Option<f64>,
    #[validate(range(min = 0.0, max = 200.0), custom(function = "finite"))]
    pub arm: Option<f64>,
    #[validate(range(min = 0.0, max = 100.0), custom(function = "finite"))]
    pub body_fat: Option<f64>,
    #[serde(default, with = "lenient")]
    pub date: Option<DateTime<Utc>>,
}

// ============================================================================
// Nutrition
// ============================================================================

/// A logged meal
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Meal {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    /// Serving weight in grams
    pub serving_weight: f64,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub fiber: Option<f64>,
    pub sugar: Option<f64>,
    pub sodium: Option<f64>,
    pub meal_type: MealType,
    #[serde(default, with = "lenient")]
    pub logged_at: Option<DateTime<Utc>>,
}

/// Input for logging a meal
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewMeal {
    #[validate(length(max = 200), custom(function = "not_blank"))]
    pub name: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    #[validate(range(min = 0.0, max = 10_000.0), custom(function = "finite"))]
    pub serving_weight: f64,
    #[validate(range(min = 0.0, max = 50_000.0), custom(function = "finite"))]
    pub calories: f64,
    #[validate(range(min = 0.0, max = 5_000.0), custom(function = "finite"))]
    pub protein: f64,
    #[validate(range(min = 0.0, max = 5_000.0), custom(function = "finite"))]
    pub carbs: f64,
    #[validate(range(min = 0.0, max = 5_000.0), custom(function = "finite"))]
    pub fat: f64,
    #[validate(range(min = 0.0, max = 5_000.0), custom(function = "finite"))]
    pub fiber: Option<f64>,
    #[validate(range(min = 0.0, max = 5_000.0), custom(function = "finite"))]
    pub sugar: Option<f64>,
    #[validate(range(min = 0.0, max = 100_000.0), custom(function = "finite"))]
    pub sodium: Option<f64>,
    pub meal_type: MealType,
    #[serde(default, with = "lenient")]
    pub logged_at: Option<DateTime<Utc>>,
}

/// A water intake entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WaterLog {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<Uuid>,
    pub amount_ml: u32,
    #[serde(default, with = "lenient")]
    pub logged_at: Option<DateTime<Utc>>,
}

/// Input for logging water intake
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewWaterLog {
    #[validate(range(min = 1, max = 10_000))]
    pub amount_ml: u32,
    #[serde(default, with = "lenient")]
    pub logged_at: Option<DateTime<Utc>>,
}

/// Daily nutrition targets, one set per user
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct NutritionGoals {
    pub daily_calories: u32,
    pub daily_protein: u32,
    pub daily_carbs: u32,
    pub daily_fat: u32,
    /// Water target in ml
    pub daily_water: u32,
}

impl Default for NutritionGoals {
    fn default() -> Self {
        Self {
            daily_calories: 2000,
            daily_protein: 150,
            daily_carbs: 200,
            daily_fat: 65,
            daily_water: 2500,
        }
    }
}

/// Partial update of the nutrition goals
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct NutritionGoalsPatch {
    #[validate(range(min = 1, max = 20_000))]
    pub daily_calories: Option<u32>,
    #[validate(range(max = 2_000))]
    pub daily_protein: Option<u32>,
    #[validate(range(max = 2_000))]
    pub daily_carbs: Option<u32>,
    #[validate(range(max = 2_000))]
    pub daily_fat: Option<u32>,
    #[validate(range(min = 1, max = 20_000))]
    pub daily_water: Option<u32>,
}

impl NutritionGoals {
    /// Merge a partial update, keeping fields the patch leaves unset
    pub fn apply(&mut self, patch: &NutritionGoalsPatch) {
        if let Some(v) = patch.daily_calories {
            self.daily_calories = v;
        }
        if let Some(v) = patch.daily_protein {
            self.daily_protein = v;
        }
        if let Some(v) = patch.daily_carbs {
            self.daily_carbs = v;
        }
        if let Some(v) = patch.daily_fat {
            self.daily_fat = v;
        }
        if let Some(v) = patch.daily_water {
            self.daily_water = v;
        }
    }
}

// ============================================================================
// Custom workout plans
// ============================================================================

/// One exercise inside a workout day
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
    pub name: String,
    pub sets: u32,
    pub reps: u32,
    /// Rest between sets in seconds
    pub rest_time: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Input for adding an exercise to a plan day
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewExercise {
    #[validate(length(max = 200), custom(function = "not_blank"))]
    pub name: String,
    #[validate(range(min = 1, max = 100))]
    pub sets: u32,
    #[validate(range(min = 1, max = 1000))]
    pub reps: u32,
    #[validate(range(max = 3600))]
    pub rest_time: u32,
    #[validate(range(min = 0.0, max = 1000.0), custom(function = "finite"))]
    pub weight: Option<f64>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

impl From<NewExercise> for Exercise {
    fn from(input: NewExercise) -> Self {
        Self {
            name: input.name.trim().to_string(),
            sets: input.sets,
            reps: input.reps,
            rest_time: input.rest_time,
            weight: input.weight,
            notes: input.notes,
        }
    }
}

/// One day of a plan's weekly schedule
///
/// Serialized in camelCase because the remote store keeps the day list as an
/// opaque JSON column shared with other clients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutDay {
    pub day_number: u8,
    pub day_name: String,
    pub is_rest_day: bool,
    #[serde(default)]
    pub exercises: Vec<Exercise>,
}

/// A user-built workout plan
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CustomWorkoutPlan {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<Uuid>,
    pub name: String,
    pub description: String,
    pub difficulty_level: DifficultyLevel,
    pub goal_type: GoalType,
    pub days_per_week: u8,
    /// Estimated session length in minutes
    pub estimated_duration: u32,
    pub workout_days: Vec<WorkoutDay>,
    #[serde(default, with = "lenient")]
    pub created_at: Option<DateTime<Utc>>,
}

/// First step of the plan builder: the plan header
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewCustomPlan {
    #[validate(length(max = 200), custom(function = "not_blank"))]
    pub name: String,
    #[validate(length(max = 2000))]
    pub description: String,
    pub difficulty_level: DifficultyLevel,
    pub goal_type: GoalType,
    #[validate(range(min = 1, max = 7))]
    pub days_per_week: u8,
    #[validate(range(min = 1, max = 600))]
    pub estimated_duration: u32,
}

/// A fully assembled plan ready to be stored
#[derive(Debug, Clone, PartialEq)]
pub struct PlanDraft {
    pub name: String,
    pub description: String,
    pub difficulty_level: DifficultyLevel,
    pub goal_type: GoalType,
    pub days_per_week: u8,
    pub estimated_duration: u32,
    pub workout_days: Vec<WorkoutDay>,
}
