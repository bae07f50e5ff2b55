//! Mapping between local records and remote rows
//!
//! Uploads need a timestamp for every log record: it is part of the natural
//! key and of the remote ordering. A record without one fails with
//! [`RemoteError::MissingField`] and is skipped by the reconciler.
//!
//! Pulled records take the remote row id as their local id.

use fitlog_shared::timestamps::{format_timestamp, timestamp_from_value};
use fitlog_shared::{
    BodyStats, CustomWorkoutPlan, Meal, NutritionGoals, WaterLog, WorkoutDay, WorkoutSession,
};
use serde_json::{json, Value};
use uuid::Uuid;

use super::{row_id, NaturalKey, RemoteId, Row, UserId};
use crate::domain::Domain;
use crate::error::RemoteError;

/// A local record that can be mirrored to a remote row
pub trait RemoteRecord: Sized + Clone + Send + Sync + 'static {
    const DOMAIN: Domain;

    fn local_id(&self) -> &str;

    fn remote_id(&self) -> Option<RemoteId>;

    /// Columns identifying this record remotely
    fn natural_key(&self) -> Result<NaturalKey, RemoteError>;

    fn to_row(&self, user_id: UserId) -> Result<Row, RemoteError>;

    fn from_row(row: &Row) -> Result<Self, RemoteError>;
}

// ============================================================================
// Column helpers
// ============================================================================

fn into_row(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        _ => Row::new(),
    }
}

fn timestamp_column(
    value: Option<&chrono::DateTime<chrono::Utc>>,
    column: &'static str,
) -> Result<String, RemoteError> {
    value
        .map(format_timestamp)
        .ok_or(RemoteError::MissingField(column))
}

fn str_field(row: &Row, column: &'static str) -> Result<String, RemoteError> {
    row.get(column)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(RemoteError::MissingField(column))
}

fn opt_str_field(row: &Row, column: &str) -> Option<String> {
    row.get(column).and_then(Value::as_str).map(str::to_string)
}

fn f64_field(row: &Row, column: &'static str) -> Result<f64, RemoteError> {
    opt_f64_field(row, column).ok_or(RemoteError::MissingField(column))
}

fn opt_f64_field(row: &Row, column: &str) -> Option<f64> {
    row.get(column).and_then(Value::as_f64)
}

/// Integer columns may come back as floats from numeric columns
fn u32_field(row: &Row, column: &'static str) -> Result<u32, RemoteError> {
    let value = row.get(column).ok_or(RemoteError::MissingField(column))?;
    let number = value
        .as_u64()
        .or_else(|| value.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64))
        .ok_or_else(|| RemoteError::Decode(format!("{} is not a count: {}", column, value)))?;
    u32::try_from(number).map_err(|_| RemoteError::Decode(format!("{} out of range: {}", column, number)))
}

fn parsed_field<T: std::str::FromStr>(row: &Row, column: &'static str) -> Result<T, RemoteError>
where
    T::Err: std::fmt::Display,
{
    str_field(row, column)?
        .parse()
        .map_err(|e: T::Err| RemoteError::Decode(format!("{}: {}", column, e)))
}

fn timestamp_field(row: &Row, column: &str) -> Option<chrono::DateTime<chrono::Utc>> {
    row.get(column).and_then(timestamp_from_value)
}

fn pulled_ids(row: &Row) -> Result<(String, Option<Uuid>), RemoteError> {
    let id = row_id(row)?;
    Ok((id.to_string(), Some(id)))
}

// ============================================================================
// Workout sessions
// ============================================================================

impl RemoteRecord for WorkoutSession {
    const DOMAIN: Domain = Domain::WorkoutSessions;

    fn local_id(&self) -> &str {
        &self.id
    }

    fn remote_id(&self) -> Option<RemoteId> {
        self.remote_id
    }

    fn natural_key(&self) -> Result<NaturalKey, RemoteError> {
        Ok(NaturalKey::new()
            .with("exercise_name", self.exercise_name.clone())
            .with("session_date", timestamp_column(self.date.as_ref(), "session_date")?)
            .with("duration", self.duration_secs))
    }

    fn to_row(&self, user_id: UserId) -> Result<Row, RemoteError> {
        Ok(into_row(json!({
            "user_id": user_id,
            "plan_name": self.plan_name,
            "exercise_name": self.exercise_name,
            "duration": self.duration_secs,
            "sets": self.sets,
            "reps": self.reps,
            "completed_sets": self.completed_sets,
            "calories_burned": self.calories_burned,
            "session_date": timestamp_column(self.date.as_ref(), "session_date")?,
        })))
    }

    fn from_row(row: &Row) -> Result<Self, RemoteError> {
        let (id, remote_id) = pulled_ids(row)?;
        Ok(Self {
            id,
            remote_id,
            plan_name: opt_str_field(row, "plan_name").unwrap_or_default(),
            exercise_name: str_field(row, "exercise_name")?,
            duration_secs: u32_field(row, "duration")?,
            sets: u32_field(row, "sets")?,
            reps: u32_field(row, "reps")?,
            completed_sets: u32_field(row, "completed_sets")?,
            calories_burned: u32_field(row, "calories_burned")?,
            date: timestamp_field(row, "session_date"),
        })
    }
}

// ============================================================================
// Body stats
// ============================================================================

impl RemoteRecord for BodyStats {
    const DOMAIN: Domain = Domain::BodyStats;

    fn local_id(&self) -> &str {
        &self.id
    }

    fn remote_id(&self) -> Option<RemoteId> {
        self.remote_id
    }

    /// Exact timestamp only; two entries logged at the same instant collapse
    fn natural_key(&self) -> Result<NaturalKey, RemoteError> {
        Ok(NaturalKey::new().with("stats_date", timestamp_column(self.date.as_ref(), "stats_date")?))
    }

    fn to_row(&self, user_id: UserId) -> Result<Row, RemoteError> {
        Ok(into_row(json!({
            "user_id": user_id,
            "weight": self.weight,
            "waist": self.waist,
            "hip": self.hip,
            "chest": self.chest,
            "arm": self.arm,
            "body_fat": self.body_fat,
            "bmi": self.bmi,
            "stats_date": timestamp_column(self.date.as_ref(), "stats_date")?,
        })))
    }

    fn from_row(row: &Row) -> Result<Self, RemoteError> {
        let (id, remote_id) = pulled_ids(row)?;
        Ok(Self {
            id,
            remote_id,
            weight: f64_field(row, "weight")?,
            waist: opt_f64_field(row, "waist"),
            hip: opt_f64_field(row, "hip"),
            chest: opt_f64_field(row, "chest"),
            arm: opt_f64_field(row, "arm"),
            body_fat: opt_f64_field(row, "body_fat"),
            bmi: opt_f64_field(row, "bmi"),
            date: timestamp_field(row, "stats_date"),
        })
    }
}

// ============================================================================
// Meals and water
// ============================================================================

impl RemoteRecord for Meal {
    const DOMAIN: Domain = Domain::Meals;

    fn local_id(&self) -> &str {
        &self.id
    }

    fn remote_id(&self) -> Option<RemoteId> {
        self.remote_id
    }

    fn natural_key(&self) -> Result<NaturalKey, RemoteError> {
        Ok(NaturalKey::new()
            .with("name", self.name.clone())
            .with("logged_at", timestamp_column(self.logged_at.as_ref(), "logged_at")?)
            .with("meal_type", self.meal_type.as_str()))
    }

    /// Macro columns are integers remotely; a missing serving weight is 100 g
    fn to_row(&self, user_id: UserId) -> Result<Row, RemoteError> {
        let serving_weight = if self.serving_weight > 0.0 {
            self.serving_weight
        } else {
            100.0
        };
        let round = |v: Option<f64>| v.unwrap_or(0.0).round() as i64;

        Ok(into_row(json!({
            "user_id": user_id,
            "name": self.name,
            "description": self.description,
            "serving_weight": serving_weight,
            "calories": round(Some(self.calories)),
            "protein": round(Some(self.protein)),
            "carbs": round(Some(self.carbs)),
            "fat": round(Some(self.fat)),
            "fiber": round(self.fiber),
            "sugar": round(self.sugar),
            "sodium": round(self.sodium),
            "meal_type": self.meal_type.as_str(),
            "logged_at": timestamp_column(self.logged_at.as_ref(), "logged_at")?,
        })))
    }

    fn from_row(row: &Row) -> Result<Self, RemoteError> {
        let (id, remote_id) = pulled_ids(row)?;
        Ok(Self {
            id,
            remote_id,
            name: str_field(row, "name")?,
            description: opt_str_field(row, "description"),
            serving_weight: opt_f64_field(row, "serving_weight").unwrap_or(100.0),
            calories: f64_field(row, "calories")?,
            protein: opt_f64_field(row, "protein").unwrap_or(0.0),
            carbs: opt_f64_field(row, "carbs").unwrap_or(0.0),
            fat: opt_f64_field(row, "fat").unwrap_or(0.0),
            fiber: opt_f64_field(row, "fiber"),
            sugar: opt_f64_field(row, "sugar"),
            sodium: opt_f64_field(row, "sodium"),
            meal_type: parsed_field(row, "meal_type")?,
            logged_at: timestamp_field(row, "logged_at"),
        })
    }
}

impl RemoteRecord for WaterLog {
    const DOMAIN: Domain = Domain::WaterLogs;

    fn local_id(&self) -> &str {
        &self.id
    }

    fn remote_id(&self) -> Option<RemoteId> {
        self.remote_id
    }

    fn natural_key(&self) -> Result<NaturalKey, RemoteError> {
        Ok(NaturalKey::new()
            .with("logged_at", timestamp_column(self.logged_at.as_ref(), "logged_at")?)
            .with("amount", self.amount_ml))
    }

    fn to_row(&self, user_id: UserId) -> Result<Row, RemoteError> {
        Ok(into_row(json!({
            "user_id": user_id,
            "amount": self.amount_ml,
            "logged_at": timestamp_column(self.logged_at.as_ref(), "logged_at")?,
        })))
    }

    fn from_row(row: &Row) -> Result<Self, RemoteError> {
        let (id, remote_id) = pulled_ids(row)?;
        Ok(Self {
            id,
            remote_id,
            amount_ml: u32_field(row, "amount")?,
            logged_at: timestamp_field(row, "logged_at"),
        })
    }
}

// ============================================================================
// Custom workout plans
// ============================================================================

impl RemoteRecord for CustomWorkoutPlan {
    const DOMAIN: Domain = Domain::CustomPlans;

    fn local_id(&self) -> &str {
        &self.id
    }

    fn remote_id(&self) -> Option<RemoteId> {
        self.remote_id
    }

    /// Plans are matched by name alone
    fn natural_key(&self) -> Result<NaturalKey, RemoteError> {
        Ok(NaturalKey::new().with("name", self.name.clone()))
    }

    fn to_row(&self, user_id: UserId) -> Result<Row, RemoteError> {
        let mut row = into_row(json!({
            "user_id": user_id,
            "name": self.name,
            "description": self.description,
            "difficulty_level": self.difficulty_level.as_str(),
            "goal_type": self.goal_type.as_str(),
            "days_per_week": self.days_per_week,
            "estimated_duration": self.estimated_duration,
            "workout_days": serde_json::to_value(&self.workout_days)?,
        }));
        if let Some(created_at) = &self.created_at {
            row.insert("created_at".to_string(), Value::String(format_timestamp(created_at)));
        }
        Ok(row)
    }

    fn from_row(row: &Row) -> Result<Self, RemoteError> {
        let (id, remote_id) = pulled_ids(row)?;
        let workout_days: Vec<WorkoutDay> = match row.get("workout_days") {
            Some(Value::Null) | None => Vec::new(),
            Some(value) => serde_json::from_value(value.clone())?,
        };
        let days_per_week = u32_field(row, "days_per_week")?;

        Ok(Self {
            id,
            remote_id,
            name: str_field(row, "name")?,
            description: opt_str_field(row, "description").unwrap_or_default(),
            difficulty_level: parsed_field(row, "difficulty_level")?,
            goal_type: parsed_field(row, "goal_type")?,
            days_per_week: u8::try_from(days_per_week)
                .map_err(|_| RemoteError::Decode(format!("days_per_week out of range: {}", days_per_week)))?,
            estimated_duration: u32_field(row, "estimated_duration")?,
            workout_days,
            created_at: timestamp_field(row, "created_at"),
        })
    }
}

// ============================================================================
// Nutrition goals
// ============================================================================

pub fn goals_to_row(goals: &NutritionGoals, user_id: UserId) -> Row {
    into_row(json!({
        "user_id": user_id,
        "daily_calories": goals.daily_calories,
        "daily_protein": goals.daily_protein,
        "daily_carbs": goals.daily_carbs,
        "daily_fat": goals.daily_fat,
        "daily_water": goals.daily_water,
    }))
}

pub fn goals_from_row(row: &Row) -> Result<NutritionGoals, RemoteError> {
    Ok(NutritionGoals {
        daily_calories: u32_field(row, "daily_calories")?,
        daily_protein: u32_field(row, "daily_protein")?,
        daily_carbs: u32_field(row, "daily_carbs")?,
        daily_fat: u32_field(row, "daily_fat")?,
        daily_water: u32_field(row, "daily_water")?,
    })
}
