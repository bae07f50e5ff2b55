//! Health metrics calculations module
//!
//! BMI classification and the flat calories-burned estimate used when a
//! workout session is logged. All calculations are pure.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// BMI Calculations
// ============================================================================

/// BMI category classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BmiCategory {
    Underweight,
    Normal,
    Overweight,
    Obese,
}

impl BmiCategory {
    /// Get the BMI range for this category (lower bound inclusive)
    pub fn range(&self) -> (f64, f64) {
        match self {
            BmiCategory::Underweight => (0.0, 18.5),
            BmiCategory::Normal => (18.5, 25.0),
            BmiCategory::Overweight => (25.0, 30.0),
            BmiCategory::Obese => (30.0, f64::INFINITY),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BmiCategory::Underweight => "Underweight",
            BmiCategory::Normal => "Normal",
            BmiCategory::Overweight => "Overweight",
            BmiCategory::Obese => "Obese",
        }
    }
}

impl fmt::Display for BmiCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Calculate BMI from weight and height
///
/// Formula: BMI = weight(kg) / height(m)²
pub fn calculate_bmi(weight_kg: f64, height_m: f64) -> f64 {
    weight_kg / (height_m * height_m)
}

/// Classify BMI into category; each boundary belongs to the upper category
pub fn classify_bmi(bmi: f64) -> BmiCategory {
    if bmi < 18.5 {
        BmiCategory::Underweight
    } else if bmi < 25.0 {
        BmiCategory::Normal
    } else if bmi < 30.0 {
        BmiCategory::Overweight
    } else {
        BmiCategory::Obese
    }
}

// ============================================================================
// Energy expenditure
// ============================================================================

/// Calories burned during a session at a flat per-minute rate
///
/// `round(duration_minutes * calories_per_minute)`, saturating at zero for
/// non-positive rates.
pub fn calories_burned(duration_secs: u32, calories_per_minute: f64) -> u32 {
    let minutes = f64::from(duration_secs) / 60.0;
    let calories = (minutes * calories_per_minute).round();
    if calories.is_finite() && calories > 0.0 {
        calories.min(f64::from(u32::MAX)) as u32
    } else {
        0
    }
}
