//! Nutrition tracking service
//!
//! Provides the daily nutrition summary, meals by slot and the recommended
//! meal catalog.

use chrono::{DateTime, TimeZone};
use fitlog_shared::{GoalType, Meal, MealType, NutritionGoals, WaterLog};
use serde::Serialize;

/// Today's intake against the nutrition goals
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TodayNutrition {
    pub total_calories: f64,
    pub total_protein: f64,
    pub total_carbs: f64,
    pub total_fat: f64,
    /// Water in ml
    pub total_water: u64,
    /// Percent of the calorie goal; not capped at 100
    pub calorie_progress: f64,
    /// Percent of the water goal; not capped at 100
    pub water_progress: f64,
    pub meal_count: usize,
}

/// A suggested meal from the static catalog
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendedMeal {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub calories: u32,
    pub protein: u32,
    pub carbs: u32,
    pub fat: u32,
    pub meal_type: MealType,
    pub goal: GoalType,
}

const fn recommended(
    id: &'static str,
    name: &'static str,
    description: &'static str,
    macros: (u32, u32, u32, u32),
    meal_type: MealType,
    goal: GoalType,
) -> RecommendedMeal {
    RecommendedMeal {
        id,
        name,
        description,
        calories: macros.0,
        protein: macros.1,
        carbs: macros.2,
        fat: macros.3,
        meal_type,
        goal,
    }
}

/// Catalog of recommended meals: (calories, protein, carbs, fat)
const RECOMMENDED_MEALS: &[RecommendedMeal] = &[
    // Weight loss
    recommended("wl-breakfast-1", "Oatmeal with Berries", "High fiber breakfast to keep you full longer", (280, 12, 45, 8), MealType::Breakfast, GoalType::WeightLoss),
    recommended("wl-lunch-1", "Grilled Chicken Salad", "Lean protein with fresh vegetables", (320, 35, 15, 12), MealType::Lunch, GoalType::WeightLoss),
    recommended("wl-dinner-1", "Salmon with Quinoa", "Omega-3 rich fish with whole grains", (380, 28, 35, 18), MealType::Dinner, GoalType::WeightLoss),
    recommended("wl-snack-1", "Greek Yogurt with Nuts", "Protein-rich snack to curb hunger", (180, 15, 12, 10), MealType::Snack, GoalType::WeightLoss),
    // Muscle gain
    recommended("mg-breakfast-1", "Protein Pancakes", "High protein breakfast for muscle building", (420, 25, 55, 15), MealType::Breakfast, GoalType::MuscleGain),
    recommended("mg-lunch-1", "Beef Stir Fry with Rice", "Protein and carbs for muscle recovery", (580, 42, 65, 22), MealType::Lunch, GoalType::MuscleGain),
    recommended("mg-dinner-1", "Turkey with Sweet Potato", "Lean protein with complex carbs", (520, 38, 45, 20), MealType::Dinner, GoalType::MuscleGain),
    recommended("mg-snack-1", "Protein Shake with Banana", "Quick protein boost between meals", (280, 22, 35, 8), MealType::Snack, GoalType::MuscleGain),
    // Maintenance
    recommended("mt-breakfast-1", "Avocado Toast with Eggs", "Balanced breakfast for energy", (350, 18, 30, 20), MealType::Breakfast, GoalType::Maintenance),
    recommended("mt-lunch-1", "Mediterranean Bowl", "Fresh and nutritious lunch option", (420, 25, 40, 22), MealType::Lunch, GoalType::Maintenance),
    recommended("mt-dinner-1", "Pasta with Lean Meat", "Comforting dinner with balanced macros", (480, 32, 55, 18), MealType::Dinner, GoalType::Maintenance),
    recommended("mt-snack-1", "Mixed Nuts and Dried Fruits", "Healthy snack with natural sugars", (220, 8, 25, 12), MealType::Snack, GoalType::Maintenance),
];

pub struct NutritionService;

impl NutritionService {
    /// Sum everything logged on the calendar day of `now`
    pub fn compute_today_nutrition<Tz: TimeZone>(
        meals: &[Meal],
        water_logs: &[WaterLog],
        goals: &NutritionGoals,
        now: &DateTime<Tz>,
    ) -> TodayNutrition {
        let today_meals: Vec<&Meal> = meals
            .iter()
            .filter(|m| is_same_day(m.logged_at.as_ref(), now))
            .collect();

        let total_calories: f64 = today_meals.iter().map(|m| m.calories).sum();
        let total_water: u64 = water_logs
            .iter()
            .filter(|w| is_same_day(w.logged_at.as_ref(), now))
            .map(|w| u64::from(w.amount_ml))
            .sum();

        TodayNutrition {
            total_calories,
            total_protein: today_meals.iter().map(|m| m.protein).sum(),
            total_carbs: today_meals.iter().map(|m| m.carbs).sum(),
            total_fat: today_meals.iter().map(|m| m.fat).sum(),
            total_water,
            calorie_progress: Self::calculate_progress(total_calories, goals.daily_calories),
            water_progress: Self::calculate_progress(total_water as f64, goals.daily_water),
            meal_count: today_meals.len(),
        }
    }

    /// Percent of a goal, 0 when the goal is not positive
    pub fn calculate_progress(consumed: f64, goal: u32) -> f64 {
        if goal == 0 {
            return 0.0;
        }
        consumed / f64::from(goal) * 100.0
    }

    /// Today's meals in one slot, in logging order
    pub fn meals_by_type<'a, Tz: TimeZone>(
        meals: &'a [Meal],
        meal_type: MealType,
        now: &DateTime<Tz>,
    ) -> Vec<&'a Meal> {
        meals
            .iter()
            .filter(|m| m.meal_type == meal_type && is_same_day(m.logged_at.as_ref(), now))
            .collect()
    }

    pub fn recommended_meals(goal: GoalType, meal_type: Option<MealType>) -> Vec<&'static RecommendedMeal> {
        RECOMMENDED_MEALS
            .iter()
            .filter(|m| m.goal == goal && meal_type.map_or(true, |t| m.meal_type == t))
            .collect()
    }
}

fn is_same_day<Tz: TimeZone>(at: Option<&DateTime<chrono::Utc>>, now: &DateTime<Tz>) -> bool {
    at.map_or(false, |at| {
        at.with_timezone(&now.timezone()).date_naive() == now.date_naive()
    })
}
