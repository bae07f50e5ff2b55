//! Step-by-step assembly of a custom workout plan
//!
//! A plan is built in three steps: the header (name, goal, days per week),
//! the weekly schedule (which days are rest days) and the exercises of each
//! workout day. [`PlanBuilder::build`] checks the whole plan before handing
//! out a [`PlanDraft`] for storage.

use validator::Validate;

use crate::errors::PlanBuilderError;
use crate::models::{Exercise, NewCustomPlan, NewExercise, PlanDraft, WorkoutDay};

#[derive(Debug, Clone)]
pub struct PlanBuilder {
    header: NewCustomPlan,
    days: Vec<WorkoutDay>,
}

impl PlanBuilder {
    /// Start a plan; days `1..=days_per_week` are created as workout days
    /// named "Day N".
    pub fn new(header: NewCustomPlan) -> Result<Self, PlanBuilderError> {
        header.validate()?;

        let days = (1..=header.days_per_week)
            .map(|day_number| WorkoutDay {
                day_number,
                day_name: format!("Day {}", day_number),
                is_rest_day: false,
                exercises: Vec::new(),
            })
            .collect();

        Ok(Self { header, days })
    }

    pub fn days(&self) -> &[WorkoutDay] {
        &self.days
    }

    fn day_mut(&mut self, day: u8) -> Result<&mut WorkoutDay, PlanBuilderError> {
        self.days
            .iter_mut()
            .find(|d| d.day_number == day)
            .ok_or(PlanBuilderError::UnknownDay(day))
    }

    /// Toggle a rest day. Marking a day as rest drops its exercises.
    pub fn set_rest_day(&mut self, day: u8, is_rest_day: bool) -> Result<(), PlanBuilderError> {
        let entry = self.day_mut(day)?;
        entry.is_rest_day = is_rest_day;
        if is_rest_day {
            entry.exercises.clear();
        }
        Ok(())
    }

    pub fn rename_day(&mut self, day: u8, name: impl Into<String>) -> Result<(), PlanBuilderError> {
        let name = name.into();
        let entry = self.day_mut(day)?;
        if !name.trim().is_empty() {
            entry.day_name = name.trim().to_string();
        }
        Ok(())
    }

    pub fn add_exercise(&mut self, day: u8, exercise: NewExercise) -> Result<(), PlanBuilderError> {
        exercise.validate()?;
        let entry = self.day_mut(day)?;
        if entry.is_rest_day {
            return Err(PlanBuilderError::RestDay(day));
        }
        entry.exercises.push(Exercise::from(exercise));
        Ok(())
    }

    pub fn remove_exercise(&mut self, day: u8, index: usize) -> Result<Exercise, PlanBuilderError> {
        let entry = self.day_mut(day)?;
        if index >= entry.exercises.len() {
            return Err(PlanBuilderError::UnknownExercise { day, index });
        }
        Ok(entry.exercises.remove(index))
    }

    /// Finish the plan. At least one day must be a workout day and every
    /// workout day needs an exercise.
    pub fn build(self) -> Result<PlanDraft, PlanBuilderError> {
        if self.days.iter().all(|d| d.is_rest_day) {
            return Err(PlanBuilderError::NoWorkoutDays);
        }
        if let Some(empty) = self
            .days
            .iter()
            .find(|d| !d.is_rest_day && d.exercises.is_empty())
        {
            return Err(PlanBuilderError::EmptyWorkoutDay(empty.day_number));
        }

        Ok(PlanDraft {
            name: self.header.name.trim().to_string(),
            description: self.header.description.trim().to_string(),
            difficulty_level: self.header.difficulty_level,
            goal_type: self.header.goal_type,
            days_per_week: self.header.days_per_week,
            estimated_duration: self.header.estimated_duration,
            workout_days: self.days,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DifficultyLevel, GoalType};

    fn header(days_per_week: u8) -> NewCustomPlan {
        NewCustomPlan {
            name: "  Full Body  ".to_string(),
            description: "Three days a week".to_string(),
            difficulty_level: DifficultyLevel::Beginner,
            goal_type: GoalType::Strength,
            days_per_week,
            estimated_duration: 45,
        }
    }

    fn squat() -> NewExercise {
        NewExercise {
            name: "Squat".to_string(),
            sets: 3,
            reps: 10,
            rest_time: 90,
            weight: Some(60.0),
            notes: None,
        }
    }

    #[test]
    fn test_days_are_initialized() {
        let builder = PlanBuilder::new(header(3)).unwrap();
        let names: Vec<_> = builder.days().iter().map(|d| d.day_name.as_str()).collect();
        assert_eq!(names, vec!["Day 1", "Day 2", "Day 3"]);
        assert!(builder.days().iter().all(|d| !d.is_rest_day));
    }

    #[test]
    fn test_blank_name_is_rejected() {
        let mut input = header(3);
        input.name = "   ".to_string();
        assert!(matches!(
            PlanBuilder::new(input),
            Err(PlanBuilderError::Validation(_))
        ));
    }

    #[test]
    fn test_days_per_week_out_of_range() {
        assert!(PlanBuilder::new(header(0)).is_err());
        assert!(PlanBuilder::new(header(8)).is_err());
    }

    #[test]
    fn test_rest_day_cannot_hold_exercises() {
        let mut builder = PlanBuilder::new(header(2)).unwrap();
        builder.set_rest_day(2, true).unwrap();
        assert!(matches!(
            builder.add_exercise(2, squat()),
            Err(PlanBuilderError::RestDay(2))
        ));
        assert!(matches!(
            builder.add_exercise(5, squat()),
            Err(PlanBuilderError::UnknownDay(5))
        ));
    }

    #[test]
    fn test_marking_rest_drops_exercises() {
        let mut builder = PlanBuilder::new(header(2)).unwrap();
        builder.add_exercise(1, squat()).unwrap();
        builder.set_rest_day(1, true).unwrap();
        assert!(builder.days()[0].exercises.is_empty());
    }

    #[test]
    fn test_all_rest_days_fails() {
        let mut builder = PlanBuilder::new(header(2)).unwrap();
        builder.set_rest_day(1, true).unwrap();
        builder.set_rest_day(2, true).unwrap();
        assert!(matches!(builder.build(), Err(PlanBuilderError::NoWorkoutDays)));
    }

    #[test]
    fn test_empty_workout_day_fails() {
        let mut builder = PlanBuilder::new(header(2)).unwrap();
        builder.add_exercise(1, squat()).unwrap();
        assert!(matches!(
            builder.build(),
            Err(PlanBuilderError::EmptyWorkoutDay(2))
        ));
    }

    #[test]
    fn test_remove_exercise() {
        let mut builder = PlanBuilder::new(header(1)).unwrap();
        builder.add_exercise(1, squat()).unwrap();
        assert!(matches!(
            builder.remove_exercise(1, 3),
            Err(PlanBuilderError::UnknownExercise { day: 1, index: 3 })
        ));
        let removed = builder.remove_exercise(1, 0).unwrap();
        assert_eq!(removed.name, "Squat");
    }

    #[test]
    fn test_build_complete_plan() {
        let mut builder = PlanBuilder::new(header(3)).unwrap();
        builder.add_exercise(1, squat()).unwrap();
        builder.set_rest_day(2, true).unwrap();
        builder.rename_day(3, "Legs").unwrap();
        builder.add_exercise(3, squat()).unwrap();

        let draft = builder.build().unwrap();
        assert_eq!(draft.name, "Full Body");
        assert_eq!(draft.workout_days.len(), 3);
        assert_eq!(draft.workout_days[2].day_name, "Legs");
        assert!(draft.workout_days[1].is_rest_day);
    }
}
