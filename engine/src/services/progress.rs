//! Workout progress service
//!
//! Derives totals, streaks and weekly progress from the raw session log.
//! Nothing here is stored; every call recomputes from the sessions it is
//! given, so the results are deterministic for a fixed `now`.
//!
//! Calendar days are taken in the time zone of `now`. Sessions without a
//! timestamp still count towards totals but never towards a day.

use std::collections::BTreeSet;

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use fitlog_shared::WorkoutSession;
use serde::Serialize;

/// Overall workout progress
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressSummary {
    pub total_workouts: usize,
    /// Total workout time in minutes
    pub total_duration: f64,
    pub total_calories: u64,
    pub streak_days: u32,
    pub last_workout_date: Option<DateTime<Utc>>,
    pub weekly_goal: u32,
    /// Distinct workout days this week over the weekly goal, capped at 1
    pub weekly_progress: f64,
}

/// Totals for one Sunday-to-Saturday week
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyStats {
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    /// Distinct calendar days with at least one session
    pub workouts_this_week: u32,
    /// Minutes
    pub total_duration: f64,
    pub total_calories: u64,
}

pub struct ProgressService;

impl ProgressService {
    pub fn compute_progress<Tz: TimeZone>(
        sessions: &[WorkoutSession],
        now: &DateTime<Tz>,
        weekly_goal: u32,
    ) -> ProgressSummary {
        let total_duration_secs: u64 = sessions.iter().map(|s| u64::from(s.duration_secs)).sum();
        let total_calories = sessions.iter().map(|s| u64::from(s.calories_burned)).sum();

        let today = now.date_naive();
        let week = Self::compute_weekly_stats(sessions, Self::week_start_of(today), &now.timezone());

        ProgressSummary {
            total_workouts: sessions.len(),
            total_duration: total_duration_secs as f64 / 60.0,
            total_calories,
            streak_days: Self::streak_days(sessions, now),
            last_workout_date: sessions.iter().filter_map(|s| s.date).max(),
            weekly_goal,
            weekly_progress: Self::weekly_progress(week.workouts_this_week, weekly_goal),
        }
    }

    /// Consecutive calendar days with a session, ending today or yesterday
    pub fn streak_days<Tz: TimeZone>(sessions: &[WorkoutSession], now: &DateTime<Tz>) -> u32 {
        let today = now.date_naive();
        let tz = now.timezone();

        let days: BTreeSet<NaiveDate> = sessions
            .iter()
            .filter_map(|s| s.date)
            .map(|d| d.with_timezone(&tz).date_naive())
            .filter(|d| *d <= today)
            .collect();

        let mut days = days.into_iter().rev();
        let latest = match days.next() {
            Some(day) => day,
            None => return 0,
        };
        if today - latest > Duration::days(1) {
            return 0;
        }

        let mut streak = 1;
        let mut expected = latest.pred_opt();
        for day in days {
            if Some(day) != expected {
                break;
            }
            streak += 1;
            expected = day.pred_opt();
        }
        streak
    }

    pub fn compute_weekly_stats<Tz: TimeZone>(
        sessions: &[WorkoutSession],
        week_start: NaiveDate,
        tz: &Tz,
    ) -> WeeklyStats {
        let week_end = week_start + Duration::days(6);

        let in_week: Vec<(&WorkoutSession, NaiveDate)> = sessions
            .iter()
            .filter_map(|s| {
                let day = s.date?.with_timezone(tz).date_naive();
                (day >= week_start && day <= week_end).then_some((s, day))
            })
            .collect();

        let days: BTreeSet<NaiveDate> = in_week.iter().map(|(_, day)| *day).collect();
        let duration_secs: u64 = in_week.iter().map(|(s, _)| u64::from(s.duration_secs)).sum();

        WeeklyStats {
            week_start,
            week_end,
            workouts_this_week: days.len() as u32,
            total_duration: duration_secs as f64 / 60.0,
            total_calories: in_week.iter().map(|(s, _)| u64::from(s.calories_burned)).sum(),
        }
    }

    /// The Sunday starting the week that contains `date`
    pub fn week_start_of(date: NaiveDate) -> NaiveDate {
        date - Duration::days(i64::from(date.weekday().num_days_from_sunday()))
    }

    pub fn weekly_progress(workout_days: u32, weekly_goal: u32) -> f64 {
        if weekly_goal == 0 {
            return 0.0;
        }
        (f64::from(workout_days) / f64::from(weekly_goal)).min(1.0)
    }
}
