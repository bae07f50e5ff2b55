//! Local store
//!
//! Holds every domain in memory and mirrors each one to a durable key after
//! every mutation. Memory is authoritative: when a durable write fails the
//! mutation stays, the domain is marked dirty and rewritten by the next
//! mutation of that domain or by [`LocalStore::flush`].

pub mod storage;

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use fitlog_shared::{
    calculate_bmi, calories_burned, BodyStats, CustomWorkoutPlan, Meal, NewBodyStats, NewMeal,
    NewWaterLog, NewWorkoutSession, NutritionGoals, NutritionGoalsPatch, PlanDraft, WaterLog,
    WorkoutSession,
};
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::Domain;
use crate::error::StorageError;

pub use storage::{DurableStorage, FileStorage, MemoryStorage};

/// The store as shared between the tracker and the sync worker.
///
/// The lock is only ever held for synchronous store calls, never across an
/// `.await` on remote I/O.
pub type SharedStore = Arc<Mutex<LocalStore>>;

/// Point-in-time copy of every domain
#[derive(Debug, Clone, Default)]
pub struct StoreSnapshot {
    pub sessions: Vec<WorkoutSession>,
    pub body_stats: Vec<BodyStats>,
    pub meals: Vec<Meal>,
    pub water_logs: Vec<WaterLog>,
    pub goals: NutritionGoals,
    pub plans: Vec<CustomWorkoutPlan>,
}

pub struct LocalStore {
    storage: Arc<dyn DurableStorage>,
    calories_per_minute: f64,
    sessions: Vec<WorkoutSession>,
    body_stats: Vec<BodyStats>,
    meals: Vec<Meal>,
    water_logs: Vec<WaterLog>,
    goals: NutritionGoals,
    plans: Vec<CustomWorkoutPlan>,
    dirty: BTreeSet<Domain>,
    last_id_millis: i64,
}

impl LocalStore {
    /// Hydrate every domain from durable storage.
    ///
    /// A key that cannot be read or decoded is logged and its domain starts
    /// empty; the other domains are unaffected.
    pub fn open(storage: Arc<dyn DurableStorage>, calories_per_minute: f64) -> Self {
        let sessions: Vec<WorkoutSession> = load_domain(storage.as_ref(), Domain::WorkoutSessions);
        let body_stats: Vec<BodyStats> = load_domain(storage.as_ref(), Domain::BodyStats);
        let meals: Vec<Meal> = load_domain(storage.as_ref(), Domain::Meals);
        let water_logs: Vec<WaterLog> = load_domain(storage.as_ref(), Domain::WaterLogs);
        let goals: NutritionGoals = load_domain(storage.as_ref(), Domain::Goals);
        let plans: Vec<CustomWorkoutPlan> = load_domain(storage.as_ref(), Domain::CustomPlans);

        let mut store = Self {
            storage,
            calories_per_minute,
            sessions,
            body_stats,
            meals,
            water_logs,
            goals,
            plans,
            dirty: BTreeSet::new(),
            last_id_millis: 0,
        };
        store.last_id_millis = store.highest_local_id_millis();

        info!(
            sessions = store.sessions.len(),
            body_stats = store.body_stats.len(),
            meals = store.meals.len(),
            water_logs = store.water_logs.len(),
            plans = store.plans.len(),
            "Local store opened"
        );
        store
    }

    pub fn into_shared(self) -> SharedStore {
        Arc::new(Mutex::new(self))
    }

    // ========================================================================
    // Reads
    // ========================================================================

    pub fn sessions(&self) -> &[WorkoutSession] {
        &self.sessions
    }

    pub fn body_stats(&self) -> &[BodyStats] {
        &self.body_stats
    }

    pub fn meals(&self) -> &[Meal] {
        &self.meals
    }

    pub fn water_logs(&self) -> &[WaterLog] {
        &self.water_logs
    }

    pub fn goals(&self) -> NutritionGoals {
        self.goals
    }

    pub fn plans(&self) -> &[CustomWorkoutPlan] {
        &self.plans
    }

    pub fn plan(&self, id: &str) -> Option<&CustomWorkoutPlan> {
        self.plans.iter().find(|p| p.id == id)
    }

    pub fn calories_per_minute(&self) -> f64 {
        self.calories_per_minute
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            sessions: self.sessions.clone(),
            body_stats: self.body_stats.clone(),
            meals: self.meals.clone(),
            water_logs: self.water_logs.clone(),
            goals: self.goals,
            plans: self.plans.clone(),
        }
    }

    pub fn is_dirty(&self, domain: Domain) -> bool {
        self.dirty.contains(&domain)
    }

    // ========================================================================
    // Appends
    // ========================================================================

    pub fn add_session(&mut self, input: NewWorkoutSession) -> WorkoutSession {
        let session = WorkoutSession {
            id: self.next_id(Domain::WorkoutSessions),
            remote_id: None,
            plan_name: input.plan_name.trim().to_string(),
            exercise_name: input.exercise_name.trim().to_string(),
            duration_secs: input.duration_secs,
            sets: input.sets,
            reps: input.reps,
            completed_sets: input.completed_sets,
            calories_burned: calories_burned(input.duration_secs, self.calories_per_minute),
            date: Some(input.date.unwrap_or_else(Utc::now)),
        };
        self.sessions.push(session.clone());
        self.persist(Domain::WorkoutSessions);
        session
    }

    /// Append a body measurement; BMI is derived when a height is known
    pub fn add_body_stats(&mut self, input: NewBodyStats, height_m: Option<f64>) -> BodyStats {
        let bmi = height_m
            .filter(|h| h.is_finite() && *h > 0.0)
            .map(|h| (calculate_bmi(input.weight, h) * 100.0).round() / 100.0);

        let stats = BodyStats {
            id: self.next_id(Domain::BodyStats),
            remote_id: None,
            weight: input.weight,
            waist: input.waist,
            hip: input.hip,
            chest: input.chest,
            arm: input.arm,
            body_fat: input.body_fat,
            bmi,
            date: Some(input.date.unwrap_or_else(Utc::now)),
        };
        self.body_stats.push(stats.clone());
        self.persist(Domain::BodyStats);
        stats
    }

    pub fn add_meal(&mut self, input: NewMeal) -> Meal {
        let meal = Meal {
            id: self.next_id(Domain::Meals),
            remote_id: None,
            name: input.name.trim().to_string(),
            description: input.description,
            serving_weight: input.serving_weight,
            calories: input.calories,
            protein: input.protein,
            carbs: input.carbs,
            fat: input.fat,
            fiber: input.fiber,
            sugar: input.sugar,
            sodium: input.sodium,
            meal_type: input.meal_type,
            logged_at: Some(input.logged_at.unwrap_or_else(Utc::now)),
        };
        self.meals.push(meal.clone());
        self.persist(Domain::Meals);
        meal
    }

    pub fn add_water_log(&mut self, input: NewWaterLog) -> WaterLog {
        let log = WaterLog {
            id: self.next_id(Domain::WaterLogs),
            remote_id: None,
            amount_ml: input.amount_ml,
            logged_at: Some(input.logged_at.unwrap_or_else(Utc::now)),
        };
        self.water_logs.push(log.clone());
        self.persist(Domain::WaterLogs);
        log
    }

    pub fn add_custom_plan(&mut self, draft: PlanDraft) -> CustomWorkoutPlan {
        let plan = CustomWorkoutPlan {
            id: self.next_id(Domain::CustomPlans),
            remote_id: None,
            name: draft.name,
            description: draft.description,
            difficulty_level: draft.difficulty_level,
            goal_type: draft.goal_type,
            days_per_week: draft.days_per_week,
            estimated_duration: draft.estimated_duration,
            workout_days: draft.workout_days,
            created_at: Some(Utc::now()),
        };
        self.plans.push(plan.clone());
        self.persist(Domain::CustomPlans);
        plan
    }

    // ========================================================================
    // Updates and removals
    // ========================================================================

    /// Merge a partial update into the goals singleton
    pub fn update_goals(&mut self, patch: &NutritionGoalsPatch) -> NutritionGoals {
        self.goals.apply(patch);
        self.persist(Domain::Goals);
        self.goals
    }

    pub fn remove_custom_plan(&mut self, id: &str) -> Option<CustomWorkoutPlan> {
        let index = self.plans.iter().position(|p| p.id == id)?;
        let plan = self.plans.remove(index);
        self.persist(Domain::CustomPlans);
        Some(plan)
    }

    /// Record the remote row a local record was uploaded to.
    ///
    /// Returns `false` when the record no longer exists locally (e.g. the
    /// store was cleared while the upload was in flight).
    pub fn attach_remote_id(&mut self, domain: Domain, local_id: &str, remote_id: Uuid) -> bool {
        let attached = match domain {
            Domain::WorkoutSessions => set_remote_id(&mut self.sessions, local_id, remote_id, |r| {
                (&r.id, &mut r.remote_id)
            }),
            Domain::BodyStats => set_remote_id(&mut self.body_stats, local_id, remote_id, |r| {
                (&r.id, &mut r.remote_id)
            }),
            Domain::Meals => {
                set_remote_id(&mut self.meals, local_id, remote_id, |r| (&r.id, &mut r.remote_id))
            }
            Domain::WaterLogs => set_remote_id(&mut self.water_logs, local_id, remote_id, |r| {
                (&r.id, &mut r.remote_id)
            }),
            Domain::CustomPlans => set_remote_id(&mut self.plans, local_id, remote_id, |r| {
                (&r.id, &mut r.remote_id)
            }),
            Domain::Goals => false,
        };

        if attached {
            self.persist(domain);
        }
        attached
    }

    // ========================================================================
    // Wholesale replacement
    // ========================================================================

    pub fn replace_sessions(&mut self, sessions: Vec<WorkoutSession>) {
        self.sessions = sessions;
        self.persist(Domain::WorkoutSessions);
    }

    pub fn replace_body_stats(&mut self, body_stats: Vec<BodyStats>) {
        self.body_stats = body_stats;
        self.persist(Domain::BodyStats);
    }

    pub fn replace_meals(&mut self, meals: Vec<Meal>) {
        self.meals = meals;
        self.persist(Domain::Meals);
    }

    pub fn replace_water_logs(&mut self, water_logs: Vec<WaterLog>) {
        self.water_logs = water_logs;
        self.persist(Domain::WaterLogs);
    }

    pub fn replace_goals(&mut self, goals: NutritionGoals) {
        self.goals = goals;
        self.persist(Domain::Goals);
    }

    pub fn replace_plans(&mut self, plans: Vec<CustomWorkoutPlan>) {
        self.plans = plans;
        self.persist(Domain::CustomPlans);
    }

    /// Empty every domain, reset goals to defaults and drop the durable keys
    pub fn clear(&mut self) {
        self.sessions.clear();
        self.body_stats.clear();
        self.meals.clear();
        self.water_logs.clear();
        self.goals = NutritionGoals::default();
        self.plans.clear();

        for domain in Domain::ALL {
            match self.storage.remove(domain.storage_key()) {
                Ok(()) => {
                    self.dirty.remove(&domain);
                }
                Err(e) => {
                    warn!(domain = %domain, error = %e, "Failed to remove durable key");
                    self.dirty.insert(domain);
                }
            }
        }
        info!("Local store cleared");
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Rewrite every dirty domain. Returns the first failure; domains that
    /// still fail stay dirty.
    pub fn flush(&mut self) -> Result<(), StorageError> {
        let mut first_error = None;
        let dirty: Vec<Domain> = self.dirty.iter().copied().collect();

        for domain in dirty {
            match self.write_domain(domain) {
                Ok(()) => {
                    self.dirty.remove(&domain);
                }
                Err(e) => {
                    warn!(domain = %domain, error = %e, "Flush failed");
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn persist(&mut self, domain: Domain) {
        match self.write_domain(domain) {
            Ok(()) => {
                self.dirty.remove(&domain);
            }
            Err(e) => {
                warn!(
                    domain = %domain,
                    error = %e,
                    "Local persistence failed, keeping in-memory state"
                );
                self.dirty.insert(domain);
            }
        }
    }

    fn write_domain(&self, domain: Domain) -> Result<(), StorageError> {
        let contents = match domain {
            Domain::WorkoutSessions => serde_json::to_string(&self.sessions)?,
            Domain::BodyStats => serde_json::to_string(&self.body_stats)?,
            Domain::Meals => serde_json::to_string(&self.meals)?,
            Domain::WaterLogs => serde_json::to_string(&self.water_logs)?,
            Domain::Goals => serde_json::to_string(&self.goals)?,
            Domain::CustomPlans => serde_json::to_string(&self.plans)?,
        };
        self.storage.save(domain.storage_key(), &contents)
    }

    // ========================================================================
    // Local identifiers
    // ========================================================================

    /// `<prefix>-<millis>`, strictly increasing within this store
    fn next_id(&mut self, domain: Domain) -> String {
        let now = Utc::now().timestamp_millis();
        let millis = if now <= self.last_id_millis {
            self.last_id_millis + 1
        } else {
            now
        };
        self.last_id_millis = millis;
        format!("{}-{}", domain.id_prefix(), millis)
    }

    fn highest_local_id_millis(&self) -> i64 {
        let ids = self
            .sessions
            .iter()
            .map(|r| (Domain::WorkoutSessions, r.id.as_str()))
            .chain(self.body_stats.iter().map(|r| (Domain::BodyStats, r.id.as_str())))
            .chain(self.meals.iter().map(|r| (Domain::Meals, r.id.as_str())))
            .chain(self.water_logs.iter().map(|r| (Domain::WaterLogs, r.id.as_str())))
            .chain(self.plans.iter().map(|r| (Domain::CustomPlans, r.id.as_str())));

        ids.filter_map(|(domain, id)| {
            id.strip_prefix(domain.id_prefix())?
                .strip_prefix('-')?
                .parse::<i64>()
                .ok()
        })
        .max()
        .unwrap_or(0)
    }
}

fn load_domain<T>(storage: &dyn DurableStorage, domain: Domain) -> T
where
    T: DeserializeOwned + Default,
{
    match storage.load(domain.storage_key()) {
        Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!(domain = %domain, error = %e, "Corrupt durable key, starting empty");
            T::default()
        }),
        Ok(None) => {
            debug!(domain = %domain, "No durable state yet");
            T::default()
        }
        Err(e) => {
            warn!(domain = %domain, error = %e, "Failed to read durable key, starting empty");
            T::default()
        }
    }
}

fn set_remote_id<T>(
    records: &mut [T],
    local_id: &str,
    remote_id: Uuid,
    fields: impl Fn(&mut T) -> (&String, &mut Option<Uuid>),
) -> bool {
    for record in records.iter_mut() {
        let (id, slot) = fields(record);
        if id == local_id {
            *slot = Some(remote_id);
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use fitlog_shared::MealType;

    fn open_memory() -> (Arc<MemoryStorage>, LocalStore) {
        let storage = Arc::new(MemoryStorage::new());
        let store = LocalStore::open(storage.clone(), 8.0);
        (storage, store)
    }

    fn session_input(duration_secs: u32) -> NewWorkoutSession {
        NewWorkoutSession {
            plan_name: "Push Day".to_string(),
            exercise_name: "Bench Press".to_string(),
            duration_secs,
            sets: 3,
            reps: 10,
            completed_sets: 3,
            date: None,
        }
    }

    #[test]
    fn test_add_session_derives_calories_and_date() {
        let (_, mut store) = open_memory();
        let session = store.add_session(session_input(600));
        assert_eq!(session.calories_burned, 80);
        assert!(session.date.is_some());
        assert!(session.id.starts_with("session-"));
        assert_eq!(store.sessions().len(), 1);
    }

    #[test]
    fn test_ids_are_unique_within_a_millisecond() {
        let (_, mut store) = open_memory();
        let a = store.add_session(session_input(60));
        let b = store.add_session(session_input(60));
        let c = store.add_session(session_input(60));
        assert_ne!(a.id, b.id);
        assert_ne!(b.id, c.id);
    }

    #[test]
    fn test_body_stats_bmi_rounded_to_hundredths() {
        let (_, mut store) = open_memory();
        let stats = store.add_body_stats(
            NewBodyStats {
                weight: 70.0,
                ..Default::default()
            },
            Some(1.75),
        );
        assert_eq!(stats.bmi, Some(22.86));

        let without_height = store.add_body_stats(
            NewBodyStats {
                weight: 70.0,
                ..Default::default()
            },
            None,
        );
        assert!(without_height.bmi.is_none());
    }

    #[test]
    fn test_reopen_sees_acknowledged_writes() {
        let (storage, mut store) = open_memory();
        store.add_session(session_input(600));
        store.add_water_log(NewWaterLog {
            amount_ml: 250,
            logged_at: None,
        });
        store.update_goals(&NutritionGoalsPatch {
            daily_calories: Some(1800),
            ..Default::default()
        });

        let reopened = LocalStore::open(storage, 8.0);
        assert_eq!(reopened.sessions().len(), 1);
        assert_eq!(reopened.water_logs().len(), 1);
        assert_eq!(reopened.goals().daily_calories, 1800);
        assert_eq!(reopened.goals().daily_protein, 150);
    }

    #[test]
    fn test_failed_write_keeps_memory_and_marks_dirty() {
        let (storage, mut store) = open_memory();
        storage.set_fail_writes(true);

        store.add_session(session_input(300));
        assert_eq!(store.sessions().len(), 1);
        assert!(store.is_dirty(Domain::WorkoutSessions));
        assert!(store.flush().is_err());

        storage.set_fail_writes(false);
        store.flush().unwrap();
        assert!(!store.is_dirty(Domain::WorkoutSessions));

        let reopened = LocalStore::open(storage, 8.0);
        assert_eq!(reopened.sessions().len(), 1);
    }

    #[test]
    fn test_corrupt_key_starts_domain_empty() {
        let storage = Arc::new(MemoryStorage::new());
        storage.save("workout-sessions", "{not json").unwrap();
        storage.save("nutrition-water-logs", r#"[{"id":"water-5","amount_ml":300,"logged_at":"2025-03-09T07:05:00.000Z"}]"#).unwrap();

        let store = LocalStore::open(storage, 8.0);
        assert!(store.sessions().is_empty());
        assert_eq!(store.water_logs().len(), 1);
    }

    #[test]
    fn test_ids_continue_after_reopen() {
        let storage = Arc::new(MemoryStorage::new());
        let future = Utc::now().timestamp_millis() + 60_000;
        storage
            .save(
                "nutrition-water-logs",
                &format!(r#"[{{"id":"water-{}","amount_ml":300,"logged_at":null}}]"#, future),
            )
            .unwrap();

        let mut store = LocalStore::open(storage, 8.0);
        let log = store.add_water_log(NewWaterLog {
            amount_ml: 100,
            logged_at: None,
        });
        assert_eq!(log.id, format!("water-{}", future + 1));
    }

    #[test]
    fn test_remove_plan_and_attach_remote_id() {
        let (_, mut store) = open_memory();
        let meal = store.add_meal(NewMeal {
            name: "Salad".to_string(),
            description: None,
            serving_weight: 200.0,
            calories: 350.0,
            protein: 25.0,
            carbs: 15.0,
            fat: 20.0,
            fiber: None,
            sugar: None,
            sodium: None,
            meal_type: MealType::Lunch,
            logged_at: Some(Utc.with_ymd_and_hms(2025, 3, 9, 12, 0, 0).unwrap()),
        });

        let remote = Uuid::new_v4();
        assert!(store.attach_remote_id(Domain::Meals, &meal.id, remote));
        assert_eq!(store.meals()[0].remote_id, Some(remote));
        assert!(!store.attach_remote_id(Domain::Meals, "meal-0", remote));

        assert!(store.remove_custom_plan("plan-missing").is_none());
    }

    #[test]
    fn test_replace_is_not_a_merge() {
        let (_, mut store) = open_memory();
        store.add_session(session_input(60));
        store.add_session(session_input(120));

        let pulled = WorkoutSession {
            id: Uuid::new_v4().to_string(),
            remote_id: None,
            plan_name: "Remote".to_string(),
            exercise_name: "Row".to_string(),
            duration_secs: 900,
            sets: 3,
            reps: 12,
            completed_sets: 3,
            calories_burned: 120,
            date: None,
        };
        store.replace_sessions(vec![pulled.clone()]);
        assert_eq!(store.sessions(), &[pulled]);
    }

    #[test]
    fn test_clear_resets_everything() {
        let (storage, mut store) = open_memory();
        store.add_session(session_input(60));
        store.update_goals(&NutritionGoalsPatch {
            daily_water: Some(3000),
            ..Default::default()
        });

        store.clear();
        assert!(store.sessions().is_empty());
        assert_eq!(store.goals(), NutritionGoals::default());
        assert!(!storage.contains("workout-sessions"));
        assert!(!storage.contains("nutrition-goals"));
    }
}
