//! Application facade
//!
//! Every host-facing operation goes through [`Tracker`]: inputs are
//! validated, the local store is mutated and persisted, and, while a user
//! is signed in, an upload is queued for the sync worker. Reads recompute
//! aggregates from the raw logs each time.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, TimeZone};
use fitlog_shared::{
    BodyStats, CustomWorkoutPlan, GoalType, Meal, MealType, NewBodyStats, NewMeal, NewWaterLog,
    NewWorkoutSession, NutritionGoals, NutritionGoalsPatch, PlanBuilder, WaterLog, WorkoutSession,
};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use validator::Validate;

use crate::auth::{AuthEvent, AuthService};
use crate::config::AppConfig;
use crate::error::{RemoteError, StorageError, TrackerError, TrackerResult};
use crate::remote::{RemoteStore, UserId};
use crate::services::{
    BodyService, LatestBodyStats, NutritionService, ProgressService, ProgressSummary,
    RecommendedMeal, TodayNutrition, WeeklyStats,
};
use crate::store::{DurableStorage, FileStorage, LocalStore, SharedStore, StoreSnapshot};
use crate::sync::{
    PullReport, PushReport, Reconciler, SyncQueue, SyncStatus, SyncTask, SyncWorker, UploadOutcome,
};

/// What handling an auth event did
#[derive(Debug, Clone, PartialEq)]
pub enum AuthSync {
    /// New account: local state cleared, default goals uploaded
    Registered(UploadOutcome),
    Pulled(PullReport),
    Pushed(PushReport),
}

pub struct Tracker {
    store: SharedStore,
    reconciler: Arc<Reconciler>,
    queue: SyncQueue,
    auth: Arc<dyn AuthService>,
    weekly_goal: AtomicU32,
    _worker: JoinHandle<()>,
}

impl Tracker {
    /// Build a tracker and start its sync worker on the current runtime
    pub fn new(
        config: &AppConfig,
        storage: Arc<dyn DurableStorage>,
        remote: Arc<dyn RemoteStore>,
        auth: Arc<dyn AuthService>,
    ) -> Self {
        let store = LocalStore::open(storage, config.progress.calories_per_minute).into_shared();
        let reconciler = Arc::new(Reconciler::new(store.clone(), remote, &config.sync));
        let (queue, worker) = SyncWorker::spawn(reconciler.clone());

        Self {
            store,
            reconciler,
            queue,
            auth,
            weekly_goal: AtomicU32::new(config.progress.weekly_goal),
            _worker: worker,
        }
    }

    /// Build a tracker persisting to `storage.data_dir`
    pub fn open(
        config: &AppConfig,
        remote: Arc<dyn RemoteStore>,
        auth: Arc<dyn AuthService>,
    ) -> Result<Self, StorageError> {
        let storage = FileStorage::new(&config.storage.data_dir)?;
        info!(data_dir = %config.storage.data_dir.display(), "Opening local store");
        Ok(Self::new(config, Arc::new(storage), remote, auth))
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    pub async fn log_session(&self, input: NewWorkoutSession) -> TrackerResult<WorkoutSession> {
        input.validate()?;
        let session = self.store.lock().await.add_session(input);
        self.sync(SyncTask::UploadSession(session.clone())).await;
        Ok(session)
    }

    /// `height_m` comes from the user's profile; without it no BMI is stored
    pub async fn log_body_stats(
        &self,
        input: NewBodyStats,
        height_m: Option<f64>,
    ) -> TrackerResult<BodyStats> {
        input.validate()?;
        let stats = self.store.lock().await.add_body_stats(input, height_m);
        self.sync(SyncTask::UploadBodyStats(stats.clone())).await;
        Ok(stats)
    }

    pub async fn log_meal(&self, input: NewMeal) -> TrackerResult<Meal> {
        input.validate()?;
        let meal = self.store.lock().await.add_meal(input);
        self.sync(SyncTask::UploadMeal(meal.clone())).await;
        Ok(meal)
    }

    pub async fn log_water(&self, input: NewWaterLog) -> TrackerResult<WaterLog> {
        input.validate()?;
        let log = self.store.lock().await.add_water_log(input);
        self.sync(SyncTask::UploadWaterLog(log.clone())).await;
        Ok(log)
    }

    pub async fn update_goals(&self, patch: NutritionGoalsPatch) -> TrackerResult<NutritionGoals> {
        patch.validate()?;
        let goals = self.store.lock().await.update_goals(&patch);
        self.sync(SyncTask::UploadGoals(goals)).await;
        Ok(goals)
    }

    pub async fn create_plan(&self, builder: PlanBuilder) -> TrackerResult<CustomWorkoutPlan> {
        let draft = builder.build()?;
        let plan = self.store.lock().await.add_custom_plan(draft);
        info!(plan_id = %plan.id, name = %plan.name, "Created workout plan");
        self.sync(SyncTask::UploadPlan(plan.clone())).await;
        Ok(plan)
    }

    pub async fn remove_plan(&self, id: &str) -> TrackerResult<CustomWorkoutPlan> {
        let plan = self
            .store
            .lock()
            .await
            .remove_custom_plan(id)
            .ok_or_else(|| TrackerError::NotFound(format!("plan {}", id)))?;
        info!(plan_id = %plan.id, "Removed workout plan");
        if let Some(remote_id) = plan.remote_id {
            self.sync(SyncTask::DeletePlan(remote_id)).await;
        }
        Ok(plan)
    }

    /// Distinct workout days per week counted as full progress
    pub fn set_weekly_goal(&self, goal: u32) {
        self.weekly_goal.store(goal, Ordering::Relaxed);
    }

    /// Retry durable writes that failed earlier
    pub async fn flush(&self) -> TrackerResult<()> {
        self.store.lock().await.flush()?;
        Ok(())
    }

    // ========================================================================
    // Reads
    // ========================================================================

    pub async fn progress<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> ProgressSummary {
        let store = self.store.lock().await;
        ProgressService::compute_progress(store.sessions(), now, self.weekly_goal())
    }

    pub async fn weekly_stats<Tz: TimeZone>(&self, week_start: NaiveDate, tz: &Tz) -> WeeklyStats {
        let store = self.store.lock().await;
        ProgressService::compute_weekly_stats(store.sessions(), week_start, tz)
    }

    pub async fn today_nutrition<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> TodayNutrition {
        let store = self.store.lock().await;
        NutritionService::compute_today_nutrition(store.meals(), store.water_logs(), &store.goals(), now)
    }

    pub async fn meals_by_type<Tz: TimeZone>(&self, meal_type: MealType, now: &DateTime<Tz>) -> Vec<Meal> {
        let store = self.store.lock().await;
        NutritionService::meals_by_type(store.meals(), meal_type, now)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn recommended_meals(
        &self,
        goal: GoalType,
        meal_type: Option<MealType>,
    ) -> Vec<&'static RecommendedMeal> {
        NutritionService::recommended_meals(goal, meal_type)
    }

    pub async fn latest_body_stats(&self) -> Option<LatestBodyStats> {
        BodyService::latest(self.store.lock().await.body_stats())
    }

    pub async fn goals(&self) -> NutritionGoals {
        self.store.lock().await.goals()
    }

    pub async fn plan(&self, id: &str) -> Option<CustomWorkoutPlan> {
        self.store.lock().await.plan(id).cloned()
    }

    pub async fn snapshot(&self) -> StoreSnapshot {
        self.store.lock().await.snapshot()
    }

    pub fn weekly_goal(&self) -> u32 {
        self.weekly_goal.load(Ordering::Relaxed)
    }

    pub fn sync_status(&self) -> SyncStatus {
        self.reconciler.status().snapshot()
    }

    pub fn subscribe_sync_status(&self) -> watch::Receiver<SyncStatus> {
        self.reconciler.status().subscribe()
    }

    /// Wait for every upload queued so far
    pub async fn wait_for_uploads(&self) {
        self.queue.flush().await;
    }

    // ========================================================================
    // Session lifecycle
    // ========================================================================

    pub async fn handle_auth_event(&self, event: AuthEvent) -> AuthSync {
        match event {
            AuthEvent::SignedUp(user_id) => {
                info!(user_id = %user_id, "Signed up, starting from defaults");
                AuthSync::Registered(self.reconciler.register(user_id).await)
            }
            AuthEvent::SignedIn(user_id) => {
                info!(user_id = %user_id, "Signed in, replacing local state");
                AuthSync::Pulled(self.reconciler.pull_all(user_id).await)
            }
            AuthEvent::SignedOut(user_id) => {
                info!(user_id = %user_id, "Signed out, uploading local state");
                AuthSync::Pushed(self.push_and_clear(user_id).await)
            }
        }
    }

    /// Upload everything, clear local state, then end the remote session
    pub async fn sign_out(&self) -> TrackerResult<PushReport> {
        let user_id = self
            .auth
            .current_user_id()
            .await
            .ok_or(RemoteError::NotAuthenticated)?;
        let report = self.push_and_clear(user_id).await;
        self.auth.sign_out().await?;
        info!(user_id = %user_id, "Signed out");
        Ok(report)
    }

    async fn push_and_clear(&self, user_id: UserId) -> PushReport {
        self.queue.flush().await;
        let report = self.reconciler.push_all(user_id).await;
        if report.failed > 0 {
            warn!(failed = report.failed, "Clearing local state with failed uploads");
        }
        self.store.lock().await.clear();
        report
    }

    async fn sync(&self, task: SyncTask) {
        if let Some(user_id) = self.auth.current_user_id().await {
            self.queue.enqueue(user_id, task);
        }
    }
}
