//! Common test utilities for integration tests
//!
//! Builds isolated trackers over in-memory storage and an in-memory remote
//! store so sync flows can be exercised without a backend.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Utc};
use fake::faker::lorem::en::Word;
use fake::Fake;
use fitlog_engine::auth::SessionAuth;
use fitlog_engine::config::AppConfig;
use fitlog_engine::remote::InMemoryRemoteStore;
use fitlog_engine::store::{DurableStorage, MemoryStorage};
use fitlog_engine::sync::RetryConfig;
use fitlog_engine::Tracker;
use fitlog_shared::{MealType, NewMeal, NewWaterLog, NewWorkoutSession};
use uuid::Uuid;

/// Tracker wired to in-memory collaborators
pub struct TestApp {
    pub tracker: Tracker,
    pub storage: Arc<MemoryStorage>,
    pub remote: Arc<InMemoryRemoteStore>,
    pub auth: Arc<SessionAuth>,
    pub user_id: Uuid,
}

impl TestApp {
    /// Signed-out tracker with empty storage
    pub fn new() -> Self {
        Self::with_storage(Arc::new(MemoryStorage::new()))
    }

    pub fn with_storage(storage: Arc<MemoryStorage>) -> Self {
        let remote = Arc::new(InMemoryRemoteStore::new());
        let auth = Arc::new(SessionAuth::new());
        let durable: Arc<dyn DurableStorage> = storage.clone();
        let tracker = Tracker::new(&test_config(), durable, remote.clone(), auth.clone());

        Self {
            tracker,
            storage,
            remote,
            auth,
            user_id: Uuid::new_v4(),
        }
    }

    /// Sign the test user in and run the initial pull
    pub async fn sign_in(&self) -> fitlog_engine::AuthSync {
        let event = self.auth.sign_in(self.user_id).await;
        self.tracker.handle_auth_event(event).await
    }

    /// Register the test user as a new account
    pub async fn sign_up(&self) -> fitlog_engine::AuthSync {
        let event = self.auth.sign_up(self.user_id).await;
        self.tracker.handle_auth_event(event).await
    }
}

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.sync.remote_timeout_secs = 1;
    config.sync.retry = RetryConfig {
        max_attempts: 2,
        initial_delay_ms: 1,
        max_delay_ms: 5,
        backoff_factor: 2.0,
    };
    config
}

pub fn session(duration_secs: u32, date: DateTime<Utc>) -> NewWorkoutSession {
    NewWorkoutSession {
        plan_name: "Full Body".to_string(),
        exercise_name: Word().fake(),
        duration_secs,
        sets: 3,
        reps: 10,
        completed_sets: 3,
        date: Some(date),
    }
}

pub fn meal(calories: f64, meal_type: MealType, logged_at: DateTime<Utc>) -> NewMeal {
    NewMeal {
        name: Word().fake(),
        description: None,
        serving_weight: 100.0,
        calories,
        protein: (5..40).fake::<u32>() as f64,
        carbs: 30.0,
        fat: 10.0,
        fiber: None,
        sugar: None,
        sodium: None,
        meal_type,
        logged_at: Some(logged_at),
    }
}

pub fn water(amount_ml: u32, logged_at: DateTime<Utc>) -> NewWaterLog {
    NewWaterLog {
        amount_ml,
        logged_at: Some(logged_at),
    }
}
