//! Fitlog command-line report
//!
//! Opens the local store from the configured data directory, optionally signs
//! a user in (`FITLOG_USER_ID`, with `FITLOG_ACCESS_TOKEN` for the hosted
//! backend) so the store is replaced from the remote tables, and prints the
//! current progress, today's nutrition and the sync status as JSON.

use std::env;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Local;
use fitlog_engine::auth::SessionAuth;
use fitlog_engine::config::AppConfig;
use fitlog_engine::remote::{InMemoryRemoteStore, PostgrestRemoteStore, RemoteStore};
use fitlog_engine::{telemetry, Tracker};
use secrecy::SecretString;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    telemetry::init_tracing();

    let config = AppConfig::load()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        env = if AppConfig::is_production() { "production" } else { "development" },
        "Starting fitlog"
    );

    config.validate()?;

    let remote = connect_remote(&config).await;
    let auth = Arc::new(SessionAuth::new());
    let tracker = Tracker::open(&config, remote, auth.clone())?;

    if let Ok(user) = env::var("FITLOG_USER_ID") {
        let user_id: Uuid = user.parse().context("FITLOG_USER_ID is not a UUID")?;
        let event = auth.sign_in(user_id).await;
        tracker.handle_auth_event(event).await;
    }

    let now = Local::now();
    let report = json!({
        "progress": tracker.progress(&now).await,
        "today": tracker.today_nutrition(&now).await,
        "latest_body_stats": tracker.latest_body_stats().await,
        "sync": tracker.sync_status(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    tracker.wait_for_uploads().await;
    tracker.flush().await?;

    Ok(())
}

/// Hosted backend when an anon key is configured, in-memory otherwise
async fn connect_remote(config: &AppConfig) -> Arc<dyn RemoteStore> {
    if config.remote.anon_key.is_empty() {
        warn!("No remote.anon_key configured, using in-memory remote store");
        return Arc::new(InMemoryRemoteStore::new());
    }

    let store = PostgrestRemoteStore::new(&config.remote);
    if let Ok(token) = env::var("FITLOG_ACCESS_TOKEN") {
        store.set_access_token(Some(SecretString::new(token))).await;
    }
    info!(url = %config.remote.url, "Using hosted remote store");
    Arc::new(store)
}
