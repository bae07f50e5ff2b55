//! Remote reconciliation
//!
//! Pulls replace local state wholesale; uploads are guarded by a natural-key
//! existence check so repeating one never creates a second remote row.
//! Every remote call is bounded by the configured timeout and retried with
//! backoff. Failures are logged, counted and recorded in the sync status;
//! local state is never rolled back because of them.

use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::Duration;

use fitlog_shared::{BodyStats, CustomWorkoutPlan, Meal, NutritionGoals, WaterLog, WorkoutSession};
use metrics::counter;
use tracing::{debug, info, warn};

use super::queue::SyncTask;
use super::retry::RetryConfig;
use super::status::{StatusTracker, SyncActivity, UploadOutcome};
use crate::config::SyncConfig;
use crate::domain::Domain;
use crate::error::RemoteError;
use crate::remote::records::{goals_from_row, goals_to_row};
use crate::remote::{NaturalKey, RemoteId, RemoteRecord, RemoteStore, Row, UserId};
use crate::store::{LocalStore, SharedStore};

/// Result of a sign-in pull
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PullReport {
    pub replaced: Vec<(Domain, usize)>,
    pub failed: Vec<(Domain, String)>,
}

impl PullReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    fn record(&mut self, domain: Domain, result: Result<usize, RemoteError>) {
        match result {
            Ok(count) => self.replaced.push((domain, count)),
            Err(e) => self.failed.push((domain, e.to_string())),
        }
    }
}

/// Result of pushing every local record
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushReport {
    pub uploaded: usize,
    pub duplicates: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl PushReport {
    fn add(&mut self, outcome: UploadOutcome) {
        match outcome {
            UploadOutcome::Uploaded => self.uploaded += 1,
            UploadOutcome::Duplicate => self.duplicates += 1,
            UploadOutcome::Skipped => self.skipped += 1,
            UploadOutcome::Failed => self.failed += 1,
        }
    }

    fn merge(&mut self, other: PushReport) {
        self.uploaded += other.uploaded;
        self.duplicates += other.duplicates;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }
}

/// Whether an upload came through the queue (already counted as pending)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Queued,
    Direct,
}

pub struct Reconciler {
    store: SharedStore,
    remote: Arc<dyn RemoteStore>,
    status: StatusTracker,
    retry: RetryConfig,
    timeout: Duration,
}

impl Reconciler {
    pub fn new(store: SharedStore, remote: Arc<dyn RemoteStore>, config: &SyncConfig) -> Self {
        Self {
            store,
            remote,
            status: StatusTracker::new(),
            retry: config.retry.clone(),
            timeout: config.remote_timeout(),
        }
    }

    pub fn status(&self) -> &StatusTracker {
        &self.status
    }

    // ========================================================================
    // Pull
    // ========================================================================

    /// Clear the local store, then pull every domain concurrently.
    ///
    /// A domain that fails is left empty; the others still replace their
    /// local lists.
    pub async fn pull_all(&self, user_id: UserId) -> PullReport {
        info!(user_id = %user_id, "Starting full pull");
        self.status.mark_activity(SyncActivity::Pulling);
        self.store.lock().await.clear();

        let (sessions, body_stats, meals, water_logs, goals, plans) = tokio::join!(
            self.pull_domain::<WorkoutSession>(user_id, LocalStore::replace_sessions),
            self.pull_domain::<BodyStats>(user_id, LocalStore::replace_body_stats),
            self.pull_domain::<Meal>(user_id, LocalStore::replace_meals),
            self.pull_domain::<WaterLog>(user_id, LocalStore::replace_water_logs),
            self.pull_goals(user_id),
            self.pull_domain::<CustomWorkoutPlan>(user_id, LocalStore::replace_plans),
        );

        let mut report = PullReport::default();
        report.record(Domain::WorkoutSessions, sessions);
        report.record(Domain::BodyStats, body_stats);
        report.record(Domain::Meals, meals);
        report.record(Domain::WaterLogs, water_logs);
        report.record(Domain::Goals, goals);
        report.record(Domain::CustomPlans, plans);

        self.status.mark_activity(SyncActivity::Idle);
        info!(
            user_id = %user_id,
            replaced = report.replaced.len(),
            failed = report.failed.len(),
            "Full pull finished"
        );
        report
    }

    async fn pull_domain<T: RemoteRecord>(
        &self,
        user_id: UserId,
        replace: fn(&mut LocalStore, Vec<T>),
    ) -> Result<usize, RemoteError> {
        let domain = T::DOMAIN;
        self.status.mark_pull_started(domain);

        let rows = match self.call(|| self.remote.query_by_user(domain, user_id)).await {
            Ok(rows) => rows,
            Err(e) => return Err(self.pull_failed(domain, e)),
        };

        let records = decode_rows::<T>(&rows);
        let count = records.len();
        self.status.mark_pull_succeeded(domain, count);

        replace(&mut *self.store.lock().await, records);
        self.status.mark_store_replaced(domain, count);
        pulled(domain, "success");
        info!(domain = %domain, records = count, "Replaced local records");
        Ok(count)
    }

    /// Newest goals row wins; with no usable row the defaults stay
    async fn pull_goals(&self, user_id: UserId) -> Result<usize, RemoteError> {
        let domain = Domain::Goals;
        self.status.mark_pull_started(domain);

        let rows = match self.call(|| self.remote.query_by_user(domain, user_id)).await {
            Ok(rows) => rows,
            Err(e) => return Err(self.pull_failed(domain, e)),
        };

        let goals = rows.first().and_then(|row| match goals_from_row(row) {
            Ok(goals) => Some(goals),
            Err(e) => {
                warn!(error = %e, "Skipping undecodable goals row");
                None
            }
        });
        let count = usize::from(goals.is_some());
        self.status.mark_pull_succeeded(domain, count);

        if let Some(goals) = goals {
            self.store.lock().await.replace_goals(goals);
        }
        self.status.mark_store_replaced(domain, count);
        pulled(domain, "success");
        Ok(count)
    }

    fn pull_failed(&self, domain: Domain, error: RemoteError) -> RemoteError {
        warn!(domain = %domain, error = %error, "Pull failed, local state left unchanged");
        self.status.mark_pull_failed(domain, error.to_string());
        pulled(domain, "failure");
        error
    }

    // ========================================================================
    // Upload
    // ========================================================================

    /// Run one queued task
    pub async fn execute(&self, user_id: UserId, task: SyncTask) -> UploadOutcome {
        let domain = task.domain();
        let result = match &task {
            SyncTask::UploadSession(record) => self.upload(user_id, record).await,
            SyncTask::UploadBodyStats(record) => self.upload(user_id, record).await,
            SyncTask::UploadMeal(record) => self.upload(user_id, record).await,
            SyncTask::UploadWaterLog(record) => self.upload(user_id, record).await,
            SyncTask::UploadPlan(record) => self.upload(user_id, record).await,
            SyncTask::UploadGoals(goals) => self.upload_goals(user_id, goals).await,
            SyncTask::DeletePlan(remote_id) => self.delete_plan(user_id, *remote_id).await,
        };
        self.finish(domain, result, Origin::Queued)
    }

    /// Mirror one record unless a row with the same natural key exists.
    ///
    /// The existence check runs on every upload, also for records that
    /// already carry a remote id, so a row deleted remotely is recreated.
    /// Check and insert are retried together: an insert that timed out may
    /// still have committed, and the next attempt finds it instead of
    /// inserting a second row.
    pub async fn upload<T: RemoteRecord>(
        &self,
        user_id: UserId,
        record: &T,
    ) -> Result<UploadOutcome, RemoteError> {
        let domain = T::DOMAIN;

        let (key, row) = match record.natural_key().and_then(|key| Ok((key, record.to_row(user_id)?))) {
            Ok(prepared) => prepared,
            Err(RemoteError::MissingField(field)) => {
                warn!(domain = %domain, id = record.local_id(), field, "Record not uploadable, skipping");
                return Ok(UploadOutcome::Skipped);
            }
            Err(e) => return Err(e),
        };

        let insert_sent = AtomicBool::new(false);
        let (remote_id, inserted) = self
            .call(|| self.find_or_insert(domain, user_id, &key, &row, &insert_sent))
            .await?;
        self.attach(domain, record.local_id(), remote_id).await;

        if inserted {
            debug!(domain = %domain, id = record.local_id(), remote_id = %remote_id, "Uploaded record");
            Ok(UploadOutcome::Uploaded)
        } else {
            debug!(domain = %domain, id = record.local_id(), "Already uploaded, skipping");
            Ok(UploadOutcome::Duplicate)
        }
    }

    /// One attempt of check-then-insert. The flag is true when the row was
    /// inserted by this upload, including by an earlier attempt.
    async fn find_or_insert(
        &self,
        domain: Domain,
        user_id: UserId,
        key: &NaturalKey,
        row: &Row,
        insert_sent: &AtomicBool,
    ) -> Result<(RemoteId, bool), RemoteError> {
        if let Some(remote_id) = self.remote.find_by_natural_key(domain, user_id, key).await? {
            return Ok((remote_id, insert_sent.load(AtomicOrdering::SeqCst)));
        }
        insert_sent.store(true, AtomicOrdering::SeqCst);
        let remote_id = self.remote.insert(domain, row.clone()).await?;
        Ok((remote_id, true))
    }

    /// Set up a new account: clear local state and make the default goals
    /// the account's remote goals row
    pub async fn register(&self, user_id: UserId) -> UploadOutcome {
        info!(user_id = %user_id, "Initializing new account");
        let goals = {
            let mut store = self.store.lock().await;
            store.clear();
            store.goals()
        };
        let result = self.upload_goals(user_id, &goals).await;
        self.finish(Domain::Goals, result, Origin::Direct)
    }

    /// Replace the remote goals row
    pub async fn upload_goals(
        &self,
        user_id: UserId,
        goals: &NutritionGoals,
    ) -> Result<UploadOutcome, RemoteError> {
        let row: Row = goals_to_row(goals, user_id);
        self.call(|| self.remote.upsert_singleton(Domain::Goals, user_id, row.clone()))
            .await?;
        Ok(UploadOutcome::Uploaded)
    }

    pub async fn delete_plan(
        &self,
        user_id: UserId,
        remote_id: RemoteId,
    ) -> Result<UploadOutcome, RemoteError> {
        self.call(|| self.remote.delete(Domain::CustomPlans, user_id, remote_id))
            .await?;
        info!(remote_id = %remote_id, "Deleted remote plan");
        Ok(UploadOutcome::Uploaded)
    }

    /// Upload every local record. Domains run concurrently, records within a
    /// domain in log order.
    pub async fn push_all(&self, user_id: UserId) -> PushReport {
        info!(user_id = %user_id, "Starting full upload");
        self.status.mark_activity(SyncActivity::Pushing);
        let snapshot = self.store.lock().await.snapshot();

        let (sessions, body_stats, meals, water_logs, goals, plans) = tokio::join!(
            self.push_records(user_id, &snapshot.sessions),
            self.push_records(user_id, &snapshot.body_stats),
            self.push_records(user_id, &snapshot.meals),
            self.push_records(user_id, &snapshot.water_logs),
            async {
                let result = self.upload_goals(user_id, &snapshot.goals).await;
                let mut report = PushReport::default();
                report.add(self.finish(Domain::Goals, result, Origin::Direct));
                report
            },
            self.push_records(user_id, &snapshot.plans),
        );

        let mut report = PushReport::default();
        for part in [sessions, body_stats, meals, water_logs, goals, plans] {
            report.merge(part);
        }

        self.status.mark_activity(SyncActivity::Idle);
        info!(
            user_id = %user_id,
            uploaded = report.uploaded,
            duplicates = report.duplicates,
            skipped = report.skipped,
            failed = report.failed,
            "Full upload finished"
        );
        report
    }

    async fn push_records<T: RemoteRecord>(&self, user_id: UserId, records: &[T]) -> PushReport {
        let mut report = PushReport::default();
        for record in records {
            let result = self.upload(user_id, record).await;
            report.add(self.finish(T::DOMAIN, result, Origin::Direct));
        }
        report
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    async fn call<T, F, Fut>(&self, func: F) -> Result<T, RemoteError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, RemoteError>>,
    {
        self.retry.execute(self.timeout, func).await
    }

    async fn attach(&self, domain: Domain, local_id: &str, remote_id: RemoteId) {
        if !self
            .store
            .lock()
            .await
            .attach_remote_id(domain, local_id, remote_id)
        {
            debug!(domain = %domain, id = local_id, "Local record gone before upload finished");
        }
    }

    fn finish(
        &self,
        domain: Domain,
        result: Result<UploadOutcome, RemoteError>,
        origin: Origin,
    ) -> UploadOutcome {
        let (outcome, error) = match result {
            Ok(outcome) => (outcome, None),
            Err(e) => {
                warn!(domain = %domain, error = %e, "Upload failed");
                (UploadOutcome::Failed, Some(e.to_string()))
            }
        };

        counter!(
            "fitlog_sync_uploads_total",
            "domain" => domain.as_str(),
            "outcome" => outcome.as_str()
        )
        .increment(1);

        match origin {
            Origin::Queued => self.status.mark_upload_finished(domain, outcome, error),
            Origin::Direct => self.status.record_upload(domain, outcome, error),
        }
        outcome
    }
}

fn pulled(domain: Domain, outcome: &'static str) {
    counter!(
        "fitlog_sync_pulls_total",
        "domain" => domain.as_str(),
        "outcome" => outcome
    )
    .increment(1);
}

/// Remote rows arrive newest first; local logs are kept oldest first.
/// Rows that cannot be decoded are skipped.
fn decode_rows<T: RemoteRecord>(rows: &[Row]) -> Vec<T> {
    rows.iter()
        .rev()
        .filter_map(|row| match T::from_row(row) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(domain = %T::DOMAIN, error = %e, "Skipping undecodable remote row");
                None
            }
        })
        .collect()
}
