//! Background upload queue
//!
//! Local mutations enqueue a task and return immediately. A single worker
//! drains the queue in order, so uploads for one domain reach the remote in
//! the order they were logged.

use std::sync::Arc;

use fitlog_shared::{BodyStats, CustomWorkoutPlan, Meal, NutritionGoals, WaterLog, WorkoutSession};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::reconciler::Reconciler;
use super::status::StatusTracker;
use crate::domain::Domain;
use crate::remote::{RemoteId, UserId};

/// One pending remote write
#[derive(Debug, Clone)]
pub enum SyncTask {
    UploadSession(WorkoutSession),
    UploadBodyStats(BodyStats),
    UploadMeal(Meal),
    UploadWaterLog(WaterLog),
    UploadPlan(CustomWorkoutPlan),
    UploadGoals(NutritionGoals),
    DeletePlan(RemoteId),
}

impl SyncTask {
    pub fn domain(&self) -> Domain {
        match self {
            SyncTask::UploadSession(_) => Domain::WorkoutSessions,
            SyncTask::UploadBodyStats(_) => Domain::BodyStats,
            SyncTask::UploadMeal(_) => Domain::Meals,
            SyncTask::UploadWaterLog(_) => Domain::WaterLogs,
            SyncTask::UploadGoals(_) => Domain::Goals,
            SyncTask::UploadPlan(_) | SyncTask::DeletePlan(_) => Domain::CustomPlans,
        }
    }
}

enum Message {
    Task { user_id: UserId, task: SyncTask },
    Flush(oneshot::Sender<()>),
}

/// Sending half, held by the tracker
#[derive(Clone)]
pub struct SyncQueue {
    tx: mpsc::UnboundedSender<Message>,
    status: StatusTracker,
}

impl SyncQueue {
    /// Returns false when the worker has stopped and the task was dropped
    pub fn enqueue(&self, user_id: UserId, task: SyncTask) -> bool {
        let domain = task.domain();
        self.status.mark_upload_queued();
        if self.tx.send(Message::Task { user_id, task }).is_err() {
            warn!(domain = %domain, "Sync worker stopped, upload dropped");
            self.status.mark_uploads_abandoned(1);
            return false;
        }
        debug!(domain = %domain, "Queued upload");
        true
    }

    /// Wait until every task queued before this call has finished
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(Message::Flush(done_tx)).is_ok() {
            let _ = done_rx.await;
        }
    }
}

pub struct SyncWorker {
    rx: mpsc::UnboundedReceiver<Message>,
    reconciler: Arc<Reconciler>,
}

impl SyncWorker {
    /// Start the worker on the current runtime. It stops once every
    /// `SyncQueue` clone has been dropped.
    pub fn spawn(reconciler: Arc<Reconciler>) -> (SyncQueue, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let queue = SyncQueue {
            tx,
            status: reconciler.status().clone(),
        };
        let worker = SyncWorker { rx, reconciler };
        (queue, tokio::spawn(worker.run()))
    }

    async fn run(mut self) {
        while let Some(message) = self.rx.recv().await {
            match message {
                Message::Task { user_id, task } => {
                    self.reconciler.execute(user_id, task).await;
                }
                Message::Flush(done) => {
                    let _ = done.send(());
                }
            }
        }
        info!("Sync worker stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SyncConfig;
    use crate::remote::InMemoryRemoteStore;
    use crate::store::{LocalStore, MemoryStorage};
    use crate::sync::retry::RetryConfig;
    use fitlog_shared::NewWaterLog;
    use uuid::Uuid;

    fn reconciler(remote: Arc<InMemoryRemoteStore>) -> (Arc<Reconciler>, crate::store::SharedStore) {
        let store = LocalStore::open(Arc::new(MemoryStorage::new()), 8.0).into_shared();
        let config = SyncConfig {
            remote_timeout_secs: 1,
            retry: RetryConfig::default(),
        };
        (Arc::new(Reconciler::new(store.clone(), remote, &config)), store)
    }

    #[tokio::test]
    async fn test_queued_uploads_run_in_order() {
        let remote = Arc::new(InMemoryRemoteStore::new());
        let (reconciler, store) = reconciler(remote.clone());
        let (queue, _handle) = SyncWorker::spawn(reconciler.clone());
        let user = Uuid::new_v4();

        for amount in [100, 200, 300] {
            let log = store.lock().await.add_water_log(NewWaterLog {
                amount_ml: amount,
                logged_at: None,
            });
            assert!(queue.enqueue(user, SyncTask::UploadWaterLog(log)));
        }
        queue.flush().await;

        let amounts: Vec<u64> = remote
            .rows(Domain::WaterLogs)
            .await
            .iter()
            .filter_map(|row| row.get("amount").and_then(|v| v.as_u64()))
            .collect();
        assert_eq!(amounts, vec![100, 200, 300]);

        let status = reconciler.status().snapshot();
        assert_eq!(status.pending_uploads, 0);
        assert_eq!(status.uploaded, 3);
    }

    #[test]
    fn test_task_domains() {
        assert_eq!(SyncTask::DeletePlan(Uuid::nil()).domain(), Domain::CustomPlans);
        assert_eq!(
            SyncTask::UploadGoals(NutritionGoals::default()).domain(),
            Domain::Goals
        );
    }
}
