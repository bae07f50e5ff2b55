//! Reconciliation between the local store and the remote tables

pub mod queue;
pub mod reconciler;
pub mod retry;
pub mod status;

pub use queue::{SyncQueue, SyncTask, SyncWorker};
pub use reconciler::{PullReport, PushReport, Reconciler};
pub use retry::RetryConfig;
pub use status::{DomainPull, PullPhase, StatusTracker, SyncActivity, SyncStatus, UploadOutcome};
