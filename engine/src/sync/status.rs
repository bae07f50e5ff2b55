//! Last known synchronization status
//!
//! Updated by the reconciler as a pull or upload progresses and observable
//! by the host through a `watch` channel.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;

use crate::domain::Domain;

/// Where a domain is in the sign-in pull
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PullPhase {
    Idle,
    PullStarted,
    PullSucceeded,
    LocalStoreReplaced,
    /// Local state for the domain was left unchanged
    PullFailed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DomainPull {
    pub phase: PullPhase,
    pub records: usize,
    pub error: Option<String>,
}

impl Default for DomainPull {
    fn default() -> Self {
        Self {
            phase: PullPhase::Idle,
            records: 0,
            error: None,
        }
    }
}

/// What the engine is doing right now
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncActivity {
    Idle,
    Pulling,
    Pushing,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncStatus {
    pub activity: SyncActivity,
    pub domains: BTreeMap<Domain, DomainPull>,
    /// Upload tasks queued but not finished
    pub pending_uploads: usize,
    pub uploaded: u64,
    pub skipped: u64,
    pub failed_uploads: u64,
    pub last_error: Option<String>,
    pub last_pull_at: Option<DateTime<Utc>>,
}

impl Default for SyncStatus {
    fn default() -> Self {
        Self {
            activity: SyncActivity::Idle,
            domains: Domain::ALL.iter().map(|d| (*d, DomainPull::default())).collect(),
            pending_uploads: 0,
            uploaded: 0,
            skipped: 0,
            failed_uploads: 0,
            last_error: None,
            last_pull_at: None,
        }
    }
}

impl SyncStatus {
    pub fn domain(&self, domain: Domain) -> DomainPull {
        self.domains.get(&domain).cloned().unwrap_or_default()
    }
}

/// How a single upload ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadOutcome {
    Uploaded,
    /// Already present remotely
    Duplicate,
    /// Not uploadable (e.g. no timestamp)
    Skipped,
    Failed,
}

impl UploadOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadOutcome::Uploaded => "uploaded",
            UploadOutcome::Duplicate => "duplicate",
            UploadOutcome::Skipped => "skipped",
            UploadOutcome::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct StatusTracker {
    tx: Arc<watch::Sender<SyncStatus>>,
}

impl Default for StatusTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusTracker {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(SyncStatus::default());
        Self { tx: Arc::new(tx) }
    }

    pub fn snapshot(&self) -> SyncStatus {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.tx.subscribe()
    }

    pub fn mark_activity(&self, activity: SyncActivity) {
        self.tx.send_modify(|s| s.activity = activity);
    }

    pub fn mark_pull_started(&self, domain: Domain) {
        self.set_domain(domain, PullPhase::PullStarted, 0, None);
    }

    pub fn mark_pull_succeeded(&self, domain: Domain, records: usize) {
        self.set_domain(domain, PullPhase::PullSucceeded, records, None);
    }

    pub fn mark_store_replaced(&self, domain: Domain, records: usize) {
        self.tx.send_modify(|s| {
            s.domains.insert(
                domain,
                DomainPull {
                    phase: PullPhase::LocalStoreReplaced,
                    records,
                    error: None,
                },
            );
            s.last_pull_at = Some(Utc::now());
        });
    }

    pub fn mark_pull_failed(&self, domain: Domain, error: String) {
        self.tx.send_modify(|s| {
            s.last_error = Some(format!("{}: {}", domain, error));
            s.domains.insert(
                domain,
                DomainPull {
                    phase: PullPhase::PullFailed,
                    records: 0,
                    error: Some(error),
                },
            );
        });
    }

    pub fn mark_upload_queued(&self) {
        self.tx.send_modify(|s| s.pending_uploads += 1);
    }

    /// Drop queued uploads that will never run
    pub fn mark_uploads_abandoned(&self, count: usize) {
        self.tx
            .send_modify(|s| s.pending_uploads = s.pending_uploads.saturating_sub(count));
    }

    pub fn mark_upload_finished(&self, domain: Domain, outcome: UploadOutcome, error: Option<String>) {
        self.tx.send_modify(|s| {
            s.pending_uploads = s.pending_uploads.saturating_sub(1);
            match outcome {
                UploadOutcome::Uploaded => s.uploaded += 1,
                UploadOutcome::Duplicate | UploadOutcome::Skipped => s.skipped += 1,
                UploadOutcome::Failed => s.failed_uploads += 1,
            }
            if let Some(error) = error {
                s.last_error = Some(format!("{}: {}", domain, error));
            }
        });
    }

    /// Record an upload that was not queued (sign-out push)
    pub fn record_upload(&self, domain: Domain, outcome: UploadOutcome, error: Option<String>) {
        self.tx.send_modify(|s| s.pending_uploads += 1);
        self.mark_upload_finished(domain, outcome, error);
    }

    fn set_domain(&self, domain: Domain, phase: PullPhase, records: usize, error: Option<String>) {
        self.tx.send_modify(|s| {
            s.domains.insert(domain, DomainPull { phase, records, error });
        });
    }
}
