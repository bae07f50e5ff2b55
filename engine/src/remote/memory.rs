//! In-process remote store
//!
//! Behaves like the hosted tables closely enough for reconciliation tests
//! and offline use: ids are assigned on insert, rows are scoped by
//! `user_id` and queries come back newest first. Failures and latency can be
//! injected per domain.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use fitlog_shared::timestamps::{format_timestamp, timestamp_from_value};
use serde_json::Value;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{row_id, NaturalKey, RemoteId, RemoteStore, Row, UserId};
use crate::domain::Domain;
use crate::error::RemoteError;

#[derive(Debug, Default)]
struct Tables {
    rows: HashMap<Domain, Vec<Row>>,
    failing: HashSet<Domain>,
    latency: HashMap<Domain, Duration>,
    inserts: usize,
}

#[derive(Debug, Default)]
pub struct InMemoryRemoteStore {
    tables: Mutex<Tables>,
}

impl InMemoryRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a row as-is, assigning an id when it has none
    pub async fn seed(&self, domain: Domain, mut row: Row) -> RemoteId {
        let id = match row_id(&row) {
            Ok(id) => id,
            Err(_) => {
                let id = Uuid::new_v4();
                row.insert("id".to_string(), Value::String(id.to_string()));
                id
            }
        };
        self.tables.lock().await.rows.entry(domain).or_default().push(row);
        id
    }

    /// Every row of a domain, in insertion order
    pub async fn rows(&self, domain: Domain) -> Vec<Row> {
        self.tables
            .lock()
            .await
            .rows
            .get(&domain)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of successful inserts across all domains
    pub async fn insert_count(&self) -> usize {
        self.tables.lock().await.inserts
    }

    /// Make every call touching `domain` fail with a 503
    pub async fn set_failing(&self, domain: Domain, failing: bool) {
        let mut tables = self.tables.lock().await;
        if failing {
            tables.failing.insert(domain);
        } else {
            tables.failing.remove(&domain);
        }
    }

    /// Delay every call touching `domain` by `latency`
    pub async fn set_latency(&self, domain: Domain, latency: Option<Duration>) {
        let mut tables = self.tables.lock().await;
        match latency {
            Some(latency) => tables.latency.insert(domain, latency),
            None => tables.latency.remove(&domain),
        };
    }

    async fn check(&self, domain: Domain) -> Result<(), RemoteError> {
        let (failing, latency) = {
            let tables = self.tables.lock().await;
            (tables.failing.contains(&domain), tables.latency.get(&domain).copied())
        };
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if failing {
            return Err(RemoteError::Status {
                status: 503,
                message: format!("{} unavailable", domain.table()),
            });
        }
        Ok(())
    }
}

fn owned_by(row: &Row, user_id: UserId) -> bool {
    row.get("user_id").and_then(Value::as_str) == Some(user_id.to_string().as_str())
}

/// Newest first; rows without a usable timestamp go last
fn newest_first(column: &str) -> impl Fn(&Row, &Row) -> Ordering + '_ {
    move |a: &Row, b: &Row| {
        let a = a.get(column).and_then(timestamp_from_value);
        let b = b.get(column).and_then(timestamp_from_value);
        match (a, b) {
            (Some(a), Some(b)) => b.cmp(&a),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }
}

#[async_trait]
impl RemoteStore for InMemoryRemoteStore {
    async fn query_by_user(&self, domain: Domain, user_id: UserId) -> Result<Vec<Row>, RemoteError> {
        self.check(domain).await?;
        let tables = self.tables.lock().await;
        let mut rows: Vec<Row> = tables
            .rows
            .get(&domain)
            .map(|rows| rows.iter().filter(|r| owned_by(r, user_id)).cloned().collect())
            .unwrap_or_default();
        rows.sort_by(newest_first(domain.order_column()));
        if domain == Domain::Goals {
            rows.truncate(1);
        }
        Ok(rows)
    }

    async fn insert(&self, domain: Domain, mut row: Row) -> Result<RemoteId, RemoteError> {
        self.check(domain).await?;
        let id = Uuid::new_v4();
        let now = Value::String(format_timestamp(&Utc::now()));
        row.insert("id".to_string(), Value::String(id.to_string()));
        row.entry("created_at").or_insert_with(|| now.clone());
        row.entry("updated_at").or_insert(now);

        let mut tables = self.tables.lock().await;
        tables.rows.entry(domain).or_default().push(row);
        tables.inserts += 1;
        Ok(id)
    }

    async fn find_by_natural_key(
        &self,
        domain: Domain,
        user_id: UserId,
        key: &NaturalKey,
    ) -> Result<Option<RemoteId>, RemoteError> {
        self.check(domain).await?;
        let tables = self.tables.lock().await;
        let found = tables
            .rows
            .get(&domain)
            .and_then(|rows| rows.iter().find(|r| owned_by(r, user_id) && key.matches(r)));
        found.map(row_id).transpose()
    }

    async fn delete(&self, domain: Domain, user_id: UserId, id: RemoteId) -> Result<(), RemoteError> {
        self.check(domain).await?;
        let id = id.to_string();
        let mut tables = self.tables.lock().await;
        if let Some(rows) = tables.rows.get_mut(&domain) {
            rows.retain(|r| {
                !(owned_by(r, user_id) && r.get("id").and_then(Value::as_str) == Some(id.as_str()))
            });
        }
        Ok(())
    }

    async fn upsert_singleton(
        &self,
        domain: Domain,
        user_id: UserId,
        row: Row,
    ) -> Result<RemoteId, RemoteError> {
        self.check(domain).await?;
        {
            let mut tables = self.tables.lock().await;
            if let Some(rows) = tables.rows.get_mut(&domain) {
                rows.retain(|r| !owned_by(r, user_id));
            }
        }
        self.insert(domain, row).await
    }
}
