//! Remote store backed by a PostgREST endpoint (`{url}/rest/v1/{table}`)
//!
//! Requests carry the project's anon key as `apikey` and, once a user is
//! signed in, their access token as the bearer token.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

use super::{row_id, NaturalKey, RemoteId, RemoteStore, Row, UserId};
use crate::config::RemoteConfig;
use crate::domain::Domain;
use crate::error::RemoteError;

pub struct PostgrestRemoteStore {
    client: Client,
    url: String,
    anon_key: String,
    access_token: RwLock<Option<SecretString>>,
}

impl PostgrestRemoteStore {
    pub fn new(config: &RemoteConfig) -> Self {
        Self::with_client(config, Client::new())
    }

    pub fn with_client(config: &RemoteConfig, client: Client) -> Self {
        Self {
            client,
            url: config.url.trim_end_matches('/').to_string(),
            anon_key: config.anon_key.clone(),
            access_token: RwLock::new(None),
        }
    }

    /// Use a signed-in user's token; `None` falls back to the anon key
    pub async fn set_access_token(&self, token: Option<SecretString>) {
        *self.access_token.write().await = token;
    }

    fn table_url(&self, domain: Domain) -> String {
        format!("{}/rest/v1/{}", self.url, domain.table())
    }

    async fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        let token = self.access_token.read().await;
        let bearer = match token.as_ref() {
            Some(token) => token.expose_secret().to_string(),
            None => self.anon_key.clone(),
        };
        request
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, RemoteError> {
        let response = self.authorized(request).await.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(RemoteError::Status {
            status: status.as_u16(),
            message,
        })
    }

    async fn rows(response: Response) -> Result<Vec<Row>, RemoteError> {
        response
            .json::<Vec<Row>>()
            .await
            .map_err(|e| RemoteError::Decode(e.to_string()))
    }
}

/// `eq.` filter value as PostgREST expects it in the query string
fn filter_value(value: &Value) -> String {
    match value {
        Value::String(s) => format!("eq.{}", s),
        Value::Null => "is.null".to_string(),
        other => format!("eq.{}", other),
    }
}

#[async_trait]
impl RemoteStore for PostgrestRemoteStore {
    async fn query_by_user(&self, domain: Domain, user_id: UserId) -> Result<Vec<Row>, RemoteError> {
        let mut params = vec![
            ("select".to_string(), "*".to_string()),
            ("user_id".to_string(), format!("eq.{}", user_id)),
            ("order".to_string(), format!("{}.desc", domain.order_column())),
        ];
        if domain == Domain::Goals {
            params.push(("limit".to_string(), "1".to_string()));
        }

        let request = self.client.get(self.table_url(domain)).query(&params);
        let rows = Self::rows(self.send(request).await?).await?;
        debug!(table = domain.table(), rows = rows.len(), "Queried remote rows");
        Ok(rows)
    }

    async fn insert(&self, domain: Domain, row: Row) -> Result<RemoteId, RemoteError> {
        let request = self
            .client
            .post(self.table_url(domain))
            .header("Prefer", "return=representation")
            .json(&row);
        let rows = Self::rows(self.send(request).await?).await?;
        let inserted = rows.first().ok_or(RemoteError::MissingField("id"))?;
        row_id(inserted)
    }

    async fn find_by_natural_key(
        &self,
        domain: Domain,
        user_id: UserId,
        key: &NaturalKey,
    ) -> Result<Option<RemoteId>, RemoteError> {
        let mut params = vec![
            ("select".to_string(), "id".to_string()),
            ("user_id".to_string(), format!("eq.{}", user_id)),
        ];
        params.extend(
            key.columns()
                .iter()
                .map(|(column, value)| (column.to_string(), filter_value(value))),
        );
        params.push(("limit".to_string(), "1".to_string()));

        let request = self.client.get(self.table_url(domain)).query(&params);
        let rows = Self::rows(self.send(request).await?).await?;
        rows.first().map(row_id).transpose()
    }

    async fn delete(&self, domain: Domain, user_id: UserId, id: RemoteId) -> Result<(), RemoteError> {
        let params = [
            ("user_id", format!("eq.{}", user_id)),
            ("id", format!("eq.{}", id)),
        ];
        let request = self.client.delete(self.table_url(domain)).query(&params);
        self.send(request).await?;
        Ok(())
    }

    async fn upsert_singleton(
        &self,
        domain: Domain,
        user_id: UserId,
        row: Row,
    ) -> Result<RemoteId, RemoteError> {
        let request = self
            .client
            .delete(self.table_url(domain))
            .query(&[("user_id", format!("eq.{}", user_id))]);
        self.send(request).await?;
        self.insert(domain, row).await
    }
}
