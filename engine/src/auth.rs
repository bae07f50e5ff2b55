//! Authentication interface
//!
//! Token management belongs to the host application. The engine only needs
//! to know who is signed in and how to end the remote session.

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::info;

use crate::error::RemoteError;
use crate::remote::UserId;

/// Session lifecycle notifications delivered by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    /// A new account was created and is now signed in
    SignedUp(UserId),
    SignedIn(UserId),
    SignedOut(UserId),
}

#[async_trait]
pub trait AuthService: Send + Sync {
    async fn current_user_id(&self) -> Option<UserId>;

    /// End the remote session
    async fn sign_out(&self) -> Result<(), RemoteError>;
}

/// Auth service holding the signed-in user in memory
#[derive(Debug, Default)]
pub struct SessionAuth {
    user: RwLock<Option<UserId>>,
}

impl SessionAuth {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signed_in(user_id: UserId) -> Self {
        Self {
            user: RwLock::new(Some(user_id)),
        }
    }

    pub async fn sign_in(&self, user_id: UserId) -> AuthEvent {
        *self.user.write().await = Some(user_id);
        info!(user_id = %user_id, "User signed in");
        AuthEvent::SignedIn(user_id)
    }

    pub async fn sign_up(&self, user_id: UserId) -> AuthEvent {
        *self.user.write().await = Some(user_id);
        info!(user_id = %user_id, "User signed up");
        AuthEvent::SignedUp(user_id)
    }
}

#[async_trait]
impl AuthService for SessionAuth {
    async fn current_user_id(&self) -> Option<UserId> {
        *self.user.read().await
    }

    async fn sign_out(&self) -> Result<(), RemoteError> {
        let previous = self.user.write().await.take();
        match previous {
            Some(user_id) => {
                info!(user_id = %user_id, "User signed out");
                Ok(())
            }
            None => Err(RemoteError::NotAuthenticated),
        }
    }
}
