//! Seams between the engine and the outside world.
//!
//! The engine never reaches for a global session: identity and persistence
//! are injected as trait objects so tests can swap in an in-memory server.

use async_trait::async_trait;
use chrono::NaiveDate;

use super::types::{AvailabilityId, AvailabilityRecord, UserId};
use crate::error::AvailabilityError;

/// Source of the acting user and the bearer token for backend calls.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// The signed-in user, if any.
    fn current_user(&self) -> Option<UserId>;

    /// A bearer token valid for the current user.
    async fn bearer_token(&self) -> Result<String, AvailabilityError>;
}

/// User-scoped availability collection on the backend.
#[async_trait]
pub trait AvailabilityBackend: Send + Sync {
    async fn list(&self, user: &UserId) -> Result<Vec<AvailabilityRecord>, AvailabilityError>;

    /// Create one row per date in a single request.
    ///
    /// The returned rows are informational and may be empty when the
    /// response body does not describe them.
    async fn bulk_create(
        &self,
        user: &UserId,
        dates: &[NaiveDate],
    ) -> Result<Vec<AvailabilityRecord>, AvailabilityError>;

    /// Delete one row. A row that is already gone is not an error.
    async fn delete(&self, user: &UserId, id: AvailabilityId) -> Result<(), AvailabilityError>;
}

/// Fixed user and token, e.g. from a session established elsewhere.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    user: Option<UserId>,
    token: Option<String>,
}

impl StaticCredentials {
    pub fn new(user: UserId, token: impl Into<String>) -> Self {
        Self {
            user: Some(user),
            token: Some(token.into()),
        }
    }

    /// No signed-in user.
    pub fn anonymous() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentials {
    fn current_user(&self) -> Option<UserId> {
        self.user.clone()
    }

    async fn bearer_token(&self) -> Result<String, AvailabilityError> {
        self.token.clone().ok_or(AvailabilityError::Unauthorized)
    }
}
