//! reqwest implementation of [`AvailabilityBackend`].
//!
//! Routes:
//! - `GET    {base}/users/{user}/availability/`
//! - `POST   {base}/users/{user}/availability/` with `[{"available_date": ..}]`
//! - `DELETE {base}/users/{user}/availability/{id}/`

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, Response, StatusCode};
use tracing::{debug, instrument, warn};
use url::Url;

use super::backend::{AvailabilityBackend, CredentialProvider};
use super::types::{AvailabilityId, AvailabilityRecord, AvailabilityRow, NewAvailability, UserId};
use crate::config::BackendConfig;
use crate::error::AvailabilityError;

/// Availability backend speaking JSON over HTTP with bearer auth.
pub struct HttpAvailabilityBackend {
    http_client: Client,
    base_url: Url,
    credentials: Arc<dyn CredentialProvider>,
}

impl HttpAvailabilityBackend {
    pub fn new(
        config: &BackendConfig,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Result<Self, AvailabilityError> {
        let base_url = config.parsed_base_url()?;
        if base_url.cannot_be_a_base() {
            return Err(AvailabilityError::Url(url::ParseError::RelativeUrlWithCannotBeABaseBase));
        }
        let http_client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self {
            http_client,
            base_url,
            credentials,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `{base}/users/{user}/availability/` plus optional trailing segments.
    fn collection_url(&self, user: &UserId, extra: &[&str]) -> Result<Url, AvailabilityError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| AvailabilityError::Url(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .extend(["users", user.as_str(), "availability"])
            .extend(extra)
            .push("");
        Ok(url)
    }

    fn item_url(&self, user: &UserId, id: AvailabilityId) -> Result<Url, AvailabilityError> {
        self.collection_url(user, &[&id.to_string()])
    }

    async fn token(&self) -> Result<String, AvailabilityError> {
        self.credentials.bearer_token().await
    }
}

/// Pass 2xx responses through; turn everything else into an error.
async fn check_status(response: Response) -> Result<Response, AvailabilityError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(AvailabilityError::from_status(status, body))
}

async fn decode_rows(response: Response) -> Result<Vec<AvailabilityRecord>, AvailabilityError> {
    let bytes = response.bytes().await?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }
    let rows: Vec<AvailabilityRow> = serde_json::from_slice(&bytes)?;
    Ok(rows.into_iter().map(AvailabilityRecord::from).collect())
}

#[async_trait]
impl AvailabilityBackend for HttpAvailabilityBackend {
    #[instrument(skip(self, user), fields(user = %user))]
    async fn list(&self, user: &UserId) -> Result<Vec<AvailabilityRecord>, AvailabilityError> {
        let url = self.collection_url(user, &[])?;
        let token = self.token().await?;
        let response = self
            .http_client
            .get(url)
            .bearer_auth(&token)
            .send()
            .await?;
        let records = decode_rows(check_status(response).await?).await?;
        debug!(count = records.len(), "listed availability");
        Ok(records)
    }

    #[instrument(skip(self, user, dates), fields(user = %user, count = dates.len()))]
    async fn bulk_create(
        &self,
        user: &UserId,
        dates: &[NaiveDate],
    ) -> Result<Vec<AvailabilityRecord>, AvailabilityError> {
        if dates.is_empty() {
            return Ok(Vec::new());
        }
        let url = self.collection_url(user, &[])?;
        let token = self.token().await?;
        let body: Vec<NewAvailability> = dates
            .iter()
            .map(|&available_date| NewAvailability { available_date })
            .collect();
        let response = self
            .http_client
            .post(url)
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await?;
        match decode_rows(check_status(response).await?).await {
            // The write went through; callers re-fetch the list anyway.
            Err(AvailabilityError::Decode(err)) => {
                warn!(error = %err, "unexpected bulk-create response body");
                Ok(Vec::new())
            }
            decoded => decoded,
        }
    }

    #[instrument(skip(self, user), fields(user = %user))]
    async fn delete(&self, user: &UserId, id: AvailabilityId) -> Result<(), AvailabilityError> {
        let url = self.item_url(user, id)?;
        let token = self.token().await?;
        let response = self
            .http_client
            .delete(url)
            .bearer_auth(&token)
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!(%id, "availability already deleted");
            return Ok(());
        }
        check_status(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::availability::backend::StaticCredentials;

    fn backend(base_url: &str) -> HttpAvailabilityBackend {
        let config = BackendConfig {
            base_url: base_url.to_string(),
            ..BackendConfig::default()
        };
        let creds = Arc::new(StaticCredentials::new(UserId::new("42"), "token"));
        HttpAvailabilityBackend::new(&config, creds).unwrap()
    }

    #[test]
    fn collection_url_keeps_base_path() {
        let backend = backend("http://localhost:8000/api");
        let url = backend.collection_url(&UserId::new("42"), &[]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/api/users/42/availability/");
    }

    #[test]
    fn trailing_slash_on_base_is_tolerated() {
        let backend = backend("http://localhost:8000/api/");
        let url = backend.item_url(&UserId::new("42"), AvailabilityId(101)).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8000/api/users/42/availability/101/"
        );
    }

    #[test]
    fn user_id_is_percent_encoded() {
        let backend = backend("http://localhost:8000");
        let url = backend.collection_url(&UserId::new("a/b"), &[]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/users/a%2Fb/availability/");
    }

    #[test]
    fn rejects_non_base_url() {
        let config = BackendConfig {
            base_url: "mailto:someone@example.com".to_string(),
            ..BackendConfig::default()
        };
        let creds = Arc::new(StaticCredentials::anonymous());
        assert!(matches!(
            HttpAvailabilityBackend::new(&config, creds),
            Err(AvailabilityError::Url(_))
        ));
    }
}
