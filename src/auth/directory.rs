//! Identity provider directory client
//!
//! The provider keeps its own user directory next to the OAuth surface.
//! Provisioning needs exactly two operations from it: look a user up by
//! email, and create one.

use std::sync::Arc;

use serde::Deserialize;

use crate::config::ProviderConfig;
use crate::error::AppError;

/// A user record in the provider's directory
#[derive(Debug, Clone, Deserialize)]
pub struct DirectoryUser {
    /// Provider-assigned user id
    pub uid: String,
    pub email: String,
}

/// HTTP client for the provider's directory API
pub struct DirectoryClient {
    http_client: Arc<reqwest::Client>,
    base_url: String,
    service_token: String,
}

impl DirectoryClient {
    /// Create a new directory client
    ///
    /// # Arguments
    /// * `config` - Provider configuration (directory URL + service credential)
    /// * `http_client` - Shared HTTP client
    pub fn new(config: &ProviderConfig, http_client: Arc<reqwest::Client>) -> Self {
        Self {
            http_client,
            base_url: config.directory_url.trim_end_matches('/').to_string(),
            service_token: config.directory_token.clone(),
        }
    }

    /// Look up a directory user by email
    ///
    /// # Returns
    /// `Ok(Some(user))` when the user exists, `Ok(None)` strictly for the
    /// provider's user-not-found condition.
    ///
    /// # Errors
    /// Any other provider response is an error; callers must not treat it
    /// as "user does not exist".
    pub async fn find_user(&self, email: &str) -> Result<Option<DirectoryUser>, AppError> {
        let url = format!("{}/users", self.base_url);
        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&self.service_token)
            .query(&[("email", email)])
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => {
                let user = response.json::<DirectoryUser>().await?;
                Ok(Some(user))
            }
            reqwest::StatusCode::NOT_FOUND => Ok(None),
            status => Err(AppError::Provider(format!(
                "directory lookup returned {}",
                status
            ))),
        }
    }

    /// Create a directory user
    ///
    /// # Arguments
    /// * `email` - Address to register
    /// * `password` - Placeholder credential; login is always via OAuth,
    ///   so this value is never surfaced to anyone
    pub async fn create_user(
        &self,
        email: &str,
        password: &str,
    ) -> Result<DirectoryUser, AppError> {
        let url = format!("{}/users", self.base_url);
        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.service_token)
            .json(&serde_json::json!({
                "email": email,
                "password": password,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::Provider(format!(
                "directory create returned {}",
                response.status()
            )));
        }

        let user = response.json::<DirectoryUser>().await?;
        Ok(user)
    }
}
