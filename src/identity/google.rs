use std::time::Duration;

use async_trait::async_trait;

use super::{IdentityError, IdentityProvider, Profile};
use crate::config::GoogleConfig;

pub struct GoogleProvider {
    client: reqwest::Client,
    userinfo_url: String,
}

impl GoogleProvider {
    pub fn new(config: &GoogleConfig) -> Result<Self, String> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| format!("Failed to build HTTP client: {e}"))?;

        Ok(Self {
            client,
            userinfo_url: config.userinfo_url.clone(),
        })
    }
}

#[async_trait]
impl IdentityProvider for GoogleProvider {
    async fn exchange(&self, token: &str) -> Result<Profile, IdentityError> {
        let response = self
            .client
            .get(&self.userinfo_url)
            .query(&[("access_token", token)])
            .send()
            .await
            .map_err(|e| IdentityError::Transport(format!("Google API request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IdentityError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<Profile>()
            .await
            .map_err(|e| IdentityError::Transport(format!("Invalid Google API response: {e}")))
    }
}
