//! OAuth credentials for the Drive API.

use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// An authorized-user credentials file (`token.json`) as written by
/// Google's OAuth client libraries.
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    /// Last access token, possibly expired.
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

impl Credentials {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::Credentials(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let credentials: Credentials = serde_json::from_str(text)?;
        if credentials.token.is_none() && credentials.refresh_token.is_none() {
            return Err(Error::Credentials(
                "neither an access token nor a refresh token is present".into(),
            ));
        }
        Ok(credentials)
    }

    fn can_refresh(&self) -> bool {
        self.refresh_token.is_some() && self.client_id.is_some() && self.client_secret.is_some()
    }

    /// Obtain an access token, refreshing it when a refresh token is
    /// available and falling back to the stored token otherwise.
    pub fn access_token(&self, client: &reqwest::blocking::Client) -> Result<String> {
        if !self.can_refresh() {
            return self
                .token
                .clone()
                .ok_or_else(|| Error::Credentials("refresh token incomplete".into()));
        }

        debug!(token_uri = %self.token_uri, "refreshing access token");
        let params = [
            ("client_id", self.client_id.as_deref().unwrap_or_default()),
            ("client_secret", self.client_secret.as_deref().unwrap_or_default()),
            ("refresh_token", self.refresh_token.as_deref().unwrap_or_default()),
            ("grant_type", "refresh_token"),
        ];
        let response = client.post(&self.token_uri).form(&params).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Api {
                status: status.as_u16(),
                body: response.text().unwrap_or_default(),
            });
        }
        let token: TokenResponse = response.json()?;
        Ok(token.access_token)
    }
}
