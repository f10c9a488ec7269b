use std::fmt;

use engine_logging::{engine_debug, redact};
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;

use crate::fetch::{build_client, map_reqwest_error, read_body, FetchSettings};
use crate::{FailureKind, HarvestError, Stage};

pub const DEFAULT_AUTHORITY: &str = "https://login.microsoftonline.com";
pub const DEFENDER_SCOPE: &str = "https://securitycenter.microsoft.com/mtp/.default";

/// Source of the bearer token sent to the harvest source.
#[async_trait::async_trait]
pub trait TokenSource: Send + Sync {
    async fn bearer_token(&self) -> Result<String, HarvestError>;
}

/// A token supplied by the operator.
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StaticToken").field(&redact(&self.0)).finish()
    }
}

#[async_trait::async_trait]
impl TokenSource for StaticToken {
    async fn bearer_token(&self) -> Result<String, HarvestError> {
        if self.0.trim().is_empty() {
            return Err(HarvestError::new(
                Stage::Authenticating,
                FailureKind::Authentication,
                "access token is empty",
            ));
        }
        Ok(self.0.trim().to_string())
    }
}

/// OAuth2 client-credentials grant against the identity provider.
pub struct ClientCredentials {
    tenant_id: String,
    client_id: String,
    client_secret: String,
    authority: String,
    scope: String,
    max_bytes: u64,
    client: reqwest::Client,
}

impl fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &redact(&self.client_secret))
            .field("authority", &self.authority)
            .field("scope", &self.scope)
            .finish()
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct TokenErrorResponse {
    error: Option<String>,
    error_description: Option<String>,
}

impl ClientCredentials {
    pub fn new(
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        settings: &FetchSettings,
    ) -> Result<Self, HarvestError> {
        Ok(Self {
            tenant_id: tenant_id.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            authority: DEFAULT_AUTHORITY.to_string(),
            scope: DEFENDER_SCOPE.to_string(),
            max_bytes: settings.max_bytes,
            client: build_client(settings, false, Stage::Authenticating)?,
        })
    }

    pub fn with_authority(mut self, authority: impl Into<String>) -> Self {
        self.authority = authority.into().trim_end_matches('/').to_string();
        self
    }

    fn token_url(&self) -> String {
        format!("{}/{}/oauth2/v2.0/token", self.authority, self.tenant_id)
    }

    fn form_body(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .append_pair("grant_type", "client_credentials")
            .append_pair("client_id", &self.client_id)
            .append_pair("client_secret", &self.client_secret)
            .append_pair("scope", &self.scope)
            .finish()
    }
}

#[async_trait::async_trait]
impl TokenSource for ClientCredentials {
    async fn bearer_token(&self) -> Result<String, HarvestError> {
        engine_debug!(
            "requesting token for client {} in tenant {}",
            self.client_id,
            self.tenant_id
        );
        let response = self
            .client
            .post(self.token_url())
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(self.form_body())
            .send()
            .await
            .map_err(|err| map_reqwest_error(err, Stage::Authenticating))?;

        let status = response.status();
        let body = read_body(response, self.max_bytes, Stage::Authenticating).await?;

        if !status.is_success() {
            let detail = serde_json::from_slice::<TokenErrorResponse>(&body)
                .ok()
                .and_then(|err| err.error_description.or(err.error))
                .unwrap_or_else(|| status.to_string());
            return Err(HarvestError::new(
                Stage::Authenticating,
                FailureKind::Authentication,
                format!("token request rejected ({}): {detail}", status.as_u16()),
            ));
        }

        let token: TokenResponse = serde_json::from_slice(&body).map_err(|err| {
            HarvestError::new(
                Stage::Authenticating,
                FailureKind::Decode,
                format!("token response: {err}"),
            )
        })?;
        Ok(token.access_token)
    }
}
