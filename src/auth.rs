//! OAuth login redirects and bearer-token resolution against the hosted
//! identity service.

use std::{fmt, str::FromStr, time::Duration};

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::{config::IdentityConfig, error::ApiError, providers::build_http_client};

const IDENTITY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OAuthProvider {
    Google,
    Github,
}

impl OAuthProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            OAuthProvider::Google => "google",
            OAuthProvider::Github => "github",
        }
    }
}

impl fmt::Display for OAuthProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OAuthProvider {
    type Err = AuthError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "google" => Ok(OAuthProvider::Google),
            "github" => Ok(OAuthProvider::Github),
            _ => Err(AuthError::UnknownProvider(value.to_string())),
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Identity service not configured")]
    NotConfigured,
    #[error("Unsupported login provider: {0}")]
    UnknownProvider(String),
    #[error("Invalid application URL: {0}")]
    InvalidAppUrl(String),
    #[error("Invalid identity endpoint: {0}")]
    InvalidEndpoint(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("Identity service unreachable: {0}")]
    Transport(#[from] reqwest::Error),
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::NotConfigured => ApiError::NotConfigured(err.to_string()),
            AuthError::UnknownProvider(_) => ApiError::Validation(err.to_string()),
            AuthError::Unauthorized(_) => ApiError::Unauthorized(err.to_string()),
            AuthError::Transport(_) => ApiError::Upstream(err.to_string()),
            AuthError::InvalidAppUrl(_) | AuthError::InvalidEndpoint(_) => ApiError::Internal {
                message: err.to_string(),
                details: None,
            },
        }
    }
}

/// The signed-in account as reported by the identity service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename(deserialize = "$id"))]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Clone)]
pub struct IdentityClient {
    client: Client,
    config: IdentityConfig,
}

impl IdentityClient {
    pub fn new(config: IdentityConfig) -> Self {
        Self {
            client: build_http_client(IDENTITY_TIMEOUT),
            config,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    fn endpoint_and_project(&self) -> Result<(&str, &str), AuthError> {
        match (self.config.endpoint.as_deref(), self.config.project_id.as_deref()) {
            (Some(endpoint), Some(project)) => Ok((endpoint, project)),
            _ => Err(AuthError::NotConfigured),
        }
    }

    /// Where the browser goes to start an OAuth session.
    pub fn login_url(&self, provider: OAuthProvider) -> Result<Url, AuthError> {
        let (endpoint, project) = self.endpoint_and_project()?;
        let app_url = self
            .config
            .app_url
            .as_deref()
            .ok_or_else(|| AuthError::InvalidAppUrl("APP_URL is not set".to_string()))?;
        let app = Url::parse(app_url).map_err(|err| AuthError::InvalidAppUrl(err.to_string()))?;
        if !matches!(app.scheme(), "http" | "https") {
            return Err(AuthError::InvalidAppUrl(format!(
                "unsupported scheme {}",
                app.scheme()
            )));
        }
        let app_base = app.as_str().trim_end_matches('/');

        let mut url =
            Url::parse(endpoint).map_err(|err| AuthError::InvalidEndpoint(err.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| AuthError::InvalidEndpoint(endpoint.to_string()))?
            .pop_if_empty()
            .extend(["account", "sessions", "oauth2", provider.as_str()]);
        url.query_pairs_mut()
            .append_pair("project", project)
            .append_pair("success", &format!("{app_base}/auth/callback"))
            .append_pair("failure", &format!("{app_base}/auth/failure"));
        Ok(url)
    }

    /// Resolves a session JWT to its account.
    pub async fn current_user(&self, jwt: &str) -> Result<User, AuthError> {
        let (endpoint, project) = self.endpoint_and_project()?;
        let response = self
            .client
            .get(format!("{endpoint}/account"))
            .header("X-Appwrite-Project", project)
            .header("X-Appwrite-JWT", jwt)
            .send()
            .await?;
        if !response.status().is_success() {
            tracing::info!(status = response.status().as_u16(), "session rejected by identity service");
            return Err(AuthError::Unauthorized("Invalid or expired session".to_string()));
        }
        response
            .json::<User>()
            .await
            .map_err(|err| AuthError::Unauthorized(format!("Unreadable account payload: {err}")))
    }
}

/// Extracts the caller from `Authorization: Bearer <jwt>`.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    IdentityClient: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let identity = IdentityClient::from_ref(state);
        if !identity.is_configured() {
            return Err(AuthError::NotConfigured.into());
        }
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(bearer_token)
            .ok_or_else(|| ApiError::Unauthorized("Missing bearer token".to_string()))?;
        let user = identity.current_user(token).await?;
        Ok(AuthenticatedUser(user))
    }
}

fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}
