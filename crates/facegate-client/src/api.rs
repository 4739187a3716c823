//! HTTP contracts of the landmark, login and registration endpoints.
//!
//! Requests are blocking `ureq` calls moved onto the blocking pool, so each
//! call looks like a single await to the tracking loop and the flows.
//!
//! The agent keeps a cookie jar. The server ties an issued challenge to its
//! session cookie, so the challenge and the login that answers it must go
//! through the same [`HttpApi`] (or a clone of it).

use std::future::Future;
use std::time::Duration;

use facegate_core::{Challenge, Frame, LandmarkSet};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const LANDMARKS_PATH: &str = "/api/landmarks";
pub const LOGIN_PATH: &str = "/api/login";
pub const REGISTER_PATH: &str = "/api/register";
pub const CHALLENGE_PATH: &str = "/api/challenge";

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("request to {endpoint} failed: {message}")]
    Transport {
        endpoint: &'static str,
        message: String,
    },
    #[error("malformed response from {endpoint}: {source}")]
    Decode {
        endpoint: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("request task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[derive(Debug, Clone, Serialize)]
pub struct LandmarksRequest {
    pub image: String,
}

/// `{}` means no face was found.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LandmarksResponse {
    #[serde(default)]
    pub landmarks: Option<LandmarkSet>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub image: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub liveness: Option<Challenge>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegisterRequest {
    pub username: String,
    pub images: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct AuthResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

impl AuthResponse {
    pub fn is_login_success(&self) -> bool {
        self.status == "success"
    }

    pub fn is_register_ok(&self) -> bool {
        self.status == "ok"
    }

    /// Server message, or `fallback` when absent or blank.
    pub fn message_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        match self.message.as_deref() {
            Some(m) if !m.trim().is_empty() => m,
            _ => fallback,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChallengeResponse {
    pub challenge: Challenge,
}

/// Landmark detection service.
pub trait LandmarkClient: Send + Sync + 'static {
    /// `Ok(None)` when the service found no face.
    fn detect(
        &self,
        frame: &Frame,
    ) -> impl Future<Output = Result<Option<LandmarkSet>, ApiError>> + Send;
}

/// Login and registration service.
pub trait AuthClient: Send + Sync + 'static {
    fn login(&self, request: LoginRequest)
        -> impl Future<Output = Result<AuthResponse, ApiError>> + Send;

    fn register(
        &self,
        request: RegisterRequest,
    ) -> impl Future<Output = Result<AuthResponse, ApiError>> + Send;

    /// Ask the server which liveness gesture the next login must show.
    fn challenge(&self) -> impl Future<Output = Result<Challenge, ApiError>> + Send;
}

/// `ureq`-backed client for all endpoints of one server. Clones share the
/// connection pool and the cookie jar.
#[derive(Clone)]
pub struct HttpApi {
    agent: ureq::Agent,
    base_url: String,
}

impl HttpApi {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn post_json<B, R>(&self, endpoint: &'static str, body: B) -> Result<R, ApiError>
    where
        B: Serialize + Send + 'static,
        R: DeserializeOwned + Send + 'static,
    {
        let agent = self.agent.clone();
        let url = self.url(endpoint);
        tokio::task::spawn_blocking(move || {
            let mut resp = agent
                .post(url.as_str())
                .send_json(&body)
                .map_err(|e| transport(endpoint, e))?;
            let text = resp
                .body_mut()
                .read_to_string()
                .map_err(|e| transport(endpoint, e))?;
            serde_json::from_str(&text).map_err(|source| ApiError::Decode { endpoint, source })
        })
        .await?
    }

    async fn get_json<R>(&self, endpoint: &'static str) -> Result<R, ApiError>
    where
        R: DeserializeOwned + Send + 'static,
    {
        let agent = self.agent.clone();
        let url = self.url(endpoint);
        tokio::task::spawn_blocking(move || {
            let mut resp = agent
                .get(url.as_str())
                .call()
                .map_err(|e| transport(endpoint, e))?;
            let text = resp
                .body_mut()
                .read_to_string()
                .map_err(|e| transport(endpoint, e))?;
            serde_json::from_str(&text).map_err(|source| ApiError::Decode { endpoint, source })
        })
        .await?
    }
}

fn transport(endpoint: &'static str, err: ureq::Error) -> ApiError {
    ApiError::Transport {
        endpoint,
        message: err.to_string(),
    }
}

impl LandmarkClient for HttpApi {
    async fn detect(&self, frame: &Frame) -> Result<Option<LandmarkSet>, ApiError> {
        let request = LandmarksRequest {
            image: frame.to_data_url(),
        };
        let response: LandmarksResponse = self.post_json(LANDMARKS_PATH, request).await?;
        Ok(response.landmarks)
    }
}

impl AuthClient for HttpApi {
    async fn login(&self, request: LoginRequest) -> Result<AuthResponse, ApiError> {
        self.post_json(LOGIN_PATH, request).await
    }

    async fn register(&self, request: RegisterRequest) -> Result<AuthResponse, ApiError> {
        self.post_json(REGISTER_PATH, request).await
    }

    async fn challenge(&self) -> Result<Challenge, ApiError> {
        let response: ChallengeResponse = self.get_json(CHALLENGE_PATH).await?;
        Ok(response.challenge)
    }
}
