use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use shared::{
    domain::{StudentRecord, Uid},
    error::ApiErrorBody,
    protocol::{
        LatestUidResponse, LoginRequest, LoginResponse, RegisterStudentRequest,
        RegisterStudentResponse, StudentsResponse,
    },
};
use tokio::sync::RwLock;
use tracing::info;
use url::Url;

use crate::{
    error::{AuthError, FetchError, RegistrationError},
    RegistrationSink, RosterStore, UidSource,
};

/// HTTP client for the registration backend. Implements every collaborator
/// trait the capture controller needs, plus login; the token is opaque and
/// simply replayed as a bearer header once stored.
pub struct DeskApi {
    http: Client,
    server_url: String,
    token: RwLock<Option<String>>,
}

impl DeskApi {
    pub fn new(server_url: &str, request_timeout: Duration) -> Result<Arc<Self>> {
        let parsed = Url::parse(server_url)
            .with_context(|| format!("invalid server url '{server_url}'"))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            anyhow::bail!("server url must use http or https, got '{server_url}'");
        }
        let http = Client::builder()
            .timeout(request_timeout)
            .build()
            .context("failed to build http client")?;
        Ok(Arc::new(Self {
            http,
            server_url: server_url.trim_end_matches('/').to_string(),
            token: RwLock::new(None),
        }))
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<(), AuthError> {
        let response = self
            .http
            .post(format!("{}/login", self.server_url))
            .json(&LoginRequest {
                username: username.to_string(),
                password: password.to_string(),
            })
            .send()
            .await
            .map_err(|err| AuthError::Transport(err.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| AuthError::Transport(err.to_string()))?;
        if !status.is_success() {
            return Err(AuthError::Rejected(
                ApiErrorBody::message_from_body(&body).unwrap_or_else(|| status.to_string()),
            ));
        }

        let parsed: LoginResponse = serde_json::from_str(&body)
            .map_err(|err| AuthError::Protocol(format!("unparseable login response: {err}")))?;
        let token = parsed.into_token().ok_or(AuthError::MissingToken)?;
        *self.token.write().await = Some(token);
        info!("login accepted username={username}");
        Ok(())
    }

    pub async fn has_token(&self) -> bool {
        self.token.read().await.is_some()
    }

    async fn get(&self, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self.http.get(format!("{}{path}", self.server_url));
        if let Some(token) = self.token.read().await.clone() {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    async fn post(&self, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self.http.post(format!("{}{path}", self.server_url));
        if let Some(token) = self.token.read().await.clone() {
            builder = builder.bearer_auth(token);
        }
        builder
    }
}

#[async_trait]
impl UidSource for DeskApi {
    async fn latest_uid(&self) -> Result<Option<Uid>, FetchError> {
        let response = self
            .get("/api/students/get-latest-uid")
            .await
            .send()
            .await
            .map_err(|err| FetchError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Protocol(format!(
                "uid source returned {status}"
            )));
        }
        let parsed: LatestUidResponse = response
            .json()
            .await
            .map_err(|err| FetchError::Protocol(err.to_string()))?;
        Ok(parsed.into_uid())
    }
}

#[async_trait]
impl RegistrationSink for DeskApi {
    async fn register(
        &self,
        request: RegisterStudentRequest,
    ) -> Result<StudentRecord, RegistrationError> {
        let response = self
            .post("/api/students/register")
            .await
            .json(&request)
            .send()
            .await
            .map_err(|err| RegistrationError::Transport(err.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| RegistrationError::Transport(err.to_string()))?;
        if !status.is_success() {
            return Err(RegistrationError::Rejected {
                message: ApiErrorBody::message_from_body(&body)
                    .unwrap_or_else(|| format!("registration sink returned {status}")),
            });
        }

        // 2xx means accepted even when the echo body is missing or odd.
        let parsed: RegisterStudentResponse = serde_json::from_str(&body).unwrap_or_default();
        Ok(parsed.student.unwrap_or_else(|| StudentRecord {
            name: request.name,
            matric_no: request.matric_no,
            email: request.email,
            phone: request.phone,
            level: request.level,
            department: request.department,
            uid: Some(request.uid),
            registered_at: None,
        }))
    }
}

#[async_trait]
impl RosterStore for DeskApi {
    async fn list_students(&self) -> Result<Vec<StudentRecord>, FetchError> {
        let response = self
            .get("/api/students")
            .await
            .send()
            .await
            .map_err(|err| FetchError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Protocol(format!(
                "roster store returned {status}"
            )));
        }
        let parsed: StudentsResponse = response
            .json()
            .await
            .map_err(|err| FetchError::Protocol(err.to_string()))?;
        Ok(parsed.into_students())
    }
}

#[cfg(test)]
#[path = "tests/api_tests.rs"]
mod tests;
