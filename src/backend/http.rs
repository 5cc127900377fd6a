use std::time::Duration;

use serde::de::DeserializeOwned;

use super::types::*;
use super::{AnalysisBackend, BackendError, SessionId};
use crate::config::BackendConfig;

/// Blocking HTTP client for the analysis service.
pub struct HttpAnalysisClient {
    base_url: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl HttpAnalysisClient {
    /// Create a client for the service at `base_url` (without the `/api` suffix).
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, BackendError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| BackendError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            timeout_secs,
        })
    }

    pub fn from_config(config: &BackendConfig) -> Result<Self, BackendError> {
        Self::new(&config.base_url, config.timeout_secs)
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/api/{}", self.base_url, path)
    }

    fn map_send_error(&self, e: reqwest::Error) -> BackendError {
        if e.is_connect() {
            BackendError::Connection(self.base_url.clone())
        } else if e.is_timeout() {
            BackendError::HttpClient(format!("Request timed out after {}s", self.timeout_secs))
        } else {
            BackendError::HttpClient(e.to_string())
        }
    }

    /// Check status and decode the JSON body.
    fn decode<T: DeserializeOwned>(
        &self,
        response: reqwest::blocking::Response,
    ) -> Result<T, BackendError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(BackendError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .map_err(|e| BackendError::ResponseParsing(e.to_string()))
    }

    fn post<B: serde::Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, BackendError> {
        let url = self.api_url(path);
        tracing::debug!(url = %url, "POST analysis service");
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .map_err(|e| self.map_send_error(e))?;
        self.decode(response)
    }
}

impl AnalysisBackend for HttpAnalysisClient {
    fn start_session(&self, intake_type: &str) -> Result<StartSessionResponse, BackendError> {
        self.post("start-session", &StartSessionRequest { intake_type })
    }

    fn chat_turn(
        &self,
        session_id: &SessionId,
        message: &str,
    ) -> Result<ChatTurnResponse, BackendError> {
        self.post(
            "chat/message",
            &ChatTurnRequest {
                session_id: session_id.as_str(),
                message,
            },
        )
    }

    fn analyze(&self, session_id: &SessionId) -> Result<AnalyzeResponse, BackendError> {
        self.post(
            "chat/analyze",
            &AnalyzeRequest {
                session_id: session_id.as_str(),
            },
        )
    }

    fn conditions(&self) -> Result<Vec<ConditionInfo>, BackendError> {
        let url = self.api_url("conditions");
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| self.map_send_error(e))?;
        let parsed: ConditionsResponse = self.decode(response)?;
        Ok(parsed.conditions)
    }

    fn health(&self) -> bool {
        let url = format!("{}/health", self.base_url);
        match self.client.get(&url).send() {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!(error = %e, "Analysis service health probe failed");
                false
            }
        }
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }
}
