//! Persistence collaborator for call records.
//!
//! The gateway reads a call's configuration once when the media stream
//! connects and writes status transitions and transcripts back. Writes are
//! best-effort; callers log and drop failures.

use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::transcript::TranscriptEntry;
use crate::core::llm::{CredentialFetcher, LLMError, LLMResult, TenantCredentials};

/// Error types for call persistence
#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum StoreError {
    #[error("Call not found: {0}")]
    NotFound(String),
    #[error("Network error: {0}")]
    NetworkError(String),
    #[error("Store returned {status}: {message}")]
    Backend { status: u16, message: String },
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Lifecycle status of a call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CallStatus {
    Queued,
    InProgress,
    Completed,
    Failed,
}

/// Stored call as the gateway sees it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRecord {
    pub id: String,
    #[serde(default)]
    pub tenant_id: Option<String>,
    /// JSON script, embedded or string-encoded
    #[serde(default)]
    pub script: Option<Value>,
    #[serde(default)]
    pub status: Option<CallStatus>,
    #[serde(default)]
    pub transcript: Vec<TranscriptEntry>,
    #[serde(default)]
    pub duration_secs: Option<u64>,
}

impl CallRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tenant_id: None,
            script: None,
            status: None,
            transcript: Vec::new(),
            duration_secs: None,
        }
    }
}

/// Partial update; absent fields are left unchanged
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<CallStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript: Option<Vec<TranscriptEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<u64>,
}

impl CallUpdate {
    pub fn status(status: CallStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn transcript(transcript: Vec<TranscriptEntry>) -> Self {
        Self {
            transcript: Some(transcript),
            ..Default::default()
        }
    }
}

/// Reads call configuration and stores call outcomes
#[async_trait]
pub trait CallStore: Send + Sync {
    async fn get_call(&self, call_id: &str) -> Result<CallRecord, StoreError>;

    async fn update_call(&self, call_id: &str, update: CallUpdate) -> Result<(), StoreError>;
}

// =============================================================================
// HTTP Store
// =============================================================================

const STORE_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Store backed by a REST API: `GET` and `PATCH {base_url}/calls/{id}`
#[derive(Debug, Clone)]
pub struct HttpCallStore {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpCallStore {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(STORE_REQUEST_TIMEOUT)
            .build()
            .map_err(|e| StoreError::NetworkError(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()),
        })
    }

    fn call_url(&self, call_id: &str) -> String {
        format!("{}/calls/{}", self.base_url, call_id)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn check(response: reqwest::Response, call_id: &str) -> Result<reqwest::Response, StoreError> {
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound(call_id.to_string()));
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(StoreError::Backend {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl CallStore for HttpCallStore {
    async fn get_call(&self, call_id: &str) -> Result<CallRecord, StoreError> {
        let response = self
            .authorize(self.client.get(self.call_url(call_id)))
            .send()
            .await
            .map_err(|e| StoreError::NetworkError(format!("Call lookup failed: {e}")))?;

        Self::check(response, call_id)
            .await?
            .json::<CallRecord>()
            .await
            .map_err(|e| StoreError::InvalidResponse(format!("Malformed call record: {e}")))
    }

    async fn update_call(&self, call_id: &str, update: CallUpdate) -> Result<(), StoreError> {
        let response = self
            .authorize(self.client.patch(self.call_url(call_id)))
            .json(&update)
            .send()
            .await
            .map_err(|e| StoreError::NetworkError(format!("Call update failed: {e}")))?;

        Self::check(response, call_id).await?;
        debug!(call_id, "Call record updated");
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TenantCredentialsBody {
    #[serde(default, alias = "anthropic_api_key")]
    anthropic_api_key: Option<String>,
    #[serde(default)]
    model: Option<String>,
}

/// Tenant model credentials from `GET {base_url}/tenants/{id}/credentials`
#[async_trait]
impl CredentialFetcher for HttpCallStore {
    async fn fetch(&self, tenant_id: &str) -> LLMResult<Option<TenantCredentials>> {
        let url = format!("{}/tenants/{}/credentials", self.base_url, tenant_id);
        let response = self
            .authorize(self.client.get(url))
            .send()
            .await
            .map_err(|e| LLMError::NetworkError(format!("Credential lookup failed: {e}")))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(LLMError::ProviderError(format!(
                "Credential lookup returned {status}"
            )));
        }

        let body: TenantCredentialsBody = response
            .json()
            .await
            .map_err(|e| LLMError::InvalidResponse(format!("Malformed credentials: {e}")))?;

        Ok(body
            .anthropic_api_key
            .filter(|key| !key.is_empty())
            .map(|api_key| TenantCredentials {
                api_key,
                model: body.model.filter(|m| !m.is_empty()),
            }))
    }
}

// =============================================================================
// In-Memory Store
// =============================================================================

/// Store kept in process memory, for development and tests
#[derive(Debug, Default)]
pub struct InMemoryCallStore {
    calls: DashMap<String, CallRecord>,
    updates: DashMap<String, Vec<CallUpdate>>,
}

impl InMemoryCallStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, record: CallRecord) {
        self.calls.insert(record.id.clone(), record);
    }

    /// Current state of a call
    pub fn get(&self, call_id: &str) -> Option<CallRecord> {
        self.calls.get(call_id).map(|r| r.clone())
    }

    /// Every update applied to a call, oldest first
    pub fn updates(&self, call_id: &str) -> Vec<CallUpdate> {
        self.updates
            .get(call_id)
            .map(|u| u.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl CallStore for InMemoryCallStore {
    async fn get_call(&self, call_id: &str) -> Result<CallRecord, StoreError> {
        self.get(call_id)
            .ok_or_else(|| StoreError::NotFound(call_id.to_string()))
    }

    async fn update_call(&self, call_id: &str, update: CallUpdate) -> Result<(), StoreError> {
        {
            let mut record = self
                .calls
                .get_mut(call_id)
                .ok_or_else(|| StoreError::NotFound(call_id.to_string()))?;
            if let Some(status) = update.status {
                record.status = Some(status);
            }
            if let Some(transcript) = &update.transcript {
                record.transcript = transcript.clone();
            }
            if let Some(duration) = update.duration_secs {
                record.duration_secs = Some(duration);
            }
        }
        self.updates
            .entry(call_id.to_string())
            .or_default()
            .push(update);
        Ok(())
    }
}
