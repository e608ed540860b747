//! Per-tenant model client resolution.
//!
//! Tenants may bring their own model credentials. [`ModelClientCache`] looks
//! them up through a [`CredentialFetcher`], builds a client and keeps it for
//! a bounded time. Tenants without credentials, and lookups that fail, get
//! the process-wide default client.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use tracing::{debug, warn};

use super::anthropic::{AnthropicClient, AnthropicConfig};
use super::base::{ChatModel, LLMResult};

/// Default lifetime of a cached tenant client.
pub const DEFAULT_CREDENTIALS_TTL: Duration = Duration::from_secs(300);

const MAX_CACHED_TENANTS: u64 = 10_000;

/// Model credentials configured for a tenant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantCredentials {
    pub api_key: String,
    /// Model override; the default model is used when absent
    pub model: Option<String>,
}

/// Source of tenant credentials.
#[async_trait]
pub trait CredentialFetcher: Send + Sync {
    /// `Ok(None)` when the tenant has no credentials of its own.
    async fn fetch(&self, tenant_id: &str) -> LLMResult<Option<TenantCredentials>>;
}

/// Fetcher for deployments without per-tenant credentials.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoTenantCredentials;

#[async_trait]
impl CredentialFetcher for NoTenantCredentials {
    async fn fetch(&self, _tenant_id: &str) -> LLMResult<Option<TenantCredentials>> {
        Ok(None)
    }
}

type ClientBuilder = dyn Fn(TenantCredentials) -> LLMResult<Arc<dyn ChatModel>> + Send + Sync;

/// Resolves the model client for a call's tenant.
#[derive(Clone)]
pub struct ModelClientCache {
    default_client: Arc<dyn ChatModel>,
    fetcher: Arc<dyn CredentialFetcher>,
    build_client: Arc<ClientBuilder>,
    clients: Cache<String, Arc<dyn ChatModel>>,
}

impl ModelClientCache {
    /// Cache that builds Anthropic clients from tenant credentials.
    pub fn anthropic(
        default_config: AnthropicConfig,
        fetcher: Arc<dyn CredentialFetcher>,
        ttl: Duration,
    ) -> LLMResult<Self> {
        let default_client: Arc<dyn ChatModel> =
            Arc::new(AnthropicClient::new(default_config.clone())?);
        let build_client = move |credentials: TenantCredentials| {
            let config = AnthropicConfig {
                api_key: credentials.api_key,
                model: credentials
                    .model
                    .unwrap_or_else(|| default_config.model.clone()),
                ..default_config.clone()
            };
            Ok(Arc::new(AnthropicClient::new(config)?) as Arc<dyn ChatModel>)
        };
        Ok(Self::new(default_client, fetcher, ttl, build_client))
    }

    pub fn new<F>(
        default_client: Arc<dyn ChatModel>,
        fetcher: Arc<dyn CredentialFetcher>,
        ttl: Duration,
        build_client: F,
    ) -> Self
    where
        F: Fn(TenantCredentials) -> LLMResult<Arc<dyn ChatModel>> + Send + Sync + 'static,
    {
        Self {
            default_client,
            fetcher,
            build_client: Arc::new(build_client),
            clients: Cache::builder()
                .max_capacity(MAX_CACHED_TENANTS)
                .time_to_live(ttl)
                .build(),
        }
    }

    /// Cache serving the same client to every tenant.
    pub fn single(client: Arc<dyn ChatModel>) -> Self {
        Self::new(
            client,
            Arc::new(NoTenantCredentials),
            DEFAULT_CREDENTIALS_TTL,
            |_| {
                Err(super::base::LLMError::ConfigurationError(
                    "Tenant credentials are not supported".to_string(),
                ))
            },
        )
    }

    pub fn default_client(&self) -> Arc<dyn ChatModel> {
        self.default_client.clone()
    }

    /// Client for `tenant_id`, falling back to the default client.
    pub async fn resolve(&self, tenant_id: Option<&str>) -> Arc<dyn ChatModel> {
        let Some(tenant_id) = tenant_id.filter(|t| !t.is_empty()) else {
            return self.default_client();
        };

        if let Some(client) = self.clients.get(tenant_id).await {
            return client;
        }

        match self.fetcher.fetch(tenant_id).await {
            Ok(Some(credentials)) => match (self.build_client)(credentials) {
                Ok(client) => {
                    debug!(tenant_id, "Caching tenant model client");
                    self.clients
                        .insert(tenant_id.to_string(), client.clone())
                        .await;
                    client
                }
                Err(e) => {
                    warn!(tenant_id, error = %e, "Invalid tenant credentials, using default client");
                    self.default_client()
                }
            },
            Ok(None) => self.default_client(),
            Err(e) => {
                warn!(tenant_id, error = %e, "Tenant credential lookup failed, using default client");
                self.default_client()
            }
        }
    }

    /// Forget a tenant's client, e.g. after its credentials were rotated.
    pub async fn invalidate(&self, tenant_id: &str) {
        self.clients.invalidate(tenant_id).await;
    }
}
