//! Shared application state.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::core::llm::{CredentialFetcher, ModelClientCache, NoTenantCredentials};
use crate::core::session::{CallStore, HttpCallStore, InMemoryCallStore, SessionServices};
use crate::core::stt::DeepgramRecognizerFactory;
use crate::core::tts::create_synthesizer;
use crate::errors::AppResult;

/// A media stream currently attached to a call
#[derive(Debug, Clone)]
pub struct ActiveCall {
    pub call_id: String,
    pub connected_at: Instant,
}

/// Application state shared by every request
pub struct AppState {
    pub config: ServerConfig,
    pub services: SessionServices,
    active_calls: DashMap<Uuid, ActiveCall>,
}

impl AppState {
    /// Build the process-wide services from configuration
    ///
    /// Fails when a required provider credential is missing or the selected
    /// synthesizer cannot produce telephony audio.
    pub async fn new(config: ServerConfig) -> AppResult<Arc<Self>> {
        let (store, credentials): (Arc<dyn CallStore>, Arc<dyn CredentialFetcher>) =
            match &config.call_store_url {
                Some(url) => {
                    let store = Arc::new(HttpCallStore::new(
                        url.clone(),
                        config.call_store_token.clone(),
                    )?);
                    info!(url = %url, "Using HTTP call store");
                    (
                        store.clone() as Arc<dyn CallStore>,
                        store as Arc<dyn CredentialFetcher>,
                    )
                }
                None => {
                    warn!("CALL_STORE_URL not set, using in-memory call store");
                    (
                        Arc::new(InMemoryCallStore::new()) as Arc<dyn CallStore>,
                        Arc::new(NoTenantCredentials) as Arc<dyn CredentialFetcher>,
                    )
                }
            };

        let synthesizer = create_synthesizer(&config.synthesizer_settings())?;
        let models = ModelClientCache::anthropic(
            config.anthropic_config(),
            credentials,
            config.tenant_credentials_ttl(),
        )?;
        let recognizers = Arc::new(DeepgramRecognizerFactory::from_base(config.stt_config()));

        info!(
            tts = synthesizer.provider_info(),
            model = %config.anthropic_model,
            stt_model = %config.deepgram_stt_model,
            "Voice services ready"
        );

        let services = SessionServices {
            store,
            recognizers,
            synthesizer,
            models,
            turn: config.turn_config(),
        };
        Ok(Self::with_services(config, services))
    }

    /// State around already-built services
    pub fn with_services(config: ServerConfig, services: SessionServices) -> Arc<Self> {
        Arc::new(Self {
            config,
            services,
            active_calls: DashMap::new(),
        })
    }

    /// Record a media stream; returns the key to release it with
    pub fn register_call(&self, call_id: &str) -> Uuid {
        let connection_id = Uuid::new_v4();
        self.active_calls.insert(
            connection_id,
            ActiveCall {
                call_id: call_id.to_string(),
                connected_at: Instant::now(),
            },
        );
        connection_id
    }

    pub fn release_call(&self, connection_id: &Uuid) -> Option<ActiveCall> {
        self.active_calls
            .remove(connection_id)
            .map(|(_, call)| call)
    }

    pub fn active_call_count(&self) -> usize {
        self.active_calls.len()
    }
}
