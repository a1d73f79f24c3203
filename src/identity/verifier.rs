//! Verification of both attestation directions for one name/agent pair.
//!
//! The ENS text-record read and the agent-file pipeline run concurrently.
//! Each call to [`Verifier::verify`] supersedes the previous one on the same
//! verifier, so a slow stale request can never report over a newer one.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::agent_card::{ens_endpoint, parse_agent_file};
use super::attestation::{AttestationResult, VerificationStatus, check};
use super::cancel::CancelToken;
use super::fetch::{AgentFileFetcher, FetchError, ReqwestFetch};
use super::record_key::build_key;
use crate::chain::ChainClients;
use crate::config::AttestConfig;
use crate::error::AttestError;

/// Reads ENS text records.
#[async_trait]
pub trait EnsTextReader: Send + Sync {
    /// `Ok(None)` when the name has no value for `key`.
    async fn get_text(&self, name: &str, key: &str) -> Result<Option<String>, AttestError>;
}

/// Reads an agent's registration URI from the identity registry.
#[async_trait]
pub trait AgentRegistry: Send + Sync {
    async fn token_uri(&self, agent_id: &str) -> Result<String, AttestError>;
}

/// State of the ENS-side text record (ENS→Agent).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum RecordLookup {
    Set { value: String },
    NotSet,
    Error { message: String },
}

impl RecordLookup {
    pub fn is_set(&self) -> bool {
        matches!(self, Self::Set { .. })
    }
}

/// Everything learned about one name/agent pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttestationReport {
    pub ens_name: String,
    pub agent_id: String,
    pub key: String,
    pub ens_record: RecordLookup,
    pub agent_file: AttestationResult,
    pub status: VerificationStatus,
}

impl AttestationReport {
    pub fn ens_to_agent(&self) -> bool {
        self.ens_record.is_set()
    }

    pub fn agent_to_ens(&self) -> bool {
        self.agent_file.is_valid()
    }
}

pub struct Verifier {
    registry_id: String,
    ens: Arc<dyn EnsTextReader>,
    registry: Arc<dyn AgentRegistry>,
    fetcher: AgentFileFetcher,
    in_flight: Mutex<Option<CancelToken>>,
}

impl Verifier {
    pub fn new(
        registry_id: impl Into<String>,
        ens: Arc<dyn EnsTextReader>,
        registry: Arc<dyn AgentRegistry>,
        fetcher: AgentFileFetcher,
    ) -> Self {
        Self {
            registry_id: registry_id.into(),
            ens,
            registry,
            fetcher,
            in_flight: Mutex::new(None),
        }
    }

    /// Wire up chain-backed collaborators from configuration.
    pub fn from_config(config: &AttestConfig, clients: &ChainClients) -> Result<Self, AttestError> {
        let http = ReqwestFetch::new(config.request_timeout)?;
        Ok(Self::new(
            config.require_registry_id()?,
            Arc::new(clients.ens_client(config)?),
            Arc::new(clients.registry_client(config)?),
            AgentFileFetcher::new(Arc::new(http), config.ipfs_gateway.clone()),
        ))
    }

    pub fn registry_id(&self) -> &str {
        &self.registry_id
    }

    /// Verify both directions for `ens_name` and `agent_id`.
    ///
    /// Returns `None` if a newer call (or [`Verifier::cancel`]) superseded
    /// this one before it finished.
    pub async fn verify(&self, ens_name: &str, agent_id: &str) -> Option<AttestationReport> {
        let cancel = self.begin();
        let key = build_key(&self.registry_id, agent_id);
        debug!("Verifying {} against agent {} ({})", ens_name, agent_id, key);

        let (ens_record, agent_file) = tokio::join!(
            self.read_record(ens_name, &key, &cancel),
            self.check_agent_file(ens_name, agent_id, &cancel),
        );

        if cancel.is_cancelled() {
            debug!("Verification of {} / {} superseded", ens_name, agent_id);
            return None;
        }

        let status = VerificationStatus::resolve(ens_record.is_set(), agent_file.is_valid());
        info!("{} / agent {}: {}", ens_name, agent_id, status);

        Some(AttestationReport {
            ens_name: ens_name.to_string(),
            agent_id: agent_id.to_string(),
            key,
            ens_record,
            agent_file,
            status,
        })
    }

    /// Abandon the in-flight verification, if any.
    pub fn cancel(&self) {
        let current = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(token) = current.as_ref() {
            token.cancel();
        }
    }

    fn begin(&self) -> CancelToken {
        let token = CancelToken::new();
        let mut current = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = current.replace(token.clone()) {
            previous.cancel();
        }
        token
    }

    async fn read_record(&self, ens_name: &str, key: &str, cancel: &CancelToken) -> RecordLookup {
        match until_cancelled(cancel, self.ens.get_text(ens_name, key)).await {
            None => RecordLookup::NotSet,
            Some(Ok(Some(value))) if !value.is_empty() => RecordLookup::Set { value },
            Some(Ok(_)) => RecordLookup::NotSet,
            Some(Err(e)) => {
                warn!("Text record lookup for {} failed: {}", ens_name, e);
                RecordLookup::Error {
                    message: e.to_string(),
                }
            }
        }
    }

    async fn check_agent_file(
        &self,
        ens_name: &str,
        agent_id: &str,
        cancel: &CancelToken,
    ) -> AttestationResult {
        let uri = match until_cancelled(cancel, self.registry.token_uri(agent_id)).await {
            None => return AttestationResult::error(FetchError::Cancelled.to_string()),
            Some(Ok(uri)) => uri,
            Some(Err(e)) => {
                warn!("Registry lookup for agent {} failed: {}", agent_id, e);
                return AttestationResult::error(e.to_string());
            }
        };

        let text = match self.fetcher.fetch(&uri, cancel).await {
            Ok(text) => text,
            Err(e) => {
                if !matches!(e, FetchError::Cancelled) {
                    warn!("Agent file for {} unavailable: {}", agent_id, e);
                }
                return AttestationResult::error(e.to_string());
            }
        };

        // A file that does not parse is reported, unlike a file without an
        // ENS service which is simply not set.
        match parse_agent_file(&text) {
            Some(file) => check(ens_endpoint(&file).as_deref(), ens_name),
            None => {
                warn!("Agent file for {} is not valid JSON", agent_id);
                AttestationResult::error("agent file is not valid JSON")
            }
        }
    }
}

async fn until_cancelled<T>(cancel: &CancelToken, fut: impl Future<Output = T>) -> Option<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        value = fut => Some(value),
    }
}
