//! On-chain collaborators: ENS text records and the agent identity registry.
//!
//! Providers are created lazily per chain id and cached in a
//! [`ChainClients`] instance owned by the caller.

pub mod contracts;
pub mod ens;
pub mod registry;

use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;
use std::sync::Mutex;

use alloy::primitives::Address;
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use tracing::debug;

pub use ens::{EnsClient, namehash, normalize_name};
pub use registry::{IdentityRegistryClient, parse_agent_id};

use crate::config::AttestConfig;
use crate::error::AttestError;

/// HTTP providers keyed by chain id.
pub struct ChainClients {
    rpc_urls: BTreeMap<u64, String>,
    providers: Mutex<HashMap<u64, DynProvider>>,
}

impl ChainClients {
    pub fn new(rpc_urls: BTreeMap<u64, String>) -> Self {
        Self {
            rpc_urls,
            providers: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &AttestConfig) -> Self {
        Self::new(config.rpc_urls.clone())
    }

    /// Provider for `chain_id`, built on first use.
    pub fn provider(&self, chain_id: u64) -> Result<DynProvider, AttestError> {
        let mut providers = self
            .providers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(provider) = providers.get(&chain_id) {
            return Ok(provider.clone());
        }

        let raw = self.rpc_urls.get(&chain_id).ok_or_else(|| {
            AttestError::Config(format!("no RPC URL configured for chain {chain_id}"))
        })?;
        let url = url::Url::parse(raw)
            .map_err(|e| AttestError::Config(format!("invalid RPC URL for chain {chain_id}: {e}")))?;

        debug!("Creating provider for chain {}", chain_id);
        let provider = ProviderBuilder::new().connect_http(url).erased();
        providers.insert(chain_id, provider.clone());
        Ok(provider)
    }

    /// Chain ids with a live provider.
    pub fn cached_chains(&self) -> Vec<u64> {
        let providers = self
            .providers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut chains: Vec<u64> = providers.keys().copied().collect();
        chains.sort_unstable();
        chains
    }

    pub fn ens_client(&self, config: &AttestConfig) -> Result<EnsClient, AttestError> {
        let registry = parse_address("ENS registry", &config.ens_registry_address)?;
        Ok(EnsClient::new(self.provider(config.ens_chain_id)?, registry))
    }

    pub fn registry_client(
        &self,
        config: &AttestConfig,
    ) -> Result<IdentityRegistryClient, AttestError> {
        let raw = config.registry_address.as_deref().ok_or_else(|| {
            AttestError::Config("no identity registry address configured".to_string())
        })?;
        let address = parse_address("identity registry", raw)?;
        Ok(IdentityRegistryClient::new(
            self.provider(config.registry_chain_id)?,
            address,
        ))
    }
}

fn parse_address(what: &str, raw: &str) -> Result<Address, AttestError> {
    Address::from_str(raw.trim())
        .map_err(|e| AttestError::Config(format!("invalid {what} address '{raw}': {e}")))
}
