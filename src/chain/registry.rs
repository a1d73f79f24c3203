//! ERC-8004 identity registry reads.

use alloy::primitives::{Address, U256};
use alloy::providers::DynProvider;
use async_trait::async_trait;

use super::contracts::IIdentityRegistry;
use crate::error::AttestError;
use crate::identity::verifier::AgentRegistry;

/// Parse a decimal agent id into a token id.
pub fn parse_agent_id(agent_id: &str) -> Result<U256, AttestError> {
    if agent_id.is_empty() || !agent_id.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AttestError::InvalidAgentId(agent_id.to_string()));
    }
    U256::from_str_radix(agent_id, 10).map_err(|_| AttestError::InvalidAgentId(agent_id.to_string()))
}

#[derive(Clone)]
pub struct IdentityRegistryClient {
    provider: DynProvider,
    address: Address,
}

impl IdentityRegistryClient {
    pub fn new(provider: DynProvider, address: Address) -> Self {
        Self { provider, address }
    }
}

#[async_trait]
impl AgentRegistry for IdentityRegistryClient {
    async fn token_uri(&self, agent_id: &str) -> Result<String, AttestError> {
        let token_id = parse_agent_id(agent_id)?;
        IIdentityRegistry::new(self.address, self.provider.clone())
            .tokenURI(token_id)
            .call()
            .await
            .map_err(|e| AttestError::from_registry_failure(e.to_string()))
    }
}
