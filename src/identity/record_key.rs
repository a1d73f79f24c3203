//! Text-record key for the ENS→Agent direction.
//!
//! The key is read and written verbatim, so every producer and consumer
//! must format it identically:
//!
//! ```text
//! agent-registration[<registryId>][<agentId>]
//! ```
//!
//! Identifiers are not escaped; an id containing `[` or `]` can collide
//! with another pair.

use alloy::primitives::{B256, Bytes};
use alloy::sol_types::SolCall;

use crate::chain::contracts::ITextResolver;
use crate::chain::ens::{namehash, normalize_name};

/// Build the text-record key for an agent in a registry.
pub fn build_key(registry_id: &str, agent_id: &str) -> String {
    format!("agent-registration[{registry_id}][{agent_id}]")
}

/// A prepared `setText` call on the name's resolver.
///
/// Submitting it is left to the connected wallet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRecordUpdate {
    pub name: String,
    pub node: B256,
    pub key: String,
    /// Empty when clearing.
    pub value: String,
    pub calldata: Bytes,
}

impl TextRecordUpdate {
    /// Point `ens_name` at the agent.
    pub fn set(ens_name: &str, registry_id: &str, agent_id: &str, value: &str) -> Self {
        Self::build(ens_name, build_key(registry_id, agent_id), value.to_string())
    }

    /// Remove the record. ENS resolvers treat an empty value as unset.
    pub fn clear(ens_name: &str, registry_id: &str, agent_id: &str) -> Self {
        Self::build(ens_name, build_key(registry_id, agent_id), String::new())
    }

    pub fn is_clear(&self) -> bool {
        self.value.is_empty()
    }

    fn build(ens_name: &str, key: String, value: String) -> Self {
        let name = normalize_name(ens_name);
        let node = namehash(&name);
        let calldata = ITextResolver::setTextCall {
            node,
            key: key.clone(),
            value: value.clone(),
        }
        .abi_encode();

        Self {
            name,
            node,
            key,
            value,
            calldata: calldata.into(),
        }
    }
}
