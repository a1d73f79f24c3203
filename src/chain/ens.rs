//! ENS text-record reads.

use alloy::primitives::{Address, B256, keccak256};
use alloy::providers::DynProvider;
use async_trait::async_trait;
use tracing::debug;

use super::contracts::{IEnsRegistry, ITextResolver};
use crate::error::AttestError;
use crate::identity::verifier::EnsTextReader;

/// Lowercase and trim a name before hashing.
///
/// Full ENSIP-15 normalization is not applied; names outside ASCII may hash
/// differently from what ENS apps produce.
pub fn normalize_name(name: &str) -> String {
    name.trim().trim_end_matches('.').to_lowercase()
}

/// EIP-137 namehash of an already-normalized name.
pub fn namehash(name: &str) -> B256 {
    let mut node = B256::ZERO;
    if name.is_empty() {
        return node;
    }
    for label in name.rsplit('.') {
        let label_hash = keccak256(label.as_bytes());
        let mut buf = [0u8; 64];
        buf[..32].copy_from_slice(node.as_slice());
        buf[32..].copy_from_slice(label_hash.as_slice());
        node = keccak256(buf);
    }
    node
}

/// Reads text records through the ENS registry and the name's resolver.
#[derive(Clone)]
pub struct EnsClient {
    provider: DynProvider,
    registry: Address,
}

impl EnsClient {
    pub fn new(provider: DynProvider, registry: Address) -> Self {
        Self { provider, registry }
    }

    async fn resolver(&self, node: B256) -> Result<Address, AttestError> {
        IEnsRegistry::new(self.registry, self.provider.clone())
            .resolver(node)
            .call()
            .await
            .map_err(|e| AttestError::Ens(format!("resolver lookup failed: {e}")))
    }
}

#[async_trait]
impl EnsTextReader for EnsClient {
    async fn get_text(&self, name: &str, key: &str) -> Result<Option<String>, AttestError> {
        let node = namehash(&normalize_name(name));
        let resolver = self.resolver(node).await?;
        if resolver == Address::ZERO {
            debug!("{} has no resolver", name);
            return Ok(None);
        }

        let value = ITextResolver::new(resolver, self.provider.clone())
            .text(node, key.to_string())
            .call()
            .await
            .map_err(|e| AttestError::Ens(format!("text({key}) failed: {e}")))?;

        Ok(Some(value).filter(|v| !v.is_empty()))
    }
}
