//! Resolved runtime configuration.
//!
//! Priority: env var > settings.json > default.

use std::collections::BTreeMap;
use std::time::Duration;

use crate::error::AttestError;
use crate::settings::Settings;

const ENV_IPFS_GATEWAY: &str = "ENS_ATTEST_IPFS_GATEWAY";
const ENV_TIMEOUT_SECS: &str = "ENS_ATTEST_TIMEOUT_SECS";
const ENV_REGISTRY_ID: &str = "ENS_ATTEST_REGISTRY_ID";
const ENV_REGISTRY_CHAIN_ID: &str = "ENS_ATTEST_REGISTRY_CHAIN_ID";
const ENV_REGISTRY_ADDRESS: &str = "ENS_ATTEST_REGISTRY_ADDRESS";
const ENV_RPC_URL: &str = "ENS_ATTEST_RPC_URL";

/// Configuration for one verification session.
#[derive(Debug, Clone, PartialEq)]
pub struct AttestConfig {
    pub ipfs_gateway: String,
    pub request_timeout: Duration,
    pub registry_id: Option<String>,
    pub registry_chain_id: u64,
    pub registry_address: Option<String>,
    pub ens_chain_id: u64,
    pub ens_registry_address: String,
    pub rpc_urls: BTreeMap<u64, String>,
}

impl AttestConfig {
    /// Resolve from settings and the process environment.
    pub fn resolve(settings: &Settings) -> Result<Self, AttestError> {
        Self::resolve_with(settings, |key| std::env::var(key).ok())
    }

    /// Resolve from settings with a custom environment lookup.
    pub fn resolve_with(
        settings: &Settings,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, AttestError> {
        let ipfs_gateway = env(ENV_IPFS_GATEWAY).unwrap_or_else(|| settings.ipfs_gateway.clone());
        let ipfs_gateway = normalize_gateway(&ipfs_gateway)?;

        let timeout_secs = match env(ENV_TIMEOUT_SECS) {
            Some(raw) => parse_u64(ENV_TIMEOUT_SECS, &raw)?,
            None => settings.request_timeout_secs,
        };

        let registry_chain_id = match env(ENV_REGISTRY_CHAIN_ID) {
            Some(raw) => parse_u64(ENV_REGISTRY_CHAIN_ID, &raw)?,
            None => settings.registry.chain_id,
        };

        let mut rpc_urls = settings.rpc_urls.clone();
        if let Some(url) = env(ENV_RPC_URL) {
            rpc_urls.insert(settings.ens.chain_id, url);
        }

        Ok(Self {
            ipfs_gateway,
            request_timeout: Duration::from_secs(timeout_secs),
            registry_id: env(ENV_REGISTRY_ID).or_else(|| settings.registry.id.clone()),
            registry_chain_id,
            registry_address: env(ENV_REGISTRY_ADDRESS)
                .or_else(|| settings.registry.address.clone()),
            ens_chain_id: settings.ens.chain_id,
            ens_registry_address: settings.ens.registry_address.clone(),
            rpc_urls,
        })
    }

    /// The registry id, or a configuration error naming how to set it.
    pub fn require_registry_id(&self) -> Result<&str, AttestError> {
        self.registry_id.as_deref().ok_or_else(|| {
            AttestError::Config(format!(
                "no registry id configured (set {} or registry.id)",
                ENV_REGISTRY_ID
            ))
        })
    }
}

fn parse_u64(name: &str, raw: &str) -> Result<u64, AttestError> {
    raw.trim()
        .parse()
        .map_err(|_| AttestError::Config(format!("{} must be an integer, got '{}'", name, raw)))
}

/// Accept `host`, `host/` or `https://host` and keep only the host part.
fn normalize_gateway(raw: &str) -> Result<String, AttestError> {
    let host = raw
        .trim()
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_end_matches('/');
    if host.is_empty() {
        return Err(AttestError::Config("IPFS gateway host is empty".to_string()));
    }
    Ok(host.to_string())
}
