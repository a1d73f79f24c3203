//! Error types shared across the crate.

use crate::identity::fetch::FetchError;

/// Failures surfaced while verifying an attestation.
///
/// Malformed agent-file *content* never produces one of these; only
/// transport failures, registry reverts and bad configuration do.
#[derive(Debug, thiserror::Error)]
pub enum AttestError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("agent not found in registry: {0}")]
    AgentNotFound(String),

    #[error("registry call failed: {0}")]
    Registry(String),

    #[error("ENS lookup failed: {0}")]
    Ens(String),

    #[error("invalid agent id '{0}': expected a non-negative integer")]
    InvalidAgentId(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl AttestError {
    /// Classify a failed registry read.
    ///
    /// Contract reverts only show up in the provider's error text, so the
    /// message is the only signal available.
    pub fn from_registry_failure(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.to_ascii_lowercase().contains("revert") {
            Self::AgentNotFound(message)
        } else {
            Self::Registry(message)
        }
    }
}
