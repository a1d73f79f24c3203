//! Attestation outcomes for each direction and their combination.

use std::fmt;

use serde::Serialize;

/// Outcome of checking the agent's claimed ENS name (Agent→ENS).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum AttestationResult {
    /// The agent file names the queried ENS name.
    Valid { endpoint: String },
    /// The agent file names a different ENS name.
    Invalid { endpoint: String },
    /// The agent file has no ENS service entry.
    NotSet,
    /// The agent file could not be obtained or read.
    Error { message: String },
}

impl AttestationResult {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid { .. })
    }
}

/// Compare the agent's declared endpoint with the queried name.
///
/// Comparison ignores case; the endpoint is reported as published.
pub fn check(endpoint: Option<&str>, ens_name: &str) -> AttestationResult {
    match endpoint {
        None => AttestationResult::NotSet,
        Some(endpoint) if endpoint.to_lowercase() == ens_name.to_lowercase() => {
            AttestationResult::Valid {
                endpoint: endpoint.to_string(),
            }
        }
        Some(endpoint) => AttestationResult::Invalid {
            endpoint: endpoint.to_string(),
        },
    }
}

/// Combined state of the attestation loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum VerificationStatus {
    Closed,
    EnsToAgentOnly,
    AgentToEnsOnly,
    Open,
}

impl VerificationStatus {
    pub fn resolve(ens_to_agent: bool, agent_to_ens: bool) -> Self {
        match (ens_to_agent, agent_to_ens) {
            (true, true) => Self::Closed,
            (true, false) => Self::EnsToAgentOnly,
            (false, true) => Self::AgentToEnsOnly,
            (false, false) => Self::Open,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Closed => "Closed — verified in both directions",
            Self::EnsToAgentOnly => "ENS → Agent only",
            Self::AgentToEnsOnly => "Agent → ENS only",
            Self::Open => "Open — no verification in either direction",
        }
    }

    pub fn closed(self) -> bool {
        self == Self::Closed
    }
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn match_ignores_case_and_keeps_original() {
        assert_eq!(
            check(Some("Alice.ETH"), "alice.eth"),
            AttestationResult::Valid {
                endpoint: "Alice.ETH".to_string()
            }
        );
    }

    #[test]
    fn mismatch_is_invalid() {
        assert_eq!(
            check(Some("Mallory.eth"), "alice.eth"),
            AttestationResult::Invalid {
                endpoint: "Mallory.eth".to_string()
            }
        );
    }

    #[test]
    fn absent_endpoint_is_not_set() {
        assert_eq!(check(None, "alice.eth"), AttestationResult::NotSet);
    }

    #[test]
    fn status_truth_table() {
        let rows = [
            (true, true, "Closed — verified in both directions", true),
            (true, false, "ENS → Agent only", false),
            (false, true, "Agent → ENS only", false),
            (false, false, "Open — no verification in either direction", false),
        ];
        for (ens_to_agent, agent_to_ens, label, closed) in rows {
            let status = VerificationStatus::resolve(ens_to_agent, agent_to_ens);
            assert_eq!(status.label(), label);
            assert_eq!(status.closed(), closed);
        }
    }

    #[test]
    fn result_serializes_with_kind_tag() {
        let json = serde_json::to_value(AttestationResult::NotSet).unwrap();
        assert_eq!(json["kind"], "not-set");
        let json = serde_json::to_value(check(Some("a.eth"), "a.eth")).unwrap();
        assert_eq!(json["kind"], "valid");
        assert_eq!(json["endpoint"], "a.eth");
    }
}
