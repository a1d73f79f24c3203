//! ERC-8004 agent registration files and the ENS service entry.
//!
//! The registration file is the JSON document an agent's `tokenURI`
//! resolves to. An agent claims an ENS name by listing a service entry
//! named exactly `"ENS"` whose `endpoint` is that name.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Service name marking the agent's ENS claim. Matched case-sensitively.
pub const ENS_SERVICE_NAME: &str = "ENS";

/// Schema type constant for ERC-8004 v1 registration files.
pub const REGISTRATION_V1_TYPE: &str = "https://eips.ethereum.org/EIPS/eip-8004#registration-v1";

/// ERC-8004 agent registration file.
///
/// Used to author files. Verification reads files loosely through
/// [`extract_endpoint`] since published files rarely match the schema exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrationFile {
    #[serde(rename = "type")]
    pub schema_type: String,

    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub services: Vec<ServiceEntry>,

    #[serde(default = "default_active")]
    pub active: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub registrations: Vec<Registration>,
}

/// A service endpoint in the registration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceEntry {
    /// Service name (e.g., "MCP", "A2A", "web", "ENS").
    pub name: String,

    pub endpoint: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// On-chain registration reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Registration {
    /// ERC-721 token ID.
    #[serde(rename = "agentId")]
    pub agent_id: u64,

    /// Registry identifier.
    #[serde(rename = "agentRegistry")]
    pub agent_registry: String,
}

fn default_active() -> bool {
    true
}

impl RegistrationFile {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            schema_type: REGISTRATION_V1_TYPE.to_string(),
            name: name.into(),
            description: description.into(),
            services: Vec::new(),
            active: true,
            registrations: Vec::new(),
        }
    }

    /// Declare `ens_name` as this agent's ENS name, replacing any earlier claim.
    pub fn claim_ens(mut self, ens_name: impl Into<String>) -> Self {
        self.services.retain(|s| s.name != ENS_SERVICE_NAME);
        self.services.push(ServiceEntry {
            name: ENS_SERVICE_NAME.to_string(),
            endpoint: ens_name.into(),
            version: None,
        });
        self
    }

    pub fn registered_as(mut self, agent_id: u64, agent_registry: impl Into<String>) -> Self {
        self.registrations.push(Registration {
            agent_id,
            agent_registry: agent_registry.into(),
        });
        self
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Parse agent-file text, rejecting anything that is not a JSON object or array.
///
/// HTML error pages and plain text are turned away before the parser runs.
pub fn parse_agent_file(text: &str) -> Option<Value> {
    let trimmed = text.trim_start();
    if !(trimmed.starts_with('{') || trimmed.starts_with('[')) {
        return None;
    }
    serde_json::from_str(trimmed).ok()
}

/// The endpoint of the first `services` entry named exactly `"ENS"`.
pub fn ens_endpoint(file: &Value) -> Option<String> {
    file.get("services")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .find(|service| {
            service.get("name").and_then(Value::as_str) == Some(ENS_SERVICE_NAME)
        })
        .and_then(|service| service.get("endpoint"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Extract the ENS endpoint an agent file declares, if any.
///
/// Never fails: unparseable content simply has no endpoint.
pub fn extract_endpoint(text: &str) -> Option<String> {
    parse_agent_file(text).as_ref().and_then(ens_endpoint)
}
