//! User settings persistence.
//!
//! Stores settings in ~/.ens-attest/settings.json. Environment overrides
//! are applied on top of these in [`crate::config`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Mainnet ENS registry, identical on every chain ENS is deployed to.
pub const DEFAULT_ENS_REGISTRY: &str = "0x00000000000C2E074eC69A0dFb2997BA6C7d2e1e";

/// Public IPFS gateway used to resolve `ipfs://` agent files.
pub const DEFAULT_IPFS_GATEWAY: &str = "ipfs.io";

/// Settings persisted to disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Gateway host used for `ipfs://` URIs (host only, no scheme).
    #[serde(default = "default_ipfs_gateway")]
    pub ipfs_gateway: String,

    /// Per-request timeout for agent-file fetches.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Agent registry the text-record key refers to.
    #[serde(default)]
    pub registry: RegistrySettings,

    /// ENS deployment used for text-record reads.
    #[serde(default)]
    pub ens: EnsSettings,

    /// JSON-RPC endpoints keyed by chain id.
    #[serde(default)]
    pub rpc_urls: BTreeMap<u64, String>,
}

/// ERC-8004 identity registry deployment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrySettings {
    /// Opaque registry identifier embedded in the text-record key.
    #[serde(default)]
    pub id: Option<String>,

    /// Chain the registry contract lives on.
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,

    /// Registry contract address (hex, 0x-prefixed).
    #[serde(default)]
    pub address: Option<String>,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            id: None,
            chain_id: default_chain_id(),
            address: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsSettings {
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,

    #[serde(default = "default_ens_registry")]
    pub registry_address: String,
}

impl Default for EnsSettings {
    fn default() -> Self {
        Self {
            chain_id: default_chain_id(),
            registry_address: default_ens_registry(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ipfs_gateway: default_ipfs_gateway(),
            request_timeout_secs: default_request_timeout_secs(),
            registry: RegistrySettings::default(),
            ens: EnsSettings::default(),
            rpc_urls: BTreeMap::new(),
        }
    }
}

fn default_ipfs_gateway() -> String {
    DEFAULT_IPFS_GATEWAY.to_string()
}

fn default_request_timeout_secs() -> u64 {
    20
}

fn default_chain_id() -> u64 {
    1
}

fn default_ens_registry() -> String {
    DEFAULT_ENS_REGISTRY.to_string()
}

impl Settings {
    /// Get the default settings file path (~/.ens-attest/settings.json).
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".ens-attest")
            .join("settings.json")
    }

    /// Load settings from disk, returning default if not found.
    pub fn load() -> Self {
        Self::load_from(&Self::default_path())
    }

    /// Load settings from a specific path.
    ///
    /// A file that exists but does not parse is reported and ignored.
    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(data) => serde_json::from_str(&data).unwrap_or_else(|e| {
                tracing::warn!("Ignoring unreadable settings at {}: {}", path.display(), e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Write settings as pretty JSON, creating the parent directory.
    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Get a setting value by dotted path (e.g., "registry.chain_id").
    pub fn get(&self, path: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let mut current = &json;
        for part in path.split('.') {
            current = current.get(part)?;
        }

        match current {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Null => Some("null".to_string()),
            other => Some(other.to_string()),
        }
    }

    /// Set a setting value by dotted path.
    ///
    /// The existing value decides how `value` is parsed. Unknown leaf keys
    /// are only accepted inside maps such as `rpc_urls`.
    pub fn set(&mut self, path: &str, value: &str) -> Result<(), String> {
        let mut json = serde_json::to_value(&*self)
            .map_err(|e| format!("Failed to serialize settings: {}", e))?;

        let (parents, leaf) = match path.rsplit_once('.') {
            Some((parents, leaf)) => (Some(parents), leaf),
            None => (None, path),
        };
        if leaf.is_empty() {
            return Err("Empty path".to_string());
        }

        let mut current = &mut json;
        for part in parents.into_iter().flat_map(|p| p.split('.')) {
            current = current
                .get_mut(part)
                .ok_or_else(|| format!("Path not found: {}", path))?;
        }

        let obj = current
            .as_object_mut()
            .ok_or_else(|| format!("Parent is not an object: {}", path))?;

        let new_value = match obj.get(leaf) {
            Some(serde_json::Value::Bool(_)) => value
                .parse::<bool>()
                .map(serde_json::Value::Bool)
                .map_err(|_| format!("Expected boolean for {}, got '{}'", path, value))?,
            Some(serde_json::Value::Number(_)) => value
                .parse::<u64>()
                .map(|n| serde_json::Value::Number(n.into()))
                .map_err(|_| format!("Expected integer for {}, got '{}'", path, value))?,
            Some(serde_json::Value::Null) if value == "null" => serde_json::Value::Null,
            // Strings, optional strings and new map entries all take the raw text.
            _ => serde_json::Value::String(value.to_string()),
        };

        obj.insert(leaf.to_string(), new_value);

        *self =
            serde_json::from_value(json).map_err(|e| format!("Failed to apply setting: {}", e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.ipfs_gateway, "ipfs.io");
        assert_eq!(settings.request_timeout_secs, 20);
        assert_eq!(settings.ens.registry_address, DEFAULT_ENS_REGISTRY);
        assert_eq!(settings.registry.id, None);
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let settings: Settings = serde_json::from_str(r#"{"registry":{"id":"R1"}}"#).unwrap();
        assert_eq!(settings.registry.id.as_deref(), Some("R1"));
        assert_eq!(settings.registry.chain_id, 1);
        assert_eq!(settings.ipfs_gateway, "ipfs.io");
    }

    #[test]
    fn test_get_setting() {
        let settings = Settings::default();
        assert_eq!(settings.get("ipfs_gateway"), Some("ipfs.io".to_string()));
        assert_eq!(settings.get("registry.chain_id"), Some("1".to_string()));
        assert_eq!(settings.get("registry.id"), Some("null".to_string()));
        assert_eq!(settings.get("nonexistent"), None);
    }

    #[test]
    fn test_set_setting() {
        let mut settings = Settings::default();

        settings.set("registry.id", "R1").unwrap();
        assert_eq!(settings.registry.id.as_deref(), Some("R1"));

        settings.set("registry.chain_id", "8453").unwrap();
        assert_eq!(settings.registry.chain_id, 8453);

        settings.set("rpc_urls.8453", "https://base.example").unwrap();
        assert_eq!(
            settings.rpc_urls.get(&8453).map(String::as_str),
            Some("https://base.example")
        );
    }

    #[test]
    fn test_set_rejects_bad_values() {
        let mut settings = Settings::default();
        assert!(settings.set("registry.chain_id", "base").is_err());
        assert!(settings.set("nope.chain_id", "1").is_err());
        assert!(settings.set("ipfs_gateway.host", "x").is_err());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let mut settings = Settings::default();
        settings.ipfs_gateway = "gateway.pinata.cloud".to_string();
        settings.registry.address = Some("0x8004A169FB4a3325136EB29fA0ceB6D2e539a432".to_string());
        settings.save_to(&path).unwrap();

        assert_eq!(Settings::load_from(&path), settings);
    }

    #[test]
    fn test_unreadable_file_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "not json").unwrap();
        assert_eq!(Settings::load_from(&path), Settings::default());
    }
}
