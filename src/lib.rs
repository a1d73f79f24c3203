//! Bidirectional attestation between ENS names and ERC-8004 agents.

pub mod chain;
pub mod config;
pub mod error;
pub mod identity;
pub mod settings;

pub use config::AttestConfig;
pub use error::AttestError;
pub use settings::Settings;
