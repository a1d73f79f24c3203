//! ENS ⇄ agent attestation (ERC-8004).
//!
//! An attestation loop has two halves:
//! - ENS→Agent: the name carries the text record built by
//!   [`record_key::build_key`]
//! - Agent→ENS: the agent's registration file lists an `"ENS"` service
//!   whose endpoint is the name
//!
//! [`verifier::Verifier`] checks both halves concurrently and folds them into
//! an [`attestation::VerificationStatus`].

pub mod agent_card;
pub mod attestation;
pub mod cancel;
pub mod fetch;
pub mod record_key;
pub mod verifier;

pub use agent_card::{RegistrationFile, extract_endpoint};
pub use attestation::{AttestationResult, VerificationStatus, check};
pub use cancel::CancelToken;
pub use fetch::{AgentFileFetcher, FetchError, HttpFetch, ReqwestFetch};
pub use record_key::{TextRecordUpdate, build_key};
pub use verifier::{AgentRegistry, AttestationReport, EnsTextReader, RecordLookup, Verifier};
