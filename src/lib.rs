//! jurischeck: case-law citation verification
//!
//! Extracts citations from free text and confirms them against official
//! registries, returning confidence-scored verification records.
//!
//! Commands:
//! - scan: extract citations
//! - verify: extract and confirm citations
//! - init: write a registry configuration template

pub mod cache;
pub mod config;
pub mod extract;
pub mod init;
pub mod judilibre;
pub mod legifrance;
pub mod matcher;
pub mod registry;
pub mod retry;
pub mod scan;
pub mod schema;
pub mod token;
pub mod verifier;
pub mod verify_refs;

pub use config::{Config, ConfigError, CredentialOverrides, RegistryConfig};
pub use extract::extract_citations;
pub use registry::{RegistryClient, SearchError};
pub use retry::RetryPolicy;
pub use schema::{
    CandidateReference, FailureKind, RegistryResult, SourceFailure, SourceId, VerificationRecord,
    VerificationStatus,
};
pub use verifier::{ServiceSettings, VerificationService};
