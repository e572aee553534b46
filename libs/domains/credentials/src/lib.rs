//! Credentials Domain
//!
//! Encrypted-at-rest per-customer provider credentials plus the metadata
//! the adapters consult (endpoints, metric-name mapping, demo flag).
//!
//! Secret payloads are AES-256-GCM encrypted with a process-level key
//! derived from environment configuration; the decrypted form is only
//! handed to the collection scheduler and never serialized back out.

pub mod crypto;
pub mod entity;
pub mod error;
pub mod handlers;
pub mod models;
pub mod postgres;
pub mod repository;
pub mod service;

pub use crypto::SecretCipher;
pub use error::{CredentialError, CredentialResult};
pub use models::{
    CollectionTuple, CreateCredential, Credential, CredentialMetadata, CredentialSummary,
    DecryptedCredential, UpdateCredential,
};
pub use postgres::PgCredentialRepository;
pub use repository::CredentialRepository;
pub use service::CredentialService;
