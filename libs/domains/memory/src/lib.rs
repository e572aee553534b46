//! Memory Domain
//!
//! Semantic memory over three vector collections: past cost decisions,
//! performance patterns, and customer context. Writes embed a textual
//! summary of the event synchronously; reads return the top-K nearest
//! neighbors with their similarity scores, filtered by payload
//! predicates. Consumers decide the score cutoff.

pub mod embedding;
pub mod error;
pub mod models;
pub mod store;

pub use embedding::{DeterministicEmbedding, EmbeddingProvider, OpenAiEmbedding};
pub use error::{MemoryError, MemoryResult};
pub use models::{
    CostDecision, CustomerContextEntry, DecisionOutcome, PerformancePattern, ScoredHit,
};
pub use store::{MemoryFilter, SemanticMemory, COLLECTIONS};
