//! Collection Domain
//!
//! The provider-agnostic scheduled pipeline: pluggable adapters pull
//! metrics from cloud providers, the scheduler fans out over enabled
//! (customer, provider, data_type) tuples with bounded concurrency, the
//! writer lands rows, and every attempt is recorded in collection history.
//!
//! # Data flow
//!
//! ```text
//! Scheduler ──► AdapterRegistry ──► ProviderAdapter ──► MetricBatch
//!    │                                                     │
//!    ├──► collection_history (audit)                       ▼
//!    └──► collection_cursors (pagination state)      MetricsWriter
//! ```

pub mod adapters;
pub mod error;
pub mod history;
pub mod models;
pub mod scheduler;

pub use adapters::{
    AdapterError, AdapterOutput, AdapterRegistry, CollectContext, ProviderAdapter,
};
pub use error::{CollectionError, CollectionResult};
pub use history::{
    CollectionHistoryRepository, CursorRepository, PgCollectionHistoryRepository,
    PgCursorRepository,
};
pub use models::{
    CollectionRequest, CollectionRunReport, CollectionStatus, CursorState, HistoryRecord,
    TriggerOutcome,
};
pub use scheduler::{CollectionScheduler, ScheduleStatus};
