//! Telemetry Domain
//!
//! The cross-store data model for the time-series side of the platform:
//! typed metric rows for the four data types, the idempotent batched
//! writer, and one read facade per domain.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐
//! │    Writer    │   │   Readers    │  ← one per data type
//! └──────┬───────┘   └──────┬───────┘
//!        │                  │
//! ┌──────▼──────────────────▼───────┐
//! │      Entities (SeaORM)          │  ← cost/performance/resource/application
//! └─────────────────────────────────┘
//! ```
//!
//! Adapters produce rows, the writer lands them, readers aggregate them.
//! Nothing else touches the metrics tables.

pub mod entity;
pub mod error;
pub mod models;
pub mod readers;
pub mod writer;

// Re-export commonly used types
pub use error::{TelemetryError, TelemetryResult};
pub use models::{
    ApplicationMetricRow, CloudProvider, CostMetricRow, DataType, MetricBatch,
    PerformanceMetricRow, ResourceMetricRow, TimeWindow,
};
pub use readers::{
    application::{ApplicationReader, ApplicationSummary, PgApplicationReader},
    cost::{CostReader, CostSummary, PgCostReader},
    performance::{PerformanceReader, PerformanceSummary, PgPerformanceReader},
    resource::{PgResourceReader, ResourceReader, ResourceSummary},
    sanitize_f64, TrendPoint,
};
pub use writer::{MetricsWriter, PgMetricsWriter, WriteOutcome};
