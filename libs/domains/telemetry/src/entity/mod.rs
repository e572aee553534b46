//! SeaORM entities for the four time-series tables.
//!
//! `collected_at` is set at ingestion time by the writer; `timestamp` is
//! the event time reported by the provider.

pub mod application;
pub mod cost;
pub mod performance;
pub mod resource;
