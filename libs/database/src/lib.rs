//! Database connectivity for the platform.
//!
//! The relational and time-series stores both live in PostgreSQL, reached
//! through SeaORM. This crate owns connection pooling, startup retry, and
//! health probes; schema lives in the `migration` crate and data access in
//! the domain crates.

pub mod common;
pub mod postgres;

pub use common::{retry, retry_with_backoff, DatabaseError, RetryConfig};
