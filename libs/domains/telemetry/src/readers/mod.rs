//! Read facades over the time-series store.
//!
//! One reader per data type; every surface takes `(customer_id, provider,
//! time window)` and returns scalars, flat row lists, or hourly-bucketed
//! trends. Readers never mutate, and every float leaving a reader is
//! sanitized: the store can surface NaN/Inf from division-by-zero
//! aggregates, and those must not reach an HTTP response.

pub mod application;
pub mod cost;
pub mod performance;
pub mod resource;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Coerce non-finite values to zero at the reader boundary
pub fn sanitize_f64(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}

/// One hourly bucket of a trend query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TrendPoint {
    pub bucket: DateTime<Utc>,
    pub value: f64,
}

impl TrendPoint {
    pub fn new(bucket: DateTime<Utc>, value: f64) -> Self {
        Self {
            bucket,
            value: sanitize_f64(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_f64() {
        assert_eq!(sanitize_f64(1.5), 1.5);
        assert_eq!(sanitize_f64(f64::NAN), 0.0);
        assert_eq!(sanitize_f64(f64::INFINITY), 0.0);
        assert_eq!(sanitize_f64(f64::NEG_INFINITY), 0.0);
    }

    #[test]
    fn test_trend_point_sanitizes() {
        let point = TrendPoint::new(Utc::now(), f64::NAN);
        assert_eq!(point.value, 0.0);
    }
}
