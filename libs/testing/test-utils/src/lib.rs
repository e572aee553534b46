//! Shared test utilities for domain testing
//!
//! - `TestDatabase`: PostgreSQL container with migrations applied
//! - `TestDataBuilder`: deterministic test data generation
//! - `assertions`: custom assertion helpers
//!
//! # Usage
//!
//! ```rust,no_run
//! use test_utils::{TestDatabase, TestDataBuilder};
//!
//! # async fn example() {
//! let db = TestDatabase::new().await;
//! let builder = TestDataBuilder::from_test_name("my_test");
//!
//! let customer_id = builder.customer_id();
//! let name = builder.name("credential", "primary");
//! # }
//! ```

pub mod postgres;

pub use postgres::TestDatabase;

use uuid::Uuid;

/// Deterministic test data generation seeded from the test name.
///
/// The same test name always produces the same ids, which keeps failures
/// reproducible and log output greppable.
pub struct TestDataBuilder {
    seed: String,
}

impl TestDataBuilder {
    pub fn from_test_name(test_name: &str) -> Self {
        Self {
            seed: test_name.to_string(),
        }
    }

    /// Deterministic customer id for this test
    pub fn customer_id(&self) -> Uuid {
        Uuid::new_v5(
            &Uuid::NAMESPACE_OID,
            format!("{}/customer", self.seed).as_bytes(),
        )
    }

    /// Deterministic id for an arbitrary entity label
    pub fn id(&self, label: &str) -> Uuid {
        Uuid::new_v5(
            &Uuid::NAMESPACE_OID,
            format!("{}/{}", self.seed, label).as_bytes(),
        )
    }

    /// Deterministic, test-scoped name
    pub fn name(&self, kind: &str, suffix: &str) -> String {
        format!("{}-{}-{}", self.seed, kind, suffix)
    }
}

/// Custom assertion helpers
pub mod assertions {
    use uuid::Uuid;

    /// Unwrap an Option with a labelled panic message
    pub fn assert_some<T>(value: Option<T>, label: &str) -> T {
        match value {
            Some(value) => value,
            None => panic!("expected Some: {label}"),
        }
    }

    /// Compare two uuids with a labelled message
    pub fn assert_uuid_eq(left: Uuid, right: Uuid, label: &str) {
        assert_eq!(left, right, "uuid mismatch: {label}");
    }

    /// Assert a float is within epsilon of the expectation
    pub fn assert_close(actual: f64, expected: f64, epsilon: f64, label: &str) {
        assert!(
            (actual - expected).abs() <= epsilon,
            "{label}: {actual} not within {epsilon} of {expected}"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_is_deterministic() {
        let a = TestDataBuilder::from_test_name("some_test");
        let b = TestDataBuilder::from_test_name("some_test");
        assert_eq!(a.customer_id(), b.customer_id());
        assert_eq!(a.id("agent"), b.id("agent"));
    }

    #[test]
    fn test_builder_differs_across_tests() {
        let a = TestDataBuilder::from_test_name("test_a");
        let b = TestDataBuilder::from_test_name("test_b");
        assert_ne!(a.customer_id(), b.customer_id());
    }
}
