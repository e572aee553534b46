//! Qdrant-backed semantic memory store.

use std::sync::Arc;

use qdrant_client::qdrant::{
    Condition, CreateCollectionBuilder, Distance, Filter, PointStruct, SearchPointsBuilder,
    UpsertPointsBuilder, VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::embedding::EmbeddingProvider;
use crate::error::{MemoryError, MemoryResult};
use crate::models::{CostDecision, CustomerContextEntry, PerformancePattern, ScoredHit};

/// The three memory collections
pub const COLLECTIONS: [&str; 3] = [
    "cost_optimization_knowledge",
    "performance_patterns",
    "customer_context",
];

/// Payload predicates applied server-side during search
#[derive(Debug, Clone, Default)]
pub struct MemoryFilter {
    pub customer_id: Option<Uuid>,
    /// Exact-match keyword predicates on payload fields
    pub must_match: Vec<(String, String)>,
}

impl MemoryFilter {
    pub fn for_customer(customer_id: Uuid) -> Self {
        Self {
            customer_id: Some(customer_id),
            must_match: Vec::new(),
        }
    }

    pub fn matching(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.must_match.push((field.into(), value.into()));
        self
    }

    fn into_qdrant(self) -> Option<Filter> {
        let mut conditions = Vec::new();
        if let Some(customer_id) = self.customer_id {
            conditions.push(Condition::matches(
                "customer_id",
                customer_id.to_string(),
            ));
        }
        for (field, value) in self.must_match {
            conditions.push(Condition::matches(field, value));
        }

        if conditions.is_empty() {
            None
        } else {
            Some(Filter::must(conditions))
        }
    }
}

/// Semantic memory over the three collections. Writes embed a textual
/// summary synchronously; reads return the top-K neighbors with scores.
pub struct SemanticMemory {
    client: Qdrant,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl SemanticMemory {
    pub fn connect(url: &str, embedder: Arc<dyn EmbeddingProvider>) -> MemoryResult<Self> {
        let client = Qdrant::from_url(url).build()?;
        Ok(Self { client, embedder })
    }

    /// Create the three collections if they don't exist yet. Called once
    /// at startup.
    pub async fn ensure_collections(&self) -> MemoryResult<()> {
        for name in COLLECTIONS {
            if self.client.collection_exists(name).await? {
                continue;
            }

            self.client
                .create_collection(
                    CreateCollectionBuilder::new(name).vectors_config(
                        VectorParamsBuilder::new(self.embedder.dimension(), Distance::Cosine),
                    ),
                )
                .await?;

            info!(collection = name, "Created memory collection");
        }
        Ok(())
    }

    /// Store a past cost decision; returns the point id
    pub async fn record_cost_decision(&self, decision: &CostDecision) -> MemoryResult<Uuid> {
        self.upsert("cost_optimization_knowledge", &decision.summary(), decision)
            .await
    }

    /// Store a performance pattern; returns the point id
    pub async fn record_performance_pattern(
        &self,
        pattern: &PerformancePattern,
    ) -> MemoryResult<Uuid> {
        self.upsert("performance_patterns", &pattern.summary(), pattern)
            .await
    }

    /// Store a customer-context fact; returns the point id
    pub async fn record_customer_context(
        &self,
        entry: &CustomerContextEntry,
    ) -> MemoryResult<Uuid> {
        self.upsert("customer_context", &entry.summary(), entry).await
    }

    /// Recall past cost decisions similar to the query text
    pub async fn search_cost_decisions(
        &self,
        query: &str,
        filter: MemoryFilter,
        limit: u64,
    ) -> MemoryResult<Vec<ScoredHit<CostDecision>>> {
        self.search("cost_optimization_knowledge", query, filter, limit)
            .await
    }

    /// Recall performance patterns similar to the query text
    pub async fn search_performance_patterns(
        &self,
        query: &str,
        filter: MemoryFilter,
        limit: u64,
    ) -> MemoryResult<Vec<ScoredHit<PerformancePattern>>> {
        self.search("performance_patterns", query, filter, limit)
            .await
    }

    /// Recall customer context similar to the query text
    pub async fn search_customer_context(
        &self,
        query: &str,
        filter: MemoryFilter,
        limit: u64,
    ) -> MemoryResult<Vec<ScoredHit<CustomerContextEntry>>> {
        self.search("customer_context", query, filter, limit).await
    }

    async fn upsert<T: Serialize>(
        &self,
        collection: &str,
        summary: &str,
        payload: &T,
    ) -> MemoryResult<Uuid> {
        let vector = self.embedder.embed(summary).await?;
        let point_id = Uuid::new_v4();

        let payload_value = serde_json::to_value(payload)?;
        let payload = Payload::try_from(payload_value)
            .map_err(|e| MemoryError::Store(format!("payload conversion: {e}")))?;

        let point = PointStruct::new(point_id.to_string(), vector, payload);

        self.client
            .upsert_points(UpsertPointsBuilder::new(collection, vec![point]).wait(true))
            .await?;

        debug!(collection = collection, point_id = %point_id, "Memory point stored");
        Ok(point_id)
    }

    async fn search<T: DeserializeOwned>(
        &self,
        collection: &str,
        query: &str,
        filter: MemoryFilter,
        limit: u64,
    ) -> MemoryResult<Vec<ScoredHit<T>>> {
        let vector = self.embedder.embed(query).await?;

        let mut builder =
            SearchPointsBuilder::new(collection, vector, limit).with_payload(true);
        if let Some(filter) = filter.into_qdrant() {
            builder = builder.filter(filter);
        }

        let response = self.client.search_points(builder).await?;

        let mut hits = Vec::with_capacity(response.result.len());
        for point in response.result {
            let point_id = point
                .id
                .as_ref()
                .and_then(|id| id.point_id_options.as_ref())
                .and_then(|options| match options {
                    qdrant_client::qdrant::point_id::PointIdOptions::Uuid(s) => {
                        Uuid::parse_str(s).ok()
                    }
                    qdrant_client::qdrant::point_id::PointIdOptions::Num(_) => None,
                })
                .unwrap_or_default();

            let payload_value = serde_json::to_value(
                point
                    .payload
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone().into_json()))
                    .collect::<serde_json::Map<String, serde_json::Value>>(),
            )?;

            match serde_json::from_value::<T>(payload_value) {
                Ok(payload) => hits.push(ScoredHit {
                    point_id,
                    score: point.score,
                    payload,
                }),
                Err(e) => {
                    // Obsolete payload shapes are skipped, not fatal
                    debug!(collection = collection, error = %e, "Skipping undecodable memory point");
                }
            }
        }

        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_builds_conditions() {
        let customer_id = Uuid::new_v4();
        let filter = MemoryFilter::for_customer(customer_id)
            .matching("outcome", "success")
            .into_qdrant()
            .unwrap();
        assert_eq!(filter.must.len(), 2);
    }

    #[test]
    fn test_empty_filter_is_none() {
        assert!(MemoryFilter::default().into_qdrant().is_none());
    }
}
