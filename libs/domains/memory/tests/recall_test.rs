//! Semantic recall tests.
//!
//! These need a running Qdrant; set QDRANT_URL and drop the #[ignore] to
//! run them locally (`docker run -p 6334:6334 qdrant/qdrant`).

use std::sync::Arc;

use chrono::Utc;
use domain_memory::{
    CostDecision, DecisionOutcome, DeterministicEmbedding, MemoryFilter, SemanticMemory,
};
use domain_telemetry::CloudProvider;
use uuid::Uuid;

fn decision(
    customer_id: Uuid,
    context: &str,
    outcome: DecisionOutcome,
) -> CostDecision {
    CostDecision {
        optimization_id: Uuid::new_v4(),
        customer_id,
        decision_type: "spot_migration".to_string(),
        context: context.to_string(),
        outcome,
        savings_percent: Some(40.0),
        cost_impact: None,
        cloud_provider: CloudProvider::Aws,
        instance_type: Some("m5.xlarge".to_string()),
        workload_characteristics: None,
        lessons_learned: None,
        recorded_at: Utc::now(),
    }
}

#[tokio::test]
#[ignore] // Requires a running Qdrant
async fn test_recall_filters_by_outcome_and_ranks_by_similarity() {
    let url = std::env::var("QDRANT_URL").unwrap_or_else(|_| "http://localhost:6334".to_string());
    let memory = SemanticMemory::connect(&url, Arc::new(DeterministicEmbedding::new()))
        .expect("qdrant connection");
    memory.ensure_collections().await.expect("collections");

    let customer_id = Uuid::new_v4();

    // Two successes with distinct contexts, one failure
    memory
        .record_cost_decision(&decision(
            customer_id,
            "migrated batch ETL pipeline to spot instances with checkpointing enabled",
            DecisionOutcome::Success,
        ))
        .await
        .unwrap();
    memory
        .record_cost_decision(&decision(
            customer_id,
            "right-sized over-provisioned web tier after traffic analysis",
            DecisionOutcome::Success,
        ))
        .await
        .unwrap();
    memory
        .record_cost_decision(&decision(
            customer_id,
            "spot interruption storm broke a stateful training job",
            DecisionOutcome::Failed,
        ))
        .await
        .unwrap();

    let hits = memory
        .search_cost_decisions(
            "migrate batch ETL to spot with checkpointing",
            MemoryFilter::for_customer(customer_id).matching("outcome", "success"),
            10,
        )
        .await
        .unwrap();

    // The failed decision is filtered out; the ETL decision ranks first
    assert_eq!(hits.len(), 2);
    assert!(hits[0].payload.context.contains("batch ETL"));
    assert!(hits[0].score >= hits[1].score);
    assert!(hits
        .iter()
        .all(|h| h.payload.outcome == DecisionOutcome::Success));
}
