//! Integration tests for the agent runtime against real PostgreSQL.

use std::sync::Arc;
use std::time::Duration;

use domain_agents::{
    AgentLifecycleService, AgentRepository, AgentRunStatus, AgentStatus, AgentType, ApprovalVote,
    CapabilitySpec, ConfigValue, CreateRecommendation, EventLog, OptimizationOutcome,
    OptimizationRepository, PgAgentRepository, PgEventLog, PgOptimizationRepository,
    RecommendationStatus, RegisterAgent,
};
use serde_json::json;
use test_utils::{assertions::assert_some, TestDatabase, TestDataBuilder};

fn register_input(interval_s: i32) -> RegisterAgent {
    RegisterAgent {
        agent_type: AgentType::Cost,
        endpoint: "http://cost-agent:8081".to_string(),
        capabilities: vec![
            CapabilitySpec {
                name: "collect_cost".to_string(),
                version: "1.0".to_string(),
            },
            CapabilitySpec {
                name: "collect_cost".to_string(),
                version: "2.0".to_string(),
            },
        ],
        heartbeat_interval_s: interval_s,
    }
}

#[tokio::test]
async fn test_register_heartbeat_activates() {
    let db = TestDatabase::new().await;
    let repo = Arc::new(PgAgentRepository::new(db.connection()));
    let events = Arc::new(PgEventLog::new(db.connection()));
    let service = AgentLifecycleService::new(repo.clone(), events);

    let agent = service.register(register_input(30)).await.unwrap();
    assert_eq!(agent.status, AgentStatus::Registered);
    // versioned capabilities coexist
    assert_eq!(agent.capabilities.len(), 2);

    let after = service.heartbeat(agent.id).await.unwrap();
    assert_eq!(after.status, AgentStatus::Active);
    assert!(after.last_heartbeat_at.is_some());
}

#[tokio::test]
async fn test_heartbeat_reap_and_recovery() {
    let db = TestDatabase::new().await;
    let repo = Arc::new(PgAgentRepository::new(db.connection()));
    let events = Arc::new(PgEventLog::new(db.connection()));
    let service = AgentLifecycleService::new(repo.clone(), events.clone());

    // 1s interval; suppressing heartbeats past 3x flips to unhealthy
    let agent = service.register(register_input(1)).await.unwrap();
    service.heartbeat(agent.id).await.unwrap();

    tokio::time::sleep(Duration::from_secs(5)).await;

    let reaped = service.reap_stale().await.unwrap();
    assert_eq!(reaped, 1);

    let stale = assert_some(repo.get(agent.id).await.unwrap(), "agent row");
    assert_eq!(stale.status, AgentStatus::Unhealthy);

    // Resumed heartbeat recovers to active
    let recovered = service.heartbeat(agent.id).await.unwrap();
    assert_eq!(recovered.status, AgentStatus::Active);

    let unhealthy_events = events
        .list_recent(None, 50)
        .await
        .unwrap()
        .into_iter()
        .filter(|e| e.event_type == "agent.unhealthy")
        .count();
    assert_eq!(unhealthy_events, 1);
}

#[tokio::test]
async fn test_unregister_is_terminal() {
    let db = TestDatabase::new().await;
    let repo = Arc::new(PgAgentRepository::new(db.connection()));
    let events = Arc::new(PgEventLog::new(db.connection()));
    let service = AgentLifecycleService::new(repo.clone(), events);

    let agent = service.register(register_input(30)).await.unwrap();
    service.unregister(agent.id).await.unwrap();

    let terminated = assert_some(repo.get(agent.id).await.unwrap(), "agent row");
    assert_eq!(terminated.status, AgentStatus::Terminated);

    // A terminated agent cannot heartbeat back to life
    assert!(service.heartbeat(agent.id).await.is_err());
}

#[tokio::test]
async fn test_typed_configs_roundtrip() {
    let db = TestDatabase::new().await;
    let repo = PgAgentRepository::new(db.connection());

    let agent = repo.insert(register_input(30)).await.unwrap();

    repo.set_config(agent.id, "max_parallel", ConfigValue::Int(4))
        .await
        .unwrap();
    repo.set_config(agent.id, "threshold", ConfigValue::Float(0.75))
        .await
        .unwrap();
    repo.set_config(agent.id, "enabled", ConfigValue::Bool(true))
        .await
        .unwrap();

    assert_eq!(
        repo.get_config(agent.id, "max_parallel").await.unwrap(),
        Some(ConfigValue::Int(4))
    );

    // Upsert replaces the value and its type
    repo.set_config(agent.id, "max_parallel", ConfigValue::String("auto".into()))
        .await
        .unwrap();
    assert_eq!(
        repo.get_config(agent.id, "max_parallel").await.unwrap(),
        Some(ConfigValue::String("auto".into()))
    );
}

#[tokio::test]
async fn test_resource_locks_serialize_holders() {
    let db = TestDatabase::new().await;
    let repo = PgAgentRepository::new(db.connection());

    let first = repo.insert(register_input(30)).await.unwrap();
    let second = repo.insert(register_input(30)).await.unwrap();

    assert!(repo.try_acquire_lock(first.id, "fleet/aws").await.unwrap());
    // The same holder can re-enter
    assert!(repo.try_acquire_lock(first.id, "fleet/aws").await.unwrap());
    // A competing agent cannot
    assert!(!repo.try_acquire_lock(second.id, "fleet/aws").await.unwrap());

    repo.release_lock(first.id, "fleet/aws").await.unwrap();
    assert!(repo.try_acquire_lock(second.id, "fleet/aws").await.unwrap());
}

#[tokio::test]
async fn test_run_status_transitions() {
    let db = TestDatabase::new().await;
    let repo = PgAgentRepository::new(db.connection());

    let agent = repo.insert(register_input(30)).await.unwrap();
    for status in [
        AgentRunStatus::Busy,
        AgentRunStatus::Processing,
        AgentRunStatus::Waiting,
        AgentRunStatus::Idle,
    ] {
        repo.set_run_status(agent.id, status).await.unwrap();
    }
}

#[tokio::test]
async fn test_approval_votes_overwrite_per_agent_type() {
    let db = TestDatabase::new().await;
    let builder = TestDataBuilder::from_test_name("approvals");
    let repo = PgOptimizationRepository::new(db.connection());

    let recommendation = repo
        .create_recommendation(CreateRecommendation {
            customer_id: builder.customer_id(),
            agent_type: AgentType::Cost,
            recommendation_type: "spot_migration".to_string(),
            title: "Move batch to spot".to_string(),
            description: String::new(),
            estimated_savings_pct: Some(35.0),
            payload: json!({}),
        })
        .await
        .unwrap();
    assert_eq!(recommendation.status, RecommendationStatus::Pending);

    repo.record_vote(
        recommendation.id,
        ApprovalVote {
            approving_agent_type: AgentType::Performance,
            approved: false,
            confidence: 0.4,
            rationale: "latency risk".to_string(),
        },
    )
    .await
    .unwrap();

    // Re-vote from the same peer overwrites instead of duplicating
    repo.record_vote(
        recommendation.id,
        ApprovalVote {
            approving_agent_type: AgentType::Performance,
            approved: true,
            confidence: 0.92,
            rationale: "re-evaluated".to_string(),
        },
    )
    .await
    .unwrap();

    let votes = repo.list_votes(recommendation.id).await.unwrap();
    assert_eq!(votes.len(), 1);
    assert!(votes[0].approved);
}

#[tokio::test]
async fn test_optimization_links_back_to_recommendation() {
    let db = TestDatabase::new().await;
    let builder = TestDataBuilder::from_test_name("optimizations");
    let repo = PgOptimizationRepository::new(db.connection());

    let recommendation = repo
        .create_recommendation(CreateRecommendation {
            customer_id: builder.customer_id(),
            agent_type: AgentType::Cost,
            recommendation_type: "right_sizing".to_string(),
            title: "Downsize idle workers".to_string(),
            description: String::new(),
            estimated_savings_pct: Some(20.0),
            payload: json!({}),
        })
        .await
        .unwrap();

    let optimization = repo
        .record_optimization(
            recommendation.id,
            OptimizationOutcome::Success,
            json!({ "note": "completed" }),
        )
        .await
        .unwrap();

    // The executed action carries the recommendation's optimization_id
    assert_eq!(optimization.optimization_id, recommendation.optimization_id);

    let updated = assert_some(
        repo.get_recommendation(recommendation.id).await.unwrap(),
        "recommendation",
    );
    assert_eq!(updated.status, RecommendationStatus::Executed);

    // Recording against a missing recommendation is refused
    let missing = repo
        .record_optimization(uuid::Uuid::new_v4(), OptimizationOutcome::Success, json!({}))
        .await;
    assert!(missing.is_err());
}
