//! Agents Domain
//!
//! The shared runtime contract every agent implements: lifecycle
//! registration and heartbeat, config/state/capability/metric tables, the
//! durable event log, and the recommendation → approval → optimization
//! flow with its confidence policy.
//!
//! Two state machines live here:
//!
//! ```text
//! agents.status:        registered → active ⇄ unhealthy → terminated
//! agent_states.status:  idle → busy → processing ⇄ waiting → idle | error
//! ```

pub mod approval;
pub mod entity;
pub mod error;
pub mod models;
pub mod postgres;
pub mod repository;
pub mod service;

pub use approval::{ApprovalDecision, ApprovalPolicy};
pub use error::{AgentError, AgentResult};
pub use models::{
    Agent, AgentRunStatus, AgentStatus, AgentType, ApprovalVote, CapabilitySpec, ConfigValue,
    ConfigValueType, CreateRecommendation, Event, MetricKind, Optimization, OptimizationOutcome,
    Recommendation, RecommendationStatus, RegisterAgent,
};
pub use postgres::{PgAgentRepository, PgEventLog, PgOptimizationRepository};
pub use repository::{AgentRepository, EventLog, OptimizationRepository};
pub use service::AgentLifecycleService;
