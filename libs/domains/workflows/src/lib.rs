//! Workflows Domain
//!
//! The directed-graph executor behind every optimization action. A run
//! goes approval gate → gradual rollout phases → terminal state, with a
//! durable row trail (`workflow_executions`, `workflow_steps`,
//! `workflow_state_transitions`, `workflow_artifacts`) that lets a crashed
//! engine resume from its last completed step.
//!
//! ```text
//!  propose ──► approval gate ──► phase 10% ──► quality check
//!                  │                               │ regression?
//!                  ▼ denied                        ▼ yes
//!               waiting                        rollback (undo, reverse)
//! ```

pub mod engine;
pub mod entity;
pub mod error;
pub mod models;
pub mod postgres;
pub mod repository;

pub use engine::{
    ExecutionReport, PeerApprover, QualityProbe, StepContext, StepOutcome, WorkflowEngine,
    WorkflowStep,
};
pub use error::{WorkflowError, WorkflowResult};
pub use models::{
    RunRequest, StepRecord, StepStatus, WorkflowDefinition, WorkflowExecution, WorkflowStatus,
};
pub use postgres::PgWorkflowRepository;
pub use repository::WorkflowRepository;
