//! The multi-agent approval policy.
//!
//! A proposal proceeds when no peer rejects it AND the mean confidence
//! across votes reaches the threshold. Anything else pauses the workflow
//! and surfaces to the orchestrator for a human decision.

use crate::models::ApprovalVote;
use serde::Serialize;
use utoipa::ToSchema;

/// Outcome of evaluating peer votes
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ApprovalDecision {
    pub proceed: bool,
    pub mean_confidence: f64,
    pub rejections: Vec<String>,
    pub votes_cast: usize,
    pub detail: String,
}

/// Approval policy: no rejections AND mean confidence >= threshold
#[derive(Debug, Clone, Copy)]
pub struct ApprovalPolicy {
    pub min_mean_confidence: f64,
}

impl ApprovalPolicy {
    pub fn new(min_mean_confidence: f64) -> Self {
        Self {
            min_mean_confidence,
        }
    }

    pub fn evaluate(&self, votes: &[ApprovalVote]) -> ApprovalDecision {
        if votes.is_empty() {
            return ApprovalDecision {
                proceed: false,
                mean_confidence: 0.0,
                rejections: Vec::new(),
                votes_cast: 0,
                detail: "no votes cast".to_string(),
            };
        }

        let rejections: Vec<String> = votes
            .iter()
            .filter(|v| !v.approved)
            .map(|v| format!("{}: {}", v.approving_agent_type, v.rationale))
            .collect();

        let mean_confidence =
            votes.iter().map(|v| v.confidence).sum::<f64>() / votes.len() as f64;

        let proceed = rejections.is_empty() && mean_confidence >= self.min_mean_confidence;

        let detail = if !rejections.is_empty() {
            format!("{} peer(s) rejected", rejections.len())
        } else if mean_confidence < self.min_mean_confidence {
            format!(
                "mean confidence {:.2} below threshold {:.2}",
                mean_confidence, self.min_mean_confidence
            )
        } else {
            "approved".to_string()
        };

        ApprovalDecision {
            proceed,
            mean_confidence,
            rejections,
            votes_cast: votes.len(),
            detail,
        }
    }
}

impl Default for ApprovalPolicy {
    fn default() -> Self {
        Self {
            min_mean_confidence: 0.75,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AgentType;

    fn vote(agent_type: AgentType, approved: bool, confidence: f64) -> ApprovalVote {
        ApprovalVote {
            approving_agent_type: agent_type,
            approved,
            confidence,
            rationale: String::new(),
        }
    }

    #[test]
    fn test_unanimous_high_confidence_proceeds() {
        let policy = ApprovalPolicy::default();
        let votes = vec![
            vote(AgentType::Performance, true, 0.92),
            vote(AgentType::Resource, true, 0.95),
            vote(AgentType::Application, true, 0.90),
        ];

        let decision = policy.evaluate(&votes);
        assert!(decision.proceed);
        assert!((decision.mean_confidence - 0.9233).abs() < 0.001);
    }

    #[test]
    fn test_single_rejection_blocks() {
        let policy = ApprovalPolicy::default();
        let votes = vec![
            vote(AgentType::Performance, true, 0.92),
            vote(AgentType::Resource, true, 0.95),
            vote(AgentType::Application, false, 0.4),
        ];

        let decision = policy.evaluate(&votes);
        assert!(!decision.proceed);
        assert_eq!(decision.rejections.len(), 1);
    }

    #[test]
    fn test_low_mean_confidence_blocks_even_unanimous() {
        let policy = ApprovalPolicy::default();
        let votes = vec![
            vote(AgentType::Performance, true, 0.6),
            vote(AgentType::Resource, true, 0.7),
            vote(AgentType::Application, true, 0.65),
        ];

        let decision = policy.evaluate(&votes);
        assert!(!decision.proceed);
        assert!(decision.detail.contains("below threshold"));
    }

    #[test]
    fn test_exact_threshold_proceeds() {
        let policy = ApprovalPolicy::default();
        let votes = vec![
            vote(AgentType::Performance, true, 0.75),
            vote(AgentType::Resource, true, 0.75),
        ];

        assert!(policy.evaluate(&votes).proceed);
    }

    #[test]
    fn test_no_votes_blocks() {
        let decision = ApprovalPolicy::default().evaluate(&[]);
        assert!(!decision.proceed);
        assert_eq!(decision.votes_cast, 0);
    }
}
