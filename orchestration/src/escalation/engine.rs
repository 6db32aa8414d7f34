//! Escalation engine — deterministic decision-making for tier routing
//!
//! Consumes DeliveryReports and EscalationState to produce EscalationDecisions.
//! All decisions are deterministic; the engine performs no I/O.

use serde::{Deserialize, Serialize};

use crate::delegation::DeliveryReport;
use crate::escalation::severity::{IssueCategory, Severity};
use crate::escalation::state::{EscalationReason, EscalationState, EscalationTier};

/// Decision produced by the escalation engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationDecision {
    /// Which tier should handle the next attempt.
    pub target_tier: EscalationTier,
    /// Whether this is an escalation (tier changed).
    pub escalated: bool,
    /// Reason for the decision.
    pub reason: String,
    /// Whether the workflow resolved.
    pub resolved: bool,
    /// Whether the workflow is stuck and waiting on a human.
    pub stuck: bool,
    /// Suggested action for the target tier.
    pub action: NextAction,
}

/// Suggested action for the next attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NextAction {
    /// Re-delegate to the same specialist.
    Retry,
    /// Convene the route's secondary agents alongside the primary.
    CoordinateAgents,
    /// The orchestrator handles the event herself.
    OrchestratorTakeover,
    /// Create a blocking task for staff.
    FlagForHuman { reason: String },
    /// Workflow done, close it out.
    Close,
}

/// Configuration for the escalation engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationConfig {
    /// Consecutive same-category failures before escalating a tier.
    pub repeat_threshold: u32,
    /// Total failures across tiers before escalating a tier.
    pub failure_threshold: u32,
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            repeat_threshold: 2,
            failure_threshold: 3,
        }
    }
}

/// The escalation engine — a deterministic state machine over tiers
pub struct EscalationEngine {
    config: EscalationConfig,
}

impl EscalationEngine {
    /// Create a new engine with default config.
    pub fn new() -> Self {
        Self {
            config: EscalationConfig::default(),
        }
    }

    /// Create with custom config.
    pub fn with_config(config: EscalationConfig) -> Self {
        Self { config }
    }

    /// Process a delivery report and produce a decision.
    ///
    /// Records the attempt in `state`, then deterministically decides whether
    /// to retry, escalate, take over, flag a human, or close.
    pub fn decide(&self, state: &mut EscalationState, report: &DeliveryReport) -> EscalationDecision {
        let category = report.outcome.category();
        state.record_attempt(report.agent, category, report.outcome.is_completed());

        if report.outcome.is_completed() {
            return EscalationDecision {
                target_tier: state.current_tier,
                escalated: false,
                reason: format!("{} completed delivery", report.agent),
                resolved: true,
                stuck: false,
                action: NextAction::Close,
            };
        }

        // Failed attempt from here on; category is always present.
        let category = category.unwrap_or(IssueCategory::Unknown);

        // Critical issues jump straight to the orchestrator tier; at the
        // orchestrator tier they fall through to the human path below.
        if category.severity() == Severity::Critical
            && state.current_tier.level() < EscalationTier::Orchestrator.level()
        {
            let reason = EscalationReason::CriticalSeverity { category };
            state.record_escalation(EscalationTier::Orchestrator, reason.clone());
            return EscalationDecision {
                target_tier: EscalationTier::Orchestrator,
                escalated: true,
                reason: format!("Escalating: {reason}"),
                resolved: false,
                stuck: false,
                action: NextAction::OrchestratorTakeover,
            };
        }

        match state.current_tier {
            EscalationTier::Specialist => self.decide_at_tier(
                state,
                EscalationTier::Coordinated,
                NextAction::CoordinateAgents,
                NextAction::Retry,
            ),
            EscalationTier::Coordinated => self.decide_at_tier(
                state,
                EscalationTier::Orchestrator,
                NextAction::OrchestratorTakeover,
                NextAction::CoordinateAgents,
            ),
            EscalationTier::Orchestrator => self.flag_for_human(
                state,
                format!("orchestrator tier failed: {category}"),
            ),
            EscalationTier::Human => self.flag_for_human(
                state,
                "workflow already requires human intervention".to_string(),
            ),
        }
    }

    /// Shared failure handling for the two escalatable tiers.
    fn decide_at_tier(
        &self,
        state: &mut EscalationState,
        next_tier: EscalationTier,
        escalate_action: NextAction,
        continue_action: NextAction,
    ) -> EscalationDecision {
        // Trigger 1: same category repeated
        if let Some((category, count)) = state.most_repeated_category() {
            if count >= self.config.repeat_threshold {
                let reason = EscalationReason::RepeatedCategory { category, count };
                state.record_escalation(next_tier, reason.clone());
                return EscalationDecision {
                    target_tier: next_tier,
                    escalated: true,
                    reason: format!("Escalating: {reason}"),
                    resolved: false,
                    stuck: false,
                    action: escalate_action,
                };
            }
        }

        // Trigger 2: total failures exceeded
        if state.total_failures() > self.config.failure_threshold {
            let reason = EscalationReason::TotalFailuresExceeded {
                count: state.total_failures(),
                threshold: self.config.failure_threshold,
            };
            state.record_escalation(next_tier, reason.clone());
            return EscalationDecision {
                target_tier: next_tier,
                escalated: true,
                reason: format!("Escalating: {reason}"),
                resolved: false,
                stuck: false,
                action: escalate_action,
            };
        }

        // Trigger 3: tier budget exhausted
        if state.remaining_budget(state.current_tier) == 0 {
            let reason = EscalationReason::BudgetExhausted {
                tier: state.current_tier,
            };
            state.record_escalation(next_tier, reason.clone());
            return EscalationDecision {
                target_tier: next_tier,
                escalated: true,
                reason: format!("Escalating: {reason}"),
                resolved: false,
                stuck: false,
                action: escalate_action,
            };
        }

        // No trigger fired — stay at the current tier.
        EscalationDecision {
            target_tier: state.current_tier,
            escalated: false,
            reason: format!(
                "Continuing at {} ({} attempts remaining)",
                state.current_tier,
                state.remaining_budget(state.current_tier)
            ),
            resolved: false,
            stuck: false,
            action: continue_action,
        }
    }

    /// Terminal path: mark stuck and hand off to staff.
    fn flag_for_human(&self, state: &mut EscalationState, why: String) -> EscalationDecision {
        let escalated = state.current_tier != EscalationTier::Human;
        if escalated {
            state.record_escalation(
                EscalationTier::Human,
                EscalationReason::Explicit { reason: why.clone() },
            );
        }
        state.stuck = true;
        EscalationDecision {
            target_tier: EscalationTier::Human,
            escalated,
            reason: format!("Stuck: {why}"),
            resolved: false,
            stuck: true,
            action: NextAction::FlagForHuman {
                reason: format!("Workflow {} stuck: {why}", state.workflow_id),
            },
        }
    }
}

impl Default for EscalationEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::AgentId;

    fn failed_report(category: IssueCategory) -> DeliveryReport {
        DeliveryReport::failed(AgentId::Nyra, "ev-1", "wf-1", category, "boom", 25)
    }

    fn completed_report() -> DeliveryReport {
        DeliveryReport::completed(AgentId::Nyra, "ev-1", "wf-1", 18)
    }

    #[test]
    fn test_completion_closes() {
        let engine = EscalationEngine::new();
        let mut state = EscalationState::new("wf-1");

        let d = engine.decide(&mut state, &completed_report());
        assert!(d.resolved);
        assert!(!d.stuck);
        assert!(matches!(d.action, NextAction::Close));
        assert!(state.resolved);
    }

    #[test]
    fn test_repeated_category_escalates_to_coordinated() {
        let engine = EscalationEngine::new();
        let mut state = EscalationState::new("wf-2");

        let d1 = engine.decide(&mut state, &failed_report(IssueCategory::AgentTimeout));
        assert_eq!(d1.target_tier, EscalationTier::Specialist);
        assert!(!d1.escalated);
        assert!(matches!(d1.action, NextAction::Retry));

        let d2 = engine.decide(&mut state, &failed_report(IssueCategory::AgentTimeout));
        assert_eq!(d2.target_tier, EscalationTier::Coordinated);
        assert!(d2.escalated);
        assert!(matches!(d2.action, NextAction::CoordinateAgents));
    }

    #[test]
    fn test_total_failures_escalates() {
        let config = EscalationConfig {
            repeat_threshold: 10,
            failure_threshold: 2,
        };
        let engine = EscalationEngine::with_config(config);
        let mut state = EscalationState::new("wf-3");

        // Alternate categories so the repeat trigger never fires.
        let cats = [
            IssueCategory::AgentTimeout,
            IssueCategory::InvalidPayload,
            IssueCategory::AgentRejected,
        ];

        let mut escalated = false;
        for cat in cats {
            let d = engine.decide(&mut state, &failed_report(cat));
            if d.escalated {
                assert_eq!(d.target_tier, EscalationTier::Coordinated);
                escalated = true;
                break;
            }
        }
        assert!(escalated, "expected escalation after repeated failures");
    }

    #[test]
    fn test_budget_exhaustion_escalates() {
        let config = EscalationConfig {
            repeat_threshold: 100,
            failure_threshold: 100,
        };
        let engine = EscalationEngine::with_config(config);
        let mut state = EscalationState::new("wf-4");

        // Specialist budget is 3; the third failed attempt exhausts it.
        let cats = [
            IssueCategory::AgentTimeout,
            IssueCategory::InvalidPayload,
            IssueCategory::AgentRejected,
        ];
        let mut last = None;
        for cat in cats {
            last = Some(engine.decide(&mut state, &failed_report(cat)));
        }
        let d = last.unwrap();
        assert!(d.escalated);
        assert_eq!(d.target_tier, EscalationTier::Coordinated);
    }

    #[test]
    fn test_critical_jumps_to_orchestrator() {
        let engine = EscalationEngine::new();
        let mut state = EscalationState::new("wf-5");

        let d = engine.decide(&mut state, &failed_report(IssueCategory::HubUnavailable));
        assert!(d.escalated);
        assert_eq!(d.target_tier, EscalationTier::Orchestrator);
        assert!(matches!(d.action, NextAction::OrchestratorTakeover));
    }

    #[test]
    fn test_orchestrator_failure_flags_human() {
        let engine = EscalationEngine::new();
        let mut state = EscalationState::new("wf-6");
        state.record_escalation(
            EscalationTier::Orchestrator,
            EscalationReason::Explicit {
                reason: "test setup".into(),
            },
        );

        let d = engine.decide(&mut state, &failed_report(IssueCategory::AgentRejected));
        assert!(d.stuck);
        assert_eq!(d.target_tier, EscalationTier::Human);
        assert!(matches!(d.action, NextAction::FlagForHuman { .. }));
        assert!(state.stuck);
    }

    #[test]
    fn test_full_ladder_to_human() {
        // Timeouts all the way: specialist → coordinated → orchestrator → human.
        let engine = EscalationEngine::new();
        let mut state = EscalationState::new("wf-7");

        let mut tiers_seen = vec![state.current_tier];
        for _ in 0..8 {
            let d = engine.decide(&mut state, &failed_report(IssueCategory::AgentTimeout));
            if d.escalated {
                tiers_seen.push(d.target_tier);
            }
            if d.stuck {
                break;
            }
        }
        assert_eq!(
            tiers_seen,
            vec![
                EscalationTier::Specialist,
                EscalationTier::Coordinated,
                EscalationTier::Orchestrator,
                EscalationTier::Human,
            ]
        );
        assert!(state.stuck);
    }

    #[test]
    fn test_decision_serializes() {
        let d = EscalationDecision {
            target_tier: EscalationTier::Human,
            escalated: true,
            reason: "stuck".into(),
            resolved: false,
            stuck: true,
            action: NextAction::FlagForHuman {
                reason: "needs staff".into(),
            },
        };
        let json = serde_json::to_string(&d).unwrap();
        assert!(json.contains("flag_for_human"), "JSON: {json}");
    }
}
