//! Escalation state — tracks delivery attempts and tier budgets per workflow

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::escalation::severity::IssueCategory;
use crate::registry::AgentId;

/// The four escalation tiers of the network.
///
/// An issue starts at the Specialist tier and moves up as delivery keeps
/// failing; the Human tier is terminal and always requires intervention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationTier {
    /// Tier 1 — a single specialist agent handles the event.
    Specialist,
    /// Tier 2 — multiple agents coordinate on the event.
    Coordinated,
    /// Tier 3 — the orchestrator takes the event over herself.
    Orchestrator,
    /// Tier 4 — mandatory human intervention.
    Human,
}

impl EscalationTier {
    /// Default delivery-attempt budget for this tier per workflow.
    pub fn default_budget(&self) -> TierBudget {
        match self {
            Self::Specialist => TierBudget { max_attempts: 3 },
            Self::Coordinated => TierBudget { max_attempts: 2 },
            Self::Orchestrator => TierBudget { max_attempts: 1 },
            // Human handling is not attempt-bounded.
            Self::Human => TierBudget { max_attempts: u32::MAX },
        }
    }

    /// The next tier up, if any.
    pub fn next(&self) -> Option<EscalationTier> {
        match self {
            Self::Specialist => Some(Self::Coordinated),
            Self::Coordinated => Some(Self::Orchestrator),
            Self::Orchestrator => Some(Self::Human),
            Self::Human => None,
        }
    }

    /// Numeric level (1-4) as used in runbooks.
    pub fn level(&self) -> u8 {
        match self {
            Self::Specialist => 1,
            Self::Coordinated => 2,
            Self::Orchestrator => 3,
            Self::Human => 4,
        }
    }
}

impl std::fmt::Display for EscalationTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Specialist => write!(f, "specialist"),
            Self::Coordinated => write!(f, "coordinated"),
            Self::Orchestrator => write!(f, "orchestrator"),
            Self::Human => write!(f, "human"),
        }
    }
}

/// Budget limits per tier per workflow
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TierBudget {
    /// Maximum delivery attempts at this tier.
    pub max_attempts: u32,
}

/// Record of a single delivery attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptRecord {
    /// Which attempt this was (1-indexed, across all tiers).
    pub attempt: u32,
    /// Which tier the attempt ran at.
    pub tier: EscalationTier,
    /// Which agent handled the attempt.
    pub agent: AgentId,
    /// Timestamp.
    pub timestamp: DateTime<Utc>,
    /// Failure category, if the attempt failed.
    pub category: Option<IssueCategory>,
    /// Whether the attempt completed successfully.
    pub completed: bool,
}

/// Record of an escalation event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationRecord {
    pub from_tier: EscalationTier,
    pub to_tier: EscalationTier,
    pub reason: EscalationReason,
    pub timestamp: DateTime<Utc>,
    pub at_attempt: u32,
}

/// Reasons for escalation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationReason {
    /// Same issue category repeated N times in a row.
    RepeatedCategory { category: IssueCategory, count: u32 },
    /// Total failed attempts exceeded threshold.
    TotalFailuresExceeded { count: u32, threshold: u32 },
    /// Tier attempt budget exhausted.
    BudgetExhausted { tier: EscalationTier },
    /// A critical-severity issue jumps tiers.
    CriticalSeverity { category: IssueCategory },
    /// Explicit escalation requested by an agent.
    Explicit { reason: String },
}

impl std::fmt::Display for EscalationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RepeatedCategory { category, count } => {
                write!(f, "{category} repeated {count}x")
            }
            Self::TotalFailuresExceeded { count, threshold } => {
                write!(f, "{count} failures (threshold: {threshold})")
            }
            Self::BudgetExhausted { tier } => write!(f, "{tier} budget exhausted"),
            Self::CriticalSeverity { category } => write!(f, "critical issue: {category}"),
            Self::Explicit { reason } => write!(f, "explicit: {reason}"),
        }
    }
}

/// Full escalation state for a single workflow instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationState {
    /// Workflow instance being tracked.
    pub workflow_id: String,
    /// Current active tier.
    pub current_tier: EscalationTier,
    /// Total attempt count across all tiers.
    pub total_attempts: u32,
    /// Attempts spent at each tier.
    pub tier_attempts: HashMap<EscalationTier, u32>,
    /// Budget for each tier.
    pub tier_budgets: HashMap<EscalationTier, TierBudget>,
    /// History of all attempts.
    pub attempt_history: Vec<AttemptRecord>,
    /// History of escalation events.
    pub escalation_history: Vec<EscalationRecord>,
    /// Whether the workflow resolved (an attempt completed).
    pub resolved: bool,
    /// Whether the workflow is stuck and waiting on a human.
    pub stuck: bool,
    /// Timestamp of last activity.
    pub last_activity: DateTime<Utc>,
}

impl EscalationState {
    /// Create a new escalation state for a workflow.
    pub fn new(workflow_id: impl Into<String>) -> Self {
        let mut tier_budgets = HashMap::new();
        for tier in [
            EscalationTier::Specialist,
            EscalationTier::Coordinated,
            EscalationTier::Orchestrator,
            EscalationTier::Human,
        ] {
            tier_budgets.insert(tier, tier.default_budget());
        }

        Self {
            workflow_id: workflow_id.into(),
            current_tier: EscalationTier::Specialist,
            total_attempts: 0,
            tier_attempts: HashMap::new(),
            tier_budgets,
            attempt_history: Vec::new(),
            escalation_history: Vec::new(),
            resolved: false,
            stuck: false,
            last_activity: Utc::now(),
        }
    }

    /// Record a delivery attempt at the current tier.
    pub fn record_attempt(
        &mut self,
        agent: AgentId,
        category: Option<IssueCategory>,
        completed: bool,
    ) {
        self.total_attempts += 1;
        *self.tier_attempts.entry(self.current_tier).or_insert(0) += 1;

        self.attempt_history.push(AttemptRecord {
            attempt: self.total_attempts,
            tier: self.current_tier,
            agent,
            timestamp: Utc::now(),
            category,
            completed,
        });

        if completed {
            self.resolved = true;
        }
        self.last_activity = Utc::now();
    }

    /// Record an escalation to another tier.
    pub fn record_escalation(&mut self, to_tier: EscalationTier, reason: EscalationReason) {
        self.escalation_history.push(EscalationRecord {
            from_tier: self.current_tier,
            to_tier,
            reason,
            timestamp: Utc::now(),
            at_attempt: self.total_attempts,
        });
        self.current_tier = to_tier;
        self.last_activity = Utc::now();
    }

    /// Remaining attempt budget for a tier.
    pub fn remaining_budget(&self, tier: EscalationTier) -> u32 {
        let budget = self
            .tier_budgets
            .get(&tier)
            .map(|b| b.max_attempts)
            .unwrap_or(0);
        let used = self.tier_attempts.get(&tier).copied().unwrap_or(0);
        budget.saturating_sub(used)
    }

    /// How many times the given category repeated in the most recent
    /// consecutive failed attempts.
    pub fn category_repeat_count(&self, category: IssueCategory) -> u32 {
        self.attempt_history
            .iter()
            .rev()
            .take_while(|r| r.category == Some(category))
            .count() as u32
    }

    /// The category of the latest attempt, if it repeats at least twice.
    pub fn most_repeated_category(&self) -> Option<(IssueCategory, u32)> {
        let last = self.attempt_history.last()?.category?;
        let count = self.category_repeat_count(last);
        if count >= 2 {
            Some((last, count))
        } else {
            None
        }
    }

    /// Total failed attempts across all tiers.
    pub fn total_failures(&self) -> u32 {
        self.attempt_history.iter().filter(|r| !r.completed).count() as u32
    }

    /// Compact summary for logging.
    pub fn summary(&self) -> String {
        format!(
            "workflow={} tier={} attempts={} failures={} resolved={} stuck={}",
            self.workflow_id,
            self.current_tier,
            self.total_attempts,
            self.total_failures(),
            self.resolved,
            self.stuck,
        )
    }
}
