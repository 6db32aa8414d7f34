//! Severity-tiered escalation for the agent network
//!
//! Four tiers: a single specialist, coordinated multi-agent handling, the
//! orchestrator herself, and mandatory human intervention. The engine is the
//! deterministic state machine that moves workflows between them.

pub mod engine;
pub mod severity;
pub mod state;

pub use engine::{EscalationConfig, EscalationDecision, EscalationEngine, NextAction};
pub use severity::{IssueCategory, Severity};
pub use state::{
    AttemptRecord, EscalationReason, EscalationRecord, EscalationState, EscalationTier, TierBudget,
};
