//! Agent-to-agent messaging and delivery reports
//!
//! `AgentMessage` is the wire format for delegations, status updates, and
//! handoffs between personas. `DeliveryReport` is what the orchestrator feeds
//! back into the escalation engine after each delegation attempt.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::escalation::severity::IssueCategory;
use crate::registry::AgentId;

/// Kind of inter-agent message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    /// Work handed to an agent.
    Delegation,
    /// Progress note from an agent mid-work.
    StatusUpdate,
    /// Work finished, payload carries the result record.
    Completion,
    /// Notice that the workflow moved to a higher tier.
    EscalationNotice,
}

/// A message exchanged between agents
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentMessage {
    /// Unique message id (uuid v4).
    pub message_id: String,
    pub message_type: MessageType,
    pub sender: AgentId,
    pub recipient: AgentId,
    /// Workflow instance the message belongs to.
    pub workflow_id: String,
    /// Business event the message originated from.
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub payload: serde_json::Value,
}

impl AgentMessage {
    fn new(
        message_type: MessageType,
        sender: AgentId,
        recipient: AgentId,
        workflow_id: &str,
        event_id: &str,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            message_id: uuid::Uuid::new_v4().to_string(),
            message_type,
            sender,
            recipient,
            workflow_id: workflow_id.to_string(),
            event_id: event_id.to_string(),
            timestamp: Utc::now(),
            payload,
        }
    }

    /// Build a delegation from the orchestrator to a specialist.
    pub fn delegation(
        sender: AgentId,
        recipient: AgentId,
        workflow_id: &str,
        event_id: &str,
        payload: serde_json::Value,
    ) -> Self {
        Self::new(
            MessageType::Delegation,
            sender,
            recipient,
            workflow_id,
            event_id,
            payload,
        )
    }

    /// Build a status update back to the orchestrator.
    pub fn status_update(
        sender: AgentId,
        workflow_id: &str,
        event_id: &str,
        note: &str,
    ) -> Self {
        Self::new(
            MessageType::StatusUpdate,
            sender,
            AgentId::Grace,
            workflow_id,
            event_id,
            serde_json::json!({ "note": note }),
        )
    }

    /// Build a completion message carrying the result record.
    pub fn completion(
        sender: AgentId,
        workflow_id: &str,
        event_id: &str,
        record: serde_json::Value,
    ) -> Self {
        Self::new(
            MessageType::Completion,
            sender,
            AgentId::Grace,
            workflow_id,
            event_id,
            record,
        )
    }

    /// Build an escalation notice for the recipient tier.
    pub fn escalation_notice(
        recipient: AgentId,
        workflow_id: &str,
        event_id: &str,
        reason: &str,
    ) -> Self {
        Self::new(
            MessageType::EscalationNotice,
            AgentId::Grace,
            recipient,
            workflow_id,
            event_id,
            serde_json::json!({ "reason": reason }),
        )
    }
}

/// Outcome of a single delegation attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryOutcome {
    /// The agent handled the event.
    Completed,
    /// The agent failed with a classified issue.
    Failed {
        category: IssueCategory,
        detail: String,
    },
    /// The agent did not answer within the delegation timeout.
    Timeout,
}

impl DeliveryOutcome {
    /// The issue category, if the attempt did not complete.
    pub fn category(&self) -> Option<IssueCategory> {
        match self {
            Self::Completed => None,
            Self::Failed { category, .. } => Some(*category),
            Self::Timeout => Some(IssueCategory::AgentTimeout),
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// Report on a delegation attempt, consumed by the escalation engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryReport {
    pub agent: AgentId,
    pub event_id: String,
    pub workflow_id: String,
    pub outcome: DeliveryOutcome,
    pub duration_ms: u64,
}

impl DeliveryReport {
    pub fn completed(agent: AgentId, event_id: &str, workflow_id: &str, duration_ms: u64) -> Self {
        Self {
            agent,
            event_id: event_id.to_string(),
            workflow_id: workflow_id.to_string(),
            outcome: DeliveryOutcome::Completed,
            duration_ms,
        }
    }

    pub fn failed(
        agent: AgentId,
        event_id: &str,
        workflow_id: &str,
        category: IssueCategory,
        detail: impl Into<String>,
        duration_ms: u64,
    ) -> Self {
        Self {
            agent,
            event_id: event_id.to_string(),
            workflow_id: workflow_id.to_string(),
            outcome: DeliveryOutcome::Failed {
                category,
                detail: detail.into(),
            },
            duration_ms,
        }
    }

    pub fn timed_out(agent: AgentId, event_id: &str, workflow_id: &str, duration_ms: u64) -> Self {
        Self {
            agent,
            event_id: event_id.to_string(),
            workflow_id: workflow_id.to_string(),
            outcome: DeliveryOutcome::Timeout,
            duration_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delegation_constructor() {
        let msg = AgentMessage::delegation(
            AgentId::Grace,
            AgentId::Nyra,
            "wf-1",
            "ev-1",
            serde_json::json!({ "lead": "jamie@example.com" }),
        );
        assert_eq!(msg.message_type, MessageType::Delegation);
        assert_eq!(msg.sender, AgentId::Grace);
        assert_eq!(msg.recipient, AgentId::Nyra);
        assert!(!msg.message_id.is_empty());
    }

    #[test]
    fn test_completion_targets_orchestrator() {
        let msg = AgentMessage::completion(
            AgentId::Solari,
            "wf-1",
            "ev-1",
            serde_json::json!({ "confirmed": true }),
        );
        assert_eq!(msg.recipient, AgentId::Grace);
        assert_eq!(msg.message_type, MessageType::Completion);
    }

    #[test]
    fn test_outcome_category() {
        assert_eq!(DeliveryOutcome::Completed.category(), None);
        assert_eq!(
            DeliveryOutcome::Timeout.category(),
            Some(IssueCategory::AgentTimeout)
        );
        let failed = DeliveryOutcome::Failed {
            category: IssueCategory::InvalidPayload,
            detail: "missing email".into(),
        };
        assert_eq!(failed.category(), Some(IssueCategory::InvalidPayload));
    }

    #[test]
    fn test_message_serde_roundtrip() {
        let msg = AgentMessage::escalation_notice(AgentId::Ruvo, "wf-1", "ev-1", "repeat failure");
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("escalation_notice"), "JSON: {json}");
        let back: AgentMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back.message_type, MessageType::EscalationNotice);
        assert_eq!(back.recipient, AgentId::Ruvo);
    }
}
