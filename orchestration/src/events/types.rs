//! Event types for network orchestration
//!
//! `BusinessEvent` is the normalized inbound event (a webhook payload after
//! ingestion); `OrchestrationEvent` is the internal lifecycle stream that
//! drives the pub/sub bus and is persisted for replay.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::escalation::{EscalationTier, IssueCategory};
use crate::registry::AgentId;

/// Unique identifier for orchestration events
pub type EventId = String;

/// Identifier of a workflow instance
pub type WorkflowId = String;

/// A normalized inbound business event.
///
/// Produced by the ingest pipeline from a raw integration payload; the
/// original payload is carried verbatim in `payload`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessEvent {
    /// Internal event id (uuid v4), assigned at ingestion.
    pub event_id: EventId,
    /// Event type as declared by the sender, e.g. `lead.capture`.
    pub event_type: String,
    /// Which integration delivered the event, e.g. `typeform`.
    pub source: String,
    /// Identifier of the sending system or user.
    pub sender_id: String,
    /// The business entity this event belongs to.
    pub business_entity_id: String,
    /// Original payload, untouched.
    pub payload: serde_json::Value,
    /// Ingestion timestamp.
    pub timestamp: DateTime<Utc>,
}

impl BusinessEvent {
    /// The event-type family (text before the first `.` or `_` separator),
    /// used as the workflow kind.
    pub fn kind(&self) -> &str {
        self.event_type
            .split(['.', '_'])
            .next()
            .unwrap_or(&self.event_type)
    }
}

/// All orchestration lifecycle events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrchestrationEvent {
    /// A business event passed ingestion and entered the pipeline
    EventReceived {
        event_id: EventId,
        event_type: String,
        source: String,
        business_entity_id: String,
        timestamp: DateTime<Utc>,
    },

    /// A business event was recognized as a duplicate and dropped
    EventDuplicate {
        event_type: String,
        source: String,
        timestamp: DateTime<Utc>,
    },

    /// The router picked a primary agent (and optional secondaries)
    EventRouted {
        event_id: EventId,
        primary: AgentId,
        secondaries: Vec<AgentId>,
        rationale: String,
        timestamp: DateTime<Utc>,
    },

    /// A delegation message was sent to an agent
    DelegationSent {
        event_id: EventId,
        workflow_id: WorkflowId,
        recipient: AgentId,
        timestamp: DateTime<Utc>,
    },

    /// An agent completed its delegation
    AgentCompleted {
        event_id: EventId,
        workflow_id: WorkflowId,
        agent: AgentId,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// An agent failed its delegation
    AgentFailed {
        event_id: EventId,
        workflow_id: WorkflowId,
        agent: AgentId,
        category: IssueCategory,
        detail: String,
        timestamp: DateTime<Utc>,
    },

    /// The escalation engine moved the workflow to a higher tier
    EscalationTriggered {
        workflow_id: WorkflowId,
        from_tier: EscalationTier,
        to_tier: EscalationTier,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// A new workflow instance was created
    WorkflowCreated {
        workflow_id: WorkflowId,
        business_entity_id: String,
        kind: String,
        timestamp: DateTime<Utc>,
    },

    /// A workflow transitioned between states
    WorkflowTransitioned {
        workflow_id: WorkflowId,
        from_state: String,
        to_state: String,
        actor: String,
        timestamp: DateTime<Utc>,
    },

    /// A workflow reached a terminal successful state
    WorkflowCompleted {
        workflow_id: WorkflowId,
        business_entity_id: String,
        timestamp: DateTime<Utc>,
    },

    /// A task was created on the board
    TaskCreated {
        task_id: String,
        workflow_id: WorkflowId,
        assignee: String,
        timestamp: DateTime<Utc>,
    },

    /// A workflow was flagged for mandatory human intervention (tier 4)
    HumanFlagged {
        workflow_id: WorkflowId,
        business_entity_id: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// A record-hub sync ran in degraded mode
    HubSyncDegraded {
        workflow_id: WorkflowId,
        served_by: String,
        warning: String,
        timestamp: DateTime<Utc>,
    },
}

impl OrchestrationEvent {
    /// Get the timestamp of this event.
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::EventReceived { timestamp, .. } => *timestamp,
            Self::EventDuplicate { timestamp, .. } => *timestamp,
            Self::EventRouted { timestamp, .. } => *timestamp,
            Self::DelegationSent { timestamp, .. } => *timestamp,
            Self::AgentCompleted { timestamp, .. } => *timestamp,
            Self::AgentFailed { timestamp, .. } => *timestamp,
            Self::EscalationTriggered { timestamp, .. } => *timestamp,
            Self::WorkflowCreated { timestamp, .. } => *timestamp,
            Self::WorkflowTransitioned { timestamp, .. } => *timestamp,
            Self::WorkflowCompleted { timestamp, .. } => *timestamp,
            Self::TaskCreated { timestamp, .. } => *timestamp,
            Self::HumanFlagged { timestamp, .. } => *timestamp,
            Self::HubSyncDegraded { timestamp, .. } => *timestamp,
        }
    }

    /// Get the event type tag as a static string.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::EventReceived { .. } => "event_received",
            Self::EventDuplicate { .. } => "event_duplicate",
            Self::EventRouted { .. } => "event_routed",
            Self::DelegationSent { .. } => "delegation_sent",
            Self::AgentCompleted { .. } => "agent_completed",
            Self::AgentFailed { .. } => "agent_failed",
            Self::EscalationTriggered { .. } => "escalation_triggered",
            Self::WorkflowCreated { .. } => "workflow_created",
            Self::WorkflowTransitioned { .. } => "workflow_transitioned",
            Self::WorkflowCompleted { .. } => "workflow_completed",
            Self::TaskCreated { .. } => "task_created",
            Self::HumanFlagged { .. } => "human_flagged",
            Self::HubSyncDegraded { .. } => "hub_sync_degraded",
        }
    }

    /// Get the business entity id if this event carries one.
    pub fn entity_id(&self) -> Option<&str> {
        match self {
            Self::EventReceived {
                business_entity_id, ..
            }
            | Self::WorkflowCreated {
                business_entity_id, ..
            }
            | Self::WorkflowCompleted {
                business_entity_id, ..
            }
            | Self::HumanFlagged {
                business_entity_id, ..
            } => Some(business_entity_id),
            _ => None,
        }
    }

    /// Get the workflow id if this event carries one.
    pub fn workflow_id(&self) -> Option<&str> {
        match self {
            Self::DelegationSent { workflow_id, .. }
            | Self::AgentCompleted { workflow_id, .. }
            | Self::AgentFailed { workflow_id, .. }
            | Self::EscalationTriggered { workflow_id, .. }
            | Self::WorkflowCreated { workflow_id, .. }
            | Self::WorkflowTransitioned { workflow_id, .. }
            | Self::WorkflowCompleted { workflow_id, .. }
            | Self::TaskCreated { workflow_id, .. }
            | Self::HumanFlagged { workflow_id, .. }
            | Self::HubSyncDegraded { workflow_id, .. } => Some(workflow_id),
            _ => None,
        }
    }

    /// Generate a new unique event ID.
    pub fn new_id() -> EventId {
        uuid::Uuid::new_v4().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_tags() {
        let event = OrchestrationEvent::WorkflowCreated {
            workflow_id: "wf-1".into(),
            business_entity_id: "entity-1".into(),
            kind: "lead".into(),
            timestamp: Utc::now(),
        };
        assert_eq!(event.event_type(), "workflow_created");
        assert_eq!(event.workflow_id(), Some("wf-1"));
        assert_eq!(event.entity_id(), Some("entity-1"));
    }

    #[test]
    fn test_serde_tag_is_snake_case() {
        let event = OrchestrationEvent::AgentFailed {
            event_id: "ev-1".into(),
            workflow_id: "wf-1".into(),
            agent: AgentId::Solari,
            category: IssueCategory::AgentTimeout,
            detail: "no response in 30s".into(),
            timestamp: Utc::now(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"agent_failed\""), "JSON: {json}");
        assert!(json.contains("\"agent\":\"solari\""), "JSON: {json}");

        let roundtrip: OrchestrationEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(roundtrip.event_type(), "agent_failed");
    }

    #[test]
    fn test_business_event_kind() {
        let event = BusinessEvent {
            event_id: "ev-1".into(),
            event_type: "lead.capture".into(),
            source: "typeform".into(),
            sender_id: "form-9".into(),
            business_entity_id: "entity-1".into(),
            payload: serde_json::json!({}),
            timestamp: Utc::now(),
        };
        assert_eq!(event.kind(), "lead");

        let event2 = BusinessEvent {
            event_type: "booking_created".into(),
            ..event.clone()
        };
        assert_eq!(event2.kind(), "booking");

        let event3 = BusinessEvent {
            event_type: "ping".into(),
            ..event
        };
        assert_eq!(event3.kind(), "ping");
    }
}
