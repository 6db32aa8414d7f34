//! Workflow instances — business-process state tracking
//!
//! A workflow instance follows one business event family for one entity:
//! create → transition → complete/error. Transitions are validated against
//! an allowed-transition map and every hop is appended to the history log.
//!
//! Invariant: at most one Active workflow per (business entity, kind). New
//! events for an entity with an active workflow of the same kind attach to
//! the existing instance instead of creating a second one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::events::types::BusinessEvent;

/// Error type for workflow operations
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("Invalid transition: {from} -> {to}")]
    InvalidTransition { from: WorkflowState, to: WorkflowState },

    #[error("Workflow not found: {0}")]
    NotFound(String),

    #[error("Workflow {0} is closed")]
    Closed(String),

    #[error("Lock poisoned")]
    LockPoisoned,
}

/// Result type for workflow operations
pub type WorkflowResult<T> = Result<T, WorkflowError>;

/// States a workflow instance moves through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowState {
    /// Event accepted, nothing dispatched yet.
    Received,
    /// Router picked an agent.
    Routed,
    /// An agent is working the event.
    InProgress,
    /// The escalation engine moved it to a higher tier.
    Escalated,
    /// Waiting on staff (tier 4).
    HumanReview,
    /// Terminal success.
    Completed,
    /// Terminal failure.
    Error,
}

impl WorkflowState {
    /// Whether this state ends the workflow.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }

    /// States reachable from this one.
    pub fn allowed_next(&self) -> &'static [WorkflowState] {
        use WorkflowState::*;
        match self {
            Received => &[Routed, Error],
            Routed => &[InProgress, Escalated, Error],
            InProgress => &[Completed, Escalated, Error],
            // Escalated may recover back to InProgress or go to staff.
            Escalated => &[InProgress, HumanReview, Completed, Error],
            HumanReview => &[Completed, Error],
            Completed | Error => &[],
        }
    }

    /// Whether `to` is a legal next state.
    pub fn can_transition_to(&self, to: WorkflowState) -> bool {
        self.allowed_next().contains(&to)
    }
}

impl std::fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Received => "received",
            Self::Routed => "routed",
            Self::InProgress => "in_progress",
            Self::Escalated => "escalated",
            Self::HumanReview => "human_review",
            Self::Completed => "completed",
            Self::Error => "error",
        };
        write!(f, "{s}")
    }
}

/// Coarse status derived from the current state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Active,
    Completed,
    Error,
}

/// One entry in a workflow's history log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub from: WorkflowState,
    pub to: WorkflowState,
    /// Who performed the transition (agent name or "staff").
    pub actor: String,
    pub timestamp: DateTime<Utc>,
    pub note: Option<String>,
}

/// A single workflow instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowInstance {
    /// Instance id (uuid v4).
    pub id: String,
    pub business_entity_id: String,
    /// Event family this instance tracks, e.g. `lead`.
    pub kind: String,
    pub current_state: WorkflowState,
    pub history_log: Vec<TransitionRecord>,
    /// Event ids attached to this instance.
    pub event_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WorkflowInstance {
    /// Create a new instance in the Received state for an event.
    pub fn for_event(event: &BusinessEvent) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            business_entity_id: event.business_entity_id.clone(),
            kind: event.kind().to_string(),
            current_state: WorkflowState::Received,
            history_log: Vec::new(),
            event_ids: vec![event.event_id.clone()],
            created_at: now,
            updated_at: now,
        }
    }

    /// Coarse status derived from the current state.
    pub fn status(&self) -> WorkflowStatus {
        match self.current_state {
            WorkflowState::Completed => WorkflowStatus::Completed,
            WorkflowState::Error => WorkflowStatus::Error,
            _ => WorkflowStatus::Active,
        }
    }

    /// Transition to a new state, appending to the history log.
    pub fn transition(
        &mut self,
        to: WorkflowState,
        actor: &str,
        note: Option<String>,
    ) -> WorkflowResult<()> {
        if self.current_state.is_terminal() {
            return Err(WorkflowError::Closed(self.id.clone()));
        }
        if !self.current_state.can_transition_to(to) {
            return Err(WorkflowError::InvalidTransition {
                from: self.current_state,
                to,
            });
        }
        self.history_log.push(TransitionRecord {
            from: self.current_state,
            to,
            actor: actor.to_string(),
            timestamp: Utc::now(),
            note,
        });
        self.current_state = to;
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// Shared reference to the workflow engine
pub type SharedWorkflowEngine = Arc<WorkflowEngine>;

/// In-memory engine holding all workflow instances
///
/// Enforces the one-active-instance-per-(entity, kind) invariant through
/// `create_or_attach`.
pub struct WorkflowEngine {
    inner: RwLock<EngineInner>,
}

#[derive(Default)]
struct EngineInner {
    instances: HashMap<String, WorkflowInstance>,
    /// (entity, kind) → active instance id.
    active: HashMap<(String, String), String>,
}

impl WorkflowEngine {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(EngineInner::default()),
        }
    }

    /// Create a shared reference to this engine.
    pub fn shared(self) -> SharedWorkflowEngine {
        Arc::new(self)
    }

    /// Create a workflow for the event, or attach the event to the entity's
    /// existing active workflow of the same kind.
    ///
    /// Returns the instance and whether it was newly created.
    pub fn create_or_attach(&self, event: &BusinessEvent) -> WorkflowResult<(WorkflowInstance, bool)> {
        let mut inner = self.inner.write().map_err(|_| WorkflowError::LockPoisoned)?;
        let key = (event.business_entity_id.clone(), event.kind().to_string());

        if let Some(id) = inner.active.get(&key).cloned() {
            if let Some(instance) = inner.instances.get_mut(&id) {
                if instance.status() == WorkflowStatus::Active {
                    instance.event_ids.push(event.event_id.clone());
                    instance.updated_at = Utc::now();
                    return Ok((instance.clone(), false));
                }
            }
            // Stale index entry for a closed instance.
            inner.active.remove(&key);
        }

        let instance = WorkflowInstance::for_event(event);
        inner.active.insert(key, instance.id.clone());
        inner.instances.insert(instance.id.clone(), instance.clone());
        Ok((instance, true))
    }

    /// Get a snapshot of an instance by id.
    pub fn get(&self, id: &str) -> WorkflowResult<WorkflowInstance> {
        let inner = self.inner.read().map_err(|_| WorkflowError::LockPoisoned)?;
        inner
            .instances
            .get(id)
            .cloned()
            .ok_or_else(|| WorkflowError::NotFound(id.to_string()))
    }

    /// Transition an instance, maintaining the active index.
    pub fn transition(
        &self,
        id: &str,
        to: WorkflowState,
        actor: &str,
        note: Option<String>,
    ) -> WorkflowResult<WorkflowInstance> {
        let mut inner = self.inner.write().map_err(|_| WorkflowError::LockPoisoned)?;
        let instance = inner
            .instances
            .get_mut(id)
            .ok_or_else(|| WorkflowError::NotFound(id.to_string()))?;
        instance.transition(to, actor, note)?;
        let snapshot = instance.clone();

        if snapshot.status() != WorkflowStatus::Active {
            inner
                .active
                .remove(&(snapshot.business_entity_id.clone(), snapshot.kind.clone()));
        }
        Ok(snapshot)
    }

    /// All currently active instances.
    pub fn list_active(&self) -> WorkflowResult<Vec<WorkflowInstance>> {
        let inner = self.inner.read().map_err(|_| WorkflowError::LockPoisoned)?;
        Ok(inner
            .instances
            .values()
            .filter(|w| w.status() == WorkflowStatus::Active)
            .cloned()
            .collect())
    }
}

impl Default for WorkflowEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lead_event(entity: &str) -> BusinessEvent {
        BusinessEvent {
            event_id: uuid::Uuid::new_v4().to_string(),
            event_type: "lead.capture".into(),
            source: "typeform".into(),
            sender_id: "form-1".into(),
            business_entity_id: entity.into(),
            payload: serde_json::json!({}),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_lifecycle_happy_path() {
        let event = lead_event("entity-1");
        let mut wf = WorkflowInstance::for_event(&event);
        assert_eq!(wf.current_state, WorkflowState::Received);
        assert_eq!(wf.status(), WorkflowStatus::Active);

        wf.transition(WorkflowState::Routed, "grace", None).unwrap();
        wf.transition(WorkflowState::InProgress, "nyra", None).unwrap();
        wf.transition(WorkflowState::Completed, "nyra", Some("scored".into()))
            .unwrap();

        assert_eq!(wf.status(), WorkflowStatus::Completed);
        assert_eq!(wf.history_log.len(), 3);
        assert_eq!(wf.history_log[2].note.as_deref(), Some("scored"));
    }

    #[test]
    fn test_invalid_transition_rejected() {
        let mut wf = WorkflowInstance::for_event(&lead_event("entity-1"));
        let err = wf
            .transition(WorkflowState::Completed, "nyra", None)
            .unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidTransition { .. }));
        assert_eq!(wf.current_state, WorkflowState::Received);
        assert!(wf.history_log.is_empty());
    }

    #[test]
    fn test_terminal_state_is_closed() {
        let mut wf = WorkflowInstance::for_event(&lead_event("entity-1"));
        wf.transition(WorkflowState::Routed, "grace", None).unwrap();
        wf.transition(WorkflowState::Error, "grace", None).unwrap();

        let err = wf
            .transition(WorkflowState::InProgress, "nyra", None)
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Closed(_)));
    }

    #[test]
    fn test_escalated_can_recover() {
        let mut wf = WorkflowInstance::for_event(&lead_event("entity-1"));
        wf.transition(WorkflowState::Routed, "grace", None).unwrap();
        wf.transition(WorkflowState::Escalated, "grace", None).unwrap();
        wf.transition(WorkflowState::InProgress, "solari", None)
            .unwrap();
        assert_eq!(wf.current_state, WorkflowState::InProgress);
    }

    #[test]
    fn test_one_active_workflow_per_entity_kind() {
        let engine = WorkflowEngine::new();

        let (wf1, created1) = engine.create_or_attach(&lead_event("entity-1")).unwrap();
        assert!(created1);

        // Second lead event for the same entity attaches.
        let (wf2, created2) = engine.create_or_attach(&lead_event("entity-1")).unwrap();
        assert!(!created2);
        assert_eq!(wf1.id, wf2.id);
        assert_eq!(wf2.event_ids.len(), 2);

        // A different entity gets its own instance.
        let (wf3, created3) = engine.create_or_attach(&lead_event("entity-2")).unwrap();
        assert!(created3);
        assert_ne!(wf1.id, wf3.id);
    }

    #[test]
    fn test_new_instance_after_completion() {
        let engine = WorkflowEngine::new();
        let (wf1, _) = engine.create_or_attach(&lead_event("entity-1")).unwrap();

        engine
            .transition(&wf1.id, WorkflowState::Routed, "grace", None)
            .unwrap();
        engine
            .transition(&wf1.id, WorkflowState::InProgress, "nyra", None)
            .unwrap();
        engine
            .transition(&wf1.id, WorkflowState::Completed, "nyra", None)
            .unwrap();

        let (wf2, created) = engine.create_or_attach(&lead_event("entity-1")).unwrap();
        assert!(created);
        assert_ne!(wf1.id, wf2.id);
    }

    #[test]
    fn test_list_active() {
        let engine = WorkflowEngine::new();
        let (wf1, _) = engine.create_or_attach(&lead_event("entity-1")).unwrap();
        engine.create_or_attach(&lead_event("entity-2")).unwrap();
        assert_eq!(engine.list_active().unwrap().len(), 2);

        engine
            .transition(&wf1.id, WorkflowState::Error, "grace", None)
            .unwrap();
        assert_eq!(engine.list_active().unwrap().len(), 1);
    }

    #[test]
    fn test_get_unknown_is_not_found() {
        let engine = WorkflowEngine::new();
        assert!(matches!(
            engine.get("missing"),
            Err(WorkflowError::NotFound(_))
        ));
    }
}
