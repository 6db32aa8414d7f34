//! Task board — actionable work items produced by workflows
//!
//! Tasks are created against a workflow instance (never free-floating) and
//! assigned to an agent persona or to staff. Done and Cancelled are terminal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

use crate::registry::AgentId;
use crate::workflow::WorkflowInstance;

/// Error type for task operations
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("Task not found: {0}")]
    NotFound(String),

    #[error("Task {0} is closed")]
    Closed(String),

    #[error("Lock poisoned")]
    LockPoisoned,
}

/// Result type for task operations
pub type TaskResult<T> = Result<T, TaskError>;

/// Who a task is assigned to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Assignee {
    /// An agent persona.
    Agent { agent: AgentId },
    /// A named staff member or queue.
    Human { name: String },
}

impl std::fmt::Display for Assignee {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Agent { agent } => write!(f, "{agent}"),
            Self::Human { name } => write!(f, "staff:{name}"),
        }
    }
}

/// Task lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Open,
    InProgress,
    Done,
    Cancelled,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Cancelled)
    }
}

/// A single work item tied to a workflow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Task id (uuid v4).
    pub id: String,
    /// Owning workflow instance — tasks never float free.
    pub workflow_id: String,
    pub title: String,
    pub assignee: Assignee,
    pub status: TaskStatus,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// In-memory task board
///
/// Creation requires the owning workflow instance, which keeps every task
/// referencing a workflow that actually exists.
pub struct TaskBoard {
    tasks: RwLock<HashMap<String, Task>>,
}

impl TaskBoard {
    pub fn new() -> Self {
        Self {
            tasks: RwLock::new(HashMap::new()),
        }
    }

    /// Create a task against an existing workflow instance.
    pub fn create(
        &self,
        workflow: &WorkflowInstance,
        title: &str,
        assignee: Assignee,
        due_date: Option<DateTime<Utc>>,
    ) -> TaskResult<Task> {
        let now = Utc::now();
        let task = Task {
            id: uuid::Uuid::new_v4().to_string(),
            workflow_id: workflow.id.clone(),
            title: title.to_string(),
            assignee,
            status: TaskStatus::Open,
            due_date,
            created_at: now,
            updated_at: now,
        };
        let mut tasks = self.tasks.write().map_err(|_| TaskError::LockPoisoned)?;
        tasks.insert(task.id.clone(), task.clone());
        Ok(task)
    }

    /// Get a snapshot of a task by id.
    pub fn get(&self, id: &str) -> TaskResult<Task> {
        let tasks = self.tasks.read().map_err(|_| TaskError::LockPoisoned)?;
        tasks
            .get(id)
            .cloned()
            .ok_or_else(|| TaskError::NotFound(id.to_string()))
    }

    /// Move a task to a new status. Terminal tasks reject further changes.
    pub fn set_status(&self, id: &str, status: TaskStatus) -> TaskResult<Task> {
        let mut tasks = self.tasks.write().map_err(|_| TaskError::LockPoisoned)?;
        let task = tasks
            .get_mut(id)
            .ok_or_else(|| TaskError::NotFound(id.to_string()))?;
        if task.status.is_terminal() {
            return Err(TaskError::Closed(id.to_string()));
        }
        task.status = status;
        task.updated_at = Utc::now();
        Ok(task.clone())
    }

    /// Reassign a task. Terminal tasks reject reassignment.
    pub fn assign(&self, id: &str, assignee: Assignee) -> TaskResult<Task> {
        let mut tasks = self.tasks.write().map_err(|_| TaskError::LockPoisoned)?;
        let task = tasks
            .get_mut(id)
            .ok_or_else(|| TaskError::NotFound(id.to_string()))?;
        if task.status.is_terminal() {
            return Err(TaskError::Closed(id.to_string()));
        }
        task.assignee = assignee;
        task.updated_at = Utc::now();
        Ok(task.clone())
    }

    /// All tasks belonging to a workflow.
    pub fn list_for_workflow(&self, workflow_id: &str) -> TaskResult<Vec<Task>> {
        let tasks = self.tasks.read().map_err(|_| TaskError::LockPoisoned)?;
        Ok(tasks
            .values()
            .filter(|t| t.workflow_id == workflow_id)
            .cloned()
            .collect())
    }

    /// All non-terminal tasks.
    pub fn list_open(&self) -> TaskResult<Vec<Task>> {
        let tasks = self.tasks.read().map_err(|_| TaskError::LockPoisoned)?;
        Ok(tasks
            .values()
            .filter(|t| !t.status.is_terminal())
            .cloned()
            .collect())
    }
}

impl Default for TaskBoard {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::types::BusinessEvent;

    fn workflow() -> WorkflowInstance {
        WorkflowInstance::for_event(&BusinessEvent {
            event_id: uuid::Uuid::new_v4().to_string(),
            event_type: "booking.created".into(),
            source: "amelia".into(),
            sender_id: "cal-1".into(),
            business_entity_id: "entity-1".into(),
            payload: serde_json::json!({}),
            timestamp: Utc::now(),
        })
    }

    #[test]
    fn test_create_and_get() {
        let board = TaskBoard::new();
        let wf = workflow();
        let task = board
            .create(
                &wf,
                "Confirm booking",
                Assignee::Agent {
                    agent: AgentId::Solari,
                },
                None,
            )
            .unwrap();

        let fetched = board.get(&task.id).unwrap();
        assert_eq!(fetched.workflow_id, wf.id);
        assert_eq!(fetched.status, TaskStatus::Open);
        assert_eq!(fetched.title, "Confirm booking");
    }

    #[test]
    fn test_status_transitions() {
        let board = TaskBoard::new();
        let wf = workflow();
        let task = board
            .create(&wf, "Follow up", Assignee::Agent { agent: AgentId::Ruvo }, None)
            .unwrap();

        board.set_status(&task.id, TaskStatus::InProgress).unwrap();
        let done = board.set_status(&task.id, TaskStatus::Done).unwrap();
        assert_eq!(done.status, TaskStatus::Done);

        // Terminal tasks reject further changes.
        let err = board.set_status(&task.id, TaskStatus::Open).unwrap_err();
        assert!(matches!(err, TaskError::Closed(_)));
    }

    #[test]
    fn test_reassign_rejects_terminal() {
        let board = TaskBoard::new();
        let wf = workflow();
        let task = board
            .create(
                &wf,
                "Escalated booking",
                Assignee::Agent {
                    agent: AgentId::Solari,
                },
                None,
            )
            .unwrap();

        let reassigned = board
            .assign(&task.id, Assignee::Human { name: "ops".into() })
            .unwrap();
        assert_eq!(reassigned.assignee, Assignee::Human { name: "ops".into() });

        board.set_status(&task.id, TaskStatus::Done).unwrap();
        let err = board
            .assign(&task.id, Assignee::Agent { agent: AgentId::Ruvo })
            .unwrap_err();
        assert!(matches!(err, TaskError::Closed(_)));
        assert_eq!(
            board.get(&task.id).unwrap().assignee,
            Assignee::Human { name: "ops".into() }
        );
    }

    #[test]
    fn test_list_for_workflow() {
        let board = TaskBoard::new();
        let wf1 = workflow();
        let wf2 = workflow();
        board
            .create(&wf1, "a", Assignee::Agent { agent: AgentId::Ruvo }, None)
            .unwrap();
        board
            .create(&wf1, "b", Assignee::Human { name: "ops".into() }, None)
            .unwrap();
        board
            .create(&wf2, "c", Assignee::Agent { agent: AgentId::Ruvo }, None)
            .unwrap();

        assert_eq!(board.list_for_workflow(&wf1.id).unwrap().len(), 2);
        assert_eq!(board.list_for_workflow(&wf2.id).unwrap().len(), 1);
    }

    #[test]
    fn test_list_open_excludes_terminal() {
        let board = TaskBoard::new();
        let wf = workflow();
        let t1 = board
            .create(&wf, "a", Assignee::Agent { agent: AgentId::Ruvo }, None)
            .unwrap();
        board
            .create(&wf, "b", Assignee::Agent { agent: AgentId::Ruvo }, None)
            .unwrap();

        board.set_status(&t1.id, TaskStatus::Cancelled).unwrap();
        let open = board.list_open().unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].title, "b");
    }

    #[test]
    fn test_unknown_task_is_not_found() {
        let board = TaskBoard::new();
        assert!(matches!(board.get("missing"), Err(TaskError::NotFound(_))));
    }
}
