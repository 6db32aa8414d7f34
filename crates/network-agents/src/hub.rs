//! Record hub — the system of record behind the network.
//!
//! The orchestrator syncs workflow instances, tasks, and history entries to
//! a hub service over HTTP. The trait keeps the orchestrator testable and
//! lets deployments swap the backing service without touching dispatch
//! logic. `MemoryHub` backs tests and the local journal fallback tier.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use orchestration::tasks::Task;
use orchestration::workflow::WorkflowInstance;

/// Error type for hub operations
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    #[error("Hub request failed: {0}")]
    Request(String),

    #[error("Hub returned status {0}")]
    Status(u16),

    #[error("Hub unavailable: {0}")]
    Unavailable(String),
}

impl From<reqwest::Error> for HubError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            Self::Unavailable(err.to_string())
        } else {
            Self::Request(err.to_string())
        }
    }
}

/// Result type for hub operations
pub type HubResult<T> = Result<T, HubError>;

/// The system of record the network syncs into.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RecordHub: Send + Sync {
    /// Create or update a workflow record.
    async fn upsert_workflow(&self, workflow: &WorkflowInstance) -> HubResult<()>;

    /// Create or update a task record.
    async fn upsert_task(&self, task: &Task) -> HubResult<()>;

    /// Append an agent record to a workflow's history.
    async fn append_record(&self, workflow_id: &str, record: &serde_json::Value) -> HubResult<()>;

    /// Whether the hub is reachable.
    async fn health_check(&self) -> bool;
}

/// HTTP client for a real hub deployment.
pub struct HttpHub {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpHub {
    /// Build a client for the hub at `base_url` with an optional bearer token.
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> HubResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| HubError::Request(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    async fn post(&self, path: &str, body: &impl serde::Serialize) -> HubResult<()> {
        let url = format!("{}{path}", self.base_url);
        let mut req = self.client.post(&url).json(body);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        let resp = req.send().await?;
        if !resp.status().is_success() {
            return Err(HubError::Status(resp.status().as_u16()));
        }
        debug!(url, "Hub write ok");
        Ok(())
    }
}

#[async_trait]
impl RecordHub for HttpHub {
    async fn upsert_workflow(&self, workflow: &WorkflowInstance) -> HubResult<()> {
        self.post("/api/workflows", workflow).await
    }

    async fn upsert_task(&self, task: &Task) -> HubResult<()> {
        self.post("/api/tasks", task).await
    }

    async fn append_record(&self, workflow_id: &str, record: &serde_json::Value) -> HubResult<()> {
        let path = format!("/api/workflows/{workflow_id}/records");
        self.post(&path, record).await
    }

    async fn health_check(&self) -> bool {
        let url = format!("{}/health", self.base_url);
        match self.client.get(&url).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }
}

/// In-memory hub for tests and the local journal fallback.
#[derive(Default)]
pub struct MemoryHub {
    workflows: Mutex<HashMap<String, WorkflowInstance>>,
    tasks: Mutex<HashMap<String, Task>>,
    records: Mutex<Vec<(String, serde_json::Value)>>,
}

impl MemoryHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of a stored workflow.
    pub fn workflow(&self, id: &str) -> Option<WorkflowInstance> {
        self.workflows.lock().ok()?.get(id).cloned()
    }

    /// Snapshot of a stored task.
    pub fn task(&self, id: &str) -> Option<Task> {
        self.tasks.lock().ok()?.get(id).cloned()
    }

    /// All appended records for a workflow.
    pub fn records_for(&self, workflow_id: &str) -> Vec<serde_json::Value> {
        self.records
            .lock()
            .map(|records| {
                records
                    .iter()
                    .filter(|(wid, _)| wid == workflow_id)
                    .map(|(_, r)| r.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn workflow_count(&self) -> usize {
        self.workflows.lock().map(|w| w.len()).unwrap_or(0)
    }
}

#[async_trait]
impl RecordHub for MemoryHub {
    async fn upsert_workflow(&self, workflow: &WorkflowInstance) -> HubResult<()> {
        self.workflows
            .lock()
            .map_err(|_| HubError::Request("lock poisoned".to_string()))?
            .insert(workflow.id.clone(), workflow.clone());
        Ok(())
    }

    async fn upsert_task(&self, task: &Task) -> HubResult<()> {
        self.tasks
            .lock()
            .map_err(|_| HubError::Request("lock poisoned".to_string()))?
            .insert(task.id.clone(), task.clone());
        Ok(())
    }

    async fn append_record(&self, workflow_id: &str, record: &serde_json::Value) -> HubResult<()> {
        self.records
            .lock()
            .map_err(|_| HubError::Request("lock poisoned".to_string()))?
            .push((workflow_id.to_string(), record.clone()));
        Ok(())
    }

    async fn health_check(&self) -> bool {
        true
    }
}
