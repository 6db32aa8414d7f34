//! RocksDB-backed state store for network orchestration
//!
//! Provides persistent storage with column families for logical data separation.
//! Uses bincode for efficient binary serialization internally; events are kept
//! as JSON for debuggability.

use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use rocksdb::{ColumnFamilyDescriptor, Options, DB};
use serde::{de::DeserializeOwned, Serialize};

use super::schema::{self, ALL_CFS};
use crate::escalation::EscalationState;
use crate::tasks::Task;
use crate::workflow::{WorkflowInstance, WorkflowStatus};

/// Error type for state store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("RocksDB error: {0}")]
    RocksDb(#[from] rocksdb::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Key not found: {0}")]
    NotFound(String),

    #[error("Lock poisoned")]
    LockPoisoned,

    #[error("Column family not found: {0}")]
    ColumnFamilyNotFound(String),
}

/// Result type for state store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Shared reference to StateStore
pub type SharedStateStore = Arc<StateStore>;

/// RocksDB-backed persistent state store
pub struct StateStore {
    db: RwLock<DB>,
    path: PathBuf,
}

impl StateStore {
    /// Open or create a state store at the given path
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();

        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<ColumnFamilyDescriptor> = ALL_CFS
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()))
            .collect();

        let db = DB::open_cf_descriptors(&opts, &path, cf_descriptors)?;

        Ok(Self {
            db: RwLock::new(db),
            path,
        })
    }

    /// Create a shared reference to this store
    pub fn shared(self) -> SharedStateStore {
        Arc::new(self)
    }

    /// Get the database path
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    // =========================================================================
    // Generic operations
    // =========================================================================

    /// Store a value in a column family
    fn put<T: Serialize>(&self, cf_name: &str, key: &str, value: &T) -> StoreResult<()> {
        let db = self.db.read().map_err(|_| StoreError::LockPoisoned)?;
        let cf = db
            .cf_handle(cf_name)
            .ok_or_else(|| StoreError::ColumnFamilyNotFound(cf_name.to_string()))?;

        let bytes =
            bincode::serialize(value).map_err(|e| StoreError::Serialization(e.to_string()))?;

        db.put_cf(&cf, key.as_bytes(), bytes)?;
        Ok(())
    }

    /// Get a value from a column family
    fn get<T: DeserializeOwned>(&self, cf_name: &str, key: &str) -> StoreResult<Option<T>> {
        let db = self.db.read().map_err(|_| StoreError::LockPoisoned)?;
        let cf = db
            .cf_handle(cf_name)
            .ok_or_else(|| StoreError::ColumnFamilyNotFound(cf_name.to_string()))?;

        match db.get_cf(&cf, key.as_bytes())? {
            Some(bytes) => {
                let value = bincode::deserialize(&bytes)
                    .map_err(|e| StoreError::Deserialization(e.to_string()))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// List all keys with a prefix in a column family
    fn list_keys(&self, cf_name: &str, prefix: &str) -> StoreResult<Vec<String>> {
        let db = self.db.read().map_err(|_| StoreError::LockPoisoned)?;
        let cf = db
            .cf_handle(cf_name)
            .ok_or_else(|| StoreError::ColumnFamilyNotFound(cf_name.to_string()))?;

        let mut keys = Vec::new();
        let iter = db.prefix_iterator_cf(&cf, prefix.as_bytes());

        for result in iter {
            let (key, _) = result?;
            if let Ok(key_str) = String::from_utf8(key.to_vec()) {
                if key_str.starts_with(prefix) {
                    keys.push(key_str);
                } else {
                    break; // Prefix no longer matches
                }
            }
        }

        Ok(keys)
    }

    // =========================================================================
    // Workflow operations
    // =========================================================================

    /// Store a workflow instance
    pub fn put_workflow(&self, workflow: &WorkflowInstance) -> StoreResult<()> {
        let key = schema::keys::workflow(&workflow.id);
        self.put(schema::CF_WORKFLOWS, &key, workflow)
    }

    /// Get a workflow instance by ID
    pub fn get_workflow(&self, workflow_id: &str) -> StoreResult<Option<WorkflowInstance>> {
        let key = schema::keys::workflow(workflow_id);
        self.get(schema::CF_WORKFLOWS, &key)
    }

    /// List all workflow instances, newest first
    pub fn list_workflows(&self) -> StoreResult<Vec<WorkflowInstance>> {
        let keys = self.list_keys(schema::CF_WORKFLOWS, "wf:")?;

        let mut workflows: Vec<WorkflowInstance> = keys
            .iter()
            .filter_map(|key| self.get(schema::CF_WORKFLOWS, key).ok()?)
            .collect();

        workflows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(workflows)
    }

    /// List workflow instances that are still active
    pub fn list_active_workflows(&self) -> StoreResult<Vec<WorkflowInstance>> {
        Ok(self
            .list_workflows()?
            .into_iter()
            .filter(|w| w.status() == WorkflowStatus::Active)
            .collect())
    }

    // =========================================================================
    // Task operations
    // =========================================================================

    /// Store a task
    pub fn put_task(&self, task: &Task) -> StoreResult<()> {
        let key = schema::keys::task(&task.workflow_id, &task.id);
        self.put(schema::CF_TASKS, &key, task)
    }

    /// Get a task by workflow and task ID
    pub fn get_task(&self, workflow_id: &str, task_id: &str) -> StoreResult<Option<Task>> {
        let key = schema::keys::task(workflow_id, task_id);
        self.get(schema::CF_TASKS, &key)
    }

    /// Get all tasks for a workflow
    pub fn get_workflow_tasks(&self, workflow_id: &str) -> StoreResult<Vec<Task>> {
        let prefix = format!("task:{}:", workflow_id);
        let keys = self.list_keys(schema::CF_TASKS, &prefix)?;

        let tasks: Vec<Task> = keys
            .iter()
            .filter_map(|key| self.get(schema::CF_TASKS, key).ok()?)
            .collect();

        Ok(tasks)
    }

    // =========================================================================
    // Escalation operations
    // =========================================================================

    /// Store escalation state for a workflow
    pub fn put_escalation(&self, state: &EscalationState) -> StoreResult<()> {
        let key = schema::keys::escalation(&state.workflow_id);
        self.put(schema::CF_ESCALATIONS, &key, state)
    }

    /// Get escalation state for a workflow
    pub fn get_escalation(&self, workflow_id: &str) -> StoreResult<Option<EscalationState>> {
        let key = schema::keys::escalation(workflow_id);
        self.get(schema::CF_ESCALATIONS, &key)
    }

    // =========================================================================
    // Event operations (for replay)
    // =========================================================================

    /// Store an event (serialized as JSON for debuggability)
    pub fn put_event(
        &self,
        timestamp_nanos: i64,
        event_id: &str,
        event: &impl Serialize,
    ) -> StoreResult<()> {
        let key = schema::keys::event(timestamp_nanos, event_id);
        let bytes =
            serde_json::to_vec(event).map_err(|e| StoreError::Serialization(e.to_string()))?;

        let db = self.db.read().map_err(|_| StoreError::LockPoisoned)?;
        let cf = db
            .cf_handle(schema::CF_EVENTS)
            .ok_or_else(|| StoreError::ColumnFamilyNotFound(schema::CF_EVENTS.to_string()))?;

        db.put_cf(&cf, key.as_bytes(), bytes)?;
        Ok(())
    }

    /// Get events in a time range
    pub fn get_events_range<T: DeserializeOwned>(
        &self,
        start_nanos: i64,
        end_nanos: i64,
    ) -> StoreResult<Vec<(i64, T)>> {
        let db = self.db.read().map_err(|_| StoreError::LockPoisoned)?;
        let cf = db
            .cf_handle(schema::CF_EVENTS)
            .ok_or_else(|| StoreError::ColumnFamilyNotFound(schema::CF_EVENTS.to_string()))?;

        let start_key = schema::keys::event(start_nanos, "");
        let iter = db.iterator_cf(
            &cf,
            rocksdb::IteratorMode::From(start_key.as_bytes(), rocksdb::Direction::Forward),
        );

        let mut events = Vec::new();
        for result in iter {
            let (key, value) = result?;
            let key_str = String::from_utf8(key.to_vec())
                .map_err(|e| StoreError::Deserialization(e.to_string()))?;

            if let Some(ts) = schema::keys::parse_event_timestamp(&key_str) {
                if ts > end_nanos {
                    break;
                }
                let event: T = serde_json::from_slice(&value)
                    .map_err(|e| StoreError::Deserialization(e.to_string()))?;
                events.push((ts, event));
            }
        }

        Ok(events)
    }

    /// Delete old events before a timestamp
    pub fn prune_events_before(&self, timestamp_nanos: i64) -> StoreResult<usize> {
        let db = self.db.read().map_err(|_| StoreError::LockPoisoned)?;
        let cf = db
            .cf_handle(schema::CF_EVENTS)
            .ok_or_else(|| StoreError::ColumnFamilyNotFound(schema::CF_EVENTS.to_string()))?;

        let start_key = schema::keys::event(0, "");
        let end_key = schema::keys::event(timestamp_nanos, "");

        // Collect keys to delete
        let mut keys_to_delete = Vec::new();
        let iter = db.iterator_cf(
            &cf,
            rocksdb::IteratorMode::From(start_key.as_bytes(), rocksdb::Direction::Forward),
        );

        for result in iter {
            let (key, _) = result?;
            let key_str = String::from_utf8(key.to_vec())
                .map_err(|e| StoreError::Deserialization(e.to_string()))?;

            if key_str >= end_key {
                break;
            }
            keys_to_delete.push(key.to_vec());
        }

        let count = keys_to_delete.len();
        for key in keys_to_delete {
            db.delete_cf(&cf, key)?;
        }

        Ok(count)
    }
}
