//! Column family definitions for RocksDB state store
//!
//! Each column family provides logical separation of data types
//! while sharing the same RocksDB instance.

/// Column family for workflow instances
pub const CF_WORKFLOWS: &str = "workflows";

/// Column family for tasks
pub const CF_TASKS: &str = "tasks";

/// Column family for escalation state
pub const CF_ESCALATIONS: &str = "escalations";

/// Column family for event history
pub const CF_EVENTS: &str = "events";

/// All column family names
pub const ALL_CFS: &[&str] = &[CF_WORKFLOWS, CF_TASKS, CF_ESCALATIONS, CF_EVENTS];

/// Key prefixes for compound keys
pub mod keys {
    /// Create a workflow key
    pub fn workflow(workflow_id: &str) -> String {
        format!("wf:{}", workflow_id)
    }

    /// Create a task key (workflow + task for prefix scans)
    pub fn task(workflow_id: &str, task_id: &str) -> String {
        format!("task:{}:{}", workflow_id, task_id)
    }

    /// Create an escalation key
    pub fn escalation(workflow_id: &str) -> String {
        format!("esc:{}", workflow_id)
    }

    /// Create an event key (timestamp-based for ordering)
    pub fn event(timestamp_nanos: i64, event_id: &str) -> String {
        format!("evt:{:020}:{}", timestamp_nanos, event_id)
    }

    /// Parse event timestamp from key
    pub fn parse_event_timestamp(key: &str) -> Option<i64> {
        let parts: Vec<&str> = key.split(':').collect();
        if parts.len() >= 2 && parts[0] == "evt" {
            parts[1].parse().ok()
        } else {
            None
        }
    }
}
