//! Event history and replay functionality
//!
//! Provides the ability to replay orchestration events from RocksDB
//! for recovery and debugging purposes.

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use super::types::OrchestrationEvent;
use crate::state::SharedStateStore;

/// Error type for history operations
#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("Store error: {0}")]
    StoreError(String),

    #[error("Event parsing error: {0}")]
    ParseError(String),
}

/// Result type for history operations
pub type HistoryResult<T> = Result<T, HistoryError>;

/// Event history manager for replay and querying
pub struct EventHistory {
    store: SharedStateStore,
}

impl EventHistory {
    /// Create a new event history manager
    pub fn new(store: SharedStateStore) -> Self {
        Self { store }
    }

    /// Get all events in a time range
    pub fn get_events(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> HistoryResult<Vec<OrchestrationEvent>> {
        let start_nanos = start.timestamp_nanos_opt().unwrap_or(0);
        let end_nanos = end.timestamp_nanos_opt().unwrap_or(i64::MAX);

        let events: Vec<OrchestrationEvent> = self
            .store
            .get_events_range(start_nanos, end_nanos)
            .map_err(|e| HistoryError::StoreError(e.to_string()))?
            .into_iter()
            .map(|(_, event)| event)
            .collect();

        debug!(
            count = events.len(),
            "Retrieved {} events from history",
            events.len()
        );

        Ok(events)
    }

    /// Get events for the last N minutes
    pub fn get_recent_events(&self, minutes: i64) -> HistoryResult<Vec<OrchestrationEvent>> {
        let end = Utc::now();
        let start = end - Duration::minutes(minutes);
        self.get_events(start, end)
    }

    /// Get events for a specific business entity
    pub fn get_entity_events(&self, entity_id: &str) -> HistoryResult<Vec<OrchestrationEvent>> {
        // Get all events and filter by entity
        // In a production system, we might want a secondary index
        let all_events = self.get_recent_events(60 * 24)?; // Last 24 hours

        let entity_events: Vec<OrchestrationEvent> = all_events
            .into_iter()
            .filter(|e| e.entity_id() == Some(entity_id))
            .collect();

        Ok(entity_events)
    }

    /// Get events for a specific workflow
    pub fn get_workflow_events(&self, workflow_id: &str) -> HistoryResult<Vec<OrchestrationEvent>> {
        let all_events = self.get_recent_events(60 * 24)?;

        let workflow_events: Vec<OrchestrationEvent> = all_events
            .into_iter()
            .filter(|e| e.workflow_id() == Some(workflow_id))
            .collect();

        Ok(workflow_events)
    }

    /// Replay events through a callback
    pub async fn replay<F, Fut>(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        mut callback: F,
    ) -> HistoryResult<ReplayStats>
    where
        F: FnMut(OrchestrationEvent) -> Fut,
        Fut: std::future::Future<Output = ()>,
    {
        let events = self.get_events(start, end)?;
        let total = events.len();

        info!(total, "Starting event replay");

        let mut stats = ReplayStats::new();
        for event in events {
            stats.record_event(&event);
            callback(event).await;
        }

        info!(
            total = stats.total_events,
            entities = stats.entities_seen,
            workflows = stats.workflows_seen,
            "Event replay complete"
        );

        Ok(stats)
    }

    /// Prune old events to manage storage
    pub fn prune_before(&self, cutoff: DateTime<Utc>) -> HistoryResult<usize> {
        let cutoff_nanos = cutoff.timestamp_nanos_opt().unwrap_or(0);
        let count = self
            .store
            .prune_events_before(cutoff_nanos)
            .map_err(|e| HistoryError::StoreError(e.to_string()))?;

        info!(count, cutoff = %cutoff, "Pruned old events");
        Ok(count)
    }

    /// Get event statistics for a time range
    pub fn get_stats(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> HistoryResult<EventStats> {
        let events = self.get_events(start, end)?;
        Ok(EventStats::from_events(&events))
    }
}

/// Statistics from replay or query
#[derive(Debug, Default)]
pub struct ReplayStats {
    pub total_events: usize,
    pub entities_seen: usize,
    pub workflows_seen: usize,
    pub failures_seen: usize,
    entities: std::collections::HashSet<String>,
    workflows: std::collections::HashSet<String>,
}

impl ReplayStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_event(&mut self, event: &OrchestrationEvent) {
        self.total_events += 1;

        if let Some(entity_id) = event.entity_id() {
            if self.entities.insert(entity_id.to_string()) {
                self.entities_seen += 1;
            }
        }

        if let Some(workflow_id) = event.workflow_id() {
            if self.workflows.insert(workflow_id.to_string()) {
                self.workflows_seen += 1;
            }
        }

        if matches!(event, OrchestrationEvent::AgentFailed { .. }) {
            self.failures_seen += 1;
        }
    }
}

/// Aggregate statistics for events
#[derive(Debug, Default, serde::Serialize)]
pub struct EventStats {
    pub total_events: usize,
    pub events_by_type: std::collections::HashMap<String, usize>,
    pub unique_entities: usize,
    pub unique_workflows: usize,
    pub duplicates_dropped: usize,
    pub escalations: usize,
    pub human_flags: usize,
    pub failures: usize,
}

impl EventStats {
    pub fn from_events(events: &[OrchestrationEvent]) -> Self {
        let mut stats = Self::default();
        let mut entities = std::collections::HashSet::new();
        let mut workflows = std::collections::HashSet::new();

        for event in events {
            stats.total_events += 1;

            let event_type = event.event_type().to_string();
            *stats.events_by_type.entry(event_type).or_insert(0) += 1;

            if let Some(eid) = event.entity_id() {
                entities.insert(eid.to_string());
            }
            if let Some(wid) = event.workflow_id() {
                workflows.insert(wid.to_string());
            }

            match event {
                OrchestrationEvent::EventDuplicate { .. } => stats.duplicates_dropped += 1,
                OrchestrationEvent::EscalationTriggered { .. } => stats.escalations += 1,
                OrchestrationEvent::HumanFlagged { .. } => stats.human_flags += 1,
                OrchestrationEvent::AgentFailed { .. } => stats.failures += 1,
                _ => {}
            }
        }

        stats.unique_entities = entities.len();
        stats.unique_workflows = workflows.len();

        stats
    }
}

/// Builder for replaying events with transformations
pub struct ReplayBuilder {
    store: SharedStateStore,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    filter_entity: Option<String>,
    filter_workflow: Option<String>,
    filter_types: Option<Vec<String>>,
}

impl ReplayBuilder {
    /// Create a new replay builder
    pub fn new(store: SharedStateStore) -> Self {
        let now = Utc::now();
        Self {
            store,
            start: now - Duration::hours(24),
            end: now,
            filter_entity: None,
            filter_workflow: None,
            filter_types: None,
        }
    }

    /// Set the time range for replay
    pub fn time_range(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    /// Filter by business entity ID
    pub fn entity(mut self, entity_id: &str) -> Self {
        self.filter_entity = Some(entity_id.to_string());
        self
    }

    /// Filter by workflow ID
    pub fn workflow(mut self, workflow_id: &str) -> Self {
        self.filter_workflow = Some(workflow_id.to_string());
        self
    }

    /// Filter by event types
    pub fn event_types(mut self, types: Vec<&str>) -> Self {
        self.filter_types = Some(types.into_iter().map(String::from).collect());
        self
    }

    /// Execute replay and collect events
    pub fn collect(self) -> HistoryResult<Vec<OrchestrationEvent>> {
        let history = EventHistory::new(self.store);
        let mut events = history.get_events(self.start, self.end)?;

        // Apply filters
        if let Some(ref entity_id) = self.filter_entity {
            events.retain(|e| e.entity_id() == Some(entity_id.as_str()));
        }

        if let Some(ref workflow_id) = self.filter_workflow {
            events.retain(|e| e.workflow_id() == Some(workflow_id.as_str()));
        }

        if let Some(ref types) = self.filter_types {
            events.retain(|e| types.contains(&e.event_type().to_string()));
        }

        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::AgentId;

    #[test]
    fn test_event_stats() {
        let events = vec![
            OrchestrationEvent::EventReceived {
                event_id: "ev-1".to_string(),
                event_type: "lead.capture".to_string(),
                source: "typeform".to_string(),
                business_entity_id: "entity-1".to_string(),
                timestamp: Utc::now(),
            },
            OrchestrationEvent::WorkflowCreated {
                workflow_id: "wf-1".to_string(),
                business_entity_id: "entity-1".to_string(),
                kind: "lead".to_string(),
                timestamp: Utc::now(),
            },
            OrchestrationEvent::EventDuplicate {
                event_type: "lead.capture".to_string(),
                source: "typeform".to_string(),
                timestamp: Utc::now(),
            },
        ];

        let stats = EventStats::from_events(&events);

        assert_eq!(stats.total_events, 3);
        assert_eq!(stats.unique_entities, 1);
        assert_eq!(stats.unique_workflows, 1);
        assert_eq!(stats.duplicates_dropped, 1);
    }

    #[test]
    fn test_replay_stats() {
        let mut stats = ReplayStats::new();

        let event1 = OrchestrationEvent::WorkflowCreated {
            workflow_id: "wf-1".to_string(),
            business_entity_id: "entity-1".to_string(),
            kind: "lead".to_string(),
            timestamp: Utc::now(),
        };

        let event2 = OrchestrationEvent::AgentFailed {
            event_id: "ev-2".to_string(),
            workflow_id: "wf-2".to_string(),
            agent: AgentId::Solari,
            category: crate::escalation::IssueCategory::AgentTimeout,
            detail: "no response".to_string(),
            timestamp: Utc::now(),
        };

        stats.record_event(&event1);
        stats.record_event(&event2);

        assert_eq!(stats.total_events, 2);
        assert_eq!(stats.entities_seen, 1);
        assert_eq!(stats.workflows_seen, 2);
        assert_eq!(stats.failures_seen, 1);
    }
}
