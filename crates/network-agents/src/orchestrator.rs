//! Grace Fields — the orchestrator dispatch loop.
//!
//! One call to [`Orchestrator::dispatch`] takes a raw integration payload
//! through the whole pipeline: ingestion and dedup, routing, workflow
//! creation, delegation with per-attempt timeouts, tier escalation, human
//! flagging, record-hub sync with a journal fallback, and telemetry.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::future::join_all;
use tracing::{debug, info, warn};

use orchestration::delegation::{AgentMessage, DeliveryOutcome, DeliveryReport};
use orchestration::escalation::{
    EscalationConfig, EscalationEngine, EscalationState, EscalationTier, IssueCategory, NextAction,
    Severity, TierBudget,
};
use orchestration::events::{
    BusinessEvent, EventBus, EventBusError, IngestError, IngestOutcome, IngestPipeline,
    OrchestrationEvent, SharedEventBus,
};
use orchestration::registry::{AgentId, AgentRegistry};
use orchestration::resilience::FallbackChain;
use orchestration::routing::{CircuitBreaker, FallbackLadder, RouteDecision, RoutingTable};
use orchestration::tasks::{Assignee, TaskBoard, TaskError};
use orchestration::workflow::{WorkflowEngine, WorkflowError, WorkflowState};

use crate::agents::{AgentOutcome, AgentRoster};
use crate::config::NetworkConfig;
use crate::hub::{MemoryHub, RecordHub};
use crate::telemetry::{append_telemetry, DispatchMetrics};

/// Error type for dispatch
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    #[error(transparent)]
    Task(#[from] TaskError),

    #[error(transparent)]
    Bus(#[from] EventBusError),

    #[error("No agents convened for delegation")]
    NoAgents,

    #[error("Lock poisoned")]
    LockPoisoned,
}

/// Result type for dispatch operations
pub type DispatchResult<T> = Result<T, DispatchError>;

/// What happened to one inbound payload.
#[derive(Debug, Clone)]
pub enum DispatchOutcome {
    /// The payload was a redelivery inside the dedup window; nothing ran.
    Duplicate,
    /// The payload was dispatched through the network.
    Dispatched(DispatchSummary),
}

impl DispatchOutcome {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate)
    }

    /// The summary, if the payload was dispatched.
    pub fn summary(&self) -> Option<&DispatchSummary> {
        match self {
            Self::Duplicate => None,
            Self::Dispatched(summary) => Some(summary),
        }
    }
}

/// Summary of one completed dispatch.
#[derive(Debug, Clone)]
pub struct DispatchSummary {
    pub event_id: String,
    pub workflow_id: String,
    /// Agent that resolved (or last attempted) the event.
    pub final_agent: AgentId,
    /// Tier the dispatch ended at.
    pub final_tier: EscalationTier,
    pub resolved: bool,
    pub escalated: bool,
    pub human_flagged: bool,
    pub attempts: u32,
    pub hub_degraded: bool,
}

/// The orchestrator — Grace Fields' dispatch engine.
pub struct Orchestrator {
    roster: AgentRoster,
    routing: RoutingTable,
    registry: Mutex<AgentRegistry>,
    breaker: Mutex<CircuitBreaker>,
    workflows: WorkflowEngine,
    tasks: TaskBoard,
    escalation: EscalationEngine,
    states: Mutex<HashMap<String, EscalationState>>,
    ingest: IngestPipeline,
    bus: SharedEventBus,
    hub: Arc<dyn RecordHub>,
    journal: Arc<MemoryHub>,
    config: NetworkConfig,
    telemetry_root: Option<PathBuf>,
}

impl Orchestrator {
    /// Build an orchestrator with the standard roster and routing table.
    pub fn new(config: NetworkConfig, hub: Arc<dyn RecordHub>) -> Self {
        let escalation = EscalationEngine::with_config(EscalationConfig {
            repeat_threshold: config.escalation.repeat_threshold,
            failure_threshold: config.escalation.failure_threshold,
        });
        let ingest =
            IngestPipeline::with_window(Duration::from_secs(config.dispatch.dedup_window_secs));

        Self {
            roster: AgentRoster::standard(),
            routing: RoutingTable::default_table(),
            registry: Mutex::new(AgentRegistry::new()),
            breaker: Mutex::new(CircuitBreaker::default()),
            workflows: WorkflowEngine::new(),
            tasks: TaskBoard::new(),
            escalation,
            states: Mutex::new(HashMap::new()),
            ingest,
            bus: EventBus::new().shared(),
            hub,
            journal: Arc::new(MemoryHub::new()),
            config,
            telemetry_root: None,
        }
    }

    /// Replace the roster (used to swap in test doubles).
    pub fn with_roster(mut self, roster: AgentRoster) -> Self {
        self.roster = roster;
        self
    }

    /// Enable JSONL telemetry under `root`.
    pub fn with_telemetry_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.telemetry_root = Some(root.into());
        self
    }

    /// Handle to the lifecycle event bus.
    pub fn bus(&self) -> SharedEventBus {
        Arc::clone(&self.bus)
    }

    /// The workflow engine.
    pub fn workflows(&self) -> &WorkflowEngine {
        &self.workflows
    }

    /// The task board.
    pub fn tasks(&self) -> &TaskBoard {
        &self.tasks
    }

    /// Snapshot of an agent's delivery health.
    pub fn agent_health(&self, agent: AgentId) -> Option<orchestration::registry::AgentHealth> {
        self.registry
            .lock()
            .ok()
            .and_then(|r| r.get(agent).map(|entry| entry.health.clone()))
    }

    /// The local journal that absorbs writes when the hub is down.
    pub fn journal(&self) -> &MemoryHub {
        &self.journal
    }

    /// Dispatch one raw integration payload through the network.
    pub async fn dispatch(
        &self,
        source: &str,
        raw: &serde_json::Value,
    ) -> DispatchResult<DispatchOutcome> {
        let started = Instant::now();

        let event = match self.ingest.accept(source, raw)? {
            IngestOutcome::Duplicate => {
                let event_type = raw
                    .get("type")
                    .and_then(|v| v.as_str())
                    .unwrap_or("unknown")
                    .to_string();
                debug!(source, event_type, "Duplicate delivery dropped");
                self.bus.publish(OrchestrationEvent::EventDuplicate {
                    event_type,
                    source: source.to_string(),
                    timestamp: Utc::now(),
                })?;
                return Ok(DispatchOutcome::Duplicate);
            }
            IngestOutcome::Accepted(event) => event,
        };

        info!(
            event_id = %event.event_id,
            event_type = %event.event_type,
            source = %event.source,
            entity = %event.business_entity_id,
            "Event accepted"
        );
        self.bus.publish(OrchestrationEvent::EventReceived {
            event_id: event.event_id.clone(),
            event_type: event.event_type.clone(),
            source: event.source.clone(),
            business_entity_id: event.business_entity_id.clone(),
            timestamp: event.timestamp,
        })?;

        let route = self.routing.route(&event);
        self.bus.publish(OrchestrationEvent::EventRouted {
            event_id: event.event_id.clone(),
            primary: route.primary,
            secondaries: route.secondaries.clone(),
            rationale: route.rationale.clone(),
            timestamp: Utc::now(),
        })?;

        let (workflow, created) = self.workflows.create_or_attach(&event)?;
        if created {
            self.bus.publish(OrchestrationEvent::WorkflowCreated {
                workflow_id: workflow.id.clone(),
                business_entity_id: workflow.business_entity_id.clone(),
                kind: workflow.kind.clone(),
                timestamp: workflow.created_at,
            })?;
        }
        self.transition_if(
            &workflow.id,
            WorkflowState::Routed,
            "grace",
            Some(route.rationale.clone()),
        )?;

        let summary = self
            .run_delegation_loop(&event, &route, &workflow.id)
            .await?;

        let metrics = DispatchMetrics {
            event_id: summary.event_id.clone(),
            event_type: event.event_type.clone(),
            source: event.source.clone(),
            workflow_id: summary.workflow_id.clone(),
            final_agent: summary.final_agent.to_string(),
            final_tier: summary.final_tier.to_string(),
            resolved: summary.resolved,
            escalated: summary.escalated,
            human_flagged: summary.human_flagged,
            attempts: summary.attempts,
            elapsed_ms: started.elapsed().as_millis() as u64,
            hub_degraded: summary.hub_degraded,
            timestamp: Utc::now().to_rfc3339(),
        };
        metrics.emit();
        if let Some(root) = &self.telemetry_root {
            append_telemetry(&metrics, root);
        }

        Ok(DispatchOutcome::Dispatched(summary))
    }

    /// Delegate until the escalation engine closes, flags a human, or the
    /// attempt cap trips.
    async fn run_delegation_loop(
        &self,
        event: &BusinessEvent,
        route: &RouteDecision,
        workflow_id: &str,
    ) -> DispatchResult<DispatchSummary> {
        let ladder = FallbackLadder::for_route(route.primary, &route.secondaries);
        // The state is held out of the map for the loop's duration. Two
        // concurrent dispatches on the same workflow would each take a fresh
        // state and last writer wins; integrations deliver events for one
        // entity sequentially.
        let mut state = self
            .states
            .lock()
            .map_err(|_| DispatchError::LockPoisoned)?
            .remove(workflow_id)
            .unwrap_or_else(|| self.fresh_state(workflow_id));

        let mut attempts = 0u32;
        let mut final_agent = route.primary;
        let mut resolved = false;
        let mut escalated = false;
        let mut human_flagged = false;
        let mut hub_record: Option<serde_json::Value> = None;

        // Hard cap; tier budgets terminate the loop well before this.
        for _ in 0..16 {
            let tier_before = state.current_tier;
            let (report, outcome) = match tier_before {
                EscalationTier::Specialist => {
                    let recipient = {
                        let breaker =
                            self.breaker.lock().map_err(|_| DispatchError::LockPoisoned)?;
                        ladder.next_available(&breaker).unwrap_or(AgentId::Grace)
                    };
                    self.deliver_one(recipient, workflow_id, event).await?
                }
                EscalationTier::Coordinated => {
                    self.deliver_coordinated(route, workflow_id, event).await?
                }
                EscalationTier::Orchestrator | EscalationTier::Human => {
                    self.deliver_one(AgentId::Grace, workflow_id, event).await?
                }
            };
            attempts += 1;
            final_agent = report.agent;

            let decision = self.escalation.decide(&mut state, &report);

            if decision.escalated {
                escalated = true;
                info!(
                    workflow_id,
                    from = %tier_before,
                    to = %decision.target_tier,
                    "Escalating: {}",
                    decision.reason
                );
                self.bus.publish(OrchestrationEvent::EscalationTriggered {
                    workflow_id: workflow_id.to_string(),
                    from_tier: tier_before,
                    to_tier: decision.target_tier,
                    reason: decision.reason.clone(),
                    timestamp: Utc::now(),
                })?;
                self.transition_if(
                    workflow_id,
                    WorkflowState::Escalated,
                    "grace",
                    Some(decision.reason.clone()),
                )?;
            }

            match decision.action {
                NextAction::Close => {
                    resolved = true;
                    if let Some(outcome) = outcome {
                        info!(
                            workflow_id,
                            agent = %report.agent,
                            "Resolved: {}",
                            outcome.summary
                        );
                        hub_record = Some(outcome.record);
                    }
                    self.complete_workflow(workflow_id, event)?;
                    break;
                }
                NextAction::Retry
                | NextAction::CoordinateAgents
                | NextAction::OrchestratorTakeover => {
                    debug!(workflow_id, tier = %decision.target_tier, "{}", decision.reason);
                }
                NextAction::FlagForHuman { reason } => {
                    human_flagged = true;
                    self.flag_for_human(workflow_id, event, &report, &reason)
                        .await?;
                    break;
                }
            }
        }

        let hub_degraded = self.sync_workflow(workflow_id, hub_record.as_ref()).await?;

        let final_tier = state.current_tier;
        self.states
            .lock()
            .map_err(|_| DispatchError::LockPoisoned)?
            .insert(workflow_id.to_string(), state);

        Ok(DispatchSummary {
            event_id: event.event_id.clone(),
            workflow_id: workflow_id.to_string(),
            final_agent,
            final_tier,
            resolved,
            escalated,
            human_flagged,
            attempts,
            hub_degraded,
        })
    }

    /// Escalation state for a new workflow, with the configured attempt
    /// budget (one initial try plus `max_retries`) at the agent-facing tiers.
    fn fresh_state(&self, workflow_id: &str) -> EscalationState {
        let mut state = EscalationState::new(workflow_id);
        let budget = TierBudget {
            max_attempts: self.config.dispatch.max_retries + 1,
        };
        state.tier_budgets.insert(EscalationTier::Specialist, budget);
        state.tier_budgets.insert(EscalationTier::Coordinated, budget);
        state
    }

    /// One delegation to one agent, with timeout and circuit-breaker update.
    async fn deliver_one(
        &self,
        recipient: AgentId,
        workflow_id: &str,
        event: &BusinessEvent,
    ) -> DispatchResult<(DeliveryReport, Option<AgentOutcome>)> {
        let message = AgentMessage::delegation(
            AgentId::Grace,
            recipient,
            workflow_id,
            &event.event_id,
            event.payload.clone(),
        );
        self.bus.publish(OrchestrationEvent::DelegationSent {
            event_id: event.event_id.clone(),
            workflow_id: workflow_id.to_string(),
            recipient,
            timestamp: Utc::now(),
        })?;

        let Some(agent) = self.roster.get(recipient) else {
            let report = DeliveryReport::failed(
                recipient,
                &event.event_id,
                workflow_id,
                IssueCategory::Unknown,
                "agent not registered",
                0,
            );
            self.publish_report(&report)?;
            return Ok((report, None));
        };
        let agent = Arc::clone(agent);

        let started = Instant::now();
        let timeout = Duration::from_secs(self.config.dispatch.agent_timeout_secs);
        let result = tokio::time::timeout(timeout, agent.handle(&message, event)).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        let (report, outcome) = match result {
            Ok(Ok(outcome)) => (
                DeliveryReport::completed(recipient, &event.event_id, workflow_id, duration_ms),
                Some(outcome),
            ),
            Ok(Err(err)) => (
                DeliveryReport::failed(
                    recipient,
                    &event.event_id,
                    workflow_id,
                    err.category(),
                    err.to_string(),
                    duration_ms,
                ),
                None,
            ),
            Err(_) => (
                DeliveryReport::timed_out(recipient, &event.event_id, workflow_id, duration_ms),
                None,
            ),
        };

        {
            let mut breaker = self.breaker.lock().map_err(|_| DispatchError::LockPoisoned)?;
            if report.outcome.is_completed() {
                breaker.record_success(recipient);
            } else {
                breaker.record_failure(recipient);
            }
        }
        self.registry
            .lock()
            .map_err(|_| DispatchError::LockPoisoned)?
            .record_delivery(recipient, report.outcome.is_completed(), duration_ms);
        self.publish_report(&report)?;
        Ok((report, outcome))
    }

    /// Tier-2 delivery: convene the primary and its secondaries concurrently;
    /// the first completion wins.
    async fn deliver_coordinated(
        &self,
        route: &RouteDecision,
        workflow_id: &str,
        event: &BusinessEvent,
    ) -> DispatchResult<(DeliveryReport, Option<AgentOutcome>)> {
        let mut convened = vec![route.primary];
        for &secondary in &route.secondaries {
            if !convened.contains(&secondary) {
                convened.push(secondary);
            }
        }
        debug!(workflow_id, agents = ?convened, "Convening coordinated tier");

        let deliveries = convened
            .iter()
            .map(|&agent| self.deliver_one(agent, workflow_id, event));
        let results = join_all(deliveries).await;

        let mut first_failure = None;
        for result in results {
            let (report, outcome) = result?;
            if report.outcome.is_completed() {
                return Ok((report, outcome));
            }
            if first_failure.is_none() {
                first_failure = Some(report);
            }
        }
        first_failure
            .map(|report| (report, None))
            .ok_or(DispatchError::NoAgents)
    }

    fn publish_report(&self, report: &DeliveryReport) -> DispatchResult<()> {
        match &report.outcome {
            DeliveryOutcome::Completed => {
                self.bus.publish(OrchestrationEvent::AgentCompleted {
                    event_id: report.event_id.clone(),
                    workflow_id: report.workflow_id.clone(),
                    agent: report.agent,
                    duration_ms: report.duration_ms,
                    timestamp: Utc::now(),
                })?;
            }
            DeliveryOutcome::Failed { category, detail } => {
                warn!(
                    agent = %report.agent,
                    workflow_id = %report.workflow_id,
                    category = %category,
                    "Delegation failed: {detail}"
                );
                self.bus.publish(OrchestrationEvent::AgentFailed {
                    event_id: report.event_id.clone(),
                    workflow_id: report.workflow_id.clone(),
                    agent: report.agent,
                    category: *category,
                    detail: detail.clone(),
                    timestamp: Utc::now(),
                })?;
            }
            DeliveryOutcome::Timeout => {
                warn!(
                    agent = %report.agent,
                    workflow_id = %report.workflow_id,
                    "Delegation timed out after {}ms",
                    report.duration_ms
                );
                self.bus.publish(OrchestrationEvent::AgentFailed {
                    event_id: report.event_id.clone(),
                    workflow_id: report.workflow_id.clone(),
                    agent: report.agent,
                    category: IssueCategory::AgentTimeout,
                    detail: "delegation timed out".to_string(),
                    timestamp: Utc::now(),
                })?;
            }
        }
        Ok(())
    }

    /// Transition a workflow if the move is legal, publishing the change.
    /// A no-op when the workflow is already at (or cannot reach) `to`.
    fn transition_if(
        &self,
        workflow_id: &str,
        to: WorkflowState,
        actor: &str,
        note: Option<String>,
    ) -> DispatchResult<()> {
        let current = self.workflows.get(workflow_id)?.current_state;
        if current == to || !current.can_transition_to(to) {
            return Ok(());
        }
        self.workflows.transition(workflow_id, to, actor, note)?;
        self.bus.publish(OrchestrationEvent::WorkflowTransitioned {
            workflow_id: workflow_id.to_string(),
            from_state: current.to_string(),
            to_state: to.to_string(),
            actor: actor.to_string(),
            timestamp: Utc::now(),
        })?;
        Ok(())
    }

    fn complete_workflow(&self, workflow_id: &str, event: &BusinessEvent) -> DispatchResult<()> {
        self.transition_if(workflow_id, WorkflowState::InProgress, "grace", None)?;
        self.transition_if(
            workflow_id,
            WorkflowState::Completed,
            "grace",
            Some("delegation resolved".to_string()),
        )?;
        self.bus.publish(OrchestrationEvent::WorkflowCompleted {
            workflow_id: workflow_id.to_string(),
            business_entity_id: event.business_entity_id.clone(),
            timestamp: Utc::now(),
        })?;
        Ok(())
    }

    /// Tier-4 handling: park the workflow for staff and open a blocking task.
    async fn flag_for_human(
        &self,
        workflow_id: &str,
        event: &BusinessEvent,
        report: &DeliveryReport,
        reason: &str,
    ) -> DispatchResult<()> {
        self.transition_if(
            workflow_id,
            WorkflowState::HumanReview,
            "grace",
            Some(reason.to_string()),
        )?;

        // Critical issues get a 4-hour due date, everything else 24 hours.
        let severity = report.outcome.category().map(|c| c.severity());
        let due_hours = if severity == Some(Severity::Critical) { 4 } else { 24 };
        let due = Utc::now() + chrono::Duration::hours(due_hours);

        let workflow = self.workflows.get(workflow_id)?;
        let task = self.tasks.create(
            &workflow,
            reason,
            Assignee::Human {
                name: "operations".to_string(),
            },
            Some(due),
        )?;

        warn!(
            workflow_id,
            task_id = %task.id,
            due = %due,
            "Flagged for human intervention: {reason}"
        );
        self.bus.publish(OrchestrationEvent::TaskCreated {
            task_id: task.id.clone(),
            workflow_id: workflow_id.to_string(),
            assignee: task.assignee.to_string(),
            timestamp: task.created_at,
        })?;
        self.bus.publish(OrchestrationEvent::HumanFlagged {
            workflow_id: workflow_id.to_string(),
            business_entity_id: event.business_entity_id.clone(),
            reason: reason.to_string(),
            timestamp: Utc::now(),
        })?;

        if let Err(err) = self.hub.upsert_task(&task).await {
            warn!(task_id = %task.id, "Task sync to hub failed: {err}");
        }
        Ok(())
    }

    /// Sync the workflow to the hub, falling back to the local journal.
    /// Returns whether the sync ran degraded. Sync never fails a dispatch.
    async fn sync_workflow(
        &self,
        workflow_id: &str,
        record: Option<&serde_json::Value>,
    ) -> DispatchResult<bool> {
        let workflow = self.workflows.get(workflow_id)?;

        let mut hub_result = self.hub.upsert_workflow(&workflow).await;
        if hub_result.is_ok() {
            if let Some(record) = record {
                hub_result = self.hub.append_record(workflow_id, record).await;
            }
        }
        let journal_result = match &hub_result {
            Ok(()) => None,
            Err(_) => {
                let mut result = self.journal.upsert_workflow(&workflow).await;
                if result.is_ok() {
                    if let Some(record) = record {
                        result = self.journal.append_record(workflow_id, record).await;
                    }
                }
                Some(result)
            }
        };

        let chain = FallbackChain::new("workflow_sync")
            .add_tier("hub", 1.0)
            .add_tier("local_journal", 0.6);
        let response = chain.execute(|tier| match tier {
            "hub" => hub_result
                .as_ref()
                .map(|_| ())
                .map_err(|e| e.to_string()),
            _ => journal_result
                .as_ref()
                .map(|r| r.as_ref().map(|_| ()).map_err(|e| e.to_string()))
                .unwrap_or(Err("journal not attempted".to_string())),
        });

        if response.is_degraded() {
            let warning = response.warnings.first().cloned().unwrap_or_default();
            warn!(
                workflow_id,
                served_by = %response.served_by,
                "Workflow sync degraded: {warning}"
            );
            self.bus.publish(OrchestrationEvent::HubSyncDegraded {
                workflow_id: workflow_id.to_string(),
                served_by: response.served_by.clone(),
                warning,
                timestamp: Utc::now(),
            })?;
            return Ok(true);
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::{Agent, AgentError, AgentResult};
    use crate::hub::{HubError, MockRecordHub};
    use async_trait::async_trait;

    struct Rejecting(AgentId);

    #[async_trait]
    impl Agent for Rejecting {
        fn id(&self) -> AgentId {
            self.0
        }

        async fn handle(&self, _: &AgentMessage, _: &BusinessEvent) -> AgentResult {
            Err(AgentError::Rejected("not my domain".into()))
        }
    }

    struct Flaky(AgentId);

    #[async_trait]
    impl Agent for Flaky {
        fn id(&self) -> AgentId {
            self.0
        }

        async fn handle(&self, _: &AgentMessage, _: &BusinessEvent) -> AgentResult {
            Err(AgentError::External("503 from booking provider".into()))
        }
    }

    fn lead_payload() -> serde_json::Value {
        serde_json::json!({
            "type": "lead.capture",
            "sender_id": "form-1",
            "business_entity_id": "entity-1",
            "email": "jamie@example.com",
            "name": "Jamie",
            "interest": "retreat",
        })
    }

    fn orchestrator() -> Orchestrator {
        Orchestrator::new(NetworkConfig::default(), Arc::new(MemoryHub::new()))
    }

    #[tokio::test]
    async fn test_dispatch_resolves_at_specialist() {
        let hub = Arc::new(MemoryHub::new());
        let orch = Orchestrator::new(NetworkConfig::default(), hub.clone());

        let outcome = orch.dispatch("typeform", &lead_payload()).await.unwrap();
        let summary = outcome.summary().unwrap();

        assert!(summary.resolved);
        assert!(!summary.escalated);
        assert_eq!(summary.final_agent, AgentId::Nyra);
        assert_eq!(summary.final_tier, EscalationTier::Specialist);
        assert_eq!(summary.attempts, 1);

        let workflow = orch.workflows().get(&summary.workflow_id).unwrap();
        assert_eq!(workflow.current_state, WorkflowState::Completed);

        // Hub received the closed workflow and Nyra's record.
        assert_eq!(hub.workflow_count(), 1);
        assert_eq!(hub.records_for(&summary.workflow_id).len(), 1);

        let health = orch.agent_health(AgentId::Nyra).unwrap();
        assert_eq!(health.success_count, 1);
    }

    #[tokio::test]
    async fn test_duplicate_delivery_short_circuits() {
        let orch = orchestrator();
        let payload = lead_payload();

        let first = orch.dispatch("typeform", &payload).await.unwrap();
        assert!(!first.is_duplicate());

        let second = orch.dispatch("typeform", &payload).await.unwrap();
        assert!(second.is_duplicate());
        assert!(second.summary().is_none());
    }

    #[tokio::test]
    async fn test_unmatched_event_handled_by_orchestrator() {
        let orch = orchestrator();
        let payload = serde_json::json!({
            "type": "mystery.thing",
            "sender_id": "sys-1",
            "business_entity_id": "entity-1",
        });

        let outcome = orch.dispatch("webhook", &payload).await.unwrap();
        let summary = outcome.summary().unwrap();
        assert!(summary.resolved);
        assert_eq!(summary.final_agent, AgentId::Grace);
    }

    #[tokio::test]
    async fn test_persistent_rejection_walks_ladder_to_human() {
        let mut roster = AgentRoster::standard();
        roster.register(Arc::new(Rejecting(AgentId::Nyra)));
        roster.register(Arc::new(Rejecting(AgentId::Zevi)));
        roster.register(Arc::new(Rejecting(AgentId::Grace)));
        let orch = orchestrator().with_roster(roster);

        let outcome = orch.dispatch("typeform", &lead_payload()).await.unwrap();
        let summary = outcome.summary().unwrap();

        assert!(!summary.resolved);
        assert!(summary.escalated);
        assert!(summary.human_flagged);
        assert_eq!(summary.final_tier, EscalationTier::Human);

        let workflow = orch.workflows().get(&summary.workflow_id).unwrap();
        assert_eq!(workflow.current_state, WorkflowState::HumanReview);

        // A blocking task for staff exists against the workflow.
        let tasks = orch.tasks().list_for_workflow(&summary.workflow_id).unwrap();
        assert_eq!(tasks.len(), 1);
        assert!(matches!(tasks[0].assignee, Assignee::Human { .. }));
        assert!(tasks[0].due_date.is_some());
    }

    #[tokio::test]
    async fn test_max_retries_bounds_tier_attempts() {
        let mut roster = AgentRoster::standard();
        roster.register(Arc::new(Rejecting(AgentId::Nyra)));
        roster.register(Arc::new(Rejecting(AgentId::Zevi)));
        roster.register(Arc::new(Rejecting(AgentId::Grace)));

        let mut config = NetworkConfig::default();
        config.dispatch.max_retries = 0;
        // Thresholds out of reach so the attempt budget drives escalation.
        config.escalation.repeat_threshold = 10;
        config.escalation.failure_threshold = 10;

        let orch = Orchestrator::new(config, Arc::new(MemoryHub::new())).with_roster(roster);
        let outcome = orch.dispatch("typeform", &lead_payload()).await.unwrap();
        let summary = outcome.summary().unwrap();

        // One attempt per tier: specialist, coordinated, then orchestrator,
        // whose failure flags a human.
        assert_eq!(summary.attempts, 3);
        assert!(summary.human_flagged);
        assert_eq!(summary.final_tier, EscalationTier::Human);
    }

    #[tokio::test]
    async fn test_critical_failure_jumps_to_orchestrator() {
        let mut roster = AgentRoster::standard();
        roster.register(Arc::new(Flaky(AgentId::Solari)));
        let orch = orchestrator().with_roster(roster);

        let payload = serde_json::json!({
            "type": "booking.new",
            "sender_id": "cal-1",
            "business_entity_id": "entity-2",
            "client": "Jordan",
            "starts_at": "2026-09-01T10:00:00Z",
        });
        let outcome = orch.dispatch("calendar", &payload).await.unwrap();
        let summary = outcome.summary().unwrap();

        // External-service failure is critical: one specialist attempt, then
        // straight to the orchestrator tier where real Grace completes.
        assert!(summary.resolved);
        assert!(summary.escalated);
        assert_eq!(summary.final_tier, EscalationTier::Orchestrator);
        assert_eq!(summary.final_agent, AgentId::Grace);
        assert_eq!(summary.attempts, 2);
    }

    #[tokio::test]
    async fn test_hub_outage_falls_back_to_journal() {
        let mut mock = MockRecordHub::new();
        mock.expect_upsert_workflow()
            .returning(|_| Err(HubError::Unavailable("connection refused".into())));
        mock.expect_upsert_task().returning(|_| Ok(()));
        let orch = Orchestrator::new(NetworkConfig::default(), Arc::new(mock));

        let mut rx = orch.bus().subscribe();
        let outcome = orch.dispatch("typeform", &lead_payload()).await.unwrap();
        let summary = outcome.summary().unwrap();

        assert!(summary.resolved);
        assert!(summary.hub_degraded);
        assert!(orch.journal().workflow(&summary.workflow_id).is_some());

        let mut saw_degraded = false;
        while let Ok(event) = rx.try_recv() {
            if matches!(event, OrchestrationEvent::HubSyncDegraded { .. }) {
                saw_degraded = true;
            }
        }
        assert!(saw_degraded, "expected a hub_sync_degraded event on the bus");
    }

    #[tokio::test]
    async fn test_completed_workflow_is_not_reattached() {
        let orch = orchestrator();

        let mut payload = lead_payload();
        let first = orch.dispatch("typeform", &payload).await.unwrap();
        let first_wf = first.summary().unwrap().workflow_id.clone();

        // First workflow completed, so a fresh lead opens a new instance.
        payload["event_id"] = serde_json::json!("delivery-2");
        let second = orch.dispatch("typeform", &payload).await.unwrap();
        let second_wf = second.summary().unwrap().workflow_id.clone();
        assert_ne!(first_wf, second_wf);
    }
}
