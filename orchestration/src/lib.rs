//! Network Orchestration Library
//!
//! Core engine for routing business events between integrated systems
//! through named agent personas, with severity-tiered escalation and
//! durable workflow state.
//!
//! # Components
//!
//! ## Events
//! - `events::ingest`: Idempotent webhook ingestion with blake3 dedup
//! - `events::bus`: Tokio broadcast pub/sub for lifecycle events
//! - `events::history`: Replay and querying (with `heavy-state`)
//!
//! ## Routing
//! - `routing::rules`: Longest-prefix routing table over event types
//! - `routing::circuit_breaker`: Per-agent breakers and fallback ladders
//!
//! ## Escalation
//! - Four tiers: specialist, coordinated, orchestrator, human
//! - Deterministic engine driven by per-workflow attempt state
//!
//! ## Workflow and Tasks
//! - `workflow`: Validated state machine, one active instance per
//!   (entity, kind)
//! - `tasks`: Work items that always reference a live workflow
//!
//! ## Persistence
//! - `state`: RocksDB column-family store behind the `heavy-state` feature
//! - `resilience`: Degraded record-hub sync with fallback chains

#![allow(clippy::uninlined_format_args)]

pub mod delegation;
pub mod escalation;
pub mod events;
pub mod registry;
pub mod resilience;
pub mod routing;
#[cfg(feature = "heavy-state")]
pub mod state;
pub mod tasks;
pub mod workflow;

// Re-export key types
pub use delegation::{AgentMessage, DeliveryOutcome, DeliveryReport, MessageType};
pub use escalation::{
    EscalationConfig, EscalationDecision, EscalationEngine, EscalationState, EscalationTier,
    IssueCategory, NextAction, Severity,
};
pub use events::{
    BusinessEvent, EventBus, EventFilter, IngestOutcome, IngestPipeline, OrchestrationEvent,
    SharedEventBus,
};
pub use registry::{AgentCapabilities, AgentId, AgentRegistry};
pub use routing::{CircuitBreaker, FallbackLadder, RouteDecision, RoutingTable};
pub use tasks::{Assignee, Task, TaskBoard, TaskStatus};
pub use workflow::{
    SharedWorkflowEngine, WorkflowEngine, WorkflowInstance, WorkflowState, WorkflowStatus,
};
