//! State persistence for network orchestration
//!
//! RocksDB-backed storage (behind the `heavy-state` feature) for:
//! - Workflow instances that survive process restarts
//! - Tasks produced by workflows
//! - Escalation state per workflow
//! - Event history for replay and debugging
//!
//! # Architecture
//!
//! The state store uses RocksDB column families to logically separate
//! different data types while sharing a single database instance:
//!
//! - `workflows`: WorkflowInstance lifecycle records
//! - `tasks`: Task work items keyed under their workflow
//! - `escalations`: EscalationState per workflow
//! - `events`: OrchestrationEvent history for replay
//!
//! # Usage
//!
//! ```ignore
//! use orchestration::state::StateStore;
//!
//! // Open or create the state store
//! let store = StateStore::open("./network-state")?.shared();
//!
//! // Persist a workflow instance
//! store.put_workflow(&workflow)?;
//!
//! // Replay recent events
//! let events = store.get_events_range(start_nanos, end_nanos)?;
//! ```

pub mod schema;
pub mod store;

// Re-export core types
pub use store::{SharedStateStore, StateStore, StoreError, StoreResult};
