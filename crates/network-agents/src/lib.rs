//! Agent personas and the orchestrator runtime for the automation network.
//!
//! The `orchestration` crate supplies the domain machinery (events,
//! workflows, routing, escalation); this crate supplies the nine personas,
//! the record-hub client, configuration, telemetry, and the dispatch loop
//! that ties them together.

pub mod agents;
pub mod config;
pub mod hub;
pub mod orchestrator;
pub mod telemetry;

pub use agents::{Agent, AgentError, AgentOutcome, AgentResult, AgentRoster, SharedAgent};
pub use config::NetworkConfig;
pub use hub::{HttpHub, HubError, HubResult, MemoryHub, RecordHub};
pub use orchestrator::{
    DispatchError, DispatchOutcome, DispatchResult, DispatchSummary, Orchestrator,
};
pub use telemetry::{append_telemetry, AggregateAnalytics, DispatchMetrics, TelemetryReader};
