//! Event-driven coordination for the agent network
//!
//! This module provides the ingestion and pub/sub infrastructure that
//! moves business events through the network and persists the lifecycle
//! stream for replay.
//!
//! # Architecture
//!
//! 1. **Event Types** (`types.rs`): `BusinessEvent` (normalized inbound
//!    payload) and the 13 `OrchestrationEvent` lifecycle variants.
//!
//! 2. **Ingest** (`ingest.rs`): Validation and idempotent deduplication
//!    of raw integration payloads.
//!
//! 3. **Event Bus** (`bus.rs`): Tokio broadcast-based pub/sub with
//!    optional persistence to RocksDB.
//!
//! 4. **Event History** (`history.rs`, `heavy-state`): Query and replay
//!    capabilities for debugging and recovery.
//!
//! # Event Flow
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//! │   Ingest     │────▶│  Event Bus   │────▶│  Subscribers │
//! │  (validate)  │     │  (broadcast) │     │   (recv)     │
//! └──────────────┘     └──────┬───────┘     └──────────────┘
//!                             │
//!                             ▼
//!                      ┌──────────────┐
//!                      │   RocksDB    │
//!                      │  (persist)   │
//!                      └──────────────┘
//! ```

pub mod bus;
#[cfg(feature = "heavy-state")]
pub mod history;
pub mod ingest;
pub mod types;

// Re-export core types
pub use bus::{
    EventBus, EventBusError, EventBusExt, EventBusResult, EventFilter, FilteredReceiver,
    SharedEventBus,
};
#[cfg(feature = "heavy-state")]
pub use history::{
    EventHistory, EventStats, HistoryError, HistoryResult, ReplayBuilder, ReplayStats,
};
pub use ingest::{IngestError, IngestOutcome, IngestPipeline, IngestResult};
pub use types::{BusinessEvent, EventId, OrchestrationEvent, WorkflowId};
