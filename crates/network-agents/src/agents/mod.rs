//! Agent personas for the automation network.
//!
//! Each persona implements the [`Agent`] trait: it receives a delegation
//! message plus the originating business event and returns a structured
//! outcome or a categorized error. The [`AgentRoster`] holds one instance
//! of every persona and is what the orchestrator dispatches through.

pub mod specialists;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use orchestration::delegation::AgentMessage;
use orchestration::escalation::IssueCategory;
use orchestration::events::BusinessEvent;
use orchestration::registry::AgentId;

/// What an agent produced for a delegation.
#[derive(Debug, Clone)]
pub struct AgentOutcome {
    /// One-line human-readable summary for logs and telemetry.
    pub summary: String,
    /// Structured record destined for the system of record.
    pub record: serde_json::Value,
}

impl AgentOutcome {
    pub fn new(summary: impl Into<String>, record: serde_json::Value) -> Self {
        Self {
            summary: summary.into(),
            record,
        }
    }
}

/// Error type for agent delegation handling.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("Delegation rejected: {0}")]
    Rejected(String),

    #[error("Payload missing required field: {0}")]
    MissingField(&'static str),

    #[error("Agent timed out")]
    Timeout,

    #[error("External service error: {0}")]
    External(String),
}

impl AgentError {
    /// Map this failure to an escalation issue category.
    pub fn category(&self) -> IssueCategory {
        match self {
            Self::Rejected(_) => IssueCategory::AgentRejected,
            Self::MissingField(_) => IssueCategory::MissingField,
            Self::Timeout => IssueCategory::AgentTimeout,
            Self::External(_) => IssueCategory::ExternalService,
        }
    }
}

/// Result type for agent handlers.
pub type AgentResult = Result<AgentOutcome, AgentError>;

/// A named persona that handles delegated business events.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Which persona this is.
    fn id(&self) -> AgentId;

    /// Handle one delegation.
    async fn handle(&self, message: &AgentMessage, event: &BusinessEvent) -> AgentResult;
}

/// Shared handle to an agent.
pub type SharedAgent = Arc<dyn Agent>;

/// The full set of personas, keyed by id.
pub struct AgentRoster {
    agents: HashMap<AgentId, SharedAgent>,
}

impl AgentRoster {
    /// Empty roster.
    pub fn new() -> Self {
        Self {
            agents: HashMap::new(),
        }
    }

    /// Roster with all nine standard personas.
    pub fn standard() -> Self {
        let mut roster = Self::new();
        roster.register(Arc::new(specialists::Grace::new()));
        roster.register(Arc::new(specialists::Nyra::new()));
        roster.register(Arc::new(specialists::Solari::new()));
        roster.register(Arc::new(specialists::Ruvo::new()));
        roster.register(Arc::new(specialists::Liora::new()));
        roster.register(Arc::new(specialists::Sage::new()));
        roster.register(Arc::new(specialists::Elan::new()));
        roster.register(Arc::new(specialists::Zevi::new()));
        roster.register(Arc::new(specialists::Atlas::new()));
        roster
    }

    /// Add or replace a persona.
    pub fn register(&mut self, agent: SharedAgent) {
        self.agents.insert(agent.id(), agent);
    }

    /// Look up a persona by id.
    pub fn get(&self, id: AgentId) -> Option<&SharedAgent> {
        self.agents.get(&id)
    }

    /// Ids currently registered.
    pub fn ids(&self) -> Vec<AgentId> {
        let mut ids: Vec<AgentId> = self.agents.keys().copied().collect();
        ids.sort_by_key(|id| id.to_string());
        ids
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

impl Default for AgentRoster {
    fn default() -> Self {
        Self::standard()
    }
}
