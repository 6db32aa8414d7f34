//! Circuit breaker and fallback ladder for agent delegation.
//!
//! The circuit breaker tracks consecutive failures per [`AgentId`]. When
//! failures exceed a configurable threshold the circuit *opens* and the
//! agent is temporarily skipped. After a cooldown the circuit enters
//! *half-open* state to probe recovery.
//!
//! The [`FallbackLadder`] walks an ordered list of agents, skipping any
//! whose circuit is currently open.

use crate::registry::AgentId;
use std::collections::HashMap;

/// Circuit breaker state for a single agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Healthy — delegations allowed.
    Closed,
    /// Tripped — delegations blocked until cooldown expires.
    Open,
    /// Cooldown expired — one probe delegation allowed.
    HalfOpen,
}

fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Per-agent circuit breaker tracking consecutive failures.
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    consecutive_failures: HashMap<AgentId, u32>,
    last_failure_secs: HashMap<AgentId, u64>,
    /// Consecutive failures before the circuit opens.
    pub failure_threshold: u32,
    /// Seconds after last failure before Open → HalfOpen.
    pub cooldown_secs: u64,
}

impl CircuitBreaker {
    /// Create a new circuit breaker.
    pub fn new(failure_threshold: u32, cooldown_secs: u64) -> Self {
        Self {
            consecutive_failures: HashMap::new(),
            last_failure_secs: HashMap::new(),
            failure_threshold,
            cooldown_secs,
        }
    }

    /// Record a success — resets circuit to Closed.
    pub fn record_success(&mut self, agent: AgentId) {
        self.consecutive_failures.remove(&agent);
        self.last_failure_secs.remove(&agent);
    }

    /// Record a failure — may trip circuit to Open.
    pub fn record_failure(&mut self, agent: AgentId) {
        let count = self.consecutive_failures.entry(agent).or_insert(0);
        *count += 1;
        self.last_failure_secs.insert(agent, unix_now());
    }

    /// Current state of the circuit for `agent`.
    pub fn state(&self, agent: AgentId) -> CircuitState {
        let failures = self.consecutive_failures.get(&agent).copied().unwrap_or(0);
        if failures < self.failure_threshold {
            return CircuitState::Closed;
        }
        let last = self.last_failure_secs.get(&agent).copied().unwrap_or(0);
        if unix_now().saturating_sub(last) >= self.cooldown_secs {
            CircuitState::HalfOpen
        } else {
            CircuitState::Open
        }
    }

    /// Whether the agent may receive delegations (Closed or HalfOpen).
    pub fn is_available(&self, agent: AgentId) -> bool {
        !matches!(self.state(agent), CircuitState::Open)
    }

    /// Consecutive failures recorded for `agent`.
    pub fn failure_count(&self, agent: AgentId) -> u32 {
        self.consecutive_failures.get(&agent).copied().unwrap_or(0)
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(3, 60)
    }
}

/// Ordered fallback ladder of agents.
///
/// The first agent whose circuit is not open is returned. Route-specific
/// ladders are built from the route decision; every ladder ends at the
/// orchestrator so an event always has a destination.
#[derive(Debug, Clone)]
pub struct FallbackLadder {
    agents: Vec<AgentId>,
}

impl FallbackLadder {
    /// Create a ladder from an ordered list of agents.
    pub fn new(agents: Vec<AgentId>) -> Self {
        Self { agents }
    }

    /// Ladder for a route: primary, then secondaries, then the orchestrator.
    pub fn for_route(primary: AgentId, secondaries: &[AgentId]) -> Self {
        let mut agents = vec![primary];
        agents.extend_from_slice(secondaries);
        if !agents.contains(&AgentId::Grace) {
            agents.push(AgentId::Grace);
        }
        Self::new(agents)
    }

    /// First agent in the ladder whose circuit is not open.
    pub fn next_available(&self, breaker: &CircuitBreaker) -> Option<AgentId> {
        self.agents
            .iter()
            .copied()
            .find(|a| breaker.is_available(*a))
    }

    /// The ordered list of agents.
    pub fn agents(&self) -> &[AgentId] {
        &self.agents
    }
}
