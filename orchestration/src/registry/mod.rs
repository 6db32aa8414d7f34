//! Agent registry — persona capability and health metadata
//!
//! Tracks which agent personas exist, the business domains they cover, and
//! live health metadata (availability, latency, error rates) used by the
//! router when picking a delegation target.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// The named agent personas of the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentId {
    /// Orchestrator — receives all inbound events and coordinates the rest.
    Grace,
    /// Lead capture and qualification.
    Nyra,
    /// Bookings and orders.
    Solari,
    /// Task management.
    Ruvo,
    /// Marketing campaigns.
    Liora,
    /// Community engagement.
    Sage,
    /// Content lifecycle.
    Elan,
    /// Analytics and audience insight.
    Zevi,
    /// Knowledge retrieval.
    Atlas,
}

impl AgentId {
    /// All personas, orchestrator first.
    pub fn all() -> &'static [AgentId] {
        &[
            Self::Grace,
            Self::Nyra,
            Self::Solari,
            Self::Ruvo,
            Self::Liora,
            Self::Sage,
            Self::Elan,
            Self::Zevi,
            Self::Atlas,
        ]
    }

    /// Full persona name as used in runbooks and hub records.
    pub fn persona(&self) -> &'static str {
        match self {
            Self::Grace => "Grace Fields",
            Self::Nyra => "Nyra",
            Self::Solari => "Solari",
            Self::Ruvo => "Ruvo",
            Self::Liora => "Liora",
            Self::Sage => "Sage",
            Self::Elan => "Elan",
            Self::Zevi => "Zevi",
            Self::Atlas => "Atlas",
        }
    }

    /// Business domain the persona owns.
    pub fn domain(&self) -> &'static str {
        match self {
            Self::Grace => "orchestration",
            Self::Nyra => "leads",
            Self::Solari => "bookings",
            Self::Ruvo => "tasks",
            Self::Liora => "marketing",
            Self::Sage => "community",
            Self::Elan => "content",
            Self::Zevi => "analytics",
            Self::Atlas => "knowledge",
        }
    }

    /// Whether this persona is a specialist (everyone but the orchestrator).
    pub fn is_specialist(&self) -> bool {
        !matches!(self, Self::Grace)
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Grace => write!(f, "grace"),
            Self::Nyra => write!(f, "nyra"),
            Self::Solari => write!(f, "solari"),
            Self::Ruvo => write!(f, "ruvo"),
            Self::Liora => write!(f, "liora"),
            Self::Sage => write!(f, "sage"),
            Self::Elan => write!(f, "elan"),
            Self::Zevi => write!(f, "zevi"),
            Self::Atlas => write!(f, "atlas"),
        }
    }
}

/// Capabilities of an agent persona
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentCapabilities {
    /// Event-type prefixes this agent handles as primary.
    pub event_prefixes: Vec<String>,
    /// Whether the agent may receive escalated work from other agents.
    pub accepts_escalations: bool,
    /// Whether the agent may be delegated to concurrently with others.
    pub supports_coordination: bool,
    /// Human-readable description of the agent's specialty.
    pub specialty: String,
}

impl AgentCapabilities {
    /// Default capabilities for each persona.
    pub fn for_agent(agent: AgentId) -> Self {
        let prefixes = |list: &[&str]| list.iter().map(|s| s.to_string()).collect();
        match agent {
            AgentId::Grace => Self {
                event_prefixes: prefixes(&[]),
                accepts_escalations: true,
                supports_coordination: true,
                specialty: "Event routing, multi-agent coordination, escalation handling"
                    .to_string(),
            },
            AgentId::Nyra => Self {
                event_prefixes: prefixes(&["lead", "contact"]),
                accepts_escalations: false,
                supports_coordination: true,
                specialty: "Lead capture, scoring, and qualification".to_string(),
            },
            AgentId::Solari => Self {
                event_prefixes: prefixes(&["booking", "order", "appointment"]),
                accepts_escalations: false,
                supports_coordination: true,
                specialty: "Booking confirmation and order fulfillment".to_string(),
            },
            AgentId::Ruvo => Self {
                event_prefixes: prefixes(&["task"]),
                accepts_escalations: false,
                supports_coordination: true,
                specialty: "Task creation, assignment, and tracking".to_string(),
            },
            AgentId::Liora => Self {
                event_prefixes: prefixes(&["campaign", "marketing"]),
                accepts_escalations: false,
                supports_coordination: true,
                specialty: "Campaign scheduling and audience touches".to_string(),
            },
            AgentId::Sage => Self {
                event_prefixes: prefixes(&["community", "member"]),
                accepts_escalations: false,
                supports_coordination: true,
                specialty: "Community onboarding and engagement".to_string(),
            },
            AgentId::Elan => Self {
                event_prefixes: prefixes(&["content"]),
                accepts_escalations: false,
                supports_coordination: true,
                specialty: "Content lifecycle from draft to published".to_string(),
            },
            AgentId::Zevi => Self {
                event_prefixes: prefixes(&["analytics", "metrics"]),
                accepts_escalations: false,
                supports_coordination: true,
                specialty: "Event aggregation and audience analytics".to_string(),
            },
            AgentId::Atlas => Self {
                event_prefixes: prefixes(&["knowledge", "query"]),
                accepts_escalations: false,
                supports_coordination: false,
                specialty: "Knowledge base retrieval".to_string(),
            },
        }
    }
}

/// Live health metadata for an agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentHealth {
    /// Whether the agent is currently accepting delegations.
    pub available: bool,
    /// Average handling latency in milliseconds (rolling).
    pub avg_latency_ms: u64,
    /// Number of successful deliveries in the current window.
    pub success_count: u64,
    /// Number of failed deliveries in the current window.
    pub error_count: u64,
    /// Last time health changed (Unix timestamp seconds).
    pub last_checked_secs: u64,
    /// Optional human-readable status message.
    pub status_message: Option<String>,
}

impl AgentHealth {
    /// Create a default healthy state.
    pub fn healthy() -> Self {
        Self {
            available: true,
            avg_latency_ms: 0,
            success_count: 0,
            error_count: 0,
            last_checked_secs: unix_now(),
            status_message: None,
        }
    }

    /// Create an unavailable state with a reason.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            available: false,
            avg_latency_ms: 0,
            success_count: 0,
            error_count: 0,
            last_checked_secs: unix_now(),
            status_message: Some(reason.into()),
        }
    }

    /// Compute success rate (0.0 - 1.0). No traffic counts as healthy.
    pub fn success_rate(&self) -> f32 {
        let total = self.success_count + self.error_count;
        if total == 0 {
            1.0
        } else {
            self.success_count as f32 / total as f32
        }
    }

    /// Record a successful delivery with latency.
    pub fn record_success(&mut self, latency_ms: u64) {
        self.avg_latency_ms =
            (self.avg_latency_ms * self.success_count + latency_ms) / (self.success_count + 1);
        self.success_count += 1;
        self.last_checked_secs = unix_now();
    }

    /// Record a failed delivery.
    pub fn record_failure(&mut self) {
        self.error_count += 1;
        self.last_checked_secs = unix_now();
    }
}

/// A registered agent entry combining identity, capabilities, and health
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentEntry {
    pub agent: AgentId,
    pub persona: String,
    pub domain: String,
    pub capabilities: AgentCapabilities,
    pub health: AgentHealth,
}

impl AgentEntry {
    pub fn new(agent: AgentId) -> Self {
        Self {
            persona: agent.persona().to_string(),
            domain: agent.domain().to_string(),
            capabilities: AgentCapabilities::for_agent(agent),
            health: AgentHealth::healthy(),
            agent,
        }
    }

    /// Whether this agent is usable (available + healthy enough).
    pub fn is_usable(&self) -> bool {
        self.health.available && self.health.success_rate() >= 0.5
    }
}

/// Registry of all known agents with their capabilities and health
pub struct AgentRegistry {
    entries: HashMap<AgentId, AgentEntry>,
}

impl AgentRegistry {
    /// Create a registry pre-populated with all personas.
    pub fn new() -> Self {
        let mut entries = HashMap::new();
        for &agent in AgentId::all() {
            entries.insert(agent, AgentEntry::new(agent));
        }
        Self { entries }
    }

    /// Get an entry by agent ID.
    pub fn get(&self, agent: AgentId) -> Option<&AgentEntry> {
        self.entries.get(&agent)
    }

    /// Get a mutable entry for health updates.
    pub fn get_mut(&mut self, agent: AgentId) -> Option<&mut AgentEntry> {
        self.entries.get_mut(&agent)
    }

    /// Record a delivery outcome against an agent's health.
    pub fn record_delivery(&mut self, agent: AgentId, success: bool, latency_ms: u64) {
        if let Some(entry) = self.entries.get_mut(&agent) {
            if success {
                entry.health.record_success(latency_ms);
            } else {
                entry.health.record_failure();
            }
        }
    }

    /// All usable specialists, best health first.
    pub fn usable_specialists(&self) -> Vec<&AgentEntry> {
        let mut entries: Vec<&AgentEntry> = self
            .entries
            .values()
            .filter(|e| e.agent.is_specialist() && e.is_usable())
            .collect();
        entries.sort_by(|a, b| {
            b.health
                .success_rate()
                .partial_cmp(&a.health.success_rate())
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.health.avg_latency_ms.cmp(&b.health.avg_latency_ms))
        });
        entries
    }

    /// Mark an agent as unavailable.
    pub fn mark_unavailable(&mut self, agent: AgentId, reason: impl Into<String>) {
        if let Some(entry) = self.entries.get_mut(&agent) {
            entry.health = AgentHealth::unavailable(reason);
        }
    }

    /// Mark an agent as available again.
    pub fn mark_available(&mut self, agent: AgentId) {
        if let Some(entry) = self.entries.get_mut(&agent) {
            entry.health.available = true;
            entry.health.status_message = None;
            entry.health.last_checked_secs = unix_now();
        }
    }
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_populated() {
        let registry = AgentRegistry::new();
        for &agent in AgentId::all() {
            assert!(registry.get(agent).is_some(), "missing {agent}");
        }
    }

    #[test]
    fn test_capabilities_prefixes() {
        let caps = AgentCapabilities::for_agent(AgentId::Nyra);
        assert!(caps.event_prefixes.contains(&"lead".to_string()));
        assert!(!caps.accepts_escalations);

        let grace = AgentCapabilities::for_agent(AgentId::Grace);
        assert!(grace.accepts_escalations);
        assert!(grace.event_prefixes.is_empty());
    }

    #[test]
    fn test_health_success_rate() {
        let mut h = AgentHealth::healthy();
        assert_eq!(h.success_rate(), 1.0);

        h.record_success(100);
        h.record_failure();
        assert_eq!(h.success_rate(), 0.5);
    }

    #[test]
    fn test_mark_unavailable() {
        let mut registry = AgentRegistry::new();
        registry.mark_unavailable(AgentId::Solari, "maintenance");
        let entry = registry.get(AgentId::Solari).unwrap();
        assert!(!entry.health.available);
        assert!(!entry.is_usable());

        registry.mark_available(AgentId::Solari);
        assert!(registry.get(AgentId::Solari).unwrap().is_usable());
    }

    #[test]
    fn test_usable_specialists_excludes_grace() {
        let registry = AgentRegistry::new();
        let specialists = registry.usable_specialists();
        assert_eq!(specialists.len(), 8);
        assert!(specialists.iter().all(|e| e.agent != AgentId::Grace));
    }

    #[test]
    fn test_record_delivery_updates_health() {
        let mut registry = AgentRegistry::new();
        registry.record_delivery(AgentId::Nyra, true, 40);
        registry.record_delivery(AgentId::Nyra, false, 0);
        let entry = registry.get(AgentId::Nyra).unwrap();
        assert_eq!(entry.health.success_count, 1);
        assert_eq!(entry.health.error_count, 1);
    }
}
