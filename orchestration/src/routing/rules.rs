//! Routing table — maps event types to agent personas
//!
//! Classification is a longest-prefix match over the event type. Every event
//! routes somewhere: unmatched types fall back to the orchestrator for review.

use serde::{Deserialize, Serialize};

use crate::events::types::BusinessEvent;
use crate::registry::AgentId;

/// A single routing rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteRule {
    /// Event-type prefix this rule matches, e.g. `lead`.
    pub prefix: String,
    /// Primary handler.
    pub primary: AgentId,
    /// Agents notified alongside the primary (and convened at tier 2).
    pub secondaries: Vec<AgentId>,
}

/// The routing decision for one event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteDecision {
    pub primary: AgentId,
    pub secondaries: Vec<AgentId>,
    /// The rule prefix that matched, if any.
    pub matched_prefix: Option<String>,
    /// Free-text rationale for logs and telemetry.
    pub rationale: String,
}

/// Ordered routing table with longest-prefix-wins semantics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingTable {
    rules: Vec<RouteRule>,
}

impl RoutingTable {
    /// Build a table from explicit rules.
    pub fn new(rules: Vec<RouteRule>) -> Self {
        Self { rules }
    }

    /// The standard network table.
    pub fn default_table() -> Self {
        let rule = |prefix: &str, primary, secondaries: &[AgentId]| RouteRule {
            prefix: prefix.to_string(),
            primary,
            secondaries: secondaries.to_vec(),
        };
        Self::new(vec![
            rule("lead", AgentId::Nyra, &[AgentId::Zevi]),
            rule("contact", AgentId::Nyra, &[]),
            rule("booking", AgentId::Solari, &[AgentId::Ruvo]),
            rule("appointment", AgentId::Solari, &[AgentId::Ruvo]),
            rule("order", AgentId::Solari, &[AgentId::Zevi]),
            rule("task", AgentId::Ruvo, &[]),
            rule("campaign", AgentId::Liora, &[AgentId::Zevi]),
            rule("marketing", AgentId::Liora, &[AgentId::Zevi]),
            rule("community", AgentId::Sage, &[]),
            rule("member", AgentId::Sage, &[AgentId::Liora]),
            rule("content", AgentId::Elan, &[]),
            rule("analytics", AgentId::Zevi, &[]),
            rule("metrics", AgentId::Zevi, &[]),
            rule("knowledge", AgentId::Atlas, &[]),
            rule("query", AgentId::Atlas, &[]),
        ])
    }

    /// Classify an event type into a routing decision.
    ///
    /// The longest matching prefix wins; ties cannot occur because prefixes
    /// of equal length are distinct. Unmatched types go to the orchestrator.
    pub fn classify(&self, event_type: &str) -> RouteDecision {
        let best = self
            .rules
            .iter()
            .filter(|r| event_type.starts_with(r.prefix.as_str()))
            .max_by_key(|r| r.prefix.len());

        match best {
            Some(rule) => RouteDecision {
                primary: rule.primary,
                secondaries: rule.secondaries.clone(),
                matched_prefix: Some(rule.prefix.clone()),
                rationale: format!(
                    "{event_type} matched '{}' -> {}",
                    rule.prefix, rule.primary
                ),
            },
            None => RouteDecision {
                primary: AgentId::Grace,
                secondaries: Vec::new(),
                matched_prefix: None,
                rationale: format!("{event_type} unmatched -> orchestrator review"),
            },
        }
    }

    /// Classify a normalized business event.
    pub fn route(&self, event: &BusinessEvent) -> RouteDecision {
        self.classify(&event.event_type)
    }

    /// The configured rules.
    pub fn rules(&self) -> &[RouteRule] {
        &self.rules
    }
}

impl Default for RoutingTable {
    fn default() -> Self {
        Self::default_table()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lead_routes_to_nyra() {
        let table = RoutingTable::default_table();
        let d = table.classify("lead.capture");
        assert_eq!(d.primary, AgentId::Nyra);
        assert_eq!(d.secondaries, vec![AgentId::Zevi]);
        assert_eq!(d.matched_prefix.as_deref(), Some("lead"));
    }

    #[test]
    fn test_booking_routes_to_solari() {
        let table = RoutingTable::default_table();
        assert_eq!(table.classify("booking_created").primary, AgentId::Solari);
        assert_eq!(table.classify("order.paid").primary, AgentId::Solari);
    }

    #[test]
    fn test_unmatched_falls_back_to_grace() {
        let table = RoutingTable::default_table();
        let d = table.classify("webhook.mystery");
        assert_eq!(d.primary, AgentId::Grace);
        assert!(d.matched_prefix.is_none());
        assert!(d.secondaries.is_empty());
    }

    #[test]
    fn test_longest_prefix_wins() {
        let table = RoutingTable::new(vec![
            RouteRule {
                prefix: "m".into(),
                primary: AgentId::Liora,
                secondaries: vec![],
            },
            RouteRule {
                prefix: "member".into(),
                primary: AgentId::Sage,
                secondaries: vec![],
            },
        ]);
        assert_eq!(table.classify("member.join").primary, AgentId::Sage);
        assert_eq!(table.classify("marketing.blast").primary, AgentId::Liora);
    }

    #[test]
    fn test_classification_is_total() {
        let table = RoutingTable::default_table();
        for ty in ["", "x", "task.create", "community.post", "knowledge.ask"] {
            // Never panics, always yields a primary.
            let _ = table.classify(ty).primary;
        }
    }
}
