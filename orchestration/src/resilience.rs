//! Resilience — degraded record-hub synchronization
//!
//! The network treats the record hub as the system of record, but the hub
//! being down must never block event processing. Instead of hard errors,
//! sync operations return degraded responses with confidence levels,
//! warnings, and which tier actually served the write.
//!
//! # Design
//!
//! ```text
//! Sync attempt
//!   ├─ Hub succeeds → DegradedResponse { level: Full, ... }
//!   ├─ Hub fails, journal succeeds → DegradedResponse { level: Partial, warnings, ... }
//!   └─ All fail → DegradedResponse { level: Unavailable, ... }
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use orchestration::resilience::{DegradedResponse, FallbackChain};
//!
//! let chain = FallbackChain::new("workflow_sync")
//!     .add_tier("hub", 1.0)
//!     .add_tier("local_journal", 0.6);
//!
//! // Try each tier, return first success with appropriate confidence
//! let response = chain.execute(|tier| try_sync(tier));
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How much of the sync path is available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DegradationLevel {
    /// Hub reachable, record written to the system of record.
    Full,
    /// Reduced fidelity — a fallback tier holds the record for later replay.
    Partial,
    /// Every tier failed — the record was dropped with an alert.
    Unavailable,
}

impl std::fmt::Display for DegradationLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Full => write!(f, "full"),
            Self::Partial => write!(f, "partial"),
            Self::Unavailable => write!(f, "unavailable"),
        }
    }
}

/// A sync result wrapped with degradation metadata.
///
/// Consumers check `level` and `confidence` to decide whether a replay is
/// owed, and `warnings` for operator-facing diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DegradedResponse<T> {
    /// The actual response payload.
    pub payload: T,
    /// Current degradation level.
    pub level: DegradationLevel,
    /// Confidence in the response (0.0–1.0).
    /// - Full: 1.0
    /// - Partial: depends on fallback tier
    /// - Unavailable: 0.0
    pub confidence: f64,
    /// Which tier produced this response.
    pub served_by: String,
    /// Warning messages for the consumer.
    pub warnings: Vec<String>,
    /// When this response was produced.
    pub timestamp: DateTime<Utc>,
}

impl<T> DegradedResponse<T> {
    /// Create a full-confidence response from the primary tier.
    pub fn full(payload: T, served_by: &str) -> Self {
        Self {
            payload,
            level: DegradationLevel::Full,
            confidence: 1.0,
            served_by: served_by.to_string(),
            warnings: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    /// Create a partial-confidence response from a fallback tier.
    pub fn partial(payload: T, served_by: &str, confidence: f64, warning: &str) -> Self {
        Self {
            payload,
            level: DegradationLevel::Partial,
            confidence: confidence.clamp(0.0, 1.0),
            served_by: served_by.to_string(),
            warnings: vec![warning.to_string()],
            timestamp: Utc::now(),
        }
    }

    /// Create an unavailable response with a best-effort payload.
    pub fn unavailable(payload: T, warning: &str) -> Self {
        Self {
            payload,
            level: DegradationLevel::Unavailable,
            confidence: 0.0,
            served_by: "none".to_string(),
            warnings: vec![warning.to_string()],
            timestamp: Utc::now(),
        }
    }

    /// Whether this response is at full confidence.
    pub fn is_full(&self) -> bool {
        self.level == DegradationLevel::Full
    }

    /// Whether any degradation has occurred.
    pub fn is_degraded(&self) -> bool {
        self.level != DegradationLevel::Full
    }
}

/// A tier in a fallback chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackTier {
    /// Identifier for this tier (e.g., "hub", "local_journal").
    pub name: String,
    /// Confidence factor when this tier serves the response (0.0–1.0).
    pub confidence: f64,
}

/// Ordered chain of fallback tiers for a sync operation.
///
/// When the primary tier fails, the chain tries each subsequent tier
/// in order, returning the first success with adjusted confidence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackChain {
    /// Name of the operation this chain serves.
    pub operation: String,
    /// Ordered tiers from highest to lowest fidelity.
    pub tiers: Vec<FallbackTier>,
}

impl FallbackChain {
    /// Create a new chain for an operation.
    pub fn new(operation: &str) -> Self {
        Self {
            operation: operation.to_string(),
            tiers: Vec::new(),
        }
    }

    /// Add a fallback tier with a confidence factor.
    pub fn add_tier(mut self, name: &str, confidence: f64) -> Self {
        self.tiers.push(FallbackTier {
            name: name.to_string(),
            confidence: confidence.clamp(0.0, 1.0),
        });
        self
    }

    /// Execute the fallback chain with a closure that tries each tier.
    ///
    /// The closure receives the tier name and returns Ok(result) or Err(reason).
    /// Returns a DegradedResponse wrapping the first successful result.
    pub fn execute<T, F>(&self, mut try_fn: F) -> DegradedResponse<Option<T>>
    where
        F: FnMut(&str) -> Result<T, String>,
    {
        let mut warnings = Vec::new();

        for (idx, tier) in self.tiers.iter().enumerate() {
            match try_fn(&tier.name) {
                Ok(result) => {
                    if idx == 0 {
                        return DegradedResponse::full(Some(result), &tier.name);
                    }
                    let warning = format!(
                        "{}: primary tier(s) failed, using fallback '{}'",
                        self.operation, tier.name
                    );
                    warnings.push(warning.clone());
                    let mut resp =
                        DegradedResponse::partial(Some(result), &tier.name, tier.confidence, "");
                    resp.warnings = warnings;
                    return resp;
                }
                Err(reason) => {
                    warnings.push(format!(
                        "{} '{}' failed: {}",
                        self.operation, tier.name, reason
                    ));
                }
            }
        }

        // All tiers failed
        let mut resp = DegradedResponse::unavailable(
            None,
            &format!(
                "{}: all {} tiers exhausted",
                self.operation,
                self.tiers.len()
            ),
        );
        resp.warnings = warnings;
        resp
    }

    /// Number of tiers in the chain.
    pub fn tier_count(&self) -> usize {
        self.tiers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degraded_response_full() {
        let resp = DegradedResponse::full("synced", "hub");
        assert!(resp.is_full());
        assert!(!resp.is_degraded());
        assert_eq!(resp.confidence, 1.0);
        assert_eq!(resp.served_by, "hub");
        assert!(resp.warnings.is_empty());
    }

    #[test]
    fn test_degraded_response_unavailable() {
        let resp: DegradedResponse<String> =
            DegradedResponse::unavailable("dropped".to_string(), "all tiers failed");
        assert!(resp.is_degraded());
        assert_eq!(resp.level, DegradationLevel::Unavailable);
        assert_eq!(resp.confidence, 0.0);
    }

    #[test]
    fn test_confidence_clamping() {
        let resp = DegradedResponse::partial(42, "tier", 1.5, "over 1");
        assert_eq!(resp.confidence, 1.0);

        let resp = DegradedResponse::partial(42, "tier", -0.5, "under 0");
        assert_eq!(resp.confidence, 0.0);
    }

    #[test]
    fn test_chain_hub_succeeds() {
        let chain = FallbackChain::new("workflow_sync")
            .add_tier("hub", 1.0)
            .add_tier("local_journal", 0.6);

        let resp = chain.execute(|tier| {
            if tier == "hub" {
                Ok("written")
            } else {
                Err("not called".to_string())
            }
        });

        assert!(resp.is_full());
        assert_eq!(resp.payload, Some("written"));
        assert_eq!(resp.served_by, "hub");
        assert!(resp.warnings.is_empty());
    }

    #[test]
    fn test_chain_falls_to_journal() {
        let chain = FallbackChain::new("workflow_sync")
            .add_tier("hub", 1.0)
            .add_tier("local_journal", 0.6);

        let resp = chain.execute(|tier| match tier {
            "hub" => Err("connection refused".to_string()),
            "local_journal" => Ok("journaled"),
            _ => Err("not reached".to_string()),
        });

        assert!(resp.is_degraded());
        assert_eq!(resp.level, DegradationLevel::Partial);
        assert_eq!(resp.payload, Some("journaled"));
        assert_eq!(resp.served_by, "local_journal");
        assert_eq!(resp.confidence, 0.6);
        assert_eq!(resp.warnings.len(), 2); // hub failure + fallback notice
    }

    #[test]
    fn test_chain_all_fail() {
        let chain = FallbackChain::new("task_sync")
            .add_tier("hub", 1.0)
            .add_tier("local_journal", 0.6);

        let resp: DegradedResponse<Option<String>> = chain.execute(|_| Err("disk full".to_string()));

        assert_eq!(resp.level, DegradationLevel::Unavailable);
        assert!(resp.payload.is_none());
        assert_eq!(resp.confidence, 0.0);
        assert_eq!(resp.warnings.len(), 2); // One per failed tier
    }

    #[test]
    fn test_chain_empty() {
        let chain = FallbackChain::new("empty");

        let resp: DegradedResponse<Option<String>> = chain.execute(|_| Ok("never".to_string()));

        assert_eq!(resp.level, DegradationLevel::Unavailable);
        assert!(resp.payload.is_none());
    }

    #[test]
    fn test_degradation_level_ordering() {
        assert!(DegradationLevel::Full < DegradationLevel::Partial);
        assert!(DegradationLevel::Partial < DegradationLevel::Unavailable);
    }

    #[test]
    fn test_degraded_response_json_roundtrip() {
        let resp = DegradedResponse::partial("queued".to_string(), "local_journal", 0.6, "hub down");
        let json = serde_json::to_string(&resp).unwrap();
        let parsed: DegradedResponse<String> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.payload, "queued");
        assert_eq!(parsed.confidence, 0.6);
        assert_eq!(parsed.level, DegradationLevel::Partial);
    }
}
