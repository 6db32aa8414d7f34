//! Issue categories and severity classification
//!
//! Delivery failures are bucketed into categories; each category maps to a
//! severity that drives the tier response: critical issues alert and jump
//! tiers, warnings log and retry, info continues.

use serde::{Deserialize, Serialize};

/// What went wrong with a delegation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCategory {
    /// Payload did not match what the agent expects.
    InvalidPayload,
    /// A required payload field was absent.
    MissingField,
    /// The agent did not respond within the delegation timeout.
    AgentTimeout,
    /// The agent explicitly refused the work.
    AgentRejected,
    /// The system of record could not be reached.
    HubUnavailable,
    /// A downstream integration returned an error.
    ExternalService,
    /// A downstream integration throttled us.
    RateLimited,
    /// Anything we could not classify.
    Unknown,
}

impl IssueCategory {
    /// Severity of this category.
    pub fn severity(&self) -> Severity {
        match self {
            Self::HubUnavailable | Self::ExternalService => Severity::Critical,
            Self::InvalidPayload
            | Self::MissingField
            | Self::AgentTimeout
            | Self::AgentRejected
            | Self::RateLimited
            | Self::Unknown => Severity::Warning,
        }
    }
}

impl std::fmt::Display for IssueCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::InvalidPayload => "invalid_payload",
            Self::MissingField => "missing_field",
            Self::AgentTimeout => "agent_timeout",
            Self::AgentRejected => "agent_rejected",
            Self::HubUnavailable => "hub_unavailable",
            Self::ExternalService => "external_service",
            Self::RateLimited => "rate_limited",
            Self::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

/// Severity tier for an issue.
///
/// Mapping to action: Critical alerts and escalates immediately, Warning is
/// logged and retried within tier budgets, Info is recorded and the pipeline
/// continues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outage_categories_are_critical() {
        assert_eq!(IssueCategory::HubUnavailable.severity(), Severity::Critical);
        assert_eq!(IssueCategory::ExternalService.severity(), Severity::Critical);
    }

    #[test]
    fn test_delivery_categories_are_warning() {
        assert_eq!(IssueCategory::AgentTimeout.severity(), Severity::Warning);
        assert_eq!(IssueCategory::InvalidPayload.severity(), Severity::Warning);
        assert_eq!(IssueCategory::Unknown.severity(), Severity::Warning);
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Critical > Severity::Warning);
        assert!(Severity::Warning > Severity::Info);
    }

    #[test]
    fn test_category_serde() {
        let json = serde_json::to_string(&IssueCategory::AgentRejected).unwrap();
        assert_eq!(json, "\"agent_rejected\"");
    }
}
