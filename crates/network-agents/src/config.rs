use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Record-hub connection settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HubSettings {
    pub url: String,
    pub token: Option<String>,
    pub timeout_secs: u64,
}

impl Default for HubSettings {
    fn default() -> Self {
        Self {
            url: std::env::var("HSN_HUB_URL")
                .unwrap_or_else(|_| "http://localhost:8600".into()),
            token: std::env::var("HSN_HUB_TOKEN").ok(),
            timeout_secs: 10,
        }
    }
}

/// Dispatch loop settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DispatchSettings {
    /// Per-delegation timeout in seconds.
    pub agent_timeout_secs: u64,
    /// Idempotency window for webhook redeliveries.
    pub dedup_window_secs: u64,
    /// Extra attempts allowed at the specialist and coordinated tiers
    /// beyond the first, before the tier's budget forces an escalation.
    pub max_retries: u32,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            agent_timeout_secs: 30,
            dedup_window_secs: 600,
            max_retries: 2,
        }
    }
}

/// Escalation engine thresholds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EscalationSettings {
    /// Same-category failures before a tier escalates.
    pub repeat_threshold: u32,
    /// Total failures across tiers before escalating.
    pub failure_threshold: u32,
}

impl Default for EscalationSettings {
    fn default() -> Self {
        Self {
            repeat_threshold: 2,
            failure_threshold: 3,
        }
    }
}

/// Top-level network configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub hub: HubSettings,
    pub dispatch: DispatchSettings,
    pub escalation: EscalationSettings,
}

impl NetworkConfig {
    /// Load configuration from a TOML file, env defaults filling the gaps.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("Failed to parse config {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = NetworkConfig::default();
        assert_eq!(config.dispatch.agent_timeout_secs, 30);
        assert_eq!(config.dispatch.dedup_window_secs, 600);
        assert_eq!(config.escalation.repeat_threshold, 2);
        assert!(!config.hub.url.is_empty());
    }

    #[test]
    fn test_from_file_partial_override() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[hub]
url = "http://hub.internal:9000"
timeout_secs = 5

[dispatch]
agent_timeout_secs = 12
"#
        )
        .unwrap();

        let config = NetworkConfig::from_file(file.path()).unwrap();
        assert_eq!(config.hub.url, "http://hub.internal:9000");
        assert_eq!(config.hub.timeout_secs, 5);
        assert_eq!(config.dispatch.agent_timeout_secs, 12);
        // Untouched sections keep defaults
        assert_eq!(config.escalation.failure_threshold, 3);
    }

    #[test]
    fn test_from_file_missing_is_error() {
        assert!(NetworkConfig::from_file("/nonexistent/network.toml").is_err());
    }
}
