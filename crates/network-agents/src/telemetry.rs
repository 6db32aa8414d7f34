//! Structured telemetry for network operation.
//!
//! Captures one record per dispatched event. One output sink:
//! `.network-telemetry.jsonl` (append-only, one JSON object per line) for
//! streaming analysis of routing quality and escalation pressure.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Metrics for a single dispatched event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchMetrics {
    pub event_id: String,
    pub event_type: String,
    pub source: String,
    pub workflow_id: String,
    /// Agent that ultimately resolved (or last attempted) the event.
    pub final_agent: String,
    /// Tier the dispatch ended at.
    pub final_tier: String,
    pub resolved: bool,
    pub escalated: bool,
    pub human_flagged: bool,
    pub attempts: u32,
    pub elapsed_ms: u64,
    /// Whether the hub sync ran degraded.
    pub hub_degraded: bool,
    pub timestamp: String,
}

impl DispatchMetrics {
    /// Emit this record as a structured tracing event.
    pub fn emit(&self) {
        info!(
            target: "network.metrics",
            event_id = %self.event_id,
            event_type = %self.event_type,
            final_agent = %self.final_agent,
            final_tier = %self.final_tier,
            resolved = self.resolved,
            escalated = self.escalated,
            attempts = self.attempts,
            elapsed_ms = self.elapsed_ms,
            "dispatch_complete"
        );
    }
}

/// Append a dispatch record to `.network-telemetry.jsonl`.
///
/// Each line is a complete JSON object (JSONL format).
pub fn append_telemetry(metrics: &DispatchMetrics, root: &Path) {
    let path = root.join(".network-telemetry.jsonl");
    match serde_json::to_string(metrics) {
        Ok(json) => {
            use std::io::Write;
            match std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
            {
                Ok(mut file) => {
                    if let Err(e) = writeln!(file, "{json}") {
                        warn!("Failed to append telemetry: {e}");
                    }
                }
                Err(e) => warn!("Failed to open telemetry file: {e}"),
            }
        }
        Err(e) => warn!("Failed to serialize telemetry: {e}"),
    }
}

/// Aggregate analytics computed from multiple dispatch records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateAnalytics {
    pub total_dispatches: usize,
    pub resolve_rate: f64,
    pub escalation_rate: f64,
    pub human_flag_rate: f64,
    pub average_attempts: f64,
    pub average_elapsed_ms: f64,
    pub hub_degraded_count: usize,
    pub dispatches_by_agent: std::collections::HashMap<String, usize>,
}

/// Reads and analyzes `.network-telemetry.jsonl` files.
pub struct TelemetryReader {
    records: Vec<DispatchMetrics>,
}

impl TelemetryReader {
    /// Read dispatch records from a JSONL file.
    pub fn read_from_file(path: &Path) -> std::io::Result<Self> {
        use std::fs::File;
        use std::io::{BufRead, BufReader};

        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let mut records = Vec::new();

        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record: DispatchMetrics = serde_json::from_str(&line)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
            records.push(record);
        }

        Ok(Self { records })
    }

    /// Get the parsed records.
    pub fn records(&self) -> &[DispatchMetrics] {
        &self.records
    }

    /// Compute aggregate analytics across all loaded records.
    pub fn aggregate_analytics(&self) -> AggregateAnalytics {
        let total = self.records.len();
        if total == 0 {
            return AggregateAnalytics {
                total_dispatches: 0,
                resolve_rate: 0.0,
                escalation_rate: 0.0,
                human_flag_rate: 0.0,
                average_attempts: 0.0,
                average_elapsed_ms: 0.0,
                hub_degraded_count: 0,
                dispatches_by_agent: std::collections::HashMap::new(),
            };
        }

        let mut resolved = 0usize;
        let mut escalated = 0usize;
        let mut human_flagged = 0usize;
        let mut hub_degraded = 0usize;
        let mut total_attempts = 0u64;
        let mut total_elapsed = 0u64;
        let mut by_agent = std::collections::HashMap::new();

        for record in &self.records {
            if record.resolved {
                resolved += 1;
            }
            if record.escalated {
                escalated += 1;
            }
            if record.human_flagged {
                human_flagged += 1;
            }
            if record.hub_degraded {
                hub_degraded += 1;
            }
            total_attempts += record.attempts as u64;
            total_elapsed += record.elapsed_ms;
            *by_agent.entry(record.final_agent.clone()).or_insert(0) += 1;
        }

        AggregateAnalytics {
            total_dispatches: total,
            resolve_rate: resolved as f64 / total as f64,
            escalation_rate: escalated as f64 / total as f64,
            human_flag_rate: human_flagged as f64 / total as f64,
            average_attempts: total_attempts as f64 / total as f64,
            average_elapsed_ms: total_elapsed as f64 / total as f64,
            hub_degraded_count: hub_degraded,
            dispatches_by_agent: by_agent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(agent: &str, resolved: bool, escalated: bool, attempts: u32) -> DispatchMetrics {
        DispatchMetrics {
            event_id: uuid::Uuid::new_v4().to_string(),
            event_type: "lead.capture".into(),
            source: "typeform".into(),
            workflow_id: "wf-1".into(),
            final_agent: agent.into(),
            final_tier: if escalated { "coordinated" } else { "specialist" }.into(),
            resolved,
            escalated,
            human_flagged: false,
            attempts,
            elapsed_ms: 120,
            hub_degraded: false,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    #[test]
    fn test_append_and_read_jsonl() {
        let dir = tempfile::tempdir().unwrap();

        append_telemetry(&record("nyra", true, false, 1), dir.path());
        append_telemetry(&record("solari", false, true, 3), dir.path());

        let path = dir.path().join(".network-telemetry.jsonl");
        let reader = TelemetryReader::read_from_file(&path).unwrap();
        assert_eq!(reader.records().len(), 2);
        assert_eq!(reader.records()[0].final_agent, "nyra");
        assert!(!reader.records()[1].resolved);
    }

    #[test]
    fn test_aggregate_analytics() {
        let dir = tempfile::tempdir().unwrap();
        append_telemetry(&record("nyra", true, false, 1), dir.path());
        append_telemetry(&record("nyra", true, false, 1), dir.path());
        append_telemetry(&record("solari", false, true, 3), dir.path());
        append_telemetry(&record("grace", true, true, 4), dir.path());

        let path = dir.path().join(".network-telemetry.jsonl");
        let analytics = TelemetryReader::read_from_file(&path)
            .unwrap()
            .aggregate_analytics();

        assert_eq!(analytics.total_dispatches, 4);
        assert_eq!(analytics.resolve_rate, 0.75);
        assert_eq!(analytics.escalation_rate, 0.5);
        assert_eq!(analytics.dispatches_by_agent["nyra"], 2);
        assert!((analytics.average_attempts - 2.25).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_analytics() {
        let reader = TelemetryReader { records: vec![] };
        let analytics = reader.aggregate_analytics();
        assert_eq!(analytics.total_dispatches, 0);
        assert_eq!(analytics.resolve_rate, 0.0);
    }

    #[test]
    fn test_reader_skips_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".network-telemetry.jsonl");
        let json = serde_json::to_string(&record("atlas", true, false, 1)).unwrap();
        std::fs::write(&path, format!("{json}\n\n")).unwrap();

        let reader = TelemetryReader::read_from_file(&path).unwrap();
        assert_eq!(reader.records().len(), 1);
    }
}
