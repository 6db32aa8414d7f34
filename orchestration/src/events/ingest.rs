//! Idempotent event ingestion
//!
//! Integrations retry webhook deliveries, so the same payload can arrive
//! more than once. The pipeline validates the raw payload, normalizes it
//! into a [`BusinessEvent`], and drops redeliveries inside the dedup window.
//!
//! The dedup key is a blake3 hash over the source and the sender-declared
//! event id; payloads without one are hashed whole.

use chrono::Utc;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::debug;

use super::types::BusinessEvent;

/// Default dedup window
const DEFAULT_WINDOW_SECS: u64 = 600;

/// Error type for ingestion
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("Payload is not a JSON object")]
    NotAnObject,

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Event type must not be empty")]
    EmptyEventType,

    #[error("Lock poisoned")]
    LockPoisoned,
}

/// Result type for ingestion
pub type IngestResult<T> = Result<T, IngestError>;

/// Outcome of ingesting one raw payload
#[derive(Debug)]
pub enum IngestOutcome {
    /// New event, normalized and ready for routing.
    Accepted(BusinessEvent),
    /// Redelivery inside the dedup window, dropped.
    Duplicate,
}

impl IngestOutcome {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate)
    }
}

/// Validating, deduplicating ingest pipeline
pub struct IngestPipeline {
    /// Dedup key → first-seen instant.
    seen: Mutex<HashMap<[u8; 32], Instant>>,
    window: Duration,
}

impl IngestPipeline {
    /// Pipeline with the default ten-minute dedup window.
    pub fn new() -> Self {
        Self::with_window(Duration::from_secs(DEFAULT_WINDOW_SECS))
    }

    /// Pipeline with an explicit dedup window.
    pub fn with_window(window: Duration) -> Self {
        Self {
            seen: Mutex::new(HashMap::new()),
            window,
        }
    }

    /// Validate and normalize one raw payload from an integration.
    ///
    /// Returns `Duplicate` when the same delivery was already accepted
    /// inside the dedup window.
    pub fn accept(&self, source: &str, raw: &serde_json::Value) -> IngestResult<IngestOutcome> {
        let obj = raw.as_object().ok_or(IngestError::NotAnObject)?;

        let event_type = obj
            .get("type")
            .and_then(|v| v.as_str())
            .ok_or(IngestError::MissingField("type"))?;
        if event_type.trim().is_empty() {
            return Err(IngestError::EmptyEventType);
        }
        let sender_id = obj
            .get("sender_id")
            .and_then(|v| v.as_str())
            .ok_or(IngestError::MissingField("sender_id"))?;
        let business_entity_id = obj
            .get("business_entity_id")
            .and_then(|v| v.as_str())
            .ok_or(IngestError::MissingField("business_entity_id"))?;

        let key = dedup_key(source, obj, raw);
        {
            let mut seen = self.seen.lock().map_err(|_| IngestError::LockPoisoned)?;
            let now = Instant::now();
            seen.retain(|_, first| now.duration_since(*first) < self.window);

            if seen.contains_key(&key) {
                debug!(source, event_type, "Duplicate delivery dropped");
                return Ok(IngestOutcome::Duplicate);
            }
            seen.insert(key, now);
        }

        let event = BusinessEvent {
            event_id: uuid::Uuid::new_v4().to_string(),
            event_type: event_type.to_string(),
            source: source.to_string(),
            sender_id: sender_id.to_string(),
            business_entity_id: business_entity_id.to_string(),
            payload: raw.clone(),
            timestamp: Utc::now(),
        };
        debug!(source, event_type, event_id = %event.event_id, "Event accepted");
        Ok(IngestOutcome::Accepted(event))
    }

    /// Number of dedup keys currently tracked.
    pub fn tracked(&self) -> usize {
        self.seen.lock().map(|s| s.len()).unwrap_or(0)
    }
}

impl Default for IngestPipeline {
    fn default() -> Self {
        Self::new()
    }
}

/// Dedup key: source plus the sender's event id (integrations send it as
/// `event_id` or `id`), or the whole payload when the sender supplied none.
fn dedup_key(
    source: &str,
    obj: &serde_json::Map<String, serde_json::Value>,
    raw: &serde_json::Value,
) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    hasher.update(source.as_bytes());
    hasher.update(b"\x00");
    let external_id = obj
        .get("event_id")
        .or_else(|| obj.get("id"))
        .and_then(|v| v.as_str());
    match external_id {
        Some(external_id) => {
            hasher.update(external_id.as_bytes());
        }
        None => {
            hasher.update(raw.to_string().as_bytes());
        }
    }
    *hasher.finalize().as_bytes()
}
