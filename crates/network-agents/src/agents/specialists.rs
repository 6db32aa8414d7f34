//! The nine persona implementations.
//!
//! Each persona owns one business domain. Handlers are deterministic over
//! the event payload so delegation outcomes are reproducible in tests and
//! replays. External side effects (hub writes) are the orchestrator's job;
//! personas only produce the record.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::json;
use tracing::debug;

use orchestration::delegation::AgentMessage;
use orchestration::events::BusinessEvent;
use orchestration::registry::AgentId;

use super::{Agent, AgentError, AgentOutcome, AgentResult};

fn payload_str<'a>(event: &'a BusinessEvent, field: &'static str) -> Result<&'a str, AgentError> {
    event
        .payload
        .get(field)
        .and_then(|v| v.as_str())
        .ok_or(AgentError::MissingField(field))
}

// =============================================================================
// Grace — orchestrator persona
// =============================================================================

/// Grace Fields, the orchestrator. As a handler she takes unroutable or
/// escalated events and produces a review record instead of a domain record.
pub struct Grace;

impl Grace {
    pub fn new() -> Self {
        Self
    }
}

impl Default for Grace {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Agent for Grace {
    fn id(&self) -> AgentId {
        AgentId::Grace
    }

    async fn handle(&self, message: &AgentMessage, event: &BusinessEvent) -> AgentResult {
        debug!(event_type = %event.event_type, "Grace reviewing event");
        Ok(AgentOutcome::new(
            format!("orchestrator review of '{}'", event.event_type),
            json!({
                "kind": "orchestrator_review",
                "event_type": event.event_type,
                "source": event.source,
                "workflow_id": message.workflow_id,
                "needs_classification": true,
            }),
        ))
    }
}

// =============================================================================
// Nyra — lead capture
// =============================================================================

/// Scoring weights for lead qualification.
const LEAD_QUALIFIED_THRESHOLD: i64 = 60;

/// Nyra handles lead capture: scores the lead and decides qualification.
pub struct Nyra {
    threshold: i64,
}

impl Nyra {
    pub fn new() -> Self {
        Self {
            threshold: LEAD_QUALIFIED_THRESHOLD,
        }
    }

    /// Deterministic lead score in 0–100.
    ///
    /// Source base + expressed interest + contact completeness.
    fn score(event: &BusinessEvent) -> i64 {
        let mut score: i64 = match event.source.as_str() {
            "typeform" | "website" => 30,
            "referral" => 45,
            _ => 15,
        };

        if let Some(interest) = event.payload.get("interest").and_then(|v| v.as_str()) {
            let interest = interest.to_lowercase();
            for term in ["retreat", "consultation", "membership", "program"] {
                if interest.contains(term) {
                    score += 15;
                    break;
                }
            }
            if !interest.is_empty() {
                score += 10;
            }
        }

        if event.payload.get("phone").and_then(|v| v.as_str()).is_some() {
            score += 15;
        }
        if event.payload.get("name").and_then(|v| v.as_str()).is_some() {
            score += 10;
        }

        score.clamp(0, 100)
    }
}

impl Default for Nyra {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Agent for Nyra {
    fn id(&self) -> AgentId {
        AgentId::Nyra
    }

    async fn handle(&self, _message: &AgentMessage, event: &BusinessEvent) -> AgentResult {
        let email = payload_str(event, "email")?;
        let score = Self::score(event);
        let qualified = score >= self.threshold;

        debug!(email, score, qualified, "Nyra scored lead");
        Ok(AgentOutcome::new(
            format!("lead {email} scored {score} ({})", if qualified { "qualified" } else { "nurture" }),
            json!({
                "kind": "lead",
                "email": email,
                "score": score,
                "qualified": qualified,
                "source": event.source,
            }),
        ))
    }
}

// =============================================================================
// Solari — bookings and orders
// =============================================================================

/// Solari handles booking confirmations and order normalization.
pub struct Solari;

impl Solari {
    pub fn new() -> Self {
        Self
    }

    /// Normalize a payment amount to integer cents.
    ///
    /// Accepts either `amount` (fractional units) or `amount_cents`.
    fn amount_cents(event: &BusinessEvent) -> Option<i64> {
        if let Some(cents) = event.payload.get("amount_cents").and_then(|v| v.as_i64()) {
            return Some(cents);
        }
        event
            .payload
            .get("amount")
            .and_then(|v| v.as_f64())
            .map(|amount| (amount * 100.0).round() as i64)
    }
}

impl Default for Solari {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Agent for Solari {
    fn id(&self) -> AgentId {
        AgentId::Solari
    }

    async fn handle(&self, _message: &AgentMessage, event: &BusinessEvent) -> AgentResult {
        match event.kind() {
            "booking" | "appointment" => {
                let client = payload_str(event, "client")?;
                let starts_at = payload_str(event, "starts_at")?;
                debug!(client, starts_at, "Solari confirming booking");
                Ok(AgentOutcome::new(
                    format!("booking confirmed for {client} at {starts_at}"),
                    json!({
                        "kind": "booking",
                        "client": client,
                        "starts_at": starts_at,
                        "confirmed": true,
                    }),
                ))
            }
            "order" => {
                let cents = Self::amount_cents(event)
                    .ok_or(AgentError::MissingField("amount"))?;
                debug!(cents, "Solari recording order");
                Ok(AgentOutcome::new(
                    format!("order recorded at {cents} cents"),
                    json!({
                        "kind": "order",
                        "amount_cents": cents,
                        "currency": event.payload.get("currency").and_then(|v| v.as_str()).unwrap_or("usd"),
                    }),
                ))
            }
            other => Err(AgentError::Rejected(format!(
                "solari does not handle '{other}' events"
            ))),
        }
    }
}

// =============================================================================
// Ruvo — task management
// =============================================================================

/// Ruvo turns task events into follow-up work items.
pub struct Ruvo;

impl Ruvo {
    pub fn new() -> Self {
        Self
    }
}

impl Default for Ruvo {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Agent for Ruvo {
    fn id(&self) -> AgentId {
        AgentId::Ruvo
    }

    async fn handle(&self, message: &AgentMessage, event: &BusinessEvent) -> AgentResult {
        let title = payload_str(event, "title")?;
        let due = event
            .payload
            .get("due_hours")
            .and_then(|v| v.as_i64())
            .unwrap_or(48);
        let due_at = Utc::now() + Duration::hours(due);

        Ok(AgentOutcome::new(
            format!("follow-up '{title}' due in {due}h"),
            json!({
                "kind": "follow_up",
                "title": title,
                "workflow_id": message.workflow_id,
                "due_at": due_at.to_rfc3339(),
            }),
        ))
    }
}

// =============================================================================
// Liora — marketing campaigns
// =============================================================================

/// Days between touches per cadence name.
fn cadence_days(cadence: &str) -> i64 {
    match cadence {
        "daily" => 1,
        "weekly" => 7,
        "monthly" => 30,
        _ => 7,
    }
}

/// Liora schedules the next campaign touch from the declared cadence.
pub struct Liora;

impl Liora {
    pub fn new() -> Self {
        Self
    }
}

impl Default for Liora {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Agent for Liora {
    fn id(&self) -> AgentId {
        AgentId::Liora
    }

    async fn handle(&self, _message: &AgentMessage, event: &BusinessEvent) -> AgentResult {
        let campaign = payload_str(event, "campaign")?;
        let cadence = event
            .payload
            .get("cadence")
            .and_then(|v| v.as_str())
            .unwrap_or("weekly");
        let next_touch_at = Utc::now() + Duration::days(cadence_days(cadence));

        Ok(AgentOutcome::new(
            format!("campaign '{campaign}' next touch scheduled ({cadence})"),
            json!({
                "kind": "campaign_touch",
                "campaign": campaign,
                "cadence": cadence,
                "next_touch_at": next_touch_at.to_rfc3339(),
            }),
        ))
    }
}

// =============================================================================
// Sage — community
// =============================================================================

/// Sage welcomes members and records community activity.
pub struct Sage;

impl Sage {
    pub fn new() -> Self {
        Self
    }
}

impl Default for Sage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Agent for Sage {
    fn id(&self) -> AgentId {
        AgentId::Sage
    }

    async fn handle(&self, _message: &AgentMessage, event: &BusinessEvent) -> AgentResult {
        let member = payload_str(event, "member")?;
        let is_join = event.event_type.ends_with("join") || event.event_type.ends_with("joined");

        Ok(AgentOutcome::new(
            if is_join {
                format!("welcome queued for {member}")
            } else {
                format!("community activity recorded for {member}")
            },
            json!({
                "kind": "community",
                "member": member,
                "welcome": is_join,
                "activity": event.event_type,
            }),
        ))
    }
}

// =============================================================================
// Elan — content lifecycle
// =============================================================================

/// Elan advances content through draft → review → published.
pub struct Elan;

impl Elan {
    pub fn new() -> Self {
        Self
    }

    fn next_stage(current: &str) -> Result<&'static str, AgentError> {
        match current {
            "draft" => Ok("review"),
            "review" => Ok("published"),
            "published" => Err(AgentError::Rejected(
                "content already published".to_string(),
            )),
            other => Err(AgentError::Rejected(format!(
                "unknown content stage '{other}'"
            ))),
        }
    }
}

impl Default for Elan {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Agent for Elan {
    fn id(&self) -> AgentId {
        AgentId::Elan
    }

    async fn handle(&self, _message: &AgentMessage, event: &BusinessEvent) -> AgentResult {
        let title = payload_str(event, "title")?;
        let stage = event
            .payload
            .get("stage")
            .and_then(|v| v.as_str())
            .unwrap_or("draft");
        let next = Self::next_stage(stage)?;

        Ok(AgentOutcome::new(
            format!("content '{title}' advanced {stage} -> {next}"),
            json!({
                "kind": "content",
                "title": title,
                "stage": next,
                "previous_stage": stage,
            }),
        ))
    }
}

// =============================================================================
// Zevi — audience analytics
// =============================================================================

/// Zevi aggregates per-event-type counters and returns a snapshot.
pub struct Zevi {
    counters: Mutex<HashMap<String, u64>>,
}

impl Zevi {
    pub fn new() -> Self {
        Self {
            counters: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for Zevi {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Agent for Zevi {
    fn id(&self) -> AgentId {
        AgentId::Zevi
    }

    async fn handle(&self, _message: &AgentMessage, event: &BusinessEvent) -> AgentResult {
        let snapshot = {
            let mut counters = self
                .counters
                .lock()
                .map_err(|_| AgentError::External("counter lock poisoned".to_string()))?;
            *counters.entry(event.event_type.clone()).or_insert(0) += 1;
            counters.clone()
        };
        let total: u64 = snapshot.values().sum();

        Ok(AgentOutcome::new(
            format!("analytics updated, {total} events tracked"),
            json!({
                "kind": "analytics_snapshot",
                "total_events": total,
                "by_type": snapshot,
            }),
        ))
    }
}

// =============================================================================
// Atlas — knowledge retrieval
// =============================================================================

/// Atlas answers knowledge queries from a seeded keyword index.
pub struct Atlas {
    index: HashMap<&'static str, &'static str>,
}

impl Atlas {
    pub fn new() -> Self {
        let mut index = HashMap::new();
        index.insert("hours", "Open Tuesday through Sunday, 10:00-18:00.");
        index.insert("booking", "Bookings can be rescheduled up to 24h in advance.");
        index.insert("refund", "Refunds are honored within 14 days of purchase.");
        index.insert("membership", "Memberships renew monthly and can be paused.");
        Self { index }
    }
}

impl Default for Atlas {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Agent for Atlas {
    fn id(&self) -> AgentId {
        AgentId::Atlas
    }

    async fn handle(&self, _message: &AgentMessage, event: &BusinessEvent) -> AgentResult {
        let query = payload_str(event, "query")?;
        let query_lower = query.to_lowercase();

        let hit = self
            .index
            .iter()
            .find(|(keyword, _)| query_lower.contains(**keyword));

        match hit {
            Some((keyword, answer)) => Ok(AgentOutcome::new(
                format!("knowledge hit on '{keyword}'"),
                json!({
                    "kind": "knowledge_answer",
                    "query": query,
                    "matched": keyword,
                    "answer": answer,
                }),
            )),
            None => Ok(AgentOutcome::new(
                "no knowledge match, flagged for curation",
                json!({
                    "kind": "knowledge_answer",
                    "query": query,
                    "matched": serde_json::Value::Null,
                    "answer": serde_json::Value::Null,
                    "needs_curation": true,
                }),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(event_type: &str, payload: serde_json::Value) -> BusinessEvent {
        BusinessEvent {
            event_id: uuid::Uuid::new_v4().to_string(),
            event_type: event_type.to_string(),
            source: "typeform".to_string(),
            sender_id: "sender-1".to_string(),
            business_entity_id: "entity-1".to_string(),
            payload,
            timestamp: Utc::now(),
        }
    }

    fn delegation(recipient: AgentId, event: &BusinessEvent) -> AgentMessage {
        AgentMessage::delegation(
            AgentId::Grace,
            recipient,
            "wf-1",
            &event.event_id,
            event.payload.clone(),
        )
    }

    #[tokio::test]
    async fn test_nyra_scores_and_qualifies() {
        let nyra = Nyra::new();
        let ev = event(
            "lead.capture",
            json!({
                "email": "ada@example.com",
                "name": "Ada",
                "phone": "+1-555-0100",
                "interest": "weekend retreat",
            }),
        );
        let outcome = nyra.handle(&delegation(AgentId::Nyra, &ev), &ev).await.unwrap();
        assert_eq!(outcome.record["kind"], "lead");
        assert_eq!(outcome.record["qualified"], true);
        let score = outcome.record["score"].as_i64().unwrap();
        assert!((0..=100).contains(&score));
    }

    #[tokio::test]
    async fn test_nyra_requires_email() {
        let nyra = Nyra::new();
        let ev = event("lead.capture", json!({ "name": "Ada" }));
        let err = nyra
            .handle(&delegation(AgentId::Nyra, &ev), &ev)
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::MissingField("email")));
    }

    #[tokio::test]
    async fn test_nyra_thin_lead_is_nurture() {
        let nyra = Nyra::new();
        let ev = event("lead.capture", json!({ "email": "x@example.com" }));
        let outcome = nyra.handle(&delegation(AgentId::Nyra, &ev), &ev).await.unwrap();
        assert_eq!(outcome.record["qualified"], false);
    }

    #[tokio::test]
    async fn test_solari_confirms_booking() {
        let solari = Solari::new();
        let ev = event(
            "booking.created",
            json!({ "client": "Jamie", "starts_at": "2026-09-01T10:00:00Z" }),
        );
        let outcome = solari
            .handle(&delegation(AgentId::Solari, &ev), &ev)
            .await
            .unwrap();
        assert_eq!(outcome.record["confirmed"], true);
    }

    #[tokio::test]
    async fn test_solari_normalizes_order_amount() {
        let solari = Solari::new();
        let ev = event("order.paid", json!({ "amount": 49.99 }));
        let outcome = solari
            .handle(&delegation(AgentId::Solari, &ev), &ev)
            .await
            .unwrap();
        assert_eq!(outcome.record["amount_cents"], 4999);

        let ev2 = event("order.paid", json!({ "amount_cents": 1200 }));
        let outcome2 = solari
            .handle(&delegation(AgentId::Solari, &ev2), &ev2)
            .await
            .unwrap();
        assert_eq!(outcome2.record["amount_cents"], 1200);
    }

    #[tokio::test]
    async fn test_solari_rejects_foreign_kind() {
        let solari = Solari::new();
        let ev = event("lead.capture", json!({ "email": "x@example.com" }));
        let err = solari
            .handle(&delegation(AgentId::Solari, &ev), &ev)
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Rejected(_)));
    }

    #[tokio::test]
    async fn test_ruvo_creates_follow_up() {
        let ruvo = Ruvo::new();
        let ev = event("task.create", json!({ "title": "Call back", "due_hours": 4 }));
        let outcome = ruvo.handle(&delegation(AgentId::Ruvo, &ev), &ev).await.unwrap();
        assert_eq!(outcome.record["kind"], "follow_up");
        assert_eq!(outcome.record["title"], "Call back");
    }

    #[tokio::test]
    async fn test_liora_schedules_next_touch() {
        let liora = Liora::new();
        let ev = event(
            "campaign.launch",
            json!({ "campaign": "autumn", "cadence": "daily" }),
        );
        let outcome = liora
            .handle(&delegation(AgentId::Liora, &ev), &ev)
            .await
            .unwrap();
        assert_eq!(outcome.record["cadence"], "daily");
        assert!(outcome.record["next_touch_at"].is_string());
    }

    #[tokio::test]
    async fn test_sage_welcomes_new_member() {
        let sage = Sage::new();
        let ev = event("member.join", json!({ "member": "Robin" }));
        let outcome = sage.handle(&delegation(AgentId::Sage, &ev), &ev).await.unwrap();
        assert_eq!(outcome.record["welcome"], true);
    }

    #[tokio::test]
    async fn test_elan_advances_stage_and_stops_at_published() {
        let elan = Elan::new();
        let draft = event("content.update", json!({ "title": "Guide", "stage": "draft" }));
        let outcome = elan.handle(&delegation(AgentId::Elan, &draft), &draft).await.unwrap();
        assert_eq!(outcome.record["stage"], "review");

        let published = event(
            "content.update",
            json!({ "title": "Guide", "stage": "published" }),
        );
        let err = elan
            .handle(&delegation(AgentId::Elan, &published), &published)
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Rejected(_)));
    }

    #[tokio::test]
    async fn test_zevi_counts_events() {
        let zevi = Zevi::new();
        let ev = event("analytics.page_view", json!({}));
        zevi.handle(&delegation(AgentId::Zevi, &ev), &ev).await.unwrap();
        let outcome = zevi.handle(&delegation(AgentId::Zevi, &ev), &ev).await.unwrap();
        assert_eq!(outcome.record["total_events"], 2);
        assert_eq!(outcome.record["by_type"]["analytics.page_view"], 2);
    }

    #[tokio::test]
    async fn test_atlas_answers_known_query() {
        let atlas = Atlas::new();
        let ev = event("knowledge.query", json!({ "query": "What are your hours?" }));
        let outcome = atlas
            .handle(&delegation(AgentId::Atlas, &ev), &ev)
            .await
            .unwrap();
        assert_eq!(outcome.record["matched"], "hours");
        assert!(outcome.record["answer"].is_string());
    }

    #[tokio::test]
    async fn test_atlas_flags_unknown_query() {
        let atlas = Atlas::new();
        let ev = event("knowledge.query", json!({ "query": "quantum chakras" }));
        let outcome = atlas
            .handle(&delegation(AgentId::Atlas, &ev), &ev)
            .await
            .unwrap();
        assert_eq!(outcome.record["needs_curation"], true);
    }

    #[tokio::test]
    async fn test_grace_reviews_unroutable() {
        let grace = Grace::new();
        let ev = event("webhook.mystery", json!({}));
        let outcome = grace.handle(&delegation(AgentId::Grace, &ev), &ev).await.unwrap();
        assert_eq!(outcome.record["kind"], "orchestrator_review");
        assert_eq!(outcome.record["needs_classification"], true);
    }
}
