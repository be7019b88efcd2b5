//! Inbound processor event model and the append-only webhook audit record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use gangway_core::{CustomerRef, DomainError, EventId, TenantId};

/// Processing outcome recorded on a [`WebhookEvent`].
///
/// A handler failure leaves the outcome `unprocessed` with an error note
/// alongside; the provider's redelivery schedule (plus an out-of-band
/// reconciliation sweep) re-drives processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventOutcome {
    Unprocessed,
    Processed,
}

/// Append-only audit record of one inbound delivery, keyed by the external
/// event id. Persisted before any processing; never deleted. Doubles as the
/// deduplication substrate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookEvent {
    pub event_id: EventId,
    /// Raw provider event type string, recorded as delivered.
    pub event_type: String,
    pub payload: JsonValue,
    pub outcome: EventOutcome,
    pub error: Option<String>,
    pub customer_ref: Option<CustomerRef>,
    pub tenant_id: Option<TenantId>,
    /// Delivery/processing attempts observed for this event id.
    pub attempts: u32,
    pub received_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl WebhookEvent {
    pub fn received(event_id: EventId, event_type: String, payload: JsonValue, now: DateTime<Utc>) -> Self {
        Self {
            event_id,
            event_type,
            payload,
            outcome: EventOutcome::Unprocessed,
            error: None,
            customer_ref: None,
            tenant_id: None,
            attempts: 1,
            received_at: now,
            processed_at: None,
        }
    }

    pub fn mark_processed(&mut self, note: Option<String>, now: DateTime<Utc>) {
        self.outcome = EventOutcome::Processed;
        self.error = note;
        self.processed_at = Some(now);
    }

    /// Record a handler failure; the outcome stays unprocessed.
    pub fn note_error(&mut self, note: impl Into<String>) {
        self.error = Some(note.into());
    }
}

/// The minimal envelope every provider delivery carries.
///
/// Decoded in two stages: the envelope first (so an audit record exists even
/// when the rest of the payload is unusable), the category-specific fields
/// later during routing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessorEvent {
    /// External event id, unique per emission (not per delivery).
    pub id: EventId,
    /// Raw provider event type, e.g. `payment.cleared`.
    #[serde(rename = "type")]
    pub event_type: String,
    /// Processor customer the event concerns, when applicable.
    #[serde(default)]
    pub customer: Option<CustomerRef>,
    /// Category-specific payload, passed through to the handler.
    #[serde(default)]
    pub data: JsonValue,
}

impl ProcessorEvent {
    /// Decode the envelope from a raw delivery body.
    pub fn decode(raw: &[u8]) -> Result<Self, DomainError> {
        serde_json::from_slice(raw)
            .map_err(|e| DomainError::validation(format!("malformed event envelope: {e}")))
    }
}

/// Closed set of event categories this engine applies.
///
/// Dispatch is a compile-time-checkable match; a new category is a new
/// variant plus its mapping here, nothing dynamic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    VerificationSucceeded,
    VerificationFailed,
    FundsCleared,
    FundsFailed,
    SubscriptionChanged,
}

impl EventCategory {
    /// Map a raw provider event type onto the closed category set.
    ///
    /// Unknown types return `None` and are acknowledged-but-ignored upstream;
    /// providers add event types without notice.
    pub fn from_event_type(event_type: &str) -> Option<Self> {
        match event_type {
            "bank.verification_succeeded" => Some(Self::VerificationSucceeded),
            "bank.verification_failed" => Some(Self::VerificationFailed),
            "payment.cleared" => Some(Self::FundsCleared),
            "payment.failed" => Some(Self::FundsFailed),
            "subscription.updated" => Some(Self::SubscriptionChanged),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decode_accepts_a_minimal_envelope() {
        let raw = serde_json::to_vec(&json!({
            "id": "evt_1",
            "type": "payment.cleared",
            "customer": "cus_1",
            "data": { "amount_cents": 4900 }
        }))
        .unwrap();

        let event = ProcessorEvent::decode(&raw).unwrap();
        assert_eq!(event.id.as_str(), "evt_1");
        assert_eq!(event.event_type, "payment.cleared");
        assert_eq!(event.customer.as_ref().unwrap().as_str(), "cus_1");
    }

    #[test]
    fn decode_rejects_non_json() {
        assert!(ProcessorEvent::decode(b"not json").is_err());
    }

    #[test]
    fn decode_tolerates_missing_customer_and_data() {
        let raw = br#"{"id":"evt_2","type":"ping"}"#;
        let event = ProcessorEvent::decode(raw).unwrap();
        assert!(event.customer.is_none());
        assert!(event.data.is_null());
    }

    #[test]
    fn category_mapping_covers_the_closed_set() {
        assert_eq!(
            EventCategory::from_event_type("payment.cleared"),
            Some(EventCategory::FundsCleared)
        );
        assert_eq!(EventCategory::from_event_type("totally.new.event"), None);
    }

    #[test]
    fn handler_failure_keeps_outcome_unprocessed() {
        let mut record = WebhookEvent::received(
            EventId::new("evt_3").unwrap(),
            "payment.failed".to_string(),
            json!({}),
            Utc::now(),
        );
        record.note_error("no account for cus_9");

        assert_eq!(record.outcome, EventOutcome::Unprocessed);
        assert!(record.error.as_deref().unwrap().contains("cus_9"));
    }
}
