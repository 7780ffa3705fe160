use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{
    ActivityPayload, CompanyPayload, ContactPayload, DealPayload, DealStageChangePayload,
    FilePayload, NotePayload, RecordRef, WebhookEvent,
};
use crate::config::WebhookConfig;

/// Outcome of one delivery attempt. Callers may ignore it: failure is
/// recorded here, never raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    Failed(String),
    Disabled,
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered)
    }
}

#[derive(Debug, Serialize)]
struct WebhookEnvelope<'a> {
    id: Uuid,
    timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_id: Option<&'a str>,
    #[serde(flatten)]
    event: &'a WebhookEvent,
}

/// Best-effort fan-out of domain events to the external delivery
/// service. One attempt per event: no retry, no queue, no ordering
/// guarantee across concurrent emissions.
pub struct WebhookEmitter {
    config: WebhookConfig,
    client: reqwest::Client,
}

impl WebhookEmitter {
    /// Construct with an injected HTTP client; the emitter owns no
    /// other dependencies.
    pub fn new(config: WebhookConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled && self.config.delivery_url.is_some()
    }

    /// Attempt delivery of one event. Never returns an error.
    pub async fn emit(&self, event: WebhookEvent, user_id: Option<&str>) -> DeliveryOutcome {
        let url = match (self.config.enabled, &self.config.delivery_url) {
            (true, Some(url)) => url.clone(),
            _ => return DeliveryOutcome::Disabled,
        };

        let envelope = WebhookEnvelope {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            user_id,
            event: &event,
        };

        let result = self
            .client
            .post(&url)
            .timeout(Duration::from_secs(self.config.timeout_seconds))
            .json(&envelope)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                debug!("Delivered {} webhook {}", event.event_type(), envelope.id);
                DeliveryOutcome::Delivered
            }
            Ok(response) => {
                let reason = format!(
                    "delivery service returned HTTP {} for {}",
                    response.status(),
                    event.event_type()
                );
                warn!("Webhook delivery failed: {}", reason);
                DeliveryOutcome::Failed(reason)
            }
            Err(e) => {
                let reason = format!("{} delivery error: {e}", event.event_type());
                warn!("Webhook delivery failed: {}", reason);
                DeliveryOutcome::Failed(reason)
            }
        }
    }

    pub async fn emit_contact_created(
        &self,
        contact: ContactPayload,
        user_id: Option<&str>,
    ) -> DeliveryOutcome {
        self.emit(WebhookEvent::contact_created(contact), user_id)
            .await
    }

    pub async fn emit_contact_updated(
        &self,
        contact: ContactPayload,
        user_id: Option<&str>,
    ) -> DeliveryOutcome {
        self.emit(WebhookEvent::ContactUpdated(contact), user_id)
            .await
    }

    pub async fn emit_contact_deleted(
        &self,
        contact_id: &str,
        user_id: Option<&str>,
    ) -> DeliveryOutcome {
        self.emit(
            WebhookEvent::ContactDeleted(RecordRef {
                id: contact_id.to_string(),
            }),
            user_id,
        )
        .await
    }

    pub async fn emit_deal_created(
        &self,
        deal: DealPayload,
        user_id: Option<&str>,
    ) -> DeliveryOutcome {
        self.emit(WebhookEvent::deal_created(deal), user_id).await
    }

    pub async fn emit_deal_updated(
        &self,
        deal: DealPayload,
        user_id: Option<&str>,
    ) -> DeliveryOutcome {
        self.emit(WebhookEvent::DealUpdated(deal), user_id).await
    }

    pub async fn emit_deal_stage_changed(
        &self,
        change: DealStageChangePayload,
        user_id: Option<&str>,
    ) -> DeliveryOutcome {
        self.emit(WebhookEvent::DealStageChanged(change), user_id)
            .await
    }

    pub async fn emit_company_created(
        &self,
        company: CompanyPayload,
        user_id: Option<&str>,
    ) -> DeliveryOutcome {
        self.emit(WebhookEvent::company_created(company), user_id)
            .await
    }

    pub async fn emit_company_updated(
        &self,
        company: CompanyPayload,
        user_id: Option<&str>,
    ) -> DeliveryOutcome {
        self.emit(WebhookEvent::CompanyUpdated(company), user_id)
            .await
    }

    pub async fn emit_note_created(
        &self,
        note: NotePayload,
        user_id: Option<&str>,
    ) -> DeliveryOutcome {
        self.emit(WebhookEvent::note_created(note), user_id).await
    }

    pub async fn emit_file_uploaded(
        &self,
        file: FilePayload,
        user_id: Option<&str>,
    ) -> DeliveryOutcome {
        self.emit(WebhookEvent::file_uploaded(file), user_id).await
    }

    pub async fn emit_activity_logged(
        &self,
        activity: ActivityPayload,
        user_id: Option<&str>,
    ) -> DeliveryOutcome {
        self.emit(WebhookEvent::activity_logged(activity), user_id)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contact() -> ContactPayload {
        ContactPayload {
            id: "c-1".to_string(),
            first_name: "Grace".to_string(),
            last_name: "Okafor".to_string(),
            email: None,
            created_at: None,
        }
    }

    #[tokio::test]
    async fn test_disabled_emitter_reports_disabled() {
        let emitter = WebhookEmitter::new(WebhookConfig::default(), reqwest::Client::new());
        let outcome = emitter.emit_contact_created(contact(), Some("advisor-1")).await;
        assert_eq!(outcome, DeliveryOutcome::Disabled);
    }

    #[tokio::test]
    async fn test_delivery_failure_never_raises() {
        let config = WebhookConfig {
            enabled: true,
            delivery_url: Some("http://127.0.0.1:1/hooks".to_string()),
            timeout_seconds: 1,
        };
        let emitter = WebhookEmitter::new(config, reqwest::Client::new());

        let outcome = emitter.emit_contact_created(contact(), None).await;
        match outcome {
            DeliveryOutcome::Failed(reason) => {
                assert!(reason.contains("contact.created"));
            }
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_every_event_kind_has_a_wrapper() {
        // All wrappers share the same disabled short-circuit
        let emitter = WebhookEmitter::new(WebhookConfig::default(), reqwest::Client::new());

        let deal = DealPayload {
            id: "d-1".to_string(),
            contact_id: "c-1".to_string(),
            name: "Retirement rollover".to_string(),
            stage: "proposal".to_string(),
            amount_cents: Some(250_000_00),
            created_at: None,
        };
        assert_eq!(
            emitter.emit_deal_created(deal.clone(), None).await,
            DeliveryOutcome::Disabled
        );
        assert_eq!(
            emitter.emit_deal_updated(deal, None).await,
            DeliveryOutcome::Disabled
        );
        assert_eq!(
            emitter.emit_contact_deleted("c-1", None).await,
            DeliveryOutcome::Disabled
        );
        assert_eq!(
            emitter
                .emit_activity_logged(
                    ActivityPayload {
                        id: "a-1".to_string(),
                        activity_type: "call".to_string(),
                        subject: "Quarterly review".to_string(),
                        created_at: None,
                    },
                    None
                )
                .await,
            DeliveryOutcome::Disabled
        );
    }

    #[test]
    fn test_envelope_flattens_event_tag() {
        let event = WebhookEvent::contact_created(contact());
        let envelope = WebhookEnvelope {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            user_id: Some("advisor-1"),
            event: &event,
        };
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["event"], "contact.created");
        assert_eq!(json["user_id"], "advisor-1");
        assert!(json["data"]["created_at"].is_string());
    }
}
