pub mod emitter;

pub use emitter::{DeliveryOutcome, WebhookEmitter};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Closed set of CRM domain events carried to the delivery service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum WebhookEvent {
    #[serde(rename = "contact.created")]
    ContactCreated(ContactPayload),
    #[serde(rename = "contact.updated")]
    ContactUpdated(ContactPayload),
    #[serde(rename = "contact.deleted")]
    ContactDeleted(RecordRef),
    #[serde(rename = "deal.created")]
    DealCreated(DealPayload),
    #[serde(rename = "deal.updated")]
    DealUpdated(DealPayload),
    #[serde(rename = "deal.stage_changed")]
    DealStageChanged(DealStageChangePayload),
    #[serde(rename = "company.created")]
    CompanyCreated(CompanyPayload),
    #[serde(rename = "company.updated")]
    CompanyUpdated(CompanyPayload),
    #[serde(rename = "note.created")]
    NoteCreated(NotePayload),
    #[serde(rename = "file.uploaded")]
    FileUploaded(FilePayload),
    #[serde(rename = "activity.logged")]
    ActivityLogged(ActivityPayload),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactPayload {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordRef {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DealPayload {
    pub id: String,
    pub contact_id: String,
    pub name: String,
    pub stage: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_cents: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DealStageChangePayload {
    pub id: String,
    pub previous_stage: String,
    pub new_stage: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyPayload {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotePayload {
    pub id: String,
    pub contact_id: String,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilePayload {
    pub id: String,
    pub file_name: String,
    pub size_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityPayload {
    pub id: String,
    pub activity_type: String,
    pub subject: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl WebhookEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            WebhookEvent::ContactCreated(_) => "contact.created",
            WebhookEvent::ContactUpdated(_) => "contact.updated",
            WebhookEvent::ContactDeleted(_) => "contact.deleted",
            WebhookEvent::DealCreated(_) => "deal.created",
            WebhookEvent::DealUpdated(_) => "deal.updated",
            WebhookEvent::DealStageChanged(_) => "deal.stage_changed",
            WebhookEvent::CompanyCreated(_) => "company.created",
            WebhookEvent::CompanyUpdated(_) => "company.updated",
            WebhookEvent::NoteCreated(_) => "note.created",
            WebhookEvent::FileUploaded(_) => "file.uploaded",
            WebhookEvent::ActivityLogged(_) => "activity.logged",
        }
    }

    /// Lifecycle "created" events default a missing creation timestamp
    /// to emission time.
    pub fn contact_created(mut contact: ContactPayload) -> Self {
        contact.created_at.get_or_insert_with(Utc::now);
        WebhookEvent::ContactCreated(contact)
    }

    pub fn deal_created(mut deal: DealPayload) -> Self {
        deal.created_at.get_or_insert_with(Utc::now);
        WebhookEvent::DealCreated(deal)
    }

    pub fn company_created(mut company: CompanyPayload) -> Self {
        company.created_at.get_or_insert_with(Utc::now);
        WebhookEvent::CompanyCreated(company)
    }

    pub fn note_created(mut note: NotePayload) -> Self {
        note.created_at.get_or_insert_with(Utc::now);
        WebhookEvent::NoteCreated(note)
    }

    pub fn file_uploaded(mut file: FilePayload) -> Self {
        file.created_at.get_or_insert_with(Utc::now);
        WebhookEvent::FileUploaded(file)
    }

    pub fn activity_logged(mut activity: ActivityPayload) -> Self {
        activity.created_at.get_or_insert_with(Utc::now);
        WebhookEvent::ActivityLogged(activity)
    }
}
