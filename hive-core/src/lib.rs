mod draft;
pub mod filter;
mod normalize;

use std::fmt::Display;

use serde::{Deserialize, Serialize};

pub use draft::{DraftError, DraftResult, EventDraft, FieldError, ValidEventDraft};
pub use filter::{EventKind, FilterCriteria};
pub use normalize::{INLINE_IMAGE_PREFIX, UNTITLED_EVENT, normalize, placeholder_image};

pub type EventId = String;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EventRecord {
    pub id: EventId,
    pub title: String,
    pub event_type: EventType,
    /// Uppercased raw type as sent by the server, kept for filtering.
    pub type_label: String,
    pub cost: f64,
    pub image: ImageRef,
    pub venue: String,
    pub location: String,
    pub category: String,
    pub description: String,
    pub start_date: String,
    pub start_time: String,
    pub end_date: String,
    pub end_time: String,
    pub date: Option<String>,
    pub registration: Option<Registration>,
}

impl EventRecord {
    pub fn is_free(&self) -> bool {
        self.event_type == EventType::Free
    }

    pub fn price_label(&self) -> String {
        match self.event_type {
            EventType::Free => "FREE".to_string(),
            EventType::Paid => format!("{} INR", self.cost),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventType {
    Free,
    Paid,
}

impl EventType {
    pub fn from_label(label: &str) -> Self {
        if label.trim().eq_ignore_ascii_case("FREE") {
            EventType::Free
        } else {
            EventType::Paid
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Free => "FREE",
            EventType::Paid => "PAID",
        }
    }
}

impl Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ImageRef {
    /// Self-describing `data:image/...` payload.
    Inline(String),
    Url(String),
}

impl ImageRef {
    pub fn as_str(&self) -> &str {
        match self {
            ImageRef::Inline(data) => data,
            ImageRef::Url(url) => url,
        }
    }

    pub fn is_inline(&self) -> bool {
        matches!(self, ImageRef::Inline(_))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Registration {
    pub registered_at: String,
    pub payment_status: PaymentStatus,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    #[serde(untagged)]
    Other(String),
}

impl PaymentStatus {
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "pending" => PaymentStatus::Pending,
            "completed" => PaymentStatus::Completed,
            _ => PaymentStatus::Other(label.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Other(label) => label,
        }
    }
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
