use chrono::NaiveDateTime;
use serde::Serialize;
use thiserror::Error;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::{EventType, INLINE_IMAGE_PREFIX};

const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Create-event form contents, serialized with the keys the API expects.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Validate)]
pub struct EventDraft {
    #[serde(rename = "eventTitle")]
    #[validate(length(min = 1, message = "Event title is required."))]
    pub title: String,
    #[serde(rename = "eventVenue")]
    #[validate(length(min = 1, message = "Event venue is required."))]
    pub venue: String,
    #[serde(rename = "startDate")]
    #[validate(length(min = 1, message = "Start date is required."))]
    pub start_date: String,
    #[serde(rename = "startTime")]
    #[validate(length(min = 1, message = "Start time is required."))]
    pub start_time: String,
    #[serde(rename = "endDate")]
    #[validate(length(min = 1, message = "End date is required."))]
    pub end_date: String,
    #[serde(rename = "endTime")]
    #[validate(length(min = 1, message = "End time is required."))]
    pub end_time: String,
    /// Only checked for PAID drafts; FREE ones are sent with cost 0.
    #[serde(rename = "eventCost")]
    pub cost: Option<f64>,
    #[serde(rename = "eventDescription")]
    #[validate(length(min = 1, message = "Event description is required."))]
    pub description: String,
    #[serde(rename = "eventImage")]
    #[validate(custom(function = "validate_inline_image"))]
    pub image: String,
    #[serde(rename = "type")]
    pub event_type: Option<EventType>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DraftError {
    #[error("invalid event: {}", describe(.0))]
    Fields(Vec<FieldError>),

    #[error("invalid date or time format")]
    DateFormat,

    #[error("end date and time must be after start date and time")]
    EndNotAfterStart,
}

pub type DraftResult<T> = Result<T, DraftError>;

fn describe(fields: &[FieldError]) -> String {
    fields
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

fn validate_inline_image(image: &str) -> Result<(), ValidationError> {
    if image.is_empty() {
        return Err(ValidationError::new("required").with_message("Event image is required.".into()));
    }
    if !image.starts_with(INLINE_IMAGE_PREFIX) {
        return Err(ValidationError::new("format")
            .with_message("Invalid image format. Must be base64 encoded.".into()));
    }
    Ok(())
}

impl From<ValidationErrors> for DraftError {
    fn from(errors: ValidationErrors) -> Self {
        let mut fields: Vec<FieldError> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| FieldError {
                    field: field.to_string(),
                    message: e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string()),
                })
            })
            .collect();
        fields.sort_by(|a, b| a.field.cmp(&b.field));
        DraftError::Fields(fields)
    }
}

/// A draft that passed every check, ready to be sent.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ValidEventDraft {
    draft: EventDraft,
    #[serde(skip)]
    starts_at: NaiveDateTime,
    #[serde(skip)]
    ends_at: NaiveDateTime,
}

impl ValidEventDraft {
    pub fn draft(&self) -> &EventDraft {
        &self.draft
    }

    pub fn starts_at(&self) -> NaiveDateTime {
        self.starts_at
    }

    pub fn ends_at(&self) -> NaiveDateTime {
        self.ends_at
    }
}

impl EventDraft {
    /// Trims text fields, checks them, and resolves the FREE/PAID cost rules.
    pub fn validate_draft(self) -> DraftResult<ValidEventDraft> {
        let mut draft = EventDraft {
            title: self.title.trim().to_string(),
            venue: self.venue.trim().to_string(),
            start_date: self.start_date.trim().to_string(),
            start_time: self.start_time.trim().to_string(),
            end_date: self.end_date.trim().to_string(),
            end_time: self.end_time.trim().to_string(),
            description: self.description.trim().to_string(),
            ..self
        };
        draft.validate()?;

        let event_type = draft.event_type.unwrap_or(EventType::Free);
        draft.event_type = Some(event_type);
        match (event_type, draft.cost) {
            (EventType::Free, _) => draft.cost = Some(0.0),
            (EventType::Paid, None) => {
                return Err(cost_error("Event cost is required for paid events."));
            }
            (EventType::Paid, Some(cost)) if !cost.is_finite() || cost < 0.0 => {
                return Err(cost_error("Event cost must be a non-negative number."));
            }
            (EventType::Paid, Some(_)) => {}
        }

        let starts_at = parse_date_time(&draft.start_date, &draft.start_time)?;
        let ends_at = parse_date_time(&draft.end_date, &draft.end_time)?;
        if ends_at <= starts_at {
            return Err(DraftError::EndNotAfterStart);
        }

        Ok(ValidEventDraft {
            draft,
            starts_at,
            ends_at,
        })
    }
}

fn cost_error(message: &str) -> DraftError {
    DraftError::Fields(vec![FieldError {
        field: "cost".to_string(),
        message: message.to_string(),
    }])
}

fn parse_date_time(date: &str, time: &str) -> DraftResult<NaiveDateTime> {
    NaiveDateTime::parse_from_str(&format!("{} {}", date, time), DATE_TIME_FORMAT)
        .map_err(|_| DraftError::DateFormat)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> EventDraft {
        EventDraft {
            title: "  Rust Meetup ".to_string(),
            venue: "Hall A".to_string(),
            start_date: "2025-03-19".to_string(),
            start_time: "18:00".to_string(),
            end_date: "2025-03-19".to_string(),
            end_time: "20:00".to_string(),
            cost: Some(250.0),
            description: "Talks and pizza".to_string(),
            image: "data:image/png;base64,AAAA".to_string(),
            event_type: Some(EventType::Paid),
        }
    }

    #[test]
    fn test_valid_paid_draft() {
        let valid = draft().validate_draft().expect("draft should validate");
        assert_eq!(valid.draft().title, "Rust Meetup");
        assert_eq!(valid.draft().cost, Some(250.0));
        assert!(valid.ends_at() > valid.starts_at());

        let body = serde_json::to_value(&valid).unwrap();
        assert_eq!(body["eventTitle"], "Rust Meetup");
        assert_eq!(body["eventCost"], 250.0);
        assert_eq!(body["type"], "PAID");
        assert!(body.get("starts_at").is_none());
    }

    #[test]
    fn test_free_draft_zeroes_cost() {
        let valid = EventDraft {
            event_type: None,
            cost: None,
            ..draft()
        }
        .validate_draft()
        .expect("free draft should validate");
        assert_eq!(valid.draft().event_type, Some(EventType::Free));
        assert_eq!(valid.draft().cost, Some(0.0));
    }

    #[test]
    fn test_missing_fields_are_reported() {
        let err = EventDraft {
            title: "   ".to_string(),
            image: String::new(),
            ..draft()
        }
        .validate_draft()
        .unwrap_err();
        let DraftError::Fields(fields) = err else {
            panic!("Expected field errors");
        };
        let names: Vec<&str> = fields.iter().map(|f| f.field.as_str()).collect();
        assert_eq!(names, vec!["image", "title"]);
        assert_eq!(fields[1].message, "Event title is required.");
    }

    #[test]
    fn test_image_must_be_inline() {
        let err = EventDraft {
            image: "https://cdn/e.png".to_string(),
            ..draft()
        }
        .validate_draft()
        .unwrap_err();
        assert!(err.to_string().contains("Must be base64 encoded"));
    }

    #[test]
    fn test_paid_requires_non_negative_cost() {
        let err = EventDraft {
            cost: None,
            ..draft()
        }
        .validate_draft()
        .unwrap_err();
        assert!(matches!(err, DraftError::Fields(ref f) if f[0].field == "cost"));

        let err = EventDraft {
            cost: Some(-1.0),
            ..draft()
        }
        .validate_draft()
        .unwrap_err();
        let DraftError::Fields(fields) = err else {
            panic!("Expected field errors");
        };
        assert_eq!(fields[0].field, "cost");
        assert_eq!(fields[0].message, "Event cost must be a non-negative number.");
    }

    #[test]
    fn test_free_draft_ignores_negative_cost() {
        let valid = EventDraft {
            cost: Some(-5.0),
            event_type: Some(EventType::Free),
            ..draft()
        }
        .validate_draft()
        .expect("free draft should validate");
        assert_eq!(valid.draft().cost, Some(0.0));

        let valid = EventDraft {
            cost: Some(f64::NAN),
            event_type: None,
            ..draft()
        }
        .validate_draft()
        .expect("untyped draft defaults to free");
        assert_eq!(valid.draft().cost, Some(0.0));
    }

    #[test]
    fn test_end_must_follow_start() {
        let err = EventDraft {
            end_time: "17:00".to_string(),
            ..draft()
        }
        .validate_draft()
        .unwrap_err();
        assert_eq!(err, DraftError::EndNotAfterStart);

        let err = EventDraft {
            start_date: "19/03/2025".to_string(),
            ..draft()
        }
        .validate_draft()
        .unwrap_err();
        assert_eq!(err, DraftError::DateFormat);
    }
}
