use serde_json::{Map, Value};

use crate::{EventRecord, EventType, ImageRef, PaymentStatus, Registration};

pub const INLINE_IMAGE_PREFIX: &str = "data:image";

pub const UNTITLED_EVENT: &str = "Untitled Event";

const PLACEHOLDER_IMAGE_BASE: &str = "https://placehold.co/400x250/2C2B6A/FFFFFF?text=";

/// Converts one raw event payload into an [`EventRecord`].
///
/// Never fails: missing or malformed fields fall back to their defaults, and a
/// non-object payload yields the all-defaults record.
pub fn normalize(raw: &Value) -> EventRecord {
    let empty = Map::new();
    let obj = raw.as_object().unwrap_or(&empty);

    let title = text(obj, &["title"]);
    let title = if title.trim().is_empty() {
        UNTITLED_EVENT.to_string()
    } else {
        title
    };

    let type_label = text(obj, &["type", "event_type"]).trim().to_uppercase();
    let event_type = EventType::from_label(&type_label);
    let cost = match event_type {
        EventType::Free => 0.0,
        EventType::Paid => cost(obj),
    };

    let venue = text(obj, &["venue", "location"]);
    let location = text(obj, &["location", "venue"]);

    let image = image(obj, &title);

    let date = obj
        .get("date")
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string);

    let registration = obj
        .get("payment_status")
        .and_then(Value::as_str)
        .map(|status| Registration {
            registered_at: text(obj, &["registration_date"]),
            payment_status: PaymentStatus::from_label(status),
        });

    EventRecord {
        id: id(obj),
        title,
        event_type,
        type_label,
        cost,
        image,
        venue,
        location,
        category: text(obj, &["category"]),
        description: text(obj, &["description"]),
        start_date: text(obj, &["start_date", "startDate"]),
        start_time: text(obj, &["start_time", "startTime"]),
        end_date: text(obj, &["end_date", "endDate"]),
        end_time: text(obj, &["end_time", "endTime"]),
        date,
        registration,
    }
}

pub fn placeholder_image(title: &str) -> String {
    format!("{}{}", PLACEHOLDER_IMAGE_BASE, form_encode(title))
}

fn id(obj: &Map<String, Value>) -> String {
    for key in ["id", "_id"] {
        match obj.get(key) {
            Some(Value::String(s)) if !s.trim().is_empty() => return s.clone(),
            Some(Value::Number(n)) => return n.to_string(),
            _ => {}
        }
    }
    String::new()
}

/// First non-empty string value among `keys`, or `""`.
fn text(obj: &Map<String, Value>, keys: &[&str]) -> String {
    keys.iter()
        .filter_map(|key| obj.get(*key))
        .filter_map(|value| match value {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .find(|s| !s.is_empty())
        .unwrap_or_default()
}

fn cost(obj: &Map<String, Value>) -> f64 {
    let parsed = match obj.get("cost").or_else(|| obj.get("event_cost")) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(cost) if cost.is_finite() && cost > 0.0 => cost,
        _ => 0.0,
    }
}

fn image(obj: &Map<String, Value>, title: &str) -> ImageRef {
    let raw_image = obj.get("image").and_then(Value::as_str).unwrap_or("");
    if raw_image.starts_with(INLINE_IMAGE_PREFIX) {
        return ImageRef::Inline(raw_image.to_string());
    }
    let url = text(obj, &["image_url", "imageUrl"]);
    if !url.trim().is_empty() {
        return ImageRef::Url(url);
    }
    if !raw_image.trim().is_empty() {
        return ImageRef::Url(raw_image.to_string());
    }
    ImageRef::Url(placeholder_image(title))
}

fn form_encode(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            b' ' => out.push('+'),
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_free_event_forces_zero_cost() {
        let record = normalize(&json!({ "id": "e1", "type": "free", "cost": 500 }));
        assert_eq!(record.event_type, EventType::Free);
        assert_eq!(record.type_label, "FREE");
        assert_eq!(record.cost, 0.0);
    }

    #[test]
    fn test_empty_object_defaults() {
        let record = normalize(&json!({}));
        assert_eq!(record.title, UNTITLED_EVENT);
        assert_eq!(record.location, "");
        assert_eq!(record.venue, "");
        assert_eq!(record.category, "");
        assert_eq!(record.cost, 0.0);
        assert_eq!(record.id, "");
        assert_eq!(record.date, None);
        assert_eq!(record.registration, None);
        assert_eq!(
            record.image,
            ImageRef::Url(
                "https://placehold.co/400x250/2C2B6A/FFFFFF?text=Untitled+Event".to_string()
            )
        );
    }

    #[test]
    fn test_non_object_payload_degrades() {
        let record = normalize(&json!("not an event"));
        assert_eq!(record.title, UNTITLED_EVENT);
        let record = normalize(&Value::Null);
        assert_eq!(record.cost, 0.0);
    }

    #[test]
    fn test_paid_cost_parsing() {
        let record = normalize(&json!({ "type": "paid", "cost": "359" }));
        assert_eq!(record.event_type, EventType::Paid);
        assert_eq!(record.cost, 359.0);

        let record = normalize(&json!({ "type": "PAID", "cost": -20 }));
        assert_eq!(record.cost, 0.0);

        let record = normalize(&json!({ "type": "PAID", "cost": "lots" }));
        assert_eq!(record.cost, 0.0);
    }

    #[test]
    fn test_unknown_type_is_paid_but_label_kept() {
        let record = normalize(&json!({ "type": "donation", "cost": 12.5 }));
        assert_eq!(record.event_type, EventType::Paid);
        assert_eq!(record.type_label, "DONATION");
        assert_eq!(record.cost, 12.5);
        assert_eq!(record.price_label(), "12.5 INR");
    }

    #[test]
    fn test_image_resolution() {
        let inline = "data:image/png;base64,iVBORw0KGgo=";
        let record = normalize(&json!({ "image": inline, "image_url": "https://x/y.png" }));
        assert_eq!(record.image, ImageRef::Inline(inline.to_string()));

        let record = normalize(&json!({ "image": "", "image_url": "https://x/y.png" }));
        assert_eq!(record.image, ImageRef::Url("https://x/y.png".to_string()));

        let record = normalize(&json!({ "image": "https://cdn/e.jpg" }));
        assert_eq!(record.image, ImageRef::Url("https://cdn/e.jpg".to_string()));

        let record = normalize(&json!({ "title": "Rust & Tea" }));
        assert_eq!(
            record.image.as_str(),
            "https://placehold.co/400x250/2C2B6A/FFFFFF?text=Rust+%26+Tea"
        );
    }

    #[test]
    fn test_list_and_registered_shapes() {
        let listed = normalize(&json!({
            "id": "64f0",
            "type": "FREE",
            "title": "Bootcamp",
            "date": "Saturday, March 19, 09:30PM",
            "location": "ONLINE EVENT - Attend anywhere",
            "cost": 0,
            "description": "Write and publish"
        }));
        assert_eq!(listed.venue, "ONLINE EVENT - Attend anywhere");
        assert_eq!(listed.date.as_deref(), Some("Saturday, March 19, 09:30PM"));

        let registered = normalize(&json!({
            "id": "64f1",
            "title": "Meetup",
            "venue": "Hall A",
            "start_date": "2025-03-19",
            "start_time": "21:30",
            "end_date": "2025-03-19",
            "end_time": "23:00",
            "type": "PAID",
            "cost": 359,
            "category": "tech",
            "registration_date": "2025-03-01 10:00:00",
            "payment_status": "pending"
        }));
        assert_eq!(registered.location, "Hall A");
        assert_eq!(registered.start_date, "2025-03-19");
        assert_eq!(
            registered.registration,
            Some(Registration {
                registered_at: "2025-03-01 10:00:00".to_string(),
                payment_status: PaymentStatus::Pending,
            })
        );
    }

    #[test]
    fn test_camel_case_and_numeric_ids() {
        let record = normalize(&json!({ "_id": 42, "startDate": "2025-01-02", "endTime": "10:00" }));
        assert_eq!(record.id, "42");
        assert_eq!(record.start_date, "2025-01-02");
        assert_eq!(record.end_time, "10:00");
    }
}
