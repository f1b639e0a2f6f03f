//! Client-side event filtering.
//!
//! Criteria hold the raw values a browsing page sends (`"FREE"`, `"mon"`,
//! `"2025-03-19"`, ...). A criterion that is `None` or blank imposes no
//! constraint; all set criteria must match.

use std::str::FromStr;

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::EventRecord;

const ISO_DATE: &str = "%Y-%m-%d";

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCriteria {
    pub event_type: Option<String>,
    pub location: Option<String>,
    pub date: Option<String>,
    pub weekday: Option<String>,
    pub kind: Option<String>,
    pub category: Option<String>,
}

impl FilterCriteria {
    pub fn with_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = Some(event_type.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    pub fn with_weekday(mut self, weekday: impl Into<String>) -> Self {
        self.weekday = Some(weekday.into());
        self
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Overwrites every field `partial` sets. `Some("")` clears a field.
    pub fn merge(&mut self, partial: FilterCriteria) {
        fn take(slot: &mut Option<String>, value: Option<String>) {
            if value.is_some() {
                *slot = value;
            }
        }
        take(&mut self.event_type, partial.event_type);
        take(&mut self.location, partial.location);
        take(&mut self.date, partial.date);
        take(&mut self.weekday, partial.weekday);
        take(&mut self.kind, partial.kind);
        take(&mut self.category, partial.category);
    }

    pub fn is_empty(&self) -> bool {
        [
            &self.event_type,
            &self.location,
            &self.date,
            &self.weekday,
            &self.kind,
            &self.category,
        ]
        .iter()
        .all(|value| active(value).is_none())
    }

    pub fn matches(&self, record: &EventRecord) -> bool {
        Predicates::compile(self).matches(record)
    }

    /// Visible subset of `records`, in their original order.
    pub fn apply(&self, records: &[EventRecord]) -> Vec<EventRecord> {
        let predicates = Predicates::compile(self);
        records
            .iter()
            .filter(|record| predicates.matches(record))
            .cloned()
            .collect()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    Online,
    InPerson,
}

impl FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "online" => Ok(EventKind::Online),
            "in-person" | "in_person" | "inperson" | "offline" => Ok(EventKind::InPerson),
            other => Err(format!("unknown event kind: {}", other)),
        }
    }
}

fn active(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

enum DateCriterion {
    Date { raw: String, date: NaiveDate },
    Unparseable,
}

enum KindCriterion {
    Kind(EventKind),
    Unknown,
}

struct Predicates {
    event_type: Option<String>,
    location: Option<String>,
    date: Option<DateCriterion>,
    weekday: Option<String>,
    kind: Option<KindCriterion>,
    category: Option<String>,
}

impl Predicates {
    fn compile(criteria: &FilterCriteria) -> Self {
        Self {
            event_type: active(&criteria.event_type).map(str::to_string),
            location: active(&criteria.location).map(str::to_lowercase),
            date: active(&criteria.date).map(|raw| match NaiveDate::parse_from_str(raw, ISO_DATE) {
                Ok(date) => DateCriterion::Date {
                    raw: raw.to_string(),
                    date,
                },
                Err(_) => DateCriterion::Unparseable,
            }),
            weekday: active(&criteria.weekday).map(str::to_lowercase),
            kind: active(&criteria.kind).map(|raw| match raw.parse() {
                Ok(kind) => KindCriterion::Kind(kind),
                Err(_) => KindCriterion::Unknown,
            }),
            category: active(&criteria.category).map(str::to_lowercase),
        }
    }

    fn matches(&self, record: &EventRecord) -> bool {
        if let Some(event_type) = &self.event_type {
            if !record.type_label.eq_ignore_ascii_case(event_type) {
                return false;
            }
        }
        if let Some(location) = &self.location {
            if !record.location.to_lowercase().contains(location) {
                return false;
            }
        }
        if let Some(date) = &self.date {
            if !matches_date(record, date) {
                return false;
            }
        }
        if let Some(weekday) = &self.weekday {
            if !matches_weekday(record, weekday) {
                return false;
            }
        }
        if let Some(kind) = &self.kind {
            let online = record.location.to_lowercase().contains("online");
            let ok = match kind {
                KindCriterion::Kind(EventKind::Online) => online,
                KindCriterion::Kind(EventKind::InPerson) => !online,
                KindCriterion::Unknown => false,
            };
            if !ok {
                return false;
            }
        }
        if let Some(category) = &self.category {
            let hit = [&record.category, &record.title, &record.description]
                .iter()
                .any(|field| field.to_lowercase().contains(category));
            if !hit {
                return false;
            }
        }
        true
    }
}

fn matches_date(record: &EventRecord, criterion: &DateCriterion) -> bool {
    let DateCriterion::Date { raw, date } = criterion else {
        return false;
    };
    let start = record.start_date.trim();
    if start == raw.as_str() || NaiveDate::parse_from_str(start, ISO_DATE).ok() == Some(*date) {
        return true;
    }
    record
        .date
        .as_deref()
        .and_then(|display| parse_display_date(display, date.year()))
        .is_some_and(|parsed| parsed == *date)
}

/// Parses display strings such as `"Saturday, March 19, 09:30PM"`. The year
/// is missing from that format, so `year` fills it in.
fn parse_display_date(display: &str, year: i32) -> Option<NaiveDate> {
    let display = display.trim();
    if let Some(prefix) = display.get(..10) {
        if let Ok(date) = NaiveDate::parse_from_str(prefix, ISO_DATE) {
            return Some(date);
        }
    }
    display.split(',').map(str::trim).find_map(|segment| {
        ["%B %d %Y", "%b %d %Y"]
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(&format!("{} {}", segment, year), fmt).ok())
            .or_else(|| NaiveDate::parse_from_str(segment, "%B %d %Y").ok())
    })
}

fn weekday_code(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "mon",
        Weekday::Tue => "tue",
        Weekday::Wed => "wed",
        Weekday::Thu => "thu",
        Weekday::Fri => "fri",
        Weekday::Sat => "sat",
        Weekday::Sun => "sun",
    }
}

// start_date first, then a substring match on the display string
fn matches_weekday(record: &EventRecord, code: &str) -> bool {
    if let Ok(start) = NaiveDate::parse_from_str(record.start_date.trim(), ISO_DATE) {
        let short = weekday_code(start.weekday());
        let prefix: String = code.chars().take(3).collect();
        return short.starts_with(&prefix);
    }
    record
        .date
        .as_deref()
        .is_some_and(|display| display.to_lowercase().contains(code))
}
