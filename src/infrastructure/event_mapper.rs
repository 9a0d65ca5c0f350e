use crate::domain::models::{CanonicalEvent, ExistingEvent};

pub const EVENT_DESCRIPTION: &str = "Created by boardcal";
const CANCELLED_STATUS: &str = "cancelled";

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq, Default)]
pub struct CalendarEventDateTime {
    #[serde(rename = "dateTime", skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    /// Set instead of `date_time` on all-day events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(rename = "timeZone", skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct GoogleCalendarEvent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default)]
    pub start: CalendarEventDateTime,
    #[serde(default)]
    pub end: CalendarEventDateTime,
}

pub fn encode_canonical_event(event: &CanonicalEvent) -> GoogleCalendarEvent {
    let time_zone = event.time_zone.name().to_string();
    GoogleCalendarEvent {
        id: None,
        summary: Some(event.summary.clone()),
        description: Some(EVENT_DESCRIPTION.to_string()),
        status: Some(event.status.as_str().to_string()),
        start: CalendarEventDateTime {
            date_time: Some(event.start.to_rfc3339()),
            date: None,
            time_zone: Some(time_zone.clone()),
        },
        end: CalendarEventDateTime {
            date_time: Some(event.end.to_rfc3339()),
            date: None,
            time_zone: Some(time_zone),
        },
    }
}

/// Converts a listed event into the reconciler's view of it.
///
/// Events without an id and cancelled events are skipped. Missing timestamps
/// are kept as empty strings and rejected later, only if the event is compared.
pub fn decode_existing_event(event: &GoogleCalendarEvent) -> Option<ExistingEvent> {
    let id = event
        .id
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())?;

    let is_cancelled = event
        .status
        .as_deref()
        .map(|status| status.eq_ignore_ascii_case(CANCELLED_STATUS))
        .unwrap_or(false);
    if is_cancelled {
        return None;
    }

    Some(ExistingEvent {
        id: id.to_string(),
        summary: event.summary.clone().unwrap_or_default(),
        start: event.start.date_time.clone().unwrap_or_default(),
        end: event.end.date_time.clone().unwrap_or_default(),
        time_zone: event
            .start
            .time_zone
            .clone()
            .or_else(|| event.end.time_zone.clone()),
    })
}
