use chrono::{DateTime, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

pub const ESTIMATE_HOURS_COLUMN: &str = "EstimateHours";
pub const DUE_DATE_AND_TIME_COLUMN: &str = "DueDateAndTime";

/// Weekday names in Sunday-first order, matching `Weekday::num_days_from_sunday`.
pub const WEEKDAY_NAMES: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Board {
    pub id: String,
    pub name: String,
    pub groups: Vec<Group>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Group {
    pub title: String,
    pub tasks: Vec<Task>,
}

impl Group {
    pub fn weekday(&self) -> GroupWeekday {
        GroupWeekday::from_title(&self.title)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Task {
    pub name: String,
    pub column_values: Vec<ColumnValue>,
}

impl Task {
    /// Texts of the columns with the given title that carry a value, in board order.
    pub fn column_texts<'a>(&'a self, title: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.column_values
            .iter()
            .filter(move |column| column.title == title)
            .filter_map(|column| column.text.as_deref())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColumnValue {
    pub title: String,
    pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupWeekday {
    Recognized(Weekday),
    Unrecognized(String),
}

impl GroupWeekday {
    /// Exact, case-sensitive lookup of a group title among the weekday names.
    pub fn from_title(title: &str) -> Self {
        WEEKDAY_NAMES
            .iter()
            .position(|name| *name == title)
            .map(|index| Self::Recognized(weekday_from_sunday_index(index)))
            .unwrap_or_else(|| Self::Unrecognized(title.to_string()))
    }
}

pub fn weekday_from_sunday_index(index: usize) -> Weekday {
    match index % 7 {
        0 => Weekday::Sun,
        1 => Weekday::Mon,
        2 => Weekday::Tue,
        3 => Weekday::Wed,
        4 => Weekday::Thu,
        5 => Weekday::Fri,
        _ => Weekday::Sat,
    }
}

pub fn weekday_name(weekday: Weekday) -> &'static str {
    WEEKDAY_NAMES[weekday.num_days_from_sunday() as usize]
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Tentative,
    Confirmed,
}

impl EventStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tentative => "tentative",
            Self::Confirmed => "confirmed",
        }
    }
}

/// The calendar event a task should map to, rebuilt from scratch on every run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalEvent {
    pub summary: String,
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
    pub status: EventStatus,
    pub time_zone: Tz,
}

impl CanonicalEvent {
    pub fn duration(&self) -> chrono::Duration {
        self.end - self.start
    }
}

/// An event as the calendar currently stores it. Timestamps stay raw until compared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExistingEvent {
    pub id: String,
    pub summary: String,
    pub start: String,
    pub end: String,
    pub time_zone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventUpdate {
    pub event_id: String,
    pub event: CanonicalEvent,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Calendar {
    pub id: String,
    pub summary: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OAuthToken {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<chrono::Utc>,
    pub token_type: String,
    pub scope: Option<String>,
}

impl OAuthToken {
    pub fn is_valid_at(&self, now: DateTime<chrono::Utc>, leeway_seconds: i64) -> bool {
        self.expires_at > now + chrono::Duration::seconds(leeway_seconds)
            && !self.access_token.trim().is_empty()
    }
}
