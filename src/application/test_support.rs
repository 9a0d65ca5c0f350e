use crate::domain::models::{
    Board, Calendar, CanonicalEvent, ColumnValue, DUE_DATE_AND_TIME_COLUMN, ESTIMATE_HOURS_COLUMN,
    ExistingEvent, Group, Task,
};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::event_mapper::{
    CalendarEventDateTime, GoogleCalendarEvent, decode_existing_event, encode_canonical_event,
};
use crate::infrastructure::google_calendar_client::CalendarClient;
use crate::infrastructure::monday_client::BoardClient;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Tz;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Wednesday 2024-01-03, 10:00 in New York. The week runs Sun 2023-12-31 to Sat 2024-01-06.
pub(crate) fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 3, 15, 0, 0)
        .single()
        .expect("valid instant")
}

pub(crate) fn task(name: &str, estimate: Option<&str>, due: Option<&str>) -> Task {
    let mut column_values = vec![ColumnValue {
        title: "Status".to_string(),
        text: Some("Working on it".to_string()),
    }];
    if let Some(text) = estimate {
        column_values.push(ColumnValue {
            title: ESTIMATE_HOURS_COLUMN.to_string(),
            text: Some(text.to_string()),
        });
    }
    if let Some(text) = due {
        column_values.push(ColumnValue {
            title: DUE_DATE_AND_TIME_COLUMN.to_string(),
            text: Some(text.to_string()),
        });
    }
    Task {
        name: name.to_string(),
        column_values,
    }
}

pub(crate) fn board(groups: Vec<(&str, Vec<Task>)>) -> Board {
    Board {
        id: "424242".to_string(),
        name: "Weekly plan".to_string(),
        groups: groups
            .into_iter()
            .map(|(title, tasks)| Group {
                title: title.to_string(),
                tasks,
            })
            .collect(),
    }
}

fn parse_instant(value: &Option<String>) -> Option<DateTime<Utc>> {
    value
        .as_deref()
        .and_then(|text| DateTime::parse_from_rfc3339(text).ok())
        .map(|instant| instant.with_timezone(&Utc))
}

/// In-memory calendar that stores events in their wire form, so listed events
/// go through the same decoding as real ones.
#[derive(Debug, Default)]
pub(crate) struct FakeCalendarClient {
    calendars: Mutex<Vec<Calendar>>,
    events: Mutex<Vec<GoogleCalendarEvent>>,
    calls: Mutex<Vec<String>>,
    fail_on: Mutex<Option<String>>,
    next_id: AtomicUsize,
}

impl FakeCalendarClient {
    pub(crate) fn with_calendars(calendars: Vec<Calendar>) -> Self {
        Self {
            calendars: Mutex::new(calendars),
            ..Self::default()
        }
    }

    /// Makes every later call of `operation` fail.
    pub(crate) fn fail_on(&self, operation: &str) {
        *self.fail_on.lock().expect("fail_on mutex poisoned") = Some(operation.to_string());
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls mutex poisoned").clone()
    }

    pub(crate) fn count(&self, operation: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.split(' ').next() == Some(operation))
            .count()
    }

    pub(crate) fn stored_events(&self) -> Vec<ExistingEvent> {
        self.events
            .lock()
            .expect("events mutex poisoned")
            .iter()
            .filter_map(decode_existing_event)
            .collect()
    }

    pub(crate) fn seed_event(
        &self,
        summary: &str,
        start: DateTime<Tz>,
        end: DateTime<Tz>,
    ) -> String {
        let id = format!("seed-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        let time_zone = Some(start.timezone().name().to_string());
        self.events
            .lock()
            .expect("events mutex poisoned")
            .push(GoogleCalendarEvent {
                id: Some(id.clone()),
                summary: Some(summary.to_string()),
                description: None,
                status: Some("confirmed".to_string()),
                start: CalendarEventDateTime {
                    date_time: Some(start.to_rfc3339()),
                    date: None,
                    time_zone: time_zone.clone(),
                },
                end: CalendarEventDateTime {
                    date_time: Some(end.to_rfc3339()),
                    date: None,
                    time_zone,
                },
            });
        id
    }

    fn record(&self, operation: &str, detail: &str) -> Result<(), InfraError> {
        self.calls
            .lock()
            .expect("calls mutex poisoned")
            .push(format!("{operation} {detail}"));
        let failing = self.fail_on.lock().expect("fail_on mutex poisoned").clone();
        if failing.as_deref() == Some(operation) {
            return Err(InfraError::CalendarApi(format!("http 500 while {operation}")));
        }
        Ok(())
    }
}

#[async_trait]
impl CalendarClient for FakeCalendarClient {
    async fn list_calendars(&self, _access_token: &str) -> Result<Vec<Calendar>, InfraError> {
        self.record("list_calendars", "")?;
        Ok(self.calendars.lock().expect("calendars mutex poisoned").clone())
    }

    async fn create_calendar(
        &self,
        _access_token: &str,
        description: &str,
        summary: &str,
        time_zone: Option<&str>,
    ) -> Result<Calendar, InfraError> {
        self.record(
            "create_calendar",
            &format!("{summary} {}", time_zone.unwrap_or("-")),
        )?;
        let calendar = Calendar {
            id: format!("cal-{}", self.next_id.fetch_add(1, Ordering::SeqCst)),
            summary: summary.to_string(),
            description: Some(description.to_string()),
        };
        self.calendars
            .lock()
            .expect("calendars mutex poisoned")
            .push(calendar.clone());
        Ok(calendar)
    }

    async fn get_calendar(
        &self,
        _access_token: &str,
        calendar_id: &str,
    ) -> Result<Calendar, InfraError> {
        self.record("get_calendar", calendar_id)?;
        self.calendars
            .lock()
            .expect("calendars mutex poisoned")
            .iter()
            .find(|calendar| calendar.id == calendar_id)
            .cloned()
            .ok_or_else(|| InfraError::CalendarApi(format!("http 404 for {calendar_id}")))
    }

    async fn list_events(
        &self,
        _access_token: &str,
        calendar_id: &str,
        time_min: DateTime<Tz>,
        time_max: DateTime<Tz>,
    ) -> Result<Vec<ExistingEvent>, InfraError> {
        self.record("list_events", &format!("{calendar_id} {}", time_min.to_rfc3339()))?;
        let time_min = time_min.with_timezone(&Utc);
        let time_max = time_max.with_timezone(&Utc);
        Ok(self
            .events
            .lock()
            .expect("events mutex poisoned")
            .iter()
            .filter(|event| {
                match (parse_instant(&event.start.date_time), parse_instant(&event.end.date_time)) {
                    (Some(start), Some(end)) => start < time_max && end > time_min,
                    _ => false,
                }
            })
            .filter_map(decode_existing_event)
            .collect())
    }

    async fn insert_event(
        &self,
        _access_token: &str,
        _calendar_id: &str,
        event: &CanonicalEvent,
    ) -> Result<String, InfraError> {
        self.record("insert_event", &event.summary)?;
        let id = format!("evt-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        let mut encoded = encode_canonical_event(event);
        encoded.id = Some(id.clone());
        self.events.lock().expect("events mutex poisoned").push(encoded);
        Ok(id)
    }

    async fn update_event(
        &self,
        _access_token: &str,
        _calendar_id: &str,
        event_id: &str,
        event: &CanonicalEvent,
    ) -> Result<(), InfraError> {
        self.record("update_event", event_id)?;
        let mut events = self.events.lock().expect("events mutex poisoned");
        let stored = events
            .iter_mut()
            .find(|stored| stored.id.as_deref() == Some(event_id))
            .ok_or_else(|| InfraError::CalendarApi(format!("http 404 for {event_id}")))?;
        let mut encoded = encode_canonical_event(event);
        encoded.id = Some(event_id.to_string());
        *stored = encoded;
        Ok(())
    }

    async fn delete_event(
        &self,
        _access_token: &str,
        _calendar_id: &str,
        event_id: &str,
    ) -> Result<(), InfraError> {
        self.record("delete_event", event_id)?;
        let mut events = self.events.lock().expect("events mutex poisoned");
        let before = events.len();
        events.retain(|stored| stored.id.as_deref() != Some(event_id));
        if events.len() == before {
            return Err(InfraError::CalendarApi(format!("http 410 for {event_id}")));
        }
        Ok(())
    }
}

#[derive(Debug)]
pub(crate) struct FakeBoardClient {
    board: Board,
    pub(crate) fetch_calls: AtomicUsize,
}

impl FakeBoardClient {
    pub(crate) fn new(board: Board) -> Self {
        Self {
            board,
            fetch_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl BoardClient for FakeBoardClient {
    async fn fetch_board(&self, board_id: u64) -> Result<Board, InfraError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if self.board.id != board_id.to_string() {
            return Err(InfraError::BoardApi(format!("board {board_id} was not found")));
        }
        Ok(self.board.clone())
    }
}
