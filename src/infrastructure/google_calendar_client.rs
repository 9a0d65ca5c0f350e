use crate::domain::models::{Calendar, CanonicalEvent, ExistingEvent};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::event_mapper::{
    GoogleCalendarEvent, decode_existing_event, encode_canonical_event,
};
use async_trait::async_trait;
use chrono::DateTime;
use chrono_tz::Tz;
use reqwest::{Client, RequestBuilder};
use url::Url;

const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3/";
const EVENTS_PAGE_SIZE: &str = "2500";
const CALENDARS_PAGE_SIZE: &str = "250";

#[async_trait]
pub trait CalendarClient: Send + Sync {
    async fn list_calendars(&self, access_token: &str) -> Result<Vec<Calendar>, InfraError>;

    async fn create_calendar(
        &self,
        access_token: &str,
        description: &str,
        summary: &str,
        time_zone: Option<&str>,
    ) -> Result<Calendar, InfraError>;

    async fn get_calendar(&self, access_token: &str, calendar_id: &str)
    -> Result<Calendar, InfraError>;

    async fn list_events(
        &self,
        access_token: &str,
        calendar_id: &str,
        time_min: DateTime<Tz>,
        time_max: DateTime<Tz>,
    ) -> Result<Vec<ExistingEvent>, InfraError>;

    /// Returns the id the calendar assigned to the new event.
    async fn insert_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event: &CanonicalEvent,
    ) -> Result<String, InfraError>;

    async fn update_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event_id: &str,
        event: &CanonicalEvent,
    ) -> Result<(), InfraError>;

    async fn delete_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event_id: &str,
    ) -> Result<(), InfraError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestGoogleCalendarClient {
    client: Client,
    api_base: String,
}

impl Default for ReqwestGoogleCalendarClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ReqwestGoogleCalendarClient {
    pub fn new() -> Self {
        Self::with_api_base(CALENDAR_API_BASE)
    }

    pub fn with_api_base(api_base: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_base: api_base.into(),
        }
    }

    fn ensure_non_empty(value: &str, field: &str) -> Result<(), InfraError> {
        if value.trim().is_empty() {
            return Err(InfraError::CalendarApi(format!("{field} must not be empty")));
        }
        Ok(())
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, InfraError> {
        let mut url = Url::parse(&self.api_base).map_err(|error| {
            InfraError::CalendarApi(format!("invalid calendar api base url: {error}"))
        })?;
        {
            let mut path = url.path_segments_mut().map_err(|_| {
                InfraError::CalendarApi("calendar api base URL cannot be a base".to_string())
            })?;
            path.pop_if_empty();
            path.extend(segments);
        }
        Ok(url)
    }

    /// Sends the request and returns the body of a successful response.
    async fn execute(&self, request: RequestBuilder, action: &str) -> Result<String, InfraError> {
        let response = request.send().await.map_err(|error| {
            InfraError::CalendarApi(format!("network error while {action}: {error}"))
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|error| {
            InfraError::CalendarApi(format!("failed reading response while {action}: {error}"))
        })?;

        if !status.is_success() {
            let message = if body.trim().is_empty() {
                format!("http {} while {action}", status.as_u16())
            } else {
                format!("http {} while {action}; body={body}", status.as_u16())
            };
            return Err(InfraError::CalendarApi(message));
        }
        Ok(body)
    }

    fn parse<T: serde::de::DeserializeOwned>(body: &str, what: &str) -> Result<T, InfraError> {
        serde_json::from_str(body).map_err(|error| {
            InfraError::CalendarApi(format!("invalid {what} payload: {error}; body={body}"))
        })
    }
}

#[derive(Debug, serde::Deserialize)]
struct CalendarListResponse {
    items: Option<Vec<CalendarResource>>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
struct CalendarResource {
    id: Option<String>,
    summary: Option<String>,
    description: Option<String>,
}

impl CalendarResource {
    fn into_calendar(self) -> Option<Calendar> {
        let id = self
            .id
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())?;
        Some(Calendar {
            summary: self.summary.unwrap_or_else(|| id.clone()),
            description: self.description,
            id,
        })
    }
}

#[derive(Debug, serde::Serialize)]
struct CreateCalendarRequest<'a> {
    summary: &'a str,
    description: &'a str,
    #[serde(rename = "timeZone", skip_serializing_if = "Option::is_none")]
    time_zone: Option<&'a str>,
}

#[derive(Debug, serde::Deserialize)]
struct EventsPageResponse {
    items: Option<Vec<GoogleCalendarEvent>>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[async_trait]
impl CalendarClient for ReqwestGoogleCalendarClient {
    async fn list_calendars(&self, access_token: &str) -> Result<Vec<Calendar>, InfraError> {
        Self::ensure_non_empty(access_token, "access token")?;

        let endpoint = self.endpoint(&["users", "me", "calendarList"])?;
        let mut calendars = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .get(endpoint.clone())
                .bearer_auth(access_token)
                .query(&[("maxResults", CALENDARS_PAGE_SIZE)]);
            if let Some(page_token) = page_token.as_deref() {
                request = request.query(&[("pageToken", page_token)]);
            }

            let body = self.execute(request, "listing calendars").await?;
            let page: CalendarListResponse = Self::parse(&body, "calendar list")?;
            calendars.extend(
                page.items
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(CalendarResource::into_calendar),
            );

            match page.next_page_token {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        Ok(calendars)
    }

    async fn create_calendar(
        &self,
        access_token: &str,
        description: &str,
        summary: &str,
        time_zone: Option<&str>,
    ) -> Result<Calendar, InfraError> {
        Self::ensure_non_empty(access_token, "access token")?;
        Self::ensure_non_empty(summary, "calendar summary")?;

        let request = CreateCalendarRequest {
            summary: summary.trim(),
            description,
            time_zone: time_zone.map(str::trim).filter(|value| !value.is_empty()),
        };
        let endpoint = self.endpoint(&["calendars"])?;
        let body = self
            .execute(
                self.client.post(endpoint).bearer_auth(access_token).json(&request),
                "creating calendar",
            )
            .await?;

        let created: CalendarResource = Self::parse(&body, "calendar create")?;
        created.into_calendar().ok_or_else(|| {
            InfraError::CalendarApi("calendar create response did not include id".to_string())
        })
    }

    async fn get_calendar(
        &self,
        access_token: &str,
        calendar_id: &str,
    ) -> Result<Calendar, InfraError> {
        Self::ensure_non_empty(access_token, "access token")?;
        Self::ensure_non_empty(calendar_id, "calendar id")?;

        let endpoint = self.endpoint(&["calendars", calendar_id])?;
        let body = self
            .execute(
                self.client.get(endpoint).bearer_auth(access_token),
                "getting calendar",
            )
            .await?;

        let calendar: CalendarResource = Self::parse(&body, "calendar")?;
        calendar.into_calendar().ok_or_else(|| {
            InfraError::CalendarApi(format!("calendar {calendar_id} response did not include id"))
        })
    }

    async fn list_events(
        &self,
        access_token: &str,
        calendar_id: &str,
        time_min: DateTime<Tz>,
        time_max: DateTime<Tz>,
    ) -> Result<Vec<ExistingEvent>, InfraError> {
        Self::ensure_non_empty(access_token, "access token")?;
        Self::ensure_non_empty(calendar_id, "calendar id")?;

        let endpoint = self.endpoint(&["calendars", calendar_id, "events"])?;
        let time_min = time_min.to_rfc3339();
        let time_max = time_max.to_rfc3339();
        let mut events = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .get(endpoint.clone())
                .bearer_auth(access_token)
                .query(&[
                    ("timeMin", time_min.as_str()),
                    ("timeMax", time_max.as_str()),
                    ("singleEvents", "true"),
                    ("maxResults", EVENTS_PAGE_SIZE),
                ]);
            if let Some(page_token) = page_token.as_deref() {
                request = request.query(&[("pageToken", page_token)]);
            }

            let body = self.execute(request, "listing calendar events").await?;
            let page: EventsPageResponse = Self::parse(&body, "events list")?;
            events.extend(
                page.items
                    .unwrap_or_default()
                    .iter()
                    .filter_map(decode_existing_event),
            );

            match page.next_page_token {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        Ok(events)
    }

    async fn insert_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event: &CanonicalEvent,
    ) -> Result<String, InfraError> {
        Self::ensure_non_empty(access_token, "access token")?;
        Self::ensure_non_empty(calendar_id, "calendar id")?;

        let endpoint = self.endpoint(&["calendars", calendar_id, "events"])?;
        let body = self
            .execute(
                self.client
                    .post(endpoint)
                    .bearer_auth(access_token)
                    .json(&encode_canonical_event(event)),
                "creating event",
            )
            .await?;

        let created: GoogleCalendarEvent = Self::parse(&body, "event create")?;
        created
            .id
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| {
                InfraError::CalendarApi("event create response did not include id".to_string())
            })
    }

    async fn update_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event_id: &str,
        event: &CanonicalEvent,
    ) -> Result<(), InfraError> {
        Self::ensure_non_empty(access_token, "access token")?;
        Self::ensure_non_empty(calendar_id, "calendar id")?;
        Self::ensure_non_empty(event_id, "event id")?;

        let endpoint = self.endpoint(&["calendars", calendar_id, "events", event_id])?;
        self.execute(
            self.client
                .put(endpoint)
                .bearer_auth(access_token)
                .json(&encode_canonical_event(event)),
            "updating event",
        )
        .await?;
        Ok(())
    }

    async fn delete_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event_id: &str,
    ) -> Result<(), InfraError> {
        Self::ensure_non_empty(access_token, "access token")?;
        Self::ensure_non_empty(calendar_id, "calendar id")?;
        Self::ensure_non_empty(event_id, "event id")?;

        let endpoint = self.endpoint(&["calendars", calendar_id, "events", event_id])?;
        self.execute(
            self.client.delete(endpoint).bearer_auth(access_token),
            "deleting event",
        )
        .await?;
        Ok(())
    }
}
