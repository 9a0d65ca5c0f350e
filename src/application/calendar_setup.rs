use crate::application::error::SyncError;
use crate::domain::models::{Board, Calendar};
use crate::infrastructure::google_calendar_client::CalendarClient;
use chrono_tz::Tz;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnsureBoardCalendarResult {
    Existing(Calendar),
    Created(Calendar),
}

impl EnsureBoardCalendarResult {
    pub fn into_calendar(self) -> Calendar {
        match self {
            Self::Existing(calendar) | Self::Created(calendar) => calendar,
        }
    }
}

/// Finds the calendar that belongs to a board, creating it on first sync.
///
/// A calendar belongs to a board when its description is the board id.
pub struct BoardCalendarInitializer<C>
where
    C: CalendarClient,
{
    calendar_client: Arc<C>,
    time_zone: Tz,
}

impl<C> BoardCalendarInitializer<C>
where
    C: CalendarClient,
{
    pub fn new(calendar_client: Arc<C>, time_zone: Tz) -> Self {
        Self {
            calendar_client,
            time_zone,
        }
    }

    pub async fn ensure_board_calendar(
        &self,
        access_token: &str,
        board: &Board,
    ) -> Result<EnsureBoardCalendarResult, SyncError> {
        let calendars = self.calendar_client.list_calendars(access_token).await?;
        let matching: Vec<Calendar> = calendars
            .into_iter()
            .filter(|calendar| calendar.description.as_deref() == Some(board.id.as_str()))
            .collect();
        debug!(board_id = %board.id, matches = matching.len(), "looked up board calendar");

        match matching.as_slice() {
            [] => {
                let created = self
                    .calendar_client
                    .create_calendar(
                        access_token,
                        &board.id,
                        &board.name,
                        Some(self.time_zone.name()),
                    )
                    .await?;
                info!(board_id = %board.id, calendar_id = %created.id, "created board calendar");
                Ok(EnsureBoardCalendarResult::Created(created))
            }
            [only] => {
                let calendar = self
                    .calendar_client
                    .get_calendar(access_token, &only.id)
                    .await?;
                info!(board_id = %board.id, calendar_id = %calendar.id, "using board calendar");
                Ok(EnsureBoardCalendarResult::Existing(calendar))
            }
            several => Err(SyncError::AmbiguousBoardCalendar {
                board_id: board.id.clone(),
                calendar_ids: several.iter().map(|calendar| calendar.id.clone()).collect(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_support::{FakeCalendarClient, board};
    use chrono_tz::America::New_York;

    fn calendar(id: &str, summary: &str, description: Option<&str>) -> Calendar {
        Calendar {
            id: id.to_string(),
            summary: summary.to_string(),
            description: description.map(str::to_string),
        }
    }

    fn initializer(
        client: &Arc<FakeCalendarClient>,
    ) -> BoardCalendarInitializer<FakeCalendarClient> {
        BoardCalendarInitializer::new(Arc::clone(client), New_York)
    }

    #[tokio::test]
    async fn single_match_is_reread_and_reused() {
        let client = Arc::new(FakeCalendarClient::with_calendars(vec![
            calendar("primary", "me@example.com", None),
            calendar("board@group", "Weekly plan", Some("424242")),
            calendar("other@group", "Other board", Some("1")),
        ]));

        let result = initializer(&client)
            .ensure_board_calendar("token", &board(Vec::new()))
            .await
            .expect("ensure calendar");

        assert_eq!(
            result,
            EnsureBoardCalendarResult::Existing(calendar(
                "board@group",
                "Weekly plan",
                Some("424242")
            ))
        );
        assert_eq!(client.count("get_calendar"), 1);
        assert_eq!(client.count("create_calendar"), 0);
    }

    #[tokio::test]
    async fn no_match_creates_calendar_named_after_board() {
        let client = Arc::new(FakeCalendarClient::with_calendars(vec![calendar(
            "primary",
            "me@example.com",
            Some("Weekly plan"),
        )]));

        let result = initializer(&client)
            .ensure_board_calendar("token", &board(Vec::new()))
            .await
            .expect("ensure calendar");

        let created = match result {
            EnsureBoardCalendarResult::Created(calendar) => calendar,
            other => panic!("expected created calendar, got {other:?}"),
        };
        assert_eq!(created.summary, "Weekly plan");
        assert_eq!(created.description.as_deref(), Some("424242"));
        assert!(
            client
                .calls()
                .contains(&"create_calendar Weekly plan America/New_York".to_string())
        );

        let second = initializer(&client)
            .ensure_board_calendar("token", &board(Vec::new()))
            .await
            .expect("second ensure");
        assert_eq!(second.into_calendar().id, created.id);
        assert_eq!(client.count("create_calendar"), 1);
    }

    #[tokio::test]
    async fn several_matches_are_ambiguous() {
        let client = Arc::new(FakeCalendarClient::with_calendars(vec![
            calendar("a@group", "Weekly plan", Some("424242")),
            calendar("b@group", "Weekly plan (copy)", Some("424242")),
        ]));

        let error = initializer(&client)
            .ensure_board_calendar("token", &board(Vec::new()))
            .await
            .expect_err("ambiguous");

        match error {
            SyncError::AmbiguousBoardCalendar {
                board_id,
                calendar_ids,
            } => {
                assert_eq!(board_id, "424242");
                assert_eq!(calendar_ids, vec!["a@group".to_string(), "b@group".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(client.count("create_calendar"), 0);
    }

    #[tokio::test]
    async fn listing_failure_is_a_collaborator_error() {
        let client = Arc::new(FakeCalendarClient::default());
        client.fail_on("list_calendars");

        let error = initializer(&client)
            .ensure_board_calendar("token", &board(Vec::new()))
            .await
            .expect_err("listing fails");

        assert!(matches!(error, SyncError::Collaborator(_)));
    }
}
