use crate::application::NowProvider;
use crate::application::calendar_setup::{BoardCalendarInitializer, EnsureBoardCalendarResult};
use crate::application::error::SyncError;
use crate::application::reconcile::{ApplyReport, WeekReconciler, validate_group_titles};
use crate::infrastructure::google_calendar_client::CalendarClient;
use crate::infrastructure::monday_client::BoardClient;
use chrono_tz::Tz;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSummary {
    pub board_id: String,
    pub board_name: String,
    pub calendar_id: String,
    pub calendar_created: bool,
    pub report: ApplyReport,
}

/// Fetches a board, links it to its calendar and reconciles the current week.
pub struct BoardSyncService<B, C>
where
    B: BoardClient,
    C: CalendarClient,
{
    board_client: Arc<B>,
    calendar_initializer: BoardCalendarInitializer<C>,
    reconciler: WeekReconciler<C>,
}

impl<B, C> BoardSyncService<B, C>
where
    B: BoardClient,
    C: CalendarClient,
{
    pub fn new(board_client: Arc<B>, calendar_client: Arc<C>, time_zone: Tz) -> Self {
        Self {
            board_client,
            calendar_initializer: BoardCalendarInitializer::new(
                Arc::clone(&calendar_client),
                time_zone,
            ),
            reconciler: WeekReconciler::new(calendar_client, time_zone),
        }
    }

    pub fn with_now_provider(mut self, now_provider: NowProvider) -> Self {
        self.reconciler = self.reconciler.with_now_provider(now_provider);
        self
    }

    pub async fn sync_board(
        &self,
        access_token: &str,
        board_id: u64,
    ) -> Result<SyncSummary, SyncError> {
        let board = self.board_client.fetch_board(board_id).await?;
        info!(
            board_id = %board.id,
            board = %board.name,
            groups = board.groups.len(),
            "board fetched"
        );
        validate_group_titles(&board)?;

        let ensured = self
            .calendar_initializer
            .ensure_board_calendar(access_token, &board)
            .await?;
        let calendar_created = matches!(ensured, EnsureBoardCalendarResult::Created(_));
        let calendar = ensured.into_calendar();

        let report = self
            .reconciler
            .reconcile(access_token, &calendar.id, &board)
            .await?;

        Ok(SyncSummary {
            board_id: board.id,
            board_name: board.name,
            calendar_id: calendar.id,
            calendar_created,
            report,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_support::{
        FakeBoardClient, FakeCalendarClient, board, fixed_now, task,
    };
    use crate::domain::error::ErrorKind;
    use crate::domain::models::Calendar;
    use chrono_tz::America::New_York;
    use std::sync::atomic::Ordering;

    fn service(
        board_client: &Arc<FakeBoardClient>,
        calendar_client: &Arc<FakeCalendarClient>,
    ) -> BoardSyncService<FakeBoardClient, FakeCalendarClient> {
        BoardSyncService::new(Arc::clone(board_client), Arc::clone(calendar_client), New_York)
            .with_now_provider(Arc::new(fixed_now))
    }

    #[tokio::test]
    async fn first_sync_creates_calendar_and_events() {
        let board_client = Arc::new(FakeBoardClient::new(board(vec![
            ("Monday", vec![task("Plan sprint", Some("1"), None)]),
            ("Friday", vec![task("Demo", None, Some("2024-01-05 16:00 -05:00"))]),
        ])));
        let calendar_client = Arc::new(FakeCalendarClient::default());

        let summary = service(&board_client, &calendar_client)
            .sync_board("token", 424242)
            .await
            .expect("sync");

        assert!(summary.calendar_created);
        assert_eq!(summary.board_name, "Weekly plan");
        assert_eq!(summary.report.to_string(), "2 added, 0 removed, 0 updated");
        assert!(
            calendar_client
                .calls()
                .iter()
                .filter(|call| call.starts_with("list_events"))
                .all(|call| call.contains(&summary.calendar_id))
        );
    }

    #[tokio::test]
    async fn repeat_sync_reuses_calendar_and_changes_nothing() {
        let board_client = Arc::new(FakeBoardClient::new(board(vec![(
            "Tuesday",
            vec![task("Review PRs", Some("2"), None)],
        )])));
        let calendar_client = Arc::new(FakeCalendarClient::with_calendars(vec![Calendar {
            id: "board@group".to_string(),
            summary: "Weekly plan".to_string(),
            description: Some("424242".to_string()),
        }]));
        let service = service(&board_client, &calendar_client);

        service.sync_board("token", 424242).await.expect("first sync");
        let second = service.sync_board("token", 424242).await.expect("second sync");

        assert!(!second.calendar_created);
        assert_eq!(second.calendar_id, "board@group");
        assert!(second.report.is_empty());
        assert_eq!(board_client.fetch_calls.load(Ordering::SeqCst), 2);
        assert_eq!(calendar_client.count("create_calendar"), 0);
    }

    #[tokio::test]
    async fn board_failure_stops_before_calendar_access() {
        let board_client = Arc::new(FakeBoardClient::new(board(Vec::new())));
        let calendar_client = Arc::new(FakeCalendarClient::default());

        let error = service(&board_client, &calendar_client)
            .sync_board("token", 7)
            .await
            .expect_err("unknown board");

        assert!(matches!(error, SyncError::Collaborator(_)));
        assert!(calendar_client.calls().is_empty());
    }

    #[tokio::test]
    async fn unrecognized_group_title_stops_before_calendar_access() {
        let board_client = Arc::new(FakeBoardClient::new(board(vec![(
            "Someday",
            vec![task("Maybe", None, None)],
        )])));
        let calendar_client = Arc::new(FakeCalendarClient::default());

        let error = service(&board_client, &calendar_client)
            .sync_board("token", 424242)
            .await
            .expect_err("unknown title");

        assert_eq!(error.kind(), ErrorKind::Validation);
        assert!(error.to_string().contains("Someday"));
        assert!(calendar_client.calls().is_empty());
    }
}
