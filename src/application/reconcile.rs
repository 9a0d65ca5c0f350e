use crate::application::NowProvider;
use crate::application::error::SyncError;
use crate::domain::change_detector::{ChangeDetector, DayChanges, DuplicateName};
use crate::domain::error::MappingError;
use crate::domain::models::{
    Board, CanonicalEvent, EventUpdate, ExistingEvent, GroupWeekday, Task, weekday_name,
};
use crate::domain::week::{DayWindow, WeekdayDateMap};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::google_calendar_client::CalendarClient;
use chrono::{DateTime, Duration, Utc, Weekday};
use chrono_tz::Tz;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyPhase {
    Add,
    Remove,
    Update,
}

impl fmt::Display for ApplyPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Add => "add",
            Self::Remove => "remove",
            Self::Update => "update",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedEvent {
    pub summary: String,
    pub event_id: String,
}

/// Operations that reached the calendar, in the order they were sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub added: Vec<AppliedEvent>,
    pub removed: Vec<AppliedEvent>,
    pub updated: Vec<AppliedEvent>,
}

impl ApplyReport {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.updated.is_empty()
    }
}

impl fmt::Display for ApplyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} added, {} removed, {} updated",
            self.added.len(),
            self.removed.len(),
            self.updated.len()
        )
    }
}

/// Changes for the whole week, ordered by weekday and then board order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationPlan {
    pub to_add: Vec<CanonicalEvent>,
    pub to_remove: Vec<ExistingEvent>,
    pub to_update: Vec<EventUpdate>,
    pub duplicates: Vec<DuplicateName>,
    /// Weekdays that had at least one group and were fetched.
    pub days: Vec<Weekday>,
}

impl ReconciliationPlan {
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty() && self.to_update.is_empty()
    }

    fn absorb(&mut self, weekday: Weekday, changes: DayChanges) {
        self.days.push(weekday);
        self.to_add.extend(changes.to_add);
        self.to_remove.extend(changes.to_remove);
        self.to_update.extend(changes.to_update);
        self.duplicates.extend(changes.duplicates);
    }
}

pub struct WeekReconciler<C>
where
    C: CalendarClient,
{
    calendar_client: Arc<C>,
    detector: ChangeDetector,
    time_zone: Tz,
    now_provider: NowProvider,
}

impl<C> WeekReconciler<C>
where
    C: CalendarClient,
{
    pub fn new(calendar_client: Arc<C>, time_zone: Tz) -> Self {
        Self {
            calendar_client,
            detector: ChangeDetector::new(time_zone),
            time_zone,
            now_provider: Arc::new(Utc::now),
        }
    }

    pub fn with_now_provider(mut self, now_provider: NowProvider) -> Self {
        self.now_provider = now_provider;
        self
    }

    pub async fn reconcile(
        &self,
        access_token: &str,
        calendar_id: &str,
        board: &Board,
    ) -> Result<ApplyReport, SyncError> {
        let plan = self.plan(access_token, calendar_id, board).await?;
        self.apply(access_token, calendar_id, &plan).await
    }

    /// Reads the calendar for every weekday that has a group and computes the changes.
    ///
    /// Group titles are validated before any calendar call is made.
    pub async fn plan(
        &self,
        access_token: &str,
        calendar_id: &str,
        board: &Board,
    ) -> Result<ReconciliationPlan, SyncError> {
        let tasks_by_day = group_tasks_by_weekday(board)?;
        let week = WeekdayDateMap::current_week((self.now_provider)(), self.time_zone);
        let mut fetched = Vec::new();

        for (weekday, anchor) in week.iter() {
            let Some(tasks) = &tasks_by_day[weekday.num_days_from_sunday() as usize] else {
                debug!(day = weekday_name(weekday), "no group for day, skipping");
                continue;
            };

            let window = week.day_window(weekday);
            // The lower bound applies to event ends and is exclusive, so a
            // zero-length event at midnight needs a slightly earlier bound.
            let listed = self
                .calendar_client
                .list_events(
                    access_token,
                    calendar_id,
                    window.start - Duration::seconds(1),
                    window.end,
                )
                .await?;
            fetched.push(FetchedDay {
                weekday,
                anchor,
                window,
                tasks: tasks.as_slice(),
                listed,
            });
        }

        let mut plan = ReconciliationPlan::default();
        let owned = assign_events(&fetched);
        for (day, existing) in fetched.iter().zip(owned) {
            let changes = self.detector.detect(
                &existing,
                day.tasks,
                weekday_name(day.weekday),
                day.anchor,
            )?;
            for duplicate in &changes.duplicates {
                match duplicate {
                    DuplicateName::Tasks { name, count } => warn!(
                        day = weekday_name(day.weekday),
                        task = %name,
                        count,
                        "several tasks share a name; only the first is synced"
                    ),
                    DuplicateName::Events { name, event_ids } => warn!(
                        day = weekday_name(day.weekday),
                        task = %name,
                        event_ids = ?event_ids,
                        "several calendar events share a task name"
                    ),
                }
            }
            debug!(
                day = weekday_name(day.weekday),
                tasks = day.tasks.len(),
                listed = day.listed.len(),
                existing = existing.len(),
                to_add = changes.to_add.len(),
                to_remove = changes.to_remove.len(),
                to_update = changes.to_update.len(),
                "day compared"
            );
            plan.absorb(day.weekday, changes);
        }

        info!(
            days = plan.days.len(),
            to_add = plan.to_add.len(),
            to_remove = plan.to_remove.len(),
            to_update = plan.to_update.len(),
            duplicates = plan.duplicates.len(),
            "reconciliation planned"
        );
        Ok(plan)
    }

    /// Sends adds, then removals, then updates. Stops at the first failure.
    pub async fn apply(
        &self,
        access_token: &str,
        calendar_id: &str,
        plan: &ReconciliationPlan,
    ) -> Result<ApplyReport, SyncError> {
        let mut report = ApplyReport::default();

        for event in &plan.to_add {
            match self
                .calendar_client
                .insert_event(access_token, calendar_id, event)
                .await
            {
                Ok(event_id) => {
                    debug!(
                        summary = %event.summary,
                        %event_id,
                        start = %event.start,
                        "event added"
                    );
                    report.added.push(AppliedEvent {
                        summary: event.summary.clone(),
                        event_id,
                    });
                }
                Err(source) => return Err(aborted(ApplyPhase::Add, report, source)),
            }
        }

        for event in &plan.to_remove {
            match self
                .calendar_client
                .delete_event(access_token, calendar_id, &event.id)
                .await
            {
                Ok(()) => {
                    debug!(
                        summary = %event.summary,
                        event_id = %event.id,
                        "event removed"
                    );
                    report.removed.push(AppliedEvent {
                        summary: event.summary.clone(),
                        event_id: event.id.clone(),
                    });
                }
                Err(source) => return Err(aborted(ApplyPhase::Remove, report, source)),
            }
        }

        for update in &plan.to_update {
            match self
                .calendar_client
                .update_event(access_token, calendar_id, &update.event_id, &update.event)
                .await
            {
                Ok(()) => {
                    debug!(
                        summary = %update.event.summary,
                        event_id = %update.event_id,
                        "event updated"
                    );
                    report.updated.push(AppliedEvent {
                        summary: update.event.summary.clone(),
                        event_id: update.event_id.clone(),
                    });
                }
                Err(source) => return Err(aborted(ApplyPhase::Update, report, source)),
            }
        }

        info!(
            added = report.added.len(),
            removed = report.removed.len(),
            updated = report.updated.len(),
            "reconciliation applied"
        );
        Ok(report)
    }
}

fn aborted(phase: ApplyPhase, report: ApplyReport, source: InfraError) -> SyncError {
    warn!(%phase, applied = %report, error = %source, "apply aborted");
    SyncError::ApplyAborted {
        phase,
        report,
        source,
    }
}

/// Fails on the first group whose title is not a weekday name.
pub fn validate_group_titles(board: &Board) -> Result<(), MappingError> {
    group_tasks_by_weekday(board).map(|_| ())
}

/// Tasks per weekday, Sunday first. `None` marks a weekday without any group.
fn group_tasks_by_weekday(board: &Board) -> Result<[Option<Vec<&Task>>; 7], MappingError> {
    let mut days: [Option<Vec<&Task>>; 7] = Default::default();
    for group in &board.groups {
        match group.weekday() {
            GroupWeekday::Recognized(weekday) => days[weekday.num_days_from_sunday() as usize]
                .get_or_insert_with(Vec::new)
                .extend(group.tasks.iter()),
            GroupWeekday::Unrecognized(title) => {
                return Err(MappingError::UnrecognizedGroupTitle { title });
            }
        }
    }
    Ok(days)
}

struct FetchedDay<'a> {
    weekday: Weekday,
    anchor: DateTime<Tz>,
    window: DayWindow,
    tasks: &'a [&'a Task],
    listed: Vec<ExistingEvent>,
}

/// Hands every listed event to at most one fetched day, parallel to `days`.
///
/// A listing also returns events that merely overlap its day, so an event
/// crossing midnight is listed twice. It goes to its end day when only that
/// day has a task with its name, and to its start day otherwise. Events with
/// unreadable timestamps stay with the first day that listed them so that
/// day can report them.
fn assign_events(days: &[FetchedDay<'_>]) -> Vec<Vec<ExistingEvent>> {
    let mut owned = vec![Vec::new(); days.len()];
    let mut seen: HashSet<&str> = HashSet::new();
    for (listed_by, day) in days.iter().enumerate() {
        for event in &day.listed {
            if !seen.insert(event.id.as_str()) {
                continue;
            }
            if let Some(owner) = owning_day(event, days, listed_by) {
                owned[owner].push(event.clone());
            }
        }
    }
    owned
}

fn owning_day(
    event: &ExistingEvent,
    days: &[FetchedDay<'_>],
    listed_by: usize,
) -> Option<usize> {
    let (Some(start), Some(end)) = (parse_instant(&event.start), parse_instant(&event.end)) else {
        return Some(listed_by);
    };
    let start_day = days.iter().position(|day| day.window.contains(start));
    let end_day = days.iter().position(|day| day.window.contains(end));
    let has_task = |index: usize| days[index].tasks.iter().any(|task| task.name == event.summary);

    match (start_day, end_day) {
        (Some(start_day), Some(end_day))
            if start_day != end_day && !has_task(start_day) && has_task(end_day) =>
        {
            Some(end_day)
        }
        (Some(start_day), _) => Some(start_day),
        (None, Some(end_day)) if has_task(end_day) => Some(end_day),
        _ => None,
    }
}

fn parse_instant(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|parsed| parsed.with_timezone(&Utc))
}
