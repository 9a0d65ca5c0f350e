use crate::domain::error::MappingError;
use crate::domain::models::{
    CanonicalEvent, DUE_DATE_AND_TIME_COLUMN, ESTIMATE_HOURS_COLUMN, EventStatus, Task,
    weekday_name,
};
use chrono::{DateTime, Datelike, Duration};
use chrono_tz::Tz;

pub const DEFAULT_EVENT_DURATION_MINUTES: i64 = 30;

/// `DueDateAndTime` text, e.g. `2024-01-03 17:00 -05:00`.
pub const DUE_DATE_FORMAT: &str = "%Y-%m-%d %H:%M %:z";

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

/// Duration and optional due date a task asks for, read from its columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskTiming {
    pub duration: Duration,
    pub due: Option<DateTime<Tz>>,
}

impl TaskTiming {
    pub fn from_task(task: &Task, time_zone: Tz) -> Result<Self, MappingError> {
        // Every column is parsed and the last one wins. An estimate with a
        // value must be a number; a blank due date counts as no due date.
        let mut duration = Duration::minutes(DEFAULT_EVENT_DURATION_MINUTES);
        for text in task.column_texts(ESTIMATE_HOURS_COLUMN) {
            duration = parse_estimate_hours(&task.name, text)?;
        }
        let mut due = None;
        for text in task.column_texts(DUE_DATE_AND_TIME_COLUMN) {
            if !text.trim().is_empty() {
                due = Some(parse_due_date(&task.name, text, time_zone)?);
            }
        }

        Ok(Self { duration, due })
    }
}

pub fn parse_estimate_hours(task: &str, text: &str) -> Result<Duration, MappingError> {
    let invalid = |reason: &str| MappingError::InvalidEstimate {
        task: task.to_string(),
        value: text.to_string(),
        reason: reason.to_string(),
    };

    let hours = text
        .trim()
        .parse::<f64>()
        .map_err(|error| invalid(&error.to_string()))?;
    if !hours.is_finite() || hours < 0.0 {
        return Err(invalid("expected a non-negative number of hours"));
    }

    let millis = (hours * MILLIS_PER_HOUR).round();
    if millis >= i64::MAX as f64 {
        return Err(invalid("estimate is out of range"));
    }
    Duration::try_milliseconds(millis as i64).ok_or_else(|| invalid("estimate is out of range"))
}

pub fn parse_due_date(task: &str, text: &str, time_zone: Tz) -> Result<DateTime<Tz>, MappingError> {
    DateTime::parse_from_str(text.trim(), DUE_DATE_FORMAT)
        .map(|value| value.with_timezone(&time_zone))
        .map_err(|error| MappingError::InvalidDueDate {
            task: task.to_string(),
            value: text.to_string(),
            reason: format!("{error} (expected format like 2024-01-03 17:00 -05:00)"),
        })
}

#[derive(Debug, Clone, Copy)]
pub struct TaskEventMapper {
    time_zone: Tz,
}

impl TaskEventMapper {
    pub fn new(time_zone: Tz) -> Self {
        Self { time_zone }
    }

    /// Builds the event a task should have on the day starting at `anchor`.
    ///
    /// Without a due date the event starts at the day's midnight. With one, it
    /// ends at the due date, which must fall on the same weekday as `anchor`.
    pub fn map(
        &self,
        task: &Task,
        group_title: &str,
        anchor: DateTime<Tz>,
    ) -> Result<CanonicalEvent, MappingError> {
        let timing = TaskTiming::from_task(task, self.time_zone)?;
        let anchor = anchor.with_timezone(&self.time_zone);

        let (start, end, status) = match timing.due {
            None => {
                let end = anchor
                    .checked_add_signed(timing.duration)
                    .ok_or_else(|| out_of_range(task))?;
                (anchor, end, EventStatus::Tentative)
            }
            Some(due) => {
                if due.weekday() != anchor.weekday() {
                    return Err(MappingError::DueDateWeekdayMismatch {
                        task: task.name.clone(),
                        due_weekday: weekday_name(due.weekday()),
                        group_weekday: weekday_name(anchor.weekday()),
                        group: group_title.to_string(),
                    });
                }
                let start = due
                    .checked_sub_signed(timing.duration)
                    .ok_or_else(|| out_of_range(task))?;
                (start, due, EventStatus::Confirmed)
            }
        };

        Ok(CanonicalEvent {
            summary: task.name.clone(),
            start,
            end,
            status,
            time_zone: self.time_zone,
        })
    }
}

fn out_of_range(task: &Task) -> MappingError {
    MappingError::InvalidEstimate {
        task: task.name.clone(),
        value: task
            .column_texts(ESTIMATE_HOURS_COLUMN)
            .last()
            .unwrap_or_default()
            .to_string(),
        reason: "event time is out of range".to_string(),
    }
}
