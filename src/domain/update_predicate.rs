use crate::domain::error::MappingError;
use crate::domain::models::{ExistingEvent, Task};
use crate::domain::task_event_mapper::TaskTiming;
use chrono::DateTime;
use chrono_tz::Tz;

/// Decides whether a matched calendar event drifted from what its task asks for.
///
/// Comparisons are exact: a one-second difference in duration or end time
/// counts as a change.
#[derive(Debug, Clone, Copy)]
pub struct UpdateNeededPredicate {
    time_zone: Tz,
}

impl UpdateNeededPredicate {
    pub fn new(time_zone: Tz) -> Self {
        Self { time_zone }
    }

    pub fn needs_update(&self, task: &Task, event: &ExistingEvent) -> Result<bool, MappingError> {
        let timing = TaskTiming::from_task(task, self.time_zone)?;

        let start = parse_event_time(event, "start", &event.start, self.time_zone)?;
        let end = parse_event_time(event, "end", &event.end, self.time_zone)?;
        let existing_duration = end - start;

        let unchanged = match timing.due {
            None => existing_duration == timing.duration,
            Some(due) => end == due && existing_duration == timing.duration,
        };
        Ok(!unchanged)
    }
}

fn parse_event_time(
    event: &ExistingEvent,
    field: &'static str,
    value: &str,
    time_zone: Tz,
) -> Result<DateTime<Tz>, MappingError> {
    DateTime::parse_from_rfc3339(value)
        .map(|parsed| parsed.with_timezone(&time_zone))
        .map_err(|error| MappingError::InvalidEventTime {
            event: event.summary.clone(),
            field,
            value: value.to_string(),
            reason: error.to_string(),
        })
}
