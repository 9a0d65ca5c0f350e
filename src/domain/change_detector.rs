use crate::domain::error::MappingError;
use crate::domain::models::{CanonicalEvent, EventUpdate, ExistingEvent, Task};
use crate::domain::task_event_mapper::TaskEventMapper;
use crate::domain::update_predicate::UpdateNeededPredicate;
use chrono::DateTime;
use chrono_tz::Tz;
use std::collections::HashSet;

/// Outcome of looking a task name up among one day's events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchResult<'a> {
    NoMatch,
    Unique(&'a ExistingEvent),
    Duplicate(Vec<&'a ExistingEvent>),
}

impl<'a> MatchResult<'a> {
    pub fn find(name: &str, events: &'a [ExistingEvent]) -> Self {
        let mut matches: Vec<&ExistingEvent> = events
            .iter()
            .filter(|event| event.summary == name)
            .collect();
        match matches.len() {
            0 => Self::NoMatch,
            1 => Self::Unique(matches.remove(0)),
            _ => Self::Duplicate(matches),
        }
    }

    pub fn events(&self) -> Vec<&'a ExistingEvent> {
        match self {
            Self::NoMatch => Vec::new(),
            Self::Unique(event) => vec![*event],
            Self::Duplicate(events) => events.clone(),
        }
    }
}

/// A name that appears more than once on one side of a day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DuplicateName {
    /// Several tasks share the name; only the first one is reconciled.
    Tasks { name: String, count: usize },
    /// Several calendar events share the name; each is checked against the task.
    Events { name: String, event_ids: Vec<String> },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DayChanges {
    pub to_add: Vec<CanonicalEvent>,
    pub to_remove: Vec<ExistingEvent>,
    pub to_update: Vec<EventUpdate>,
    pub duplicates: Vec<DuplicateName>,
}

impl DayChanges {
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty() && self.to_update.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ChangeDetector {
    mapper: TaskEventMapper,
    predicate: UpdateNeededPredicate,
}

impl ChangeDetector {
    pub fn new(time_zone: Tz) -> Self {
        Self {
            mapper: TaskEventMapper::new(time_zone),
            predicate: UpdateNeededPredicate::new(time_zone),
        }
    }

    /// Computes what has to change for one day, matching tasks to events by exact name.
    pub fn detect(
        &self,
        existing: &[ExistingEvent],
        tasks: &[&Task],
        group_title: &str,
        anchor: DateTime<Tz>,
    ) -> Result<DayChanges, MappingError> {
        let mut changes = DayChanges::default();

        // Every task has to map cleanly, including ones whose name repeats.
        let mut seen: HashSet<&str> = HashSet::new();
        let mut distinct: Vec<(&Task, CanonicalEvent)> = Vec::new();
        for &task in tasks {
            let canonical = self.mapper.map(task, group_title, anchor)?;
            if seen.insert(task.name.as_str()) {
                distinct.push((task, canonical));
            }
        }
        for (task, _) in &distinct {
            let count = tasks.iter().filter(|other| other.name == task.name).count();
            if count > 1 {
                changes.duplicates.push(DuplicateName::Tasks {
                    name: task.name.clone(),
                    count,
                });
            }
        }

        for (task, canonical) in distinct {
            let matched = MatchResult::find(&task.name, existing);

            if let MatchResult::Duplicate(events) = &matched {
                changes.duplicates.push(DuplicateName::Events {
                    name: task.name.clone(),
                    event_ids: events.iter().map(|event| event.id.clone()).collect(),
                });
            }

            if matched == MatchResult::NoMatch {
                changes.to_add.push(canonical);
                continue;
            }

            for event in matched.events() {
                if self.predicate.needs_update(task, event)? {
                    changes.to_update.push(EventUpdate {
                        event_id: event.id.clone(),
                        event: canonical.clone(),
                    });
                }
            }
        }

        changes.to_remove = existing
            .iter()
            .filter(|event| !seen.contains(event.summary.as_str()))
            .cloned()
            .collect();

        Ok(changes)
    }
}
