use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Parse,
    Validation,
    Collaborator,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MappingError {
    #[error("task '{task}' has an invalid EstimateHours value '{value}': {reason}")]
    InvalidEstimate {
        task: String,
        value: String,
        reason: String,
    },
    #[error("task '{task}' has an invalid DueDateAndTime value '{value}': {reason}")]
    InvalidDueDate {
        task: String,
        value: String,
        reason: String,
    },
    #[error("calendar event '{event}' has an invalid {field} '{value}': {reason}")]
    InvalidEventTime {
        event: String,
        field: &'static str,
        value: String,
        reason: String,
    },
    #[error(
        "the task '{task}' has a due date on '{due_weekday}' instead of '{group_weekday}'. \
         A task in the group '{group}' with a due date should be due on that weekday. \
         Please fix it on the board by removing the due date or changing the date and time."
    )]
    DueDateWeekdayMismatch {
        task: String,
        due_weekday: &'static str,
        group_weekday: &'static str,
        group: String,
    },
    #[error("group '{title}' is not a weekday name (expected Sunday through Saturday)")]
    UnrecognizedGroupTitle { title: String },
}

impl MappingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidEstimate { .. }
            | Self::InvalidDueDate { .. }
            | Self::InvalidEventTime { .. } => ErrorKind::Parse,
            Self::DueDateWeekdayMismatch { .. } | Self::UnrecognizedGroupTitle { .. } => {
                ErrorKind::Validation
            }
        }
    }
}
