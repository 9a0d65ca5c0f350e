use crate::application::reconcile::{ApplyPhase, ApplyReport};
use crate::domain::error::{ErrorKind, MappingError};
use crate::infrastructure::error::InfraError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Mapping(#[from] MappingError),
    #[error(transparent)]
    Collaborator(#[from] InfraError),
    #[error("missing required setting `{0}`; set it with `boardcal config set {0}=...` or its flag")]
    MissingSetting(&'static str),
    #[error(
        "board {board_id} matches more than one calendar ({}); keep a single calendar whose description is the board id",
        calendar_ids.join(", ")
    )]
    AmbiguousBoardCalendar {
        board_id: String,
        calendar_ids: Vec<String>,
    },
    #[error("google authorization required; run `boardcal auth` first")]
    AuthorizationRequired,
    #[error("{phase} phase aborted after {report}: {source}")]
    ApplyAborted {
        phase: ApplyPhase,
        report: ApplyReport,
        source: InfraError,
    },
}

impl SyncError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Mapping(error) => error.kind(),
            Self::MissingSetting(_) | Self::AmbiguousBoardCalendar { .. } => ErrorKind::Validation,
            Self::Collaborator(_) | Self::AuthorizationRequired | Self::ApplyAborted { .. } => {
                ErrorKind::Collaborator
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_the_failing_layer() {
        let parse = SyncError::from(MappingError::InvalidEstimate {
            task: "t".to_string(),
            value: "x".to_string(),
            reason: "not a number".to_string(),
        });
        assert_eq!(parse.kind(), ErrorKind::Parse);

        let validation = SyncError::from(MappingError::UnrecognizedGroupTitle {
            title: "Someday".to_string(),
        });
        assert_eq!(validation.kind(), ErrorKind::Validation);

        let collaborator = SyncError::from(InfraError::BoardApi("down".to_string()));
        assert_eq!(collaborator.kind(), ErrorKind::Collaborator);
        assert_eq!(SyncError::MissingSetting("mondayApiKey").kind(), ErrorKind::Validation);
    }

    #[test]
    fn aborted_apply_lists_what_already_happened() {
        let mut report = ApplyReport::default();
        report.added.push(crate::application::reconcile::AppliedEvent {
            summary: "Write report".to_string(),
            event_id: "evt-1".to_string(),
        });
        let error = SyncError::ApplyAborted {
            phase: ApplyPhase::Remove,
            report,
            source: InfraError::CalendarApi("http 500 while deleting event".to_string()),
        };

        let message = error.to_string();
        assert!(message.starts_with("remove phase aborted after 1 added, 0 removed, 0 updated"));
        assert!(message.contains("http 500"));
    }

    #[test]
    fn ambiguous_calendar_names_every_candidate() {
        let error = SyncError::AmbiguousBoardCalendar {
            board_id: "42".to_string(),
            calendar_ids: vec!["a@group".to_string(), "b@group".to_string()],
        };
        assert!(error.to_string().contains("a@group, b@group"));
    }
}
