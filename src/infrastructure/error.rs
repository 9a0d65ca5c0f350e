use thiserror::Error;

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
    #[error("Google Calendar API error: {0}")]
    CalendarApi(String),
    #[error("monday.com API error: {0}")]
    BoardApi(String),
    #[error("OAuth error: {0}")]
    OAuth(String),
    #[error("Credential store error: {0}")]
    Credential(String),
}
