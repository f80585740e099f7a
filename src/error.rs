use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Input error: {0}")]
    Input(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Malformed status response: {0}")]
    Malformed(String),

    #[error("Timed out waiting for call to end after {waited_ms}ms ({polls} polls)")]
    Timeout { waited_ms: u64, polls: u32 },

    #[error("Resolution cancelled")]
    Cancelled,

    #[error("Report fetch error: {0}")]
    DependentFetch(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ReportError {
    /// Message shown to the person waiting on the report page.
    pub fn user_message(&self) -> String {
        match self {
            ReportError::Input(msg) => msg.clone(),
            ReportError::Config(msg) => format!("The report service is misconfigured: {}", msg),
            ReportError::Transport(_) | ReportError::Malformed(_) => {
                "Could not check the interview call status. Please try again.".to_string()
            }
            ReportError::Timeout { .. } => {
                "Timed out waiting for the interview call to end. Please try again.".to_string()
            }
            ReportError::Cancelled => "Report loading was cancelled.".to_string(),
            ReportError::DependentFetch(_) => {
                "There was an error processing the interview report.".to_string()
            }
            ReportError::Json(_) => "The report could not be displayed.".to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ReportError>;
