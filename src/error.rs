use thiserror::Error;

#[derive(Error, Debug)]
pub enum JourneyError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unknown node: {0}")]
    UnknownNode(String),

    #[error("No path found from '{start}' to '{end}'")]
    NoPathFound { start: String, end: String },

    #[error("No edge between '{source_id}' and '{target_id}'")]
    MissingEdge {
        source_id: String,
        target_id: String,
    },

    #[error("Session not ready: start the browser session first")]
    SessionNotReady,

    #[error("Unsupported surface: {0}")]
    UnsupportedSurface(String),

    #[error("Oracle failure: {0}")]
    OracleFailure(String),

    #[error("Failed to connect to Chrome: {0}")]
    ConnectionFailed(String),

    #[error("Failed to launch Chrome: {0}")]
    LaunchFailed(String),

    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("No page available")]
    NoPage,

    #[error("CDP error: {0}")]
    Cdp(#[from] chromiumoxide::error::CdpError),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Other error: {0}")]
    Other(String),
}

impl JourneyError {
    /// Oracle failures end the current attempt; everything else ends the journey.
    pub fn is_oracle_failure(&self) -> bool {
        matches!(self, JourneyError::OracleFailure(_))
    }
}

pub type Result<T> = std::result::Result<T, JourneyError>;
