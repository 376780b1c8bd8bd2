use thiserror::Error;

/// Everything that can go wrong between picking a file and showing a result.
#[derive(Debug, Error)]
pub enum SummarizeError {
    #[error("Please select a valid video file.")]
    Validation,

    #[error("Server responded with {status}")]
    Server { status: u16 },

    #[error("{0}")]
    Protocol(String),

    #[error("{0}")]
    TaskFailure(String),

    #[error("Failed to send request: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("File error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl SummarizeError {
    pub fn missing_task_id() -> Self {
        Self::Protocol("No task ID received from server".to_string())
    }

    pub fn missing_result_url() -> Self {
        Self::Protocol("No result URL received from server".to_string())
    }

    pub fn task_failed(message: Option<String>) -> Self {
        Self::TaskFailure(message.unwrap_or_else(|| "Task failed".to_string()))
    }
}
