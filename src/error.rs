#[derive(Debug, thiserror::Error)]
pub enum PromptImgError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// Transport failure before a response arrived. Displayed verbatim.
    #[error("{0}")]
    Request(String),

    #[error("Response error: {0}")]
    Response(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Non-2xx answer from the generation endpoint. Displayed verbatim.
    #[error("{message}")]
    Service { status: u16, message: String },

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PromptImgError {
    /// HTTP status of a service-reported failure.
    pub fn status(&self) -> Option<u16> {
        match self {
            PromptImgError::Service { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for PromptImgError {
    fn from(err: reqwest::Error) -> Self {
        PromptImgError::Request(err.to_string())
    }
}

impl From<serde_json::Error> for PromptImgError {
    fn from(err: serde_json::Error) -> Self {
        PromptImgError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PromptImgError>;
