/// Registry and resolution errors.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("registry base URL is invalid: {0}")]
    InvalidBaseUrl(String),

    #[error("registry transport error: {0}")]
    Transport(String),

    #[error("identity not found: {0}")]
    NotFound(String),

    #[error("identity already registered: {0}")]
    Duplicate(String),

    #[error("registry rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("registry returned an unusable response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for DiscoveryError {
    fn from(e: reqwest::Error) -> Self {
        DiscoveryError::Transport(e.to_string())
    }
}
