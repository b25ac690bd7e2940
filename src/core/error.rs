use thiserror::Error;

/// Broad classification of a [`GenerationError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Startup misconfiguration, never recoverable at runtime.
    Config,
    /// The remote service failed or returned nothing usable.
    Remote,
    /// The service answered with a payload we could not read.
    Parse,
    /// The payload was readable but incomplete or inconsistent.
    Validation,
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("remote service error: {0}")]
    Remote(String),

    #[error("image generation failed: no image was returned")]
    ImageMissing,

    #[error("could not parse story payload: {0}")]
    Parse(String),

    #[error("story was not fully received: expected {expected} segments, got {received}")]
    IncompleteStory { expected: usize, received: usize },

    #[error("story segments are not numbered 1..={expected}")]
    MisnumberedStory { expected: usize },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("a generation run is already in progress")]
    RunInProgress,
}

impl GenerationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::Config,
            Self::Remote(_) | Self::ImageMissing => ErrorKind::Remote,
            Self::Parse(_) => ErrorKind::Parse,
            Self::IncompleteStory { .. }
            | Self::MisnumberedStory { .. }
            | Self::InvalidRequest(_)
            | Self::RunInProgress => ErrorKind::Validation,
        }
    }
}

impl From<reqwest::Error> for GenerationError {
    /// The request URL is dropped so nothing from it reaches the user or the logs.
    fn from(err: reqwest::Error) -> Self {
        Self::Remote(err.without_url().to_string())
    }
}
