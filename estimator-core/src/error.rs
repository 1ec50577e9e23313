#[derive(Debug, thiserror::Error)]
pub enum EstimatorError {
    /// The model answered, but not with the JSON shape the stage requires.
    #[error("Upstream generation error ({stage}): {message}")]
    UpstreamGeneration { stage: String, message: String },

    #[error("Model error: {0}")]
    Model(String),

    #[error("Retrieval error: {0}")]
    Retrieval(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl EstimatorError {
    pub fn upstream(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::UpstreamGeneration { stage: stage.into(), message: message.into() }
    }

    pub fn model(message: impl Into<String>) -> Self {
        Self::Model(message.into())
    }

    pub fn retrieval(message: impl Into<String>) -> Self {
        Self::Retrieval(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// True for errors caused by unusable model output rather than transport.
    pub fn is_upstream_generation(&self) -> bool {
        matches!(self, Self::UpstreamGeneration { .. })
    }
}

pub type Result<T> = std::result::Result<T, EstimatorError>;
