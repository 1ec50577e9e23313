use estimator_core::EstimatorError;

#[derive(Debug, thiserror::Error)]
pub enum RagError {
    #[error("embedding error ({provider}): {message}")]
    Embedding { provider: String, message: String },

    #[error("knowledge base error ({backend}): {message}")]
    KnowledgeBase { backend: String, message: String },

    #[error("invalid record: {0}")]
    InvalidRecord(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RagError {
    pub fn embedding(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Embedding { provider: provider.into(), message: message.into() }
    }

    pub fn knowledge_base(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::KnowledgeBase { backend: backend.into(), message: message.into() }
    }
}

impl From<RagError> for EstimatorError {
    fn from(error: RagError) -> Self {
        EstimatorError::Retrieval(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RagError>;
