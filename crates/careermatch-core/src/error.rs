use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// An embedding or generation call failed, timed out, or returned a
    /// response of the wrong shape. Recoverable.
    #[error("Provider '{provider}' failed: {reason}")]
    ProviderFailure { provider: String, reason: String },

    /// A provider returned vectors of differing length within one build.
    #[error("Dimension mismatch for document {document}: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize, document: String },

    #[error("Malformed corpus: {0}")]
    MalformedCorpus(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl Error {
    pub fn provider(provider: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::ProviderFailure { provider: provider.into(), reason: reason.to_string() }
    }

    /// Only provider failures are worth retrying; everything else needs a
    /// configuration or data fix first.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ProviderFailure { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
