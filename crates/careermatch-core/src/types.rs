//! Domain types shared by the index, the matcher and the providers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A fixed-length embedding. All vectors inside one index share a length.
pub type EmbeddingVector = Vec<f32>;

/// Stable identity of a reference document.
///
/// Job feeds use integer ids, other sources use strings; both are accepted
/// and written back in the form they were read.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DocumentId {
    Number(u64),
    Text(String),
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<u64> for DocumentId {
    fn from(value: u64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for DocumentId {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// A job posting (or any reference text) that queries are matched against.
///
/// - `id`: unique within a corpus
/// - `organization`: accepts `company` on input
/// - `requirements`: ordered, free text
/// - `skills`: order is preserved because it feeds the embedding text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceDocument {
    pub id: DocumentId,
    pub title: String,
    #[serde(alias = "company")]
    pub organization: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub description: String,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub skills: Vec<String>,
}

impl ReferenceDocument {
    /// The text handed to the embedding provider: title, description, then
    /// skills, space separated.
    pub fn embedding_text(&self) -> String {
        format!("{} {} {}", self.title, self.description, self.skills.join(" "))
    }

    /// Multi-line digest used when asking for a match explanation.
    pub fn summary(&self) -> String {
        format!(
            "Title: {}\nCompany: {}\nDescription: {}\nRequired Skills: {}",
            self.title,
            self.organization,
            self.description,
            self.skills.join(", ")
        )
    }
}

/// Lifecycle of the published index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexState {
    /// No build has completed yet.
    Uninitialized,
    /// At least one document is searchable.
    Ready,
    /// A build completed but no document could be embedded.
    Empty,
}

impl IndexState {
    pub fn is_ready(self) -> bool {
        self == Self::Ready
    }
}

impl fmt::Display for IndexState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Uninitialized => "uninitialized",
            Self::Ready => "ready",
            Self::Empty => "empty",
        };
        f.write_str(s)
    }
}

/// One ranked hit returned to callers.
///
/// `rank` is 1-based and follows output order. `explanation` stays `None`
/// until narrative enrichment runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResult {
    #[serde(rename = "job")]
    pub document: ReferenceDocument,
    pub similarity_score: f32,
    pub rank: usize,
    pub explanation: Option<String>,
}
