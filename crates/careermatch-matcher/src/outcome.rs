use serde::Serialize;

use careermatch_core::types::{IndexState, MatchResult};

/// Why a match request produced the matches it did.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatchStatus {
    Matched,
    /// The query text was blank.
    EmptyQuery,
    /// No build has completed, or the last one indexed nothing.
    IndexNotReady { state: IndexState },
    /// The query could not be embedded or searched.
    ProviderFailure { reason: String, retryable: bool },
}

/// Response of `Matcher::find_matches`.
#[derive(Debug, Clone, Serialize)]
pub struct MatchOutcome {
    pub success: bool,
    pub matches: Vec<MatchResult>,
    pub total_jobs: usize,
    pub status: MatchStatus,
}

impl MatchOutcome {
    pub fn matched(matches: Vec<MatchResult>, total_jobs: usize) -> Self {
        Self { success: true, matches, total_jobs, status: MatchStatus::Matched }
    }

    /// `success` stays true while the index is not ready; that is not a failure.
    pub fn without_matches(status: MatchStatus, total_jobs: usize) -> Self {
        let success = matches!(status, MatchStatus::Matched | MatchStatus::IndexNotReady { .. });
        Self { success, matches: Vec::new(), total_jobs, status }
    }

    /// True when asking again later may help.
    pub fn is_retryable(&self) -> bool {
        matches!(self.status, MatchStatus::ProviderFailure { retryable: true, .. })
    }
}
