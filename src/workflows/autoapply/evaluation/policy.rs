use chrono::NaiveDateTime;

use crate::workflows::autoapply::timestamps::format_timestamp;

/// Terminal result of evaluating one job in a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Applied,
    Deferred { opens_at: NaiveDateTime },
    Skipped(SkipReason),
}

impl JobOutcome {
    pub fn summary(&self) -> String {
        match self {
            JobOutcome::Applied => "applied".to_string(),
            JobOutcome::Deferred { opens_at } => {
                format!("deferred until {}", format_timestamp(*opens_at))
            }
            JobOutcome::Skipped(reason) => reason.summary(),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            JobOutcome::Applied => "applied",
            JobOutcome::Deferred { .. } => "deferred",
            JobOutcome::Skipped(reason) => reason.label(),
        }
    }
}

/// Why a job was not applied to in this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    AlreadyApplied,
    AlreadyEvaluated,
    Filtered,
    FetchFailed { status: Option<u16> },
    External { method: String },
    DocumentsMissing { missing: Vec<String> },
    SubmissionRejected { status: u16 },
}

impl SkipReason {
    pub fn label(&self) -> &'static str {
        match self {
            SkipReason::AlreadyApplied => "already-applied",
            SkipReason::AlreadyEvaluated => "already-evaluated",
            SkipReason::Filtered => "filtered",
            SkipReason::FetchFailed { .. } => "fetch-failed",
            SkipReason::External { .. } => "external",
            SkipReason::DocumentsMissing { .. } => "documents-missing",
            SkipReason::SubmissionRejected { .. } => "submission-rejected",
        }
    }

    pub fn summary(&self) -> String {
        match self {
            SkipReason::AlreadyApplied => "skipped: already applied".to_string(),
            SkipReason::AlreadyEvaluated => "skipped: already evaluated this run".to_string(),
            SkipReason::Filtered => "skipped: keyword filter".to_string(),
            SkipReason::FetchFailed { status: Some(status) } => {
                format!("skipped: detail fetch failed with status {status}")
            }
            SkipReason::FetchFailed { status: None } => "skipped: detail fetch failed".to_string(),
            SkipReason::External { method } => format!("skipped: applies via {method}"),
            SkipReason::DocumentsMissing { missing } => {
                format!("skipped: no document for {}", missing.join(", "))
            }
            SkipReason::SubmissionRejected { status } => {
                format!("skipped: submission rejected with status {status}")
            }
        }
    }

    /// Transient skips may succeed on a later run; the rest never will.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SkipReason::FetchFailed { .. } | SkipReason::SubmissionRejected { .. }
        )
    }
}
