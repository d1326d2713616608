//! Automated job applications against the recruiting platform.
//!
//! A run replays the jobs deferred by the previous run, then evaluates fresh
//! candidates (paged listings down to the stored watermark, or an explicit id
//! list), and finally persists the new deferred set and [`RunState`].

pub mod domain;
pub mod evaluation;
pub mod extractor;
pub mod profile;
pub mod repository;
pub mod service;
pub mod session;
pub mod storage;
pub(crate) mod timestamps;

#[cfg(test)]
mod tests;

pub use domain::{
    ApplicationEntry, ApplicationRequest, ApplyMethod, DocumentCategory, DocumentId,
    DocumentRequirement, DocumentSet, JobDetail, JobId, JobListing, ListingRecord, RunState,
};
pub use evaluation::{
    DecisionEngine, Evaluation, EvaluationConfig, JobOutcome, KeywordFilter, SessionFailure,
    SkipReason, SubmissionPolicy,
};
pub use extractor::{
    extract_from_dir, extract_job_ids, read_identifier_list, write_identifier_list,
    DirectoryExtraction, ExtractError, FileExtraction, IdentifierListError,
};
pub use profile::{InputError, ProfileDocument, RunProfile};
pub use repository::{ApplicationLog, RepositoryError, StateStore};
pub use service::{AutoApplyService, JobReport, JobSource, RunError, RunOutcome, RunSummary};
pub use session::{
    ClientSettings, DetailPayload, HandshakeClient, ListingPage, ListingSource, PlatformSession,
    SessionError,
};
pub use storage::{CsvApplicationLog, FileStateStore};
