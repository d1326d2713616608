mod config;
mod policy;
mod rules;

pub use config::{EvaluationConfig, KeywordFilter, SubmissionPolicy};
pub use policy::{JobOutcome, SkipReason};

use chrono::NaiveDateTime;
use tracing::{debug, warn};

use super::domain::{ApplicationRequest, DocumentSet, JobId, JobListing};
use super::session::{PlatformSession, SessionError};
use rules::{classify, Verdict};

const FORBIDDEN: u16 = 403;

/// Applies the apply/defer/skip rules to one job at a time.
///
/// The engine holds no session state of its own; every platform call goes
/// through the session passed to [`DecisionEngine::evaluate`].
pub struct DecisionEngine {
    config: EvaluationConfig,
    documents: DocumentSet,
    now: NaiveDateTime,
}

/// Outcome of one evaluation together with the listing as enriched by its detail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub listing: JobListing,
    pub outcome: JobOutcome,
}

/// The platform rejected the session; the run must stop.
#[derive(Debug, thiserror::Error)]
#[error("session rejected while applying to job {job}: {source}")]
pub struct SessionFailure {
    pub job: JobId,
    #[source]
    pub source: SessionError,
}

impl DecisionEngine {
    pub fn new(config: EvaluationConfig, documents: DocumentSet, now: NaiveDateTime) -> Self {
        Self {
            config,
            documents,
            now,
        }
    }

    pub fn now(&self) -> NaiveDateTime {
        self.now
    }

    /// Keyword pre-filter; rejected listings never reach the platform.
    pub fn admits(&self, listing: &JobListing) -> bool {
        self.config.keywords.admits(&listing.title)
    }

    pub fn evaluate<S>(
        &self,
        session: &S,
        listing: &JobListing,
    ) -> Result<Evaluation, SessionFailure>
    where
        S: PlatformSession + ?Sized,
    {
        let payload = match session.fetch_job_detail(listing.id) {
            Ok(payload) => payload,
            Err(err) => {
                let status = err.status();
                if status == Some(FORBIDDEN) {
                    debug!(job = %listing.id, "detail fetch forbidden");
                } else {
                    warn!(job = %listing.id, error = %err, "detail fetch failed");
                }
                return Ok(Evaluation {
                    listing: listing.clone(),
                    outcome: JobOutcome::Skipped(SkipReason::FetchFailed { status }),
                });
            }
        };

        let detail = payload.into_detail(listing.clone());
        let outcome = match classify(&detail, &self.documents, self.now) {
            Verdict::NotInPlatform(method) => JobOutcome::Skipped(SkipReason::External { method }),
            Verdict::NotYetOpen(opens_at) => JobOutcome::Deferred { opens_at },
            Verdict::MissingDocuments(missing) => {
                JobOutcome::Skipped(SkipReason::DocumentsMissing { missing })
            }
            Verdict::Ready(document_ids) => {
                let request = ApplicationRequest {
                    job_id: detail.listing.id,
                    applicable_type: detail.listing.posting_type.clone(),
                    document_ids,
                };
                self.submit(session, request)?
            }
        };

        Ok(Evaluation {
            listing: detail.listing,
            outcome,
        })
    }

    fn submit<S>(
        &self,
        session: &S,
        request: ApplicationRequest,
    ) -> Result<JobOutcome, SessionFailure>
    where
        S: PlatformSession + ?Sized,
    {
        match session.submit_application(&request) {
            Ok(()) => Ok(JobOutcome::Applied),
            Err(err) => match err.status() {
                Some(status) if self.config.submission.skips(status) => {
                    warn!(job = %request.job_id, status, "submission rejected, skipping");
                    Ok(JobOutcome::Skipped(SkipReason::SubmissionRejected { status }))
                }
                _ => Err(SessionFailure {
                    job: request.job_id,
                    source: err,
                }),
            },
        }
    }
}
