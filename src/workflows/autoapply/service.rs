use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDateTime;
use tracing::{info, warn};

use super::domain::{ApplicationEntry, JobId, JobListing, ListingRecord, RunState};
use super::evaluation::{DecisionEngine, JobOutcome, SessionFailure, SkipReason};
use super::repository::{ApplicationLog, RepositoryError, StateStore};
use super::session::{PlatformSession, SessionError};

/// Where the fresh candidates of a run come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobSource {
    /// Page through the platform search until the watermark is reached.
    Listings { per_page: u32 },
    /// Evaluate exactly these jobs; no pagination.
    Identifiers(Vec<JobId>),
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    /// The platform rejected the session; credentials must be refreshed.
    SessionInvalid,
    /// A listing page could not be fetched or read; the next run resumes
    /// from the same watermark.
    ListingInterrupted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobReport {
    pub id: JobId,
    pub title: String,
    pub outcome: JobOutcome,
}

/// Counters and per-job trail for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub outcome: RunOutcome,
    pub checked: usize,
    pub filtered: usize,
    pub applied: usize,
    pub deferred: usize,
    pub skipped: usize,
    /// Skips that may succeed on a later run.
    pub retryable: usize,
    pub skip_reasons: BTreeMap<&'static str, usize>,
    pub pages_fetched: u32,
    /// Watermark persisted at the end of the run.
    pub watermark: Option<NaiveDateTime>,
    pub failure: Option<String>,
    /// Submitted jobs the application log could not record.
    pub unlogged: Vec<JobId>,
    pub jobs: Vec<JobReport>,
}

impl RunSummary {
    fn new() -> Self {
        Self {
            outcome: RunOutcome::Completed,
            checked: 0,
            filtered: 0,
            applied: 0,
            deferred: 0,
            skipped: 0,
            retryable: 0,
            skip_reasons: BTreeMap::new(),
            pages_fetched: 0,
            watermark: None,
            failure: None,
            unlogged: Vec::new(),
            jobs: Vec::new(),
        }
    }

    /// Fails when the run stopped because the platform rejected the session.
    pub fn ensure_session_valid(&self) -> Result<(), RunError> {
        match self.outcome {
            RunOutcome::SessionInvalid => Err(RunError::SessionRejected(
                self.failure.clone().unwrap_or_default(),
            )),
            RunOutcome::Completed | RunOutcome::ListingInterrupted => Ok(()),
        }
    }

    fn record(&mut self, listing: &JobListing, outcome: JobOutcome) {
        self.checked += 1;
        match &outcome {
            JobOutcome::Applied => self.applied += 1,
            JobOutcome::Deferred { .. } => self.deferred += 1,
            JobOutcome::Skipped(SkipReason::Filtered) => self.filtered += 1,
            JobOutcome::Skipped(reason) => {
                self.skipped += 1;
                if reason.is_transient() {
                    self.retryable += 1;
                }
                *self.skip_reasons.entry(reason.label()).or_insert(0) += 1;
            }
        }
        self.jobs.push(JobReport {
            id: listing.id,
            title: listing.title.clone(),
            outcome,
        });
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("session credentials are marked invalid; refresh the cookies before running")]
    CredentialsInvalid,
    #[error("session rejected by the platform ({0}); refresh the cookies in the profile")]
    SessionRejected(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Per-run bookkeeping that never outlives [`AutoApplyService::run`].
struct RunContext {
    applied: HashSet<JobId>,
    seen: HashSet<JobId>,
    deferred: Vec<ListingRecord>,
    deferred_ids: HashSet<JobId>,
    unlogged: Vec<ApplicationEntry>,
    summary: RunSummary,
}

enum Step {
    Continue,
    Halt(SessionFailure),
}

/// Drives one pass: deferred replay, fresh candidates, then persistence.
pub struct AutoApplyService<St, L> {
    store: St,
    log: L,
    engine: DecisionEngine,
}

impl<St, L> AutoApplyService<St, L>
where
    St: StateStore,
    L: ApplicationLog,
{
    pub fn new(store: St, log: L, engine: DecisionEngine) -> Self {
        Self { store, log, engine }
    }

    pub fn store(&self) -> &St {
        &self.store
    }

    pub fn log(&self) -> &L {
        &self.log
    }

    pub fn run<S>(&self, session: &mut S, source: JobSource) -> Result<RunSummary, RunError>
    where
        S: PlatformSession + ?Sized,
    {
        let mut state = self.store.load_state()?;
        if !state.valid {
            return Err(RunError::CredentialsInvalid);
        }
        let previous = self.store.load_deferred()?;
        let mut ctx = RunContext {
            applied: self.log.applied_ids()?,
            seen: HashSet::new(),
            deferred: Vec::new(),
            deferred_ids: HashSet::new(),
            unlogged: Vec::new(),
            summary: RunSummary::new(),
        };
        ctx.summary.watermark = state.watermark;

        if let Err(err) = session.refresh_token() {
            warn!(error = %err, "bootstrap failed; no jobs evaluated");
            return self.halt(&*session, &mut state, ctx, &previous, err.to_string(), false);
        }

        info!(count = previous.len(), "replaying deferred jobs");
        for (index, record) in previous.iter().enumerate() {
            let Some(listing) = record.to_listing() else {
                warn!("dropping deferred record without a job id");
                continue;
            };
            if let Step::Halt(failure) = self.process(&*session, &listing, &mut ctx) {
                return self.halt(
                    &*session,
                    &mut state,
                    ctx,
                    &previous[index..],
                    failure.to_string(),
                    false,
                );
            }
        }
        state.cookies = session.cookies();
        self.checkpoint(&state, &mut ctx)?;

        match source {
            JobSource::Identifiers(ids) => {
                info!(count = ids.len(), "evaluating supplied job ids");
                for id in ids {
                    let listing = JobListing::placeholder(id, self.engine.now());
                    if let Step::Halt(failure) = self.process(&*session, &listing, &mut ctx) {
                        let message = failure.to_string();
                        return self.halt(&*session, &mut state, ctx, &[], message, false);
                    }
                }
            }
            JobSource::Listings { per_page } => {
                if let Some((message, session_invalid)) =
                    self.paginate(&*session, &state, per_page, &mut ctx)
                {
                    let interrupted = !session_invalid;
                    return self.halt(&*session, &mut state, ctx, &[], message, interrupted);
                }
            }
        }

        let run_start = self.engine.now();
        state.watermark = Some(state.watermark.map_or(run_start, |mark| mark.max(run_start)));
        state.valid = true;
        state.cookies = session.cookies();
        self.checkpoint(&state, &mut ctx)?;

        ctx.summary.watermark = state.watermark;
        ctx.summary.unlogged = ctx.unlogged.iter().map(|entry| entry.id).collect();
        info!(
            checked = ctx.summary.checked,
            applied = ctx.summary.applied,
            deferred = ctx.summary.deferred,
            "run completed"
        );
        Ok(ctx.summary)
    }

    /// Pages newest-first. Returns the stop message and whether the session
    /// was rejected when pagination ends abnormally.
    fn paginate<S>(
        &self,
        session: &S,
        state: &RunState,
        per_page: u32,
        ctx: &mut RunContext,
    ) -> Option<(String, bool)>
    where
        S: PlatformSession + ?Sized,
    {
        let mut page = 1;
        let mut fetched: u64 = 0;

        loop {
            let listing_page = match session.fetch_listing_page(page, per_page) {
                Ok(listing_page) => listing_page,
                Err(err @ SessionError::Status { .. }) => {
                    warn!(page, error = %err, "listing fetch rejected");
                    return Some((err.to_string(), true));
                }
                Err(err) => {
                    warn!(page, error = %err, "listing fetch interrupted");
                    return Some((err.to_string(), false));
                }
            };
            ctx.summary.pages_fetched += 1;

            let listings = listing_page.listings;
            if listings.is_empty() {
                info!(page, "empty listing page");
                return None;
            }
            fetched += listings.len() as u64;

            let newer = listings
                .iter()
                .take_while(|listing| state.is_newer(listing.created_at))
                .count();
            let watermark_reached = newer < listings.len();

            for listing in listings[..newer].iter().rev() {
                if !self.engine.admits(listing) {
                    self.report(listing, JobOutcome::Skipped(SkipReason::Filtered), ctx);
                    continue;
                }
                if let Step::Halt(failure) = self.process(session, listing, ctx) {
                    warn!(error = %failure, "halting run");
                    return Some((failure.to_string(), true));
                }
            }

            if watermark_reached {
                info!(page, "reached previously processed listings");
                return None;
            }
            if listing_page.total.is_some_and(|total| fetched >= total) {
                return None;
            }
            page += 1;
        }
    }

    fn process<S>(&self, session: &S, listing: &JobListing, ctx: &mut RunContext) -> Step
    where
        S: PlatformSession + ?Sized,
    {
        if ctx.applied.contains(&listing.id) {
            self.report(listing, JobOutcome::Skipped(SkipReason::AlreadyApplied), ctx);
            return Step::Continue;
        }
        if !ctx.seen.insert(listing.id) {
            self.report(listing, JobOutcome::Skipped(SkipReason::AlreadyEvaluated), ctx);
            return Step::Continue;
        }

        let evaluation = match self.engine.evaluate(session, listing) {
            Ok(evaluation) => evaluation,
            Err(failure) => return Step::Halt(failure),
        };

        match &evaluation.outcome {
            JobOutcome::Applied => {
                ctx.applied.insert(evaluation.listing.id);
                let entry = ApplicationEntry {
                    id: evaluation.listing.id,
                    title: evaluation.listing.title.clone(),
                    employer: evaluation.listing.employer.clone(),
                    applied_at: self.engine.now(),
                };
                if let Err(err) = self.log.record(&entry) {
                    warn!(job = %entry.id, error = %err, "application log write failed");
                    ctx.unlogged.push(entry);
                }
            }
            JobOutcome::Deferred { .. } => {
                // Stored as received, never detail-enriched.
                if ctx.deferred_ids.insert(listing.id) {
                    ctx.deferred.push(ListingRecord::from(listing));
                }
            }
            JobOutcome::Skipped(_) => {}
        }

        self.report(&evaluation.listing, evaluation.outcome, ctx);
        Step::Continue
    }

    fn report(&self, listing: &JobListing, outcome: JobOutcome, ctx: &mut RunContext) {
        info!(
            job = %listing.id,
            employer = %listing.employer,
            outcome = outcome.label(),
            "{}: {}",
            listing.title,
            outcome.summary()
        );
        ctx.summary.record(listing, outcome);
    }

    /// Persists what the run collected and ends it early. The watermark is
    /// never advanced here; jobs from `unevaluated` are kept for the next run.
    fn halt<S>(
        &self,
        session: &S,
        state: &mut RunState,
        mut ctx: RunContext,
        unevaluated: &[ListingRecord],
        message: String,
        interrupted: bool,
    ) -> Result<RunSummary, RunError>
    where
        S: PlatformSession + ?Sized,
    {
        for record in unevaluated {
            let Some(id) = record.id() else {
                continue;
            };
            if ctx.deferred_ids.insert(id) {
                ctx.deferred.push(record.clone());
            }
        }

        state.valid = interrupted;
        state.cookies = session.cookies();
        self.checkpoint(state, &mut ctx)?;

        ctx.summary.outcome = if interrupted {
            RunOutcome::ListingInterrupted
        } else {
            RunOutcome::SessionInvalid
        };
        ctx.summary.watermark = state.watermark;
        ctx.summary.failure = Some(message);
        ctx.summary.unlogged = ctx.unlogged.iter().map(|entry| entry.id).collect();
        warn!(
            outcome = ?ctx.summary.outcome,
            kept = ctx.deferred.len(),
            "run stopped early"
        );
        Ok(ctx.summary)
    }

    /// Retries pending log lines, then writes the deferred set and the state.
    fn checkpoint(&self, state: &RunState, ctx: &mut RunContext) -> Result<(), RunError> {
        ctx.unlogged.retain(|entry| match self.log.record(entry) {
            Ok(()) => false,
            Err(err) => {
                warn!(job = %entry.id, error = %err, "application still unlogged");
                true
            }
        });
        self.store.save_deferred(&ctx.deferred)?;
        self.store.save_state(state)?;
        Ok(())
    }
}
