use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

use chrono::{NaiveDate, NaiveDateTime};

use crate::workflows::autoapply::domain::{
    ApplicationEntry, ApplicationRequest, ApplyMethod, DocumentId, DocumentRequirement,
    DocumentSet, JobId, JobListing, ListingRecord, RunState,
};
use crate::workflows::autoapply::evaluation::{DecisionEngine, EvaluationConfig};
use crate::workflows::autoapply::repository::{ApplicationLog, RepositoryError, StateStore};
use crate::workflows::autoapply::service::AutoApplyService;
use crate::workflows::autoapply::session::{
    DetailPayload, ListingPage, PlatformSession, SessionError,
};

pub(super) fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .expect("valid date")
        .and_hms_opt(h, 0, 0)
        .expect("valid time")
}

pub(super) fn now() -> NaiveDateTime {
    at(2024, 3, 1, 12)
}

pub(super) fn documents() -> DocumentSet {
    DocumentSet::new(DocumentId(11), DocumentId(12), DocumentId(13), None)
}

pub(super) fn listing(id: u64, title: &str, created_at: NaiveDateTime) -> JobListing {
    JobListing {
        id: JobId(id),
        title: title.to_string(),
        employer: "Acme".to_string(),
        posting_type: "Job".to_string(),
        created_at: Some(created_at),
        apply_start: None,
        source: None,
    }
}

pub(super) fn page(listings: Vec<JobListing>) -> PageScript {
    PageScript::Page(ListingPage {
        listings,
        total: None,
    })
}

pub(super) fn open_detail(document_types: &[u32]) -> DetailScript {
    DetailScript::Payload(DetailPayload {
        method: ApplyMethod::InPlatform,
        required_documents: document_types
            .iter()
            .map(|id| DocumentRequirement::from(*id))
            .collect(),
        title: None,
        employer: None,
        posting_type: None,
        apply_start: None,
    })
}

pub(super) fn opening_detail(opens_at: NaiveDateTime) -> DetailScript {
    let DetailScript::Payload(mut payload) = open_detail(&[1]) else {
        unreachable!("open_detail always builds a payload");
    };
    payload.apply_start = Some(opens_at);
    DetailScript::Payload(payload)
}

pub(super) fn external_detail() -> DetailScript {
    DetailScript::Payload(DetailPayload {
        method: ApplyMethod::External,
        required_documents: Vec::new(),
        title: None,
        employer: None,
        posting_type: None,
        apply_start: None,
    })
}

pub(super) enum PageScript {
    Page(ListingPage),
    Status(u16),
    Transport,
}

pub(super) enum DetailScript {
    Payload(DetailPayload),
    Status(u16),
}

/// Scripted platform. Unscripted pages are empty, unscripted details 404 and
/// unscripted submissions succeed.
#[derive(Default)]
pub(super) struct FakeSession {
    pub(super) token_status: Option<u16>,
    pub(super) pages: BTreeMap<u32, PageScript>,
    pub(super) details: HashMap<JobId, DetailScript>,
    pub(super) submit_status: HashMap<JobId, u16>,
    pub(super) page_calls: RefCell<Vec<u32>>,
    pub(super) detail_calls: RefCell<Vec<JobId>>,
    pub(super) submissions: RefCell<Vec<ApplicationRequest>>,
    pub(super) token_refreshed: bool,
}

impl FakeSession {
    pub(super) fn with_page(mut self, number: u32, script: PageScript) -> Self {
        self.pages.insert(number, script);
        self
    }

    pub(super) fn with_detail(mut self, id: u64, script: DetailScript) -> Self {
        self.details.insert(JobId(id), script);
        self
    }

    pub(super) fn rejecting_submission(mut self, id: u64, status: u16) -> Self {
        self.submit_status.insert(JobId(id), status);
        self
    }

    pub(super) fn detail_ids(&self) -> Vec<u64> {
        self.detail_calls.borrow().iter().map(|id| id.0).collect()
    }

    pub(super) fn submitted_ids(&self) -> Vec<u64> {
        self.submissions
            .borrow()
            .iter()
            .map(|request| request.job_id.0)
            .collect()
    }
}

fn status(status: u16) -> SessionError {
    SessionError::Status {
        status,
        body: String::new(),
    }
}

impl PlatformSession for FakeSession {
    fn refresh_token(&mut self) -> Result<(), SessionError> {
        match self.token_status {
            Some(code) => Err(status(code)),
            None => {
                self.token_refreshed = true;
                Ok(())
            }
        }
    }

    fn fetch_listing_page(&self, page: u32, _per_page: u32) -> Result<ListingPage, SessionError> {
        self.page_calls.borrow_mut().push(page);
        match self.pages.get(&page) {
            Some(PageScript::Page(listing_page)) => Ok(listing_page.clone()),
            Some(PageScript::Status(code)) => Err(status(*code)),
            Some(PageScript::Transport) => Err(SessionError::Transport("reset".to_string())),
            None => Ok(ListingPage::default()),
        }
    }

    fn fetch_job_detail(&self, id: JobId) -> Result<DetailPayload, SessionError> {
        self.detail_calls.borrow_mut().push(id);
        match self.details.get(&id) {
            Some(DetailScript::Payload(payload)) => Ok(payload.clone()),
            Some(DetailScript::Status(code)) => Err(status(*code)),
            None => Err(status(404)),
        }
    }

    fn submit_application(&self, request: &ApplicationRequest) -> Result<(), SessionError> {
        self.submissions.borrow_mut().push(request.clone());
        match self.submit_status.get(&request.job_id) {
            Some(code) => Err(status(*code)),
            None => Ok(()),
        }
    }

    fn cookies(&self) -> BTreeMap<String, String> {
        let mut cookies = BTreeMap::new();
        cookies.insert("_trajectory_session".to_string(), "refreshed".to_string());
        cookies
    }
}

pub(super) struct MemoryStore {
    pub(super) state: Mutex<RunState>,
    pub(super) deferred: Mutex<Vec<ListingRecord>>,
    pub(super) saves: Mutex<usize>,
}

impl MemoryStore {
    pub(super) fn new(watermark: Option<NaiveDateTime>, deferred: Vec<ListingRecord>) -> Self {
        let mut cookies = BTreeMap::new();
        cookies.insert("_trajectory_session".to_string(), "original".to_string());
        Self {
            state: Mutex::new(RunState {
                watermark,
                valid: true,
                cookies,
            }),
            deferred: Mutex::new(deferred),
            saves: Mutex::new(0),
        }
    }

    pub(super) fn state(&self) -> RunState {
        self.state.lock().expect("state mutex poisoned").clone()
    }

    pub(super) fn deferred_ids(&self) -> Vec<u64> {
        self.deferred
            .lock()
            .expect("deferred mutex poisoned")
            .iter()
            .filter_map(|record| record.id().map(|id| id.0))
            .collect()
    }

    pub(super) fn deferred_records(&self) -> Vec<ListingRecord> {
        self.deferred.lock().expect("deferred mutex poisoned").clone()
    }
}

impl StateStore for MemoryStore {
    fn load_state(&self) -> Result<RunState, RepositoryError> {
        Ok(self.state())
    }

    fn save_state(&self, state: &RunState) -> Result<(), RepositoryError> {
        *self.state.lock().expect("state mutex poisoned") = state.clone();
        *self.saves.lock().expect("saves mutex poisoned") += 1;
        Ok(())
    }

    fn load_deferred(&self) -> Result<Vec<ListingRecord>, RepositoryError> {
        Ok(self.deferred_records())
    }

    fn save_deferred(&self, deferred: &[ListingRecord]) -> Result<(), RepositoryError> {
        *self.deferred.lock().expect("deferred mutex poisoned") = deferred.to_vec();
        Ok(())
    }
}

#[derive(Default)]
pub(super) struct MemoryLog {
    pub(super) preloaded: HashSet<JobId>,
    pub(super) entries: Mutex<Vec<ApplicationEntry>>,
}

impl MemoryLog {
    pub(super) fn with_applied(ids: &[u64]) -> Self {
        Self {
            preloaded: ids.iter().copied().map(JobId).collect(),
            entries: Mutex::new(Vec::new()),
        }
    }

    pub(super) fn entries(&self) -> Vec<ApplicationEntry> {
        self.entries.lock().expect("log mutex poisoned").clone()
    }
}

impl ApplicationLog for MemoryLog {
    fn applied_ids(&self) -> Result<HashSet<JobId>, RepositoryError> {
        let mut ids = self.preloaded.clone();
        ids.extend(self.entries().iter().map(|entry| entry.id));
        Ok(ids)
    }

    fn record(&self, entry: &ApplicationEntry) -> Result<(), RepositoryError> {
        self.entries
            .lock()
            .expect("log mutex poisoned")
            .push(entry.clone());
        Ok(())
    }
}

/// Log whose first `failures` writes fail.
pub(super) struct FlakyLog {
    failures: Mutex<usize>,
    entries: Mutex<Vec<ApplicationEntry>>,
}

impl FlakyLog {
    pub(super) fn failing(failures: usize) -> Self {
        Self {
            failures: Mutex::new(failures),
            entries: Mutex::new(Vec::new()),
        }
    }

    pub(super) fn entry_ids(&self) -> Vec<u64> {
        self.entries
            .lock()
            .expect("log mutex poisoned")
            .iter()
            .map(|entry| entry.id.0)
            .collect()
    }
}

impl ApplicationLog for FlakyLog {
    fn applied_ids(&self) -> Result<HashSet<JobId>, RepositoryError> {
        Ok(self.entry_ids().into_iter().map(JobId).collect())
    }

    fn record(&self, entry: &ApplicationEntry) -> Result<(), RepositoryError> {
        let mut failures = self.failures.lock().expect("failures mutex poisoned");
        if *failures > 0 {
            *failures -= 1;
            return Err(RepositoryError::Io {
                path: "jobs.csv".to_string(),
                source: std::io::Error::other("disk full"),
            });
        }
        self.entries
            .lock()
            .expect("log mutex poisoned")
            .push(entry.clone());
        Ok(())
    }
}

pub(super) fn engine(config: EvaluationConfig) -> DecisionEngine {
    DecisionEngine::new(config, documents(), now())
}

pub(super) fn build_service(
    store: MemoryStore,
    log: MemoryLog,
    config: EvaluationConfig,
) -> AutoApplyService<MemoryStore, MemoryLog> {
    AutoApplyService::new(store, log, engine(config))
}
