//! Authenticated access to the recruiting platform.
//!
//! [`PlatformSession`] is the seam the decision engine and run orchestrator
//! depend on; [`HandshakeClient`] is the cookie-jar backed implementation.

mod client;
pub(crate) mod graphql;
mod profiles;
mod token;
pub(crate) mod wire;

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::domain::{
    placeholder_title, ApplicationRequest, ApplyMethod, DocumentRequirement, JobDetail, JobId,
    JobListing, DEFAULT_POSTING_TYPE, UNKNOWN_EMPLOYER,
};

pub use client::{ClientSettings, HandshakeClient};
pub use token::{extract_csrf_token, CSRF_TOKEN_LEN};

/// Where paged listings come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingSource {
    #[default]
    Rest,
    Graphql,
}

/// One page of search results, newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingPage {
    pub listings: Vec<JobListing>,
    pub total: Option<u64>,
}

/// Fields only the detail endpoint reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailPayload {
    pub method: ApplyMethod,
    pub required_documents: Vec<DocumentRequirement>,
    pub title: Option<String>,
    pub employer: Option<String>,
    pub posting_type: Option<String>,
    pub apply_start: Option<NaiveDateTime>,
}

impl DetailPayload {
    /// Combines the payload with the listing it was fetched for. Descriptive
    /// detail values only fill fields the listing left empty or as
    /// placeholders; a reported apply-start always replaces the listing's.
    pub fn into_detail(self, mut listing: JobListing) -> JobDetail {
        if let Some(title) = self.title.filter(|title| !title.trim().is_empty()) {
            if listing.title.trim().is_empty() || listing.title == placeholder_title(listing.id) {
                listing.title = title;
            }
        }
        if let Some(employer) = self.employer.filter(|name| !name.trim().is_empty()) {
            if listing.employer == UNKNOWN_EMPLOYER {
                listing.employer = employer;
            }
        }
        if let Some(posting_type) = self.posting_type.filter(|kind| !kind.trim().is_empty()) {
            if listing.posting_type == DEFAULT_POSTING_TYPE {
                listing.posting_type = posting_type;
            }
        }
        if self.apply_start.is_some() {
            listing.apply_start = self.apply_start;
        }

        JobDetail {
            listing,
            method: self.method,
            required_documents: self.required_documents,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("platform responded with status {status}")]
    Status { status: u16, body: String },
    #[error("anti-forgery token missing from bootstrap page")]
    MissingToken,
    #[error("request failed: {0}")]
    Transport(String),
    #[error("unexpected response payload: {0}")]
    Decode(String),
    #[error("http runtime unavailable: {0}")]
    Runtime(String),
}

impl SessionError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Authenticated platform operations used by a run.
pub trait PlatformSession {
    /// Fetches and caches the anti-forgery token for the rest of the run.
    fn refresh_token(&mut self) -> Result<(), SessionError>;

    fn fetch_listing_page(&self, page: u32, per_page: u32) -> Result<ListingPage, SessionError>;

    fn fetch_job_detail(&self, id: JobId) -> Result<DetailPayload, SessionError>;

    fn submit_application(&self, request: &ApplicationRequest) -> Result<(), SessionError>;

    /// Current cookie jar contents, for persisting between runs.
    fn cookies(&self) -> BTreeMap<String, String>;
}
