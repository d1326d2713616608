//! The persisted user profile (`conf.json`).
//!
//! The profile carries both user-supplied settings (documents, keywords,
//! search URL) and the [`RunState`] the tool rewrites after every run. Keys
//! this crate does not understand are kept and written back untouched.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::Url;

use super::domain::{DocumentId, DocumentSet, RunState};
use super::evaluation::{EvaluationConfig, KeywordFilter, SubmissionPolicy};
use super::session::ListingSource;
use super::timestamps::{format_timestamp, parse_timestamp};

pub const DEFAULT_PER_PAGE: u32 = 25;
const NO_PRIOR_RUN: &str = "0";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileDocument {
    #[serde(default)]
    pub valid: bool,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub resume: Option<DocumentId>,
    #[serde(default)]
    pub cover: Option<DocumentId>,
    #[serde(default)]
    pub transcript: Option<DocumentId>,
    #[serde(default)]
    pub other: Option<DocumentId>,
    #[serde(default = "no_prior_run")]
    pub date: String,
    #[serde(default)]
    pub cookies: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub job_keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skip_keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listing_source: Option<ListingSource>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub submission_skip_statuses: Vec<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn no_prior_run() -> String {
    NO_PRIOR_RUN.to_string()
}

/// Startup problems that keep a run from beginning.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum InputError {
    #[error("profile is marked invalid; refresh the session cookies and set \"valid\" to true")]
    MarkedInvalid,
    #[error("profile has no {0} document id")]
    MissingDocument(&'static str),
    #[error("profile has no session cookies")]
    MissingCookies,
    #[error("profile watermark {0:?} is not a recognised timestamp")]
    InvalidWatermark(String),
    #[error("per_page must be at least 1")]
    InvalidPageSize,
}

/// Everything a run needs from a validated profile.
#[derive(Debug, Clone, PartialEq)]
pub struct RunProfile {
    pub documents: DocumentSet,
    pub state: RunState,
    pub evaluation: EvaluationConfig,
    pub listing_source: ListingSource,
    pub per_page: u32,
    pub search_url: Option<String>,
}

impl ProfileDocument {
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        let mut profile: Self = serde_json::from_str(raw)?;
        profile.url = sanitize_search_url(&profile.url);
        Ok(profile)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn run_state(&self) -> Result<RunState, InputError> {
        Ok(RunState {
            watermark: parse_watermark(&self.date)?,
            valid: self.valid,
            cookies: self.cookies.clone(),
        })
    }

    /// Writes `state` back into the profile. An absent watermark is stored
    /// as the no-prior-run sentinel.
    pub fn apply_state(&mut self, state: &RunState) {
        self.valid = state.valid;
        self.cookies = state.cookies.clone();
        self.date = state
            .watermark
            .map(format_timestamp)
            .unwrap_or_else(no_prior_run);
    }

    pub fn validate(&self) -> Result<RunProfile, InputError> {
        if !self.valid {
            return Err(InputError::MarkedInvalid);
        }
        let resume = self.resume.ok_or(InputError::MissingDocument("resume"))?;
        let cover = self.cover.ok_or(InputError::MissingDocument("cover letter"))?;
        let transcript = self
            .transcript
            .ok_or(InputError::MissingDocument("transcript"))?;
        if self.cookies.is_empty() {
            return Err(InputError::MissingCookies);
        }
        let per_page = self.per_page.unwrap_or(DEFAULT_PER_PAGE);
        if per_page == 0 {
            return Err(InputError::InvalidPageSize);
        }

        Ok(RunProfile {
            documents: DocumentSet::new(resume, cover, transcript, self.other),
            state: self.run_state()?,
            evaluation: EvaluationConfig {
                keywords: KeywordFilter::new(&self.job_keywords, &self.skip_keywords),
                submission: SubmissionPolicy::with_skip_statuses(
                    self.submission_skip_statuses.iter().copied(),
                ),
            },
            listing_source: self.listing_source.unwrap_or_default(),
            per_page,
            search_url: (!self.url.trim().is_empty()).then(|| self.url.clone()),
        })
    }
}

fn parse_watermark(raw: &str) -> Result<Option<chrono::NaiveDateTime>, InputError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == NO_PRIOR_RUN {
        return Ok(None);
    }
    parse_timestamp(trimmed)
        .map(Some)
        .ok_or_else(|| InputError::InvalidWatermark(trimmed.to_string()))
}

/// Drops any `page` query parameter so saved search URLs always start at the
/// first page. Values that do not parse as URLs are returned unchanged.
pub fn sanitize_search_url(raw: &str) -> String {
    let Ok(mut url) = Url::parse(raw.trim()) else {
        return raw.to_string();
    };
    if !url.query_pairs().any(|(key, _)| key == "page") {
        return url.to_string();
    }

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != "page")
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(kept);
    }
    url.to_string()
}
