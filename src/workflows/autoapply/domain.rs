use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::timestamps::{format_timestamp, parse_timestamp};

/// Platform-unique posting identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a document the user already uploaded to the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(pub u64);

/// Summary record of a posting as returned by a paged search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobListing {
    pub id: JobId,
    pub title: String,
    pub employer: String,
    pub posting_type: String,
    pub created_at: Option<NaiveDateTime>,
    pub apply_start: Option<NaiveDateTime>,
    /// The record this listing was decoded from, when it came from one.
    pub source: Option<ListingRecord>,
}

impl JobListing {
    /// Listing for an identifier supplied from outside the paged search.
    pub fn placeholder(id: JobId, now: NaiveDateTime) -> Self {
        Self {
            id,
            title: placeholder_title(id),
            employer: UNKNOWN_EMPLOYER.to_string(),
            posting_type: DEFAULT_POSTING_TYPE.to_string(),
            created_at: Some(now),
            apply_start: None,
            source: None,
        }
    }

    /// True when the application window opens strictly after `now`.
    pub fn opens_after(&self, now: NaiveDateTime) -> bool {
        self.apply_start.map(|start| start > now).unwrap_or(false)
    }
}

pub(crate) fn placeholder_title(id: JobId) -> String {
    format!("Job ID {id}")
}

pub(crate) const UNKNOWN_EMPLOYER: &str = "Unknown";
pub(crate) const DEFAULT_POSTING_TYPE: &str = "Job";

/// Raw listing fields, in the shape of the REST search payload.
///
/// Deferred jobs are persisted in this shape so a later run can rebuild the
/// listing exactly as it was first seen. Fields without a typed counterpart
/// are carried in `extra` and written back unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ListingRecord {
    #[serde(default)]
    pub job_id: Option<u64>,
    #[serde(default)]
    pub job_name: Option<String>,
    #[serde(default)]
    pub apply_start: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employer_name: Option<String>,
    #[serde(default)]
    pub job: Option<ListingJobRecord>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ListingJobRecord {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub employer_name: Option<String>,
    #[serde(default, rename = "type")]
    pub posting_type: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ListingRecord {
    pub fn id(&self) -> Option<JobId> {
        self.job_id
            .or_else(|| self.job.as_ref().and_then(|job| job.id))
            .map(JobId)
    }

    /// Builds the domain listing, or `None` when the record carries no id.
    pub fn to_listing(&self) -> Option<JobListing> {
        let nested = self.job.as_ref();
        let id = self.id()?;

        let employer = nested
            .and_then(|job| job.employer_name.clone())
            .or_else(|| self.employer_name.clone())
            .unwrap_or_else(|| UNKNOWN_EMPLOYER.to_string());
        let posting_type = nested
            .and_then(|job| job.posting_type.clone())
            .unwrap_or_else(|| DEFAULT_POSTING_TYPE.to_string());
        let created_at = self
            .created_at
            .as_deref()
            .or(self.updated_at.as_deref())
            .and_then(parse_timestamp);

        Some(JobListing {
            id,
            title: self.job_name.clone().unwrap_or_default(),
            employer,
            posting_type,
            created_at,
            apply_start: self.apply_start.as_deref().and_then(parse_timestamp),
            source: Some(self.clone()),
        })
    }
}

/// Returns the record the listing was decoded from, or one rebuilt from its
/// fields when it has none.
impl From<&JobListing> for ListingRecord {
    fn from(listing: &JobListing) -> Self {
        if let Some(source) = &listing.source {
            return source.clone();
        }
        Self {
            job_id: Some(listing.id.0),
            job_name: Some(listing.title.clone()),
            apply_start: listing.apply_start.map(format_timestamp),
            created_at: listing.created_at.map(format_timestamp),
            updated_at: None,
            employer_name: None,
            job: Some(ListingJobRecord {
                id: Some(listing.id.0),
                employer_name: Some(listing.employer.clone()),
                posting_type: Some(listing.posting_type.clone()),
                extra: Map::new(),
            }),
            extra: Map::new(),
        }
    }
}

/// How a posting accepts applications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyMethod {
    InPlatform,
    External,
    Unknown(String),
}

impl ApplyMethod {
    pub fn from_apply_type(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("handshake") => Self::InPlatform,
            Some("external") => Self::External,
            Some(other) => Self::Unknown(other.to_string()),
            None => Self::Unknown(String::new()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::InPlatform => "handshake",
            Self::External => "external",
            Self::Unknown(raw) if raw.is_empty() => "unknown",
            Self::Unknown(raw) => raw,
        }
    }
}

/// Document categories the platform can require on an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentCategory {
    Resume,
    CoverLetter,
    Transcript,
    Other,
}

impl DocumentCategory {
    pub const fn type_id(self) -> u32 {
        match self {
            Self::Resume => 1,
            Self::CoverLetter => 2,
            Self::Transcript => 3,
            Self::Other => 5,
        }
    }

    pub const fn from_type_id(type_id: u32) -> Option<Self> {
        match type_id {
            1 => Some(Self::Resume),
            2 => Some(Self::CoverLetter),
            3 => Some(Self::Transcript),
            5 => Some(Self::Other),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Resume => "resume",
            Self::CoverLetter => "cover letter",
            Self::Transcript => "transcript",
            Self::Other => "other",
        }
    }
}

/// A document requirement as declared by a posting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentRequirement {
    Category(DocumentCategory),
    Unrecognized(u32),
}

impl From<u32> for DocumentRequirement {
    fn from(type_id: u32) -> Self {
        match DocumentCategory::from_type_id(type_id) {
            Some(category) => Self::Category(category),
            None => Self::Unrecognized(type_id),
        }
    }
}

/// Listing plus the fields only the detail endpoint exposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobDetail {
    pub listing: JobListing,
    pub method: ApplyMethod,
    pub required_documents: Vec<DocumentRequirement>,
}

/// Category to uploaded-document mapping used for every application in a run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DocumentSet {
    documents: BTreeMap<DocumentCategory, DocumentId>,
}

impl DocumentSet {
    pub fn new(
        resume: DocumentId,
        cover_letter: DocumentId,
        transcript: DocumentId,
        other: Option<DocumentId>,
    ) -> Self {
        let mut documents = BTreeMap::new();
        documents.insert(DocumentCategory::Resume, resume);
        documents.insert(DocumentCategory::CoverLetter, cover_letter);
        documents.insert(DocumentCategory::Transcript, transcript);
        if let Some(other) = other {
            documents.insert(DocumentCategory::Other, other);
        }
        Self { documents }
    }

    pub fn get(&self, category: DocumentCategory) -> Option<DocumentId> {
        self.documents.get(&category).copied()
    }
}

/// One line of the application log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationEntry {
    pub id: JobId,
    pub title: String,
    pub employer: String,
    pub applied_at: NaiveDateTime,
}

/// Body sent to the submission endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationRequest {
    pub job_id: JobId,
    pub applicable_type: String,
    pub document_ids: Vec<DocumentId>,
}

/// Durable state carried from one run to the next.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RunState {
    /// Creation time of the newest listing already processed.
    pub watermark: Option<NaiveDateTime>,
    pub valid: bool,
    pub cookies: BTreeMap<String, String>,
}

impl RunState {
    /// True when `created_at` is newer than the watermark. Listings without a
    /// creation time are always treated as new.
    pub fn is_newer(&self, created_at: Option<NaiveDateTime>) -> bool {
        match (self.watermark, created_at) {
            (Some(mark), Some(created)) => created > mark,
            _ => true,
        }
    }
}
