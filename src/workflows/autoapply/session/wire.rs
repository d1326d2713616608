use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{DetailPayload, ListingPage, SessionError};
use crate::workflows::autoapply::domain::{
    ApplicationRequest, ApplyMethod, DocumentRequirement, ListingRecord,
};
use crate::workflows::autoapply::timestamps::parse_timestamp;

#[derive(Debug, Deserialize)]
struct PostingsResponse {
    #[serde(default)]
    results: Vec<ListingRecord>,
    #[serde(default)]
    total: Option<u64>,
}

pub(crate) fn parse_postings(body: &str) -> Result<ListingPage, SessionError> {
    let response: PostingsResponse =
        serde_json::from_str(body).map_err(|err| SessionError::Decode(err.to_string()))?;

    Ok(ListingPage {
        listings: response
            .results
            .iter()
            .filter_map(ListingRecord::to_listing)
            .collect(),
        total: response.total,
    })
}

#[derive(Debug, Deserialize)]
struct DetailResponse {
    #[serde(default)]
    job: Option<DetailJob>,
}

#[derive(Debug, Default, Deserialize)]
struct DetailJob {
    #[serde(default)]
    job_apply_setting: Option<ApplySetting>,
    #[serde(default)]
    required_job_document_types: Vec<RequiredDocumentType>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    employer_name: Option<String>,
    #[serde(default)]
    employer: Option<NamedRef>,
    #[serde(default)]
    job_type: Option<NamedRef>,
    #[serde(default)]
    apply_start: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApplySetting {
    #[serde(default)]
    apply_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RequiredDocumentType {
    document_type_id: u32,
}

#[derive(Debug, Deserialize)]
struct NamedRef {
    #[serde(default)]
    name: Option<String>,
}

/// A payload without a `job` object reads as an unknown apply method with no
/// document requirements.
pub(crate) fn parse_detail(body: &str) -> Result<DetailPayload, SessionError> {
    let response: DetailResponse =
        serde_json::from_str(body).map_err(|err| SessionError::Decode(err.to_string()))?;
    let job = response.job.unwrap_or_default();

    let apply_type = job
        .job_apply_setting
        .as_ref()
        .and_then(|setting| setting.apply_type.as_deref());

    Ok(DetailPayload {
        method: ApplyMethod::from_apply_type(apply_type),
        required_documents: job
            .required_job_document_types
            .iter()
            .map(|doc| DocumentRequirement::from(doc.document_type_id))
            .collect(),
        title: job.title,
        employer: job
            .employer_name
            .or_else(|| job.employer.and_then(|employer| employer.name)),
        posting_type: job.job_type.and_then(|kind| kind.name),
        apply_start: job.apply_start.as_deref().and_then(parse_timestamp),
    })
}

#[derive(Debug, Serialize)]
struct ApplicationBody<'a> {
    applicable_id: u64,
    applicable_type: &'a str,
    document_ids: Vec<u64>,
}

pub(crate) fn application_body(request: &ApplicationRequest) -> Value {
    let application = ApplicationBody {
        applicable_id: request.job_id.0,
        applicable_type: &request.applicable_type,
        document_ids: request.document_ids.iter().map(|id| id.0).collect(),
    };
    json!({
        "application": application,
        "work_authorization_status": Value::Null,
    })
}
