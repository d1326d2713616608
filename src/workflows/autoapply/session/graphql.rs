use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use url::Url;

use super::{ListingPage, SessionError};
use crate::workflows::autoapply::domain::{
    JobId, JobListing, DEFAULT_POSTING_TYPE, UNKNOWN_EMPLOYER,
};
use crate::workflows::autoapply::timestamps::parse_timestamp;

const JOB_SEARCH_QUERY: &str = r#"query JobSearchQuery($first: Int, $after: String, $input: JobSearchInput) {
  jobSearch(first: $first, after: $after, input: $input) {
    totalCount
    searchId
    edges {
      node {
        id
        job {
          id
          title
          expirationDate
          applyStart
          createdAt
          employer { id name }
          jobType { id name behaviorIdentifier }
          employmentType { id name }
        }
      }
    }
  }
}"#;

/// Translates the query string of a saved search URL into the GraphQL
/// `JobSearchInput.filter` object. Unknown parameters are ignored.
pub(crate) fn search_filters(search_url: &str) -> Map<String, Value> {
    let mut filter = Map::new();
    let Ok(parsed) = Url::parse(search_url) else {
        return filter;
    };

    let mut params: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (key, value) in parsed.query_pairs() {
        params
            .entry(key.into_owned())
            .or_default()
            .push(value.into_owned());
    }

    let passthrough = [
        ("jobType", "jobTypeIds"),
        ("majors", "majorIds"),
        ("employmentTypes", "employmentTypeIds"),
        ("jobRoleGroups", "jobRoleGroupIds"),
        ("pay[salaryType]", "salaryTypeIds"),
    ];
    for (param, field) in passthrough {
        if let Some(values) = params.get(param).filter(|values| !values.is_empty()) {
            filter.insert(field.to_string(), json!(values));
        }
    }

    if let Some(values) = params.get("workAuthorization") {
        let mapped: Vec<&str> = values
            .iter()
            .filter_map(|value| work_authorization_enum(value))
            .collect();
        if !mapped.is_empty() {
            filter.insert("workAuthorizationRequirements".to_string(), json!(mapped));
        }
    }

    if let Some(values) = params.get("qualifications").filter(|values| !values.is_empty()) {
        let upper: Vec<String> = values.iter().map(|value| value.to_uppercase()).collect();
        filter.insert("qualificationsRequirements".to_string(), json!(upper));
    }

    filter
}

fn work_authorization_enum(value: &str) -> Option<&'static str> {
    match value {
        "openToUSVisaSponsorship" => Some("OPEN_TO_US_VISA_SPONSORSHIP"),
        "openToOptionalPracticalTraining" => Some("OPEN_TO_OPTIONAL_PRACTICAL_TRAINING"),
        "openToCptCandidates" => Some("OPEN_TO_CPT_CANDIDATES"),
        _ => None,
    }
}

/// Cursor pointing just before the first record of `page` (1-based).
pub(crate) fn cursor_for_page(page: u32, per_page: u32) -> String {
    let offset = u64::from(page.saturating_sub(1)) * u64::from(per_page);
    STANDARD.encode(offset.to_string())
}

pub(crate) fn search_payload(page: u32, per_page: u32, filter: &Map<String, Value>) -> Value {
    json!({
        "operationName": "JobSearchQuery",
        "variables": {
            "first": per_page,
            "after": cursor_for_page(page, per_page),
            "input": {
                "filter": filter,
                "sort": { "direction": "DESC", "field": "POSTED_DATE" }
            }
        },
        "query": JOB_SEARCH_QUERY,
    })
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Option<SearchData>,
    #[serde(default)]
    errors: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchData {
    #[serde(default)]
    job_search: Option<JobSearch>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobSearch {
    #[serde(default)]
    total_count: Option<u64>,
    #[serde(default)]
    edges: Vec<Edge>,
}

#[derive(Debug, Deserialize)]
struct Edge {
    #[serde(default)]
    node: Option<Node>,
}

#[derive(Debug, Deserialize)]
struct Node {
    #[serde(default)]
    job: Option<SearchJob>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchJob {
    id: Value,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    apply_start: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    employer: Option<Named>,
    #[serde(default)]
    job_type: Option<Named>,
}

#[derive(Debug, Deserialize)]
struct Named {
    #[serde(default)]
    name: Option<String>,
}

pub(crate) fn parse_search(body: &str) -> Result<ListingPage, SessionError> {
    let response: SearchResponse =
        serde_json::from_str(body).map_err(|err| SessionError::Decode(err.to_string()))?;

    if let Some(errors) = response.errors.filter(|errors| !errors.is_null()) {
        return Err(SessionError::Decode(format!("graphql errors: {errors}")));
    }

    let search = response
        .data
        .and_then(|data| data.job_search)
        .ok_or_else(|| SessionError::Decode("missing jobSearch".to_string()))?;

    let listings = search
        .edges
        .into_iter()
        .filter_map(|edge| edge.node.and_then(|node| node.job))
        .filter_map(|job| {
            let id = graphql_id(&job.id)?;
            Some(JobListing {
                id: JobId(id),
                title: job.title.unwrap_or_default(),
                employer: job
                    .employer
                    .and_then(|employer| employer.name)
                    .unwrap_or_else(|| UNKNOWN_EMPLOYER.to_string()),
                posting_type: job
                    .job_type
                    .and_then(|kind| kind.name)
                    .unwrap_or_else(|| DEFAULT_POSTING_TYPE.to_string()),
                created_at: job.created_at.as_deref().and_then(parse_timestamp),
                apply_start: job.apply_start.as_deref().and_then(parse_timestamp),
                source: None,
            })
        })
        .collect();

    Ok(ListingPage {
        listings,
        total: search.total_count,
    })
}

/// GraphQL ids arrive as strings; older payloads use numbers.
fn graphql_id(value: &Value) -> Option<u64> {
    match value {
        Value::Number(number) => number.as_u64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
    .filter(|id| *id > 0)
}
