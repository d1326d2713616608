use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::HeaderMap;
use reqwest::{Client, RequestBuilder};
use serde_json::{Map, Value};
use tokio::runtime::{Builder, Runtime};
use tracing::debug;
use url::Url;

use super::profiles::{ProfileContext, RequestProfile};
use super::token::extract_csrf_token;
use super::{
    graphql, wire, DetailPayload, ListingPage, ListingSource, PlatformSession, SessionError,
};
use crate::workflows::autoapply::domain::{ApplicationRequest, JobId};

const ERROR_BODY_PREVIEW: usize = 200;

/// Connection settings for [`HandshakeClient`].
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub base_url: String,
    pub user_agent: String,
    pub timeout: Duration,
    pub listing_source: ListingSource,
    /// Saved search URL; its query string becomes the GraphQL search filter.
    pub search_url: Option<String>,
}

/// Cookie-jar backed platform session.
///
/// Callers see a blocking API; requests run on a private single-threaded
/// runtime so the run loop stays synchronous.
pub struct HandshakeClient {
    http: Client,
    jar: Arc<Jar>,
    base: Url,
    origin: String,
    runtime: Runtime,
    csrf_token: Option<String>,
    listing_source: ListingSource,
    search_filter: Map<String, Value>,
}

impl HandshakeClient {
    pub fn new(
        settings: &ClientSettings,
        cookies: &BTreeMap<String, String>,
    ) -> Result<Self, SessionError> {
        let base = Url::parse(&settings.base_url)
            .map_err(|err| SessionError::Transport(format!("invalid base url: {err}")))?;

        let jar = Arc::new(Jar::default());
        for (name, value) in cookies {
            jar.add_cookie_str(&format!("{name}={value}; Path=/"), &base);
        }

        let http = Client::builder()
            .cookie_provider(Arc::clone(&jar))
            .user_agent(settings.user_agent.clone())
            .timeout(settings.timeout)
            .build()
            .map_err(|err| SessionError::Transport(err.to_string()))?;

        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|err| SessionError::Runtime(err.to_string()))?;

        let search_filter = settings
            .search_url
            .as_deref()
            .map(graphql::search_filters)
            .unwrap_or_default();

        Ok(Self {
            http,
            jar,
            origin: base.origin().ascii_serialization(),
            base,
            runtime,
            csrf_token: None,
            listing_source: settings.listing_source,
            search_filter,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, SessionError> {
        self.base
            .join(path)
            .map_err(|err| SessionError::Transport(format!("invalid endpoint {path}: {err}")))
    }

    fn headers(&self, profile: RequestProfile) -> HeaderMap {
        profile.headers(&ProfileContext {
            origin: &self.origin,
            csrf_token: self.csrf_token.as_deref(),
        })
    }

    /// Sends the request and returns the body of a 2xx response.
    fn execute(&self, request: RequestBuilder) -> Result<String, SessionError> {
        self.runtime.block_on(async {
            let response = request
                .send()
                .await
                .map_err(|err| SessionError::Transport(err.to_string()))?;
            let status = response.status();
            let body = response
                .text()
                .await
                .map_err(|err| SessionError::Transport(err.to_string()))?;

            debug!(status = status.as_u16(), bytes = body.len(), "platform response");
            if status.is_success() {
                Ok(body)
            } else {
                Err(SessionError::Status {
                    status: status.as_u16(),
                    body: body.chars().take(ERROR_BODY_PREVIEW).collect(),
                })
            }
        })
    }

    fn fetch_rest_page(&self, page: u32, per_page: u32) -> Result<ListingPage, SessionError> {
        let url = self.endpoint("/stu/postings")?;
        let request = self
            .http
            .get(url)
            .headers(self.headers(RequestProfile::Listing))
            .query(&[
                ("page", page.to_string()),
                ("per_page", per_page.to_string()),
                ("sort_direction", "desc".to_string()),
                ("sort_column", "created_at".to_string()),
            ]);
        wire::parse_postings(&self.execute(request)?)
    }

    fn fetch_graphql_page(&self, page: u32, per_page: u32) -> Result<ListingPage, SessionError> {
        let url = self.endpoint("/hs/graphql")?;
        let request = self
            .http
            .post(url)
            .headers(self.headers(RequestProfile::GraphQl))
            .json(&graphql::search_payload(page, per_page, &self.search_filter));
        graphql::parse_search(&self.execute(request)?)
    }
}

impl fmt::Debug for HandshakeClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandshakeClient")
            .field("base", &self.base.as_str())
            .field("listing_source", &self.listing_source)
            .field("has_token", &self.csrf_token.is_some())
            .finish_non_exhaustive()
    }
}

impl PlatformSession for HandshakeClient {
    fn refresh_token(&mut self) -> Result<(), SessionError> {
        let url = self.endpoint("/")?;
        let request = self
            .http
            .get(url)
            .headers(self.headers(RequestProfile::Bootstrap));
        let page = self.execute(request)?;
        let token = extract_csrf_token(&page).ok_or(SessionError::MissingToken)?;
        debug!(length = token.len(), "anti-forgery token cached");
        self.csrf_token = Some(token);
        Ok(())
    }

    fn fetch_listing_page(&self, page: u32, per_page: u32) -> Result<ListingPage, SessionError> {
        match self.listing_source {
            ListingSource::Rest => self.fetch_rest_page(page, per_page),
            ListingSource::Graphql => self.fetch_graphql_page(page, per_page),
        }
    }

    fn fetch_job_detail(&self, id: JobId) -> Result<DetailPayload, SessionError> {
        let url = self.endpoint(&format!("/stu/jobs/{id}"))?;
        let request = self
            .http
            .get(url)
            .headers(self.headers(RequestProfile::Detail));
        wire::parse_detail(&self.execute(request)?)
    }

    fn submit_application(&self, request: &ApplicationRequest) -> Result<(), SessionError> {
        let url = self.endpoint(&format!("/jobs/{}/applications", request.job_id))?;
        let builder = self
            .http
            .post(url)
            .headers(self.headers(RequestProfile::Submission))
            .body(wire::application_body(request).to_string());
        self.execute(builder).map(|_| ())
    }

    fn cookies(&self) -> BTreeMap<String, String> {
        let Some(header) = self.jar.cookies(&self.base) else {
            return BTreeMap::new();
        };
        let Ok(raw) = header.to_str() else {
            return BTreeMap::new();
        };
        raw.split(';')
            .filter_map(|pair| {
                let (name, value) = pair.trim().split_once('=')?;
                (!name.is_empty()).then(|| (name.to_string(), value.to_string()))
            })
            .collect()
    }
}
