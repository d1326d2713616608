use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE, ORIGIN, REFERER,
};
use tracing::warn;

/// Header set attached to each kind of platform request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RequestProfile {
    Bootstrap,
    Listing,
    Detail,
    Submission,
    GraphQl,
}

pub(crate) struct ProfileContext<'a> {
    pub(crate) origin: &'a str,
    pub(crate) csrf_token: Option<&'a str>,
}

const CSRF_HEADER: &str = "x-csrf-token";

impl RequestProfile {
    pub(crate) fn headers(self, context: &ProfileContext<'_>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        let referer = format!("{}/", context.origin);

        match self {
            Self::Bootstrap => {
                insert(&mut headers, ACCEPT, mime::TEXT_HTML.as_ref());
            }
            Self::Listing => {
                insert(&mut headers, ACCEPT, mime::APPLICATION_JSON.as_ref());
            }
            Self::Detail => {
                insert(&mut headers, ACCEPT, mime::APPLICATION_JSON.as_ref());
                insert(&mut headers, REFERER, &referer);
                insert_named(&mut headers, "x-requested-with", "XMLHttpRequest");
            }
            Self::Submission => {
                let accept = format!(
                    "{}, {}, {}; q=0.01",
                    mime::APPLICATION_JSON,
                    mime::TEXT_JAVASCRIPT,
                    mime::STAR_STAR
                );
                insert(&mut headers, ACCEPT, &accept);
                insert(&mut headers, CONTENT_TYPE, &json_utf8());
                insert_csrf(&mut headers, context.csrf_token);
            }
            Self::GraphQl => {
                insert(&mut headers, ACCEPT, mime::STAR_STAR.as_ref());
                insert(&mut headers, CONTENT_TYPE, mime::APPLICATION_JSON.as_ref());
                insert(&mut headers, ORIGIN, context.origin);
                insert(&mut headers, REFERER, &referer);
                insert_named(&mut headers, "apollographql-client-name", "consumer");
                insert_named(&mut headers, "apollographql-client-version", "1.2");
                insert_named(&mut headers, "graphql-operation-type", "query");
                insert_csrf(&mut headers, context.csrf_token);
            }
        }

        headers
    }
}

fn json_utf8() -> String {
    format!("{}; charset=utf-8", mime::APPLICATION_JSON)
}

fn insert_csrf(headers: &mut HeaderMap, token: Option<&str>) {
    if let Some(token) = token {
        insert_named(headers, CSRF_HEADER, token);
    }
}

fn insert_named(headers: &mut HeaderMap, name: &'static str, value: &str) {
    insert(headers, HeaderName::from_static(name), value);
}

fn insert(headers: &mut HeaderMap, name: HeaderName, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(value) => {
            headers.insert(name, value);
        }
        Err(_) => warn!(header = %name, "dropping header with invalid characters"),
    }
}
