use scraper::{Html, Selector};

/// Length of the anti-forgery token the platform embeds in its pages.
pub const CSRF_TOKEN_LEN: usize = 88;

const META_MARKER: &str = r#"<meta name="csrf-token" content=""#;

/// Pulls the anti-forgery token out of the bootstrap page.
///
/// The `csrf-token` meta tag is read through the DOM first; pages the parser
/// cannot make sense of fall back to a fixed-width slice after the raw marker.
pub fn extract_csrf_token(page: &str) -> Option<String> {
    if let Some(token) = token_from_dom(page) {
        return Some(token);
    }

    let start = page.find(META_MARKER)? + META_MARKER.len();
    let token: String = page[start..]
        .chars()
        .take_while(|c| *c != '"')
        .take(CSRF_TOKEN_LEN)
        .collect();
    (!token.is_empty()).then_some(token)
}

fn token_from_dom(page: &str) -> Option<String> {
    let selector = Selector::parse(r#"meta[name="csrf-token"]"#).ok()?;
    let html = Html::parse_document(page);
    html.select(&selector)
        .filter_map(|element| element.value().attr("content"))
        .map(str::trim)
        .find(|content| !content.is_empty())
        .map(str::to_string)
}
