use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;
use scraper::{Html, Selector};

use crate::workflows::autoapply::domain::JobId;

/// Bare `"id"` keys also label employers, schools and documents; only 6 to
/// 10 digit values under that key are taken as posting ids.
const MIN_BARE_ID_DIGITS: usize = 6;
const MAX_BARE_ID_DIGITS: usize = 10;

const RESULT_REGION_SELECTORS: [&str; 4] = [
    r#"[data-hook="search-results"]"#,
    r#"[data-hook="jobs-card"]"#,
    "#search-results",
    r#"main [role="list"]"#,
];

/// Patterns paired with whether their capture must pass the bare-id shape.
const ID_PATTERNS: [(&str, bool); 4] = [
    (r"/jobs/(\d+)", false),
    (r#"data-job-id="(\d+)""#, false),
    (r#""job_id["\s:]+(\d+)"#, false),
    (r#""id"\s*:\s*(\d+)"#, true),
];

struct IdPattern {
    regex: Regex,
    shape_checked: bool,
}

fn id_patterns() -> &'static [IdPattern] {
    static PATTERNS: OnceLock<Vec<IdPattern>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        ID_PATTERNS
            .iter()
            .filter_map(|(pattern, shape_checked)| {
                Regex::new(pattern).ok().map(|regex| IdPattern {
                    regex,
                    shape_checked: *shape_checked,
                })
            })
            .collect()
    })
}

fn region_selectors() -> &'static [Selector] {
    static SELECTORS: OnceLock<Vec<Selector>> = OnceLock::new();
    SELECTORS.get_or_init(|| {
        RESULT_REGION_SELECTORS
            .iter()
            .filter_map(|selector| Selector::parse(selector).ok())
            .collect()
    })
}

pub(crate) fn scan_text(text: &str, into: &mut BTreeSet<JobId>) {
    for pattern in id_patterns() {
        for captures in pattern.regex.captures_iter(text) {
            let Some(token) = captures.get(1).map(|m| m.as_str()) else {
                continue;
            };
            let bare_shape = MIN_BARE_ID_DIGITS..=MAX_BARE_ID_DIGITS;
            if pattern.shape_checked && !bare_shape.contains(&token.len()) {
                continue;
            }
            if let Ok(value) = token.parse::<u64>() {
                if value > 0 {
                    into.insert(JobId(value));
                }
            }
        }
    }
}

/// Ids found inside a recognised results container, if any container exists.
pub(crate) fn scan_result_regions(document: &str) -> BTreeSet<JobId> {
    let html = Html::parse_document(document);
    let mut ids = BTreeSet::new();

    for selector in region_selectors() {
        for element in html.select(selector) {
            scan_text(&element.html(), &mut ids);
        }
    }

    ids
}
