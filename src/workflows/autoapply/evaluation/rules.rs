use chrono::NaiveDateTime;

use super::super::domain::{ApplyMethod, DocumentId, DocumentRequirement, DocumentSet, JobDetail};

/// What the detail says should happen, before any submission is attempted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Verdict {
    NotInPlatform(String),
    NotYetOpen(NaiveDateTime),
    MissingDocuments(Vec<String>),
    Ready(Vec<DocumentId>),
}

pub(crate) fn classify(detail: &JobDetail, documents: &DocumentSet, now: NaiveDateTime) -> Verdict {
    if detail.method != ApplyMethod::InPlatform {
        return Verdict::NotInPlatform(detail.method.label().to_string());
    }

    if let Some(opens_at) = detail.listing.apply_start.filter(|start| *start > now) {
        return Verdict::NotYetOpen(opens_at);
    }

    let mut missing = Vec::new();
    let mut document_ids = Vec::new();
    for requirement in &detail.required_documents {
        match requirement {
            DocumentRequirement::Category(category) => match documents.get(*category) {
                Some(id) if !document_ids.contains(&id) => document_ids.push(id),
                Some(_) => {}
                None => missing.push(category.label().to_string()),
            },
            DocumentRequirement::Unrecognized(type_id) => {
                missing.push(format!("document type {type_id}"));
            }
        }
    }

    if missing.is_empty() {
        Verdict::Ready(document_ids)
    } else {
        Verdict::MissingDocuments(missing)
    }
}
