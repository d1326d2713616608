use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Decision settings shared by every job in a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationConfig {
    pub keywords: KeywordFilter,
    pub submission: SubmissionPolicy,
}

/// Case-insensitive title filter applied before any detail fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordFilter {
    include: Vec<String>,
    exclude: Vec<String>,
}

impl KeywordFilter {
    pub fn new<I, E>(include: I, exclude: E) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
        E: IntoIterator,
        E::Item: AsRef<str>,
    {
        Self {
            include: normalize(include),
            exclude: normalize(exclude),
        }
    }

    pub fn is_active(&self) -> bool {
        !self.include.is_empty() || !self.exclude.is_empty()
    }

    /// Exclusions win over inclusions; an empty include list admits everything.
    pub fn admits(&self, title: &str) -> bool {
        let title = title.to_lowercase();
        if self.exclude.iter().any(|term| title.contains(term.as_str())) {
            return false;
        }
        self.include.is_empty() || self.include.iter().any(|term| title.contains(term.as_str()))
    }
}

fn normalize<I>(terms: I) -> Vec<String>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    terms
        .into_iter()
        .map(|term| term.as_ref().trim().to_lowercase())
        .filter(|term| !term.is_empty())
        .collect()
}

/// Submission statuses that skip the job instead of halting the run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionPolicy {
    skip_statuses: BTreeSet<u16>,
}

impl SubmissionPolicy {
    pub fn with_skip_statuses(statuses: impl IntoIterator<Item = u16>) -> Self {
        Self {
            skip_statuses: statuses.into_iter().collect(),
        }
    }

    pub fn skips(&self, status: u16) -> bool {
        self.skip_statuses.contains(&status)
    }
}
