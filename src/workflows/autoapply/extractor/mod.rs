//! Job identifier extraction from saved search pages and API payloads.

mod identifiers;
mod patterns;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::domain::JobId;

pub use identifiers::{
    read_identifier_list, read_identifier_list_from, write_identifier_list,
    write_identifier_list_to, IdentifierListError,
};

/// Returns the sorted, deduplicated job ids referenced by `document`.
///
/// Ids inside a recognised results container win; the whole document is only
/// scanned when no container yields anything.
pub fn extract_job_ids(document: &str) -> Vec<JobId> {
    let regional = patterns::scan_result_regions(document);
    if !regional.is_empty() {
        return regional.into_iter().collect();
    }

    let mut ids = BTreeSet::new();
    patterns::scan_text(document, &mut ids);
    ids.into_iter().collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileExtraction {
    pub file_name: String,
    pub job_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryExtraction {
    pub files: Vec<FileExtraction>,
    pub job_ids: Vec<JobId>,
}

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("folder '{0}' does not exist")]
    MissingDirectory(PathBuf),
    #[error("unable to list '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Scans every `.html`/`.htm` file in `dir`.
///
/// Files that cannot be read are logged and contribute no ids.
pub fn extract_from_dir<P: AsRef<Path>>(dir: P) -> Result<DirectoryExtraction, ExtractError> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(ExtractError::MissingDirectory(dir.to_path_buf()));
    }

    let entries = std::fs::read_dir(dir).map_err(|source| ExtractError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut pages: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|path| is_html_file(path))
        .collect();
    pages.sort();

    let mut all_ids = BTreeSet::new();
    let mut files = Vec::with_capacity(pages.len());

    for page in pages {
        let file_name = page
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        let ids = match std::fs::read(&page) {
            Ok(bytes) => extract_job_ids(&String::from_utf8_lossy(&bytes)),
            Err(err) => {
                warn!(file = %file_name, error = %err, "skipping unreadable page");
                Vec::new()
            }
        };

        debug!(file = %file_name, count = ids.len(), "extracted job ids");
        files.push(FileExtraction {
            file_name,
            job_count: ids.len(),
        });
        all_ids.extend(ids);
    }

    Ok(DirectoryExtraction {
        files,
        job_ids: all_ids.into_iter().collect(),
    })
}

fn is_html_file(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("html") || ext.eq_ignore_ascii_case("htm"))
            .unwrap_or(false)
}
