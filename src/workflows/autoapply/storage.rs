//! File-backed [`StateStore`] and [`ApplicationLog`].

use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use super::domain::{ApplicationEntry, JobId, ListingRecord, RunState};
use super::profile::ProfileDocument;
use super::repository::{ApplicationLog, RepositoryError, StateStore};
use super::timestamps::format_timestamp;

/// Keeps run state inside the profile file and deferred jobs in their own
/// JSON array file. Every write replaces the target atomically.
#[derive(Debug, Clone)]
pub struct FileStateStore {
    profile_path: PathBuf,
    deferred_path: PathBuf,
}

impl FileStateStore {
    pub fn new(profile_path: impl Into<PathBuf>, deferred_path: impl Into<PathBuf>) -> Self {
        Self {
            profile_path: profile_path.into(),
            deferred_path: deferred_path.into(),
        }
    }

    pub fn read_profile(&self) -> Result<ProfileDocument, RepositoryError> {
        let raw = fs::read_to_string(&self.profile_path)
            .map_err(|source| io(&self.profile_path, source))?;
        ProfileDocument::from_json(&raw).map_err(|err| malformed(&self.profile_path, err))
    }
}

impl StateStore for FileStateStore {
    fn load_state(&self) -> Result<RunState, RepositoryError> {
        self.read_profile()?
            .run_state()
            .map_err(|err| malformed(&self.profile_path, err))
    }

    fn save_state(&self, state: &RunState) -> Result<(), RepositoryError> {
        let mut profile = self.read_profile()?;
        profile.apply_state(state);
        let body = profile
            .to_json()
            .map_err(|err| malformed(&self.profile_path, err))?;
        write_atomic(&self.profile_path, body.as_bytes())
    }

    fn load_deferred(&self) -> Result<Vec<ListingRecord>, RepositoryError> {
        let raw = match fs::read_to_string(&self.deferred_path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(io(&self.deferred_path, err)),
        };
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&raw).map_err(|err| malformed(&self.deferred_path, err))
    }

    fn save_deferred(&self, deferred: &[ListingRecord]) -> Result<(), RepositoryError> {
        let body = serde_json::to_string_pretty(deferred)
            .map_err(|err| malformed(&self.deferred_path, err))?;
        write_atomic(&self.deferred_path, body.as_bytes())
    }
}

/// Appends one line per successful application:
/// `id, "title", "employer", "timestamp"`.
#[derive(Debug, Clone)]
pub struct CsvApplicationLog {
    path: PathBuf,
}

impl CsvApplicationLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ApplicationLog for CsvApplicationLog {
    fn applied_ids(&self) -> Result<HashSet<JobId>, RepositoryError> {
        let file = match fs::File::open(&self.path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(HashSet::new()),
            Err(err) => return Err(io(&self.path, err)),
        };

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        let mut ids = HashSet::new();
        for record in reader.records() {
            let record = record.map_err(|err| malformed(&self.path, err))?;
            if let Some(id) = record.get(0).and_then(|value| value.parse::<u64>().ok()) {
                ids.insert(JobId(id));
            }
        }
        debug!(count = ids.len(), "loaded application log");
        Ok(ids)
    }

    fn record(&self, entry: &ApplicationEntry) -> Result<(), RepositoryError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| io(&self.path, source))?;
        writeln!(
            file,
            "{}, \"{}\", \"{}\", \"{}\"",
            entry.id,
            quote(&entry.title),
            quote(&entry.employer),
            format_timestamp(entry.applied_at)
        )
        .map_err(|source| io(&self.path, source))
    }
}

fn quote(value: &str) -> String {
    value.replace('"', "\"\"")
}

/// Writes to a sibling temp file and renames it over `path`.
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), RepositoryError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut temp = NamedTempFile::new_in(dir).map_err(|source| io(path, source))?;
    temp.write_all(contents).map_err(|source| io(path, source))?;
    temp.flush().map_err(|source| io(path, source))?;
    temp.persist(path).map_err(|err| io(path, err.error))?;
    Ok(())
}

fn io(path: &Path, source: std::io::Error) -> RepositoryError {
    RepositoryError::Io {
        path: path.display().to_string(),
        source,
    }
}

fn malformed(path: &Path, err: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::Malformed {
        path: path.display().to_string(),
        message: err.to_string(),
    }
}
