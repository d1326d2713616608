use std::io::{Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::workflows::autoapply::domain::JobId;

#[derive(Debug, thiserror::Error)]
pub enum IdentifierListError {
    #[error("unable to open identifier list: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid identifier list: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Deserialize)]
struct IdentifierRow {
    #[serde(default)]
    job_id: String,
}

#[derive(Debug, Serialize)]
struct IdentifierOut {
    job_id: u64,
}

/// Reads a `job_id` CSV, keeping file order and dropping non-numeric rows.
pub fn read_identifier_list<P: AsRef<Path>>(path: P) -> Result<Vec<JobId>, IdentifierListError> {
    let file = std::fs::File::open(path)?;
    read_identifier_list_from(file)
}

pub fn read_identifier_list_from<R: Read>(reader: R) -> Result<Vec<JobId>, IdentifierListError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let mut ids = Vec::new();
    for row in csv_reader.deserialize::<IdentifierRow>() {
        let row = row?;
        let value = row.job_id.trim();
        if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
            continue;
        }
        if let Ok(id) = value.parse::<u64>() {
            ids.push(JobId(id));
        }
    }

    Ok(ids)
}

pub fn write_identifier_list<P: AsRef<Path>>(
    path: P,
    ids: &[JobId],
) -> Result<(), IdentifierListError> {
    let file = std::fs::File::create(path)?;
    write_identifier_list_to(file, ids)
}

pub fn write_identifier_list_to<W: Write>(
    writer: W,
    ids: &[JobId],
) -> Result<(), IdentifierListError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for id in ids {
        csv_writer.serialize(IdentifierOut { job_id: id.0 })?;
    }
    csv_writer.flush()?;
    Ok(())
}
