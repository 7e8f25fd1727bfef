use std::{
    io::Read,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, error};

use domdash_core::types::{parse_leading_int, DomainRecord};

/// Reads domain records from a CSV file with a header row.
#[derive(Debug, Clone)]
pub struct RecordSource {
    path: PathBuf,
}

impl RecordSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads all records, degrading to an empty list on any failure.
    ///
    /// Errors are logged and never propagated, so callers treat "no data" as
    /// a valid outcome.
    pub async fn fetch_domains(&self) -> Vec<DomainRecord> {
        match self.load().await {
            Ok(records) => {
                debug!(
                    stage = "storage",
                    path = %self.path.display(),
                    rows = records.len(),
                    "loaded domain records"
                );
                records
            }
            Err(err) => {
                error!(
                    stage = "storage",
                    path = %self.path.display(),
                    error = %err,
                    "error fetching domains"
                );
                Vec::new()
            }
        }
    }

    /// Loads all records, returning the first error encountered.
    pub async fn load(&self) -> Result<Vec<DomainRecord>, RecordSourceError> {
        let contents = tokio::fs::read(&self.path)
            .await
            .map_err(|source| RecordSourceError::Read {
                path: self.path.clone(),
                source,
            })?;
        parse_domains(contents.as_slice())
    }
}

/// Parses CSV content into records, applying field defaults.
///
/// Empty lines are skipped and unknown columns are ignored. A row whose field
/// count differs from the header is rejected.
pub fn parse_domains<R: Read>(reader: R) -> Result<Vec<DomainRecord>, RecordSourceError> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    csv_reader
        .deserialize::<RawDomainRow>()
        .map(|row| row.map(RawDomainRow::into_domain).map_err(RecordSourceError::Csv))
        .collect()
}

#[derive(Debug, Error)]
pub enum RecordSourceError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed csv: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Default, Deserialize)]
struct RawDomainRow {
    #[serde(rename = "Domain", default)]
    domain: Option<String>,
    #[serde(rename = "Niche 1", default)]
    niche1: Option<String>,
    #[serde(rename = "Niche 2", default)]
    niche2: Option<String>,
    #[serde(rename = "Traffic", default)]
    traffic: Option<String>,
    #[serde(rename = "DR", default)]
    dr: Option<String>,
    #[serde(rename = "DA", default)]
    da: Option<String>,
    #[serde(rename = "Language", default)]
    language: Option<String>,
    #[serde(rename = "Price", default)]
    price: Option<String>,
    #[serde(rename = "Spam Score", default)]
    spam_score: Option<String>,
}

impl RawDomainRow {
    fn into_domain(self) -> DomainRecord {
        DomainRecord {
            domain: self.domain.unwrap_or_default(),
            niche1: self.niche1.unwrap_or_default(),
            niche2: self.niche2.unwrap_or_default(),
            traffic: self.traffic.unwrap_or_default(),
            dr: self.dr.as_deref().map(parse_leading_int).unwrap_or_default(),
            da: self.da.as_deref().map(parse_leading_int).unwrap_or_default(),
            language: self.language.unwrap_or_default(),
            price: self.price.unwrap_or_default(),
            spam_score: self.spam_score.unwrap_or_default(),
        }
    }
}
