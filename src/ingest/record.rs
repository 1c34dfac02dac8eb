//! Newline-delimited JSON transaction records
//!
//! `{"created_time": "2016-03-28T23:23:12Z", "target": "Jamie-Korn", "actor": "Jordan-Gruber"}`

use chrono::DateTime;
use serde::Deserialize;
use thiserror::Error;

use crate::graph::Timestamp;

/// Errors turning a line into a [`Record`]
#[derive(Error, Debug)]
pub enum ParseError {
    /// Not a JSON object of the expected shape
    #[error("malformed record: {0}")]
    Json(#[from] serde_json::Error),

    /// `created_time` is not RFC 3339
    #[error("bad timestamp {value:?}: {source}")]
    Timestamp {
        /// Offending field value
        value: String,
        /// Underlying chrono error
        source: chrono::ParseError,
    },
}

#[derive(Deserialize)]
struct RawRecord {
    created_time: String,
    #[serde(default)]
    actor: Option<String>,
    #[serde(default)]
    target: Option<String>,
}

/// Parsed transaction, not yet validated
///
/// Missing actor fields come through as empty strings; the tracker
/// rejects those as invalid events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Seconds since the Unix epoch
    pub timestamp: Timestamp,
    /// Paying actor
    pub actor: String,
    /// Receiving actor
    pub target: String,
}

/// Parse one JSON line
pub fn parse_record(line: &str) -> Result<Record, ParseError> {
    let raw: RawRecord = serde_json::from_str(line)?;
    let timestamp = DateTime::parse_from_rfc3339(&raw.created_time)
        .map_err(|source| ParseError::Timestamp {
            value: raw.created_time.clone(),
            source,
        })?
        .timestamp();

    Ok(Record {
        timestamp,
        actor: raw.actor.unwrap_or_default(),
        target: raw.target.unwrap_or_default(),
    })
}
