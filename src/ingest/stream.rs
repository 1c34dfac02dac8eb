//! Line-by-line driver between a reader, the tracker and a writer

use std::io::{BufRead, Write};

use thiserror::Error;
use tracing::warn;

use super::{format_median, parse_record};
use crate::graph::{TrackerError, WindowedDegreeTracker};
use crate::TrackerConfig;

/// Errors that stop a stream
///
/// Bad lines never do; they are logged and counted instead.
#[derive(Error, Debug)]
pub enum StreamError {
    /// Reading input or writing output failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Tracker failure other than an invalid event
    #[error(transparent)]
    Tracker(#[from] TrackerError),
}

/// Counters for one processed stream
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StreamSummary {
    /// Non-blank input lines
    pub lines: usize,
    /// Median lines written
    pub emitted: usize,
    /// Lines that were not valid records
    pub parse_errors: usize,
    /// Records with an empty actor or target
    pub invalid_events: usize,
    /// Records too far behind the window (a median is still written)
    pub rejected: usize,
    /// Events evicted from the window
    pub evicted: usize,
}

/// Feed every record from `reader` into `tracker`, writing one median per
/// accepted or window-rejected record
pub fn process_stream<R: BufRead, W: Write>(
    reader: R,
    writer: &mut W,
    tracker: &mut WindowedDegreeTracker,
) -> Result<StreamSummary, StreamError> {
    let mut summary = StreamSummary::default();

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        summary.lines += 1;

        let record = match parse_record(line) {
            Ok(record) => record,
            Err(err) => {
                warn!(line = idx + 1, error = %err, "skipping unparsable record");
                summary.parse_errors += 1;
                continue;
            }
        };

        let outcome = match tracker.insert_raw(record.timestamp, &record.actor, &record.target) {
            Ok(outcome) => outcome,
            Err(TrackerError::InvalidEvent(reason)) => {
                warn!(line = idx + 1, %reason, "skipping invalid event");
                summary.invalid_events += 1;
                continue;
            }
            Err(err) => return Err(err.into()),
        };

        if outcome.is_rejected() {
            summary.rejected += 1;
        }
        summary.evicted += outcome.evicted();

        writeln!(writer, "{}", format_median(tracker.median_degree()?))?;
        summary.emitted += 1;
    }

    writer.flush()?;
    Ok(summary)
}

/// Run a whole input through a fresh tracker and return the output text
pub fn render_medians(input: &str, config: TrackerConfig) -> Result<String, StreamError> {
    let mut tracker = WindowedDegreeTracker::new(config)?;
    let mut buffer = Vec::new();
    process_stream(input.as_bytes(), &mut buffer, &mut tracker)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}
