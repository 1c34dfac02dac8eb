//! Stream ingestion: JSON records in, one formatted median per record out

mod format;
mod record;
mod stream;

pub use format::format_median;
pub use record::{parse_record, ParseError, Record};
pub use stream::{process_stream, render_medians, StreamError, StreamSummary};
