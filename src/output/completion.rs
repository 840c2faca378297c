/// Formatters for completion records.
use crate::error::AppError;
use crate::simulator::{CompletionRecord, CompletionStream};
use serde::Serialize;
use std::io::Write;

/// Formats completion records, one line each.
pub trait Formatter: Send {
    /// Line written before the first record, if any.
    fn header(&self) -> Option<String> {
        None
    }

    fn format_record(&self, record: &CompletionRecord) -> String;
}

/// `<tick-unix-seconds> <latency-seconds>`
pub struct TextFormatter;

impl Formatter for TextFormatter {
    fn format_record(&self, record: &CompletionRecord) -> String {
        format!("{:.6} {:.6}", record.tick_unix_secs(), record.latency_secs())
    }
}

/// CSV with a header row.
pub struct CsvFormatter;

impl Formatter for CsvFormatter {
    fn header(&self) -> Option<String> {
        Some("tick_unix_s,latency_s,seq".to_string())
    }

    fn format_record(&self, record: &CompletionRecord) -> String {
        format!(
            "{:.6},{:.6},{}",
            record.tick_unix_secs(),
            record.latency_secs(),
            record.seq
        )
    }
}

/// One JSON object per line.
pub struct JsonFormatter;

#[derive(Serialize)]
struct JsonRecord {
    tick_unix_s: f64,
    latency_s: f64,
    seq: u64,
}

impl Formatter for JsonFormatter {
    fn format_record(&self, record: &CompletionRecord) -> String {
        let line = JsonRecord {
            tick_unix_s: record.tick_unix_secs(),
            latency_s: record.latency_secs(),
            seq: record.seq,
        };
        // Plain numeric fields always serialize.
        serde_json::to_string(&line).unwrap_or_default()
    }
}

/// Write every record from `stream` to `out` until the stream ends.
///
/// Each line is flushed as it is written so output can be tailed while the
/// run is going. Returns the number of records written.
pub async fn write_completions<W: Write>(
    mut stream: CompletionStream,
    formatter: &dyn Formatter,
    out: &mut W,
) -> Result<u64, AppError> {
    if let Some(header) = formatter.header() {
        writeln!(out, "{}", header)?;
    }

    let mut written = 0u64;
    while let Some(record) = stream.recv().await {
        writeln!(out, "{}", formatter.format_record(&record))?;
        out.flush()?;
        written += 1;
    }

    Ok(written)
}
