/// Output formatting for completion records.
pub mod completion;

pub use completion::{write_completions, CsvFormatter, Formatter, JsonFormatter, TextFormatter};

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// `<tick-unix-seconds> <latency-seconds>` per line
    Text,
    /// CSV with a header row
    Csv,
    /// One JSON object per line
    Json,
}

impl OutputFormat {
    pub fn formatter(self) -> Box<dyn Formatter> {
        match self {
            OutputFormat::Text => Box::new(TextFormatter),
            OutputFormat::Csv => Box::new(CsvFormatter),
            OutputFormat::Json => Box::new(JsonFormatter),
        }
    }
}
