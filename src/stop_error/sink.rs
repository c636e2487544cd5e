//! Destinations for the formatted stop/error log line

use super::Severity;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use std::backtrace::Backtrace;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use tracing::{error, warn};

pub(crate) struct LogRecord {
    pub line: String,
    pub data: Option<String>,
    pub backtrace: Option<String>,
}

impl LogRecord {
    /// `[timestamp] SEVERITY: message (Code: code)`
    pub fn new(
        severity: Severity,
        message: &str,
        code: Option<&str>,
        timestamp: Option<DateTime<Utc>>,
        data: Option<&Value>,
        with_backtrace: bool,
    ) -> Self {
        let mut line = String::new();
        if let Some(ts) = timestamp {
            line.push_str(&format!("[{}] ", ts.to_rfc3339_opts(SecondsFormat::Millis, true)));
        }
        line.push_str(&format!("{}: {}", severity.as_str().to_uppercase(), message));
        if let Some(code) = code {
            line.push_str(&format!(" (Code: {code})"));
        }

        Self {
            line,
            data: data.map(|d| d.to_string()),
            backtrace: with_backtrace.then(|| Backtrace::force_capture().to_string()),
        }
    }
}

pub(crate) fn write_console(record: &LogRecord, severity: Severity) {
    match severity {
        Severity::Warning => warn!(data = record.data.as_deref(), "{}", record.line),
        Severity::Error | Severity::Fatal => {
            error!(data = record.data.as_deref(), "{}", record.line)
        }
    }
    if let Some(trace) = &record.backtrace {
        error!("{}", trace);
    }
}

/// Append the record to `path`, creating parent directories as needed
pub(crate) fn append_file(path: &Path, record: &LogRecord) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}", record.line)?;
    if let Some(data) = &record.data {
        writeln!(file, "Données supplémentaires: {data}")?;
    }
    if let Some(trace) = &record.backtrace {
        writeln!(file, "{trace}")?;
    }
    Ok(())
}
