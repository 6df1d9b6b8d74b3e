//! Data models for parsed server log lines

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity code at the start of every glog line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogLevel {
    Info,
    Warning,
    Error,
    Fatal,
}

impl LogLevel {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'I' => Some(LogLevel::Info),
            'W' => Some(LogLevel::Warning),
            'E' => Some(LogLevel::Error),
            'F' => Some(LogLevel::Fatal),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            LogLevel::Info => 'I',
            LogLevel::Warning => 'W',
            LogLevel::Error => 'E',
            LogLevel::Fatal => 'F',
        }
    }

    /// Single-letter code as stored in the `log_level` column
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Info => "I",
            LogLevel::Warning => "W",
            LogLevel::Error => "E",
            LogLevel::Fatal => "F",
        }
    }

    /// Cheap pre-filter: does the raw line start with a level letter?
    pub fn starts_line(line: &str) -> bool {
        line.chars().next().and_then(Self::from_char).is_some()
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One structured log line, ready for the `logs` table
///
/// Timestamp components stay textual and carry no year, matching the glog
/// prefix `Lmmdd hh:mm:ss.uuuuuu threadid file:line] msg`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    pub server_name: String,
    pub log_level: LogLevel,
    pub month: String,
    pub day: String,
    pub hour: String,
    pub minute: String,
    pub second: String,
    pub microseconds: String,
    pub thread_id: String,
    pub file: String,
    pub line: String,
    pub message: String,
}

impl LogRecord {
    /// Number of columns written per record
    pub const COLUMN_COUNT: usize = 12;
}

/// Renders the record back into its glog form (without server name)
impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{} {}:{}:{}.{} {} {}:{}] {}",
            self.log_level,
            self.month,
            self.day,
            self.hour,
            self.minute,
            self.second,
            self.microseconds,
            self.thread_id,
            self.file,
            self.line,
            self.message
        )
    }
}
