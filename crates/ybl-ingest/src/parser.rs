// glog line parser
//
// Line format (after collapsing space runs):
//   Lmmdd hh:mm:ss.uuuuuu threadid file:line] msg
// Example:
//   I0609 06:16:53.123456 12345 raft_consensus.cc:123] Leader stepdown request received
//
// L is one of I, W, E, F. Everything up to "] " is fixed-shape; the message
// is the rest of the line and may itself contain colons and brackets.

use regex::Regex;
use std::borrow::Cow;

use crate::models::{LogLevel, LogRecord};

/// Anchored at the start, ASCII digits only. `[^:]+` stops at the first
/// colon, so the file name is unambiguous.
const LINE_PATTERN: &str = r"^([IWEF])([0-9]{2})([0-9]{2}) ([0-9]{2}):([0-9]{2}):([0-9]{2})\.([0-9]{6}) ([0-9]+) ([^:]+):([0-9]+)\] (.+)";

/// Parser for glog-formatted server log lines
pub struct LineParser {
    pattern: Regex,
}

impl LineParser {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(LINE_PATTERN)?,
        })
    }

    /// Parse one physical line into a record
    ///
    /// Returns `None` for anything that is not a complete structured line:
    /// continuation lines, stack frames, banners, truncated lines.
    pub fn parse(&self, raw: &str, server_name: &str) -> Option<LogRecord> {
        let line = collapse_spaces(raw.trim_end_matches(['\n', '\r']));
        let caps = self.pattern.captures(&line)?;

        let level = caps[1].chars().next().and_then(LogLevel::from_char)?;

        Some(LogRecord {
            server_name: server_name.to_string(),
            log_level: level,
            month: caps[2].to_string(),
            day: caps[3].to_string(),
            hour: caps[4].to_string(),
            minute: caps[5].to_string(),
            second: caps[6].to_string(),
            microseconds: caps[7].to_string(),
            thread_id: caps[8].to_string(),
            file: caps[9].to_string(),
            line: caps[10].to_string(),
            message: caps[11].to_string(),
        })
    }
}

/// Replace every run of ' ' with a single ' ' (tabs are left alone)
pub fn collapse_spaces(line: &str) -> Cow<'_, str> {
    if !line.contains("  ") {
        return Cow::Borrowed(line);
    }

    let mut out = String::with_capacity(line.len());
    let mut previous_space = false;
    for c in line.chars() {
        if c == ' ' {
            if !previous_space {
                out.push(c);
            }
            previous_space = true;
        } else {
            out.push(c);
            previous_space = false;
        }
    }
    Cow::Owned(out)
}
