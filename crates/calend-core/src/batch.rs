//! Batch files.
//!
//! A batch file lists one event per line:
//!
//! ```text
//! # name        start end
//! Team_Sync     0930  1045
//! Lunch with Sam 1230 1330
//! ```
//!
//! The last two tokens are `HHMM` times; everything before them is the
//! event name. Underscores in the name become spaces. Blank lines and lines
//! starting with `#` are ignored.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::plan::{EventSpec, TimeOfDay};

/// What is wrong with a single batch line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LineError {
    /// The line has fewer than three tokens.
    #[error("expected 'NAME STARTHHMM ENDHHMM'")]
    MissingFields,

    /// A time token is not four digits.
    #[error("invalid time '{0}', expected four digits HHMM")]
    InvalidTime(String),
}

/// Errors raised while reading a batch file.
#[derive(Debug, Error)]
pub enum BatchError {
    /// The file could not be read.
    #[error("failed to read batch file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A line could not be parsed.
    #[error("line {line}: {kind}")]
    Line { line: usize, kind: LineError },
}

/// Reads and parses a batch file.
pub fn load(path: impl AsRef<Path>) -> Result<Vec<EventSpec>, BatchError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| BatchError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let specs = parse(&content)?;
    debug!("read {} entries from {}", specs.len(), path.display());
    Ok(specs)
}

/// Parses the content of a batch file.
pub fn parse(content: &str) -> Result<Vec<EventSpec>, BatchError> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| {
            let trimmed = line.trim();
            !trimmed.is_empty() && !trimmed.starts_with('#')
        })
        .map(|(index, line)| {
            parse_line(line).map_err(|kind| BatchError::Line {
                line: index + 1,
                kind,
            })
        })
        .collect()
}

/// Parses a single `NAME STARTHHMM ENDHHMM` line.
pub fn parse_line(line: &str) -> Result<EventSpec, LineError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() < 3 {
        return Err(LineError::MissingFields);
    }

    let (name, times) = tokens.split_at(tokens.len() - 2);
    let start = parse_hhmm(times[0])?;
    let end = parse_hhmm(times[1])?;

    Ok(EventSpec::new(name.join(" ").replace('_', " "), start, end))
}

fn parse_hhmm(token: &str) -> Result<TimeOfDay, LineError> {
    let digits: Vec<u32> = token.chars().filter_map(|c| c.to_digit(10)).collect();
    if token.len() != 4 || digits.len() != 4 {
        return Err(LineError::InvalidTime(token.to_string()));
    }
    Ok(TimeOfDay::new(
        digits[0] * 10 + digits[1],
        digits[2] * 10 + digits[3],
    ))
}
