//! Record of data problems absorbed while reading.
//!
//! Reading never stops on bad data. A cell that will not cast is kept as its
//! raw string, a line with unbalanced quotes is split as well as possible and
//! a row with the wrong number of cells is emitted with the cells it has. Each
//! of these leaves an entry in the [`ErrorLog`] so callers can inspect, export
//! or report what went wrong after the fact.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::path::Path;

/// What kind of problem an entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    /// A cell failed to cast to its column's type.
    Cast,
    /// The line could not be tokenized cleanly.
    Malformed,
    /// The line has a different number of cells than the header.
    Ragged,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Cast => "cast",
            ErrorKind::Malformed => "malformed",
            ErrorKind::Ragged => "ragged",
        };
        f.write_str(s)
    }
}

/// One logged problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggedError {
    /// Zero-based source line.
    pub line: usize,
    /// Column name for cast failures.
    pub column: Option<String>,
    /// The offending cell for cast failures, the whole line otherwise.
    pub raw: String,
    pub kind: ErrorKind,
    pub description: String,
}

impl fmt::Display for LoggedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {} [{}]", self.line, self.kind)?;
        if let Some(ref column) = self.column {
            write!(f, " column '{column}'")?;
        }
        write!(f, ": {} ({:?})", self.description, self.raw)
    }
}

/// Ordered collection of [`LoggedError`]s.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorLog {
    entries: Vec<LoggedError>,
}

impl ErrorLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: LoggedError) {
        log::debug!("{entry}");
        self.entries.push(entry);
    }

    pub fn cast(&mut self, line: usize, column: &str, raw: &str, description: impl Into<String>) {
        self.push(LoggedError {
            line,
            column: Some(column.to_string()),
            raw: raw.to_string(),
            kind: ErrorKind::Cast,
            description: description.into(),
        });
    }

    pub fn malformed(&mut self, line: usize, raw: &str, description: impl Into<String>) {
        self.push(LoggedError {
            line,
            column: None,
            raw: raw.to_string(),
            kind: ErrorKind::Malformed,
            description: description.into(),
        });
    }

    pub fn ragged(&mut self, line: usize, raw: &str, description: impl Into<String>) {
        self.push(LoggedError {
            line,
            column: None,
            raw: raw.to_string(),
            kind: ErrorKind::Ragged,
            description: description.into(),
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[LoggedError] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LoggedError> {
        self.entries.iter()
    }

    /// Number of entries of the given kind.
    pub fn count(&self, kind: ErrorKind) -> usize {
        self.entries.iter().filter(|e| e.kind == kind).count()
    }

    /// Entries recorded against a source line.
    pub fn for_line(&self, line: usize) -> impl Iterator<Item = &LoggedError> {
        self.entries.iter().filter(move |e| e.line == line)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Emit every entry through the `log` facade at warn level.
    pub fn report(&self) {
        for entry in &self.entries {
            log::warn!("{entry}");
        }
    }

    /// Export entries as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.entries)
    }

    /// Write entries to `path` as JSON.
    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let json = self.to_json().map_err(io::Error::other)?;
        std::fs::write(path, json)
    }
}

impl fmt::Display for ErrorLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ErrorLog({} errors: {} cast, {} malformed, {} ragged)",
            self.len(),
            self.count(ErrorKind::Cast),
            self.count(ErrorKind::Malformed),
            self.count(ErrorKind::Ragged)
        )
    }
}

impl<'a> IntoIterator for &'a ErrorLog {
    type Item = &'a LoggedError;
    type IntoIter = std::slice::Iter<'a, LoggedError>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
