//! Builders for delimited test texts.
//!
//! Fixtures are plain strings: feed them to [`Reader::new`](crate::Reader::new)
//! through a [`Cursor`](std::io::Cursor) or write them to disk with
//! [`write_temp`](super::write_temp).

use crate::dialect::Dialect;
use std::fmt::Write as _;

/// Fluent builder for a metadata / header / data text.
///
/// # Example
///
/// ```
/// use tabsniff::testing::DsvFixture;
///
/// let text = DsvFixture::new(b',')
///     .metadata("exported 2024-05-01")
///     .header(["id", "name"])
///     .row(["1", "ann"])
///     .build();
/// assert_eq!(text, "exported 2024-05-01\nid,name\n1,ann\n");
/// ```
#[derive(Debug, Clone)]
pub struct DsvFixture {
    delimiter: char,
    metadata: Vec<String>,
    header: Option<Vec<String>>,
    rows: Vec<Vec<String>>,
    line_ending: &'static str,
}

impl DsvFixture {
    #[must_use]
    pub fn new(delimiter: u8) -> Self {
        Self {
            delimiter: delimiter as char,
            metadata: Vec::new(),
            header: None,
            rows: Vec::new(),
            line_ending: "\n",
        }
    }

    #[must_use]
    pub fn with_dialect(dialect: Dialect) -> Self {
        Self::new(dialect.delimiter)
    }

    /// Add a free-form line above the header.
    #[must_use]
    pub fn metadata(mut self, line: impl Into<String>) -> Self {
        self.metadata.push(line.into());
        self
    }

    #[must_use]
    pub fn header<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.header = Some(names.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn row<S: Into<String>>(mut self, cells: impl IntoIterator<Item = S>) -> Self {
        self.rows.push(cells.into_iter().map(Into::into).collect());
        self
    }

    /// Add `n` rows produced by `f(i)`.
    #[must_use]
    pub fn rows_with<F>(mut self, n: usize, f: F) -> Self
    where
        F: Fn(usize) -> Vec<String>,
    {
        self.rows.extend((0..n).map(f));
        self
    }

    /// Terminate lines with `\r\n`.
    #[must_use]
    pub fn crlf(mut self) -> Self {
        self.line_ending = "\r\n";
        self
    }

    /// Line index of the header within the built text.
    #[must_use]
    pub fn header_line(&self) -> Option<usize> {
        self.header.as_ref().map(|_| self.metadata.len())
    }

    /// Line index of the first data row.
    #[must_use]
    pub fn data_start(&self) -> usize {
        self.metadata.len() + usize::from(self.header.is_some())
    }

    #[must_use]
    pub fn build(&self) -> String {
        let delimiter = self.delimiter.to_string();
        let mut out = String::new();
        for line in &self.metadata {
            let _ = write!(out, "{line}{}", self.line_ending);
        }
        if let Some(ref names) = self.header {
            let _ = write!(out, "{}{}", names.join(&delimiter), self.line_ending);
        }
        for row in &self.rows {
            let _ = write!(out, "{}{}", row.join(&delimiter), self.line_ending);
        }
        out
    }
}

/// Two metadata lines, a `Number,Start_Time,Annotation` header and five rows.
#[must_use]
pub fn annotations_fixture() -> DsvFixture {
    DsvFixture::new(b',')
        .metadata("Experiment: open field")
        .metadata("Recorded by: lab 3")
        .header(["Number", "Start_Time", "Annotation"])
        .row(["1", "08:01:10", "resting"])
        .row(["2", "08:03:42", "grooming"])
        .row(["3", "08:05:19", "exploring"])
        .row(["4", "08:09:55", "resting"])
        .row(["5", "08:12:30", "grooming"])
}

/// A semicolon file with `n` typed rows under a `group;count;color;when` header.
#[must_use]
pub fn mixed_fixture(n: usize) -> DsvFixture {
    const GROUPS: [&str; 3] = ["a", "b", "c"];
    const COLORS: [&str; 4] = ["red", "green", "blue", "amber"];
    DsvFixture::new(b';')
        .metadata("site;north")
        .metadata("operator;Paul Dirac")
        .header(["group", "count", "color", "when"])
        .rows_with(n, |i| {
            vec![
                GROUPS[i % GROUPS.len()].to_string(),
                (i * 7 % 31).to_string(),
                COLORS[i % COLORS.len()].to_string(),
                format!("2023-{:02}-{:02}", i % 12 + 1, i % 28 + 1),
            ]
        })
}
