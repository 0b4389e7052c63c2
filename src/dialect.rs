//! Lexical dialect of a delimited file and the per-line tokenizer built on it.
//!
//! Detecting the dialect is the job of an external collaborator; callers hand
//! a [`Dialect`] to the reader. When none is supplied, [`Dialect::guess`]
//! offers a trivial consistency-based fallback over a handful of common
//! delimiters.

use csv::{ReaderBuilder, StringRecord, Trim};
use serde::{Deserialize, Serialize};

/// Delimiter, quote and optional escape byte describing how a line splits into cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dialect {
    pub delimiter: u8,
    pub quote: u8,
    pub escape: Option<u8>,
}

impl Default for Dialect {
    fn default() -> Self {
        Self {
            delimiter: b',',
            quote: b'"',
            escape: None,
        }
    }
}

/// Delimiters tried, in order, by [`Dialect::guess`].
const CANDIDATES: [u8; 5] = [b',', b'\t', b';', b'|', b' '];

impl Dialect {
    pub fn new(delimiter: u8, quote: u8, escape: Option<u8>) -> Self {
        Self {
            delimiter,
            quote,
            escape,
        }
    }

    pub fn csv() -> Self {
        Self::default()
    }

    pub fn tsv() -> Self {
        Self {
            delimiter: b'\t',
            ..Self::default()
        }
    }

    pub fn semicolon() -> Self {
        Self {
            delimiter: b';',
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_escape(mut self, escape: u8) -> Self {
        self.escape = Some(escape);
        self
    }

    /// Pick the candidate delimiter whose per-line count is most often repeated.
    ///
    /// Lines without the delimiter do not vote. Ties go to the earlier
    /// candidate; with no votes at all the comma dialect is returned.
    pub fn guess<S: AsRef<str>>(lines: &[S]) -> Self {
        let mut best = (0usize, b',');
        for &delimiter in &CANDIDATES {
            let mut counts = std::collections::HashMap::<usize, usize>::new();
            for line in lines {
                let n = count_unquoted(line.as_ref(), delimiter, b'"');
                if n > 0 {
                    *counts.entry(n).or_default() += 1;
                }
            }
            let votes = counts.values().copied().max().unwrap_or(0);
            if votes > best.0 {
                best = (votes, delimiter);
            }
        }
        log::debug!("guessed delimiter {:?} ({} agreeing lines)", best.1 as char, best.0);
        Self {
            delimiter: best.1,
            ..Self::default()
        }
    }

    pub fn tokenizer(&self) -> Tokenizer {
        Tokenizer::new(*self)
    }
}

fn count_unquoted(line: &str, delimiter: u8, quote: u8) -> usize {
    let mut quoted = false;
    let mut n = 0;
    for &b in line.as_bytes() {
        if b == quote {
            quoted = !quoted;
        } else if b == delimiter && !quoted {
            n += 1;
        }
    }
    n
}

// Initial csv buffer per split; one reader is built for every line.
const LINE_BUFFER: usize = 256;

/// A line that could not be tokenized cleanly under the dialect.
///
/// `cells` holds the best-effort split so readers can still emit the row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Malformed {
    pub cells: Vec<String>,
    pub reason: String,
}

/// Splits single lines into cells under a fixed [`Dialect`].
#[derive(Debug)]
pub struct Tokenizer {
    dialect: Dialect,
    builder: ReaderBuilder,
}

impl Tokenizer {
    pub fn new(dialect: Dialect) -> Self {
        let mut builder = ReaderBuilder::new();
        builder
            .has_headers(false)
            .buffer_capacity(LINE_BUFFER)
            .flexible(true)
            .trim(Trim::Fields)
            .delimiter(dialect.delimiter)
            .quote(dialect.quote)
            .escape(dialect.escape)
            .double_quote(dialect.escape.is_none());
        Self { dialect, builder }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Split `line` into trimmed cells.
    ///
    /// # Errors
    /// Returns [`Malformed`] when quotes are unbalanced or the record cannot be
    /// decoded; the error still carries a best-effort split.
    pub fn split(&self, line: &str) -> Result<Vec<String>, Malformed> {
        if !self.balanced(line) {
            return Err(Malformed {
                cells: self.naive(line),
                reason: format!("unbalanced quote character {:?}", self.dialect.quote as char),
            });
        }
        let mut rdr = self.builder.from_reader(line.as_bytes());
        let mut record = StringRecord::new();
        match rdr.read_record(&mut record) {
            Ok(true) => Ok(record.iter().map(str::to_owned).collect()),
            Ok(false) => Ok(Vec::new()),
            Err(e) => Err(Malformed {
                cells: self.naive(line),
                reason: e.to_string(),
            }),
        }
    }

    fn balanced(&self, line: &str) -> bool {
        let bytes = line.as_bytes();
        let mut quoted = false;
        let mut i = 0;
        while i < bytes.len() {
            let b = bytes[i];
            if quoted && Some(b) == self.dialect.escape {
                i += 2;
                continue;
            }
            if b == self.dialect.quote {
                quoted = !quoted;
            }
            i += 1;
        }
        !quoted
    }

    fn naive(&self, line: &str) -> Vec<String> {
        let quote = self.dialect.quote as char;
        line.split(self.dialect.delimiter as char)
            .map(|cell| cell.trim().trim_matches(quote).to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_quoted_cells_containing_delimiters() {
        let tok = Dialect::csv().tokenizer();
        let cells = tok.split(r#"1,"Dirac, Paul",x"#).unwrap();
        assert_eq!(cells, vec!["1", "Dirac, Paul", "x"]);
    }

    #[test]
    fn lines_longer_than_the_buffer_split_whole() {
        let tok = Dialect::csv().tokenizer();
        let cells: Vec<String> = (0..200).map(|i| format!("cell{i:04}")).collect();
        let line = cells.join(",");
        assert!(line.len() > LINE_BUFFER);
        assert_eq!(tok.split(&line).unwrap(), cells);
        assert_eq!(tok.split("x,y").unwrap(), vec!["x", "y"]);
    }

    #[test]
    fn trims_cells() {
        let tok = Dialect::csv().tokenizer();
        assert_eq!(tok.split("a , b,c ").unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn unbalanced_quote_is_malformed_with_best_effort_cells() {
        let tok = Dialect::semicolon().tokenizer();
        let err = tok.split(r#"a;"b;c"#).unwrap_err();
        assert_eq!(err.cells, vec!["a", "b", "c"]);
        assert!(err.reason.contains("unbalanced"));
    }

    #[test]
    fn escape_keeps_quote_inside_cell() {
        let tok = Dialect::csv().with_escape(b'\\').tokenizer();
        let cells = tok.split(r#"a,"say \"hi\"",b"#).unwrap();
        assert_eq!(cells, vec!["a", r#"say "hi""#, "b"]);
    }

    #[test]
    fn guess_prefers_consistent_delimiter() {
        let lines = ["a;b;c", "1;2;3", "4;5;6", "note, with comma"];
        assert_eq!(Dialect::guess(&lines).delimiter, b';');
    }
}
