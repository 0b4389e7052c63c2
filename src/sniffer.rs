//! Structural inference over a bounded sample: metadata, header and column types.
//!
//! ## Locating the data section
//!
//! The last sampled line is assumed to be data. From there the sniffer walks
//! upward using one of two heuristics.
//!
//! **Type consistency** applies when the last line holds a numeric or
//! temporal cell. Each cell gets a cheap guess (numeric, temporal, text or
//! empty) and the walk extends a per-column signature while lines keep the
//! same cell count and agree with it. Empty and missing-value cells agree with
//! anything. A line that disagrees ends the walk:
//!
//! - if it is full and has text in every typed column of the signature, it is
//!   the header;
//! - if it still matches the signature in at least one typed column it is
//!   taken as an anomalous data row and the walk continues;
//! - otherwise the data section starts just below it and there is no header.
//!
//! **Row length** applies when the tail is all text. The longest suffix of
//! lines with equal cell count is the data section candidate; its first line
//! is the header when it is full and shares no value with any line below it.
//!
//! Everything above the header (or above the first data line when there is
//! no header) is metadata. Heuristics can be wrong; skipping problem lines in
//! [`SniffConfig::skips`] or overriding the header on the reader fixes them.

use crate::dialect::Dialect;
use crate::error::{Result, TabError};
use crate::parsing::{self, CellType, Formats};
use crate::sample::{Sample, Skips};
use crate::source::LineCursor;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::ops::Range;

/// Where and how much to sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SniffConfig {
    pub start: usize,
    pub amount: usize,
    pub skips: Skips,
}

impl Default for SniffConfig {
    fn default() -> Self {
        Self {
            start: 0,
            amount: 100,
            skips: Skips::None,
        }
    }
}

impl SniffConfig {
    #[must_use]
    pub fn with_start(mut self, start: usize) -> Self {
        self.start = start;
        self
    }

    #[must_use]
    pub fn with_amount(mut self, amount: usize) -> Self {
        self.amount = amount;
        self
    }

    #[must_use]
    pub fn with_skips(mut self, skips: impl Into<Skips>) -> Self {
        self.skips = skips.into();
        self
    }
}

/// Column names and where they came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// Source line of the header, `None` for supplied or synthetic names.
    pub line: Option<usize>,
    pub names: Vec<String>,
    /// Raw header text when read from the source.
    pub string: Option<String>,
}

impl Header {
    /// A header from raw names; names are sanitized.
    pub fn new<S: AsRef<str>>(line: Option<usize>, names: &[S], string: Option<String>) -> Self {
        Self {
            line,
            names: sanitize(names),
            string,
        }
    }

    /// Positional names `Column_0..Column_{n-1}`.
    pub fn generic(n: usize) -> Self {
        Self {
            line: None,
            names: (0..n).map(|i| format!("Column_{i}")).collect(),
            string: None,
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }
}

/// Make names usable as keys.
///
/// Surrounding whitespace is trimmed, inner spaces become underscores, blank
/// names become `Column_{i}` and every copy of a repeated name gets an `_{k}`
/// suffix numbered from zero.
pub fn sanitize<S: AsRef<str>>(names: &[S]) -> Vec<String> {
    let cleaned: Vec<String> = names
        .iter()
        .enumerate()
        .map(|(i, n)| {
            let n = n.as_ref().trim();
            if n.is_empty() {
                format!("Column_{i}")
            } else {
                n.replace(' ', "_")
            }
        })
        .collect();
    let mut totals: HashMap<&str, usize> = HashMap::new();
    for n in &cleaned {
        *totals.entry(n.as_str()).or_default() += 1;
    }
    let mut seen: HashMap<&str, usize> = HashMap::new();
    cleaned
        .iter()
        .map(|n| {
            if totals[n.as_str()] > 1 {
                let k = seen.entry(n.as_str()).or_default();
                let out = format!("{n}_{k}");
                *k += 1;
                out
            } else {
                n.clone()
            }
        })
        .collect()
}

/// Lines preceding the header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaData {
    pub lines: Range<usize>,
    /// Raw text of the sampled metadata lines, newline-joined.
    pub string: Option<String>,
}

impl MetaData {
    pub fn empty(at: usize) -> Self {
        Self {
            lines: at..at,
            string: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Per-column type decision from polling sampled data rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnTypes {
    pub types: Vec<CellType>,
    /// False when any column saw more than one type among its polled cells.
    pub consistent: bool,
    /// Columns whose polled cells disagreed; they read as "try everything".
    pub mixed: Vec<bool>,
}

impl ColumnTypes {
    pub fn uniform(n: usize, ty: CellType) -> Self {
        Self {
            types: vec![ty; n],
            consistent: true,
            mixed: vec![false; n],
        }
    }

    pub fn is_mixed(&self, column: usize) -> bool {
        self.mixed.get(column).copied().unwrap_or(false)
    }
}

/// Cheap per-cell guess used while locating the data section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Guess {
    Numeric,
    Temporal,
    Text,
    Empty,
}

impl Guess {
    pub fn of(cell: &str, formats: &Formats, missing: &[String]) -> Self {
        let t = cell.trim();
        if t.is_empty() || missing.iter().any(|m| m == t) {
            Guess::Empty
        } else if parsing::is_numeric(t) {
            Guess::Numeric
        } else if parsing::is_temporal(t, formats) {
            Guess::Temporal
        } else {
            Guess::Text
        }
    }

    fn is_typed(self) -> bool {
        matches!(self, Guess::Numeric | Guess::Temporal)
    }
}

/// Which heuristic placed the data section boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Heuristic {
    TypeConsistency,
    RowLength,
}

#[derive(Debug, Clone)]
struct SniffedRow {
    line: usize,
    cells: Vec<String>,
    guesses: Vec<Guess>,
}

impl SniffedRow {
    fn is_full(&self) -> bool {
        self.guesses.iter().all(|g| *g != Guess::Empty)
    }
}

struct Boundary {
    header: Option<usize>,
    data: usize,
    heuristic: Heuristic,
}

/// Sample-derived view of a source's structure.
///
/// A sniffer is immutable: changing where or how much to sample means
/// building a new one.
#[derive(Debug, Clone)]
pub struct Sniffer {
    config: SniffConfig,
    dialect: Dialect,
    formats: Formats,
    missing: Vec<String>,
    sample: Sample,
    rows: Vec<SniffedRow>,
    header: Header,
    metadata: MetaData,
    data_start: usize,
    heuristic: Heuristic,
}

impl Sniffer {
    /// Sample `cursor` and infer structure.
    ///
    /// `dialect` falls back to [`Dialect::guess`] over the sample. `missing`
    /// lists raw strings that stand for absent values.
    ///
    /// # Errors
    /// [`TabError::EmptySource`] when the sample holds no tokenizable line;
    /// sampling errors from the cursor.
    pub fn new(
        cursor: &mut LineCursor,
        config: SniffConfig,
        dialect: Option<Dialect>,
        formats: &Formats,
        missing: &[String],
    ) -> Result<Self> {
        let sample = Sample::collect(cursor, config.start, config.amount, &config.skips)?;
        Self::from_sample(sample, config, dialect, formats, missing)
    }

    /// Infer structure from an already collected sample.
    ///
    /// # Errors
    /// [`TabError::EmptySource`] when the sample holds no tokenizable line.
    pub fn from_sample(
        sample: Sample,
        config: SniffConfig,
        dialect: Option<Dialect>,
        formats: &Formats,
        missing: &[String],
    ) -> Result<Self> {
        let dialect = dialect.unwrap_or_else(|| {
            let raws: Vec<&str> = sample.lines.iter().map(|l| l.raw.as_str()).collect();
            Dialect::guess(&raws)
        });
        let tokenizer = dialect.tokenizer();
        let rows: Vec<SniffedRow> = sample
            .lines
            .iter()
            .filter(|l| !l.raw.trim().is_empty())
            .filter_map(|l| match tokenizer.split(&l.raw) {
                Ok(cells) => {
                    let guesses = cells.iter().map(|c| Guess::of(c, formats, missing)).collect();
                    Some(SniffedRow {
                        line: l.line,
                        cells,
                        guesses,
                    })
                }
                Err(bad) => {
                    log::debug!("line {} left out of sniffing: {}", l.line, bad.reason);
                    None
                }
            })
            .collect();
        if rows.is_empty() {
            return Err(TabError::EmptySource);
        }

        let boundary = locate(&rows);
        let width = rows[rows.len() - 1].cells.len();
        let header = match boundary.header {
            Some(i) => {
                let row = &rows[i];
                let raw = sample.get(row.line).map(|l| l.raw.clone());
                Header::new(Some(row.line), row.cells.as_slice(), raw)
            }
            None => Header::generic(width),
        };
        let first_data = rows.get(boundary.data).map_or(header.line.map_or(config.start, |h| h + 1), |r| r.line);
        let data_start = header.line.map_or(first_data, |h| h + 1);
        let meta_end = header.line.unwrap_or(data_start);
        let meta_start = config.start.min(meta_end);
        let metadata = if meta_start < meta_end {
            let lines = meta_start..meta_end;
            let string = sample.text_in(&lines);
            MetaData { lines, string }
        } else {
            MetaData::empty(meta_start)
        };
        log::debug!(
            "sniffed {:?}: header {:?}, metadata {:?}, data from line {}",
            boundary.heuristic,
            header.line,
            metadata.lines,
            data_start
        );

        Ok(Self {
            config,
            dialect,
            formats: formats.clone(),
            missing: missing.to_vec(),
            sample,
            rows,
            header,
            metadata,
            data_start,
            heuristic: boundary.heuristic,
        })
    }

    pub fn config(&self) -> &SniffConfig {
        &self.config
    }

    pub fn start(&self) -> usize {
        self.config.start
    }

    pub fn amount(&self) -> usize {
        self.config.amount
    }

    pub fn skips(&self) -> &Skips {
        &self.config.skips
    }

    pub fn sample(&self) -> &Sample {
        &self.sample
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn metadata(&self) -> &MetaData {
        &self.metadata
    }

    /// First line of the data section.
    pub fn data_start(&self) -> usize {
        self.data_start
    }

    pub fn heuristic(&self) -> Heuristic {
        self.heuristic
    }

    /// Cell count of the last sampled data line.
    pub fn width(&self) -> usize {
        self.rows.last().map_or(0, |r| r.cells.len())
    }

    /// Vote column types over the last `poll` sampled data rows.
    ///
    /// Cells equal to one of `exclude` do not vote. A column whose votes
    /// disagree becomes [`CellType::Str`] and is flagged as mixed.
    ///
    /// Each cell votes for its own narrowest type, so int and float votes
    /// disagree too: a float column holding whole numbers (`2.5`, `3`, `4.25`)
    /// is reported as a mixed string column. Reads convert mixed columns cell
    /// by cell, so those values still come back as numbers. Pass a larger or
    /// smaller `poll` to change which rows vote.
    pub fn types(&self, poll: usize, exclude: &[String]) -> ColumnTypes {
        let data: Vec<&SniffedRow> = self.rows.iter().filter(|r| r.line >= self.data_start).collect();
        let polled = &data[data.len().saturating_sub(poll)..];
        self.vote(polled, exclude)
    }

    /// Vote column types over the sampled rows at the given source lines.
    pub fn types_at(&self, lines: &[usize], exclude: &[String]) -> ColumnTypes {
        let wanted: HashSet<usize> = lines.iter().copied().collect();
        let polled: Vec<&SniffedRow> = self.rows.iter().filter(|r| wanted.contains(&r.line)).collect();
        self.vote(&polled, exclude)
    }

    fn vote(&self, rows: &[&SniffedRow], exclude: &[String]) -> ColumnTypes {
        let width = self.header.len();
        let mut out = ColumnTypes::uniform(width, CellType::Str);
        for col in 0..width {
            let mut winner: Option<CellType> = None;
            for row in rows {
                let Some(cell) = row.cells.get(col) else {
                    continue;
                };
                if exclude.iter().any(|e| e == cell.trim()) {
                    continue;
                }
                let ty = parsing::classify(cell, &self.formats);
                match winner {
                    None => winner = Some(ty),
                    Some(w) if w == ty => {}
                    Some(w) => {
                        log::debug!("column {col} votes disagree: {w} vs {ty} on line {}", row.line);
                        out.mixed[col] = true;
                        out.consistent = false;
                        break;
                    }
                }
            }
            if !out.mixed[col] {
                out.types[col] = winner.unwrap_or(CellType::Str);
            }
        }
        out
    }

    /// Missing-value tokens this sniffer was built with.
    pub fn missing(&self) -> &[String] {
        &self.missing
    }
}

fn locate(rows: &[SniffedRow]) -> Boundary {
    let last = rows.len() - 1;
    if rows[last].guesses.iter().any(|g| g.is_typed())
        && let Some(boundary) = type_scan(rows)
    {
        return boundary;
    }
    length_scan(rows)
}

fn type_scan(rows: &[SniffedRow]) -> Option<Boundary> {
    let last = rows.len() - 1;
    let width = rows[last].cells.len();
    let mut signature = rows[last].guesses.clone();
    let mut agreeing = 1;
    let mut data = last;
    let mut header = None;

    for i in (0..last).rev() {
        let row = &rows[i];
        if row.cells.len() != width {
            break;
        }
        if row.guesses.iter().zip(&signature).all(|(g, s)| agree(*g, *s)) {
            for (s, g) in signature.iter_mut().zip(&row.guesses) {
                if *s == Guess::Empty {
                    *s = *g;
                }
            }
            agreeing += 1;
            data = i;
            continue;
        }
        if is_label_row(row, &signature) {
            header = Some(i);
            break;
        }
        let partial = row
            .guesses
            .iter()
            .zip(&signature)
            .any(|(g, s)| s.is_typed() && g == s);
        if partial {
            log::trace!("line {} kept as anomalous data", row.line);
            data = i;
            continue;
        }
        break;
    }

    if header.is_none()
        && let Some(h) = numeric_label_row(rows, data)
    {
        log::debug!("line {} shares no value with the rows below; taken as header", rows[h].line);
        header = Some(h);
        data = h + 1;
    }

    (agreeing >= 2.min(rows.len())).then_some(Boundary {
        header,
        data,
        heuristic: Heuristic::TypeConsistency,
    })
}

fn agree(a: Guess, b: Guess) -> bool {
    a == Guess::Empty || b == Guess::Empty || a == b
}

fn is_label_row(row: &SniffedRow, signature: &[Guess]) -> bool {
    let mut typed = signature
        .iter()
        .zip(&row.guesses)
        .filter(|(s, _)| s.is_typed())
        .peekable();
    row.is_full() && typed.peek().is_some() && typed.all(|(_, g)| *g == Guess::Text)
}

/// A header of numeric-looking labels (years, codes) types like the data under it.
/// The topmost agreeing row is taken as header when it is full, holds a text
/// cell and shares no value with any of at least two rows below it.
fn numeric_label_row(rows: &[SniffedRow], top: usize) -> Option<usize> {
    let candidate = &rows[top];
    let below = &rows[top + 1..];
    (below.len() >= 2
        && candidate.is_full()
        && candidate.guesses.contains(&Guess::Text)
        && disjoint(candidate, below))
    .then_some(top)
}

fn length_scan(rows: &[SniffedRow]) -> Boundary {
    let last = rows.len() - 1;
    let width = rows[last].cells.len();
    let mut start = last;
    while start > 0 && rows[start - 1].cells.len() == width {
        start -= 1;
    }
    let candidate = &rows[start];
    let header = (start < last && candidate.is_full() && disjoint(candidate, &rows[start + 1..]))
        .then_some(start);
    Boundary {
        header,
        data: header.map_or(start, |h| h + 1),
        heuristic: Heuristic::RowLength,
    }
}

fn disjoint(row: &SniffedRow, below: &[SniffedRow]) -> bool {
    let values: HashSet<&str> = row.cells.iter().map(String::as_str).collect();
    below
        .iter()
        .all(|other| other.cells.iter().all(|c| !values.contains(c.as_str())))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sniff(lines: &[&str]) -> Sniffer {
        let sample = Sample::from_lines(0, lines.iter().copied());
        Sniffer::from_sample(sample, SniffConfig::default(), Some(Dialect::csv()), &Formats::standard(), &[])
            .unwrap()
    }

    #[test]
    fn sanitize_replaces_spaces_and_numbers_duplicates() {
        assert_eq!(sanitize(&["a b", " c ", "a b"]), vec!["a_b_0", "c", "a_b_1"]);
        assert_eq!(sanitize(&["a"; 3]), vec!["a_0", "a_1", "a_2"]);
        assert_eq!(sanitize(&["x", ""]), vec!["x", "Column_1"]);
    }

    #[test]
    fn typed_tail_finds_header_above_agreeing_rows() {
        let s = sniff(&["title", "id,when,note", "1,12:00:01,a", "2,12:00:02,b", "3,12:00:03,c"]);
        assert_eq!(s.heuristic(), Heuristic::TypeConsistency);
        assert_eq!(s.header().line, Some(1));
        assert_eq!(s.metadata().lines, 0..1);
        assert_eq!(s.data_start(), 2);
    }

    #[test]
    fn empty_cells_are_wildcards() {
        let s = sniff(&["a,b", "1,", ",2", "3,4"]);
        assert_eq!(s.header().line, Some(0));
        assert_eq!(s.data_start(), 1);
    }

    #[test]
    fn anomalous_data_row_does_not_become_header() {
        let s = sniff(&["a,b,c", "1,2,3", "4,x,6", "7,8,9", "10,11,12"]);
        assert_eq!(s.header().line, Some(0));
        assert_eq!(s.data_start(), 1);
    }

    #[test]
    fn numeric_labels_become_header_when_disjoint() {
        let s = sniff(&["Region,2022,2023", "north,1,2", "south,3,4", "east,5,6"]);
        assert_eq!(s.heuristic(), Heuristic::TypeConsistency);
        assert_eq!(s.header().line, Some(0));
        assert_eq!(s.header().names, vec!["Region", "2022", "2023"]);
        assert_eq!(s.data_start(), 1);
    }

    #[test]
    fn repeated_values_keep_a_headerless_file_headerless() {
        let s = sniff(&["north,1,2", "north,3,4", "south,1,5"]);
        assert_eq!(s.header().line, None);
        assert_eq!(s.data_start(), 0);
    }

    #[test]
    fn all_text_uses_row_length() {
        let s = sniff(&["exported", "name,colour", "ann,red", "bob,red", "cy,blue"]);
        assert_eq!(s.heuristic(), Heuristic::RowLength);
        assert_eq!(s.header().names, vec!["name", "colour"]);
        assert_eq!(s.metadata().string.as_deref(), Some("exported"));
    }

    #[test]
    fn no_header_gives_generic_names() {
        let s = sniff(&["1,2", "3,4", "5,6"]);
        assert_eq!(s.header().line, None);
        assert_eq!(s.header().names, vec!["Column_0", "Column_1"]);
        assert!(s.metadata().is_empty());
        assert_eq!(s.data_start(), 0);
    }

    #[test]
    fn types_vote_with_exclusions() {
        let s = sniff(&["n,x", "1,2.5", "2,NA", "3,4.0"]);
        let types = s.types(10, &["NA".to_string()]);
        assert_eq!(types.types, vec![CellType::Int, CellType::Float]);
        assert!(types.consistent);
    }

    #[test]
    fn disagreeing_votes_fall_back_to_str() {
        let s = sniff(&["n,x", "1,2", "2,3.5"]);
        let types = s.types(10, &[]);
        assert_eq!(types.types[1], CellType::Str);
        assert!(types.is_mixed(1));
        assert!(!types.consistent);
    }

    #[test]
    fn empty_sample_is_an_error() {
        let sample = Sample::from_lines(0, ["", "  "]);
        let err = Sniffer::from_sample(sample, SniffConfig::default(), None, &Formats::standard(), &[]);
        assert!(matches!(err, Err(TabError::EmptySource)));
    }
}
